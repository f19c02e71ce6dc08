use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

use crate::state::vault::TransactionStatus;

/// Environment variable consulted for the vault password before prompting.
pub const PASSWORD_ENV_VAR: &str = "WALLET_VAULT_PASSWORD";

/// Environment variable consulted for the new password by `setup` and
/// `change-password` before prompting.
pub const NEW_PASSWORD_ENV_VAR: &str = "WALLET_VAULT_NEW_PASSWORD";

/// Environment variable consulted for an imported private key before
/// prompting.
pub const PRIVATE_KEY_ENV_VAR: &str = "WALLET_VAULT_PRIVATE_KEY";

/// The `wallet-vault` command-line program manages a password-encrypted
/// wallet vault.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Args {
    /// The data directory that holds the encrypted vault.
    ///
    /// The default varies by operating system, e.g.
    ///
    /// Linux:   /home/alice/.local/share/wallet-vault
    ///
    /// Windows: C:\Users\Alice\AppData\Roaming\wallet-vault\wallet-vault\data
    ///
    /// macOS:   /Users/Alice/Library/Application Support/org.wallet-vault.wallet-vault
    #[clap(long, value_name = "DIR", env = "WALLET_VAULT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Idle minutes before an unlocked session locks, unless a preference
    /// has been saved with `set-auto-lock`.
    #[clap(long, default_value = "15", value_parser = clap::value_parser!(u32).range(1..))]
    pub auto_lock_minutes: u32,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create the vault and set its password.
    Setup,

    /// Verify the password and print the vault's accounts.
    Unlock,

    /// Re-encrypt the vault under a new password.
    ChangePassword,

    /// Add an account from an address and private key, making it active.
    ///
    /// The private key is read from WALLET_VAULT_PRIVATE_KEY or prompted for.
    AddAccount {
        #[clap(long)]
        address: String,

        /// Display name; defaults to "Account N".
        #[clap(long)]
        name: Option<String>,

        /// Recovery phrase to keep alongside the key.
        #[clap(long)]
        mnemonic: Option<String>,
    },

    /// Make an existing account the active one.
    SelectAccount { address: String },

    /// Append a sent transaction to the vault's log.
    RecordTx {
        #[clap(long)]
        hash: String,
        #[clap(long)]
        from: String,
        #[clap(long)]
        to: String,
        #[clap(long)]
        value: String,
        #[clap(long)]
        network: String,
        #[clap(long, default_value_t)]
        status: TransactionStatus,
        #[clap(long)]
        data: Option<String>,
    },

    /// Update the status of a recorded transaction.
    SetTxStatus {
        hash: String,
        status: TransactionStatus,
    },

    /// Save a new auto-lock time in minutes.
    SetAutoLock {
        #[clap(value_parser = clap::value_parser!(u32).range(1..))]
        minutes: u32,
    },

    /// Erase the vault and password. Cannot be undone.
    Reset {
        /// Confirm the reset.
        #[clap(long)]
        yes: bool,
    },

    /// Print whether a password is configured and the auto-lock time.
    Status,
}
