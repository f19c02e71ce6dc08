use std::fmt::Write;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use chrono::DateTime;
use chrono::Utc;
use tracing::info;

use crate::application::config::cli_args::Args;
use crate::application::config::cli_args::Command;
use crate::application::config::cli_args::NEW_PASSWORD_ENV_VAR;
use crate::application::config::cli_args::PASSWORD_ENV_VAR;
use crate::application::config::cli_args::PRIVATE_KEY_ENV_VAR;
use crate::application::config::data_directory::DataDirectory;
use crate::application::config::SessionConfig;
use crate::application::password_prompt::SecretSource;
use crate::application::password_prompt::TerminalSecrets;
use crate::state::key_material::KeyMaterial;
use crate::state::session::LockState;
use crate::state::session::SessionError;
use crate::state::session::SessionManager;
use crate::state::store::FileStore;
use crate::state::store::VaultStore;
use crate::state::vault::TransactionRecord;
use crate::state::vault::Vault;

/// Open the vault in the configured data directory and run one command.
pub async fn run(args: Args) -> Result<()> {
    let data_directory = DataDirectory::get(args.data_dir.clone())?;
    DataDirectory::create_dir_if_not_exists(&data_directory.root_dir_path()).await?;
    info!("Using data directory {data_directory}");

    let store: Arc<dyn VaultStore> = Arc::new(FileStore::new(data_directory.vault_file_path()));
    let config = SessionConfig::default().with_auto_lock_minutes(args.auto_lock_minutes);
    let session = SessionManager::open(store, config.clone())
        .await
        .context("Could not open vault")?;

    let secrets = TerminalSecrets {
        password_var: PASSWORD_ENV_VAR.to_owned(),
        new_password_var: NEW_PASSWORD_ENV_VAR.to_owned(),
        private_key_var: PRIVATE_KEY_ENV_VAR.to_owned(),
    };

    let output = execute(&session, &config, args.command, &secrets).await?;
    print!("{output}");

    session.lock().await;
    Ok(())
}

/// Run `command` against `session`, returning what to show the user.
pub async fn execute(
    session: &SessionManager,
    config: &SessionConfig,
    command: Command,
    secrets: &dyn SecretSource,
) -> Result<String> {
    let mut out = String::new();

    match command {
        Command::Setup => {
            if session.state().await.has_password() {
                bail!("A password is already set up. Use change-password or reset.");
            }
            let password = secrets.new_password(&config.password_policy)?;
            session.setup_password(&password).await?;
            writeln!(out, "Vault created.")?;
        }

        Command::Unlock => {
            let vault = unlock(session, secrets).await?;
            write_vault_summary(&mut out, &vault)?;
        }

        Command::ChangePassword => {
            let current = secrets.current_password()?;
            unlock_with(session, &current).await?;
            let new_password = secrets.new_password(&config.password_policy)?;
            session.change_password(&current, &new_password).await?;
            writeln!(out, "Password changed.")?;
        }

        Command::AddAccount {
            address,
            name,
            mnemonic,
        } => {
            unlock(session, secrets).await?;
            let private_key = secrets.private_key()?;
            let material = KeyMaterial::new(address, private_key.as_str(), mnemonic);
            let record = session.add_account(material, name.as_deref()).await?;
            writeln!(out, "Added {} ({}).", record.name, record.address)?;
        }

        Command::SelectAccount { address } => {
            unlock(session, secrets).await?;
            session.set_active_wallet(&address).await?;
            writeln!(out, "Active account: {address}")?;
        }

        Command::RecordTx {
            hash,
            from,
            to,
            value,
            network,
            status,
            data,
        } => {
            unlock(session, secrets).await?;
            let timestamp = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
            session
                .record_transaction(TransactionRecord {
                    hash: hash.clone(),
                    from,
                    to,
                    value,
                    network,
                    timestamp,
                    status,
                    data,
                })
                .await?;
            writeln!(out, "Recorded {hash} ({status}).")?;
        }

        Command::SetTxStatus { hash, status } => {
            unlock(session, secrets).await?;
            session.set_transaction_status(&hash, status).await?;
            writeln!(out, "{hash} is now {status}.")?;
        }

        Command::SetAutoLock { minutes } => {
            session.set_auto_lock_minutes(minutes).await?;
            writeln!(out, "Auto-lock after {minutes} idle minutes.")?;
        }

        Command::Reset { yes } => {
            if !yes {
                bail!("Refusing to erase the vault without --yes.");
            }
            session.reset_wallet().await?;
            writeln!(out, "Vault erased.")?;
        }

        Command::Status => {
            let state = session.state().await;
            let password = if state.has_password() {
                "configured"
            } else {
                "not configured"
            };
            writeln!(out, "Password: {password}")?;
            writeln!(out, "Auto-lock: {} minutes", session.auto_lock_minutes())?;
        }
    }

    Ok(out)
}

async fn unlock(session: &SessionManager, secrets: &dyn SecretSource) -> Result<Vault> {
    if session.state().await == LockState::NoPassword {
        bail!("No vault found. Run setup first.");
    }
    let password = secrets.current_password()?;
    unlock_with(session, &password).await
}

async fn unlock_with(session: &SessionManager, password: &str) -> Result<Vault> {
    match session.unlock(password).await {
        Ok(vault) => Ok(vault),
        Err(e) if e.is_incorrect_password() => bail!("Incorrect password."),
        Err(e @ SessionError::MalformedVault(_)) => {
            Err(e).context("The stored vault is damaged")
        }
        Err(e) => Err(e.into()),
    }
}

fn write_vault_summary(out: &mut String, vault: &Vault) -> Result<()> {
    if vault.wallet_count() == 0 {
        writeln!(out, "No accounts.")?;
    }
    for wallet in vault.wallets() {
        let marker = if Some(wallet.address.as_str()) == vault.active_wallet_address() {
            '*'
        } else {
            ' '
        };
        writeln!(out, "{marker} {:<16} {}", wallet.name, wallet.address)?;
    }

    for tx in vault.transactions() {
        let when = i64::try_from(tx.timestamp)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| tx.timestamp.to_string());
        writeln!(
            out,
            "  {} {} -> {} {} on {} [{}] {when}",
            tx.hash, tx.from, tx.to, tx.value, tx.network, tx.status
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use anyhow::anyhow;
    use macro_rules_attr::apply;
    use zeroize::Zeroizing;

    use super::*;
    use crate::state::encryption::PasswordPolicy;
    use crate::state::store::MemoryStore;
    use crate::state::vault::TransactionStatus;
    use crate::tests::shared_tokio_runtime;

    struct FixedSecrets {
        current: &'static str,
        new: &'static str,
    }

    impl SecretSource for FixedSecrets {
        fn current_password(&self) -> Result<Zeroizing<String>> {
            Ok(Zeroizing::new(self.current.to_owned()))
        }

        fn new_password(&self, policy: &PasswordPolicy) -> Result<Zeroizing<String>> {
            policy
                .check(self.new)
                .map_err(|s| anyhow!("weak password: {}", s.label()))?;
            Ok(Zeroizing::new(self.new.to_owned()))
        }

        fn private_key(&self) -> Result<Zeroizing<String>> {
            Ok(Zeroizing::new("0x4c0883a6".to_owned()))
        }
    }

    const SECRETS: FixedSecrets = FixedSecrets {
        current: "Tr0ub4dor&3",
        new: "Tr0ub4dor&3",
    };

    async fn session(store: Arc<MemoryStore>) -> (SessionManager, SessionConfig) {
        let config = SessionConfig::default();
        let session = SessionManager::open(store, config.clone()).await.unwrap();
        (session, config)
    }

    #[apply(shared_tokio_runtime)]
    async fn setup_add_account_and_list() {
        let store = Arc::new(MemoryStore::new());
        let (s, config) = session(store.clone()).await;

        execute(&s, &config, Command::Setup, &SECRETS).await.unwrap();

        // each CLI run opens a fresh session
        let (s, config) = session(store.clone()).await;
        let add = Command::AddAccount {
            address: "0xabc".into(),
            name: None,
            mnemonic: None,
        };
        let out = execute(&s, &config, add, &SECRETS).await.unwrap();
        assert_eq!("Added Account 1 (0xabc).\n", out);

        let (s, config) = session(store).await;
        let out = execute(&s, &config, Command::Unlock, &SECRETS).await.unwrap();
        assert!(out.starts_with("* Account 1"));
        assert!(out.contains("0xabc"));
    }

    #[apply(shared_tokio_runtime)]
    async fn wrong_password_is_reported_plainly() {
        let store = Arc::new(MemoryStore::new());
        let (s, config) = session(store.clone()).await;
        execute(&s, &config, Command::Setup, &SECRETS).await.unwrap();

        let (s, config) = session(store).await;
        let wrong = FixedSecrets {
            current: "nope",
            new: "nope",
        };
        let err = execute(&s, &config, Command::Unlock, &wrong).await.unwrap_err();
        assert_eq!("Incorrect password.", err.to_string());
    }

    #[apply(shared_tokio_runtime)]
    async fn record_and_confirm_transaction() {
        let store = Arc::new(MemoryStore::new());
        let (s, config) = session(store.clone()).await;
        execute(&s, &config, Command::Setup, &SECRETS).await.unwrap();

        let record = Command::RecordTx {
            hash: "0x01".into(),
            from: "0xabc".into(),
            to: "0xdef".into(),
            value: "0.1".into(),
            network: "ETHEREUM_SEPOLIA".into(),
            status: TransactionStatus::Pending,
            data: None,
        };
        execute(&s, &config, record, &SECRETS).await.unwrap();

        let confirm = Command::SetTxStatus {
            hash: "0x01".into(),
            status: TransactionStatus::Confirmed,
        };
        let out = execute(&s, &config, confirm, &SECRETS).await.unwrap();
        assert_eq!("0x01 is now confirmed.\n", out);
    }

    #[apply(shared_tokio_runtime)]
    async fn reset_requires_confirmation() {
        let store = Arc::new(MemoryStore::new());
        let (s, config) = session(store.clone()).await;
        execute(&s, &config, Command::Setup, &SECRETS).await.unwrap();

        assert!(execute(&s, &config, Command::Reset { yes: false }, &SECRETS)
            .await
            .is_err());
        execute(&s, &config, Command::Reset { yes: true }, &SECRETS)
            .await
            .unwrap();

        let out = execute(&s, &config, Command::Status, &SECRETS).await.unwrap();
        assert_eq!("Password: not configured\nAuto-lock: 15 minutes\n", out);
    }

    #[apply(shared_tokio_runtime)]
    async fn unlock_before_setup_fails() {
        let (s, config) = session(Arc::new(MemoryStore::new())).await;
        let err = execute(&s, &config, Command::Unlock, &SECRETS).await.unwrap_err();
        assert!(err.to_string().contains("Run setup first"));
    }
}
