//! The plaintext secret payload: accounts, the active account, and the
//! transaction log.
//!
//! A [`Vault`] only ever exists decrypted inside an unlocked session. It is
//! serialized as JSON with the same keys the extension has always stored
//! (`wallets`, `activeWallet`, `transactions`); unknown keys from older
//! payloads are ignored.

mod transaction_record;
mod wallet_record;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

pub use transaction_record::TransactionRecord;
pub use transaction_record::TransactionStatus;
pub use wallet_record::WalletRecord;

/// enumerates vault invariant violations and failed vault mutations
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum VaultError {
    #[error("no wallet with address {0}")]
    UnknownWallet(String),

    #[error("active wallet {0} is not present in the vault")]
    DanglingActiveWallet(String),

    #[error("vault holds wallets but none is active")]
    MissingActiveWallet,

    #[error("wallet record is keyed under {key} but carries address {address}")]
    AddressMismatch { key: String, address: String },

    #[error("no transaction with hash {0}")]
    UnknownTransaction(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    #[serde(default)]
    wallets: BTreeMap<String, WalletRecord>,

    #[serde(default, rename = "activeWallet", skip_serializing_if = "Option::is_none")]
    active_wallet: Option<String>,

    #[serde(default)]
    transactions: Vec<TransactionRecord>,
}

impl Vault {
    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty() && self.transactions.is_empty()
    }

    pub fn wallets(&self) -> impl Iterator<Item = &WalletRecord> {
        self.wallets.values()
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    pub fn wallet(&self, address: &str) -> Option<&WalletRecord> {
        self.wallets.get(address)
    }

    pub fn active_wallet_address(&self) -> Option<&str> {
        self.active_wallet.as_deref()
    }

    pub fn active_wallet(&self) -> Option<&WalletRecord> {
        self.active_wallet
            .as_deref()
            .and_then(|address| self.wallets.get(address))
    }

    pub fn transactions(&self) -> &[TransactionRecord] {
        &self.transactions
    }

    /// Transactions sent from `address`, oldest first.
    pub fn transactions_from<'a>(
        &'a self,
        address: &'a str,
    ) -> impl Iterator<Item = &'a TransactionRecord> + 'a {
        self.transactions
            .iter()
            .filter(move |tx| tx.from.eq_ignore_ascii_case(address))
    }

    /// Default name for the next account, e.g. "Account 3".
    pub fn next_account_name(&self) -> String {
        format!("Account {}", self.wallets.len() + 1)
    }

    /// Insert `record`, replacing any wallet with the same address, and make
    /// it the active wallet.
    pub fn add_wallet(&mut self, record: WalletRecord) {
        let address = record.address.clone();
        self.wallets.insert(address.clone(), record);
        self.active_wallet = Some(address);
    }

    pub fn set_active_wallet(&mut self, address: &str) -> Result<(), VaultError> {
        if !self.wallets.contains_key(address) {
            return Err(VaultError::UnknownWallet(address.to_owned()));
        }
        self.active_wallet = Some(address.to_owned());
        Ok(())
    }

    /// Append to the transaction log.
    pub fn record_transaction(&mut self, transaction: TransactionRecord) {
        self.transactions.push(transaction);
    }

    /// Update the status of the most recent transaction with `hash`.
    pub fn set_transaction_status(
        &mut self,
        hash: &str,
        status: TransactionStatus,
    ) -> Result<(), VaultError> {
        let transaction = self
            .transactions
            .iter_mut()
            .rev()
            .find(|tx| tx.hash == hash)
            .ok_or_else(|| VaultError::UnknownTransaction(hash.to_owned()))?;
        transaction.status = status;
        Ok(())
    }

    /// Check the vault invariants:
    /// - every wallet is keyed by its own address
    /// - the active wallet, if set, is present
    /// - some wallet is active whenever there are wallets
    pub fn validate(&self) -> Result<(), VaultError> {
        if let Some((key, record)) = self.wallets.iter().find(|(k, r)| **k != r.address) {
            return Err(VaultError::AddressMismatch {
                key: key.clone(),
                address: record.address.clone(),
            });
        }

        match &self.active_wallet {
            Some(active) if !self.wallets.contains_key(active) => {
                Err(VaultError::DanglingActiveWallet(active.clone()))
            }
            None if !self.wallets.is_empty() => Err(VaultError::MissingActiveWallet),
            _ => Ok(()),
        }
    }
}
