//! Durable key-value storage for the encrypted vault and its verification
//! hash.
//!
//! The store is an external collaborator: the session manager is the only
//! writer of the vault keys, and relies on a single [`VaultStore::set`] call
//! being all-or-nothing when it writes the hash and the container together.

mod file;
mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
pub use file::FileStore;
pub use memory::MemoryStore;
use serde_json::Value;

/// Keys under which session and vault state is persisted.
pub mod keys {
    pub const PASSWORD_HASH: &str = "passwordHash";
    pub const HAS_PASSWORD: &str = "hasPassword";
    pub const ENCRYPTED_WALLET_DATA: &str = "encryptedWalletData";
    pub const AUTO_LOCK_TIME: &str = "autoLockTime";

    // plaintext keys written by older extension versions
    pub const WALLETS: &str = "wallets";
    pub const ACTIVE_WALLET: &str = "activeWallet";
    pub const TRANSACTIONS: &str = "transactions";
    pub const HAS_WALLET: &str = "hasWallet";

    /// Everything a wallet reset erases. The auto-lock preference survives.
    pub const RESET: [&str; 7] = [
        PASSWORD_HASH,
        HAS_PASSWORD,
        ENCRYPTED_WALLET_DATA,
        WALLETS,
        ACTIVE_WALLET,
        TRANSACTIONS,
        HAS_WALLET,
    ];
}

pub type StoreEntries = HashMap<String, Value>;

/// enumerates storage collaborator failures
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    #[error("storage i/o failed: {0}")]
    Io(String),

    #[error("stored document is corrupt: {0}")]
    Corrupt(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// A durable key-value store.
///
/// No transactions across calls. Within one `set` either every entry is
/// written or none is.
#[async_trait]
pub trait VaultStore: Send + Sync + std::fmt::Debug {
    /// Fetch the entries present under `keys`; absent keys are omitted.
    async fn get(&self, keys: &[&str]) -> Result<StoreEntries, StoreError>;

    /// Write all `entries` at once.
    async fn set(&self, entries: StoreEntries) -> Result<(), StoreError>;

    /// Delete `keys`. Deleting an absent key is not an error.
    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: VaultStore + ?Sized> VaultStore for Arc<S> {
    async fn get(&self, keys: &[&str]) -> Result<StoreEntries, StoreError> {
        (**self).get(keys).await
    }

    async fn set(&self, entries: StoreEntries) -> Result<(), StoreError> {
        (**self).set(entries).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        (**self).remove(keys).await
    }
}

/// Build a [`StoreEntries`] map from `(key, value)` pairs.
pub fn entries<I, V>(pairs: I) -> StoreEntries
where
    I: IntoIterator<Item = (&'static str, V)>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.into()))
        .collect()
}
