//! The boundary to whatever generates keys and addresses.
//!
//! Key generation and address derivation live outside this crate. The
//! session only consumes what a [`KeyMaterialProvider`] hands back and stores
//! it, encrypted, in the vault.

use bip39::Language;
use bip39::Mnemonic;
use zeroize::Zeroizing;

use crate::state::vault::WalletRecord;

/// enumerates failures reported by a key-material provider
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum KeyMaterialError {
    #[error("recovery phrase is not a valid BIP-39 English mnemonic")]
    InvalidMnemonic,

    #[error("key material provider failed: {0}")]
    Provider(String),
}

/// Secrets for one account, as produced by a provider.
pub struct KeyMaterial {
    pub address: String,
    pub private_key: Zeroizing<String>,
    pub mnemonic: Option<Zeroizing<String>>,
}

impl KeyMaterial {
    pub fn new(
        address: impl Into<String>,
        private_key: impl Into<String>,
        mnemonic: Option<String>,
    ) -> Self {
        Self {
            address: address.into(),
            private_key: Zeroizing::new(private_key.into()),
            mnemonic: mnemonic.map(Zeroizing::new),
        }
    }

    /// Fail if a recovery phrase is attached and is not a valid mnemonic.
    pub fn check_mnemonic(&self) -> Result<(), KeyMaterialError> {
        match &self.mnemonic {
            Some(phrase) => validate_mnemonic(phrase),
            None => Ok(()),
        }
    }

    pub fn into_wallet_record(self, name: impl Into<String>) -> WalletRecord {
        WalletRecord::new(
            name,
            self.address.as_str(),
            self.private_key.as_str(),
            self.mnemonic.as_ref().map(|m| m.to_string()),
        )
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Produces key material for new or imported accounts.
pub trait KeyMaterialProvider: Send + Sync {
    /// Create a fresh account.
    fn generate(&self) -> Result<KeyMaterial, KeyMaterialError>;

    /// Restore an account from a recovery phrase. The phrase has already been
    /// checked with [`validate_mnemonic`].
    fn from_mnemonic(&self, phrase: &str) -> Result<KeyMaterial, KeyMaterialError>;
}

/// Whether `phrase` is a well-formed BIP-39 English mnemonic (word list and
/// checksum). Surrounding and repeated whitespace is tolerated.
pub fn validate_mnemonic(phrase: &str) -> Result<(), KeyMaterialError> {
    let normalized = Zeroizing::new(phrase.split_whitespace().collect::<Vec<_>>().join(" "));
    Mnemonic::from_phrase(&normalized, Language::English)
        .map(|_| ())
        .map_err(|_| KeyMaterialError::InvalidMnemonic)
}
