use crate::state::encryption::CipherError;
use crate::state::key_material::KeyMaterialError;
use crate::state::store::StoreError;
use crate::state::vault::VaultError;

/// enumerates possible session operation failures
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("incorrect password")]
    InvalidPassword,

    #[error("vault could not be decrypted")]
    DecryptionFailed,

    #[error("decrypted vault is malformed: {0}")]
    MalformedVault(String),

    #[error("storage unavailable")]
    StorageUnavailable(#[from] StoreError),

    #[error("internal crypto error: {0}")]
    InternalCryptoError(String),

    #[error("session is locked")]
    NotUnlocked,

    #[error("no password has been set up")]
    NoPasswordConfigured,

    #[error("a password is already set up")]
    PasswordAlreadyConfigured,

    #[error("password is too weak (score {score} of 4)")]
    WeakPassword {
        score: u8,
        feedback: Vec<&'static str>,
    },

    #[error("vault rejected")]
    InvalidVault(#[from] VaultError),

    #[error("auto-lock time must be at least one minute, got {0}")]
    InvalidAutoLock(u32),

    #[error(transparent)]
    KeyMaterial(#[from] KeyMaterialError),
}

impl SessionError {
    /// Both a rejected password and an undecryptable vault are reported to
    /// the user as an incorrect password.
    pub fn is_incorrect_password(&self) -> bool {
        matches!(self, Self::InvalidPassword | Self::DecryptionFailed)
    }
}

impl From<CipherError> for SessionError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::DecryptionFailed => Self::DecryptionFailed,
            CipherError::MalformedPayload(detail) => Self::MalformedVault(detail),
            other => Self::InternalCryptoError(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for SessionError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::InternalCryptoError(e.to_string())
    }
}
