/// enumerates failures of the vault encryption layer
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CipherError {
    /// the authentication tag did not verify: wrong password, or the
    /// container was corrupted or tampered with. the two are deliberately
    /// indistinguishable.
    #[error("decryption failed (wrong password or corrupted data)")]
    DecryptionFailed,

    /// decryption succeeded but the plaintext is not a valid vault document
    #[error("decrypted payload could not be parsed: {0}")]
    MalformedPayload(String),

    #[error("payload could not be serialized: {0}")]
    Serialization(String),

    #[error("encryption failed")]
    Encryption,
}
