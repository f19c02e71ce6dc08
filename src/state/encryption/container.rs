//! The at-rest vault container and the password-based cipher producing it.
//!
//! Wire layout, base64 (standard alphabet, padded) over:
//!
//! ```text
//! +-----------+------------+-------------------------------+
//! | salt (16) | nonce (12) | ciphertext || GCM tag (16)    |
//! +-----------+------------+-------------------------------+
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use zeroize::Zeroizing;

use super::cipher::GcmCipher;
use super::error::CipherError;
use super::key_manager::KeyDeriver;
use super::key_manager::SALT_LEN;

/// Length of the AES-GCM nonce.
pub const NONCE_LEN: usize = 12;

/// Length of the AES-GCM authentication tag.
pub const TAG_LEN: usize = 16;

const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

/// An encrypted vault, as stored.
///
/// Opaque without the password. The inner string is the base64 encoding
/// described in the module docs and is preserved verbatim through storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedContainer(String);

impl EncryptedContainer {
    /// Wrap an encoded container read from storage. No validation happens
    /// until [`VaultCipher::decrypt`].
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decoded container bytes, for inspection and tests.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CipherError> {
        BASE64
            .decode(self.0.as_bytes())
            .map_err(|_| CipherError::DecryptionFailed)
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(BASE64.encode(bytes))
    }
}

impl std::fmt::Display for EncryptedContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

struct ContainerParts {
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl ContainerParts {
    fn pack(&self) -> EncryptedContainer {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        EncryptedContainer::from_bytes(&bytes)
    }

    // a container that cannot even be split is indistinguishable from one
    // that fails authentication.
    fn unpack(container: &EncryptedContainer) -> Result<Self, CipherError> {
        let bytes = container.to_bytes()?;
        if bytes.len() < HEADER_LEN + TAG_LEN {
            return Err(CipherError::DecryptionFailed);
        }

        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        Ok(Self {
            salt: salt.try_into().map_err(|_| CipherError::DecryptionFailed)?,
            nonce: nonce.try_into().map_err(|_| CipherError::DecryptionFailed)?,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Password-based authenticated encryption of serializable payloads
#[derive(Debug, Clone, Copy)]
pub struct VaultCipher;

impl VaultCipher {
    /// Encrypt `payload` under `password`.
    ///
    /// Every call draws a fresh salt (hence a fresh key) and a fresh nonce,
    /// so encrypting the same payload twice yields unrelated containers.
    /// Blocks for one key derivation.
    pub fn encrypt<T: Serialize + ?Sized>(
        payload: &T,
        password: &str,
    ) -> Result<EncryptedContainer, CipherError> {
        let plaintext = Zeroizing::new(
            serde_json::to_vec(payload).map_err(|e| CipherError::Serialization(e.to_string()))?,
        );

        let salt = KeyDeriver::generate_salt();
        let nonce = GcmCipher::generate_nonce();
        let key = KeyDeriver::derive_key(password, &salt);
        let ciphertext = GcmCipher::new(&key).encrypt(&plaintext, &nonce)?;

        Ok(ContainerParts {
            salt,
            nonce,
            ciphertext,
        }
        .pack())
    }

    /// Decrypt a container produced by [`VaultCipher::encrypt`].
    ///
    /// Fails with [`CipherError::DecryptionFailed`] on a wrong password or
    /// any corruption, and with [`CipherError::MalformedPayload`] when the
    /// plaintext authenticates but does not parse as `T`.
    /// Blocks for one key derivation.
    pub fn decrypt<T: DeserializeOwned>(
        container: &EncryptedContainer,
        password: &str,
    ) -> Result<T, CipherError> {
        let parts = ContainerParts::unpack(container)?;
        let key = KeyDeriver::derive_key(password, &parts.salt);
        let plaintext =
            Zeroizing::new(GcmCipher::new(&key).decrypt(&parts.ciphertext, &parts.nonce)?);

        serde_json::from_slice(&plaintext).map_err(|e| CipherError::MalformedPayload(e.to_string()))
    }
}
