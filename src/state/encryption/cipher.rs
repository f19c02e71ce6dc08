//! AES-256-GCM over a key derived from the user's password. The 16-byte tag
//! travels at the end of the ciphertext, which is how the container stores it.

use aes_gcm::aead::Aead;
use aes_gcm::aead::KeyInit;
use aes_gcm::Aes256Gcm;
use aes_gcm::Key;
use aes_gcm::Nonce;
use rand::Rng;

use super::container::NONCE_LEN;
use super::error::CipherError;
use super::key_manager::KEY_LEN;

/// One derived key, ready to seal and open vault payloads.
pub struct GcmCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for GcmCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcmCipher").finish_non_exhaustive()
    }
}

impl GcmCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Self { cipher }
    }

    /// A fresh random 96-bit nonce. Never reuse one under the same key.
    pub fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);
        nonce
    }

    /// Returns `ciphertext || tag`.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>, CipherError> {
        self.cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| CipherError::Encryption)
    }

    /// Fails with [`CipherError::DecryptionFailed`] if the tag does not verify.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<Vec<u8>, CipherError> {
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::DecryptionFailed)
    }
}
