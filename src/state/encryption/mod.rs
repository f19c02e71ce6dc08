//! Vault encryption using PBKDF2-HMAC-SHA256 + AES-256-GCM
//!
//! This module protects the wallet's secret material (private keys, recovery
//! phrases) at rest, and provides the one-way hash used to check a password
//! before any key derivation is attempted.
//!
//! ## Security Properties
//!
//! - **Key Derivation**: PBKDF2-HMAC-SHA256, 100,000 iterations, fresh salt
//!   per encryption
//! - **Encryption**: AES-256-GCM (authenticated encryption), fresh nonce per
//!   encryption
//! - **Verification**: unsalted SHA-256 of the password, stored apart from
//!   the container and never used as a key
//! - **Memory Safety**: Zeroizing for derived keys and decrypted plaintext
//!
//! ## Architecture
//!
//! ```text
//! User Password (UTF-8)          random salt (16 bytes)
//!     ↓ PBKDF2-HMAC-SHA256 (100k iterations)
//! Vault Key (256 bits)           random nonce (12 bytes)
//!     ↓ AES-256-GCM over the JSON-serialized vault
//! base64( salt || nonce || ciphertext || tag )
//! ```
//!
//! ## Usage
//!
//! ```
//! use wallet_vault::state::encryption::VaultCipher;
//! use wallet_vault::state::vault::Vault;
//!
//! # fn main() -> anyhow::Result<()> {
//! let vault = Vault::default();
//! let container = VaultCipher::encrypt(&vault, "Tr0ub4dor&3")?;
//! let decrypted: Vault = VaultCipher::decrypt(&container, "Tr0ub4dor&3")?;
//! assert_eq!(vault, decrypted);
//! # Ok(())
//! # }
//! ```

pub use cipher::GcmCipher;
pub use container::EncryptedContainer;
pub use container::VaultCipher;
pub use container::NONCE_LEN;
pub use container::TAG_LEN;
pub use error::CipherError;
pub use key_manager::KeyDeriver;
pub use key_manager::KEY_LEN;
pub use key_manager::PBKDF2_ITERATIONS;
pub use key_manager::SALT_LEN;
pub use password::PasswordHasher;
pub use password::PasswordPolicy;
pub use password::PasswordStrength;
pub use password::StrengthLabel;

mod cipher;
mod container;
mod error;
mod key_manager;
mod password;
