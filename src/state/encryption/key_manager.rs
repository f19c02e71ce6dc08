//! PBKDF2 key derivation for vault encryption
//!
//! The iteration count is part of the container contract: containers carry
//! no KDF parameters, so changing it makes every existing vault unreadable.

use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use zeroize::Zeroizing;

/// PBKDF2-HMAC-SHA256 rounds applied to every derivation.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of the per-encryption random salt.
pub const SALT_LEN: usize = 16;

/// Length of the derived AES-256 key.
pub const KEY_LEN: usize = 32;

/// Derives vault keys from user passwords
#[derive(Debug, Clone, Copy)]
pub struct KeyDeriver;

impl KeyDeriver {
    /// Derive a 256-bit key from password and caller-supplied salt.
    ///
    /// Deliberately slow (100k HMAC-SHA256 rounds). Call it from a blocking
    /// context, never directly on an async executor thread.
    pub fn derive_key(password: &str, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut *key);
        key
    }

    /// Generate random salt for a new encryption
    pub fn generate_salt() -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        rand::rng().fill(&mut salt);
        salt
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn same_password_and_salt_give_same_key() {
        let password = "Tr0ub4dor&3";
        let salt = [42u8; SALT_LEN];

        let key1 = KeyDeriver::derive_key(password, &salt);
        let key2 = KeyDeriver::derive_key(password, &salt);

        assert_eq!(key1.as_ref(), key2.as_ref());
    }

    #[test]
    fn password_changes_the_key() {
        let salt = [42u8; SALT_LEN];

        let key1 = KeyDeriver::derive_key("password1", &salt);
        let key2 = KeyDeriver::derive_key("password2", &salt);

        assert_ne!(key1.as_ref(), key2.as_ref());
    }

    #[test]
    fn salt_changes_the_key() {
        let password = "same-password";

        let key1 = KeyDeriver::derive_key(password, &[1u8; SALT_LEN]);
        let key2 = KeyDeriver::derive_key(password, &[2u8; SALT_LEN]);

        assert_ne!(key1.as_ref(), key2.as_ref());
    }

    /// PBKDF2-HMAC-SHA256 reference value, computed independently with
    /// python's hashlib.pbkdf2_hmac("sha256", b"password", b"salt", 100000).
    #[test]
    fn matches_reference_vector() {
        let mut key = [0u8; KEY_LEN];
        pbkdf2_hmac::<Sha256>(b"password", b"salt", PBKDF2_ITERATIONS, &mut key);
        assert_eq!(
            "0394a2ede332c9a13eb82e9b24631604c31df978b4e2f0fbd2c549944f9d79a5",
            hex::encode(key)
        );
    }

    #[test]
    fn salts_are_fresh() {
        let salt1 = KeyDeriver::generate_salt();
        let salt2 = KeyDeriver::generate_salt();

        assert_ne!(salt1, salt2);
    }
}
