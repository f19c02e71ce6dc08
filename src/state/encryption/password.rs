//! Password verification hashing and strength validation

use sha2::Digest;
use sha2::Sha256;

/// One-way digest used to check a password before attempting decryption.
///
/// This is not a key derivation function. It is unsalted and fast, and is
/// only ever compared against the stored digest; the vault key is always
/// re-derived from the submitted password.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher;

impl PasswordHasher {
    /// Length of a digest in hex characters.
    pub const DIGEST_HEX_LEN: usize = 64;

    /// lowercase hex SHA-256 of the UTF-8 password
    pub fn hash(password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }

    pub fn verify(password: &str, stored_hash: &str) -> bool {
        Self::hash(password).eq_ignore_ascii_case(stored_hash)
    }
}

/// Human-readable strength classification, indexed by score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display)]
pub enum StrengthLabel {
    #[strum(to_string = "Very Weak")]
    VeryWeak,
    Weak,
    Fair,
    Good,
    Strong,
}

impl StrengthLabel {
    fn from_score(score: u8) -> Self {
        match score {
            0 => Self::VeryWeak,
            1 => Self::Weak,
            2 => Self::Fair,
            3 => Self::Good,
            _ => Self::Strong,
        }
    }
}

/// Password strength score (0..=4) together with improvement hints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordStrength {
    score: u8,
    feedback: Vec<&'static str>,
}

const COMMON_PATTERNS: [&str; 4] = ["password", "qwerty", "abc", "admin"];

impl PasswordStrength {
    /// Score a password.
    ///
    /// Considers:
    /// - Length (at least 8 characters)
    /// - Character classes (uppercase, lowercase, digits, symbols)
    /// - Common patterns, which cost a point
    pub fn evaluate(password: &str) -> Self {
        // tracked in half points
        let mut halves: i32 = 0;
        let mut feedback = vec![];

        if password.chars().count() >= 8 {
            halves += 2;
        } else {
            feedback.push("Password should be at least 8 characters long");
        }

        if password.chars().any(|c| c.is_ascii_uppercase()) {
            halves += 2;
        } else {
            feedback.push("Add uppercase letters");
        }

        if password.chars().any(|c| c.is_ascii_lowercase()) {
            halves += 1;
        } else {
            feedback.push("Add lowercase letters");
        }

        if password.chars().any(|c| c.is_ascii_digit()) {
            halves += 2;
        } else {
            feedback.push("Add numbers");
        }

        if password.chars().any(|c| !c.is_ascii_alphanumeric()) {
            halves += 3;
        } else {
            feedback.push("Add special characters");
        }

        let lowered = password.to_lowercase();
        if lowered.starts_with("123") || COMMON_PATTERNS.iter().any(|p| lowered.contains(p)) {
            halves -= 2;
            feedback.push("Avoid common patterns");
        }

        let score = (halves.div_euclid(2)).clamp(0, 4) as u8;
        Self { score, feedback }
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn label(&self) -> StrengthLabel {
        StrengthLabel::from_score(self.score)
    }

    pub fn feedback(&self) -> &[&'static str] {
        &self.feedback
    }
}

/// Minimum requirements for a new password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub min_score: u8,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            min_score: 2,
        }
    }
}

impl PasswordPolicy {
    /// A policy that accepts any password. Intended for tests and tooling.
    pub fn permissive() -> Self {
        Self {
            min_length: 0,
            min_score: 0,
        }
    }

    /// Check a candidate password, returning its strength when rejected.
    pub fn check(&self, password: &str) -> Result<(), PasswordStrength> {
        let strength = PasswordStrength::evaluate(password);
        if password.chars().count() < self.min_length || strength.score() < self.min_score {
            return Err(strength);
        }
        Ok(())
    }
}
