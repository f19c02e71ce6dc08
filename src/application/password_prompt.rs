use anyhow::anyhow;
use anyhow::bail;
use anyhow::Result;
use rpassword::prompt_password;
use zeroize::Zeroizing;

use crate::state::encryption::PasswordPolicy;
use crate::state::encryption::PasswordStrength;

/// Where the CLI gets passwords and other secrets from.
pub trait SecretSource {
    /// The password of an existing vault.
    fn current_password(&self) -> Result<Zeroizing<String>>;

    /// A new password satisfying `policy`.
    fn new_password(&self, policy: &PasswordPolicy) -> Result<Zeroizing<String>>;

    /// A private key to import.
    fn private_key(&self) -> Result<Zeroizing<String>>;
}

/// Reads secrets from environment variables, falling back to interactive
/// terminal prompts.
#[derive(Debug, Clone)]
pub struct TerminalSecrets {
    pub password_var: String,
    pub new_password_var: String,
    pub private_key_var: String,
}

impl TerminalSecrets {
    /// Get a secret from an environment variable (for automation/testing)
    ///
    /// Environment variables are visible to other processes of the same
    /// user. Only use for testing or CI/CD environments.
    pub fn from_env_var(var_name: &str) -> Result<Zeroizing<String>> {
        std::env::var(var_name)
            .map(Zeroizing::new)
            .map_err(|_| anyhow!("Environment variable {var_name} not set"))
    }

    fn env_or_prompt(var_name: &str, prompt: &str) -> Result<Zeroizing<String>> {
        if let Ok(secret) = Self::from_env_var(var_name) {
            return Ok(secret);
        }
        let secret = Zeroizing::new(prompt_password(prompt)?);
        if secret.is_empty() {
            bail!("Input cannot be empty");
        }
        Ok(secret)
    }
}

impl SecretSource for TerminalSecrets {
    fn current_password(&self) -> Result<Zeroizing<String>> {
        Self::env_or_prompt(&self.password_var, "Enter vault password: ")
    }

    fn new_password(&self, policy: &PasswordPolicy) -> Result<Zeroizing<String>> {
        if let Ok(password) = Self::from_env_var(&self.new_password_var) {
            return Ok(password);
        }

        println!("\nYour vault will be encrypted with a password.");
        println!("If you lose this password, the vault cannot be recovered.\n");

        loop {
            let password = Zeroizing::new(prompt_password("Enter new password: ")?);

            let strength = PasswordStrength::evaluate(&password);
            println!("Password strength: {}", strength.label());

            if policy.check(&password).is_err() {
                eprintln!("Password is too weak.");
                for hint in strength.feedback() {
                    eprintln!("  - {hint}");
                }
                eprintln!();
                continue;
            }

            let confirm = Zeroizing::new(prompt_password("Confirm new password: ")?);
            if password != confirm {
                eprintln!("Passwords do not match. Please try again.\n");
                continue;
            }

            return Ok(password);
        }
    }

    fn private_key(&self) -> Result<Zeroizing<String>> {
        Self::env_or_prompt(&self.private_key_var, "Enter private key: ")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn missing_env_var_is_an_error() {
        let err = TerminalSecrets::from_env_var("WALLET_VAULT_TEST_UNSET_VARIABLE").unwrap_err();
        assert!(err.to_string().contains("WALLET_VAULT_TEST_UNSET_VARIABLE"));
    }
}
