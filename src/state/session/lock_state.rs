use zeroize::Zeroizing;

use crate::state::vault::Vault;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum LockState {
    /// persisted state not read yet
    #[default]
    Uninitialized,

    /// no password has been set up
    NoPassword,

    /// a password exists; secrets are not in memory
    Locked,

    /// password and decrypted vault are held in memory
    Unlocked,
}

impl LockState {
    pub fn is_unlocked(self) -> bool {
        self == Self::Unlocked
    }

    pub fn has_password(self) -> bool {
        matches!(self, Self::Locked | Self::Unlocked)
    }
}

/// The in-memory session guarded by the session mutex.
///
/// `password` and `vault` are `Some` exactly when `state` is `Unlocked`.
/// Both are wiped when cleared or dropped.
#[derive(Default)]
pub(super) struct Session {
    pub state: LockState,
    pub password_hash: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub vault: Option<Vault>,
}

impl Session {
    pub fn clear_secrets(&mut self) {
        self.password = None;
        self.vault = None;
    }

    pub fn hold(&mut self, password: Zeroizing<String>, vault: Vault) {
        self.password = Some(password);
        self.vault = Some(vault);
        self.state = LockState::Unlocked;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("has_password_hash", &self.password_hash.is_some())
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("wallets", &self.vault.as_ref().map(Vault::wallet_count))
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn hold_and_clear() {
        let mut session = Session {
            state: LockState::Locked,
            ..Default::default()
        };

        session.hold(Zeroizing::new("hunter22".to_string()), Vault::default());
        assert!(session.state.is_unlocked());
        assert!(!format!("{session:?}").contains("hunter22"));

        session.clear_secrets();
        assert!(session.password.is_none());
        assert!(session.vault.is_none());
    }

    #[test]
    fn display_names() {
        assert_eq!("NoPassword", LockState::NoPassword.to_string());
        assert!(LockState::Locked.has_password());
        assert!(!LockState::Uninitialized.has_password());
    }
}
