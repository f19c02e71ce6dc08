use std::time::Duration;

use crate::state::encryption::PasswordPolicy;

/// Idle minutes before an unlocked session locks itself, unless the store
/// holds a different preference.
pub const DEFAULT_AUTO_LOCK_MINUTES: u32 = 15;

/// Buffered lifecycle events per subscriber before the oldest are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Settings for a [`SessionManager`](crate::state::session::SessionManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// fallback idle threshold; a persisted `autoLockTime` wins at open
    pub auto_lock_minutes: u32,

    /// applied to new passwords at setup and at change-password
    pub password_policy: PasswordPolicy,

    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_lock_minutes: DEFAULT_AUTO_LOCK_MINUTES,
            password_policy: PasswordPolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionConfig {
    pub fn with_auto_lock_minutes(mut self, minutes: u32) -> Self {
        self.auto_lock_minutes = minutes;
        self
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn auto_lock_timeout(&self) -> Duration {
        minutes(self.auto_lock_minutes)
    }
}

pub(crate) fn minutes(minutes: u32) -> Duration {
    Duration::from_secs(u64::from(minutes) * 60)
}
