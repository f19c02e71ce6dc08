use std::time::Duration;
use std::time::Instant;

/// Whether a guard was taken to read or to modify the protected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LockAcquisition {
    Read,
    Write,
}

/// Reported to a [`LockCallbackFn`] around every guard's lifetime.
#[derive(Debug, Clone, Copy)]
pub enum LockEvent<'a> {
    /// The guard was obtained after waiting `waited`.
    Acquire {
        name: Option<&'a str>,
        acquisition: LockAcquisition,
        waited: Duration,
    },

    /// The guard was dropped after being held for `held`.
    Release {
        name: Option<&'a str>,
        acquisition: LockAcquisition,
        held: Duration,
    },
}

impl LockEvent<'_> {
    pub fn event_type_name(&self) -> &'static str {
        match self {
            Self::Acquire { .. } => "Acquire",
            Self::Release { .. } => "Release",
        }
    }

    pub fn name(&self) -> Option<&str> {
        match *self {
            Self::Acquire { name, .. } | Self::Release { name, .. } => name,
        }
    }

    pub fn acquisition(&self) -> LockAcquisition {
        match *self {
            Self::Acquire { acquisition, .. } | Self::Release { acquisition, .. } => acquisition,
        }
    }

    /// time spent waiting for the lock
    pub fn waited(&self) -> Option<Duration> {
        match *self {
            Self::Acquire { waited, .. } => Some(waited),
            Self::Release { .. } => None,
        }
    }

    /// time the lock was held, for release events
    pub fn held(&self) -> Option<Duration> {
        match *self {
            Self::Release { held, .. } => Some(held),
            Self::Acquire { .. } => None,
        }
    }
}

/// Receives a [`LockEvent`] each time a named lock is acquired or released.
pub type LockCallbackFn = fn(lock_event: LockEvent);

#[inline]
pub(super) fn now() -> Instant {
    Instant::now()
}
