/// Why a session was locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum LockReason {
    Manual,
    Inactivity,
}

/// Lifecycle notifications published by a session.
///
/// Delivery is best-effort: a subscriber that falls behind loses the oldest
/// events, and subscribers never see events sent before they subscribed.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display)]
pub enum SessionEvent {
    Unlocked,
    Locked { reason: LockReason },
    VaultUpdated,
    PasswordChanged,
    Reset,
}
