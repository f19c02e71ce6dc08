//! Password-derived vault encryption and session locking for a
//! browser-extension wallet.
//!
//! [`state`] holds the vault model, its encryption and the session that
//! guards it. [`application`] wires that up to a command-line front end.

// `cargo llvm-cov` on nightly: test modules are excluded with
// `#[cfg_attr(coverage_nightly, coverage(off))]`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod application;
pub mod state;


use application::locks::tokio as sync_tokio;

/// Seconds a session-lock holder may keep the lock before a warning is
/// logged. Overridden by `LOG_SLOW_LOCK_THRESHOLD`.
const DEFAULT_SLOW_LOCK_THRESHOLD_SECS: f32 = 2.0;

pub(crate) fn log_tokio_lock_event_cb(lock_event: sync_tokio::LockEvent) {
    #[cfg(feature = "log-lock-events")]
    log_tokio_lock_event(&lock_event);

    log_slow_locks(&lock_event);
}

// very verbose. only useful when debugging a transition that never completes.
#[cfg(feature = "log-lock-events")]
pub(crate) fn log_tokio_lock_event(lock_event: &sync_tokio::LockEvent) {
    let tokio_id = match tokio::task::try_id() {
        Some(id) => format!("{}", id),
        None => "?".to_string(),
    };

    let waited_for_acquire_str = match lock_event.waited() {
        Some(d) => format!("\n\t|-- waited for acquire: {} secs", d.as_secs_f32()),
        None => String::default(),
    };
    let held_str = match lock_event.held() {
        Some(d) => format!("\n\t|-- held: {} secs", d.as_secs_f32()),
        None => String::default(),
    };

    tracing::trace!(
        "{} tokio lock `{}` for `{}` by\n\t|-- thread {:?}, (`{}`)\n\t|-- tokio task {}{}{}\n\t|--",
        lock_event.event_type_name(),
        lock_event.name().unwrap_or("?"),
        lock_event.acquisition(),
        std::thread::current().id(),
        std::thread::current().name().unwrap_or("?"),
        tokio_id,
        waited_for_acquire_str,
        held_str,
    );
}

pub(crate) fn log_slow_locks(event: &sync_tokio::LockEvent) {
    let Some(held) = event.held() else {
        return;
    };

    let max_duration_secs = std::env::var("LOG_SLOW_LOCK_THRESHOLD")
        .ok()
        .and_then(|t| t.parse().ok())
        .unwrap_or(DEFAULT_SLOW_LOCK_THRESHOLD_SECS);

    if held.as_secs_f32() > max_duration_secs {
        tracing::warn!(
            "{}-lock `{}` held for {} seconds. (exceeds max: {} secs)",
            event.acquisition(),
            event.name().unwrap_or("?"),
            held.as_secs_f32(),
            max_duration_secs,
        );
    }
}

const LOG_LOCK_EVENT_CB: sync_tokio::LockCallbackFn = log_tokio_lock_event_cb;
