//! Tokio mutex wrapper with optional lock-event tracing

mod atomic_mutex;
mod shared;

pub use atomic_mutex::AtomicMutex;
pub use atomic_mutex::AtomicMutexGuard;
use shared::now;
pub use shared::LockAcquisition;
pub use shared::LockCallbackFn;
pub use shared::LockEvent;
