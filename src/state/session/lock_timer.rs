use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

/// Invoked once when the idle threshold is crossed.
pub type IdleCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Fires a callback after a period without user activity.
///
/// Time is read from the tokio clock, so a paused test runtime drives it
/// deterministically. At most one check is pending at any time; a check that
/// has been superseded by [`reset_timer`](Self::reset_timer) or
/// [`clear_timer`](Self::clear_timer) never invokes the callback.
pub struct InactivityLockTimer {
    inner: Arc<TimerInner>,
}

struct TimerInner {
    state: Mutex<TimerState>,
    on_idle: IdleCallback,
}

struct TimerState {
    timeout: Duration,
    last_activity: Instant,
    pending: Option<JoinHandle<()>>,
    generation: u64,
}

impl TimerInner {
    // a poisoned lock still holds consistent state
    fn state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InactivityLockTimer {
    pub fn new(timeout: Duration, on_idle: IdleCallback) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                state: Mutex::new(TimerState {
                    timeout,
                    last_activity: Instant::now(),
                    pending: None,
                    generation: 0,
                }),
                on_idle,
            }),
        }
    }

    /// Record activity now and schedule a fresh check one timeout from now,
    /// replacing any pending check.
    pub fn reset_timer(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("inactivity timer reset outside a tokio runtime; auto-lock not scheduled");
            return;
        };

        let mut state = self.inner.state();
        state.generation = state.generation.wrapping_add(1);
        state.last_activity = Instant::now();
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }

        let generation = state.generation;
        let inner = self.inner.clone();
        state.pending = Some(runtime.spawn(run_check(inner, generation)));
    }

    /// Cancel the pending check, if any.
    pub fn clear_timer(&self) {
        let mut state = self.inner.state();
        state.generation = state.generation.wrapping_add(1);
        if let Some(pending) = state.pending.take() {
            pending.abort();
        }
    }

    /// Change the idle threshold. A pending check picks up the new value when
    /// it next wakes.
    pub fn set_timeout(&self, timeout: Duration) {
        self.inner.state().timeout = timeout;
    }

    pub fn timeout(&self) -> Duration {
        self.inner.state().timeout
    }

    /// Whether a check is scheduled.
    pub fn is_armed(&self) -> bool {
        self.inner.state().pending.is_some()
    }

    /// Whether the time since the last activity has reached the threshold.
    pub fn idle_expired(&self) -> bool {
        let state = self.inner.state();
        state.last_activity.elapsed() >= state.timeout
    }
}

impl Drop for InactivityLockTimer {
    fn drop(&mut self) {
        self.clear_timer();
    }
}

impl std::fmt::Debug for InactivityLockTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("InactivityLockTimer")
            .field("timeout", &state.timeout)
            .field("armed", &state.pending.is_some())
            .finish()
    }
}

async fn run_check(inner: Arc<TimerInner>, generation: u64) {
    loop {
        let deadline = {
            let state = inner.state();
            if state.generation != generation {
                return;
            }
            state.last_activity + state.timeout
        };

        tokio::time::sleep_until(deadline).await;

        {
            let mut state = inner.state();
            if state.generation != generation {
                return;
            }
            if state.last_activity.elapsed() < state.timeout {
                // threshold was raised while sleeping
                continue;
            }
            state.pending = None;
        }

        debug!("inactivity threshold reached");
        (inner.on_idle)().await;
        return;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use futures::FutureExt;

    use super::*;

    fn counting_timer(timeout: Duration) -> (InactivityLockTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let on_idle: IdleCallback = Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
        (InactivityLockTimer::new(timeout, on_idle), fired)
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_timeout() {
        let (timer, fired) = counting_timer(MINUTE);
        timer.reset_timer();

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(0, fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(1, fired.load(Ordering::SeqCst));
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(1, fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn activity_postpones_the_check() {
        let (timer, fired) = counting_timer(MINUTE);
        timer.reset_timer();

        tokio::time::sleep(Duration::from_secs(30)).await;
        timer.reset_timer();

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(0, fired.load(Ordering::SeqCst), "fired at 61s despite activity at 30s");

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(1, fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_timer_never_fires() {
        let (timer, fired) = counting_timer(MINUTE);
        timer.reset_timer();
        timer.clear_timer();
        timer.clear_timer();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(0, fired.load(Ordering::SeqCst));
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn raised_timeout_is_honored_by_pending_check() {
        let (timer, fired) = counting_timer(MINUTE);
        timer.reset_timer();
        timer.set_timeout(2 * MINUTE);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(0, fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(1, fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_expired_tracks_last_activity() {
        let (timer, _fired) = counting_timer(MINUTE);
        timer.reset_timer();
        assert!(!timer.idle_expired());

        tokio::time::advance(MINUTE).await;
        assert!(timer.idle_expired());
    }

    #[test]
    fn reset_outside_runtime_does_not_arm() {
        let (timer, _fired) = counting_timer(MINUTE);
        timer.reset_timer();
        assert!(!timer.is_armed());
    }
}
