use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::sync::MutexGuard;

use super::now;
use super::LockAcquisition;
use super::LockCallbackFn;
use super::LockEvent;

/// A shared `tokio` mutex that can report how long callers wait for it and
/// hold it.
///
/// Clones share the same value. Guards may be held across `.await` points,
/// which is what lets a whole state transition (read, encrypt, persist,
/// update) run without interleaving with another one.
///
/// ```
/// # use wallet_vault::application::locks::tokio::{AtomicMutex, LockEvent, LockCallbackFn};
/// fn print_event(event: LockEvent) {
///     println!("{} `{}`", event.event_type_name(), event.name().unwrap_or("?"));
/// }
///
/// # tokio_test::block_on(async {
/// let callback: LockCallbackFn = print_event;
/// let attempts = AtomicMutex::<u8>::from((0, Some("attempts"), Some(callback)));
/// attempts.lock_mut(|a| *a += 1).await;
/// assert_eq!(1, attempts.lock(|a| *a).await);
/// # })
/// ```
pub struct AtomicMutex<T> {
    inner: Arc<Mutex<T>>,
    name: Option<Arc<str>>,
    callback: Option<LockCallbackFn>,
}

impl<T> From<T> for AtomicMutex<T> {
    fn from(value: T) -> Self {
        Self::from((value, None, None))
    }
}

impl<T> From<(T, Option<&str>, Option<LockCallbackFn>)> for AtomicMutex<T> {
    /// A mutex whose lock events are reported to `callback` under `name`.
    fn from((value, name, callback): (T, Option<&str>, Option<LockCallbackFn>)) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
            name: name.map(Arc::from),
            callback,
        }
    }
}

impl<T> Clone for AtomicMutex<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: self.name.clone(),
            callback: self.callback,
        }
    }
}

impl<T> std::fmt::Debug for AtomicMutex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicMutex")
            .field("name", &self.name)
            .field("traced", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> AtomicMutex<T> {
    /// Acquire the lock for reading.
    pub async fn lock_guard(&self) -> AtomicMutexGuard<'_, T> {
        self.acquire(LockAcquisition::Read).await
    }

    /// Acquire the lock for writing.
    pub async fn lock_guard_mut(&self) -> AtomicMutexGuard<'_, T> {
        self.acquire(LockAcquisition::Write).await
    }

    /// Run `f` against the value while holding the lock.
    pub async fn lock<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let guard = self.acquire(LockAcquisition::Read).await;
        f(&guard)
    }

    /// Run `f` against the value mutably while holding the lock.
    pub async fn lock_mut<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut guard = self.acquire(LockAcquisition::Write).await;
        f(&mut guard)
    }

    async fn acquire(&self, acquisition: LockAcquisition) -> AtomicMutexGuard<'_, T> {
        let requested_at = now();
        let guard = self.inner.lock().await;
        let acquired_at = now();

        if let Some(cb) = self.callback {
            cb(LockEvent::Acquire {
                name: self.name.as_deref(),
                acquisition,
                waited: acquired_at.saturating_duration_since(requested_at),
            });
        }

        AtomicMutexGuard {
            guard,
            mutex: self,
            acquisition,
            acquired_at,
        }
    }
}

/// Access to the value of an [`AtomicMutex`]. Dropping it releases the lock.
pub struct AtomicMutexGuard<'a, T> {
    guard: MutexGuard<'a, T>,
    mutex: &'a AtomicMutex<T>,
    acquisition: LockAcquisition,
    acquired_at: Instant,
}

impl<T> std::fmt::Debug for AtomicMutexGuard<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicMutexGuard")
            .field("name", &self.mutex.name)
            .field("acquisition", &self.acquisition)
            .finish_non_exhaustive()
    }
}

impl<T> Drop for AtomicMutexGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(cb) = self.mutex.callback {
            cb(LockEvent::Release {
                name: self.mutex.name.as_deref(),
                acquisition: self.acquisition,
                held: self.acquired_at.elapsed(),
            });
        }
    }
}

impl<T> Deref for AtomicMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for AtomicMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use macro_rules_attr::apply;

    use super::*;
    use crate::tests::shared_tokio_runtime;

    #[test]
    fn named_and_unnamed_mutexes_are_built_from_a_tuple() {
        let callback: LockCallbackFn = |_| ();
        let traced = AtomicMutex::<u8>::from((0, Some("traced"), Some(callback)));
        let plain = AtomicMutex::<(u8, Option<&str>)>::from((0, None));

        assert_eq!(Some("traced"), traced.name.as_deref());
        assert!(traced.callback.is_some());
        assert!(plain.name.is_none());
    }

    #[apply(shared_tokio_runtime)]
    async fn clones_share_the_same_value() {
        let a = AtomicMutex::from(1u32);
        let b = a.clone();

        *b.lock_guard_mut().await += 1;
        assert_eq!(2, *a.lock_guard().await);
        assert_eq!(2, a.lock(|v| *v).await);
    }

    #[apply(shared_tokio_runtime)]
    async fn guard_held_across_await_blocks_other_writers() {
        let a = AtomicMutex::from(Vec::<u8>::new());
        let b = a.clone();

        let mut guard = a.lock_guard_mut().await;
        let writer = tokio::spawn(async move { b.lock_mut(|v| v.push(2)).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        guard.push(1);
        drop(guard);

        writer.await.unwrap();
        assert_eq!(vec![1, 2], a.lock(|v| v.clone()).await);
    }

    #[apply(shared_tokio_runtime)]
    async fn callback_sees_acquire_and_release() {
        static ACQUIRES: AtomicUsize = AtomicUsize::new(0);
        static RELEASES: AtomicUsize = AtomicUsize::new(0);

        fn count_events(event: LockEvent) {
            assert_eq!(Some("counted"), event.name());
            match event {
                LockEvent::Acquire { .. } => ACQUIRES.fetch_add(1, Ordering::SeqCst),
                LockEvent::Release { .. } => RELEASES.fetch_add(1, Ordering::SeqCst),
            };
        }

        let callback: LockCallbackFn = count_events;
        let a = AtomicMutex::<u8>::from((0, Some("counted"), Some(callback)));
        a.lock(|_| ()).await;
        a.lock_mut(|v| *v = 3).await;

        assert_eq!(2, ACQUIRES.load(Ordering::SeqCst));
        assert_eq!(2, RELEASES.load(Ordering::SeqCst));
    }
}
