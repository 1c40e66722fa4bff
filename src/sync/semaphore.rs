//! Counting semaphore over a guarded permit counter.
//!
//! `acquire` parks while the count is zero and decrements inside the
//! same critical section that observed a permit, so the count can never
//! go implicitly negative: at every observation point it equals initial
//! permits plus releases minus successful acquires.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::SemaphoreError;

/// A counting semaphore for limiting concurrent access.
///
/// May be constructed with zero permits and fed entirely through
/// [`release`](Self::release).
#[derive(Debug)]
pub struct CountingSemaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl CountingSemaphore {
    /// Creates a semaphore with the given number of permits.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Returns the number of currently available permits.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        *self.permits.lock().expect("semaphore lock poisoned")
    }

    /// Acquires one permit, blocking while none are available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock().expect("semaphore lock poisoned");
        while *permits == 0 {
            permits = self
                .available
                .wait(permits)
                .expect("semaphore lock poisoned");
        }
        *permits -= 1;
    }

    /// Acquires one permit only if one is immediately available.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock().expect("semaphore lock poisoned");
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Acquires one permit, giving up after `timeout`.
    pub fn try_acquire_for(&self, timeout: Duration) -> Result<(), SemaphoreError> {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock().expect("semaphore lock poisoned");
        while *permits == 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SemaphoreError::Timeout);
            }
            let (guard, _) = self
                .available
                .wait_timeout(permits, remaining)
                .expect("semaphore lock poisoned");
            permits = guard;
        }
        *permits -= 1;
        Ok(())
    }

    /// Returns `n` permits and wakes up to `n` blocked acquirers.
    ///
    /// # Panics
    /// Panics if `n == 0`.
    pub fn release(&self, n: usize) {
        assert!(n > 0, "cannot release 0 permits");
        {
            let mut permits = self.permits.lock().expect("semaphore lock poisoned");
            *permits += n;
        }
        if n == 1 {
            self.available.notify_one();
        } else {
            self.available.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    #[test]
    fn acquire_decrements_and_release_restores() {
        init_test("acquire_decrements_and_release_restores");
        let sem = CountingSemaphore::new(2);
        sem.acquire();
        crate::assert_with_log!(
            sem.available_permits() == 1,
            "after acquire",
            1usize,
            sem.available_permits()
        );
        sem.release(1);
        crate::assert_with_log!(
            sem.available_permits() == 2,
            "after release",
            2usize,
            sem.available_permits()
        );
        crate::test_complete!("acquire_decrements_and_release_restores");
    }

    #[test]
    fn try_acquire_only_when_available() {
        init_test("try_acquire_only_when_available");
        let sem = CountingSemaphore::new(1);
        crate::assert_with_log!(sem.try_acquire(), "first succeeds", true, true);
        let second = sem.try_acquire();
        crate::assert_with_log!(!second, "second declines", false, second);
        crate::test_complete!("try_acquire_only_when_available");
    }

    #[test]
    fn try_acquire_for_times_out_at_zero() {
        init_test("try_acquire_for_times_out_at_zero");
        let sem = CountingSemaphore::new(0);
        let err = sem
            .try_acquire_for(Duration::from_millis(10))
            .expect_err("no permits");
        crate::assert_with_log!(
            err == SemaphoreError::Timeout,
            "timeout",
            SemaphoreError::Timeout,
            err
        );
        crate::test_complete!("try_acquire_for_times_out_at_zero");
    }

    #[test]
    fn release_wakes_blocked_acquirer() {
        init_test("release_wakes_blocked_acquirer");
        let sem = Arc::new(CountingSemaphore::new(0));
        let s = Arc::clone(&sem);
        let waiter = std::thread::spawn(move || {
            s.acquire();
        });

        std::thread::sleep(Duration::from_millis(20));
        sem.release(1);
        waiter.join().expect("waiter failed");
        crate::assert_with_log!(
            sem.available_permits() == 0,
            "permit consumed",
            0usize,
            sem.available_permits()
        );
        crate::test_complete!("release_wakes_blocked_acquirer");
    }

    #[test]
    fn release_many_wakes_many() {
        init_test("release_many_wakes_many");
        let sem = Arc::new(CountingSemaphore::new(0));
        let acquired = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let sem = Arc::clone(&sem);
            let acquired = Arc::clone(&acquired);
            handles.push(std::thread::spawn(move || {
                sem.acquire();
                acquired.fetch_add(1, Ordering::SeqCst);
            }));
        }

        std::thread::sleep(Duration::from_millis(20));
        sem.release(3);
        for handle in handles {
            handle.join().expect("acquirer failed");
        }
        let total = acquired.load(Ordering::SeqCst);
        crate::assert_with_log!(total == 3, "all woken", 3usize, total);
        crate::test_complete!("release_many_wakes_many");
    }

    #[test]
    fn never_negative_under_contention() {
        init_test("never_negative_under_contention");
        let sem = Arc::new(CountingSemaphore::new(2));
        let in_section = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sem = Arc::clone(&sem);
            let in_section = Arc::clone(&in_section);
            let max_seen = Arc::clone(&max_seen);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    sem.acquire();
                    let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    in_section.fetch_sub(1, Ordering::SeqCst);
                    sem.release(1);
                }
            }));
        }

        for handle in handles {
            handle.join().expect("worker failed");
        }

        let peak = max_seen.load(Ordering::SeqCst);
        crate::assert_with_log!(peak <= 2, "never above permit count", 2usize, peak);
        crate::assert_with_log!(
            sem.available_permits() == 2,
            "permits restored",
            2usize,
            sem.available_permits()
        );
        crate::test_complete!("never_negative_under_contention");
    }

    #[test]
    #[should_panic(expected = "cannot release 0 permits")]
    fn release_zero_panics() {
        let sem = CountingSemaphore::new(1);
        sem.release(0);
    }
}
