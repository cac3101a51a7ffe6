use core::marker::PhantomData;
use core::ops::Deref;

use crate::recursive::{RecursiveTicketLock, Suspension};

/// A fair re-entrant lock protecting a value.
///
/// The owning thread may lock again while already holding the lock, so guards only hand out shared
/// references. Wrap the value in a `Cell` or `RefCell` for mutation.
#[derive(Debug, Default)]
pub struct ReentrantLock<T> {
    raw: RecursiveTicketLock,
    data: T,
}

// Send is automatically implemented for ReentrantLock.

// SAFETY: `&T` is only handed out to the thread holding `raw`, one thread at a time. Suspension,
// which lets a second thread in while the first still has references, requires `T: Sync`.
unsafe impl<T: Send> Sync for ReentrantLock<T> {}

impl<T> ReentrantLock<T> {
    /// Creates a new unlocked lock.
    pub const fn new(data: T) -> Self {
        Self {
            raw: RecursiveTicketLock::new(),
            data,
        }
    }

    /// Destroys the lock and retrieves the lock-protected value.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Returns a mutable reference to the protected value without locking.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.data
    }

    /// Acquires the lock, blocking only if another thread holds it.
    pub fn lock(&self) -> ReentrantLockGuard<'_, T> {
        self.raw.lock();
        ReentrantLockGuard {
            lock: self,
            _thread: PhantomData,
        }
    }

    /// Returns whether the calling thread holds the lock.
    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// Returns the calling thread's recursion depth, or 0 if it does not hold the lock.
    pub fn recursion_depth(&self) -> u32 {
        self.raw.recursion_depth()
    }
}

impl<T: Sync> ReentrantLock<T> {
    /// Fully releases the lock for as long as the returned [`Suspension`] lives.
    ///
    /// Guards taken before the suspension stay usable, so other threads admitted meanwhile share
    /// the value with them; hence `T: Sync`. See [`RecursiveTicketLock::suspend`].
    ///
    /// # Safety
    ///
    /// No [`ReentrantLockGuard`] taken before the call may be dropped while the suspension lives.
    pub unsafe fn suspend(&self) -> Suspension<'_> {
        // SAFETY: forwarded to the caller.
        unsafe { self.raw.suspend() }
    }
}

/// A guard that holds one level of a [`ReentrantLock`] and dereferences the inner value.
#[derive(Debug)]
#[must_use = "if unused the lock will immediately unlock"]
pub struct ReentrantLockGuard<'a, T> {
    lock: &'a ReentrantLock<T>,
    // The lock tracks its owner by thread, so the guard must be released where it was taken.
    _thread: PhantomData<*const ()>,
}

impl<T> Deref for ReentrantLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.lock.data
    }
}

impl<T> Drop for ReentrantLockGuard<'_, T> {
    fn drop(&mut self) {
        // SAFETY: the guard was created by `lock` on this thread and owns one level.
        unsafe { self.lock.raw.unlock() };
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread::scope;

    use super::ReentrantLock;

    #[test]
    fn nested_guards_share_value() {
        let lock = ReentrantLock::new(Cell::new(0));
        let outer = lock.lock();
        outer.set(1);
        {
            let inner = lock.lock();
            assert_eq!(lock.recursion_depth(), 2);
            inner.set(inner.get() + 1);
        }
        assert_eq!(outer.get(), 2);
        drop(outer);
        assert!(!lock.is_locked());
        assert_eq!(lock.into_inner().into_inner(), 2);
    }

    #[test]
    fn counter() {
        const THREADS: usize = 3;
        const ITERS: usize = 10_000;
        let lock = ReentrantLock::new(AtomicUsize::new(0));

        scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    for _ in 0..ITERS {
                        let outer = lock.lock();
                        let inner = lock.lock();
                        // Non-atomic read-modify-write: only exclusion keeps it correct.
                        let v = inner.load(Ordering::Relaxed);
                        outer.store(v + 1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(lock.into_inner().into_inner(), THREADS * ITERS);
    }

    #[test]
    fn suspend_restores_depth() {
        let lock = ReentrantLock::new(AtomicUsize::new(0));
        let _a = lock.lock();
        let b = lock.lock();
        {
            let _suspension = unsafe { lock.suspend() };
            assert!(!lock.is_locked());
            lock.lock().fetch_add(1, Ordering::Relaxed);
        }
        assert_eq!(lock.recursion_depth(), 2);
        assert_eq!(b.load(Ordering::Relaxed), 1);
    }
}
