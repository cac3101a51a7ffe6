use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

/// An exclusive lock with no data attached.
///
/// `lock` and `unlock` carry nothing between them: which caller is admitted next is entirely the
/// lock's own bookkeeping.
///
/// # Safety
///
/// While one caller is between `lock` and `unlock`, no other `lock` call may return, and each
/// `unlock` must happen-before the `lock` it admits returns.
pub unsafe trait RawLock: Default + Send + Sync {
    /// Blocks until the caller holds the lock.
    fn lock(&self);

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// The lock must be held, through a `lock` call not yet matched by an `unlock`.
    unsafe fn unlock(&self);
}

/// A value protected by a [`RawLock`].
///
/// The only way in is [`Lock::lock`], whose guard releases the raw lock when it goes out of scope.
#[derive(Debug, Default)]
pub struct Lock<L: RawLock, T> {
    raw: L,
    value: UnsafeCell<T>,
}

// SAFETY: `raw` admits one thread at a time, and only that thread reaches `value`.
unsafe impl<L: RawLock, T: Send> Sync for Lock<L, T> {}

impl<L: RawLock, T> Lock<L, T> {
    /// Creates an unlocked lock around `value`.
    pub fn new(value: T) -> Self {
        Self::with_raw(L::default(), value)
    }

    /// Creates a lock around `value` using an already constructed raw lock.
    pub fn with_raw(raw: L, value: T) -> Self {
        Self {
            raw,
            value: UnsafeCell::new(value),
        }
    }

    /// Returns the underlying raw lock.
    pub fn raw(&self) -> &L {
        &self.raw
    }

    /// Returns a mutable reference to the value without locking.
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Consumes the lock, returning the value.
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Blocks until the lock is held and returns a guard to the value.
    pub fn lock(&self) -> LockGuard<'_, L, T> {
        self.raw.lock();
        LockGuard {
            lock: self,
            _value: PhantomData,
        }
    }
}

/// Exclusive access to the value of a [`Lock`], released on drop.
#[derive(Debug)]
#[must_use = "if unused the lock will immediately unlock"]
pub struct LockGuard<'a, L: RawLock, T> {
    lock: &'a Lock<L, T>,
    // Sharing the guard shares `&T`, sending it sends `&mut T`.
    _value: PhantomData<&'a mut T>,
}

impl<L: RawLock, T> Deref for LockGuard<'_, L, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the raw lock is held until the guard drops.
        unsafe { &*self.lock.value.get() }
    }
}

impl<L: RawLock, T> DerefMut for LockGuard<'_, L, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the raw lock is held, and `&mut self` excludes other borrows through the guard.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<L: RawLock, T> Drop for LockGuard<'_, L, T> {
    fn drop(&mut self) {
        // SAFETY: the guard was created by a `lock` call it alone matches.
        unsafe { self.lock.raw.unlock() };
    }
}
