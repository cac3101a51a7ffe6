//! Recursive ticket lock with scoped suspension.
//!
//! [`RecursiveTicketLock`] layers owner tracking and a recursion count over [`TicketLock`], so the
//! owning thread can lock again without blocking. [`RecursiveTicketLock::suspend`] fully releases
//! a recursively held lock for the duration of a call that may re-enter it (or must not run with
//! the lock held at all) and restores the previous depth when the returned [`Suspension`] drops.
//!
//! Leaning on re-entrancy is usually a design smell: a re-entered critical section observes
//! whatever half-updated state the outer one left behind. The typical legitimate case is a
//! message loop where dispatching a message can synchronously call back into code that takes the
//! same lock.

use core::marker::PhantomData;
use core::sync::atomic::AtomicU32;
use core::sync::atomic::Ordering::*;

use crossbeam_utils::CachePadded;

use crate::thread_id::{self, NONE};
use crate::{RawLock, TicketLock};

#[derive(Debug)]
struct Ownership {
    /// Identifier of the holding thread, or [`NONE`].
    owner: AtomicU32,
    /// Unmatched `lock` calls made by `owner`. Only touched by the owner.
    recursion: AtomicU32,
}

/// A fair lock that the holding thread may acquire recursively.
///
/// Other threads are admitted in FIFO order through the inner [`TicketLock`]; re-entrant calls on
/// the owning thread never block and never take a ticket.
///
/// `owner` and `recursion` are only written by a thread that either just acquired the inner lock
/// or already owns it, so relaxed accesses suffice: a thread can only ever read its own identifier
/// from `owner` if it stored it there itself.
#[derive(Debug)]
pub struct RecursiveTicketLock {
    inner: TicketLock,
    state: CachePadded<Ownership>,
}

impl Default for RecursiveTicketLock {
    fn default() -> Self {
        Self::new()
    }
}

impl RecursiveTicketLock {
    /// Creates an unlocked recursive lock.
    pub const fn new() -> Self {
        Self {
            inner: TicketLock::new(),
            state: CachePadded::new(Ownership {
                owner: AtomicU32::new(NONE),
                recursion: AtomicU32::new(0),
            }),
        }
    }

    /// Acquires the lock, blocking only if another thread holds it.
    ///
    /// Every call must be matched by one [`unlock`](Self::unlock) on the same thread.
    pub fn lock(&self) {
        let id = thread_id::current();

        if self.state.owner.load(Relaxed) != id {
            self.inner.lock();
            self.state.owner.store(id, Relaxed);
        }

        self.state.recursion.fetch_add(1, Relaxed);
    }

    /// Releases one level of recursion, and the lock itself once the depth reaches zero.
    ///
    /// # Safety
    ///
    /// The calling thread must hold the lock through an unmatched [`lock`](Self::lock) call.
    pub unsafe fn unlock(&self) {
        debug_assert!(self.is_locked(), "unlocking a recursive lock not held by this thread");

        if self.state.recursion.fetch_sub(1, Relaxed) == 1 {
            self.state.owner.store(NONE, Relaxed);
            // SAFETY: the depth just dropped to zero, so this thread holds `inner` exactly once.
            unsafe { self.inner.unlock() };
        }
    }

    /// Acquires the lock and returns a guard that releases it when dropped.
    pub fn acquire(&self) -> RecursiveTicketLockGuard<'_> {
        self.lock();
        RecursiveTicketLockGuard {
            lock: self,
            _thread: PhantomData,
        }
    }

    /// Fully releases the lock if the calling thread holds it, however deep.
    ///
    /// Other threads may acquire the lock while the returned [`Suspension`] is alive, and the
    /// calling thread may lock and unlock it again as if it had never held it. Dropping the
    /// suspension reacquires the lock (blocking if needed) and adds the saved depth back onto
    /// whatever depth the thread holds at that moment.
    ///
    /// If the calling thread does not hold the lock, the returned suspension does nothing.
    ///
    /// # Safety
    ///
    /// Levels acquired before the call now belong to the suspension. None of them may be released,
    /// by [`unlock`](Self::unlock) or by dropping a [`RecursiveTicketLockGuard`], until the
    /// suspension has been dropped. Levels taken during the suspension pair up as usual.
    pub unsafe fn suspend(&self) -> Suspension<'_> {
        let id = thread_id::current();
        let mut suspension = Suspension {
            lock: self,
            owner: NONE,
            recursion: 0,
            _thread: PhantomData,
        };

        if self.state.owner.load(Relaxed) == id {
            suspension.owner = id;
            suspension.recursion = self.state.recursion.swap(0, Relaxed);
            self.state.owner.store(NONE, Relaxed);
            // SAFETY: this thread owns the lock, and holds `inner` once regardless of depth.
            unsafe { self.inner.unlock() };
            log::trace!(
                "thread {id} suspended recursive lock at depth {}",
                suspension.recursion
            );
        }

        suspension
    }

    /// Returns whether the calling thread holds the lock.
    pub fn is_locked(&self) -> bool {
        self.state.owner.load(Relaxed) == thread_id::current()
    }

    /// Returns the calling thread's recursion depth, or 0 if it does not hold the lock.
    pub fn recursion_depth(&self) -> u32 {
        if self.is_locked() {
            self.state.recursion.load(Relaxed)
        } else {
            0
        }
    }
}

/// Releases one level of a [`RecursiveTicketLock`] when dropped.
///
/// Bound to the thread that acquired it.
#[derive(Debug)]
#[must_use = "if unused the lock will immediately unlock"]
pub struct RecursiveTicketLockGuard<'a> {
    lock: &'a RecursiveTicketLock,
    _thread: PhantomData<*const ()>,
}

impl Drop for RecursiveTicketLockGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: the guard was created by `acquire` on this thread and owns one level.
        unsafe { self.lock.unlock() };
    }
}

/// Restores a suspended [`RecursiveTicketLock`] when dropped.
///
/// Not `Clone`, not `Send`, and borrows the lock, so the saved state is restored exactly once, on
/// the thread it was taken from, before the lock can go away.
#[derive(Debug)]
#[must_use = "if unused the lock is restored immediately"]
pub struct Suspension<'a> {
    lock: &'a RecursiveTicketLock,
    owner: u32,
    recursion: u32,
    _thread: PhantomData<*const ()>,
}

impl Suspension<'_> {
    /// Returns whether dropping this suspension leaves the lock untouched.
    pub fn is_noop(&self) -> bool {
        self.owner == NONE
    }

    /// Returns the depth that will be added back on drop.
    pub fn saved_depth(&self) -> u32 {
        self.recursion
    }
}

impl Drop for Suspension<'_> {
    fn drop(&mut self) {
        if self.is_noop() {
            return;
        }

        let state = &self.lock.state;

        // The thread may have locked again during the suspension and still hold it.
        if state.owner.load(Relaxed) != self.owner {
            self.lock.inner.lock();
            state.owner.store(self.owner, Relaxed);
        }
        // Add rather than overwrite, to compose with any depth taken during the suspension.
        state.recursion.fetch_add(self.recursion, Relaxed);

        log::trace!(
            "thread {} restored recursive lock to depth {}",
            self.owner,
            state.recursion.load(Relaxed)
        );
    }
}
