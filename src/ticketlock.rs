use core::sync::atomic::AtomicU32;
use core::sync::atomic::Ordering::*;

use atomic_wait::{wait, wake_all};

use crate::RawLock;

/// A fair ticket lock.
///
/// Every [`lock`](RawLock::lock) call draws a ticket from `next_ticket` and is admitted once
/// `now_serving` reaches it, so the lock is granted strictly in the order tickets were issued.
/// Contended waiters sleep on `now_serving` (futex / `WaitOnAddress`) rather than spin.
///
/// Intended for a small number of threads (two or three) contending on short critical sections.
/// Both counters wrap at 2^32; tickets are only ever compared for equality, so wrapping is
/// harmless as long as fewer than 2^32 callers are queued at once.
///
/// Forgetting to unlock, or unlocking twice, deadlocks or breaks exclusion. Prefer going through
/// [`Lock`](crate::Lock), which ties the release to a guard.
#[derive(Debug)]
pub struct TicketLock {
    next_ticket: AtomicU32,
    now_serving: AtomicU32,
}

impl Default for TicketLock {
    fn default() -> Self {
        Self::new()
    }
}

impl TicketLock {
    /// Creates an unlocked ticket lock.
    pub const fn new() -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
        }
    }

    #[cfg(test)]
    const fn starting_at(ticket: u32) -> Self {
        Self {
            next_ticket: AtomicU32::new(ticket),
            now_serving: AtomicU32::new(ticket),
        }
    }

    /// Returns whether some thread currently holds the lock.
    ///
    /// The answer may be stale by the time the caller looks at it.
    pub fn is_locked(&self) -> bool {
        self.queue_len() != 0
    }

    /// Returns the number of tickets issued but not yet released, including the holder's.
    ///
    /// The answer may be stale by the time the caller looks at it.
    pub fn queue_len(&self) -> u32 {
        let serving = self.now_serving.load(Relaxed);
        self.next_ticket.load(Relaxed).wrapping_sub(serving)
    }

    #[cold]
    #[inline(never)]
    fn lock_slow(&self, ticket: u32, mut current: u32) {
        log::trace!("ticket {ticket} waiting, now serving {current}");

        loop {
            // Returns immediately if `now_serving` already moved past `current`.
            wait(&self.now_serving, current);
            current = self.now_serving.load(Acquire);
            if current == ticket {
                return;
            }
        }
    }
}

// SAFETY: a caller is admitted only when `now_serving` equals its ticket, and each ticket is issued
// once. The release increment in `unlock` pairs with the acquire load that admits the next caller.
unsafe impl RawLock for TicketLock {
    fn lock(&self) {
        // The acquire load of `now_serving` below provides the synchronization.
        let ticket = self.next_ticket.fetch_add(1, Relaxed);
        let current = self.now_serving.load(Acquire);

        if ticket != current {
            self.lock_slow(ticket, current);
        }
    }

    unsafe fn unlock(&self) {
        debug_assert!(self.is_locked(), "unlocking a ticket lock that is not held");

        self.now_serving.fetch_add(1, Release);
        // Waiters sleep on whatever value they last saw, not on their own ticket, so a single
        // wake could pick a thread whose turn has not come while the next in line keeps sleeping.
        wake_all(&self.now_serving);
    }
}
