//! Stable per-thread identifiers.
//!
//! `std::thread::ThreadId` has no stable integer form, so each thread draws a small integer from a
//! global counter the first time it asks. Identifiers are never reused within a process (until the
//! counter wraps, which takes 2^32 thread creations) and `0` is never issued, so it can stand for
//! "no thread".

use core::sync::atomic::{AtomicU32, Ordering};

/// Identifier meaning "no thread".
pub const NONE: u32 = 0;

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

thread_local! {
    static THREAD_ID: u32 = issue();
}

fn issue() -> u32 {
    loop {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        if id != NONE {
            return id;
        }
    }
}

/// Returns the calling thread's identifier. Always nonzero.
#[inline]
pub fn current() -> u32 {
    THREAD_ID.with(|id| *id)
}
