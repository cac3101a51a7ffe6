//! Fair ticket locks.
//!
//! - [`TicketLock`]: a FIFO mutex built from two counters, blocking on the "now serving" counter
//!   instead of spinning.
//! - [`RecursiveTicketLock`]: adds owner tracking on top, so the holding thread can re-enter, and
//!   [`Suspension`] to temporarily release a recursively held lock around a call that may re-enter.
//! - [`Lock`] and [`ReentrantLock`]: data-owning wrappers that only hand out scoped guards.

#![warn(missing_docs, missing_debug_implementations)]
#![deny(unsafe_op_in_unsafe_fn)]

mod api;
mod recursive;
mod reentrant;
pub mod thread_id;
mod ticketlock;

pub use api::{Lock, LockGuard, RawLock};
pub use recursive::{RecursiveTicketLock, RecursiveTicketLockGuard, Suspension};
pub use reentrant::{ReentrantLock, ReentrantLockGuard};
pub use ticketlock::TicketLock;
