use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::thread::{self, scope};

use ticketlock::{Lock, RawLock, TicketLock};

#[test]
fn mutual_exclusion() {
    const THREADS: usize = 8;
    const ITERS: usize = 5_000;

    let lock = TicketLock::new();
    // Deliberately split load and store: lost updates show up if exclusion fails.
    let counter = AtomicUsize::new(0);

    scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..ITERS {
                    lock.lock();
                    counter.store(counter.load(Relaxed) + 1, Relaxed);
                    unsafe { lock.unlock() };
                }
            });
        }
    });

    assert_eq!(counter.into_inner(), THREADS * ITERS);
    assert!(!lock.is_locked());
}

#[test]
fn fifo_order() {
    const THREADS: usize = 6;

    let lock = Lock::<TicketLock, Vec<usize>>::default();
    let lock = &lock;
    let guard = lock.lock();

    scope(|s| {
        for i in 0..THREADS {
            s.spawn(move || lock.lock().push(i));
            // Wait until thread `i` has drawn its ticket before starting the next one.
            while lock.raw().queue_len() < i as u32 + 2 {
                thread::yield_now();
            }
        }
        drop(guard);
    });

    let order = lock.lock().clone();
    assert_eq!(order, (0..THREADS).collect::<Vec<_>>());
}

#[test]
fn handoff_between_two_threads() {
    const ROUNDS: usize = 10_000;

    let lock = Lock::<TicketLock, Vec<u8>>::default();

    scope(|s| {
        for tag in [0u8, 1u8] {
            let lock = &lock;
            s.spawn(move || {
                for _ in 0..ROUNDS {
                    lock.lock().push(tag);
                }
            });
        }
    });

    let log = lock.into_inner();
    assert_eq!(log.len(), 2 * ROUNDS);
    assert_eq!(log.iter().filter(|&&t| t == 0).count(), ROUNDS);
}
