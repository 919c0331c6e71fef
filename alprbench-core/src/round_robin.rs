//! Shared cyclic index sequence over the streams of one experiment.

use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin sequence with period equal to the stream count.
///
/// Each draw is a single atomic increment, so concurrent workers never
/// receive the same position of the cycle. A new sequence is built whenever
/// the stream count changes.
#[derive(Debug)]
pub struct RoundRobin {
    len: usize,
    cursor: CachePadded<AtomicUsize>,
}

impl RoundRobin {
    /// A zero length is clamped to one so draws stay in bounds.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            len: len.max(1),
            cursor: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub const fn period(&self) -> usize {
        self.len
    }

    /// Draw the next stream index.
    pub fn next_index(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.len
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn cycles_in_order() {
        let rr = RoundRobin::new(3);
        let draws: Vec<usize> = (0..7).map(|_| rr.next_index()).collect();
        assert_eq!(draws, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn concurrent_draws_are_fair() {
        let rr = Arc::new(RoundRobin::new(5));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rr = Arc::clone(&rr);
                thread::spawn(move || (0..250).map(|_| rr.next_index()).collect::<Vec<_>>())
            })
            .collect();

        let mut counts = [0usize; 5];
        for handle in handles {
            for idx in handle.join().unwrap() {
                counts[idx] += 1;
            }
        }
        assert_eq!(counts, [200; 5]);
    }

    proptest! {
        #[test]
        fn every_window_visits_each_index_once(
            streams in 1usize..64,
            offset in 0usize..500,
        ) {
            let rr = RoundRobin::new(streams);
            for _ in 0..offset {
                rr.next_index();
            }
            let window: HashSet<usize> = (0..streams).map(|_| rr.next_index()).collect();
            prop_assert_eq!(window.len(), streams);
            prop_assert!(window.iter().all(|&idx| idx < streams));
            prop_assert_eq!(rr.period(), streams);
        }
    }
}
