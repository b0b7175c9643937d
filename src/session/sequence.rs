//! Sequence number generation.

use std::sync::atomic::{AtomicU32, Ordering};

const MAX_SEQUENCE: u32 = 0x7FFF_FFFF;

/// Monotonically increasing sequence_number source, 1..=2^31-1, skipping 0.
/// A wrapped value colliding with a still-pending entry is skipped by the
/// allocation loop in the session, which simply draws again.
#[derive(Debug)]
pub struct Sequence(AtomicU32);

impl Sequence {
    pub fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    pub fn next(&self) -> u32 {
        let result = self.0.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
            Some(if current >= MAX_SEQUENCE { 1 } else { current + 1 })
        });
        match result {
            Ok(previous) => previous,
            Err(previous) => previous,
        }
    }

    #[cfg(test)]
    fn set(&self, value: u32) {
        self.0.store(value, Ordering::SeqCst);
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn starts_at_one_and_increments() {
        let sequence = Sequence::new();
        assert_eq!(sequence.next(), 1);
        assert_eq!(sequence.next(), 2);
        assert_eq!(sequence.next(), 3);
    }

    #[test]
    fn wraps_to_one_skipping_zero() {
        let sequence = Sequence::new();
        sequence.set(MAX_SEQUENCE);
        assert_eq!(sequence.next(), MAX_SEQUENCE);
        assert_eq!(sequence.next(), 1);
    }

    #[test]
    fn concurrent_draws_are_unique() {
        let sequence = Arc::new(Sequence::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let sequence = sequence.clone();
            handles.push(std::thread::spawn(move || {
                (0..1000).map(|_| sequence.next()).collect::<Vec<_>>()
            }));
        }
        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(value != 0);
                assert!(seen.insert(value), "duplicate sequence {value}");
            }
        }
    }
}
