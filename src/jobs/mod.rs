//! Work partitioning
//!
//! Workers obtain mutually exclusive warehouse indices from a shared
//! [`JobQueue`]. The queue is a bounded monotonic counter: every index in
//! `[0, total_units]` is issued exactly once, in non-decreasing order, and
//! once the range is exhausted every further claim (including from workers
//! that start late) observes exhaustion.
//!
//! Index 0 is issued but carries no work; it is the reserved "warehouse
//! zero" of the external numbering scheme and the caller skips it.
//!
//! Claims never block: a claim is a single atomic compare-and-increment and
//! returns immediately.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared claim counter for warehouse units.
///
/// # Example
///
/// ```
/// use benchload::jobs::JobQueue;
///
/// let jobs = JobQueue::new(2);
/// assert_eq!(jobs.claim(), Some(0)); // sentinel, skipped by workers
/// assert_eq!(jobs.claim(), Some(1));
/// assert_eq!(jobs.claim(), Some(2));
/// assert_eq!(jobs.claim(), None);
/// assert_eq!(jobs.claim(), None);
/// ```
#[derive(Debug)]
pub struct JobQueue {
    next: AtomicU64,
    total_units: u64,
}

impl JobQueue {
    /// Create a queue issuing indices `0..=total_units`.
    pub fn new(total_units: u64) -> Self {
        Self {
            next: AtomicU64::new(0),
            total_units,
        }
    }

    /// Claim the next unit index, or `None` once the range is exhausted.
    ///
    /// No two callers ever receive the same index. The counter is capped at
    /// `total_units + 1`, so exhaustion is stable no matter how many claims
    /// follow.
    pub fn claim(&self) -> Option<u64> {
        self.next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                if next > self.total_units {
                    None
                } else {
                    Some(next + 1)
                }
            })
            .ok()
    }

    /// Upper bound of the index range this queue issues.
    pub fn total_units(&self) -> u64 {
        self.total_units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_claims_sequential() {
        let jobs = JobQueue::new(3);
        let claimed: Vec<_> = std::iter::from_fn(|| jobs.claim()).collect();
        assert_eq!(claimed, vec![0, 1, 2, 3]);
        assert_eq!(jobs.claim(), None);
    }

    #[test]
    fn test_zero_units_issues_only_sentinel() {
        let jobs = JobQueue::new(0);
        assert_eq!(jobs.claim(), Some(0));
        assert_eq!(jobs.claim(), None);
    }

    #[test]
    fn test_exhaustion_is_stable() {
        let jobs = JobQueue::new(1);
        while jobs.claim().is_some() {}
        for _ in 0..100 {
            assert_eq!(jobs.claim(), None);
        }
    }

    #[test]
    fn test_concurrent_claims_unique_and_complete() {
        let jobs = Arc::new(JobQueue::new(3));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let jobs = Arc::clone(&jobs);
            handles.push(std::thread::spawn(move || {
                let mut mine = Vec::new();
                while let Some(unit) = jobs.claim() {
                    mine.push(unit);
                }
                mine
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().expect("claimer thread panicked"));
        }

        let unique: HashSet<_> = all.iter().copied().collect();
        assert_eq!(all.len(), 4, "each index issued exactly once");
        assert_eq!(unique, HashSet::from([0, 1, 2, 3]));
        assert_eq!(jobs.claim(), None);
    }

    #[test]
    fn test_concurrent_claims_larger_range() {
        let jobs = Arc::new(JobQueue::new(500));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let jobs = Arc::clone(&jobs);
            handles.push(std::thread::spawn(move || {
                let mut count = 0u64;
                while jobs.claim().is_some() {
                    count += 1;
                }
                count
            }));
        }

        let total: u64 = handles
            .into_iter()
            .map(|h| h.join().expect("claimer thread panicked"))
            .sum();
        assert_eq!(total, 501);
    }
}
