//! Lock-free running average of hashing latency.
//!
//! The accumulator keeps three independent atomics: the number of completed
//! requests, the cumulative processing time, and the last published average.
//! A completion bumps the count, then the total, then publishes
//! `total / count` using the values it observed itself.
//!
//! ## Consistency
//!
//! Because the count and the total are updated by separate atomic operations,
//! two completions racing each other can publish an average computed from a
//! `(total, count)` pair that never coexisted. For example, with completions A
//! and B interleaving as `A.count, B.count, B.total, A.total`, B publishes
//! `dB / 2` while A's duration is not yet in the total. The published average
//! converges on the next uncontended completion, and each field is always
//! individually consistent (no torn reads). Readers that need an exact mean
//! should compute it from [`RunningAverage::total_micros`] and
//! [`Stats::total`] once traffic is quiescent.

use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;

/// Snapshot of processing statistics as exposed to clients.
///
/// Serializes to `{"total": <completed>, "average": <micros>}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Number of requests whose digest has been stored.
    pub total: u64,
    /// Average processing time in microseconds (floored).
    pub average: u64,
}

/// Cumulative average of completion durations, updated without locks.
#[derive(Debug, Default)]
pub struct RunningAverage {
    completed: AtomicU64,
    total_micros: AtomicU64,
    average: AtomicU64,
}

impl RunningAverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an accumulator that behaves as though `completed` requests
    /// totalling `total_micros` had already been recorded.
    pub fn with_seed(completed: u64, total_micros: u64) -> Self {
        let average = total_micros.checked_div(completed).unwrap_or(0);
        Self {
            completed: AtomicU64::new(completed),
            total_micros: AtomicU64::new(total_micros),
            average: AtomicU64::new(average),
        }
    }

    /// Folds one completion into the running average and returns the average
    /// this call published.
    pub fn record_completion(&self, duration_micros: u64) -> u64 {
        let count = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        let total = self
            .total_micros
            .fetch_add(duration_micros, Ordering::AcqRel)
            .wrapping_add(duration_micros);
        let average = total / count;
        self.average.store(average, Ordering::Release);

        #[cfg(feature = "tracing")]
        tracing::debug!(count, total, average, "updated average processing time");

        average
    }

    /// Number of completions recorded so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    /// Sum of every recorded duration, in microseconds.
    pub fn total_micros(&self) -> u64 {
        self.total_micros.load(Ordering::Acquire)
    }

    /// Last published average, in microseconds.
    pub fn average(&self) -> u64 {
        self.average.load(Ordering::Acquire)
    }

    /// Reads the count and the published average independently.
    ///
    /// Each field is consistent on its own; the pair is not a joint snapshot.
    pub fn snapshot(&self) -> Stats {
        Stats {
            total: self.completed(),
            average: self.average(),
        }
    }
}
