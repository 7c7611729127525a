use crate::{Error, Result};
use core::{fmt, str::FromStr};
use portable_atomic::{AtomicU64, Ordering};
use serde::Serialize;

/// Identifier handed back to a client when a hash request is accepted.
///
/// IDs are assigned at acceptance time, strictly increase, and are never
/// reused for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for RequestId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = Error;

    /// Parses a base-10 unsigned integer.
    ///
    /// Unlike [`u64::from_str`], a leading `+` is rejected: only ASCII digits
    /// are accepted.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidRequestId {
            input: s.to_string(),
        };
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        s.parse::<u64>().map(Self).map_err(|_| invalid())
    }
}

/// Lock-free allocator of monotonically increasing [`RequestId`]s.
///
/// Every call to [`next`](Self::next) performs a single atomic `fetch_add`, so
/// concurrent callers never observe the same value and no value is skipped.
///
/// # Example
/// ```
/// use pwhash::RequestIdAllocator;
///
/// let ids = RequestIdAllocator::new(4);
/// assert_eq!(ids.next().to_raw(), 5);
/// assert_eq!(ids.next().to_raw(), 6);
/// ```
#[derive(Debug, Default)]
pub struct RequestIdAllocator {
    last: AtomicU64,
}

impl RequestIdAllocator {
    /// Creates an allocator whose first [`next`](Self::next) returns
    /// `last + 1`.
    pub const fn new(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Allocates the next identifier.
    pub fn next(&self) -> RequestId {
        // Wraps on overflow, which would take centuries at any realistic rate.
        RequestId(self.last.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
    }

    /// Returns the most recently allocated raw value (or the seed if nothing
    /// has been allocated yet).
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}
