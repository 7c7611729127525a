//! Error types for the password hashing core.
//!
//! The hashing pipeline itself never fails once a request is accepted. The
//! only errors live at its edges:
//!
//! - `InvalidRequestId`: a caller-supplied identifier is not a base-10
//!   unsigned integer.
//! - `DrainTimeout`: deferred tasks were still running when a drain deadline
//!   expired.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the hashing core.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The identifier could not be parsed as a non-negative integer.
    #[error("Invalid request id: {input:?}")]
    InvalidRequestId { input: String },

    /// Deferred hashing tasks did not finish before the drain deadline.
    #[error("Drain timed out with {remaining} task(s) still in flight")]
    DrainTimeout { remaining: usize },
}
