//! # Error reporting for storage operations
//!
//! All failures are synchronous, non-retryable contract violations. They are surfaced to the
//! caller before any part of the operation executes; the engine never retries and never silently
//! degrades shape or precision.
use std::error;
use std::fmt;
use std::fmt::Display;

/// An `Error` is created when a storage operation is invoked outside of its contract.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    /// An index lies outside the declared shape of a storage.
    ///
    /// Checked in the bounds-checked public wrappers before any unchecked primitive executes.
    OutOfRange(String),
    /// Operand shapes disagree for a copy, map, fold or transpose-target operation.
    DimensionMismatch(String),
    /// A write that the representation cannot store.
    ///
    /// For example a non-zero value at an off-diagonal cell of a diagonal storage, or a map that
    /// would have to materialize non-zero values off the diagonal.
    InvalidMutation(String),
    /// A requested sparse structure is not representable.
    ///
    /// Either its cell count exceeds the addressable capacity, or supplied compressed arrays do
    /// not describe a compressed-row layout.
    Unsupported(String),
}

impl Error {
    /// An index was out of bounds.
    ///
    /// # Arguments
    ///
    /// * `axis`: Name of the violated dimension, e.g. `"row"`.
    /// * `index`: The offending index.
    /// * `limit`: Number of valid indices along the axis.
    pub(crate) fn index(axis: &str, index: usize, limit: usize) -> Self {
        Self::OutOfRange(format!("{} index {} out of range for size {}", axis, index, limit))
    }

    /// A range `[start, start + count)` was not contained in `[0, limit)`.
    pub(crate) fn range(axis: &str, start: usize, count: usize, limit: usize) -> Self {
        Self::OutOfRange(format!(
            "{} range [{}, {}) out of range for size {}",
            axis, start, start + count, limit,
        ))
    }

    /// Two operand shapes disagree.
    pub(crate) fn shapes(expected: impl Display, found: impl Display) -> Self {
        Self::DimensionMismatch(format!("operand shapes disagree: {} versus {}", expected, found))
    }

    /// A buffer length does not match the shape it should describe.
    pub(crate) fn buffer_length(expected: usize, found: usize) -> Self {
        Self::DimensionMismatch(format!("buffer of length {} where {} values are needed", found, expected))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::OutOfRange(description) => write!(f, "OutOfRange: {}", description),
            Self::DimensionMismatch(description) => write!(f, "DimensionMismatch: {}", description),
            Self::InvalidMutation(description) => write!(f, "InvalidMutation: {}", description),
            Self::Unsupported(description) => write!(f, "Unsupported: {}", description),
        }
    }
}

impl error::Error for Error {
}
