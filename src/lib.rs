//! # A storage engine for matrices and vectors
//!
//! A family of interchangeable backing representations for matrices and vectors of a generic
//! scalar type: dense (flat column-major buffer), compressed sparse (row-compressed index and
//! value arrays) and diagonal (a single array for the main diagonal). A uniform set of structural
//! operations works across any pair of representations: reading and writing single elements,
//! clearing, copying, transposing, mapping, folding, searching and comparing.
//!
//! This crate stores and rearranges values; it does no arithmetic beyond the additive identity and
//! the `add` used to merge duplicate entries, both supplied through [`num_traits::Zero`]. Callers
//! choose a representation explicitly at construction time and drive it through the bounds-checked
//! methods of [`VectorStorage`] and [`MatrixStorage`].
//!
//! ## Synchronization
//!
//! All operations are synchronous and CPU-bound, and no internal locking is done. Mutating a
//! sparse representation is a multi-step shift or resize sequence, so instances shared across
//! threads must be serialized externally by the caller. Read-only access from multiple threads at
//! once is safe as long as no writer is present.
//!
//! Constructors that accept caller-supplied buffers take ownership without defensive copying.
#![warn(missing_docs)]

pub mod error;
pub mod matrix;
pub mod traits;
pub mod vector;

mod buffer;
mod utilities;

pub use error::Error;
pub use matrix::{DenseMatrix, DiagonalMatrix, MatrixStorage, SparseMatrix};
pub use vector::{DenseVector, SparseVector, VectorStorage};

/// A (index, value) combination as stored by the sparse back-ends.
pub type SparseTuple<T> = (usize, T);

/// Whether a copy or map destination must be zeroed out before it is written to.
///
/// A sparse-to-sparse copy can avoid an unnecessary full-zero pass over the target when the caller
/// guarantees that the target holds no data of interest.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExistingData {
    /// Zero the target (or the targeted region) before writing.
    Clear,
    /// The caller guarantees the target is already zero, or that stale values are irrelevant.
    Skip,
}

/// Whether a combinator may leave implicit (unstored) zero elements untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Zeros {
    /// The implementation may avoid invoking the function on implicit zeros.
    ///
    /// Only correct when the function maps zero to zero; this is the caller's responsibility.
    AllowSkip,
    /// Evaluate the function at every logical cell.
    ///
    /// This turns a pass over a sparse operand into an effectively dense one.
    NoSkip,
}
