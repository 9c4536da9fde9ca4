//! # Diagonal matrix storage
//!
//! A single array of length `min(nr_rows, nr_columns)` for the main diagonal. Off-diagonal
//! elements are implicitly zero and can never hold anything else; writes that would break that
//! invariant fail fast instead of materializing an incorrect result.
use crate::error::Error;
use crate::matrix::MatrixStorage;
use crate::traits::Scalar;

/// Stores the main diagonal only.
///
/// The matrix may be rectangular; the diagonal then ends at the shorter dimension.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diagonal<T> {
    nr_rows: usize,
    nr_columns: usize,
    pub(crate) data: Vec<T>,
}

impl<T: Scalar> Diagonal<T> {
    /// Create a matrix with a zero diagonal.
    pub fn new(nr_rows: usize, nr_columns: usize) -> Self {
        Self { nr_rows, nr_columns, data: vec![T::zero(); nr_rows.min(nr_columns)] }
    }

    /// Create a matrix from its diagonal.
    ///
    /// # Arguments
    ///
    /// * `nr_rows`, `nr_columns`: Dimensions of the matrix represented.
    /// * `data`: The diagonal; its length must be exactly `min(nr_rows, nr_columns)`. Ownership
    /// is taken, no defensive copy is made.
    pub fn from_diagonal(nr_rows: usize, nr_columns: usize, data: Vec<T>) -> Result<Self, Error> {
        if data.len() != nr_rows.min(nr_columns) {
            return Err(Error::buffer_length(nr_rows.min(nr_columns), data.len()));
        }

        Ok(Self { nr_rows, nr_columns, data })
    }

    /// Create a matrix by evaluating a function along the diagonal.
    pub fn from_fn(nr_rows: usize, nr_columns: usize, f: impl FnMut(usize) -> T) -> Self {
        Self { nr_rows, nr_columns, data: (0..nr_rows.min(nr_columns)).map(f).collect() }
    }

    /// Create a diagonal copy of a storage of any representation.
    ///
    /// Fails when the source holds a non-zero value off the diagonal, which this representation
    /// cannot store.
    pub fn try_of_storage(storage: &MatrixStorage<T>) -> Result<Self, Error> {
        let mut matrix = Self::new(storage.nr_rows(), storage.nr_columns());
        for (i, j, value) in storage.iter_non_zero() {
            matrix.set_unchecked(i, j, value.clone())?;
        }

        Ok(matrix)
    }

    /// Number of rows represented.
    pub fn nr_rows(&self) -> usize {
        self.nr_rows
    }

    /// Number of columns represented.
    pub fn nr_columns(&self) -> usize {
        self.nr_columns
    }

    /// Length of the stored diagonal, the shorter of the two dimensions.
    pub fn diagonal_len(&self) -> usize {
        self.data.len()
    }

    /// A view of the stored diagonal.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The stored diagonal.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub(crate) fn get_unchecked(&self, i: usize, j: usize) -> T {
        debug_assert!(i < self.nr_rows);
        debug_assert!(j < self.nr_columns);

        if i == j {
            self.data[i].clone()
        } else {
            T::zero()
        }
    }

    /// Write a value; off the diagonal only zero can be "stored".
    pub(crate) fn set_unchecked(&mut self, i: usize, j: usize, value: T) -> Result<(), Error> {
        debug_assert!(i < self.nr_rows);
        debug_assert!(j < self.nr_columns);

        if i == j {
            self.data[i] = value;
            Ok(())
        } else if value.is_zero() {
            Ok(())
        } else {
            Err(Error::InvalidMutation(format!(
                "cannot store a non-zero value at off-diagonal cell ({}, {}) of a diagonal matrix",
                i, j,
            )))
        }
    }

    /// Zero the entire diagonal.
    pub(crate) fn clear(&mut self) {
        for value in &mut self.data {
            *value = T::zero();
        }
    }

    /// Zero the diagonal cells that fall within a rectangular block.
    pub(crate) fn clear_block(&mut self, row: usize, nr_rows: usize, column: usize, nr_columns: usize) {
        debug_assert!(row + nr_rows <= self.nr_rows);
        debug_assert!(column + nr_columns <= self.nr_columns);

        let start = row.max(column);
        let end = (row + nr_rows).min(column + nr_columns).min(self.data.len());
        for i in start..end {
            self.data[i] = T::zero();
        }
    }

    /// Zero the diagonal cells of the given rows (or, symmetrically, columns).
    pub(crate) fn clear_diagonal_indices(&mut self, indices: &[usize]) {
        for &i in indices {
            if i < self.data.len() {
                self.data[i] = T::zero();
            }
        }
    }

    /// The transpose: swapped dimensions, same diagonal.
    pub(crate) fn transposed(&self) -> Self {
        Self { nr_rows: self.nr_columns, nr_columns: self.nr_rows, data: self.data.clone() }
    }
}
