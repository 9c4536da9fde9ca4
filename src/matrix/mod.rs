//! # Matrix storage
//!
//! Dense, compressed sparse and diagonal backing representations behind one bounds-checked
//! facade. When the representations of two operands combine well the facade picks an optimized
//! code path (dense with dense, sparse with sparse, sparse with dense, diagonal with anything);
//! otherwise it falls back to a correct element-wise loop over the unchecked accessors.
use std::hash::{Hash, Hasher};
use std::mem;

use itertools::EitherOrBoth;
use itertools::Itertools;
use itertools::repeat_n;

use crate::{ExistingData, Zeros};
use crate::error::Error;
use crate::traits::Scalar;
use crate::utilities::HASH_SAMPLE_SIZE;
use crate::vector::VectorStorage;

pub use dense::Dense as DenseMatrix;
pub use diagonal::Diagonal as DiagonalMatrix;
pub use sparse::Sparse as SparseMatrix;

mod dense;
mod diagonal;
mod sparse;

/// The closed set of matrix backing representations.
///
/// All operations are available on any representation; each variant only changes how elements are
/// stored, which code paths are fast, and — for the diagonal back-end — which mutations are
/// representable. Shape is fixed for the lifetime of an instance.
#[derive(Debug, Clone)]
pub enum MatrixStorage<T> {
    /// Flat column-major buffer with every logical cell explicit, O(1) access.
    Dense(DenseMatrix<T>),
    /// Compressed-row storage with binary-search access within each row.
    Sparse(SparseMatrix<T>),
    /// A single array for the main diagonal; off-diagonal cells are always zero.
    Diagonal(DiagonalMatrix<T>),
}

impl<T: Scalar> MatrixStorage<T> {
    /// A dense matrix owning the provided column-major buffer.
    pub fn dense(nr_rows: usize, nr_columns: usize, data: Vec<T>) -> Result<Self, Error> {
        DenseMatrix::new(nr_rows, nr_columns, data).map(Self::Dense)
    }

    /// A dense matrix of zeros.
    pub fn dense_zero(nr_rows: usize, nr_columns: usize) -> Self {
        Self::Dense(DenseMatrix::zero(nr_rows, nr_columns))
    }

    /// A compressed-row matrix from coordinate-format triples.
    ///
    /// See [`SparseMatrix::from_triples`] for the normalization applied.
    pub fn sparse(
        nr_rows: usize,
        nr_columns: usize,
        triples: Vec<(usize, usize, T)>,
    ) -> Result<Self, Error> {
        SparseMatrix::from_triples(nr_rows, nr_columns, triples).map(Self::Sparse)
    }

    /// A compressed-row matrix without any stored entries.
    pub fn sparse_zero(nr_rows: usize, nr_columns: usize) -> Result<Self, Error> {
        SparseMatrix::zero(nr_rows, nr_columns).map(Self::Sparse)
    }

    /// A diagonal matrix from its diagonal.
    pub fn diagonal(nr_rows: usize, nr_columns: usize, data: Vec<T>) -> Result<Self, Error> {
        DiagonalMatrix::from_diagonal(nr_rows, nr_columns, data).map(Self::Diagonal)
    }

    /// A diagonal matrix with a zero diagonal.
    pub fn diagonal_zero(nr_rows: usize, nr_columns: usize) -> Self {
        Self::Diagonal(DiagonalMatrix::new(nr_rows, nr_columns))
    }

    /// Number of rows represented.
    pub fn nr_rows(&self) -> usize {
        match self {
            Self::Dense(matrix) => matrix.nr_rows(),
            Self::Sparse(matrix) => matrix.nr_rows(),
            Self::Diagonal(matrix) => matrix.nr_rows(),
        }
    }

    /// Number of columns represented.
    pub fn nr_columns(&self) -> usize {
        match self {
            Self::Dense(matrix) => matrix.nr_columns(),
            Self::Sparse(matrix) => matrix.nr_columns(),
            Self::Diagonal(matrix) => matrix.nr_columns(),
        }
    }

    /// Representation tag: `true` for the dense back-end.
    pub fn is_dense(&self) -> bool {
        matches!(self, Self::Dense(_))
    }

    /// Retrieve the value at a cell.
    pub fn get(&self, i: usize, j: usize) -> Result<T, Error> {
        self.check_cell(i, j)?;

        Ok(self.get_unchecked(i, j))
    }

    /// Set the value at a cell.
    ///
    /// On the sparse back-end this can be an expensive operation; on the diagonal back-end a
    /// non-zero value off the diagonal is an invalid mutation.
    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<(), Error> {
        self.check_cell(i, j)?;

        self.set_unchecked(i, j, value)
    }

    fn check_cell(&self, i: usize, j: usize) -> Result<(), Error> {
        if i >= self.nr_rows() {
            return Err(Error::index("row", i, self.nr_rows()));
        }
        if j >= self.nr_columns() {
            return Err(Error::index("column", j, self.nr_columns()));
        }

        Ok(())
    }

    fn check_same_shape<U: Scalar>(&self, other: &MatrixStorage<U>) -> Result<(), Error> {
        if self.nr_rows() != other.nr_rows() || self.nr_columns() != other.nr_columns() {
            return Err(Error::shapes(
                format!("{}x{}", self.nr_rows(), self.nr_columns()),
                format!("{}x{}", other.nr_rows(), other.nr_columns()),
            ));
        }

        Ok(())
    }

    pub(crate) fn get_unchecked(&self, i: usize, j: usize) -> T {
        match self {
            Self::Dense(matrix) => matrix.get_unchecked(i, j),
            Self::Sparse(matrix) => matrix.get_unchecked(i, j),
            Self::Diagonal(matrix) => matrix.get_unchecked(i, j),
        }
    }

    pub(crate) fn set_unchecked(&mut self, i: usize, j: usize, value: T) -> Result<(), Error> {
        match self {
            Self::Dense(matrix) => {
                matrix.set_unchecked(i, j, value);
                Ok(())
            },
            Self::Sparse(matrix) => {
                matrix.set_unchecked(i, j, value);
                Ok(())
            },
            Self::Diagonal(matrix) => matrix.set_unchecked(i, j, value),
        }
    }

    /// Zero out the entire matrix.
    pub fn clear(&mut self) {
        match self {
            Self::Dense(matrix) => {
                let (nr_rows, nr_columns) = (matrix.nr_rows(), matrix.nr_columns());
                matrix.clear_block(0, nr_rows, 0, nr_columns);
            },
            Self::Sparse(matrix) => matrix.clear(),
            Self::Diagonal(matrix) => matrix.clear(),
        }
    }

    /// Zero out all elements of the given rows.
    pub fn clear_rows(&mut self, rows: &[usize]) -> Result<(), Error> {
        for &i in rows {
            if i >= self.nr_rows() {
                return Err(Error::index("row", i, self.nr_rows()));
            }
        }

        match self {
            Self::Dense(matrix) => {
                for &i in rows {
                    for j in 0..matrix.nr_columns() {
                        matrix.set_unchecked(i, j, T::zero());
                    }
                }
            },
            Self::Sparse(matrix) => matrix.clear_rows(rows),
            Self::Diagonal(matrix) => matrix.clear_diagonal_indices(rows),
        }

        Ok(())
    }

    /// Zero out all elements of the given columns.
    pub fn clear_columns(&mut self, columns: &[usize]) -> Result<(), Error> {
        for &j in columns {
            if j >= self.nr_columns() {
                return Err(Error::index("column", j, self.nr_columns()));
            }
        }

        match self {
            Self::Dense(matrix) => {
                for &j in columns {
                    for i in 0..matrix.nr_rows() {
                        matrix.set_unchecked(i, j, T::zero());
                    }
                }
            },
            Self::Sparse(matrix) => matrix.clear_columns(columns),
            Self::Diagonal(matrix) => matrix.clear_diagonal_indices(columns),
        }

        Ok(())
    }

    /// Zero out a rectangular block.
    pub fn clear_block(
        &mut self,
        row: usize,
        nr_rows: usize,
        column: usize,
        nr_columns: usize,
    ) -> Result<(), Error> {
        self.check_block(row, nr_rows, column, nr_columns, "")?;

        self.clear_block_unchecked(row, nr_rows, column, nr_columns);
        Ok(())
    }

    fn check_block(
        &self,
        row: usize,
        nr_rows: usize,
        column: usize,
        nr_columns: usize,
        role: &str,
    ) -> Result<(), Error> {
        if nr_rows > self.nr_rows() || row > self.nr_rows() - nr_rows {
            return Err(Error::range(&format!("{}row", role), row, nr_rows, self.nr_rows()));
        }
        if nr_columns > self.nr_columns() || column > self.nr_columns() - nr_columns {
            return Err(Error::range(&format!("{}column", role), column, nr_columns, self.nr_columns()));
        }

        Ok(())
    }

    pub(crate) fn clear_block_unchecked(&mut self, row: usize, nr_rows: usize, column: usize, nr_columns: usize) {
        match self {
            Self::Dense(matrix) => matrix.clear_block(row, nr_rows, column, nr_columns),
            Self::Sparse(matrix) => matrix.clear_block(row, nr_rows, column, nr_columns),
            Self::Diagonal(matrix) => matrix.clear_block(row, nr_rows, column, nr_columns),
        }
    }

    /// Copy all elements into a target of the same shape.
    ///
    /// Fast paths exist for dense into dense, sparse into sparse, sparse and dense mixed, and the
    /// diagonal back-end against anything; copying a source with off-diagonal non-zeros into a
    /// diagonal target is an invalid mutation and is rejected before the target is touched.
    ///
    /// # Arguments
    ///
    /// * `target`: Storage of any representation with the same shape.
    /// * `existing`: Whether the target must be zeroed before writing; a sparse-to-sparse copy
    /// replaces the target's arrays wholesale and never needs the zero pass.
    pub fn copy_to(&self, target: &mut Self, existing: ExistingData) -> Result<(), Error> {
        self.check_same_shape(target)?;

        match (self, target) {
            (Self::Dense(source), Self::Dense(target)) => {
                target.data.clone_from_slice(&source.data);
            },
            (Self::Sparse(source), Self::Sparse(target)) => {
                *target = source.clone();
            },
            (Self::Sparse(source), Self::Dense(target)) => {
                if existing == ExistingData::Clear {
                    let (nr_rows, nr_columns) = (target.nr_rows(), target.nr_columns());
                    target.clear_block(0, nr_rows, 0, nr_columns);
                }
                for (i, j, value) in source.entries() {
                    target.set_unchecked(i, j, value.clone());
                }
            },
            (Self::Dense(source), Self::Sparse(target)) => {
                let mut row_pointers = Vec::with_capacity(source.nr_rows() + 1);
                row_pointers.push(0);
                let mut indices = Vec::new();
                let mut values = Vec::new();
                for i in 0..source.nr_rows() {
                    for j in 0..source.nr_columns() {
                        let value = source.get_unchecked(i, j);
                        if !value.is_zero() {
                            indices.push(j);
                            values.push(value);
                        }
                    }
                    row_pointers.push(indices.len());
                }
                target.set_structure(row_pointers, indices, values);
            },
            (Self::Diagonal(source), Self::Diagonal(target)) => {
                target.data.clone_from_slice(&source.data);
            },
            (Self::Diagonal(source), target) => {
                if existing == ExistingData::Clear {
                    target.clear();
                }
                for (i, value) in source.data.iter().enumerate() {
                    if !value.is_zero() {
                        // Writing onto the diagonal, always representable.
                        target.set_unchecked(i, i, value.clone())?;
                    }
                }
            },
            (source, Self::Diagonal(target)) => {
                source.check_diagonal_pattern()?;
                for i in 0..target.data.len() {
                    target.data[i] = source.get_unchecked(i, i);
                }
            },
        }

        Ok(())
    }

    /// Fail when any off-diagonal element is non-zero, before a diagonal target is written.
    fn check_diagonal_pattern(&self) -> Result<(), Error> {
        for (i, j, _) in self.iter_non_zero() {
            if i != j {
                return Err(Error::InvalidMutation(format!(
                    "cannot copy a matrix with a non-zero value at off-diagonal cell ({}, {}) \
                     into diagonal storage",
                    i, j,
                )));
            }
        }

        Ok(())
    }

    /// Copy a rectangular block into a target, with independent source and target offsets.
    ///
    /// All four ranges are validated up front.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_sub_matrix_to(
        &self,
        target: &mut Self,
        source_row: usize,
        target_row: usize,
        nr_rows: usize,
        source_column: usize,
        target_column: usize,
        nr_columns: usize,
        existing: ExistingData,
    ) -> Result<(), Error> {
        self.check_block(source_row, nr_rows, source_column, nr_columns, "source ")?;
        target.check_block(target_row, nr_rows, target_column, nr_columns, "target ")?;
        if nr_rows == 0 || nr_columns == 0 {
            return Ok(());
        }

        match (self, target) {
            (Self::Dense(source), Self::Dense(target)) => {
                for offset in 0..nr_columns {
                    let from = source.index(source_row, source_column + offset);
                    let to = target.index(target_row, target_column + offset);
                    target.data[to..(to + nr_rows)]
                        .clone_from_slice(&source.data[from..(from + nr_rows)]);
                }
            },
            (Self::Sparse(source), Self::Sparse(target)) => {
                target.splice_block_from(
                    source,
                    source_row, target_row, nr_rows,
                    source_column, target_column, nr_columns,
                );
            },
            (source, target) => {
                if existing == ExistingData::Clear {
                    target.clear_block_unchecked(target_row, nr_rows, target_column, nr_columns);
                }
                for i in 0..nr_rows {
                    for j in 0..nr_columns {
                        let value = source.get_unchecked(source_row + i, source_column + j);
                        if !value.is_zero() {
                            target.set_unchecked(target_row + i, target_column + j, value)?;
                        }
                    }
                }
            },
        }

        Ok(())
    }

    /// Copy one row into a vector of length [`Self::nr_columns`], overwriting it entirely.
    pub fn copy_row_to(&self, i: usize, target: &mut VectorStorage<T>) -> Result<(), Error> {
        if i >= self.nr_rows() {
            return Err(Error::index("row", i, self.nr_rows()));
        }
        if target.len() != self.nr_columns() {
            return Err(Error::shapes(self.nr_columns(), target.len()));
        }

        match (self, target) {
            (Self::Sparse(matrix), VectorStorage::Sparse(vector)) => {
                let (columns, values) = matrix.row(i);
                vector.set_entries(columns.to_vec(), values.to_vec());
            },
            (Self::Dense(matrix), VectorStorage::Dense(vector)) => {
                for j in 0..matrix.nr_columns() {
                    vector.set_unchecked(j, matrix.get_unchecked(i, j));
                }
            },
            (matrix, vector) => {
                vector.clear();
                for j in 0..matrix.nr_columns() {
                    let value = matrix.get_unchecked(i, j);
                    if !value.is_zero() {
                        vector.set_unchecked(j, value);
                    }
                }
            },
        }

        Ok(())
    }

    /// Copy one column into a vector of length [`Self::nr_rows`], overwriting it entirely.
    pub fn copy_column_to(&self, j: usize, target: &mut VectorStorage<T>) -> Result<(), Error> {
        if j >= self.nr_columns() {
            return Err(Error::index("column", j, self.nr_columns()));
        }
        if target.len() != self.nr_rows() {
            return Err(Error::shapes(self.nr_rows(), target.len()));
        }

        match (self, target) {
            (Self::Dense(matrix), VectorStorage::Dense(vector)) => {
                // A column of the column-major buffer is contiguous.
                let start = matrix.index(0, j);
                let nr_rows = matrix.nr_rows();
                vector.data.clone_from_slice(&matrix.data[start..(start + nr_rows)]);
            },
            (matrix, vector) => {
                vector.clear();
                for i in 0..matrix.nr_rows() {
                    let value = matrix.get_unchecked(i, j);
                    if !value.is_zero() {
                        vector.set_unchecked(i, value);
                    }
                }
            },
        }

        Ok(())
    }

    /// Write the transpose into a target with the swapped shape.
    pub fn transpose_to(&self, target: &mut Self) -> Result<(), Error> {
        if self.nr_rows() != target.nr_columns() || self.nr_columns() != target.nr_rows() {
            return Err(Error::shapes(
                format!("{}x{}", self.nr_columns(), self.nr_rows()),
                format!("{}x{}", target.nr_rows(), target.nr_columns()),
            ));
        }

        match (self, target) {
            (Self::Dense(source), Self::Dense(target)) => {
                target.data = source.transposed().data;
            },
            (Self::Sparse(source), Self::Sparse(target)) => {
                *target = source.transposed();
            },
            (Self::Diagonal(source), Self::Diagonal(target)) => {
                target.data.clone_from_slice(&source.data);
            },
            (source, target) => {
                target.clear();
                for (i, j, value) in source.iter_non_zero() {
                    target.set_unchecked(j, i, value.clone())?;
                }
            },
        }

        Ok(())
    }

    /// Transpose a square matrix in place.
    pub fn transpose_inplace(&mut self) -> Result<(), Error> {
        if self.nr_rows() != self.nr_columns() {
            return Err(Error::shapes(
                format!("{0}x{0}", self.nr_rows()),
                format!("{}x{}", self.nr_rows(), self.nr_columns()),
            ));
        }

        match self {
            Self::Dense(matrix) => matrix.transpose_square_inplace(),
            Self::Sparse(matrix) => *matrix = matrix.transposed(),
            // A square diagonal matrix is its own transpose.
            Self::Diagonal(_) => {},
        }

        Ok(())
    }

    /// Apply a function to every element in place.
    ///
    /// # Arguments
    ///
    /// * `f`: Replacement function.
    /// * `zeros`: With [`Zeros::AllowSkip`] the function may not be invoked on implicit zeros,
    /// which is only correct when `f` maps zero to zero. Sparse entries whose result is zero are
    /// physically dropped. With [`Zeros::NoSkip`] on a diagonal matrix the function is probed at
    /// zero first: a non-zero image cannot be materialized off the diagonal and fails fast.
    pub fn map_inplace(&mut self, mut f: impl FnMut(T) -> T, zeros: Zeros) -> Result<(), Error> {
        match self {
            Self::Dense(matrix) => {
                for value in &mut matrix.data {
                    *value = f(mem::replace(value, T::zero()));
                }
                Ok(())
            },
            Self::Sparse(matrix) => {
                match zeros {
                    Zeros::AllowSkip => matrix.map_stored(&mut |_, _, value| f(value)),
                    Zeros::NoSkip => matrix.map_all(&mut |_, _, value| f(value)),
                }
                Ok(())
            },
            Self::Diagonal(matrix) => {
                if zeros == Zeros::NoSkip {
                    let image = f(T::zero());
                    if !image.is_zero() {
                        return Err(Error::InvalidMutation(format!(
                            "the function maps zero to {}, which cannot be materialized off the diagonal",
                            image,
                        )));
                    }
                }
                for value in &mut matrix.data {
                    *value = f(mem::replace(value, T::zero()));
                }
                Ok(())
            },
        }
    }

    /// Apply an index-aware function to every element in place.
    ///
    /// On a diagonal matrix [`Zeros::NoSkip`] is rejected outright: an indexed function cannot be
    /// probed for zero-preservation at every off-diagonal cell without materializing the result.
    pub fn map_indexed_inplace(
        &mut self,
        mut f: impl FnMut(usize, usize, T) -> T,
        zeros: Zeros,
    ) -> Result<(), Error> {
        match self {
            Self::Dense(matrix) => {
                let nr_rows = matrix.nr_rows();
                for (position, value) in matrix.data.iter_mut().enumerate() {
                    let (i, j) = (position % nr_rows, position / nr_rows);
                    *value = f(i, j, mem::replace(value, T::zero()));
                }
                Ok(())
            },
            Self::Sparse(matrix) => {
                match zeros {
                    Zeros::AllowSkip => matrix.map_stored(&mut f),
                    Zeros::NoSkip => matrix.map_all(&mut f),
                }
                Ok(())
            },
            Self::Diagonal(matrix) => {
                if zeros == Zeros::NoSkip {
                    return Err(Error::InvalidMutation(
                        "an indexed map over all cells of a diagonal matrix cannot be verified to \
                         preserve its off-diagonal zeros".to_string(),
                    ));
                }
                for (i, value) in matrix.data.iter_mut().enumerate() {
                    *value = f(i, i, mem::replace(value, T::zero()));
                }
                Ok(())
            },
        }
    }

    /// Apply a function to every element, writing the results into a target of the same shape.
    ///
    /// The target may store a different scalar type. A diagonal target rejects results it cannot
    /// represent.
    pub fn map_to<U: Scalar>(
        &self,
        target: &mut MatrixStorage<U>,
        mut f: impl FnMut(T) -> U,
        zeros: Zeros,
        existing: ExistingData,
    ) -> Result<(), Error> {
        self.check_same_shape(target)?;

        match (self, target) {
            (Self::Dense(source), MatrixStorage::Dense(target)) => {
                for (from, to) in source.data.iter().zip(&mut target.data) {
                    *to = f(from.clone());
                }
            },
            (Self::Sparse(source), MatrixStorage::Sparse(target)) if zeros == Zeros::AllowSkip => {
                let mut row_pointers = Vec::with_capacity(source.nr_rows() + 1);
                row_pointers.push(0);
                let mut indices = Vec::new();
                let mut values = Vec::new();
                for i in 0..source.nr_rows() {
                    let (columns, row_values) = source.row(i);
                    for (&j, value) in columns.iter().zip(row_values) {
                        let mapped = f(value.clone());
                        if !mapped.is_zero() {
                            indices.push(j);
                            values.push(mapped);
                        }
                    }
                    row_pointers.push(indices.len());
                }
                target.set_structure(row_pointers, indices, values);
            },
            (Self::Diagonal(source), MatrixStorage::Diagonal(target)) => {
                if zeros == Zeros::NoSkip {
                    let image = f(T::zero());
                    if !image.is_zero() {
                        return Err(Error::InvalidMutation(format!(
                            "the function maps zero to {}, which cannot be materialized off the diagonal",
                            image,
                        )));
                    }
                }
                for (from, to) in source.data.iter().zip(&mut target.data) {
                    *to = f(from.clone());
                }
            },
            (source, target) => {
                if existing == ExistingData::Clear {
                    target.clear();
                }
                match zeros {
                    Zeros::AllowSkip => {
                        for (i, j, value) in source.iter_non_zero() {
                            target.set_unchecked(i, j, f(value.clone()))?;
                        }
                    },
                    Zeros::NoSkip => {
                        for i in 0..source.nr_rows() {
                            for j in 0..source.nr_columns() {
                                target.set_unchecked(i, j, f(source.get_unchecked(i, j)))?;
                            }
                        }
                    },
                }
            },
        }

        Ok(())
    }

    /// Reduce every row to an accumulator, then finalize it with the number of elements the
    /// folding function was invoked on.
    ///
    /// With [`Zeros::AllowSkip`] a sparse operand folds its stored entries only and the count per
    /// row is that row's stored entry count; a diagonal operand folds at most one element per
    /// row.
    pub fn fold_by_row<U: Clone>(
        &self,
        initial: U,
        mut f: impl FnMut(U, T) -> U,
        mut finalize: impl FnMut(U, usize) -> U,
        zeros: Zeros,
    ) -> Vec<U> {
        match (self, zeros) {
            (Self::Sparse(matrix), Zeros::AllowSkip) => {
                (0..matrix.nr_rows())
                    .map(|i| {
                        let (_, values) = matrix.row(i);
                        let mut accumulator = initial.clone();
                        for value in values {
                            accumulator = f(accumulator, value.clone());
                        }
                        finalize(accumulator, values.len())
                    })
                    .collect()
            },
            (Self::Diagonal(matrix), Zeros::AllowSkip) => {
                (0..matrix.nr_rows())
                    .map(|i| {
                        if i < matrix.diagonal_len() {
                            finalize(f(initial.clone(), matrix.data[i].clone()), 1)
                        } else {
                            finalize(initial.clone(), 0)
                        }
                    })
                    .collect()
            },
            _ => {
                (0..self.nr_rows())
                    .map(|i| {
                        let mut accumulator = initial.clone();
                        for j in 0..self.nr_columns() {
                            accumulator = f(accumulator, self.get_unchecked(i, j));
                        }
                        finalize(accumulator, self.nr_columns())
                    })
                    .collect()
            },
        }
    }

    /// Reduce every column to an accumulator, then finalize it with the number of elements the
    /// folding function was invoked on.
    ///
    /// The sparse fast path is one pass over the stored entries, applying the folding function in
    /// row order within each column.
    pub fn fold_by_column<U: Clone>(
        &self,
        initial: U,
        mut f: impl FnMut(U, T) -> U,
        mut finalize: impl FnMut(U, usize) -> U,
        zeros: Zeros,
    ) -> Vec<U> {
        match (self, zeros) {
            (Self::Sparse(matrix), Zeros::AllowSkip) => {
                let mut accumulators: Vec<U> = repeat_n(initial.clone(), matrix.nr_columns()).collect();
                let mut counts = vec![0; matrix.nr_columns()];
                for (_, j, value) in matrix.entries() {
                    let previous = mem::replace(&mut accumulators[j], initial.clone());
                    accumulators[j] = f(previous, value.clone());
                    counts[j] += 1;
                }
                accumulators.into_iter()
                    .zip(counts)
                    .map(|(accumulator, count)| finalize(accumulator, count))
                    .collect()
            },
            (Self::Diagonal(matrix), Zeros::AllowSkip) => {
                (0..matrix.nr_columns())
                    .map(|j| {
                        if j < matrix.diagonal_len() {
                            finalize(f(initial.clone(), matrix.data[j].clone()), 1)
                        } else {
                            finalize(initial.clone(), 0)
                        }
                    })
                    .collect()
            },
            _ => {
                (0..self.nr_columns())
                    .map(|j| {
                        let mut accumulator = initial.clone();
                        for i in 0..self.nr_rows() {
                            accumulator = f(accumulator, self.get_unchecked(i, j));
                        }
                        finalize(accumulator, self.nr_rows())
                    })
                    .collect()
            },
        }
    }

    /// Reduce two co-shaped matrices pairwise to a single accumulator.
    ///
    /// When both operands are sparse and zeros may be skipped, each pair of rows is merged in a
    /// lock-step walk over the two sorted column streams.
    pub fn fold2<U, T2: Scalar>(
        &self,
        other: &MatrixStorage<T2>,
        initial: U,
        mut f: impl FnMut(U, T, T2) -> U,
        finalize: impl FnOnce(U, usize) -> U,
        zeros: Zeros,
    ) -> Result<U, Error> {
        self.check_same_shape(other)?;

        match (self, other, zeros) {
            (Self::Sparse(left), MatrixStorage::Sparse(right), Zeros::AllowSkip) => {
                let mut accumulator = initial;
                let mut count = 0;
                for i in 0..left.nr_rows() {
                    let (left_columns, left_values) = left.row(i);
                    let (right_columns, right_values) = right.row(i);
                    let pairs = left_columns.iter().zip(left_values)
                        .merge_join_by(
                            right_columns.iter().zip(right_values),
                            |left, right| left.0.cmp(right.0),
                        );
                    for pair in pairs {
                        let (left_value, right_value) = match pair {
                            EitherOrBoth::Both((_, left), (_, right)) => (left.clone(), right.clone()),
                            EitherOrBoth::Left((_, left)) => (left.clone(), T2::zero()),
                            EitherOrBoth::Right((_, right)) => (T::zero(), right.clone()),
                        };
                        accumulator = f(accumulator, left_value, right_value);
                        count += 1;
                    }
                }
                Ok(finalize(accumulator, count))
            },
            (Self::Diagonal(left), MatrixStorage::Diagonal(right), Zeros::AllowSkip) => {
                let mut accumulator = initial;
                let mut count = 0;
                for (left_value, right_value) in left.data.iter().zip(&right.data) {
                    accumulator = f(accumulator, left_value.clone(), right_value.clone());
                    count += 1;
                }
                Ok(finalize(accumulator, count))
            },
            _ => {
                let mut accumulator = initial;
                let mut count = 0;
                for i in 0..self.nr_rows() {
                    for j in 0..self.nr_columns() {
                        accumulator = f(accumulator, self.get_unchecked(i, j), other.get_unchecked(i, j));
                        count += 1;
                    }
                }
                Ok(finalize(accumulator, count))
            },
        }
    }

    /// Locate the first element satisfying a predicate, in row-major order.
    ///
    /// With [`Zeros::AllowSkip`] the predicate is assumed to reject the zero value and implicit
    /// zeros are not tested.
    pub fn find(
        &self,
        mut predicate: impl FnMut(&T) -> bool,
        zeros: Zeros,
    ) -> Option<(usize, usize, T)> {
        match (self, zeros) {
            (Self::Sparse(_), Zeros::AllowSkip) | (Self::Diagonal(_), Zeros::AllowSkip) => {
                self.iter_non_zero()
                    .find(|(_, _, value)| predicate(value))
                    .map(|(i, j, value)| (i, j, value.clone()))
            },
            _ => {
                self.iter_indexed()
                    .find(|(_, _, value)| predicate(value))
            },
        }
    }

    /// Locate the first cell where the pair of co-located elements satisfies a predicate.
    ///
    /// Two sparse operands are merged row by row over their sorted column streams; the diagonal
    /// back-end contributes at most one entry per row, so mixed pairs with it stay linear in the
    /// stored entry count. This is also the equality path.
    pub fn find2<T2: Scalar>(
        &self,
        other: &MatrixStorage<T2>,
        mut predicate: impl FnMut(&T, &T2) -> bool,
        zeros: Zeros,
    ) -> Result<Option<(usize, usize, T, T2)>, Error> {
        self.check_same_shape(other)?;

        match (self, other, zeros) {
            (Self::Sparse(left), MatrixStorage::Sparse(right), Zeros::AllowSkip) => {
                for i in 0..left.nr_rows() {
                    let (left_columns, left_values) = left.row(i);
                    let (right_columns, right_values) = right.row(i);
                    let pairs = left_columns.iter().zip(left_values)
                        .merge_join_by(
                            right_columns.iter().zip(right_values),
                            |left, right| left.0.cmp(right.0),
                        );
                    for pair in pairs {
                        let (j, left_value, right_value) = match pair {
                            EitherOrBoth::Both((&j, left), (_, right)) => (j, left.clone(), right.clone()),
                            EitherOrBoth::Left((&j, left)) => (j, left.clone(), T2::zero()),
                            EitherOrBoth::Right((&j, right)) => (j, T::zero(), right.clone()),
                        };
                        if predicate(&left_value, &right_value) {
                            return Ok(Some((i, j, left_value, right_value)));
                        }
                    }
                }
                Ok(None)
            },
            (Self::Diagonal(left), MatrixStorage::Diagonal(right), Zeros::AllowSkip) => {
                for (i, (left_value, right_value)) in left.data.iter().zip(&right.data).enumerate() {
                    if predicate(left_value, right_value) {
                        return Ok(Some((i, i, left_value.clone(), right_value.clone())));
                    }
                }
                Ok(None)
            },
            (Self::Sparse(left), MatrixStorage::Diagonal(right), Zeros::AllowSkip) => {
                for i in 0..left.nr_rows() {
                    let diagonal = if i < right.diagonal_len() { Some(i) } else { None };
                    let (columns, values) = left.row(i);
                    let mut diagonal_visited = false;
                    for (&j, value) in columns.iter().zip(values) {
                        if diagonal == Some(j) {
                            diagonal_visited = true;
                        } else if let Some(d) = diagonal {
                            if j > d && !diagonal_visited {
                                diagonal_visited = true;
                                if predicate(&T::zero(), &right.data[d]) {
                                    return Ok(Some((i, d, T::zero(), right.data[d].clone())));
                                }
                            }
                        }
                        let other_value = if diagonal == Some(j) {
                            right.data[j].clone()
                        } else {
                            T2::zero()
                        };
                        if predicate(value, &other_value) {
                            return Ok(Some((i, j, value.clone(), other_value)));
                        }
                    }
                    if let Some(d) = diagonal {
                        if !diagonal_visited && predicate(&T::zero(), &right.data[d]) {
                            return Ok(Some((i, d, T::zero(), right.data[d].clone())));
                        }
                    }
                }
                Ok(None)
            },
            (Self::Diagonal(left), MatrixStorage::Sparse(right), Zeros::AllowSkip) => {
                // The mirrored walk, with the operand roles swapped back in the result.
                for i in 0..right.nr_rows() {
                    let diagonal = if i < left.diagonal_len() { Some(i) } else { None };
                    let (columns, values) = right.row(i);
                    let mut diagonal_visited = false;
                    for (&j, value) in columns.iter().zip(values) {
                        if diagonal == Some(j) {
                            diagonal_visited = true;
                        } else if let Some(d) = diagonal {
                            if j > d && !diagonal_visited {
                                diagonal_visited = true;
                                if predicate(&left.data[d], &T2::zero()) {
                                    return Ok(Some((i, d, left.data[d].clone(), T2::zero())));
                                }
                            }
                        }
                        let own_value = if diagonal == Some(j) {
                            left.data[j].clone()
                        } else {
                            T::zero()
                        };
                        if predicate(&own_value, value) {
                            return Ok(Some((i, j, own_value, value.clone())));
                        }
                    }
                    if let Some(d) = diagonal {
                        if !diagonal_visited && predicate(&left.data[d], &T2::zero()) {
                            return Ok(Some((i, d, left.data[d].clone(), T2::zero())));
                        }
                    }
                }
                Ok(None)
            },
            _ => {
                for i in 0..self.nr_rows() {
                    for j in 0..self.nr_columns() {
                        let left_value = self.get_unchecked(i, j);
                        let right_value = other.get_unchecked(i, j);
                        if predicate(&left_value, &right_value) {
                            return Ok(Some((i, j, left_value, right_value)));
                        }
                    }
                }
                Ok(None)
            },
        }
    }

    /// Iterate over all logical elements in row-major order.
    ///
    /// Yields exactly `nr_rows * nr_columns` values, implicit zeros included.
    pub fn iter(&self) -> Elements<'_, T> {
        Elements { storage: self, i: 0, j: 0, cursor: 0 }
    }

    /// Iterate over all logical elements with their (row, column) position, in row-major order.
    pub fn iter_indexed(&self) -> IndexedElements<'_, T> {
        IndexedElements { elements: self.iter(), i: 0, j: 0, nr_columns: self.nr_columns() }
    }

    /// Iterate over the non-zero elements with their (row, column) positions.
    ///
    /// The order is the representation's natural one: row-major for the sparse back-end,
    /// column-major for the dense buffer, along the diagonal otherwise. Explicitly stored zeros
    /// are not yielded.
    pub fn iter_non_zero(&self) -> NonZeroElements<'_, T> {
        NonZeroElements {
            inner: match self {
                Self::Dense(matrix) => NonZeroInner::Dense {
                    data: &matrix.data,
                    nr_rows: matrix.nr_rows(),
                    next: 0,
                },
                Self::Sparse(matrix) => NonZeroInner::Sparse { matrix, row: 0, position: 0 },
                Self::Diagonal(matrix) => NonZeroInner::Diagonal { data: &matrix.data, next: 0 },
            },
        }
    }
}

/// Element-wise comparison with early exit.
///
/// Instances of different representations are equal when all logical elements agree; comparing
/// two sparse operands costs O(stored entries) through the merge walk of [`MatrixStorage::find2`].
impl<T: Scalar> PartialEq for MatrixStorage<T> {
    fn eq(&self, other: &Self) -> bool {
        self.nr_rows() == other.nr_rows()
            && self.nr_columns() == other.nr_columns()
            && matches!(
                self.find2(other, |left, right| left != right, Zeros::AllowSkip),
                Ok(None)
            )
    }
}

/// Samples at most the first 25 logical elements in row-major order.
///
/// A deliberately weak but cheap hash: two unequal instances of the same shape may collide, but
/// equal instances always hash equal — also across representations, because the traversal is the
/// logical element order rather than any physical buffer order.
impl<T: Scalar + Hash> Hash for MatrixStorage<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.nr_rows().hash(state);
        self.nr_columns().hash(state);
        for value in self.iter().take(HASH_SAMPLE_SIZE) {
            value.hash(state);
        }
    }
}

/// Iterator over all logical elements of a matrix in row-major order, implicit zeros included.
#[derive(Debug)]
pub struct Elements<'a, T> {
    storage: &'a MatrixStorage<T>,
    i: usize,
    j: usize,
    /// Position in the sparse back-end's flat arrays; unused for the other representations.
    cursor: usize,
}

impl<T: Scalar> Iterator for Elements<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.i >= self.storage.nr_rows() || self.storage.nr_columns() == 0 {
            return None;
        }

        let value = match self.storage {
            MatrixStorage::Dense(matrix) => matrix.get_unchecked(self.i, self.j),
            MatrixStorage::Diagonal(matrix) => matrix.get_unchecked(self.i, self.j),
            MatrixStorage::Sparse(matrix) => {
                if self.cursor < matrix.row_pointers()[self.i + 1]
                    && matrix.column_indices()[self.cursor] == self.j
                {
                    self.cursor += 1;
                    matrix.values()[self.cursor - 1].clone()
                } else {
                    T::zero()
                }
            },
        };

        self.j += 1;
        if self.j == self.storage.nr_columns() {
            self.j = 0;
            self.i += 1;
        }

        Some(value)
    }
}

/// Iterator over all logical elements of a matrix with their (row, column) position.
#[derive(Debug)]
pub struct IndexedElements<'a, T> {
    elements: Elements<'a, T>,
    i: usize,
    j: usize,
    nr_columns: usize,
}

impl<T: Scalar> Iterator for IndexedElements<'_, T> {
    type Item = (usize, usize, T);

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.elements.next()?;
        let position = (self.i, self.j);

        self.j += 1;
        if self.j == self.nr_columns {
            self.j = 0;
            self.i += 1;
        }

        Some((position.0, position.1, value))
    }
}

/// Iterator over the non-zero elements of a matrix with their (row, column) positions.
#[derive(Debug)]
pub struct NonZeroElements<'a, T> {
    inner: NonZeroInner<'a, T>,
}

#[derive(Debug)]
enum NonZeroInner<'a, T> {
    Dense {
        data: &'a [T],
        nr_rows: usize,
        next: usize,
    },
    Sparse {
        matrix: &'a SparseMatrix<T>,
        row: usize,
        position: usize,
    },
    Diagonal {
        data: &'a [T],
        next: usize,
    },
}

impl<'a, T: Scalar> Iterator for NonZeroElements<'a, T> {
    type Item = (usize, usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            NonZeroInner::Dense { data, nr_rows, next } => {
                let data: &'a [T] = *data;
                while *next < data.len() {
                    let position = *next;
                    *next += 1;
                    if !data[position].is_zero() {
                        return Some((position % *nr_rows, position / *nr_rows, &data[position]));
                    }
                }
                None
            },
            NonZeroInner::Sparse { matrix, row, position } => {
                let matrix: &'a SparseMatrix<T> = *matrix;
                loop {
                    if *row == matrix.nr_rows() {
                        return None;
                    }
                    if *position < matrix.row_pointers()[*row + 1] {
                        let current = *position;
                        *position += 1;
                        if !matrix.values()[current].is_zero() {
                            return Some((
                                *row,
                                matrix.column_indices()[current],
                                &matrix.values()[current],
                            ));
                        }
                    } else {
                        *row += 1;
                    }
                }
            },
            NonZeroInner::Diagonal { data, next } => {
                let data: &'a [T] = *data;
                while *next < data.len() {
                    let position = *next;
                    *next += 1;
                    if !data[position].is_zero() {
                        return Some((position, position, &data[position]));
                    }
                }
                None
            },
        }
    }
}
