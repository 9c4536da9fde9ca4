//! # Sparse matrix storage (compressed row)
//!
//! Per row a sorted slice of (column, value) entries, addressed through a row pointer array into
//! one flat pair buffer with growth slack. Single-element mutation shifts all trailing entries
//! and touches every subsequent row pointer, making it amortized linear in the stored entry
//! count; iteration stays contiguous and memory stays dense. The format is built for matrices
//! that are constructed once and read many times.
//!
//! Bulk construction may leave a row's entries unsorted or duplicated; the normalization passes
//! restore the strictly-ascending-and-unique invariant that lookup relies on. Explicitly stored
//! zeros are kept until [`Sparse::normalize_zeros`] runs.
use std::mem;
use std::ops::Range;

use crate::buffer::PairBuffer;
use crate::error::Error;
use crate::matrix::MatrixStorage;
use crate::traits::Scalar;
use crate::utilities::{pointers_from_counts, sort_pairs};

/// Compressed-row storage: a row pointer array plus parallel column-index and value arrays.
///
/// Within the half-open slice `[row_pointers[i], row_pointers[i + 1])` of the flat arrays the
/// column indices are strictly ascending and unique, except transiently during bulk construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Sparse<T> {
    nr_rows: usize,
    nr_columns: usize,
    /// `nr_rows + 1` monotonically non-decreasing entry positions; the last one is the logical
    /// entry count.
    row_pointers: Vec<usize>,
    pub(crate) buffer: PairBuffer<T>,
}

impl<T: Scalar> Sparse<T> {
    /// Create a matrix without any stored entries.
    pub fn zero(nr_rows: usize, nr_columns: usize) -> Result<Self, Error> {
        Self::check_addressable(nr_rows, nr_columns)?;

        Ok(Self {
            nr_rows,
            nr_columns,
            row_pointers: vec![0; nr_rows + 1],
            buffer: PairBuffer::new(),
        })
    }

    /// Create a matrix from coordinate-format (row, column, value) triples.
    ///
    /// The triples are bucketed by row with a counting sort, ordered within each row by the
    /// stable co-sort and merged by summation where a cell repeats; no comparison sort over all
    /// entries is involved. Explicit zeros are kept.
    pub fn from_triples(
        nr_rows: usize,
        nr_columns: usize,
        triples: Vec<(usize, usize, T)>,
    ) -> Result<Self, Error> {
        Self::check_addressable(nr_rows, nr_columns)?;
        for &(i, j, _) in &triples {
            if i >= nr_rows {
                return Err(Error::index("row", i, nr_rows));
            }
            if j >= nr_columns {
                return Err(Error::index("column", j, nr_columns));
            }
        }

        let mut counts = vec![0; nr_rows];
        for &(i, _, _) in &triples {
            counts[i] += 1;
        }
        let row_pointers = pointers_from_counts(counts);

        let mut next = row_pointers.clone();
        let mut indices = vec![0; triples.len()];
        let mut values = vec![T::zero(); triples.len()];
        for (i, j, value) in triples {
            let slot = next[i];
            next[i] += 1;
            indices[slot] = j;
            values[slot] = value;
        }

        let mut matrix = Self {
            nr_rows,
            nr_columns,
            row_pointers,
            buffer: PairBuffer::from_parts(indices, values),
        };
        matrix.normalize_ordering();
        matrix.normalize_duplicates();

        Ok(matrix)
    }

    /// Create a matrix from compressed-column arrays.
    ///
    /// The entries are re-bucketed by row with a counting sort; walking the columns in ascending
    /// order leaves every destination row sorted, so only duplicate merging remains.
    pub fn from_compressed_column(
        nr_rows: usize,
        nr_columns: usize,
        column_pointers: Vec<usize>,
        row_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, Error> {
        Self::check_addressable(nr_rows, nr_columns)?;
        Self::check_compressed_parts(&column_pointers, nr_columns, &row_indices, values.len(), nr_rows, "row")?;

        let mut counts = vec![0; nr_rows];
        for &i in &row_indices {
            counts[i] += 1;
        }
        let row_pointers = pointers_from_counts(counts);

        let mut next = row_pointers.clone();
        let mut indices = vec![0; row_indices.len()];
        let mut new_values = vec![T::zero(); values.len()];
        let mut values = values.into_iter();
        for j in 0..nr_columns {
            for position in column_pointers[j]..column_pointers[j + 1] {
                let i = row_indices[position];
                let slot = next[i];
                next[i] += 1;
                indices[slot] = j;
                if let Some(value) = values.next() {
                    new_values[slot] = value;
                }
            }
        }

        let mut matrix = Self {
            nr_rows,
            nr_columns,
            row_pointers,
            buffer: PairBuffer::from_parts(indices, new_values),
        };
        matrix.normalize_duplicates();

        Ok(matrix)
    }

    /// Create a matrix from compressed-row arrays.
    ///
    /// Rows may be unsorted and may repeat a column; both are normalized. Explicit zeros are
    /// kept.
    pub fn from_compressed_row(
        nr_rows: usize,
        nr_columns: usize,
        row_pointers: Vec<usize>,
        column_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, Error> {
        Self::check_addressable(nr_rows, nr_columns)?;
        Self::check_compressed_parts(&row_pointers, nr_rows, &column_indices, values.len(), nr_columns, "column")?;

        let mut matrix = Self {
            nr_rows,
            nr_columns,
            row_pointers,
            buffer: PairBuffer::from_parts(column_indices, values),
        };
        matrix.normalize_ordering();
        matrix.normalize_duplicates();

        Ok(matrix)
    }

    /// Create a matrix by evaluating a function at every (row, column) cell, storing the non-zero
    /// results.
    pub fn from_fn(
        nr_rows: usize,
        nr_columns: usize,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> Result<Self, Error> {
        Self::check_addressable(nr_rows, nr_columns)?;

        let mut row_pointers = Vec::with_capacity(nr_rows + 1);
        row_pointers.push(0);
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for i in 0..nr_rows {
            for j in 0..nr_columns {
                let value = f(i, j);
                if !value.is_zero() {
                    indices.push(j);
                    values.push(value);
                }
            }
            row_pointers.push(indices.len());
        }

        Ok(Self {
            nr_rows,
            nr_columns,
            row_pointers,
            buffer: PairBuffer::from_parts(indices, values),
        })
    }

    /// Create a compressed-row copy of a storage of any representation.
    pub fn of_storage(storage: &MatrixStorage<T>) -> Result<Self, Error> {
        let triples = storage.iter_non_zero()
            .map(|(i, j, value)| (i, j, value.clone()))
            .collect();

        Self::from_triples(storage.nr_rows(), storage.nr_columns(), triples)
    }

    /// The cell count must be addressable for the growth cap and the validations to make sense.
    fn check_addressable(nr_rows: usize, nr_columns: usize) -> Result<(), Error> {
        match nr_rows.checked_mul(nr_columns) {
            Some(_) => Ok(()),
            None => Err(Error::Unsupported(format!(
                "cell count of a {}x{} matrix is not addressable", nr_rows, nr_columns,
            ))),
        }
    }

    /// Validate a compressed pointer/index/value triple, in either orientation.
    fn check_compressed_parts(
        pointers: &[usize],
        nr_major: usize,
        indices: &[usize],
        nr_values: usize,
        minor_limit: usize,
        minor_name: &str,
    ) -> Result<(), Error> {
        if pointers.len() != nr_major + 1 {
            return Err(Error::buffer_length(nr_major + 1, pointers.len()));
        }
        if pointers.first() != Some(&0) || !pointers.is_sorted() {
            return Err(Error::Unsupported(
                "pointer array is not monotonically non-decreasing from zero".to_string(),
            ));
        }
        if pointers.last() != Some(&indices.len()) {
            return Err(Error::buffer_length(pointers[nr_major], indices.len()));
        }
        if nr_values != indices.len() {
            return Err(Error::buffer_length(indices.len(), nr_values));
        }
        for &index in indices {
            if index >= minor_limit {
                return Err(Error::index(minor_name, index, minor_limit));
            }
        }

        Ok(())
    }

    /// Number of rows represented.
    pub fn nr_rows(&self) -> usize {
        self.nr_rows
    }

    /// Number of columns represented.
    pub fn nr_columns(&self) -> usize {
        self.nr_columns
    }

    /// The row pointer array, one element more than there are rows.
    pub fn row_pointers(&self) -> &[usize] {
        &self.row_pointers
    }

    /// The stored column indices in row order.
    pub fn column_indices(&self) -> &[usize] {
        self.buffer.indices()
    }

    /// The stored values, parallel to [`Self::column_indices`].
    pub fn values(&self) -> &[T] {
        self.buffer.values()
    }

    /// The number of stored entries, explicit zeros included.
    pub fn value_count(&self) -> usize {
        debug_assert_eq!(self.buffer.len(), self.row_pointers[self.nr_rows]);

        self.buffer.len()
    }

    /// The physical capacity of the backing arrays, which may exceed [`Self::value_count`] by
    /// growth slack.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// The (column, value) entries of one row.
    pub fn row(&self, i: usize) -> (&[usize], &[T]) {
        debug_assert!(i < self.nr_rows);

        let range = self.row_range(i);
        (&self.buffer.indices()[range.clone()], &self.buffer.values()[range])
    }

    /// All stored entries as (row, column, value), in row-major order.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (usize, usize, &T)> + '_ {
        (0..self.nr_rows).flat_map(move |i| {
            let (columns, values) = self.row(i);
            columns.iter().zip(values).map(move |(&j, value)| (i, j, value))
        })
    }

    fn row_range(&self, i: usize) -> Range<usize> {
        self.row_pointers[i]..self.row_pointers[i + 1]
    }

    /// Where cell (`i`, `j`) is stored, or where it would be inserted.
    fn position(&self, i: usize, j: usize) -> Result<usize, usize> {
        let range = self.row_range(i);
        let start = range.start;
        self.buffer.indices()[range].binary_search(&j)
            .map(|position| start + position)
            .map_err(|position| start + position)
    }

    pub(crate) fn get_unchecked(&self, i: usize, j: usize) -> T {
        debug_assert!(i < self.nr_rows);
        debug_assert!(j < self.nr_columns);

        match self.position(i, j) {
            Ok(position) => self.buffer.values()[position].clone(),
            Err(_) => T::zero(),
        }
    }

    /// Write a value at a cell.
    ///
    /// A zero physically removes any stored entry, a non-zero overwrites in place or is inserted
    /// at its sorted position within the row. Insertion and removal shift all trailing entries of
    /// the flat arrays and adjust every subsequent row pointer.
    pub(crate) fn set_unchecked(&mut self, i: usize, j: usize, value: T) {
        debug_assert!(i < self.nr_rows);
        debug_assert!(j < self.nr_columns);

        match self.position(i, j) {
            Ok(position) => {
                if value.is_zero() {
                    self.remove_entry(position, i);
                } else {
                    self.buffer.values_mut()[position] = value;
                }
            },
            Err(position) => {
                if !value.is_zero() {
                    self.insert_entry(position, i, j, value);
                }
            },
        }
    }

    fn insert_entry(&mut self, position: usize, row: usize, column: usize, value: T) {
        self.buffer.insert(position, column, value, self.nr_rows * self.nr_columns);
        for pointer in &mut self.row_pointers[(row + 1)..] {
            *pointer += 1;
        }
    }

    fn remove_entry(&mut self, position: usize, row: usize) {
        self.buffer.remove(position);
        for pointer in &mut self.row_pointers[(row + 1)..] {
            *pointer -= 1;
        }
    }

    /// Remove a contiguous range of one row's entries.
    fn remove_positions_in_row(&mut self, row: usize, positions: Range<usize>) {
        debug_assert!(self.row_range(row).start <= positions.start);
        debug_assert!(positions.end <= self.row_range(row).end);

        let removed = positions.end - positions.start;
        self.buffer.remove_range(positions);
        for pointer in &mut self.row_pointers[(row + 1)..] {
            *pointer -= removed;
        }
    }

    /// Replace the compressed structure wholesale.
    ///
    /// Used by the cross-representation copy and map paths that produce fresh arrays.
    pub(crate) fn set_structure(
        &mut self,
        row_pointers: Vec<usize>,
        column_indices: Vec<usize>,
        values: Vec<T>,
    ) {
        debug_assert_eq!(row_pointers.len(), self.nr_rows + 1);
        debug_assert_eq!(row_pointers.last(), Some(&column_indices.len()));
        debug_assert!(row_pointers.is_sorted());
        debug_assert!(column_indices.iter().all(|&j| j < self.nr_columns));

        self.row_pointers = row_pointers;
        self.buffer.set_parts(column_indices, values);
    }

    /// Sort every row's entries by column, stably.
    pub fn normalize_ordering(&mut self) {
        for i in 0..self.nr_rows {
            let range = self.row_range(i);
            let (columns, values) = self.buffer.segment_mut(range);
            sort_pairs(columns, values);
        }
    }

    /// Merge consecutive entries of a row that share a column by summation.
    ///
    /// Requires every row to be sorted, which bulk construction guarantees by running
    /// [`Self::normalize_ordering`] first.
    pub fn normalize_duplicates(&mut self) {
        let mut indices = Vec::with_capacity(self.buffer.len());
        let mut values: Vec<T> = Vec::with_capacity(self.buffer.len());
        let mut pointers = Vec::with_capacity(self.nr_rows + 1);
        pointers.push(0);
        for i in 0..self.nr_rows {
            let row_start = indices.len();
            let (columns, row_values) = self.row(i);
            debug_assert!(columns.is_sorted());
            for (&column, value) in columns.iter().zip(row_values) {
                if indices.len() > row_start && indices.last() == Some(&column) {
                    let slot = values.len() - 1;
                    let previous = mem::replace(&mut values[slot], T::zero());
                    values[slot] = previous + value.clone();
                } else {
                    indices.push(column);
                    values.push(value.clone());
                }
            }
            pointers.push(indices.len());
        }

        self.row_pointers = pointers;
        self.buffer.set_parts(indices, values);
    }

    /// Drop stored entries whose value is zero, a zero-preserving in-place map.
    ///
    /// Afterwards the stored entry count equals the number of non-zero elements.
    pub fn normalize_zeros(&mut self) {
        self.map_stored(&mut |_, _, value| value);
    }

    /// Apply a function to every stored entry, dropping entries whose result is zero.
    ///
    /// Implicit zeros are not visited; this is the skipping half of the in-place map.
    pub(crate) fn map_stored(&mut self, f: &mut impl FnMut(usize, usize, T) -> T) {
        let mut indices = Vec::with_capacity(self.buffer.len());
        let mut values = Vec::with_capacity(self.buffer.len());
        let mut pointers = Vec::with_capacity(self.nr_rows + 1);
        pointers.push(0);
        for i in 0..self.nr_rows {
            let (columns, row_values) = self.row(i);
            for (&column, value) in columns.iter().zip(row_values) {
                let mapped = f(i, column, value.clone());
                if !mapped.is_zero() {
                    indices.push(column);
                    values.push(mapped);
                }
            }
            pointers.push(indices.len());
        }

        self.row_pointers = pointers;
        self.buffer.set_parts(indices, values);
    }

    /// Apply a function to every logical cell, storing non-zero results.
    ///
    /// One pass over all `nr_rows * nr_columns` cells, the non-skipping half of the in-place
    /// map.
    pub(crate) fn map_all(&mut self, f: &mut impl FnMut(usize, usize, T) -> T) {
        let mut indices = Vec::new();
        let mut values = Vec::new();
        let mut pointers = Vec::with_capacity(self.nr_rows + 1);
        pointers.push(0);
        for i in 0..self.nr_rows {
            let range = self.row_range(i);
            let mut cursor = range.start;
            for j in 0..self.nr_columns {
                let original = if cursor < range.end && self.buffer.indices()[cursor] == j {
                    cursor += 1;
                    self.buffer.values()[cursor - 1].clone()
                } else {
                    T::zero()
                };
                let mapped = f(i, j, original);
                if !mapped.is_zero() {
                    indices.push(j);
                    values.push(mapped);
                }
            }
            pointers.push(indices.len());
        }

        self.row_pointers = pointers;
        self.buffer.set_parts(indices, values);
    }

    /// Insert an explicit zero wherever a diagonal entry is structurally absent.
    ///
    /// External solvers may require the diagonal to be present in the sparsity pattern. This is a
    /// single rebuild pass costing O(rows + stored entries), not repeated element writes.
    pub fn ensure_diagonal_entries(&mut self) {
        let limit = self.nr_rows.min(self.nr_columns);
        let missing = (0..limit).filter(|&i| self.position(i, i).is_err()).count();
        if missing == 0 {
            return;
        }

        let mut indices = Vec::with_capacity(self.buffer.len() + missing);
        let mut values = Vec::with_capacity(self.buffer.len() + missing);
        let mut pointers = Vec::with_capacity(self.nr_rows + 1);
        pointers.push(0);
        for i in 0..self.nr_rows {
            let mut handled = i >= limit;
            let (columns, row_values) = self.row(i);
            for (&column, value) in columns.iter().zip(row_values) {
                if !handled && column > i {
                    indices.push(i);
                    values.push(T::zero());
                    handled = true;
                }
                if column == i {
                    handled = true;
                }
                indices.push(column);
                values.push(value.clone());
            }
            if !handled {
                indices.push(i);
                values.push(T::zero());
            }
            pointers.push(indices.len());
        }

        self.row_pointers = pointers;
        self.buffer.set_parts(indices, values);
    }

    /// The transpose as a new compressed-row matrix.
    ///
    /// Rebuilds the structure with a bucket-count, prefix-sum and scatter pass: O(rows + columns
    /// + stored entries), never a comparison sort. Walking the rows in ascending order leaves
    /// every destination row sorted.
    pub(crate) fn transposed(&self) -> Self {
        let mut counts = vec![0; self.nr_columns];
        for &column in self.buffer.indices() {
            counts[column] += 1;
        }
        let row_pointers = pointers_from_counts(counts);

        let mut next = row_pointers.clone();
        let mut indices = vec![0; self.buffer.len()];
        let mut values = vec![T::zero(); self.buffer.len()];
        for (i, j, value) in self.entries() {
            let slot = next[j];
            next[j] += 1;
            indices[slot] = i;
            values[slot] = value.clone();
        }

        Self {
            nr_rows: self.nr_columns,
            nr_columns: self.nr_rows,
            row_pointers,
            buffer: PairBuffer::from_parts(indices, values),
        }
    }

    /// Remove all stored entries.
    pub(crate) fn clear(&mut self) {
        self.row_pointers = vec![0; self.nr_rows + 1];
        self.buffer.set_parts(Vec::new(), Vec::new());
    }

    /// Remove all stored entries of the marked rows, in one filtering pass.
    pub(crate) fn clear_rows(&mut self, rows: &[usize]) {
        let mut cleared = vec![false; self.nr_rows];
        for &i in rows {
            cleared[i] = true;
        }

        let mut indices = Vec::new();
        let mut values = Vec::new();
        let mut pointers = Vec::with_capacity(self.nr_rows + 1);
        pointers.push(0);
        for i in 0..self.nr_rows {
            if !cleared[i] {
                let (columns, row_values) = self.row(i);
                indices.extend_from_slice(columns);
                values.extend_from_slice(row_values);
            }
            pointers.push(indices.len());
        }

        self.row_pointers = pointers;
        self.buffer.set_parts(indices, values);
    }

    /// Remove all stored entries of the marked columns, in one filtering pass.
    pub(crate) fn clear_columns(&mut self, columns: &[usize]) {
        let mut cleared = vec![false; self.nr_columns];
        for &j in columns {
            cleared[j] = true;
        }

        let mut indices = Vec::new();
        let mut values = Vec::new();
        let mut pointers = Vec::with_capacity(self.nr_rows + 1);
        pointers.push(0);
        for i in 0..self.nr_rows {
            let (row_columns, row_values) = self.row(i);
            for (&column, value) in row_columns.iter().zip(row_values) {
                if !cleared[column] {
                    indices.push(column);
                    values.push(value.clone());
                }
            }
            pointers.push(indices.len());
        }

        self.row_pointers = pointers;
        self.buffer.set_parts(indices, values);
    }

    /// Remove the stored entries of a rectangular block, one row range at a time.
    pub(crate) fn clear_block(&mut self, row: usize, nr_rows: usize, column: usize, nr_columns: usize) {
        debug_assert!(row + nr_rows <= self.nr_rows);
        debug_assert!(column + nr_columns <= self.nr_columns);

        for i in row..(row + nr_rows) {
            let range = self.row_range(i);
            let start = range.start;
            let columns = &self.buffer.indices()[range];
            let low = start + columns.partition_point(|&j| j < column);
            let high = start + columns.partition_point(|&j| j < column + nr_columns);
            self.remove_positions_in_row(i, low..high);
        }
    }

    /// Replace the entries of a block with the corresponding block of another sparse matrix.
    ///
    /// One rebuild pass over both operands: rows outside the target block are kept as they are,
    /// rows inside keep their entries outside the column range and receive the source block's
    /// entries, shifted by the offset difference.
    pub(crate) fn splice_block_from(
        &mut self,
        source: &Sparse<T>,
        source_row: usize,
        target_row: usize,
        nr_rows: usize,
        source_column: usize,
        target_column: usize,
        nr_columns: usize,
    ) {
        debug_assert!(source_row + nr_rows <= source.nr_rows);
        debug_assert!(target_row + nr_rows <= self.nr_rows);
        debug_assert!(source_column + nr_columns <= source.nr_columns);
        debug_assert!(target_column + nr_columns <= self.nr_columns);

        let mut indices = Vec::new();
        let mut values = Vec::new();
        let mut pointers = Vec::with_capacity(self.nr_rows + 1);
        pointers.push(0);
        for i in 0..self.nr_rows {
            let (columns, row_values) = self.row(i);
            if i < target_row || i >= target_row + nr_rows {
                indices.extend_from_slice(columns);
                values.extend_from_slice(row_values);
            } else {
                let before = columns.partition_point(|&j| j < target_column);
                let after = columns.partition_point(|&j| j < target_column + nr_columns);
                indices.extend_from_slice(&columns[..before]);
                values.extend_from_slice(&row_values[..before]);

                let (source_columns, source_values) = source.row(source_row + i - target_row);
                let low = source_columns.partition_point(|&j| j < source_column);
                let high = source_columns.partition_point(|&j| j < source_column + nr_columns);
                for (&j, value) in source_columns[low..high].iter().zip(&source_values[low..high]) {
                    indices.push(j - source_column + target_column);
                    values.push(value.clone());
                }

                indices.extend_from_slice(&columns[after..]);
                values.extend_from_slice(&row_values[after..]);
            }
            pointers.push(indices.len());
        }

        self.row_pointers = pointers;
        self.buffer.set_parts(indices, values);
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::matrix::sparse::Sparse;

    /// The matrix `[[1, 2, 0], [0, 5, 6]]`.
    fn test_matrix() -> Sparse<i64> {
        Sparse::from_triples(2, 3, vec![(0, 0, 1), (0, 1, 2), (1, 1, 5), (1, 2, 6)]).unwrap()
    }

    #[test]
    fn from_triples() {
        let m = test_matrix();
        assert_eq!(m.row_pointers(), &[0, 2, 4]);
        assert_eq!(m.column_indices(), &[0, 1, 1, 2]);
        assert_eq!(m.values(), &[1, 2, 5, 6]);
        assert_eq!(m.get_unchecked(0, 0), 1);
        assert_eq!(m.get_unchecked(0, 2), 0);
        assert_eq!(m.get_unchecked(1, 2), 6);

        assert_eq!(
            Sparse::from_triples(2, 3, vec![(2, 0, 1)]),
            Err(Error::index("row", 2, 2)),
        );
    }

    #[test]
    fn duplicate_triples_merge_by_summation() {
        let m = Sparse::from_triples(1, 1, vec![(0, 0, 2), (0, 0, 3)]).unwrap();
        assert_eq!(m.value_count(), 1);
        assert_eq!(m.get_unchecked(0, 0), 5);
    }

    #[test]
    fn unsorted_triples_are_ordered() {
        let m = Sparse::from_triples(1, 4, vec![(0, 3, 4), (0, 1, 2), (0, 2, 3)]).unwrap();
        assert_eq!(m.column_indices(), &[1, 2, 3]);
        assert_eq!(m.values(), &[2, 3, 4]);
    }

    #[test]
    fn from_fn_stores_non_zero_results() {
        let m = Sparse::from_fn(2, 3, |i, j| if i == j { 1 + i as i64 } else { 0 }).unwrap();
        assert_eq!(m.row_pointers(), &[0, 1, 2]);
        assert_eq!(m.column_indices(), &[0, 1]);
        assert_eq!(m.values(), &[1, 2]);
    }

    #[test]
    fn set_inserts_overwrites_and_removes() {
        let mut m = test_matrix();
        m.set_unchecked(0, 2, 3);
        assert_eq!(m.row_pointers(), &[0, 3, 5]);
        assert_eq!(m.column_indices(), &[0, 1, 2, 1, 2]);
        assert_eq!(m.get_unchecked(0, 2), 3);

        m.set_unchecked(0, 2, 4);
        assert_eq!(m.get_unchecked(0, 2), 4);
        assert_eq!(m.value_count(), 5);

        m.set_unchecked(0, 2, 0);
        assert_eq!(m.row_pointers(), &[0, 2, 4]);
        assert_eq!(m.get_unchecked(0, 2), 0);
    }

    #[test]
    fn set_then_zero_leaves_nothing_behind() {
        let mut m = Sparse::zero(1, 1).unwrap();
        m.set_unchecked(0, 0, 5);
        assert_eq!(m.value_count(), 1);
        m.set_unchecked(0, 0, 0);
        assert_eq!(m.value_count(), 0);
        assert_eq!(m.get_unchecked(0, 0), 0);
    }

    #[test]
    fn from_compressed_column() {
        // [[1, 2, 0], [0, 5, 6]] in compressed-column form.
        let m = Sparse::from_compressed_column(
            2,
            3,
            vec![0, 1, 3, 4],
            vec![0, 0, 1, 1],
            vec![1, 2, 5, 6],
        ).unwrap();
        assert_eq!(m, test_matrix());

        assert!(matches!(
            Sparse::from_compressed_column(2, 3, vec![0, 1], vec![0], vec![1]),
            Err(Error::DimensionMismatch(_)),
        ));
        assert!(matches!(
            Sparse::from_compressed_column(2, 3, vec![0, 2, 1, 1], vec![0], vec![1]),
            Err(Error::Unsupported(_)),
        ));
        assert!(matches!(
            Sparse::from_compressed_column(2, 3, vec![0, 1, 1, 1], vec![5], vec![1]),
            Err(Error::OutOfRange(_)),
        ));
    }

    #[test]
    fn from_compressed_row_normalizes() {
        // Second row unsorted and with a duplicate column.
        let m = Sparse::from_compressed_row(
            2,
            3,
            vec![0, 1, 4],
            vec![0, 2, 1, 1],
            vec![1, 6, 3, 2],
        ).unwrap();
        assert_eq!(m.row_pointers(), &[0, 1, 3]);
        assert_eq!(m.column_indices(), &[0, 1, 2]);
        assert_eq!(m.values(), &[1, 5, 6]);
    }

    #[test]
    fn normalize_zeros() {
        let mut m = Sparse::from_triples(2, 2, vec![(0, 0, 0), (0, 1, 3), (1, 1, 0)]).unwrap();
        assert_eq!(m.value_count(), 3);
        m.normalize_zeros();
        assert_eq!(m.value_count(), 1);
        assert_eq!(m.row_pointers(), &[0, 1, 1]);
        assert_eq!(m.get_unchecked(0, 1), 3);
    }

    #[test]
    fn ensure_diagonal_entries() {
        let mut m = test_matrix();
        m.ensure_diagonal_entries();
        assert_eq!(m.value_count(), 4);

        let mut m = Sparse::from_triples(3, 3, vec![(0, 1, 2), (2, 0, 1)]).unwrap();
        m.ensure_diagonal_entries();
        assert_eq!(m.value_count(), 5);
        assert_eq!(m.row_pointers(), &[0, 2, 3, 5]);
        assert_eq!(m.column_indices(), &[0, 1, 1, 0, 2]);
        assert_eq!(m.position(0, 0), Ok(0));
        assert_eq!(m.get_unchecked(0, 0), 0);

        // A second run is a no-op.
        let before = m.clone();
        m.ensure_diagonal_entries();
        assert_eq!(m, before);
    }

    #[test]
    fn transpose_scatter() {
        let m = test_matrix();
        let transposed = m.transposed();
        assert_eq!(transposed.nr_rows(), 3);
        assert_eq!(transposed.nr_columns(), 2);
        assert_eq!(transposed.row_pointers(), &[0, 1, 3, 4]);
        assert_eq!(transposed.column_indices(), &[0, 0, 1, 1]);
        assert_eq!(transposed.values(), &[1, 2, 5, 6]);

        // Transposing twice gives the original back.
        assert_eq!(transposed.transposed(), m);
    }

    #[test]
    fn clear_operations() {
        let mut m = test_matrix();
        m.clear_rows(&[0]);
        assert_eq!(m.row_pointers(), &[0, 0, 2]);
        assert_eq!(m.get_unchecked(1, 1), 5);

        let mut m = test_matrix();
        m.clear_columns(&[1]);
        assert_eq!(m.value_count(), 2);
        assert_eq!(m.get_unchecked(0, 0), 1);
        assert_eq!(m.get_unchecked(1, 1), 0);

        let mut m = test_matrix();
        m.clear_block(0, 2, 1, 2);
        assert_eq!(m.value_count(), 1);
        assert_eq!(m.get_unchecked(0, 0), 1);

        let mut m = test_matrix();
        m.clear();
        assert_eq!(m.value_count(), 0);
        assert_eq!(m.row_pointers(), &[0, 0, 0]);
    }

    #[test]
    fn splice_block() {
        let source = test_matrix();
        let mut target = Sparse::from_triples(3, 3, vec![(0, 0, 9), (1, 1, 9), (2, 2, 9)]).unwrap();
        // Copy the 2x2 block at (0, 1) of the source over the block at (1, 1) of the target.
        target.splice_block_from(&source, 0, 1, 2, 1, 1, 2);
        assert_eq!(target.get_unchecked(0, 0), 9);
        assert_eq!(target.get_unchecked(1, 1), 2);
        assert_eq!(target.get_unchecked(1, 2), 0);
        assert_eq!(target.get_unchecked(2, 1), 5);
        assert_eq!(target.get_unchecked(2, 2), 6);
    }
}
