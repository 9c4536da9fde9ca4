//! # Dense matrix storage
//!
//! One flat buffer in column-major order: element (i, j) lives at index `j * nr_rows + i`. Every
//! logical cell is stored explicitly and there is no slack.
use num_traits::One;

use crate::error::Error;
use crate::matrix::MatrixStorage;
use crate::traits::Scalar;
use crate::vector::VectorStorage;

/// Uses a flat `Vec` in column-major order as underlying data structure.
///
/// Dimensions are fixed at creation, access is O(1).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Dense<T> {
    nr_rows: usize,
    nr_columns: usize,
    pub(crate) data: Vec<T>,
}

impl<T: Scalar> Dense<T> {
    /// Create a matrix from a raw column-major buffer.
    ///
    /// # Arguments
    ///
    /// * `nr_rows`, `nr_columns`: Dimensions of the matrix represented.
    /// * `data`: Column-major values; the length must be exactly `nr_rows * nr_columns`.
    /// Ownership is taken, no defensive copy is made.
    pub fn new(nr_rows: usize, nr_columns: usize, data: Vec<T>) -> Result<Self, Error> {
        let cell_count = nr_rows.checked_mul(nr_columns)
            .ok_or_else(|| Error::Unsupported(format!(
                "cell count of a {}x{} matrix is not addressable", nr_rows, nr_columns,
            )))?;
        if data.len() != cell_count {
            return Err(Error::buffer_length(cell_count, data.len()));
        }

        Ok(Self { nr_rows, nr_columns, data })
    }

    /// Create a matrix from a raw row-major buffer, reordering it to column-major.
    pub fn from_row_major(nr_rows: usize, nr_columns: usize, data: Vec<T>) -> Result<Self, Error> {
        let matrix = Self::new(nr_rows, nr_columns, data)?;

        Ok(Self::from_fn(nr_rows, nr_columns, |i, j| {
            matrix.data[i * nr_columns + j].clone()
        }))
    }

    /// Create a matrix of zeros.
    pub fn zero(nr_rows: usize, nr_columns: usize) -> Self {
        Self { nr_rows, nr_columns, data: vec![T::zero(); nr_rows * nr_columns] }
    }

    /// Create a matrix by evaluating a function at every (row, column) cell.
    pub fn from_fn(nr_rows: usize, nr_columns: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(nr_rows * nr_columns);
        for j in 0..nr_columns {
            for i in 0..nr_rows {
                data.push(f(i, j));
            }
        }

        Self { nr_rows, nr_columns, data }
    }

    /// Create a matrix from row arrays.
    ///
    /// All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, Error> {
        let nr_rows = rows.len();
        let nr_columns = rows.first().map_or(0, Vec::len);
        for row in &rows {
            if row.len() != nr_columns {
                return Err(Error::buffer_length(nr_columns, row.len()));
            }
        }

        Ok(Self::from_fn(nr_rows, nr_columns, |i, j| rows[i][j].clone()))
    }

    /// Create a matrix from column arrays.
    ///
    /// All columns must have the same length.
    pub fn from_columns(columns: Vec<Vec<T>>) -> Result<Self, Error> {
        let nr_columns = columns.len();
        let nr_rows = columns.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(nr_rows * nr_columns);
        for column in columns {
            if column.len() != nr_rows {
                return Err(Error::buffer_length(nr_rows, column.len()));
            }
            data.extend(column);
        }

        Ok(Self { nr_rows, nr_columns, data })
    }

    /// Create a matrix from (row, column, value) combinations.
    ///
    /// Unmentioned cells are zero; a repeated cell keeps the last value written.
    pub fn from_indexed(
        nr_rows: usize,
        nr_columns: usize,
        data: impl IntoIterator<Item = (usize, usize, T)>,
    ) -> Result<Self, Error> {
        let mut matrix = Self::zero(nr_rows, nr_columns);
        for (i, j, value) in data {
            if i >= nr_rows {
                return Err(Error::index("row", i, nr_rows));
            }
            if j >= nr_columns {
                return Err(Error::index("column", j, nr_columns));
            }
            matrix.set_unchecked(i, j, value);
        }

        Ok(matrix)
    }

    /// Create a matrix from row vectors of any representation.
    ///
    /// All vectors must have the same length.
    pub fn from_row_vectors(rows: &[VectorStorage<T>]) -> Result<Self, Error> {
        let nr_rows = rows.len();
        let nr_columns = rows.first().map_or(0, VectorStorage::len);
        let mut matrix = Self::zero(nr_rows, nr_columns);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != nr_columns {
                return Err(Error::buffer_length(nr_columns, row.len()));
            }
            for (j, value) in row.iter_non_zero() {
                matrix.set_unchecked(i, j, value.clone());
            }
        }

        Ok(matrix)
    }

    /// Create a matrix from column vectors of any representation.
    ///
    /// All vectors must have the same length.
    pub fn from_column_vectors(columns: &[VectorStorage<T>]) -> Result<Self, Error> {
        let nr_columns = columns.len();
        let nr_rows = columns.first().map_or(0, VectorStorage::len);
        let mut matrix = Self::zero(nr_rows, nr_columns);
        for (j, column) in columns.iter().enumerate() {
            if column.len() != nr_rows {
                return Err(Error::buffer_length(nr_rows, column.len()));
            }
            for (i, value) in column.iter_non_zero() {
                matrix.set_unchecked(i, j, value.clone());
            }
        }

        Ok(matrix)
    }

    /// Create a square identity matrix.
    pub fn identity(size: usize) -> Self
    where
        T: One,
    {
        Self::from_fn(size, size, |i, j| if i == j { T::one() } else { T::zero() })
    }

    /// Create a dense copy of a storage of any representation.
    pub fn of_storage(storage: &MatrixStorage<T>) -> Self {
        let mut matrix = Self::zero(storage.nr_rows(), storage.nr_columns());
        for (i, j, value) in storage.iter_non_zero() {
            matrix.set_unchecked(i, j, value.clone());
        }

        matrix
    }

    /// Number of rows represented.
    pub fn nr_rows(&self) -> usize {
        self.nr_rows
    }

    /// Number of columns represented.
    pub fn nr_columns(&self) -> usize {
        self.nr_columns
    }

    /// A view of the column-major backing buffer.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The column-major backing buffer.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Where cell (`i`, `j`) lives in the flat buffer.
    pub(crate) fn index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.nr_rows);
        debug_assert!(j < self.nr_columns);

        j * self.nr_rows + i
    }

    pub(crate) fn get_unchecked(&self, i: usize, j: usize) -> T {
        self.data[self.index(i, j)].clone()
    }

    pub(crate) fn set_unchecked(&mut self, i: usize, j: usize, value: T) {
        let index = self.index(i, j);
        self.data[index] = value;
    }

    /// Zero out a rectangular block, one column segment at a time.
    pub(crate) fn clear_block(&mut self, row: usize, nr_rows: usize, column: usize, nr_columns: usize) {
        debug_assert!(row + nr_rows <= self.nr_rows);
        debug_assert!(column + nr_columns <= self.nr_columns);

        for j in column..(column + nr_columns) {
            let start = j * self.nr_rows + row;
            for value in &mut self.data[start..(start + nr_rows)] {
                *value = T::zero();
            }
        }
    }

    /// The transpose as a new dense matrix.
    pub(crate) fn transposed(&self) -> Self {
        Self::from_fn(self.nr_columns, self.nr_rows, |i, j| self.get_unchecked(j, i))
    }

    /// Transpose a square matrix in place by swapping mirrored cells.
    pub(crate) fn transpose_square_inplace(&mut self) {
        debug_assert_eq!(self.nr_rows, self.nr_columns);

        for j in 0..self.nr_columns {
            for i in (j + 1)..self.nr_rows {
                let upper = self.index(i, j);
                let lower = self.index(j, i);
                self.data.swap(upper, lower);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::matrix::dense::Dense;

    #[test]
    fn new_is_column_major() {
        // A 2x3 matrix from a column-major buffer.
        let m = Dense::new(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(m.get_unchecked(0, 0), 1);
        assert_eq!(m.get_unchecked(1, 0), 2);
        assert_eq!(m.get_unchecked(0, 1), 3);
        assert_eq!(m.get_unchecked(1, 2), 6);

        assert_eq!(
            Dense::new(2, 3, vec![1]),
            Err(Error::buffer_length(6, 1)),
        );
    }

    #[test]
    fn row_major_reordering() {
        let column_major = Dense::new(2, 3, vec![1, 4, 2, 5, 3, 6]).unwrap();
        let row_major = Dense::from_row_major(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(column_major, row_major);
    }

    #[test]
    fn from_rows_and_columns() {
        let from_rows = Dense::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        let from_columns = Dense::from_columns(vec![vec![1, 4], vec![2, 5], vec![3, 6]]).unwrap();
        assert_eq!(from_rows, from_columns);

        assert!(Dense::from_rows(vec![vec![1, 2], vec![3]]).is_err());
    }

    #[test]
    fn from_indexed_and_vectors() {
        use crate::vector::VectorStorage;

        let indexed = Dense::from_indexed(2, 2, vec![(0, 1, 3), (1, 0, 4)]).unwrap();
        assert_eq!(indexed, Dense::from_rows(vec![vec![0, 3], vec![4, 0]]).unwrap());
        assert!(Dense::from_indexed(2, 2, vec![(2, 0, 1)]).is_err());

        let rows = [
            VectorStorage::dense(vec![0, 3]),
            VectorStorage::sparse(vec![(0, 4)], 2).unwrap(),
        ];
        assert_eq!(Dense::from_row_vectors(&rows).unwrap(), indexed);

        let columns = [
            VectorStorage::sparse(vec![(1, 4)], 2).unwrap(),
            VectorStorage::dense(vec![3, 0]),
        ];
        assert_eq!(Dense::from_column_vectors(&columns).unwrap(), indexed);

        let ragged = [VectorStorage::dense(vec![1]), VectorStorage::dense(vec![1, 2])];
        assert!(Dense::from_row_vectors(&ragged).is_err());
    }

    #[test]
    fn identity() {
        let m = Dense::<i32>::identity(3);
        assert_eq!(m.get_unchecked(0, 0), 1);
        assert_eq!(m.get_unchecked(2, 2), 1);
        assert_eq!(m.get_unchecked(0, 1), 0);
    }

    #[test]
    fn clear_block() {
        let mut m = Dense::from_rows(vec![
            vec![1, 2, 3],
            vec![4, 5, 6],
            vec![7, 8, 9],
        ]).unwrap();
        m.clear_block(1, 2, 0, 2);
        assert_eq!(m, Dense::from_rows(vec![
            vec![1, 2, 3],
            vec![0, 0, 6],
            vec![0, 0, 9],
        ]).unwrap());
    }

    #[test]
    fn transpose() {
        let m = Dense::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        let transposed = m.transposed();
        assert_eq!(transposed, Dense::from_rows(vec![vec![1, 4], vec![2, 5], vec![3, 6]]).unwrap());

        let mut square = Dense::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        square.transpose_square_inplace();
        assert_eq!(square, Dense::from_rows(vec![vec![1, 3], vec![2, 4]]).unwrap());
    }
}
