//! # Sparse vector storage
//!
//! Sorted (index, value) entries over a pair buffer with growth slack, fixed represented length.
//! Mirrors the per-row logic of the compressed-row matrix: binary-search lookup, shift-based
//! insertion and removal, and the same growth and shrink thresholds.
use std::fmt;
use std::fmt::Display;
use std::mem;
use std::ops::Range;

use crate::buffer::PairBuffer;
use crate::error::Error;
use crate::SparseTuple;
use crate::traits::Scalar;
use crate::vector::VectorStorage;

/// A sparse vector over a `PairBuffer` with (index, value) combinations. Indices start at `0`.
///
/// Explicitly stored zeros are permitted; they compare equal to implicit zeros and are dropped by
/// the in-place map machinery.
#[derive(Debug, Clone, PartialEq)]
pub struct Sparse<T> {
    pub(crate) buffer: PairBuffer<T>,
    len: usize,
}

impl<T: Scalar> Sparse<T> {
    /// Create a vector of length `len` from (index, value) combinations.
    ///
    /// The combinations do not need to be sorted and may repeat an index; repeated indices are
    /// merged by summation, like the coordinate-format matrix factory. Explicit zeros are kept.
    ///
    /// # Arguments
    ///
    /// * `tuples`: Internal data values. Will be normalized and directly used for creation.
    /// * `len`: Length of the vector represented (and not necessarily of the internal data
    /// structure).
    pub fn new(mut tuples: Vec<SparseTuple<T>>, len: usize) -> Result<Self, Error> {
        for &(i, _) in &tuples {
            if i >= len {
                return Err(Error::index("element", i, len));
            }
        }

        tuples.sort_by_key(|&(i, _)| i);

        let mut indices = Vec::with_capacity(tuples.len());
        let mut values: Vec<T> = Vec::with_capacity(tuples.len());
        for (index, value) in tuples {
            if indices.last() == Some(&index) {
                let slot = values.len() - 1;
                let previous = mem::replace(&mut values[slot], T::zero());
                values[slot] = previous + value;
            } else {
                indices.push(index);
                values.push(value);
            }
        }

        Ok(Self { buffer: PairBuffer::from_parts(indices, values), len })
    }

    /// Create a vector of length `len` without any stored entries.
    pub fn zero(len: usize) -> Self {
        Self { buffer: PairBuffer::new(), len }
    }

    /// Create a sparse copy of a storage of any representation.
    pub fn of_storage(storage: &VectorStorage<T>) -> Self {
        let (indices, values) = storage.iter_non_zero()
            .map(|(i, value)| (i, value.clone()))
            .unzip();

        Self { buffer: PairBuffer::from_parts(indices, values), len: storage.len() }
    }

    /// The represented length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this vector has zero length.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of stored entries, explicit zeros included.
    pub fn value_count(&self) -> usize {
        self.buffer.len()
    }

    /// The physical capacity of the backing arrays, which may exceed [`Self::value_count`] by
    /// growth slack.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// The stored indices, sorted ascending.
    pub fn indices(&self) -> &[usize] {
        self.buffer.indices()
    }

    /// The stored values, parallel to [`Self::indices`].
    pub fn values(&self) -> &[T] {
        self.buffer.values()
    }

    /// Where index `i` is stored, or where it would be inserted.
    fn position(&self, i: usize) -> Result<usize, usize> {
        self.buffer.indices().binary_search(&i)
    }

    pub(crate) fn get_unchecked(&self, i: usize) -> T {
        debug_assert!(i < self.len);

        match self.position(i) {
            Ok(position) => self.buffer.values()[position].clone(),
            Err(_) => T::zero(),
        }
    }

    /// Write a value at an index.
    ///
    /// A zero physically removes any stored entry, a non-zero overwrites in place or is inserted
    /// at its sorted position. Insertion and removal shift all trailing entries, which makes this
    /// amortized linear in the number of stored entries; the backing arrays grow and shrink per
    /// the pair buffer's thresholds.
    pub(crate) fn set_unchecked(&mut self, i: usize, value: T) {
        debug_assert!(i < self.len);

        match self.position(i) {
            Ok(position) => {
                if value.is_zero() {
                    self.buffer.remove(position);
                } else {
                    self.buffer.values_mut()[position] = value;
                }
            },
            Err(position) => {
                if !value.is_zero() {
                    self.buffer.insert(position, i, value, self.len);
                }
            },
        }
    }

    /// Remove all stored entries.
    pub(crate) fn clear(&mut self) {
        self.buffer.set_parts(Vec::new(), Vec::new());
    }

    /// Remove all stored entries with an index in `range`.
    pub(crate) fn clear_range(&mut self, range: Range<usize>) {
        debug_assert!(range.end <= self.len);

        let positions = self.position_range(range);
        self.buffer.remove_range(positions);
    }

    /// Positions of the stored entries with an index in `range`.
    pub(crate) fn position_range(&self, range: Range<usize>) -> Range<usize> {
        let start = self.buffer.indices().partition_point(|&i| i < range.start);
        let end = self.buffer.indices().partition_point(|&i| i < range.end);

        start..end
    }

    /// Drop stored entries whose value is zero.
    ///
    /// Afterwards the stored entry count equals the number of non-zero elements.
    pub fn normalize_zeros(&mut self) {
        if self.buffer.values().iter().any(T::is_zero) {
            let (indices, values) = self.buffer.indices().iter()
                .zip(self.buffer.values())
                .filter(|(_, value)| !value.is_zero())
                .map(|(&index, value)| (index, value.clone()))
                .unzip();
            self.buffer.set_parts(indices, values);
        }
    }

    /// Replace the stored entries wholesale.
    pub(crate) fn set_entries(&mut self, indices: Vec<usize>, values: Vec<T>) {
        debug_assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
        debug_assert!(indices.last().map_or(true, |&i| i < self.len));

        self.buffer.set_parts(indices, values);
    }
}

impl<T: Scalar> Display for Sparse<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (counter, (index, value)) in self.indices().iter().zip(self.values()).enumerate() {
            if counter > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({} {})", index, value)?;
        }
        write!(f, "]")
    }
}
