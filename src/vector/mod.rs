//! # Vector storage
//!
//! Dense and sparse backing representations behind one bounds-checked facade. The facade picks an
//! optimized code path when the representations of two operands combine well and falls back to a
//! correct element-wise loop otherwise.
use std::hash::{Hash, Hasher};
use std::mem;
use std::ops::Range;

use itertools::EitherOrBoth;
use itertools::Itertools;

use crate::{ExistingData, SparseTuple, Zeros};
use crate::error::Error;
use crate::traits::Scalar;
use crate::utilities::HASH_SAMPLE_SIZE;

pub use dense::Dense as DenseVector;
pub use sparse::Sparse as SparseVector;

mod dense;
mod sparse;

/// The closed set of vector backing representations.
///
/// All operations are available on any representation; each variant only changes how elements are
/// stored and which code paths are fast. The represented length is fixed for the lifetime of an
/// instance.
#[derive(Debug, Clone)]
pub enum VectorStorage<T> {
    /// Flat buffer with every logical element explicit, O(1) access.
    Dense(DenseVector<T>),
    /// Sorted (index, value) entries with binary-search access.
    Sparse(SparseVector<T>),
}

impl<T: Scalar> VectorStorage<T> {
    /// A dense vector owning the provided buffer.
    pub fn dense(data: Vec<T>) -> Self {
        Self::Dense(DenseVector { data })
    }

    /// A dense vector of zeros.
    pub fn dense_zero(len: usize) -> Self {
        Self::Dense(DenseVector::zero(len))
    }

    /// A sparse vector of length `len` from (index, value) combinations.
    ///
    /// See [`SparseVector::new`] for the normalization applied.
    pub fn sparse(tuples: Vec<SparseTuple<T>>, len: usize) -> Result<Self, Error> {
        SparseVector::new(tuples, len).map(Self::Sparse)
    }

    /// A sparse vector without any stored entries.
    pub fn sparse_zero(len: usize) -> Self {
        Self::Sparse(SparseVector::zero(len))
    }

    /// Number of elements represented.
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(vector) => vector.len(),
            Self::Sparse(vector) => vector.len(),
        }
    }

    /// Whether the vector has zero length.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Representation tag: `true` for the dense back-end.
    pub fn is_dense(&self) -> bool {
        matches!(self, Self::Dense(_))
    }

    /// Retrieve the value at an index.
    pub fn get(&self, i: usize) -> Result<T, Error> {
        if i >= self.len() {
            return Err(Error::index("element", i, self.len()));
        }

        Ok(self.get_unchecked(i))
    }

    /// Set the value at an index.
    ///
    /// Depending on the representation this can be an expensive operation: the sparse back-end
    /// shifts all trailing entries on insertion and removal.
    pub fn set(&mut self, i: usize, value: T) -> Result<(), Error> {
        if i >= self.len() {
            return Err(Error::index("element", i, self.len()));
        }

        self.set_unchecked(i, value);
        Ok(())
    }

    pub(crate) fn get_unchecked(&self, i: usize) -> T {
        match self {
            Self::Dense(vector) => vector.get_unchecked(i),
            Self::Sparse(vector) => vector.get_unchecked(i),
        }
    }

    pub(crate) fn set_unchecked(&mut self, i: usize, value: T) {
        match self {
            Self::Dense(vector) => vector.set_unchecked(i, value),
            Self::Sparse(vector) => vector.set_unchecked(i, value),
        }
    }

    /// Zero out the entire vector.
    pub fn clear(&mut self) {
        match self {
            Self::Dense(vector) => {
                let len = vector.len();
                vector.clear_range(0..len);
            },
            Self::Sparse(vector) => vector.clear(),
        }
    }

    /// Zero out a range of elements.
    pub fn clear_range(&mut self, range: Range<usize>) -> Result<(), Error> {
        if range.end > self.len() {
            return Err(Error::range("element", range.start, range.end - range.start, self.len()));
        }
        if range.start >= range.end {
            return Ok(());
        }

        self.clear_range_unchecked(range);
        Ok(())
    }

    pub(crate) fn clear_range_unchecked(&mut self, range: Range<usize>) {
        match self {
            Self::Dense(vector) => vector.clear_range(range),
            Self::Sparse(vector) => vector.clear_range(range),
        }
    }

    /// Copy all elements into a target of the same length.
    ///
    /// # Arguments
    ///
    /// * `target`: Storage of any representation with the same length.
    /// * `existing`: Whether the target must be zeroed before writing. A sparse-to-sparse copy
    /// replaces the target's entries wholesale either way, which is exactly the unnecessary
    /// full-zero pass that `Skip` exists to avoid on other target kinds.
    pub fn copy_to(&self, target: &mut Self, existing: ExistingData) -> Result<(), Error> {
        if self.len() != target.len() {
            return Err(Error::shapes(self.len(), target.len()));
        }

        match (self, target) {
            (Self::Dense(source), Self::Dense(target)) => {
                target.data.clone_from_slice(&source.data);
            },
            (Self::Sparse(source), Self::Sparse(target)) => {
                target.set_entries(source.indices().to_vec(), source.values().to_vec());
            },
            (Self::Sparse(source), Self::Dense(target)) => {
                if existing == ExistingData::Clear {
                    let len = target.len();
                    target.clear_range(0..len);
                }
                for (&i, value) in source.indices().iter().zip(source.values()) {
                    target.set_unchecked(i, value.clone());
                }
            },
            (Self::Dense(source), Self::Sparse(target)) => {
                let (indices, values) = source.data.iter().enumerate()
                    .filter(|(_, value)| !value.is_zero())
                    .map(|(i, value)| (i, value.clone()))
                    .unzip();
                target.set_entries(indices, values);
            },
        }

        Ok(())
    }

    /// Copy a linear sub-range into a target, with independent source and target offsets.
    ///
    /// # Arguments
    ///
    /// * `target`: Storage of any representation; only `[target_index, target_index + count)` is
    /// written.
    /// * `source_index`, `target_index`, `count`: The ranges to read and write; both are validated
    /// up front.
    /// * `existing`: Whether the targeted range must be zeroed before writing.
    pub fn copy_sub_vector_to(
        &self,
        target: &mut Self,
        source_index: usize,
        target_index: usize,
        count: usize,
        existing: ExistingData,
    ) -> Result<(), Error> {
        if count > self.len() || source_index > self.len() - count {
            return Err(Error::range("source element", source_index, count, self.len()));
        }
        if count > target.len() || target_index > target.len() - count {
            return Err(Error::range("target element", target_index, count, target.len()));
        }

        match (self, target) {
            (Self::Dense(source), Self::Dense(target)) => {
                target.data[target_index..(target_index + count)]
                    .clone_from_slice(&source.data[source_index..(source_index + count)]);
            },
            (Self::Sparse(source), Self::Sparse(target)) => {
                let keep = target.position_range(target_index..(target_index + count));
                let mut indices = Vec::new();
                let mut values = Vec::new();
                for position in 0..keep.start {
                    indices.push(target.indices()[position]);
                    values.push(target.values()[position].clone());
                }
                for position in source.position_range(source_index..(source_index + count)) {
                    indices.push(source.indices()[position] - source_index + target_index);
                    values.push(source.values()[position].clone());
                }
                for position in keep.end..target.value_count() {
                    indices.push(target.indices()[position]);
                    values.push(target.values()[position].clone());
                }
                target.set_entries(indices, values);
            },
            (source, target) => {
                if existing == ExistingData::Clear {
                    target.clear_range_unchecked(target_index..(target_index + count));
                }
                for offset in 0..count {
                    let value = source.get_unchecked(source_index + offset);
                    if !value.is_zero() {
                        target.set_unchecked(target_index + offset, value);
                    }
                }
            },
        }

        Ok(())
    }

    /// Apply a function to every element in place.
    ///
    /// # Arguments
    ///
    /// * `f`: Replacement function.
    /// * `zeros`: With [`Zeros::AllowSkip`] the function may not be invoked on implicit zeros,
    /// which is only correct when `f` maps zero to zero. Stored entries whose result is zero are
    /// physically dropped.
    pub fn map_inplace(&mut self, mut f: impl FnMut(T) -> T, zeros: Zeros) {
        self.map_indexed_inplace(|_, value| f(value), zeros);
    }

    /// Apply an index-aware function to every element in place.
    ///
    /// See [`Self::map_inplace`] for the `zeros` semantics.
    pub fn map_indexed_inplace(&mut self, mut f: impl FnMut(usize, T) -> T, zeros: Zeros) {
        match self {
            Self::Dense(vector) => {
                for (i, value) in vector.data.iter_mut().enumerate() {
                    *value = f(i, mem::replace(value, T::zero()));
                }
            },
            Self::Sparse(vector) => match zeros {
                Zeros::AllowSkip => {
                    let (indices, values) = vector.indices().iter().zip(vector.values())
                        .map(|(&i, value)| (i, f(i, value.clone())))
                        .filter(|(_, value)| !value.is_zero())
                        .unzip();
                    vector.set_entries(indices, values);
                },
                Zeros::NoSkip => {
                    let mut indices = Vec::new();
                    let mut values = Vec::new();
                    let mut cursor = 0;
                    for i in 0..vector.len() {
                        let original = if cursor < vector.value_count() && vector.indices()[cursor] == i {
                            cursor += 1;
                            vector.values()[cursor - 1].clone()
                        } else {
                            T::zero()
                        };
                        let mapped = f(i, original);
                        if !mapped.is_zero() {
                            indices.push(i);
                            values.push(mapped);
                        }
                    }
                    vector.set_entries(indices, values);
                },
            },
        }
    }

    /// Apply a function to every element, writing the results into a target of the same length.
    ///
    /// The target may store a different scalar type.
    pub fn map_to<U: Scalar>(
        &self,
        target: &mut VectorStorage<U>,
        mut f: impl FnMut(T) -> U,
        zeros: Zeros,
        existing: ExistingData,
    ) -> Result<(), Error> {
        if self.len() != target.len() {
            return Err(Error::shapes(self.len(), target.len()));
        }

        match (self, target) {
            (Self::Dense(source), VectorStorage::Dense(target)) => {
                for (from, to) in source.data.iter().zip(&mut target.data) {
                    *to = f(from.clone());
                }
            },
            (Self::Sparse(source), VectorStorage::Sparse(target)) if zeros == Zeros::AllowSkip => {
                let (indices, values) = source.indices().iter().zip(source.values())
                    .map(|(&i, value)| (i, f(value.clone())))
                    .filter(|(_, value)| !value.is_zero())
                    .unzip();
                target.set_entries(indices, values);
            },
            (source, target) => {
                if existing == ExistingData::Clear {
                    target.clear();
                }
                match zeros {
                    Zeros::AllowSkip => {
                        for (i, value) in source.iter_non_zero() {
                            target.set_unchecked(i, f(value.clone()));
                        }
                    },
                    Zeros::NoSkip => {
                        for (i, value) in source.iter().enumerate() {
                            target.set_unchecked(i, f(value));
                        }
                    },
                }
            },
        }

        Ok(())
    }

    /// Reduce all elements to a single accumulator.
    ///
    /// # Arguments
    ///
    /// * `initial`: Starting accumulator.
    /// * `f`: Folding function.
    /// * `finalize`: Applied to the accumulator and the number of elements the folding function
    /// was invoked on; with [`Zeros::AllowSkip`] on a sparse operand that is the stored entry
    /// count, otherwise the full length. Mean-style aggregations need that count.
    /// * `zeros`: See [`Zeros`].
    pub fn fold<U>(
        &self,
        initial: U,
        mut f: impl FnMut(U, T) -> U,
        finalize: impl FnOnce(U, usize) -> U,
        zeros: Zeros,
    ) -> U {
        match (self, zeros) {
            (Self::Sparse(vector), Zeros::AllowSkip) => {
                let mut accumulator = initial;
                for value in vector.values() {
                    accumulator = f(accumulator, value.clone());
                }
                finalize(accumulator, vector.value_count())
            },
            _ => {
                let mut accumulator = initial;
                let mut count = 0;
                for value in self.iter() {
                    accumulator = f(accumulator, value);
                    count += 1;
                }
                finalize(accumulator, count)
            },
        }
    }

    /// Reduce two co-shaped vectors pairwise to a single accumulator.
    ///
    /// When both operands are sparse and zeros may be skipped, the stored entries are merged in a
    /// single lock-step walk over both sorted index streams.
    pub fn fold2<U, T2: Scalar>(
        &self,
        other: &VectorStorage<T2>,
        initial: U,
        mut f: impl FnMut(U, T, T2) -> U,
        finalize: impl FnOnce(U, usize) -> U,
        zeros: Zeros,
    ) -> Result<U, Error> {
        if self.len() != other.len() {
            return Err(Error::shapes(self.len(), other.len()));
        }

        match (self, other, zeros) {
            (Self::Sparse(left), VectorStorage::Sparse(right), Zeros::AllowSkip) => {
                let mut accumulator = initial;
                let mut count = 0;
                let pairs = left.indices().iter().zip(left.values())
                    .merge_join_by(
                        right.indices().iter().zip(right.values()),
                        |left, right| left.0.cmp(right.0),
                    );
                for pair in pairs {
                    let (left, right) = match pair {
                        EitherOrBoth::Both((_, left), (_, right)) => (left.clone(), right.clone()),
                        EitherOrBoth::Left((_, left)) => (left.clone(), T2::zero()),
                        EitherOrBoth::Right((_, right)) => (T::zero(), right.clone()),
                    };
                    accumulator = f(accumulator, left, right);
                    count += 1;
                }
                Ok(finalize(accumulator, count))
            },
            _ => {
                let mut accumulator = initial;
                let mut count = 0;
                for (left, right) in self.iter().zip(other.iter()) {
                    accumulator = f(accumulator, left, right);
                    count += 1;
                }
                Ok(finalize(accumulator, count))
            },
        }
    }

    /// Locate the first element satisfying a predicate, in index order.
    ///
    /// With [`Zeros::AllowSkip`] the predicate is assumed to reject the zero value and implicit
    /// zeros are not tested.
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool, zeros: Zeros) -> Option<(usize, T)> {
        match (self, zeros) {
            (Self::Sparse(vector), Zeros::AllowSkip) => {
                vector.indices().iter().zip(vector.values())
                    .find(|(_, value)| predicate(value))
                    .map(|(&i, value)| (i, value.clone()))
            },
            _ => {
                self.iter().enumerate()
                    .find(|(_, value)| predicate(value))
                    .map(|(i, value)| (i, value))
            },
        }
    }

    /// Locate the first position where the pair of co-located elements satisfies a predicate.
    ///
    /// Two sparse operands are walked in lock-step over their sorted index streams, so the scan
    /// costs O(stored entries) rather than O(length); this is also the equality path.
    pub fn find2<T2: Scalar>(
        &self,
        other: &VectorStorage<T2>,
        mut predicate: impl FnMut(&T, &T2) -> bool,
        zeros: Zeros,
    ) -> Result<Option<(usize, T, T2)>, Error> {
        if self.len() != other.len() {
            return Err(Error::shapes(self.len(), other.len()));
        }

        match (self, other, zeros) {
            (Self::Sparse(left), VectorStorage::Sparse(right), Zeros::AllowSkip) => {
                let pairs = left.indices().iter().zip(left.values())
                    .merge_join_by(
                        right.indices().iter().zip(right.values()),
                        |left, right| left.0.cmp(right.0),
                    );
                for pair in pairs {
                    let (i, left, right) = match pair {
                        EitherOrBoth::Both((&i, left), (_, right)) => (i, left.clone(), right.clone()),
                        EitherOrBoth::Left((&i, left)) => (i, left.clone(), T2::zero()),
                        EitherOrBoth::Right((&i, right)) => (i, T::zero(), right.clone()),
                    };
                    if predicate(&left, &right) {
                        return Ok(Some((i, left, right)));
                    }
                }
                Ok(None)
            },
            _ => {
                for (i, (left, right)) in self.iter().zip(other.iter()).enumerate() {
                    if predicate(&left, &right) {
                        return Ok(Some((i, left, right)));
                    }
                }
                Ok(None)
            },
        }
    }

    /// Iterate over all logical elements in index order.
    ///
    /// Yields exactly [`Self::len`] values, implicit zeros included.
    pub fn iter(&self) -> Elements<'_, T> {
        Elements {
            inner: match self {
                Self::Dense(vector) => ElementsInner::Dense(vector.data.iter()),
                Self::Sparse(vector) => ElementsInner::Sparse {
                    indices: vector.indices(),
                    values: vector.values(),
                    cursor: 0,
                    next: 0,
                    len: vector.len(),
                },
            },
        }
    }

    /// Iterate over the non-zero elements with their indices, in index order.
    ///
    /// Explicitly stored zeros are not yielded.
    pub fn iter_non_zero(&self) -> NonZeroElements<'_, T> {
        NonZeroElements {
            inner: match self {
                Self::Dense(vector) => NonZeroInner::Dense { values: &vector.data, next: 0 },
                Self::Sparse(vector) => NonZeroInner::Sparse {
                    indices: vector.indices(),
                    values: vector.values(),
                    next: 0,
                },
            },
        }
    }
}

/// Element-wise comparison with early exit.
///
/// An explicitly stored zero equals an implicit zero; two sparse operands are compared by a
/// merge walk over their stored entries only.
impl<T: Scalar> PartialEq for VectorStorage<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && matches!(
                self.find2(other, |left, right| left != right, Zeros::AllowSkip),
                Ok(None)
            )
    }
}

/// Samples at most the first 25 logical elements; see [`crate::MatrixStorage`]'s `Hash`
/// documentation for the tradeoff.
impl<T: Scalar + Hash> Hash for VectorStorage<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for value in self.iter().take(HASH_SAMPLE_SIZE) {
            value.hash(state);
        }
    }
}

/// Iterator over all logical elements of a vector, implicit zeros included.
#[derive(Debug)]
pub struct Elements<'a, T> {
    inner: ElementsInner<'a, T>,
}

#[derive(Debug)]
enum ElementsInner<'a, T> {
    Dense(std::slice::Iter<'a, T>),
    Sparse {
        indices: &'a [usize],
        values: &'a [T],
        cursor: usize,
        next: usize,
        len: usize,
    },
}

impl<T: Scalar> Iterator for Elements<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ElementsInner::Dense(values) => values.next().cloned(),
            ElementsInner::Sparse { indices, values, cursor, next, len } => {
                if next == len {
                    return None;
                }
                let value = if *cursor < indices.len() && indices[*cursor] == *next {
                    *cursor += 1;
                    values[*cursor - 1].clone()
                } else {
                    T::zero()
                };
                *next += 1;
                Some(value)
            },
        }
    }
}

/// Iterator over the non-zero elements of a vector with their indices.
#[derive(Debug)]
pub struct NonZeroElements<'a, T> {
    inner: NonZeroInner<'a, T>,
}

#[derive(Debug)]
enum NonZeroInner<'a, T> {
    Dense {
        values: &'a [T],
        next: usize,
    },
    Sparse {
        indices: &'a [usize],
        values: &'a [T],
        next: usize,
    },
}

impl<'a, T: Scalar> Iterator for NonZeroElements<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            NonZeroInner::Dense { values, next } => {
                let values: &'a [T] = *values;
                while *next < values.len() {
                    let i = *next;
                    *next += 1;
                    if !values[i].is_zero() {
                        return Some((i, &values[i]));
                    }
                }
                None
            },
            NonZeroInner::Sparse { indices, values, next } => {
                let values: &'a [T] = *values;
                while *next < indices.len() {
                    let position = *next;
                    *next += 1;
                    if !values[position].is_zero() {
                        return Some((indices[position], &values[position]));
                    }
                }
                None
            },
        }
    }
}

#[cfg(test)]
mod test {
    //! Shared test bodies, instantiated for every representation the way the operation allows.
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use relp_num::{R64, Rational64};

    use crate::{ExistingData, Zeros};
    use crate::error::Error;
    use crate::vector::VectorStorage;

    /// The vector `[0, 5, 6]` in the requested representation.
    fn test_vector(dense: bool) -> VectorStorage<i64> {
        if dense {
            VectorStorage::dense(vec![0, 5, 6])
        } else {
            VectorStorage::sparse(vec![(1, 5), (2, 6)], 3).unwrap()
        }
    }

    macro_rules! for_each_representation {
        ($name:ident) => {
            $name(test_vector(true));
            $name(test_vector(false));
        };
    }

    #[test]
    fn get_set() {
        fn body(mut v: VectorStorage<i64>) {
            assert_eq!(v.get(0), Ok(0));
            assert_eq!(v.get(1), Ok(5));

            v.set(0, 3).unwrap();
            assert_eq!(v.get(0), Ok(3));

            v.set(1, 0).unwrap();
            assert_eq!(v.get(1), Ok(0));

            assert_eq!(v.get(400), Err(Error::index("element", 400, 3)));
            assert_eq!(v.set(3, 1), Err(Error::index("element", 3, 3)));
        }
        for_each_representation!(body);
    }

    #[test]
    fn copy_to_round_trip() {
        for source_dense in [true, false] {
            for target_dense in [true, false] {
                for existing in [ExistingData::Clear, ExistingData::Skip] {
                    let source = test_vector(source_dense);
                    let mut target = if target_dense {
                        VectorStorage::dense_zero(3)
                    } else {
                        VectorStorage::sparse_zero(3)
                    };
                    source.copy_to(&mut target, existing).unwrap();
                    assert_eq!(source, target);
                }
            }
        }
    }

    #[test]
    fn copy_to_clear_overwrites_stale_values() {
        let source = test_vector(false);
        let mut target = VectorStorage::dense(vec![7, 7, 7]);
        source.copy_to(&mut target, ExistingData::Clear).unwrap();
        assert_eq!(source, target);
    }

    #[test]
    fn copy_to_shape_mismatch() {
        let source = test_vector(true);
        let mut target = VectorStorage::dense_zero(4);
        assert!(matches!(
            source.copy_to(&mut target, ExistingData::Clear),
            Err(Error::DimensionMismatch(_)),
        ));
    }

    #[test]
    fn copy_sub_vector() {
        fn body(source: VectorStorage<i64>) {
            let mut target = VectorStorage::sparse(vec![(0, 9), (4, 9)], 5).unwrap();
            source.copy_sub_vector_to(&mut target, 1, 2, 2, ExistingData::Clear).unwrap();
            assert_eq!(target.get(0), Ok(9));
            assert_eq!(target.get(2), Ok(5));
            assert_eq!(target.get(3), Ok(6));
            assert_eq!(target.get(4), Ok(9));

            // Out of range ranges are rejected up front.
            let mut target = VectorStorage::dense_zero(2);
            assert!(matches!(
                source.copy_sub_vector_to(&mut target, 2, 0, 2, ExistingData::Clear),
                Err(Error::OutOfRange(_)),
            ));
            assert!(matches!(
                source.copy_sub_vector_to(&mut target, 0, 1, 2, ExistingData::Clear),
                Err(Error::OutOfRange(_)),
            ));
        }
        for_each_representation!(body);
    }

    #[test]
    fn map_skip_equivalence() {
        // For a zero-preserving function, skipping zeros and not skipping them agree.
        fn body(v: VectorStorage<i64>) {
            let mut skipping = v.clone();
            let mut visiting = v.clone();
            skipping.map_inplace(|value| 2 * value, Zeros::AllowSkip);
            visiting.map_inplace(|value| 2 * value, Zeros::NoSkip);
            assert_eq!(skipping, visiting);
            assert_eq!(skipping.get(1), Ok(10));
        }
        for_each_representation!(body);
    }

    #[test]
    fn map_no_skip_reaches_implicit_zeros() {
        let mut v = test_vector(false);
        v.map_inplace(|value| value + 1, Zeros::NoSkip);
        assert_eq!(v.get(0), Ok(1));
        assert_eq!(v.get(1), Ok(6));

        // Results that become zero are physically dropped.
        let mut v = test_vector(false);
        v.map_inplace(|value| if value == 5 { 0 } else { value }, Zeros::AllowSkip);
        match &v {
            VectorStorage::Sparse(v) => assert_eq!(v.value_count(), 1),
            VectorStorage::Dense(_) => unreachable!(),
        }
    }

    #[test]
    fn map_indexed() {
        fn body(mut v: VectorStorage<i64>) {
            v.map_indexed_inplace(|i, value| value + i as i64, Zeros::NoSkip);
            assert_eq!(v.get(0), Ok(0));
            assert_eq!(v.get(1), Ok(6));
            assert_eq!(v.get(2), Ok(8));
        }
        for_each_representation!(body);
    }

    #[test]
    fn map_to_other_scalar_type() {
        fn body(v: VectorStorage<i64>) {
            let mut target = VectorStorage::<i32>::sparse_zero(3);
            v.map_to(
                &mut target,
                |value| value as i32,
                Zeros::AllowSkip,
                ExistingData::Clear,
            ).unwrap();
            assert_eq!(target.get(1), Ok(5));
            assert_eq!(target.get(0), Ok(0));
        }
        for_each_representation!(body);
    }

    #[test]
    fn fold_with_finalize() {
        fn body(v: VectorStorage<i64>) {
            let sum = v.fold(0, |accumulator, value| accumulator + value, |total, _| total, Zeros::AllowSkip);
            assert_eq!(sum, 11);

            // The element count reaches the finalizer, mean-style.
            let visited = v.fold(0, |accumulator, _| accumulator, |_, count| count, Zeros::NoSkip);
            assert_eq!(visited, 3);
        }
        for_each_representation!(body);

        // Skipping zeros on a sparse operand only visits the stored entries.
        let v = test_vector(false);
        let visited = v.fold(0, |accumulator, _| accumulator, |_, count| count, Zeros::AllowSkip);
        assert_eq!(visited, 2);
    }

    #[test]
    fn fold2_merge_walk() {
        let left = VectorStorage::sparse(vec![(1, 5), (3, 2)], 5).unwrap();
        let right = VectorStorage::sparse(vec![(1, 1), (4, 7)], 5).unwrap();
        let sum_of_pair_sums = left.fold2(
            &right,
            0,
            |accumulator, a, b| accumulator + a + b,
            |total, _| total,
            Zeros::AllowSkip,
        ).unwrap();
        assert_eq!(sum_of_pair_sums, 5 + 1 + 2 + 7);

        // Only the union of stored entries is visited.
        let visited = left.fold2(&right, 0, |a, _, _| a, |_, count| count, Zeros::AllowSkip).unwrap();
        assert_eq!(visited, 3);

        let mismatched = VectorStorage::<i64>::dense_zero(4);
        assert!(left.fold2(&mismatched, 0, |a, _, _| a, |a, _| a, Zeros::NoSkip).is_err());
    }

    #[test]
    fn find_and_find2() {
        fn body(v: VectorStorage<i64>) {
            assert_eq!(v.find(|&value| value > 5, Zeros::AllowSkip), Some((2, 6)));
            assert_eq!(v.find(|&value| value > 9, Zeros::AllowSkip), None);
            assert_eq!(v.find(|&value| value == 0, Zeros::NoSkip), Some((0, 0)));
        }
        for_each_representation!(body);

        let left = test_vector(false);
        let right = VectorStorage::sparse(vec![(1, 5), (2, 2)], 3).unwrap();
        let first_difference = left.find2(&right, |a, b| a != b, Zeros::AllowSkip).unwrap();
        assert_eq!(first_difference, Some((2, 6, 2)));
    }

    #[test]
    fn equality_across_representations() {
        assert_eq!(test_vector(true), test_vector(false));

        // An explicitly stored zero equals an implicit one.
        let with_explicit_zero = VectorStorage::sparse(vec![(0, 0), (1, 5), (2, 6)], 3).unwrap();
        assert_eq!(with_explicit_zero, test_vector(false));
        assert_eq!(with_explicit_zero, test_vector(true));

        assert_ne!(test_vector(true), VectorStorage::<i64>::dense_zero(3));
        // Same values, different length.
        assert_ne!(test_vector(true), VectorStorage::dense(vec![0, 5, 6, 0]));
    }

    #[test]
    fn equal_instances_hash_equal() {
        fn hash(v: &VectorStorage<i64>) -> u64 {
            let mut hasher = DefaultHasher::new();
            v.hash(&mut hasher);
            hasher.finish()
        }

        assert_eq!(hash(&test_vector(true)), hash(&test_vector(false)));
    }

    #[test]
    fn iteration() {
        fn body(v: VectorStorage<i64>) {
            assert_eq!(v.iter().collect::<Vec<_>>(), vec![0, 5, 6]);
            assert_eq!(
                v.iter_non_zero().map(|(i, &value)| (i, value)).collect::<Vec<_>>(),
                vec![(1, 5), (2, 6)],
            );
        }
        for_each_representation!(body);
    }

    #[test]
    fn clear() {
        fn body(mut v: VectorStorage<i64>) {
            v.clear_range(1..2).unwrap();
            assert_eq!(v.get(1), Ok(0));
            assert_eq!(v.get(2), Ok(6));

            v.clear();
            assert_eq!(v, VectorStorage::dense_zero(3));

            assert!(matches!(v.clear_range(1..4), Err(Error::OutOfRange(_))));
        }
        for_each_representation!(body);
    }

    #[test]
    fn of_storage_conversions() {
        use crate::vector::{DenseVector, SparseVector};

        for dense in [true, false] {
            let source = test_vector(dense);
            assert_eq!(VectorStorage::Dense(DenseVector::of_storage(&source)), source);
            assert_eq!(VectorStorage::Sparse(SparseVector::of_storage(&source)), source);
        }
    }

    #[test]
    fn rational_scalars() {
        let mut v = VectorStorage::<Rational64>::sparse_zero(2);
        v.set(0, R64!(1, 2)).unwrap();
        v.set(1, R64!(1, 3)).unwrap();
        let total = v.fold(R64!(0), |accumulator, value| accumulator + value, |total, _| total, Zeros::AllowSkip);
        assert_eq!(total, R64!(5, 6));
    }
}
