//! Helper algorithms for the storage back-ends.
use cumsum::cumsum_owned;

/// How many leading elements the `Hash` implementations sample.
///
/// Hashing visits at most this many logical elements in a fixed traversal order. That is a weak
/// hash that is cheap to compute: two unequal instances of the same shape may collide, but equal
/// instances always hash equal because the traversal is the logical element order, not the
/// physical buffer order of any particular representation.
pub(crate) const HASH_SAMPLE_SIZE: usize = 25;

/// Co-sort a segment of parallel key and value arrays by key.
///
/// The standard library's stable slice sort is used, so entries with equal keys keep their
/// relative order; duplicate-merging relies on that.
///
/// # Arguments
///
/// * `indices`: Keys of the segment, sorted in place.
/// * `values`: Values of the segment, permuted along with the keys.
pub(crate) fn sort_pairs<T: Clone>(indices: &mut [usize], values: &mut [T]) {
    debug_assert_eq!(indices.len(), values.len());

    if indices.is_sorted() {
        return;
    }

    let mut pairs = indices.iter().copied()
        .zip(values.iter().cloned())
        .collect::<Vec<_>>();
    pairs.sort_by_key(|&(index, _)| index);
    for (slot, (index, value)) in pairs.into_iter().enumerate() {
        indices[slot] = index;
        values[slot] = value;
    }
}

/// Turn a per-bucket count array into a compressed pointer array.
///
/// The result has one more element than the input; element `i` is the number of entries in all
/// buckets before bucket `i`, so `result[0] == 0` and the last element is the total count. This is
/// the prefix step of the counting sorts used to build and transpose compressed-row structures.
pub(crate) fn pointers_from_counts(counts: Vec<usize>) -> Vec<usize> {
    let mut pointers = Vec::with_capacity(counts.len() + 1);
    pointers.push(0);
    pointers.extend(cumsum_owned(counts));

    pointers
}

#[cfg(test)]
mod test {
    use crate::utilities::{pointers_from_counts, sort_pairs};

    #[test]
    fn test_sort_pairs() {
        let mut indices = vec![3, 1, 2];
        let mut values = vec![30, 10, 20];
        sort_pairs(&mut indices, &mut values);
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(values, vec![10, 20, 30]);

        // Stability: equal keys keep their input order.
        let mut indices = vec![1, 0, 1];
        let mut values = vec!["a", "b", "c"];
        sort_pairs(&mut indices, &mut values);
        assert_eq!(indices, vec![0, 1, 1]);
        assert_eq!(values, vec!["b", "a", "c"]);

        let mut indices: Vec<usize> = vec![];
        let mut values: Vec<i32> = vec![];
        sort_pairs(&mut indices, &mut values);
        assert_eq!(indices, vec![]);
    }

    #[test]
    fn test_pointers_from_counts() {
        assert_eq!(pointers_from_counts(vec![]), vec![0]);
        assert_eq!(pointers_from_counts(vec![2, 0, 3]), vec![0, 2, 2, 5]);
    }
}
