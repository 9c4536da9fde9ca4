//! # Integration tests
//!
//! Integration tests completely external from the crate. All code written in this module could be
//! written by an external user of the crate: storages are built through the public factories and
//! driven exclusively through the bounds-checked methods.
use relp_num::{R64, Rational64};

use lastore::{
    DenseMatrix, DiagonalMatrix, Error, ExistingData, MatrixStorage, SparseMatrix, VectorStorage,
    Zeros,
};

/// Every representation of the same 3x3 contents, pairwise interchangeable.
fn all_representations() -> Vec<MatrixStorage<i64>> {
    let diagonal = vec![(0, 0, 4), (1, 1, 0), (2, 2, 9)];
    vec![
        MatrixStorage::dense(3, 3, vec![4, 0, 0, 0, 0, 0, 0, 0, 9]).unwrap(),
        MatrixStorage::sparse(3, 3, diagonal).unwrap(),
        MatrixStorage::diagonal(3, 3, vec![4, 0, 9]).unwrap(),
    ]
}

#[test]
fn representations_are_interchangeable() {
    let representations = all_representations();
    for source in &representations {
        for target_template in &representations {
            let mut target = target_template.clone();
            target.clear();
            source.copy_to(&mut target, ExistingData::Skip).unwrap();
            assert_eq!(&target, source);
            assert_eq!(target.get(0, 0), Ok(4));
            assert_eq!(target.get(1, 0), Ok(0));
        }
    }
}

#[test]
fn a_chart_series_can_be_stored_and_read_back_row_major() {
    // A consumer feeding (x, y) points through the storage reads them back in row-major order.
    let points = MatrixStorage::dense(2, 4, vec![0, 10, 1, 11, 2, 12, 3, 13]).unwrap();
    let xs = points.iter_indexed()
        .filter(|&(i, _, _)| i == 0)
        .map(|(_, _, value)| value)
        .collect::<Vec<_>>();
    assert_eq!(xs, vec![0, 1, 2, 3]);

    let mut ys = VectorStorage::dense_zero(4);
    points.copy_row_to(1, &mut ys).unwrap();
    assert_eq!(ys.iter().collect::<Vec<_>>(), vec![10, 11, 12, 13]);
}

#[test]
fn sparse_construction_formats_agree() {
    // [[0, 7, 0], [5, 0, 0]] from triples, compressed-column and compressed-row form.
    let from_triples = SparseMatrix::from_triples(
        2, 3,
        vec![(1, 0, 5), (0, 1, 7)],
    ).unwrap();
    let from_csc = SparseMatrix::from_compressed_column(
        2, 3,
        vec![0, 1, 2, 2],
        vec![1, 0],
        vec![5, 7],
    ).unwrap();
    let from_csr = SparseMatrix::from_compressed_row(
        2, 3,
        vec![0, 1, 2],
        vec![1, 0],
        vec![7, 5],
    ).unwrap();

    let reference = MatrixStorage::Sparse(from_triples);
    assert_eq!(MatrixStorage::Sparse(from_csc), reference);
    assert_eq!(MatrixStorage::Sparse(from_csr), reference);
}

#[test]
fn duplicate_coordinates_merge_by_summation() {
    let m = MatrixStorage::sparse(1, 1, vec![(0, 0, 2), (0, 0, 3)]).unwrap();
    assert_eq!(m.get(0, 0), Ok(5));
    if let MatrixStorage::Sparse(matrix) = &m {
        assert_eq!(matrix.value_count(), 1);
    }
}

#[test]
fn mutation_and_normalization_life_cycle() {
    let mut m = MatrixStorage::<i64>::sparse_zero(2, 2).unwrap();
    m.set(0, 0, 5).unwrap();
    m.set(1, 1, 3).unwrap();
    m.set(0, 0, 0).unwrap();
    if let MatrixStorage::Sparse(matrix) = &mut m {
        assert_eq!(matrix.value_count(), 1);

        // Explicit zeros appear through bulk construction only; push one in and normalize.
        matrix.ensure_diagonal_entries();
        assert_eq!(matrix.value_count(), 2);
        matrix.normalize_zeros();
        assert_eq!(matrix.value_count(), 1);
        assert_eq!(matrix.value_count(), matrix.values().iter().filter(|value| **value != 0).count());
    }
    assert_eq!(m.get(1, 1), Ok(3));
}

#[test]
fn transpose_round_trips_through_any_representation() {
    let m = MatrixStorage::sparse(2, 3, vec![(0, 0, 1), (0, 1, 2), (1, 1, 5), (1, 2, 6)]).unwrap();

    let mut transposed = MatrixStorage::<i64>::sparse_zero(3, 2).unwrap();
    m.transpose_to(&mut transposed).unwrap();

    let mut dense_transposed = MatrixStorage::<i64>::dense_zero(3, 2);
    m.transpose_to(&mut dense_transposed).unwrap();
    assert_eq!(transposed, dense_transposed);

    let mut back = MatrixStorage::<i64>::dense_zero(2, 3);
    transposed.transpose_to(&mut back).unwrap();
    assert_eq!(back, m);
}

#[test]
fn zero_skipping_policies_agree_for_zero_preserving_functions() {
    let m = MatrixStorage::sparse(3, 3, vec![(0, 1, 2), (2, 0, 8)]).unwrap();

    let mut doubled_skipping = m.clone();
    doubled_skipping.map_inplace(|value| 2 * value, Zeros::AllowSkip).unwrap();
    let mut doubled_visiting = m.clone();
    doubled_visiting.map_inplace(|value| 2 * value, Zeros::NoSkip).unwrap();
    assert_eq!(doubled_skipping, doubled_visiting);

    let mut target_skipping = MatrixStorage::<i64>::dense_zero(3, 3);
    m.map_to(&mut target_skipping, |value| 2 * value, Zeros::AllowSkip, ExistingData::Skip).unwrap();
    let mut target_visiting = MatrixStorage::<i64>::dense_zero(3, 3);
    m.map_to(&mut target_visiting, |value| 2 * value, Zeros::NoSkip, ExistingData::Clear).unwrap();
    assert_eq!(target_skipping, target_visiting);
    assert_eq!(target_skipping.get(2, 0), Ok(16));
}

#[test]
fn aggregation_with_element_counts() {
    let m = MatrixStorage::dense(2, 2, vec![1, 3, 5, 7]).unwrap();
    // An average per row needs the processed count in the finalizer.
    let means = m.fold_by_row(
        0,
        |accumulator, value| accumulator + value,
        |total, count| total / count as i64,
        Zeros::NoSkip,
    );
    assert_eq!(means, vec![(1 + 5) / 2, (3 + 7) / 2]);
}

#[test]
fn vector_storages_mirror_the_matrix_behavior() {
    let mut sparse = VectorStorage::<i64>::sparse_zero(4);
    sparse.set(2, 5).unwrap();
    sparse.set(0, 1).unwrap();

    let dense = VectorStorage::dense(vec![1, 0, 5, 0]);
    assert_eq!(sparse, dense);

    let mut copied = VectorStorage::<i64>::dense_zero(4);
    sparse.copy_to(&mut copied, ExistingData::Clear).unwrap();
    assert_eq!(copied, dense);

    sparse.set(2, 0).unwrap();
    assert_eq!(sparse.get(2), Ok(0));
    assert_eq!(sparse.iter_non_zero().count(), 1);

    assert!(matches!(sparse.get(4), Err(Error::OutOfRange(_))));
}

#[test]
fn errors_are_contract_violations() {
    let m = all_representations().pop().unwrap();

    assert!(matches!(m.get(3, 0), Err(Error::OutOfRange(_))));

    let mut wrong_shape = MatrixStorage::<i64>::dense_zero(2, 2);
    assert!(matches!(
        m.copy_to(&mut wrong_shape, ExistingData::Clear),
        Err(Error::DimensionMismatch(_)),
    ));

    let mut diagonal = MatrixStorage::<i64>::diagonal_zero(3, 3);
    assert!(matches!(diagonal.set(0, 2, 1), Err(Error::InvalidMutation(_))));

    assert!(matches!(
        SparseMatrix::<i64>::zero(usize::MAX, usize::MAX),
        Err(Error::Unsupported(_)),
    ));
}

#[test]
fn conversion_factories_round_trip() {
    let source = MatrixStorage::sparse(3, 3, vec![(0, 2, 2), (1, 0, 4)]).unwrap();

    let dense = MatrixStorage::Dense(DenseMatrix::of_storage(&source));
    assert_eq!(dense, source);

    let back = MatrixStorage::Sparse(SparseMatrix::of_storage(&dense).unwrap());
    assert_eq!(back, source);

    assert!(DiagonalMatrix::try_of_storage(&source).is_err());
}

#[test]
fn exact_rational_arithmetic_is_preserved() {
    let mut m = MatrixStorage::<Rational64>::sparse_zero(2, 2).unwrap();
    m.set(0, 0, R64!(1, 3)).unwrap();
    m.set(1, 0, R64!(1, 6)).unwrap();

    let column_sums = m.fold_by_column(
        R64!(0),
        |accumulator, value| accumulator + value,
        |total, _| total,
        Zeros::AllowSkip,
    );
    assert_eq!(column_sums, vec![R64!(1, 2), R64!(0)]);

    let mut dense = MatrixStorage::<Rational64>::dense_zero(2, 2);
    m.copy_to(&mut dense, ExistingData::Clear).unwrap();
    assert_eq!(dense, m);
}
