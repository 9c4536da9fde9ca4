//! # Traits for elements in storage
//!
//! The engine is generic over the scalar it stores. Almost everything it does is structural, so
//! the only arithmetic hook required is the additive identity ("the zero value") together with the
//! `add` that merges duplicate entries, both taken from [`num_traits::Zero`]. Equality and
//! formatting are needed for comparisons and debug output.
use std::fmt::{Debug, Display};

use num_traits::Zero;

/// Element of a `VectorStorage` or `MatrixStorage` type.
///
/// A bundle of the practical traits every stored value needs, so that the many generic bounds in
/// this crate stay short.
pub trait Element: Clone + PartialEq + Debug + Display {}

impl<T: Clone + PartialEq + Debug + Display> Element for T {}

/// Scalar stored by the backing representations in this crate.
///
/// `Zero` is the numeric provider: it supplies the implicit value of unstored sparse elements and
/// the addition used to merge duplicate entries during normalization.
pub trait Scalar: Element + Zero {}

impl<T: Element + Zero> Scalar for T {}
