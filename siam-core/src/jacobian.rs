//! Dense derivative matrices.
//!
//! Every model in the chain exposes hand-derived analytic Jacobians next to
//! its forward computation. Three structures cover the whole chain:
//!
//! - **diagonal**: year-local relations with no cross-year coupling
//!   (damage fraction, per-ton price, the whole consumption/utility
//!   stack).
//! - **lower triangular of ones**: the prefix sum turning a per-ton price
//!   flow into a cumulative price stock.
//! - **chained**: left-multiplication through the prefix sum (or any other
//!   upstream hop), the standard chain rule in matrix form.
//!
//! Scalar objectives collapse a series into a row; those gradients are
//! plain `Array1` vectors rather than 1-row matrices.

use crate::timeseries::FloatValue;
use ndarray::{Array1, Array2};

/// A dense Jacobian, shaped (output length, input length).
pub type Jacobian = Array2<FloatValue>;

/// Diagonal Jacobian from per-year slopes; exactly zero off the diagonal.
pub fn diagonal(slopes: &Array1<FloatValue>) -> Jacobian {
    Array2::from_diag(slopes)
}

/// Identity Jacobian of size `n`.
pub fn identity(n: usize) -> Jacobian {
    Array2::eye(n)
}

/// All-zero Jacobian of size `n` × `n`.
pub fn zeros(n: usize) -> Jacobian {
    Array2::zeros((n, n))
}

/// Lower-triangular matrix of ones: the derivative of a prefix sum.
///
/// Entry (t, s) is 1 for s <= t and 0 above the diagonal: year t's
/// cumulative value depends with unit weight on every flow value at or
/// before t.
pub fn lower_triangular_ones(n: usize) -> Jacobian {
    Array2::from_shape_fn((n, n), |(row, col)| if col <= row { 1.0 } else { 0.0 })
}

/// Compose two derivative hops: `outer` applied after `inner`.
pub fn chain(outer: &Jacobian, inner: &Jacobian) -> Jacobian {
    outer.dot(inner)
}
