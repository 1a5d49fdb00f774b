//! Central-difference derivative verification.
//!
//! The analytic Jacobians exposed by every model are hand-derived; the
//! coupling loop and the test suite cross-check them against a second-order
//! central difference. These kernels are deliberately simple and
//! allocation-heavy; they run a handful of times per verification pass,
//! never in the iteration hot path.

use crate::jacobian::Jacobian;
use crate::timeseries::FloatValue;
use is_close::all_close;
use ndarray::{Array1, Array2};

/// Central-difference Jacobian of a vector-valued function.
///
/// `step` is the absolute perturbation applied to each input entry in turn;
/// pick it relative to the magnitude of the inputs (the truncation error is
/// O(step²)).
pub fn central_difference_jacobian<F>(
    f: &F,
    x: &Array1<FloatValue>,
    step: FloatValue,
) -> Jacobian
where
    F: Fn(&Array1<FloatValue>) -> Array1<FloatValue>,
{
    let n_outputs = f(x).len();
    let n_inputs = x.len();
    let mut jacobian = Array2::zeros((n_outputs, n_inputs));
    for col in 0..n_inputs {
        let mut high = x.clone();
        high[col] += step;
        let mut low = x.clone();
        low[col] -= step;
        let slope = (f(&high) - f(&low)) / (2.0 * step);
        jacobian.column_mut(col).assign(&slope);
    }
    jacobian
}

/// Central-difference gradient of a scalar-valued function.
pub fn central_difference_gradient<F>(
    f: &F,
    x: &Array1<FloatValue>,
    step: FloatValue,
) -> Array1<FloatValue>
where
    F: Fn(&Array1<FloatValue>) -> FloatValue,
{
    let mut gradient = Array1::zeros(x.len());
    for col in 0..x.len() {
        let mut high = x.clone();
        high[col] += step;
        let mut low = x.clone();
        low[col] -= step;
        gradient[col] = (f(&high) - f(&low)) / (2.0 * step);
    }
    gradient
}

/// Element-wise closeness of two Jacobians under combined relative and
/// absolute tolerances.
pub fn jacobians_close(a: &Jacobian, b: &Jacobian, rel_tol: FloatValue, abs_tol: FloatValue) -> bool {
    a.dim() == b.dim()
        && all_close!(
            a.iter().copied(),
            b.iter().copied(),
            rel_tol = rel_tol,
            abs_tol = abs_tol
        )
}

/// Element-wise closeness of two gradient vectors.
pub fn gradients_close(
    a: &Array1<FloatValue>,
    b: &Array1<FloatValue>,
    rel_tol: FloatValue,
    abs_tol: FloatValue,
) -> bool {
    a.len() == b.len()
        && all_close!(
            a.iter().copied(),
            b.iter().copied(),
            rel_tol = rel_tol,
            abs_tol = abs_tol
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jacobian;
    use ndarray::array;

    #[test]
    fn jacobian_of_elementwise_square() {
        // f(x)_i = x_i^2 has Jacobian diag(2 x_i)
        let f = |x: &Array1<FloatValue>| x.mapv(|v| v * v);
        let x = array![1.0, 2.0, 3.0];
        let numeric = central_difference_jacobian(&f, &x, 1e-5);
        let analytic = jacobian::diagonal(&array![2.0, 4.0, 6.0]);
        assert!(jacobians_close(&numeric, &analytic, 1e-8, 1e-8));
    }

    #[test]
    fn jacobian_of_prefix_sum() {
        let f = |x: &Array1<FloatValue>| {
            let mut total = 0.0;
            x.mapv(|v| {
                total += v;
                total
            })
        };
        let x = array![0.5, -1.0, 2.0, 4.0];
        let numeric = central_difference_jacobian(&f, &x, 1e-6);
        let analytic = jacobian::lower_triangular_ones(4);
        assert!(jacobians_close(&numeric, &analytic, 1e-8, 1e-8));
    }

    #[test]
    fn gradient_of_sum_of_squares() {
        let f = |x: &Array1<FloatValue>| x.iter().map(|v| v * v).sum::<FloatValue>();
        let x = array![1.0, -2.0, 0.5];
        let numeric = central_difference_gradient(&f, &x, 1e-5);
        assert!(gradients_close(&numeric, &array![2.0, -4.0, 1.0], 1e-8, 1e-8));
    }

    #[test]
    fn mismatched_shapes_are_never_close() {
        let a = Array2::zeros((2, 2));
        let b = Array2::zeros((3, 3));
        assert!(!jacobians_close(&a, &b, 1e-6, 1e-6));
    }
}
