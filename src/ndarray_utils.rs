//! A collection of various utilities needed in this library:
//! float literals and conversions for the generic [`Float`],
//! and common checks and reductions on 1D arrays.

use itertools::{Itertools, MinMaxResult};
use ndarray::ArrayView1;

use crate::Float;
use crate::error::{Result, ShearError};

/// Convert an `f64` literal to `F`.
#[inline]
pub(crate) fn lit<F: Float>(x: f64) -> F {
    nalgebra::convert(x)
}

/// Convert `F` to `f64`, for error messages and logging.
#[inline]
pub(crate) fn to_f64<F: Float>(x: F) -> f64 {
    nalgebra::try_convert(x).unwrap_or(f64::NAN)
}

/// Fail with [`ShearError::ShapeMismatch`] unless both arrays have the same length.
pub(crate) fn ensure_same_len<A, B>(
    a: ArrayView1<A>,
    a_name: &str,
    b: ArrayView1<B>,
    b_name: &str,
) -> Result<()> {
    if a.len() != b.len() {
        return Err(ShearError::shape_mismatch(format!(
            "the lengths of {a_name} ({}) and {b_name} ({}) do not match",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// Minimum and maximum of an array, `None` if it is empty.
pub(crate) fn min_max<F: Float>(arr: ArrayView1<F>) -> Option<(F, F)> {
    match arr.iter().copied().minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(x) => Some((x, x)),
        MinMaxResult::MinMax(min, max) => Some((min, max)),
    }
}

/// Arithmetic mean, NaN for no elements.
pub(crate) fn mean<F: Float>(values: impl Iterator<Item = F>) -> F {
    let (sum, n) = values.fold((F::zero(), 0usize), |(sum, n), x| (sum + x, n + 1));
    if n == 0 {
        return lit(f64::NAN);
    }
    sum / lit(n as f64)
}

/// Standard error of the mean: population standard deviation (`ddof = 0`) over `sqrt(n)`.
///
/// NaN for no elements, zero for a single one.
pub(crate) fn standard_error<F: Float>(values: &[F]) -> F {
    let n = values.len();
    if n == 0 {
        return lit(f64::NAN);
    }
    let n_f: F = lit(n as f64);
    let avg = mean(values.iter().copied());
    let ss = values
        .iter()
        .map(|x| (*x - avg) * (*x - avg))
        .fold(F::zero(), |acc, x| acc + x);
    let std = (ss / n_f).sqrt();
    std / n_f.sqrt()
}
