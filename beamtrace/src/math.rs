// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Scalar foundations: the precision type, tolerance comparisons, and small
//! helpers shared by the matrix engine, the geometry layer, and the tracer.
//!
//! Submodules are private and reexported here.

use cgmath::Rad;

mod color;
mod solvers;

pub use color::*;
pub use solvers::*;

/// The real type everything is computed in.
///
/// Single precision is possible in principle but untested; all tolerances
/// below assume doubles.
pub type Precision = f64;

/// Magnitudes at or below this are "numerically negligible".
pub const EPSILON: Precision = 1e-9;

/// Returns whether two values are equal within [`EPSILON`].
///
/// This is the *numerical* comparison. It is distinct from comparing against
/// an exact zero, which some invariants (null vectors, unset channels)
/// legitimately use; see [`is_exactly_zero`].
#[inline]
pub fn nearly_equal(a: Precision, b: Precision) -> bool {
    (a - b).abs() <= EPSILON
}

/// Returns whether a value is within [`EPSILON`] of zero.
#[inline]
pub fn nearly_zero(x: Precision) -> bool {
    x.abs() <= EPSILON
}

/// Exact-zero test, for invariant-preserving zeros as opposed to
/// numerically negligible magnitudes.
#[inline]
#[allow(clippy::float_cmp)]
pub fn is_exactly_zero(x: Precision) -> bool {
    x == 0.0
}

/// Linear interpolation `a * (1 - t) + b * t`.
#[inline]
pub fn lerp(a: Precision, b: Precision, t: Precision) -> Precision {
    a * (1.0 - t) + b * t
}

/// All the smoothness of `x * x`, with the advantage of being flat at 1.
#[inline]
pub fn smoothstep(x: Precision) -> Precision {
    let x = x.clamp(0.0, 1.0);
    3.0 * x * x - 2.0 * x * x * x
}

/// Clamps `x` into `[-1, 1]` before `acos`, so that values a hair outside
/// the domain (from accumulated rounding) do not become NaN.
///
/// Values *far* outside the domain indicate a broken invariant upstream and
/// are reported as an error by callers that can afford to check.
#[inline]
pub fn acos_clamped(x: Precision) -> Rad<Precision> {
    Rad(x.clamp(-1.0, 1.0).acos())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_vs_exact_zero() {
        assert!(nearly_zero(1e-12));
        assert!(!is_exactly_zero(1e-12));
        assert!(is_exactly_zero(0.0));
        assert!(nearly_zero(0.0));
        assert!(!nearly_zero(1e-6));
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(2.0, 10.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 10.0, 1.0), 10.0);
        assert_eq!(lerp(2.0, 10.0, 0.5), 6.0);
    }

    #[test]
    fn smoothstep_shape() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert_eq!(smoothstep(0.5), 0.5);
        assert!(smoothstep(0.25) < 0.25);
        assert!(smoothstep(0.75) > 0.75);
    }

    #[test]
    fn acos_stays_finite() {
        assert!(acos_clamped(1.0 + 1e-14).0.is_finite());
        assert!(acos_clamped(-1.0 - 1e-14).0.is_finite());
    }
}
