// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Closed-form root solvers for polynomials of degree 2 through 4.
//!
//! Roots which are not real are reported as NaN, so callers can pattern
//! match on `is_nan()` rather than juggling an `Option` per root. Real roots
//! come first and are sorted ascending.

use super::{nearly_zero, Precision};

/// Roots of `a*x^2 + b*x + c = 0`.
///
/// Uses the cancellation-safe form (the root with the larger magnitude is
/// computed first and the other recovered from the product `c/a`). A
/// discriminant within tolerance of zero yields the double root twice.
pub fn quadratic_roots(a: Precision, b: Precision, c: Precision) -> (Precision, Precision) {
    if nearly_zero(a) {
        // Degenerate to linear.
        if nearly_zero(b) {
            return (Precision::NAN, Precision::NAN);
        }
        return (-c / b, Precision::NAN);
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 && !nearly_zero(disc) {
        return (Precision::NAN, Precision::NAN);
    }
    let disc = disc.max(0.0);
    let sd = disc.sqrt();
    let (x0, x1) = if nearly_zero(b) {
        // No cancellation risk when b vanishes.
        ((-b - sd) / (2.0 * a), (-b + sd) / (2.0 * a))
    } else {
        let q = -0.5 * (b + b.signum() * sd);
        (q / a, c / q)
    };
    if x0 <= x1 {
        (x0, x1)
    } else {
        (x1, x0)
    }
}

/// Roots of `a*x^3 + b*x^2 + c*x + d = 0` by depressing the cubic and
/// applying Cardano (one real root) or the trigonometric method (three).
pub fn cubic_roots(
    a: Precision,
    b: Precision,
    c: Precision,
    d: Precision,
) -> (Precision, Precision, Precision) {
    if nearly_zero(a) {
        let (x0, x1) = quadratic_roots(b, c, d);
        return sorted3(x0, x1, Precision::NAN);
    }
    // Depress: x = t - b/(3a) turns the cubic into t^3 + p*t + q.
    let shift = b / (3.0 * a);
    let p = (3.0 * a * c - b * b) / (3.0 * a * a);
    let q = (2.0 * b * b * b - 9.0 * a * b * c + 27.0 * a * a * d) / (27.0 * a * a * a);
    let half_q = q / 2.0;
    let third_p = p / 3.0;
    let disc = half_q * half_q + third_p * third_p * third_p;

    if nearly_zero(disc) {
        if nearly_zero(p) {
            // Triple root.
            let t = -shift;
            return (t, t, t);
        }
        // One simple and one double root.
        let t0 = 3.0 * q / p;
        let t1 = -3.0 * q / (2.0 * p);
        return sorted3(t0 - shift, t1 - shift, t1 - shift);
    }
    if disc > 0.0 {
        // One real root (Cardano).
        let sd = disc.sqrt();
        let t = (-half_q + sd).cbrt() + (-half_q - sd).cbrt();
        return (t - shift, Precision::NAN, Precision::NAN);
    }
    // Three distinct real roots (trigonometric form; p < 0 here).
    let m = 2.0 * (-third_p).sqrt();
    let theta = (3.0 * q / (p * m)).clamp(-1.0, 1.0).acos() / 3.0;
    let tau = 2.0 * std::f64::consts::PI / 3.0;
    sorted3(
        m * theta.cos() - shift,
        m * (theta - tau).cos() - shift,
        m * (theta - 2.0 * tau).cos() - shift,
    )
}

/// Roots of `a*x^4 + b*x^3 + c*x^2 + d*x + e = 0` via Ferrari's method:
/// depress the quartic, split it with a real root of the resolvent cubic,
/// and solve the two resulting quadratics.
pub fn quartic_roots(
    a: Precision,
    b: Precision,
    c: Precision,
    d: Precision,
    e: Precision,
) -> (Precision, Precision, Precision, Precision) {
    if nearly_zero(a) {
        let (x0, x1, x2) = cubic_roots(b, c, d, e);
        let mut v = [x0, x1, x2, Precision::NAN];
        sort_reals(&mut v);
        return (v[0], v[1], v[2], v[3]);
    }
    let b = b / a;
    let c = c / a;
    let d = d / a;
    let e = e / a;
    // Depress: x = y - b/4.
    let shift = b / 4.0;
    let p = c - 3.0 * b * b / 8.0;
    let q = d - b * c / 2.0 + b * b * b / 8.0;
    let r = e - b * d / 4.0 + b * b * c / 16.0 - 3.0 * b * b * b * b / 256.0;

    let mut roots = [Precision::NAN; 4];
    if nearly_zero(q) {
        // Biquadratic: z^2 + p*z + r = 0 with z = y^2.
        let (z0, z1) = quadratic_roots(1.0, p, r);
        let mut n = 0;
        for &z in [z0, z1].iter() {
            if z.is_nan() || z < 0.0 {
                continue;
            }
            let y = z.sqrt();
            roots[n] = y - shift;
            roots[n + 1] = -y - shift;
            n += 2;
        }
    } else {
        // Resolvent cubic: 8m^3 + 8p*m^2 + (2p^2 - 8r)*m - q^2 = 0.
        let (m0, m1, m2) = cubic_roots(8.0, 8.0 * p, 2.0 * p * p - 8.0 * r, -q * q);
        let mut m = Precision::NAN;
        for &cand in [m0, m1, m2].iter() {
            if !cand.is_nan() && cand > 0.0 && (m.is_nan() || cand > m) {
                m = cand;
            }
        }
        if !m.is_nan() {
            let s = (2.0 * m).sqrt();
            let (y0, y1) = quadratic_roots(1.0, -s, p / 2.0 + m + q / (2.0 * s));
            let (y2, y3) = quadratic_roots(1.0, s, p / 2.0 + m - q / (2.0 * s));
            roots = [y0 - shift, y1 - shift, y2 - shift, y3 - shift];
        }
    }
    sort_reals(&mut roots);
    (roots[0], roots[1], roots[2], roots[3])
}

fn sorted3(a: Precision, b: Precision, c: Precision) -> (Precision, Precision, Precision) {
    let mut v = [a, b, c];
    sort_reals(&mut v);
    (v[0], v[1], v[2])
}

/// Sorts real entries ascending and pushes NaNs to the end.
fn sort_reals(v: &mut [Precision]) {
    v.sort_by(|x, y| match (x.is_nan(), y.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_root(actual: Precision, expected: Precision) {
        assert!(
            (actual - expected).abs() <= 1e-6 * expected.abs().max(1.0),
            "root {} != expected {}",
            actual,
            expected
        );
    }

    #[test]
    fn quadratic_simple() {
        // (x - 2)(x + 3) = x^2 + x - 6
        let (x0, x1) = quadratic_roots(1.0, 1.0, -6.0);
        assert_root(x0, -3.0);
        assert_root(x1, 2.0);
    }

    #[test]
    fn quadratic_double_root() {
        let (x0, x1) = quadratic_roots(1.0, -4.0, 4.0);
        assert_root(x0, 2.0);
        assert_root(x1, 2.0);
    }

    #[test]
    fn quadratic_complex_is_nan() {
        let (x0, x1) = quadratic_roots(1.0, 0.0, 1.0);
        assert!(x0.is_nan() && x1.is_nan());
    }

    #[test]
    fn quadratic_cancellation() {
        // Classic catastrophic-cancellation case: tiny root next to a huge one.
        let (x0, x1) = quadratic_roots(1.0, -1e8, 1.0);
        assert_root(x0, 1e-8);
        assert_root(x1, 1e8);
    }

    #[test]
    fn cubic_three_real() {
        // (x - 1)(x - 2)(x - 3) = x^3 - 6x^2 + 11x - 6
        let (x0, x1, x2) = cubic_roots(1.0, -6.0, 11.0, -6.0);
        assert_root(x0, 1.0);
        assert_root(x1, 2.0);
        assert_root(x2, 3.0);
    }

    #[test]
    fn cubic_one_real() {
        // x^3 - 1 has a single real root at 1.
        let (x0, x1, x2) = cubic_roots(1.0, 0.0, 0.0, -1.0);
        assert_root(x0, 1.0);
        assert!(x1.is_nan() && x2.is_nan());
    }

    #[test]
    fn cubic_triple_root() {
        // (x - 1)^3
        let (x0, _x1, x2) = cubic_roots(1.0, -3.0, 3.0, -1.0);
        assert_root(x0, 1.0);
        assert_root(x2, 1.0);
    }

    #[test]
    fn quartic_four_real() {
        // (x - 1)(x + 1)(x - 2)(x + 2) = x^4 - 5x^2 + 4
        let (x0, x1, x2, x3) = quartic_roots(1.0, 0.0, -5.0, 0.0, 4.0);
        assert_root(x0, -2.0);
        assert_root(x1, -1.0);
        assert_root(x2, 1.0);
        assert_root(x3, 2.0);
    }

    #[test]
    fn quartic_with_odd_terms() {
        // (x - 1)(x - 2)(x - 3)(x - 4) = x^4 - 10x^3 + 35x^2 - 50x + 24
        let (x0, x1, x2, x3) = quartic_roots(1.0, -10.0, 35.0, -50.0, 24.0);
        assert_root(x0, 1.0);
        assert_root(x1, 2.0);
        assert_root(x2, 3.0);
        assert_root(x3, 4.0);
    }

    #[test]
    fn quartic_no_real_roots() {
        // x^4 + 1 > 0 everywhere.
        let (x0, x1, x2, x3) = quartic_roots(1.0, 0.0, 0.0, 0.0, 1.0);
        assert!(x0.is_nan() && x1.is_nan() && x2.is_nan() && x3.is_nan());
    }

    #[test]
    fn quartic_two_real() {
        // (x^2 + 1)(x - 1)(x + 1) = x^4 - 1
        let (x0, x1, x2, x3) = quartic_roots(1.0, 0.0, 0.0, 0.0, -1.0);
        assert_root(x0, -1.0);
        assert_root(x1, 1.0);
        assert!(x2.is_nan() && x3.is_nan());
    }
}
