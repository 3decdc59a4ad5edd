// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

use cgmath::{EuclideanSpace as _, InnerSpace as _};

use super::{magnitude, nearly_zero_vector, parallel, Line, Point3, Vector3};
use crate::error::{Error, Result};
use crate::math::{nearly_zero, Precision};

/// A plane in coefficient form `a*x + b*y + c*z + d = 0`, with a cached
/// unit normal.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    a: Precision,
    b: Precision,
    c: Precision,
    d: Precision,
    /// Unit-length `(a, b, c)`.
    normal: Vector3,
    /// `1 / |(a, b, c)|`, so signed distance is one multiply away.
    inv_mag: Precision,
}

impl Plane {
    /// From the coefficient quadruple. Fails when `(a, b, c)` is null.
    pub fn from_coefficients(
        a: Precision,
        b: Precision,
        c: Precision,
        d: Precision,
    ) -> Result<Plane> {
        let n = Vector3::new(a, b, c);
        if nearly_zero_vector(n) {
            return Err(Error::GeometryDegenerate("plane with a null normal"));
        }
        let mag = magnitude(n);
        Ok(Plane {
            a,
            b,
            c,
            d,
            normal: n / mag,
            inv_mag: 1.0 / mag,
        })
    }

    /// From a normal and a point on the plane; `d` is filled in.
    pub fn from_normal_and_point(normal: Vector3, point: Point3) -> Result<Plane> {
        let d = -normal.dot(point.to_vec());
        Plane::from_coefficients(normal.x, normal.y, normal.z, d)
    }

    /// The cached outward-facing unit normal.
    #[inline]
    pub fn normal(&self) -> Vector3 {
        self.normal
    }

    /// The raw (unnormalized) coefficients.
    #[inline]
    pub fn coefficients(&self) -> (Precision, Precision, Precision, Precision) {
        (self.a, self.b, self.c, self.d)
    }

    /// Signed Euclidean distance from `p`; positive on the normal's side.
    #[inline]
    pub fn distance(&self, p: Point3) -> Precision {
        (self.a * p.x + self.b * p.y + self.c * p.z + self.d) * self.inv_mag
    }

    /// Whether `p` lies in the plane.
    pub fn contains_point(&self, p: Point3) -> bool {
        nearly_zero(self.distance(p))
    }

    /// Whether the whole line lies in the plane, tested via the points at
    /// `t = 0` and `t = 1`.
    pub fn contains(&self, line: &Line) -> bool {
        nearly_zero(self.distance(line.solve(0.0))) && nearly_zero(self.distance(line.solve(1.0)))
    }
}

/// Planes are equal when they describe the same point set, regardless of
/// scaling or normal orientation.
impl PartialEq for Plane {
    fn eq(&self, other: &Plane) -> bool {
        parallel(self.normal, other.normal)
            && nearly_zero(other.distance(point_on(self)))
    }
}

/// An arbitrary point satisfying the plane equation.
fn point_on(p: &Plane) -> Point3 {
    Point3::origin() + p.normal * (-p.d * p.inv_mag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{basis, nearly_equal_vectors};

    #[test]
    fn distance_is_signed() {
        let p = Plane::from_coefficients(0.0, 0.0, 2.0, -4.0).unwrap();
        // z = 2 plane; normal +Z.
        assert!(nearly_equal_vectors(p.normal(), basis::Z));
        assert!(nearly_zero(p.distance(Point3::new(5.0, 5.0, 2.0))));
        assert!((p.distance(Point3::new(0.0, 0.0, 5.0)) - 3.0).abs() <= 1e-9);
        assert!((p.distance(Point3::new(0.0, 0.0, 0.0)) + 2.0).abs() <= 1e-9);
    }

    #[test]
    fn from_normal_and_point() {
        let p = Plane::from_normal_and_point(basis::Y, Point3::new(0.0, 3.0, 0.0)).unwrap();
        assert!(p.contains_point(Point3::new(9.0, 3.0, -2.0)));
        assert!(!p.contains_point(Point3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn contains_line() {
        let p = Plane::from_coefficients(0.0, 0.0, 1.0, 0.0).unwrap();
        let inside = Line::new(Point3::new(1.0, 2.0, 0.0), basis::X).unwrap();
        assert!(p.contains(&inside));
        let tilted = Line::new(Point3::new(1.0, 2.0, 0.0), basis::Z).unwrap();
        assert!(!p.contains(&tilted));
    }

    #[test]
    fn equality_ignores_scale_and_orientation() {
        let p = Plane::from_coefficients(0.0, 0.0, 1.0, -1.0).unwrap();
        let q = Plane::from_coefficients(0.0, 0.0, -3.0, 3.0).unwrap();
        assert_eq!(p, q);
        let r = Plane::from_coefficients(0.0, 0.0, 1.0, 0.0).unwrap();
        assert_ne!(p, r);
    }

    #[test]
    fn null_normal_rejected() {
        assert!(Plane::from_coefficients(0.0, 0.0, 0.0, 1.0).is_err());
    }
}
