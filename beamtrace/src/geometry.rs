// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Fixed-dimension geometry over [`cgmath`] types: the vector operations the
//! tracer needs beyond what the crate provides, rays, and axis-aligned
//! bounds. Lines, planes, spheres, and the intersection algebra live in
//! submodules.

use cgmath::{InnerSpace as _, Rad};

use crate::error::{Error, Result};
use crate::math::{acos_clamped, nearly_zero, Precision, EPSILON};

mod intersection;
mod line;
mod plane;
mod sphere;

pub use intersection::*;
pub use line::Line;
pub use plane::Plane;
pub use sphere::Sphere;

pub type Point2 = cgmath::Point2<Precision>;
pub type Point3 = cgmath::Point3<Precision>;
pub type Vector2 = cgmath::Vector2<Precision>;
pub type Vector3 = cgmath::Vector3<Precision>;
pub type Vector4 = cgmath::Vector4<Precision>;

/// The world basis vectors, by the names the rest of the crate uses.
pub mod basis {
    use super::Vector3;

    pub const X: Vector3 = Vector3::new(1.0, 0.0, 0.0);
    pub const Y: Vector3 = Vector3::new(0.0, 1.0, 0.0);
    pub const Z: Vector3 = Vector3::new(0.0, 0.0, 1.0);
}

/// Lifts a 2-D point into 3-D homogeneous form with a trailing 1.
#[inline]
pub fn homogenize2(p: Point2) -> Point3 {
    Point3::new(p.x, p.y, 1.0)
}

/// Lifts a 3-D point into 4-D homogeneous form with a trailing 1.
#[inline]
pub fn homogenize3(p: Point3) -> Vector4 {
    p.to_homogeneous()
}

/// Euclidean length computed with `hypot`, which avoids intermediate
/// overflow for extreme components.
#[inline]
pub fn magnitude(v: Vector3) -> Precision {
    v.x.hypot(v.y).hypot(v.z)
}

#[inline]
pub fn magnitude2d(v: Vector2) -> Precision {
    v.x.hypot(v.y)
}

/// Exact-zero test; a null vector is an invariant, not a rounding artifact.
#[inline]
#[allow(clippy::float_cmp)]
pub fn is_zero_vector(v: Vector3) -> bool {
    v.x == 0.0 && v.y == 0.0 && v.z == 0.0
}

/// Tolerance-based zero test for computed vectors.
#[inline]
pub fn nearly_zero_vector(v: Vector3) -> bool {
    nearly_zero(v.x) && nearly_zero(v.y) && nearly_zero(v.z)
}

#[inline]
pub fn nearly_equal_vectors(a: Vector3, b: Vector3) -> bool {
    nearly_zero_vector(a - b)
}

#[inline]
pub fn nearly_equal_points(a: Point3, b: Point3) -> bool {
    nearly_zero_vector(a - b)
}

/// Unit vector in the direction of `v`. Fails on an exactly null input.
pub fn try_normalize(v: Vector3) -> Result<Vector3> {
    if is_zero_vector(v) {
        return Err(Error::Domain("cannot normalize a null vector"));
    }
    Ok(v / magnitude(v))
}

/// Whether `a` and `b` span no area.
#[inline]
pub fn parallel(a: Vector3, b: Vector3) -> bool {
    nearly_zero_vector(a.cross(b))
}

/// Whether `a` and `b` are perpendicular.
#[inline]
pub fn orthogonal(a: Vector3, b: Vector3) -> bool {
    nearly_zero(a.dot(b))
}

/// The unsigned angle between two vectors, in `[0, pi]`. Fails when either
/// vector is null.
pub fn angle(a: Vector3, b: Vector3) -> Result<Rad<Precision>> {
    let ma = magnitude(a);
    let mb = magnitude(b);
    if is_exact_zero(ma) || is_exact_zero(mb) {
        return Err(Error::Domain("angle of a null vector"));
    }
    Ok(acos_clamped(a.dot(b) / (ma * mb)))
}

#[inline]
#[allow(clippy::float_cmp)]
fn is_exact_zero(x: Precision) -> bool {
    x == 0.0
}

/// Projection of `v` onto `onto`. Fails when `onto` is null.
pub fn project(v: Vector3, onto: Vector3) -> Result<Vector3> {
    let q = onto.magnitude2();
    if is_exact_zero(q) {
        return Err(Error::Domain("projection onto a null vector"));
    }
    Ok(onto * (v.dot(onto) / q))
}

/// Rotates `v` about the unit-length `axis` by `theta` (Rodrigues):
/// `v cos(t) + (axis x v) sin(t) + axis (axis . v)(1 - cos(t))`.
pub fn rodrigues(axis: Vector3, v: Vector3, theta: Rad<Precision>) -> Result<Vector3> {
    if (magnitude(axis) - 1.0).abs() > EPSILON {
        return Err(Error::Domain("rotation axis must be unit length"));
    }
    let (sin, cos) = theta.0.sin_cos();
    Ok(v * cos + axis.cross(v) * sin + axis * (axis.dot(v) * (1.0 - cos)))
}

/// Scalar triple product `u . (v x w)`.
#[inline]
pub fn triple(u: Vector3, v: Vector3, w: Vector3) -> Precision {
    u.dot(v.cross(w))
}

/// A directed half-open line: `origin + t * direction` is valid for
/// `t >= 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vector3,
}

impl Ray {
    #[inline]
    pub const fn new(origin: Point3, direction: Vector3) -> Self {
        Self { origin, direction }
    }

    /// The point at parameter `t`.
    #[inline]
    pub fn at(&self, t: Precision) -> Point3 {
        self.origin + self.direction * t
    }

    /// The co-linear undirected line.
    pub fn as_line(&self) -> Result<Line> {
        Line::new(self.origin, self.direction)
    }

    /// The same ray with a unit direction. Fails on a null direction.
    pub fn normalized(&self) -> Result<Ray> {
        Ok(Ray::new(self.origin, try_normalize(self.direction)?))
    }
}

/// An axis-aligned bounding box, possibly unbounded along any axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Aabb {
    pub const fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// A box containing nothing; growing from here starts fresh.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(
                Precision::INFINITY,
                Precision::INFINITY,
                Precision::INFINITY,
            ),
            max: Point3::new(
                Precision::NEG_INFINITY,
                Precision::NEG_INFINITY,
                Precision::NEG_INFINITY,
            ),
        }
    }

    /// A box containing everything.
    pub fn infinite() -> Self {
        Self {
            min: Point3::new(
                Precision::NEG_INFINITY,
                Precision::NEG_INFINITY,
                Precision::NEG_INFINITY,
            ),
            max: Point3::new(
                Precision::INFINITY,
                Precision::INFINITY,
                Precision::INFINITY,
            ),
        }
    }

    /// Whether any axis extends to infinity.
    pub fn is_infinite(&self) -> bool {
        !(self.min.x.is_finite()
            && self.min.y.is_finite()
            && self.min.z.is_finite()
            && self.max.x.is_finite()
            && self.max.y.is_finite()
            && self.max.z.is_finite())
    }

    /// Expands to cover `other` as well.
    pub fn grow(&mut self, other: &Aabb) {
        self.min.x = self.min.x.min(other.min.x);
        self.min.y = self.min.y.min(other.min.y);
        self.min.z = self.min.z.min(other.min.z);
        self.max.x = self.max.x.max(other.max.x);
        self.max.y = self.max.y.max(other.max.y);
        self.max.z = self.max.z.max(other.max.z);
    }

    pub fn contains(&self, p: Point3) -> bool {
        self.min.x <= p.x
            && p.x <= self.max.x
            && self.min.y <= p.y
            && p.y <= self.max.y
            && self.min.z <= p.z
            && p.z <= self.max.z
    }

    /// Slab-method ray test over `[t_min, t_max]`.
    pub fn hit(&self, ray: &Ray, t_min: Precision, t_max: Precision) -> bool {
        let mut t0 = t_min;
        let mut t1 = t_max;
        for axis in 0..3 {
            let inv = 1.0 / ray.direction[axis];
            let mut near = (self.min[axis] - ray.origin[axis]) * inv;
            let mut far = (self.max[axis] - ray.origin[axis]) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut near, &mut far);
            }
            t0 = near.max(t0);
            t1 = far.min(t1);
            if t1 < t0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Rad;
    use std::f64::consts::PI;

    #[test]
    fn basis_cross_products() {
        assert!(nearly_equal_vectors(basis::X.cross(basis::Y), basis::Z));
        assert!(nearly_equal_vectors(basis::Y.cross(basis::Z), basis::X));
        assert!(nearly_equal_vectors(basis::Z.cross(basis::X), basis::Y));
    }

    #[test]
    fn orthogonality_is_zero_dot() {
        assert!(orthogonal(basis::X, basis::Y));
        assert!(!orthogonal(basis::X, Vector3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn rodrigues_half_turn() {
        let v = Vector3::new(1.0, 0.0, 1.0);
        let r = rodrigues(basis::Z, v, Rad(PI)).unwrap();
        assert!(nearly_equal_vectors(r, Vector3::new(-1.0, 0.0, 1.0)));
    }

    #[test]
    fn rodrigues_needs_unit_axis() {
        assert!(rodrigues(Vector3::new(0.0, 0.0, 2.0), basis::X, Rad(PI)).is_err());
    }

    #[test]
    fn triple_product_cycles() {
        let u = Vector3::new(1.0, 2.0, 3.0);
        let v = Vector3::new(-1.0, 0.5, 2.0);
        let w = Vector3::new(0.0, 1.0, -1.0);
        let t = triple(u, v, w);
        assert!((t - triple(v, w, u)).abs() <= EPSILON);
        assert!((t - triple(w, u, v)).abs() <= EPSILON);
    }

    #[test]
    fn magnitude_survives_extremes() {
        let v = Vector3::new(1e200, 1e200, 0.0);
        assert!(magnitude(v).is_finite());
    }

    #[test]
    fn normalize_rejects_null() {
        assert!(try_normalize(Vector3::new(0.0, 0.0, 0.0)).is_err());
        let n = try_normalize(Vector3::new(3.0, 0.0, 4.0)).unwrap();
        assert!(nearly_zero(magnitude(n) - 1.0));
    }

    #[test]
    fn angles() {
        let a = angle(basis::X, basis::Y).unwrap();
        assert!((a.0 - PI / 2.0).abs() <= EPSILON);
        let b = angle(basis::X, -basis::X).unwrap();
        assert!((b.0 - PI).abs() <= EPSILON);
        assert!(angle(basis::X, Vector3::new(0.0, 0.0, 0.0)).is_err());
    }

    #[test]
    fn projection() {
        let p = project(Vector3::new(3.0, 4.0, 0.0), basis::X).unwrap();
        assert!(nearly_equal_vectors(p, Vector3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn ray_solves() {
        let r = Ray::new(Point3::new(1.0, 0.0, 0.0), basis::Y * 2.0);
        assert!(nearly_equal_points(r.at(0.5), Point3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn aabb_grow_and_hit() {
        let mut b = Aabb::empty();
        b.grow(&Aabb::new(
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, 1.0),
        ));
        b.grow(&Aabb::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 1.0, 1.0),
        ));
        assert_eq!(b.max.x, 3.0);
        assert!(!b.is_infinite());

        let hit = Ray::new(Point3::new(5.0, 0.0, 0.0), -basis::X);
        assert!(b.hit(&hit, 0.0, Precision::INFINITY));
        let miss = Ray::new(Point3::new(5.0, 5.0, 0.0), -basis::X);
        assert!(!b.hit(&miss, 0.0, Precision::INFINITY));

        assert!(Aabb::infinite().is_infinite());
    }

    #[test]
    fn homogenizing_lifts() {
        let p = homogenize2(Point2::new(2.0, 3.0));
        assert_eq!(p.z, 1.0);
        let q = homogenize3(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(q.w, 1.0);
    }
}
