// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

use log::warn;

use super::{magnitude, Point3, Vector3};
use crate::error::{Error, Result};
use crate::math::{Precision, EPSILON};

/// Whether [`Sphere::normal_at`] checks that its argument is actually on
/// the surface. The check costs a distance evaluation per call, so it is
/// compiled in only alongside the other debug assertions.
pub const SURFACE_CHECK: bool = cfg!(debug_assertions);

/// A sphere in center-plus-radius form.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Point3,
    pub radius: Precision,
}

impl Sphere {
    /// Fails unless `radius > 0`.
    pub fn new(center: Point3, radius: Precision) -> Result<Sphere> {
        if radius <= 0.0 {
            return Err(Error::Domain("sphere radius must be positive"));
        }
        Ok(Sphere { center, radius })
    }

    /// Closed-ball membership.
    pub fn contains(&self, p: Point3) -> bool {
        magnitude(p - self.center) <= self.radius + EPSILON
    }

    /// Whether `p` is on the surface, within a tolerance proportional to
    /// the radius.
    pub fn on_surface(&self, p: Point3) -> bool {
        (magnitude(p - self.center) - self.radius).abs() <= EPSILON * self.radius.max(1.0)
    }

    /// Outward unit normal at a surface point.
    ///
    /// The caller promises `p` is on the surface. When [`SURFACE_CHECK`]
    /// is enabled, an off-surface point is logged and reported as a null
    /// vector so the mistake shows up as a degenerate hit instead of a
    /// subtly wrong shading normal.
    pub fn normal_at(&self, p: Point3) -> Vector3 {
        if SURFACE_CHECK && !self.on_surface(p) {
            warn!(
                "normal_at: point {:?} is not on sphere (center {:?} radius {})",
                p, self.center, self.radius
            );
            return Vector3::new(0.0, 0.0, 0.0);
        }
        (p - self.center) / magnitude(p - self.center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{basis, is_zero_vector, nearly_equal_vectors};

    #[test]
    fn membership() {
        let s = Sphere::new(Point3::new(1.0, 0.0, 0.0), 2.0).unwrap();
        assert!(s.contains(Point3::new(1.0, 0.0, 0.0)));
        assert!(s.contains(Point3::new(3.0, 0.0, 0.0)));
        assert!(!s.contains(Point3::new(3.5, 0.0, 0.0)));
        assert!(s.on_surface(Point3::new(-1.0, 0.0, 0.0)));
        assert!(!s.on_surface(Point3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn outward_normal() {
        let s = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0).unwrap();
        assert!(nearly_equal_vectors(
            s.normal_at(Point3::new(1.0, 0.0, 0.0)),
            basis::X
        ));
    }

    #[test]
    fn off_surface_normal_is_null_in_debug() {
        if !SURFACE_CHECK {
            return;
        }
        let s = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0).unwrap();
        assert!(is_zero_vector(s.normal_at(Point3::new(5.0, 0.0, 0.0))));
    }

    #[test]
    fn zero_radius_rejected() {
        assert!(Sphere::new(Point3::new(0.0, 0.0, 0.0), 0.0).is_err());
        assert!(Sphere::new(Point3::new(0.0, 0.0, 0.0), -1.0).is_err());
    }
}
