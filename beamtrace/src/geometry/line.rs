// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

use cgmath::InnerSpace as _;

use super::{magnitude, nearly_zero_vector, parallel, Point3, Vector3};
use crate::error::{Error, Result};
use crate::math::Precision;

/// An undirected 3-D line in point-plus-direction form.
///
/// Two lines compare equal when they contain the same set of points, not
/// when their stored representations match.
#[derive(Clone, Copy, Debug)]
pub struct Line {
    position: Point3,
    direction: Vector3,
}

impl Line {
    /// Fails when `direction` is null.
    pub fn new(position: Point3, direction: Vector3) -> Result<Line> {
        if nearly_zero_vector(direction) {
            return Err(Error::GeometryDegenerate("line with a null direction"));
        }
        Ok(Line {
            position,
            direction,
        })
    }

    #[inline]
    pub fn position(&self) -> Point3 {
        self.position
    }

    #[inline]
    pub fn direction(&self) -> Vector3 {
        self.direction
    }

    /// The point at parameter `t`.
    #[inline]
    pub fn solve(&self, t: Precision) -> Point3 {
        self.position + self.direction * t
    }

    /// The parameter at which the line passes through `p`, if it does.
    pub fn solve_point(&self, p: Point3) -> Option<Precision> {
        let offset = p - self.position;
        if nearly_zero_vector(offset) {
            return Some(0.0);
        }
        if !parallel(offset, self.direction) {
            return None;
        }
        // Project onto the direction to recover t with a stable divisor.
        Some(offset.dot(self.direction) / self.direction.magnitude2())
    }

    /// Whether `p` lies on the line.
    pub fn contains(&self, p: Point3) -> bool {
        self.solve_point(p).is_some()
    }

    /// The foot of the perpendicular from `p`.
    pub fn closest(&self, p: Point3) -> Point3 {
        let side = p - self.position;
        let t = side.dot(self.direction) / self.direction.magnitude2();
        self.solve(t)
    }

    /// The point an arc-length `k` along the line from its position.
    pub fn distance_along(&self, k: Precision) -> Point3 {
        self.position + self.direction * (k / magnitude(self.direction))
    }
}

impl PartialEq for Line {
    fn eq(&self, other: &Line) -> bool {
        parallel(self.direction, other.direction) && other.contains(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{basis, nearly_equal_points};

    #[test]
    fn solve_and_contains() {
        let l = Line::new(Point3::new(1.0, 0.0, 0.0), basis::Y * 2.0).unwrap();
        assert!(nearly_equal_points(l.solve(1.0), Point3::new(1.0, 2.0, 0.0)));
        assert_eq!(l.solve_point(Point3::new(1.0, 4.0, 0.0)), Some(2.0));
        assert!(l.solve_point(Point3::new(0.0, 4.0, 0.0)).is_none());
    }

    #[test]
    fn closest_is_perpendicular_foot() {
        let l = Line::new(Point3::new(0.0, 0.0, 0.0), basis::X).unwrap();
        let c = l.closest(Point3::new(3.0, 4.0, 0.0));
        assert!(nearly_equal_points(c, Point3::new(3.0, 0.0, 0.0)));
    }

    #[test]
    fn distance_along_is_arc_length() {
        let l = Line::new(Point3::new(0.0, 0.0, 0.0), basis::X * 10.0).unwrap();
        assert!(nearly_equal_points(
            l.distance_along(2.0),
            Point3::new(2.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn equality_is_set_equality() {
        let a = Line::new(Point3::new(0.0, 0.0, 0.0), basis::X).unwrap();
        let b = Line::new(Point3::new(5.0, 0.0, 0.0), basis::X * -3.0).unwrap();
        assert_eq!(a, b);
        let c = Line::new(Point3::new(0.0, 1.0, 0.0), basis::X).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn null_direction_rejected() {
        assert!(Line::new(Point3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0)).is_err());
    }
}
