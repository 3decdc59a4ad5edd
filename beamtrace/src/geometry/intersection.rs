// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! The intersection algebra over the geometric primitives.
//!
//! Every function returns the *coarsest* variant consistent with the
//! geometric answer: coincident lines intersect in a `Line`, coincident
//! planes in a `Plane`, and so on down to `None`.

use cgmath::InnerSpace as _;

use super::{
    magnitude, nearly_equal_points, orthogonal, parallel, triple, Line, Plane, Point3, Sphere,
};
use crate::error::Result;
use crate::linalg::{self, Matrix};
use crate::math::{nearly_zero, quadratic_roots, Precision, EPSILON};

/// The result of intersecting two primitives.
#[derive(Clone, Debug, PartialEq)]
pub enum Intersection {
    /// The primitives share no points.
    None,
    /// A single shared point.
    Point(Point3),
    /// A small ordered list of shared points (two for sphere/line, up to
    /// four for the quartic surfaces).
    Points(Vec<Point3>),
    /// A shared line.
    Line(Line),
    /// The primitives coincide in a plane.
    Plane(Plane),
}

/// Discriminant-only view of an [`Intersection`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum IntersectionType {
    None,
    Point,
    Points,
    Line,
    Plane,
}

impl Intersection {
    pub fn get_type(&self) -> IntersectionType {
        match self {
            Intersection::None => IntersectionType::None,
            Intersection::Point(_) => IntersectionType::Point,
            Intersection::Points(_) => IntersectionType::Points,
            Intersection::Line(_) => IntersectionType::Line,
            Intersection::Plane(_) => IntersectionType::Plane,
        }
    }
}

/// Intersects two lines: coincident lines yield `Line`, intersecting lines
/// a `Point`, parallel or skew lines `None`.
pub fn line_line(l0: &Line, l1: &Line) -> Intersection {
    if l0 == l1 {
        return Intersection::Line(*l1);
    }
    if nearly_equal_points(l0.position(), l1.position()) {
        return Intersection::Point(l1.position());
    }
    if parallel(l0.direction(), l1.direction()) {
        return Intersection::None;
    }
    let offset = l1.position() - l0.position();
    if !nearly_zero(triple(l0.direction(), l1.direction(), offset)) {
        // Skew: not parallel, not coplanar.
        return Intersection::None;
    }
    // http://mathworld.wolfram.com/Line-LineIntersection.html
    let a = offset.cross(l1.direction());
    let b = l0.direction().cross(l1.direction());
    let s = a.dot(b) / b.magnitude2();
    Intersection::Point(l0.solve(s))
}

/// Intersects a line with a plane.
pub fn line_plane(l: &Line, p: &Plane) -> Intersection {
    if p.contains(l) {
        return Intersection::Line(*l);
    }
    if orthogonal(p.normal(), l.direction()) {
        return Intersection::None;
    }
    let (a, b, c, d) = p.coefficients();
    let pos = l.position();
    let dir = l.direction();
    let denom = a * dir.x + b * dir.y + c * dir.z;
    let t = -(a * pos.x + b * pos.y + c * pos.z + d) / denom;
    Intersection::Point(l.solve(t))
}

/// Intersects two planes: coincident planes yield `Plane`, parallel ones
/// `None`, everything else the shared `Line`.
///
/// The line's direction is the cross product of the normals; its
/// particular point comes out of the null space of the stacked coefficient
/// rows in homogeneous form.
pub fn plane_plane(p1: &Plane, p2: &Plane) -> Result<Intersection> {
    if p1 == p2 {
        return Ok(Intersection::Plane(*p1));
    }
    if parallel(p1.normal(), p2.normal()) {
        return Ok(Intersection::None);
    }
    let direction = p1.normal().cross(p2.normal());
    let (a1, b1, c1, d1) = p1.coefficients();
    let (a2, b2, c2, d2) = p2.coefficients();
    let coefficients = Matrix::from_rows(vec![vec![a1, b1, c1], vec![a2, b2, c2]])?;
    let rhs = Matrix::col_matrix(vec![-d1, -d2])?;
    let stacked = linalg::rowjoin(&coefficients, &rhs)?;
    let null = stacked.nullspace()?;
    // Any null vector with a nonzero homogeneous component scales to a
    // particular solution of the plane pair.
    for col in 0..null.cols() {
        let w = null[(3, col)];
        if !nearly_zero(w) {
            let point = Point3::new(
                -null[(0, col)] / w,
                -null[(1, col)] / w,
                -null[(2, col)] / w,
            );
            return Ok(Intersection::Line(Line::new(point, direction)?));
        }
    }
    // Both planes pass through the origin.
    Ok(Intersection::Line(Line::new(
        Point3::new(0.0, 0.0, 0.0),
        direction,
    )?))
}

/// Intersects a line with a sphere via the quadratic-roots form: two real
/// roots yield `Points` ordered by parameter, a double root yields the
/// tangent `Point`, no real roots `None`.
pub fn line_sphere(s: &Sphere, l: &Line) -> Intersection {
    // The perpendicular foot from the center classifies the cases cheaply.
    let closest = l.closest(s.center);
    let d = magnitude(closest - s.center);
    if d > s.radius + EPSILON {
        return Intersection::None;
    }
    if (d - s.radius).abs() <= EPSILON {
        return Intersection::Point(closest);
    }
    let p = l.position() - s.center;
    let v = l.direction();
    let a: Precision = v.magnitude2();
    let b: Precision = 2.0 * p.dot(v);
    let c: Precision = p.magnitude2() - s.radius * s.radius;
    let (t0, t1) = quadratic_roots(a, b, c);
    if t0.is_nan() || t1.is_nan() {
        return Intersection::None;
    }
    Intersection::Points(vec![l.solve(t0), l.solve(t1)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{basis, nearly_equal_vectors, Vector3};

    #[test]
    fn coincident_lines_are_a_line() {
        let a = Line::new(Point3::new(0.0, 0.0, 0.0), basis::X).unwrap();
        let b = Line::new(Point3::new(2.0, 0.0, 0.0), basis::X * 5.0).unwrap();
        assert_eq!(line_line(&a, &b).get_type(), IntersectionType::Line);
    }

    #[test]
    fn crossing_lines_share_a_point() {
        let a = Line::new(Point3::new(0.0, 0.0, 0.0), basis::X).unwrap();
        let b = Line::new(Point3::new(1.0, -1.0, 0.0), basis::Y).unwrap();
        match line_line(&a, &b) {
            Intersection::Point(p) => {
                assert!(nearly_equal_points(p, Point3::new(1.0, 0.0, 0.0)))
            }
            other => panic!("expected a point, got {:?}", other),
        }
    }

    #[test]
    fn parallel_and_skew_lines_miss() {
        let a = Line::new(Point3::new(0.0, 0.0, 0.0), basis::X).unwrap();
        let parallel = Line::new(Point3::new(0.0, 1.0, 0.0), basis::X).unwrap();
        assert_eq!(line_line(&a, &parallel).get_type(), IntersectionType::None);
        let skew = Line::new(Point3::new(0.0, 1.0, 1.0), basis::Y).unwrap();
        assert_eq!(line_line(&a, &skew).get_type(), IntersectionType::None);
    }

    #[test]
    fn line_plane_known_point() {
        // 2x + 3y + 4z + 1 = 0 against the line through (0, 3, 5) with
        // direction (-1, 1, 4).
        let p = Plane::from_coefficients(2.0, 3.0, 4.0, 1.0).unwrap();
        let l = Line::new(Point3::new(0.0, 3.0, 5.0), Vector3::new(-1.0, 1.0, 4.0)).unwrap();
        match line_plane(&l, &p) {
            Intersection::Point(q) => {
                let expected = Point3::new(
                    30.0 / 17.0,
                    3.0 - 30.0 / 17.0,
                    5.0 - 120.0 / 17.0,
                );
                assert!(nearly_equal_points(q, expected), "got {:?}", q);
            }
            other => panic!("expected a point, got {:?}", other),
        }
    }

    #[test]
    fn line_in_plane_is_a_line() {
        let p = Plane::from_coefficients(0.0, 0.0, 1.0, 0.0).unwrap();
        let l = Line::new(Point3::new(1.0, 2.0, 0.0), basis::X).unwrap();
        assert_eq!(line_plane(&l, &p).get_type(), IntersectionType::Line);
        let above = Line::new(Point3::new(1.0, 2.0, 1.0), basis::X).unwrap();
        assert_eq!(line_plane(&above, &p).get_type(), IntersectionType::None);
    }

    #[test]
    fn plane_plane_cases() {
        let xy = Plane::from_coefficients(0.0, 0.0, 1.0, 0.0).unwrap();
        let xy_again = Plane::from_coefficients(0.0, 0.0, 2.0, 0.0).unwrap();
        assert_eq!(
            plane_plane(&xy, &xy_again).unwrap().get_type(),
            IntersectionType::Plane
        );
        let lifted = Plane::from_coefficients(0.0, 0.0, 1.0, -3.0).unwrap();
        assert_eq!(
            plane_plane(&xy, &lifted).unwrap().get_type(),
            IntersectionType::None
        );

        // z = 1 meets x = 2 in the line x = 2, z = 1.
        let z1 = Plane::from_coefficients(0.0, 0.0, 1.0, -1.0).unwrap();
        let x2 = Plane::from_coefficients(1.0, 0.0, 0.0, -2.0).unwrap();
        match plane_plane(&z1, &x2).unwrap() {
            Intersection::Line(l) => {
                assert!(parallel(l.direction(), basis::Y));
                assert!(z1.contains_point(l.position()));
                assert!(x2.contains_point(l.position()));
            }
            other => panic!("expected a line, got {:?}", other),
        }
    }

    #[test]
    fn line_sphere_two_points() {
        let s = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0).unwrap();
        let l = Line::new(Point3::new(3.0, 0.0, 0.0), -basis::X).unwrap();
        match line_sphere(&s, &l) {
            Intersection::Points(pts) => {
                assert_eq!(pts.len(), 2);
                // Ordered by line parameter: first the near side, then the
                // far side.
                assert!(nearly_equal_points(pts[0], Point3::new(1.0, 0.0, 0.0)));
                assert!(nearly_equal_points(pts[1], Point3::new(-1.0, 0.0, 0.0)));
            }
            other => panic!("expected points, got {:?}", other),
        }
    }

    #[test]
    fn line_sphere_tangent_and_miss() {
        let s = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0).unwrap();
        let tangent = Line::new(Point3::new(3.0, 1.0, 0.0), -basis::X).unwrap();
        match line_sphere(&s, &tangent) {
            Intersection::Point(p) => {
                assert!(nearly_equal_points(p, Point3::new(0.0, 1.0, 0.0)))
            }
            other => panic!("expected tangent point, got {:?}", other),
        }
        let miss = Line::new(Point3::new(3.0, 2.0, 0.0), -basis::X).unwrap();
        assert_eq!(line_sphere(&s, &miss).get_type(), IntersectionType::None);
    }

    #[test]
    fn offset_sphere() {
        let s = Sphere::new(Point3::new(10.0, 0.0, 0.0), 2.0).unwrap();
        let l = Line::new(Point3::new(0.0, 0.0, 0.0), basis::X).unwrap();
        match line_sphere(&s, &l) {
            Intersection::Points(pts) => {
                assert!(nearly_equal_points(pts[0], Point3::new(8.0, 0.0, 0.0)));
                assert!(nearly_equal_points(pts[1], Point3::new(12.0, 0.0, 0.0)));
            }
            other => panic!("expected points, got {:?}", other),
        }
    }
}
