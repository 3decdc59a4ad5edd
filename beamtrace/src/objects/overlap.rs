// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Boolean combination of two solids by composing their boundary-crossing
//! events along a ray.
//!
//! Both operands report world-space crossings; walking the merged event
//! list while tracking solid membership yields exactly the crossings where
//! the *composite* membership flips. A crossing that exits the source solid
//! but enters the composite (or vice versa) reports a negated normal, which
//! is what makes subtracted cavities reflect outward.

use crate::error::Result;
use crate::geometry::{Aabb, Point3, Ray, Vector3};
use crate::math::EPSILON;

use super::{Event, Object};

/// The four Boolean combination modes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum OverlapMode {
    /// `A and B`: the lens-shaped common volume.
    Inclusive,
    /// `A or B`: both volumes fused.
    Additive,
    /// `A minus B`: A with a B-shaped cavity.
    Subtractive,
    /// `A xor B`: everything in exactly one of the two.
    Exclusive,
}

impl OverlapMode {
    /// Membership of the composite given the operands' membership.
    #[inline]
    pub(crate) fn combine(self, a: bool, b: bool) -> bool {
        match self {
            OverlapMode::Inclusive => a && b,
            OverlapMode::Additive => a || b,
            OverlapMode::Subtractive => a && !b,
            OverlapMode::Exclusive => a != b,
        }
    }
}

/// Boundary crossings of the composite along `ray`, ordered by parameter.
pub(crate) fn events(
    mode: OverlapMode,
    a: &Object,
    b: &Object,
    ray: &Ray,
) -> Result<Vec<Event>> {
    let ea = a.events(ray)?;
    let eb = b.events(ray)?;
    let mut inside_a = a.contains(ray.origin);
    let mut inside_b = b.contains(ray.origin);
    let mut inside = mode.combine(inside_a, inside_b);

    let mut out = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < ea.len() || j < eb.len() {
        let take_a = j >= eb.len() || (i < ea.len() && ea[i].t <= eb[j].t);
        let (event, source_was_inside) = if take_a {
            let e = ea[i];
            i += 1;
            let was = inside_a;
            inside_a = !inside_a;
            (e, was)
        } else {
            let e = eb[j];
            j += 1;
            let was = inside_b;
            inside_b = !inside_b;
            (e, was)
        };
        let now = mode.combine(inside_a, inside_b);
        if now != inside {
            let composite_was_inside = inside;
            // Exit-of-source at an entry-of-composite (and vice versa)
            // faces the wrong way; negate it.
            let normal = if source_was_inside != composite_was_inside {
                -event.normal
            } else {
                event.normal
            };
            out.push(Event {
                t: event.t,
                point: event.point,
                normal,
            });
            inside = now;
        }
    }
    Ok(out)
}

/// Outward normal of the composite at a world surface point: the nearer
/// child's normal, flipped if the composite's interior lies on its outer
/// side.
pub(crate) fn normal(mode: OverlapMode, a: &Object, b: &Object, p: Point3) -> Vector3 {
    let child = if a.surface_measure(p) <= b.surface_measure(p) {
        a
    } else {
        b
    };
    let n = child.normal(p);
    let probe = p + n * (16.0 * EPSILON);
    if mode.combine(a.contains(probe), b.contains(probe)) {
        -n
    } else {
        n
    }
}

/// World bounds of the composite.
pub(crate) fn bounds(mode: OverlapMode, a: &Object, b: &Object) -> Aabb {
    let ba = a.get_world_bounds();
    let bb = b.get_world_bounds();
    match mode {
        OverlapMode::Additive | OverlapMode::Exclusive => {
            let mut u = ba;
            u.grow(&bb);
            u
        }
        OverlapMode::Subtractive => ba,
        OverlapMode::Inclusive => Aabb::new(
            Point3::new(
                ba.min.x.max(bb.min.x),
                ba.min.y.max(bb.min.y),
                ba.min.z.max(bb.min.z),
            ),
            Point3::new(
                ba.max.x.min(bb.max.x),
                ba.max.y.min(bb.max.y),
                ba.max.z.min(bb.max.z),
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{basis, nearly_equal_points, nearly_equal_vectors, Intersection};
    use crate::mediums::VACUUM;
    use crate::objects::Hit;

    fn sphere(x: f64, r: f64) -> Object {
        Object::sphere(Point3::new(x, 0.0, 0.0), r, VACUUM.clone()).unwrap()
    }

    fn lens_pair(mode: OverlapMode) -> Object {
        Object::overlap(sphere(-1.0, 2.0), sphere(1.0, 2.0), mode, VACUUM.clone())
    }

    fn assert_hit(h: &Hit, point: Point3, normal: Vector3) {
        match h.intersect {
            Intersection::Point(p) => {
                assert!(nearly_equal_points(p, point), "point {:?} != {:?}", p, point);
            }
            ref other => panic!("expected a point, got {:?}", other),
        }
        assert!(
            nearly_equal_vectors(h.normal, normal),
            "normal {:?} != {:?}",
            h.normal,
            normal
        );
    }

    #[test]
    fn inclusive_hits_the_lens_edges() {
        // The common volume of the two spheres spans [-1, 1] on x.
        let shape = lens_pair(OverlapMode::Inclusive);
        let h = shape
            .intersect(&Ray::new(Point3::new(3.0, 0.0, 0.0), -basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(1.0, 0.0, 0.0), basis::X);
        let h = shape
            .intersect(&Ray::new(Point3::new(-3.0, 0.0, 0.0), basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(-1.0, 0.0, 0.0), -basis::X);
    }

    #[test]
    fn subtractive_reflects_out_of_the_cavity() {
        // A minus B leaves the slab [-3, -1] of the left sphere.
        let shape = lens_pair(OverlapMode::Subtractive);
        let h = shape
            .intersect(&Ray::new(Point3::new(4.0, 0.0, 0.0), -basis::X))
            .unwrap();
        // The cavity boundary came from B, so its normal points backwards.
        assert_hit(&h, Point3::new(-1.0, 0.0, 0.0), basis::X);
        let h = shape
            .intersect(&Ray::new(Point3::new(-4.0, 0.0, 0.0), basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(-3.0, 0.0, 0.0), -basis::X);
    }

    #[test]
    fn additive_is_the_outer_hull() {
        let shape = lens_pair(OverlapMode::Additive);
        let h = shape
            .intersect(&Ray::new(Point3::new(4.0, 0.0, 0.0), -basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(3.0, 0.0, 0.0), basis::X);
        let h = shape
            .intersect(&Ray::new(Point3::new(-4.0, 0.0, 0.0), basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(-3.0, 0.0, 0.0), -basis::X);
    }

    #[test]
    fn exclusive_exposes_the_inner_lens() {
        let shape = lens_pair(OverlapMode::Exclusive);
        // From the center of the lens (inside both, so outside the
        // composite) the inner boundaries face inward.
        let h = shape
            .intersect(&Ray::new(Point3::new(0.0, 0.0, 0.0), -basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(-1.0, 0.0, 0.0), basis::X);
        let h = shape
            .intersect(&Ray::new(Point3::new(0.0, 0.0, 0.0), basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(1.0, 0.0, 0.0), -basis::X);
        // The outer boundaries are ordinary sphere surface.
        let h = shape
            .intersect(&Ray::new(Point3::new(4.0, 0.0, 0.0), -basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(3.0, 0.0, 0.0), basis::X);
        let h = shape
            .intersect(&Ray::new(Point3::new(-4.0, 0.0, 0.0), basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(-3.0, 0.0, 0.0), -basis::X);
    }

    #[test]
    fn composites_compose_inclusive() {
        let inner = Object::overlap(
            sphere(-1.0, 2.0),
            sphere(1.0, 2.0),
            OverlapMode::Inclusive,
            VACUUM.clone(),
        );
        let shape = Object::overlap(
            inner,
            sphere(0.0, 2.0f64.sqrt()),
            OverlapMode::Inclusive,
            VACUUM.clone(),
        );
        let h = shape
            .intersect(&Ray::new(Point3::new(3.0, 0.0, 0.0), -basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(1.0, 0.0, 0.0), basis::X);
        let h = shape
            .intersect(&Ray::new(Point3::new(0.0, 3.0, 0.0), -basis::Y))
            .unwrap();
        assert_hit(&h, Point3::new(0.0, 2.0f64.sqrt(), 0.0), basis::Y);
    }

    #[test]
    fn composites_compose_subtractive() {
        let inner = Object::overlap(
            sphere(-1.0, 2.0),
            sphere(1.0, 2.0),
            OverlapMode::Subtractive,
            VACUUM.clone(),
        );
        let shape = Object::overlap(
            inner,
            sphere(0.0, 2.0f64.sqrt()),
            OverlapMode::Subtractive,
            VACUUM.clone(),
        );
        let h = shape
            .intersect(&Ray::new(Point3::new(4.0, 0.0, 0.0), -basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(-(2.0f64.sqrt()), 0.0, 0.0), basis::X);
        let h = shape
            .intersect(&Ray::new(Point3::new(-4.0, 0.0, 0.0), basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(-3.0, 0.0, 0.0), -basis::X);
        let h = shape
            .intersect(&Ray::new(Point3::new(-1.0, 4.0, 0.0), -basis::Y))
            .unwrap();
        assert_hit(&h, Point3::new(-1.0, 2.0, 0.0), basis::Y);
    }

    #[test]
    fn composites_compose_exclusive() {
        let inner = Object::overlap(
            sphere(-1.0, 2.0),
            sphere(1.0, 2.0),
            OverlapMode::Inclusive,
            VACUUM.clone(),
        );
        let shape = Object::overlap(
            inner,
            sphere(0.0, 2.0f64.sqrt()),
            OverlapMode::Exclusive,
            VACUUM.clone(),
        );
        let h = shape
            .intersect(&Ray::new(Point3::new(0.0, 0.0, 0.0), -basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(-1.0, 0.0, 0.0), basis::X);
        let h = shape
            .intersect(&Ray::new(Point3::new(4.0, 0.0, 0.0), -basis::X))
            .unwrap();
        assert_hit(&h, Point3::new(2.0f64.sqrt(), 0.0, 0.0), basis::X);
    }

    #[test]
    fn bounds_by_mode() {
        let a = sphere(-1.0, 2.0);
        let b = sphere(1.0, 2.0);
        let add = Object::overlap(a.clone(), b.clone(), OverlapMode::Additive, VACUUM.clone());
        let ab = add.get_world_bounds();
        assert!((ab.min.x + 3.0).abs() <= 1e-9);
        assert!((ab.max.x - 3.0).abs() <= 1e-9);
        let inc = Object::overlap(a.clone(), b.clone(), OverlapMode::Inclusive, VACUUM.clone());
        let ib = inc.get_world_bounds();
        assert!((ib.min.x + 1.0).abs() <= 1e-9);
        assert!((ib.max.x - 1.0).abs() <= 1e-9);
        let sub = Object::overlap(a, b, OverlapMode::Subtractive, VACUUM.clone());
        let sb = sub.get_world_bounds();
        assert!((sb.max.x - 1.0).abs() <= 1e-9);
    }
}
