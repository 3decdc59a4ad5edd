// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Scene objects: a concrete surface plus a world transform and a medium.
//!
//! Surfaces are a closed sum type ([`Surface`]); the Boolean composite is
//! one of its variants and nests recursively. The world transform is
//! `Translate * Rotate * Scale`; its inverse pieces are recomputed at
//! mutation time, never in the hot path.

use std::sync::Arc;

use cgmath::{InnerSpace as _, Matrix as _, Matrix3, Quaternion, Rad, SquareMatrix as _};
use itertools::iproduct;

use crate::error::{Error, Result};
use crate::geometry::{
    magnitude, try_normalize, Aabb, Intersection, Point2, Point3, Ray, Vector3,
};
use crate::math::{Precision, EPSILON};
use crate::mediums::Medium;

mod overlap;
mod surfaces;

pub use overlap::OverlapMode;
pub use surfaces::{Surface, SurfaceKind};

/// One ray-object intersection report.
///
/// `intersect` is `Point` (or `Points`, ordered along the ray) in world
/// space; `distance` and `normal` describe the nearest reported point.
#[derive(Clone, Debug)]
pub struct Hit {
    pub intersect: Intersection,
    pub distance: Precision,
    pub normal: Vector3,
}

impl Hit {
    /// The no-intersection report.
    pub fn none() -> Hit {
        Hit {
            intersect: Intersection::None,
            distance: Precision::INFINITY,
            normal: Vector3::new(0.0, 0.0, 0.0),
        }
    }
}

/// A single boundary crossing along a ray, in world space. The building
/// block [`Object::intersect`] and the Boolean composite share.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Event {
    pub t: Precision,
    pub point: Point3,
    pub normal: Vector3,
}

/// A surface placed in the world.
#[derive(Clone, Debug)]
pub struct Object {
    position: Point3,
    rotation: Matrix3<Precision>,
    inv_rotation: Matrix3<Precision>,
    scale: Vector3,
    surface: Surface,
    medium: Arc<Medium>,
}

impl Object {
    /// Places `surface` at the origin with identity rotation and scale.
    pub fn new(surface: Surface, medium: Arc<Medium>) -> Object {
        Object {
            position: Point3::new(0.0, 0.0, 0.0),
            rotation: Matrix3::identity(),
            inv_rotation: Matrix3::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            surface,
            medium,
        }
    }

    // Convenience constructors for the common shapes.

    pub fn sphere(center: Point3, radius: Precision, medium: Arc<Medium>) -> Result<Object> {
        if radius <= 0.0 {
            return Err(Error::Domain("sphere radius must be positive"));
        }
        let mut o = Object::new(Surface::Sphere { radius }, medium);
        o.move_to(center);
        Ok(o)
    }

    /// An infinite plane through `point` facing `normal`.
    pub fn plane(point: Point3, normal: Vector3, medium: Arc<Medium>) -> Result<Object> {
        let mut o = Object::new(Surface::Plane, medium);
        o.move_to(point);
        o.set_rotation_from_normal(normal)?;
        Ok(o)
    }

    /// A square of edge length `edge` centered on `center` facing
    /// `normal`.
    pub fn square(
        center: Point3,
        normal: Vector3,
        edge: Precision,
        medium: Arc<Medium>,
    ) -> Result<Object> {
        if edge <= 0.0 {
            return Err(Error::Domain("square edge must be positive"));
        }
        let mut o = Object::new(Surface::Square { half: edge / 2.0 }, medium);
        o.move_to(center);
        o.set_rotation_from_normal(normal)?;
        Ok(o)
    }

    pub fn cuboid(center: Point3, half: Vector3, medium: Arc<Medium>) -> Result<Object> {
        if half.x <= 0.0 || half.y <= 0.0 || half.z <= 0.0 {
            return Err(Error::Domain("cuboid half extents must be positive"));
        }
        let mut o = Object::new(Surface::Cuboid { half }, medium);
        o.move_to(center);
        Ok(o)
    }

    /// Combines two placed objects under a Boolean mode. The composite
    /// itself carries the identity transform; the children keep theirs.
    pub fn overlap(a: Object, b: Object, mode: OverlapMode, medium: Arc<Medium>) -> Object {
        Object::new(
            Surface::Overlap {
                mode,
                a: Box::new(a),
                b: Box::new(b),
            },
            medium,
        )
    }

    #[inline]
    pub fn position(&self) -> Point3 {
        self.position
    }

    #[inline]
    pub fn medium(&self) -> &Arc<Medium> {
        &self.medium
    }

    #[inline]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Discriminant tag, used by the Boolean composer and tests.
    pub fn get_type(&self) -> SurfaceKind {
        self.surface.kind()
    }

    // ------------------------------------------------------------------
    // Transform mutation. Each mutator leaves the cached inverse pieces
    // consistent.

    pub fn move_to(&mut self, position: Point3) {
        self.position = position;
    }

    pub fn move_by(&mut self, offset: Vector3) {
        self.position += offset;
    }

    /// Euler rotation, applied as yaw about Z, then pitch about Y, then
    /// roll about X (object-to-world order).
    pub fn set_rotation(
        &mut self,
        yaw: Rad<Precision>,
        pitch: Rad<Precision>,
        roll: Rad<Precision>,
    ) {
        self.rotation =
            Matrix3::from_angle_z(yaw) * Matrix3::from_angle_y(pitch) * Matrix3::from_angle_x(roll);
        // Orthonormal, so the inverse is the transpose.
        self.inv_rotation = self.rotation.transpose();
    }

    /// Orients the surface's natural +Z axis along `normal`.
    pub fn set_rotation_from_normal(&mut self, normal: Vector3) -> Result<()> {
        let n = try_normalize(normal)?;
        let q = Quaternion::from_arc(Vector3::new(0.0, 0.0, 1.0), n, None);
        self.rotation = Matrix3::from(q);
        self.inv_rotation = self.rotation.transpose();
        Ok(())
    }

    /// Per-axis scale; all components must be nonzero so the transform
    /// stays invertible.
    pub fn set_scale(&mut self, sx: Precision, sy: Precision, sz: Precision) -> Result<()> {
        if sx == 0.0 || sy == 0.0 || sz == 0.0 {
            return Err(Error::Domain("scale components must be nonzero"));
        }
        self.scale = Vector3::new(sx, sy, sz);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transforms.

    /// Object space to world space.
    #[inline]
    pub fn forward_transform(&self, p: Point3) -> Point3 {
        let scaled = Vector3::new(p.x * self.scale.x, p.y * self.scale.y, p.z * self.scale.z);
        self.position + self.rotation * scaled
    }

    /// World space to object space.
    #[inline]
    pub fn reverse_transform(&self, p: Point3) -> Point3 {
        let local = self.inv_rotation * (p - self.position);
        Point3::new(
            local.x / self.scale.x,
            local.y / self.scale.y,
            local.z / self.scale.z,
        )
    }

    /// World direction into object space (no translation).
    #[inline]
    fn reverse_direction(&self, v: Vector3) -> Vector3 {
        let local = self.inv_rotation * v;
        Vector3::new(
            local.x / self.scale.x,
            local.y / self.scale.y,
            local.z / self.scale.z,
        )
    }

    /// Object-space normal into world space; normals transform by the
    /// inverse transpose, which for `R * S` is `R * S^-1`. A degenerate
    /// input comes back as the exact null vector so callers can detect it.
    #[inline]
    fn normal_to_world(&self, n: Vector3) -> Vector3 {
        let scaled = Vector3::new(n.x / self.scale.x, n.y / self.scale.y, n.z / self.scale.z);
        let w = self.rotation * scaled;
        let m = magnitude(w);
        if m <= EPSILON {
            Vector3::new(0.0, 0.0, 0.0)
        } else {
            w / m
        }
    }

    // ------------------------------------------------------------------
    // Geometry queries.

    /// All forward boundary crossings, ordered by ray parameter. World
    /// space in, world space out.
    pub(crate) fn events(&self, world_ray: &Ray) -> Result<Vec<Event>> {
        if let Surface::Overlap { mode, a, b } = &self.surface {
            return overlap::events(*mode, a, b, world_ray);
        }
        let object_ray = Ray::new(
            self.reverse_transform(world_ray.origin),
            self.reverse_direction(world_ray.direction),
        );
        let hits = self.surface.intersect_object_space(&object_ray)?;
        Ok(hits
            .into_iter()
            .map(|(t, n_obj)| {
                let point = world_ray.at(t);
                Event {
                    t,
                    point,
                    normal: self.normal_to_world(n_obj),
                }
            })
            .collect())
    }

    /// Intersects a world ray with this object, reporting the nearest
    /// forward crossing. The contract of the hot path: transform into
    /// object space, solve the closed form there, transform the results
    /// back.
    pub fn intersect(&self, world_ray: &Ray) -> Result<Hit> {
        let events = self.events(world_ray)?;
        match events.first() {
            None => Ok(Hit::none()),
            Some(e) => Ok(Hit {
                intersect: Intersection::Point(e.point),
                distance: magnitude(e.point - world_ray.origin),
                normal: e.normal,
            }),
        }
    }

    /// Outward unit normal at a world surface point.
    pub fn normal(&self, world_point: Point3) -> Vector3 {
        if let Surface::Overlap { mode, a, b } = &self.surface {
            return overlap::normal(*mode, a, b, world_point);
        }
        let p = self.reverse_transform(world_point);
        self.normal_to_world(self.surface.normal_object_space(p))
    }

    /// Whether the world point is inside the closed solid. Thin surfaces
    /// (square, ring, triangle, mesh) contain nothing; the infinite plane
    /// contains its back half-space.
    pub fn contains(&self, world_point: Point3) -> bool {
        if let Surface::Overlap { mode, a, b } = &self.surface {
            return mode.combine(a.contains(world_point), b.contains(world_point));
        }
        self.surface
            .contains_object_space(self.reverse_transform(world_point))
    }

    /// Texture coordinate of a world surface point, in the surface's
    /// natural parameterization.
    pub fn map(&self, world_point: Point3) -> Point2 {
        if let Surface::Overlap { mode: _, a, b } = &self.surface {
            // Delegate to whichever child's boundary the point sits on.
            let ma = a.surface_measure(world_point);
            let mb = b.surface_measure(world_point);
            return if ma <= mb {
                a.map(world_point)
            } else {
                b.map(world_point)
            };
        }
        self.surface
            .map_object_space(self.reverse_transform(world_point))
    }

    /// How far a world point is from this surface, approximately; used to
    /// attribute composite surface points to a child.
    fn surface_measure(&self, world_point: Point3) -> Precision {
        if let Surface::Overlap { mode: _, a, b } = &self.surface {
            return a
                .surface_measure(world_point)
                .min(b.surface_measure(world_point));
        }
        self.surface
            .measure_object_space(self.reverse_transform(world_point))
    }

    /// World axis-aligned bounds; infinite along any axis for open
    /// surfaces.
    pub fn get_world_bounds(&self) -> Aabb {
        if let Surface::Overlap { mode, a, b } = &self.surface {
            return overlap::bounds(*mode, a, b);
        }
        let local = self.surface.bounds_object_space();
        if local.is_infinite() {
            return Aabb::infinite();
        }
        let mut world = Aabb::empty();
        for (x, y, z) in iproduct!(
            [local.min.x, local.max.x].iter().copied(),
            [local.min.y, local.max.y].iter().copied(),
            [local.min.z, local.max.z].iter().copied()
        ) {
            let p = self.forward_transform(Point3::new(x, y, z));
            world.grow(&Aabb::new(p, p));
        }
        world
    }

    /// Mirror reflection of `incoming` about `normal`, anchored at the
    /// surface point.
    pub fn reflection(&self, incoming: &Ray, normal: Vector3, surface_point: Point3) -> Ray {
        Ray::new(surface_point, reflect(incoming.direction, normal))
    }

    /// Snell refraction of `incoming` through the surface, from a medium
    /// of index `n_from` into `n_to`. Total internal reflection returns
    /// the reflection ray.
    pub fn refraction(
        &self,
        incoming: &Ray,
        normal: Vector3,
        surface_point: Point3,
        n_from: Precision,
        n_to: Precision,
    ) -> Ray {
        Ray::new(
            surface_point,
            refract(incoming.direction, normal, n_from, n_to),
        )
    }
}

/// `d - 2 (d . n) n`.
#[inline]
pub fn reflect(d: Vector3, n: Vector3) -> Vector3 {
    d - n * (2.0 * d.dot(n))
}

/// Snell's law for a (not necessarily unit) incident direction and a unit
/// outward normal. Total internal reflection falls back to reflection.
pub fn refract(d: Vector3, n: Vector3, n_from: Precision, n_to: Precision) -> Vector3 {
    let d = match try_normalize(d) {
        Ok(d) => d,
        Err(_) => return d,
    };
    let mut normal = n;
    let mut cos_in = d.dot(n);
    if cos_in > 0.0 {
        // Leaving the surface; the math wants the normal on our side.
        normal = -n;
    } else {
        cos_in = -cos_in;
    }
    let eta = n_from / n_to;
    let k = 1.0 - eta * eta * (1.0 - cos_in * cos_in);
    if k < 0.0 {
        return reflect(d, n);
    }
    d * eta + normal * (eta * cos_in - k.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{basis, nearly_equal_points, nearly_equal_vectors};
    use crate::mediums::VACUUM;
    use cgmath::{Deg, InnerSpace as _};

    #[test]
    fn sphere_hit_from_outside() {
        let s = Object::sphere(Point3::new(0.0, 0.0, 0.0), 1.0, VACUUM.clone()).unwrap();
        let r = Ray::new(Point3::new(3.0, 0.0, 0.0), -basis::X);
        let h = s.intersect(&r).unwrap();
        match h.intersect {
            Intersection::Point(p) => {
                assert!(nearly_equal_points(p, Point3::new(1.0, 0.0, 0.0)));
            }
            ref other => panic!("unexpected intersection {:?}", other),
        }
        assert!((h.distance - 2.0).abs() <= 1e-9);
        assert!(nearly_equal_vectors(h.normal, basis::X));
    }

    #[test]
    fn transforms_round_trip() {
        let mut o = Object::new(Surface::Sphere { radius: 1.0 }, VACUUM.clone());
        o.move_to(Point3::new(1.0, 2.0, 3.0));
        o.set_rotation(Deg(30.0).into(), Deg(-40.0).into(), Deg(75.0).into());
        o.set_scale(2.0, 3.0, 0.5).unwrap();
        let p = Point3::new(0.3, -0.9, 2.7);
        let round = o.reverse_transform(o.forward_transform(p));
        assert!(nearly_equal_points(p, round));
    }

    #[test]
    fn scaled_sphere_is_an_ellipsoid() {
        let mut o = Object::sphere(Point3::new(0.0, 0.0, 0.0), 1.0, VACUUM.clone()).unwrap();
        o.set_scale(2.0, 1.0, 1.0).unwrap();
        // The surface now extends to x = +/-2.
        let r = Ray::new(Point3::new(5.0, 0.0, 0.0), -basis::X);
        let h = o.intersect(&r).unwrap();
        assert!((h.distance - 3.0).abs() <= 1e-9);
        assert!(nearly_equal_vectors(h.normal, basis::X));
        // Normal off-axis is not radial for an ellipsoid, but must stay
        // unit length.
        let r2 = Ray::new(Point3::new(1.0, 5.0, 0.0), -basis::Y);
        let h2 = o.intersect(&r2).unwrap();
        assert!((magnitude(h2.normal) - 1.0).abs() <= 1e-9);
    }

    #[test]
    fn rotated_plane_faces_its_normal() {
        let o = Object::plane(Point3::new(0.0, 0.0, -1.0), basis::Z, VACUUM.clone()).unwrap();
        let r = Ray::new(Point3::new(0.0, 0.0, 0.0), -basis::Z);
        let h = o.intersect(&r).unwrap();
        assert!((h.distance - 1.0).abs() <= 1e-9);
        assert!(nearly_equal_vectors(h.normal, basis::Z));
    }

    #[test]
    fn reflection_formula() {
        let d = Vector3::new(1.0, -1.0, 0.0).normalize();
        let out = reflect(d, basis::Y);
        assert!(nearly_equal_vectors(
            out,
            Vector3::new(1.0, 1.0, 0.0).normalize()
        ));
    }

    #[test]
    fn refraction_bends_and_reflects_at_tir() {
        // Into denser glass: bends toward the normal.
        let d = Vector3::new(1.0, -1.0, 0.0).normalize();
        let out = refract(d, basis::Y, 1.0, 1.5);
        assert!(out.y < 0.0);
        let angle_in = d.dot(-basis::Y).acos();
        let angle_out = out.normalize().dot(-basis::Y).acos();
        assert!(angle_out < angle_in);

        // Shallow exit from dense medium: total internal reflection.
        let shallow = Vector3::new(1.0, -0.2, 0.0).normalize();
        let tir = refract(shallow, basis::Y, 1.5, 1.0);
        assert!(nearly_equal_vectors(tir, reflect(shallow, basis::Y)));
    }

    #[test]
    fn world_bounds_follow_transform(){
        let mut o = Object::cuboid(
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 1.0, 1.0),
            VACUUM.clone(),
        )
        .unwrap();
        o.move_to(Point3::new(10.0, 0.0, 0.0));
        let b = o.get_world_bounds();
        assert!((b.min.x - 9.0).abs() <= 1e-9);
        assert!((b.max.x - 11.0).abs() <= 1e-9);

        let p = Object::plane(Point3::new(0.0, 0.0, 0.0), basis::Z, VACUUM.clone()).unwrap();
        assert!(p.get_world_bounds().is_infinite());
    }

    #[test]
    fn containment() {
        let s = Object::sphere(Point3::new(0.0, 0.0, 0.0), 2.0, VACUUM.clone()).unwrap();
        assert!(s.contains(Point3::new(1.0, 0.0, 0.0)));
        assert!(!s.contains(Point3::new(3.0, 0.0, 0.0)));
        // The plane's solid side is behind its normal.
        let p = Object::plane(Point3::new(0.0, 0.0, 0.0), basis::Z, VACUUM.clone()).unwrap();
        assert!(p.contains(Point3::new(0.0, 0.0, -1.0)));
        assert!(!p.contains(Point3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn sphere_uv_map() {
        let s = Object::sphere(Point3::new(0.0, 0.0, 0.0), 1.0, VACUUM.clone()).unwrap();
        let top = s.map(Point3::new(0.0, 0.0, 1.0));
        assert!(top.y.abs() <= 1e-9);
        let bottom = s.map(Point3::new(0.0, 0.0, -1.0));
        assert!((bottom.y - 1.0).abs() <= 1e-9);
    }
}
