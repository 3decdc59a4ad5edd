// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! The concrete surfaces and their object-space closed forms.
//!
//! Every surface is expressed in a canonical local frame (spheres at the
//! origin, planar surfaces on `z = 0` facing `+Z`, axes of revolution along
//! `Z`); the owning [`Object`] transform places it in the world.

use cgmath::{InnerSpace as _, Matrix4, SquareMatrix as _, Vector4};
use ordered_float::OrderedFloat;

use super::{Object, OverlapMode};
use crate::error::{Error, Result};
use crate::geometry::{magnitude, Aabb, Point2, Point3, Ray, Vector3};
use crate::math::{nearly_zero, quadratic_roots, quartic_roots, Precision, EPSILON};

/// Discriminant tags for [`Surface`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum SurfaceKind {
    Sphere,
    Plane,
    Square,
    Ring,
    Cuboid,
    Cylinder,
    Cone,
    Torus,
    Triangle,
    Mesh,
    Quadric,
    Overlap,
}

/// The closed sum of concrete surfaces. The Boolean composite is itself a
/// variant, so composites compose.
#[derive(Clone, Debug)]
pub enum Surface {
    /// Sphere of the given radius about the local origin.
    Sphere { radius: Precision },
    /// The infinite `z = 0` plane, facing `+Z`. Its solid side, for the
    /// Boolean algebra, is the half space `z <= 0`.
    Plane,
    /// Square of half-edge `half` on the `z = 0` plane.
    Square { half: Precision },
    /// Annulus between two radii on the `z = 0` plane.
    Ring { inner: Precision, outer: Precision },
    /// Axis-aligned box of the given half extents.
    Cuboid { half: Vector3 },
    /// Open tube about the `Z` axis, clipped to `|z| <= half_height`.
    Cylinder {
        radius: Precision,
        half_height: Precision,
    },
    /// Open cone with apex at `(0, 0, height)` and a base circle of
    /// `radius` on `z = 0`.
    Cone { radius: Precision, height: Precision },
    /// Torus about the `Z` axis: `major` is the ring radius, `minor` the
    /// tube radius.
    Torus { major: Precision, minor: Precision },
    /// A single triangle with precomputed unit normal.
    Triangle {
        a: Point3,
        b: Point3,
        c: Point3,
        normal: Vector3,
    },
    /// A bag of triangles sharing the object transform.
    Mesh { triangles: Vec<MeshTriangle> },
    /// General quadric `x^T Q x = 0` in homogeneous form, with the finite
    /// or infinite bounds recorded at construction.
    Quadric {
        q: Matrix4<Precision>,
        bounds: Aabb,
    },
    /// Boolean combination of two placed objects.
    Overlap {
        mode: OverlapMode,
        a: Box<Object>,
        b: Box<Object>,
    },
}

/// One mesh face with its precomputed unit normal.
#[derive(Clone, Copy, Debug)]
pub struct MeshTriangle {
    pub a: Point3,
    pub b: Point3,
    pub c: Point3,
    pub normal: Vector3,
}

impl Surface {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Surface::Sphere { .. } => SurfaceKind::Sphere,
            Surface::Plane => SurfaceKind::Plane,
            Surface::Square { .. } => SurfaceKind::Square,
            Surface::Ring { .. } => SurfaceKind::Ring,
            Surface::Cuboid { .. } => SurfaceKind::Cuboid,
            Surface::Cylinder { .. } => SurfaceKind::Cylinder,
            Surface::Cone { .. } => SurfaceKind::Cone,
            Surface::Torus { .. } => SurfaceKind::Torus,
            Surface::Triangle { .. } => SurfaceKind::Triangle,
            Surface::Mesh { .. } => SurfaceKind::Mesh,
            Surface::Quadric { .. } => SurfaceKind::Quadric,
            Surface::Overlap { .. } => SurfaceKind::Overlap,
        }
    }

    /// A triangle surface; fails on zero area.
    pub fn triangle(a: Point3, b: Point3, c: Point3) -> Result<Surface> {
        let n = (b - a).cross(c - a);
        let m = magnitude(n);
        if nearly_zero(m) {
            return Err(Error::GeometryDegenerate("triangle of zero area"));
        }
        Ok(Surface::Triangle {
            a,
            b,
            c,
            normal: n / m,
        })
    }

    /// A mesh from shared-frame triangles; fails if any has zero area.
    pub fn mesh(faces: Vec<[Point3; 3]>) -> Result<Surface> {
        let mut triangles = Vec::with_capacity(faces.len());
        for [a, b, c] in faces {
            let n = (b - a).cross(c - a);
            let m = magnitude(n);
            if nearly_zero(m) {
                return Err(Error::GeometryDegenerate("mesh triangle of zero area"));
            }
            triangles.push(MeshTriangle {
                a,
                b,
                c,
                normal: n / m,
            });
        }
        Ok(Surface::Mesh { triangles })
    }

    /// `x^2/a^2 + y^2/b^2 + z^2/c^2 = 1`.
    pub fn ellipsoid(a: Precision, b: Precision, c: Precision) -> Result<Surface> {
        if a <= 0.0 || b <= 0.0 || c <= 0.0 {
            return Err(Error::GeometryDegenerate("ellipsoid semi-axes must be positive"));
        }
        let mut q = Matrix4::identity();
        q.x.x = 1.0 / (a * a);
        q.y.y = 1.0 / (b * b);
        q.z.z = 1.0 / (c * c);
        q.w.w = -1.0;
        Ok(Surface::Quadric {
            q,
            bounds: Aabb::new(Point3::new(-a, -b, -c), Point3::new(a, b, c)),
        })
    }

    /// `x^2/a^2 + y^2/b^2 - z = 0` (elliptic paraboloid opening along +Z).
    pub fn paraboloid(a: Precision, b: Precision) -> Result<Surface> {
        if a <= 0.0 || b <= 0.0 {
            return Err(Error::GeometryDegenerate("paraboloid semi-axes must be positive"));
        }
        let mut q = Matrix4::identity();
        q.x.x = 1.0 / (a * a);
        q.y.y = 1.0 / (b * b);
        q.z.z = 0.0;
        q.w.w = 0.0;
        q.z.w = -0.5;
        q.w.z = -0.5;
        Ok(Surface::Quadric {
            q,
            bounds: Aabb::infinite(),
        })
    }

    /// `x^2/a^2 + y^2/b^2 - z^2/c^2 = 1` (hyperboloid of one sheet).
    pub fn hyperboloid(a: Precision, b: Precision, c: Precision) -> Result<Surface> {
        if a <= 0.0 || b <= 0.0 || c <= 0.0 {
            return Err(Error::GeometryDegenerate("hyperboloid semi-axes must be positive"));
        }
        let mut q = Matrix4::identity();
        q.x.x = 1.0 / (a * a);
        q.y.y = 1.0 / (b * b);
        q.z.z = -1.0 / (c * c);
        q.w.w = -1.0;
        Ok(Surface::Quadric {
            q,
            bounds: Aabb::infinite(),
        })
    }

    /// `x^2/a^2 + y^2/b^2 - z^2/c^2 = 0` (elliptical cone).
    pub fn elliptical_cone(a: Precision, b: Precision, c: Precision) -> Result<Surface> {
        if a <= 0.0 || b <= 0.0 || c <= 0.0 {
            return Err(Error::GeometryDegenerate("cone semi-axes must be positive"));
        }
        let mut q = Matrix4::identity();
        q.x.x = 1.0 / (a * a);
        q.y.y = 1.0 / (b * b);
        q.z.z = -1.0 / (c * c);
        q.w.w = 0.0;
        Ok(Surface::Quadric {
            q,
            bounds: Aabb::infinite(),
        })
    }

    /// `x^2/a^2 + y^2/b^2 = 1` at every `z` (elliptical cylinder).
    pub fn elliptical_cylinder(a: Precision, b: Precision) -> Result<Surface> {
        if a <= 0.0 || b <= 0.0 {
            return Err(Error::GeometryDegenerate("cylinder semi-axes must be positive"));
        }
        let mut q = Matrix4::identity();
        q.x.x = 1.0 / (a * a);
        q.y.y = 1.0 / (b * b);
        q.z.z = 0.0;
        q.w.w = -1.0;
        Ok(Surface::Quadric {
            q,
            bounds: Aabb::infinite(),
        })
    }

    // ------------------------------------------------------------------

    /// Forward crossings of the object-space ray, `(t, outward normal)`
    /// ordered by `t`. Only `t > EPSILON` is reported.
    pub(crate) fn intersect_object_space(
        &self,
        ray: &Ray,
    ) -> Result<Vec<(Precision, Vector3)>> {
        let p = ray.origin;
        let v = ray.direction;
        let mut hits: Vec<(Precision, Vector3)> = Vec::new();
        match self {
            Surface::Sphere { radius } => {
                let a = v.magnitude2();
                let b = 2.0 * (p - Point3::new(0.0, 0.0, 0.0)).dot(v);
                let c = (p - Point3::new(0.0, 0.0, 0.0)).magnitude2() - radius * radius;
                let (t0, t1) = quadratic_roots(a, b, c);
                for &t in [t0, t1].iter() {
                    if t.is_nan() || t <= EPSILON {
                        continue;
                    }
                    let q = ray.at(t);
                    hits.push((t, (q - Point3::new(0.0, 0.0, 0.0)) / *radius));
                }
            }
            Surface::Plane => {
                if let Some(t) = plane_crossing(p, v) {
                    hits.push((t, Vector3::new(0.0, 0.0, 1.0)));
                }
            }
            Surface::Square { half } => {
                if let Some(t) = plane_crossing(p, v) {
                    let q = ray.at(t);
                    if q.x.abs() <= *half && q.y.abs() <= *half {
                        hits.push((t, Vector3::new(0.0, 0.0, 1.0)));
                    }
                }
            }
            Surface::Ring { inner, outer } => {
                if let Some(t) = plane_crossing(p, v) {
                    let q = ray.at(t);
                    let r = q.x.hypot(q.y);
                    if (*inner..=*outer).contains(&r) {
                        hits.push((t, Vector3::new(0.0, 0.0, 1.0)));
                    }
                }
            }
            Surface::Cuboid { half } => {
                cuboid_slabs(p, v, *half, &mut hits);
            }
            Surface::Cylinder {
                radius,
                half_height,
            } => {
                let a = v.x * v.x + v.y * v.y;
                if !nearly_zero(a) {
                    let b = 2.0 * (p.x * v.x + p.y * v.y);
                    let c = p.x * p.x + p.y * p.y - radius * radius;
                    let (t0, t1) = quadratic_roots(a, b, c);
                    for &t in [t0, t1].iter() {
                        if t.is_nan() || t <= EPSILON {
                            continue;
                        }
                        let q = ray.at(t);
                        if q.z.abs() <= *half_height {
                            hits.push((t, Vector3::new(q.x, q.y, 0.0) / *radius));
                        }
                    }
                }
            }
            Surface::Cone { radius, height } => {
                let k = radius / height;
                let k2 = k * k;
                let a = v.x * v.x + v.y * v.y - k2 * v.z * v.z;
                let b = 2.0 * (p.x * v.x + p.y * v.y) + 2.0 * k2 * (height - p.z) * v.z;
                let c = p.x * p.x + p.y * p.y - k2 * (height - p.z) * (height - p.z);
                let (t0, t1) = quadratic_roots(a, b, c);
                for &t in [t0, t1].iter() {
                    if t.is_nan() || t <= EPSILON {
                        continue;
                    }
                    let q = ray.at(t);
                    if (0.0..=*height).contains(&q.z) {
                        let g = Vector3::new(q.x, q.y, k2 * (height - q.z));
                        let m = magnitude(g);
                        if m > EPSILON {
                            hits.push((t, g / m));
                        }
                    }
                }
            }
            Surface::Torus { major, minor } => {
                let m = v.magnitude2();
                let n = (p - Point3::new(0.0, 0.0, 0.0)).dot(v);
                let d = (p - Point3::new(0.0, 0.0, 0.0)).magnitude2();
                let e = d + major * major - minor * minor;
                let rxy2 = 4.0 * major * major;
                let qa = m * m;
                let qb = 4.0 * m * n;
                let qc = 2.0 * m * e + 4.0 * n * n - rxy2 * (v.x * v.x + v.y * v.y);
                let qd = 4.0 * n * e - 2.0 * rxy2 * (p.x * v.x + p.y * v.y);
                let qe = e * e - rxy2 * (p.x * p.x + p.y * p.y);
                let (t0, t1, t2, t3) = quartic_roots(qa, qb, qc, qd, qe);
                for &t in [t0, t1, t2, t3].iter() {
                    if t.is_nan() || t <= EPSILON {
                        continue;
                    }
                    let q = ray.at(t);
                    hits.push((t, torus_normal(q, *major, *minor)));
                }
            }
            Surface::Triangle { a, b, c, normal } => {
                if let Some(t) = moller_trumbore(p, v, *a, *b, *c) {
                    hits.push((t, *normal));
                }
            }
            Surface::Mesh { triangles } => {
                for tri in triangles {
                    if let Some(t) = moller_trumbore(p, v, tri.a, tri.b, tri.c) {
                        hits.push((t, tri.normal));
                    }
                }
            }
            Surface::Quadric { q, .. } => {
                if nearly_zero_matrix(q) {
                    return Err(Error::GeometryDegenerate("quadric with all-zero coefficients"));
                }
                let ph = Vector4::new(p.x, p.y, p.z, 1.0);
                let vh = Vector4::new(v.x, v.y, v.z, 0.0);
                let a = vh.dot(q * vh);
                let b = 2.0 * ph.dot(q * vh);
                let c = ph.dot(q * ph);
                let (t0, t1) = quadratic_roots(a, b, c);
                for &t in [t0, t1].iter() {
                    if t.is_nan() || t <= EPSILON {
                        continue;
                    }
                    let at = ray.at(t);
                    let g = q * Vector4::new(at.x, at.y, at.z, 1.0);
                    let n = Vector3::new(g.x, g.y, g.z);
                    let m = magnitude(n);
                    if m > EPSILON {
                        hits.push((t, n / m));
                    }
                }
            }
            Surface::Overlap { .. } => {
                // Composites are resolved by Object::events in world space.
                debug_assert!(false, "overlap surfaces do not intersect in object space");
            }
        }
        // NaN parameters were filtered above, so this is a total order.
        hits.sort_by_key(|&(t, _)| OrderedFloat(t));
        Ok(hits)
    }

    /// Outward normal at an object-space surface point.
    pub(crate) fn normal_object_space(&self, p: Point3) -> Vector3 {
        match self {
            Surface::Sphere { radius } => (p - Point3::new(0.0, 0.0, 0.0)) / *radius,
            Surface::Plane | Surface::Square { .. } | Surface::Ring { .. } => {
                Vector3::new(0.0, 0.0, 1.0)
            }
            Surface::Cuboid { half } => {
                // The face whose slab the point is closest to wins.
                let dx = (p.x.abs() - half.x).abs();
                let dy = (p.y.abs() - half.y).abs();
                let dz = (p.z.abs() - half.z).abs();
                if dx <= dy && dx <= dz {
                    Vector3::new(p.x.signum(), 0.0, 0.0)
                } else if dy <= dz {
                    Vector3::new(0.0, p.y.signum(), 0.0)
                } else {
                    Vector3::new(0.0, 0.0, p.z.signum())
                }
            }
            Surface::Cylinder { radius, .. } => Vector3::new(p.x, p.y, 0.0) / *radius,
            Surface::Cone { radius, height } => {
                let k2 = (radius / height) * (radius / height);
                let g = Vector3::new(p.x, p.y, k2 * (height - p.z));
                let m = magnitude(g);
                if m <= EPSILON {
                    Vector3::new(0.0, 0.0, 1.0)
                } else {
                    g / m
                }
            }
            Surface::Torus { major, minor } => torus_normal(p, *major, *minor),
            Surface::Triangle { normal, .. } => *normal,
            Surface::Mesh { triangles } => {
                // Nearest face plane by offset.
                let mut best = Vector3::new(0.0, 0.0, 1.0);
                let mut best_d = Precision::INFINITY;
                for tri in triangles {
                    let d = tri.normal.dot(p - tri.a).abs();
                    if d < best_d {
                        best_d = d;
                        best = tri.normal;
                    }
                }
                best
            }
            Surface::Quadric { q, .. } => {
                let g = q * Vector4::new(p.x, p.y, p.z, 1.0);
                let n = Vector3::new(g.x, g.y, g.z);
                let m = magnitude(n);
                if m <= EPSILON {
                    Vector3::new(0.0, 0.0, 1.0)
                } else {
                    n / m
                }
            }
            Surface::Overlap { .. } => Vector3::new(0.0, 0.0, 1.0),
        }
    }

    /// Solid membership in object space. Thin surfaces contain nothing.
    pub(crate) fn contains_object_space(&self, p: Point3) -> bool {
        match self {
            Surface::Sphere { radius } => {
                (p - Point3::new(0.0, 0.0, 0.0)).magnitude2() <= radius * radius + EPSILON
            }
            Surface::Plane => p.z <= EPSILON,
            Surface::Square { .. } | Surface::Ring { .. } => false,
            Surface::Cuboid { half } => {
                p.x.abs() <= half.x + EPSILON
                    && p.y.abs() <= half.y + EPSILON
                    && p.z.abs() <= half.z + EPSILON
            }
            Surface::Cylinder {
                radius,
                half_height,
            } => {
                p.z.abs() <= half_height + EPSILON
                    && p.x * p.x + p.y * p.y <= radius * radius + EPSILON
            }
            Surface::Cone { radius, height } => {
                let k = radius / height;
                (0.0 - EPSILON..=height + EPSILON).contains(&p.z)
                    && p.x.hypot(p.y) <= k * (height - p.z) + EPSILON
            }
            Surface::Torus { major, minor } => {
                let d = (p - Point3::new(0.0, 0.0, 0.0)).magnitude2();
                let e = d + major * major - minor * minor;
                e * e <= 4.0 * major * major * (p.x * p.x + p.y * p.y) + EPSILON
            }
            Surface::Triangle { .. } | Surface::Mesh { .. } => false,
            Surface::Quadric { q, .. } => {
                let ph = Vector4::new(p.x, p.y, p.z, 1.0);
                ph.dot(q * ph) <= EPSILON
            }
            Surface::Overlap { .. } => false,
        }
    }

    /// Rough distance-to-boundary used to attribute composite points.
    pub(crate) fn measure_object_space(&self, p: Point3) -> Precision {
        match self {
            Surface::Sphere { radius } => (magnitude(p - Point3::new(0.0, 0.0, 0.0)) - radius).abs(),
            Surface::Plane | Surface::Square { .. } | Surface::Ring { .. } => p.z.abs(),
            Surface::Cuboid { half } => {
                let dx = p.x.abs() - half.x;
                let dy = p.y.abs() - half.y;
                let dz = p.z.abs() - half.z;
                dx.max(dy).max(dz).abs()
            }
            Surface::Cylinder { radius, .. } => (p.x.hypot(p.y) - radius).abs(),
            Surface::Cone { radius, height } => {
                let k = radius / height;
                (p.x.hypot(p.y) - k * (height - p.z)).abs()
            }
            Surface::Torus { major, minor } => {
                let s = p.x.hypot(p.y);
                let c = if s <= EPSILON {
                    Point3::new(*major, 0.0, 0.0)
                } else {
                    Point3::new(p.x * major / s, p.y * major / s, 0.0)
                };
                (magnitude(p - c) - minor).abs()
            }
            Surface::Triangle { a, normal, .. } => normal.dot(p - *a).abs(),
            Surface::Mesh { triangles } => triangles
                .iter()
                .map(|t| t.normal.dot(p - t.a).abs())
                .fold(Precision::INFINITY, Precision::min),
            Surface::Quadric { q, .. } => {
                let ph = Vector4::new(p.x, p.y, p.z, 1.0);
                ph.dot(q * ph).abs()
            }
            Surface::Overlap { .. } => Precision::INFINITY,
        }
    }

    /// Texture coordinate in the surface's natural parameterization.
    pub(crate) fn map_object_space(&self, p: Point3) -> Point2 {
        let tau = std::f64::consts::TAU;
        match self {
            Surface::Sphere { radius } => {
                // Longitude and latitude, both normalized to [0, 1].
                let u = p.y.atan2(p.x) / tau + 0.5;
                let v = (p.z / radius).clamp(-1.0, 1.0).acos() / std::f64::consts::PI;
                Point2::new(u, v)
            }
            Surface::Plane | Surface::Square { .. } => Point2::new(p.x, p.y),
            Surface::Ring { inner, outer } => {
                let r = p.x.hypot(p.y);
                let u = ((r - inner) / (outer - inner)).clamp(0.0, 1.0);
                let v = p.y.atan2(p.x) / tau + 0.5;
                Point2::new(u, v)
            }
            Surface::Cuboid { half } => {
                // Project along the dominant axis.
                let nx = (p.x / half.x).abs();
                let ny = (p.y / half.y).abs();
                let nz = (p.z / half.z).abs();
                if nx >= ny && nx >= nz {
                    Point2::new(p.y, p.z)
                } else if ny >= nz {
                    Point2::new(p.x, p.z)
                } else {
                    Point2::new(p.x, p.y)
                }
            }
            Surface::Cylinder { half_height, .. } => {
                let u = p.y.atan2(p.x) / tau + 0.5;
                let v = ((p.z + half_height) / (2.0 * half_height)).clamp(0.0, 1.0);
                Point2::new(u, v)
            }
            Surface::Cone { height, .. } => {
                let u = p.y.atan2(p.x) / tau + 0.5;
                let v = (p.z / height).clamp(0.0, 1.0);
                Point2::new(u, v)
            }
            Surface::Torus { major, .. } => {
                let u = p.y.atan2(p.x) / tau + 0.5;
                let s = p.x.hypot(p.y) - major;
                let v = p.z.atan2(s) / tau + 0.5;
                Point2::new(u, v)
            }
            Surface::Triangle { .. } | Surface::Mesh { .. } => Point2::new(p.x, p.y),
            Surface::Quadric { .. } => {
                let u = p.y.atan2(p.x) / tau + 0.5;
                Point2::new(u, p.z)
            }
            Surface::Overlap { .. } => Point2::new(p.x, p.y),
        }
    }

    /// Object-space bounds, infinite for open surfaces.
    pub(crate) fn bounds_object_space(&self) -> Aabb {
        match self {
            Surface::Sphere { radius } => Aabb::new(
                Point3::new(-radius, -radius, -radius),
                Point3::new(*radius, *radius, *radius),
            ),
            Surface::Plane => Aabb::infinite(),
            Surface::Square { half } => Aabb::new(
                Point3::new(-half, -half, 0.0),
                Point3::new(*half, *half, 0.0),
            ),
            Surface::Ring { outer, .. } => Aabb::new(
                Point3::new(-outer, -outer, 0.0),
                Point3::new(*outer, *outer, 0.0),
            ),
            Surface::Cuboid { half } => {
                Aabb::new(Point3::new(-half.x, -half.y, -half.z), Point3::new(half.x, half.y, half.z))
            }
            Surface::Cylinder {
                radius,
                half_height,
            } => Aabb::new(
                Point3::new(-radius, -radius, -half_height),
                Point3::new(*radius, *radius, *half_height),
            ),
            Surface::Cone { radius, height } => Aabb::new(
                Point3::new(-radius, -radius, 0.0),
                Point3::new(*radius, *radius, *height),
            ),
            Surface::Torus { major, minor } => {
                let r = major + minor;
                Aabb::new(Point3::new(-r, -r, -minor), Point3::new(r, r, *minor))
            }
            Surface::Triangle { a, b, c, .. } => {
                let mut bounds = Aabb::new(*a, *a);
                bounds.grow(&Aabb::new(*b, *b));
                bounds.grow(&Aabb::new(*c, *c));
                bounds
            }
            Surface::Mesh { triangles } => {
                let mut bounds = Aabb::empty();
                for t in triangles {
                    bounds.grow(&Aabb::new(t.a, t.a));
                    bounds.grow(&Aabb::new(t.b, t.b));
                    bounds.grow(&Aabb::new(t.c, t.c));
                }
                bounds
            }
            Surface::Quadric { bounds, .. } => *bounds,
            Surface::Overlap { .. } => Aabb::infinite(),
        }
    }
}

/// Crossing parameter of the `z = 0` plane, if forward and not parallel.
#[inline]
fn plane_crossing(p: Point3, v: Vector3) -> Option<Precision> {
    if nearly_zero(v.z) {
        return None;
    }
    let t = -p.z / v.z;
    if t > EPSILON {
        Some(t)
    } else {
        None
    }
}

/// Slab test producing entry and exit with their face normals.
fn cuboid_slabs(p: Point3, v: Vector3, half: Vector3, hits: &mut Vec<(Precision, Vector3)>) {
    let mut t_near = Precision::NEG_INFINITY;
    let mut t_far = Precision::INFINITY;
    let mut near_axis = 0;
    let mut far_axis = 0;
    for axis in 0..3 {
        let (pa, va, ha) = match axis {
            0 => (p.x, v.x, half.x),
            1 => (p.y, v.y, half.y),
            _ => (p.z, v.z, half.z),
        };
        if nearly_zero(va) {
            if pa.abs() > ha {
                return;
            }
            continue;
        }
        let inv = 1.0 / va;
        let mut t0 = (-ha - pa) * inv;
        let mut t1 = (ha - pa) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_near {
            t_near = t0;
            near_axis = axis;
        }
        if t1 < t_far {
            t_far = t1;
            far_axis = axis;
        }
        if t_near > t_far {
            return;
        }
    }
    let axis_normal = |axis: usize, sign: Precision| -> Vector3 {
        match axis {
            0 => Vector3::new(sign, 0.0, 0.0),
            1 => Vector3::new(0.0, sign, 0.0),
            _ => Vector3::new(0.0, 0.0, sign),
        }
    };
    let component = |v: Vector3, axis: usize| match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    };
    if t_near > EPSILON {
        hits.push((t_near, axis_normal(near_axis, -component(v, near_axis).signum())));
    }
    if t_far > EPSILON {
        hits.push((t_far, axis_normal(far_axis, component(v, far_axis).signum())));
    }
}

fn torus_normal(p: Point3, major: Precision, minor: Precision) -> Vector3 {
    let s = p.x.hypot(p.y);
    let center = if s <= EPSILON {
        Point3::new(major, 0.0, 0.0)
    } else {
        Point3::new(p.x * major / s, p.y * major / s, 0.0)
    };
    (p - center) / minor
}

/// Möller-Trumbore barycentric test. Returns the forward parameter only.
fn moller_trumbore(p: Point3, v: Vector3, a: Point3, b: Point3, c: Point3) -> Option<Precision> {
    let e1 = b - a;
    let e2 = c - a;
    let h = v.cross(e2);
    let det = e1.dot(h);
    if det.abs() <= EPSILON {
        return None;
    }
    let f = 1.0 / det;
    let s = p - a;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let w = f * v.dot(q);
    if w < 0.0 || u + w > 1.0 {
        return None;
    }
    let t = f * e2.dot(q);
    if t > EPSILON {
        Some(t)
    } else {
        None
    }
}

fn nearly_zero_matrix(m: &Matrix4<Precision>) -> bool {
    let cols = [m.x, m.y, m.z, m.w];
    cols.iter()
        .all(|c| nearly_zero(c.x) && nearly_zero(c.y) && nearly_zero(c.z) && nearly_zero(c.w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{basis, nearly_equal_vectors};

    fn hit_ts(s: &Surface, origin: Point3, dir: Vector3) -> Vec<Precision> {
        s.intersect_object_space(&Ray::new(origin, dir))
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn cuboid_entry_and_exit() {
        let s = Surface::Cuboid {
            half: Vector3::new(1.0, 1.0, 1.0),
        };
        let hits = s
            .intersect_object_space(&Ray::new(Point3::new(5.0, 0.0, 0.0), -basis::X))
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!((hits[0].0 - 4.0).abs() <= 1e-9);
        assert!((hits[1].0 - 6.0).abs() <= 1e-9);
        assert!(nearly_equal_vectors(hits[0].1, basis::X));
        assert!(nearly_equal_vectors(hits[1].1, -basis::X));
        // A ray that misses.
        assert!(hit_ts(&s, Point3::new(5.0, 3.0, 0.0), -basis::X).is_empty());
    }

    #[test]
    fn cylinder_side_hits_clip_to_height() {
        let s = Surface::Cylinder {
            radius: 1.0,
            half_height: 1.0,
        };
        let hits = hit_ts(&s, Point3::new(5.0, 0.0, 0.0), -basis::X);
        assert_eq!(hits.len(), 2);
        assert!((hits[0] - 4.0).abs() <= 1e-9);
        // Above the clipped range there is nothing.
        assert!(hit_ts(&s, Point3::new(5.0, 0.0, 2.0), -basis::X).is_empty());
    }

    #[test]
    fn cone_narrows_with_height() {
        let s = Surface::Cone {
            radius: 1.0,
            height: 2.0,
        };
        // At z = 1 the radius is 0.5.
        let hits = hit_ts(&s, Point3::new(5.0, 0.0, 1.0), -basis::X);
        assert_eq!(hits.len(), 2);
        assert!((hits[0] - 4.5).abs() <= 1e-6);
        assert!((hits[1] - 5.5).abs() <= 1e-6);
    }

    #[test]
    fn torus_four_crossings() {
        let s = Surface::Torus {
            major: 2.0,
            minor: 0.5,
        };
        let hits = hit_ts(&s, Point3::new(5.0, 0.0, 0.0), -basis::X);
        assert_eq!(hits.len(), 4);
        // Crossings at x = 2.5, 1.5, -1.5, -2.5.
        assert!((hits[0] - 2.5).abs() <= 1e-6);
        assert!((hits[1] - 3.5).abs() <= 1e-6);
        assert!((hits[2] - 6.5).abs() <= 1e-6);
        assert!((hits[3] - 7.5).abs() <= 1e-6);
        // Down the donut hole: no crossings.
        assert!(hit_ts(&s, Point3::new(0.0, 0.0, 5.0), -basis::Z).is_empty());
    }

    #[test]
    fn torus_normals_point_out_of_the_tube() {
        let n = torus_normal(Point3::new(2.5, 0.0, 0.0), 2.0, 0.5);
        assert!(nearly_equal_vectors(n, basis::X));
        let n2 = torus_normal(Point3::new(2.0, 0.0, 0.5), 2.0, 0.5);
        assert!(nearly_equal_vectors(n2, basis::Z));
    }

    #[test]
    fn triangle_barycentric_bounds() {
        let s = Surface::triangle(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        )
        .unwrap();
        assert_eq!(hit_ts(&s, Point3::new(0.5, 0.5, 3.0), -basis::Z).len(), 1);
        assert!(hit_ts(&s, Point3::new(1.5, 1.5, 3.0), -basis::Z).is_empty());
        assert!(Surface::triangle(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        )
        .is_err());
    }

    #[test]
    fn mesh_reports_all_faces() {
        let s = Surface::mesh(vec![
            [
                Point3::new(-1.0, -1.0, 0.0),
                Point3::new(1.0, -1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            [
                Point3::new(-1.0, -1.0, 2.0),
                Point3::new(1.0, -1.0, 2.0),
                Point3::new(0.0, 1.0, 2.0),
            ],
        ])
        .unwrap();
        let hits = hit_ts(&s, Point3::new(0.0, 0.0, 5.0), -basis::Z);
        assert_eq!(hits.len(), 2);
        assert!(hits[0] < hits[1]);
    }

    #[test]
    fn ellipsoid_quadric() {
        let s = Surface::ellipsoid(2.0, 1.0, 1.0).unwrap();
        let hits = hit_ts(&s, Point3::new(5.0, 0.0, 0.0), -basis::X);
        assert_eq!(hits.len(), 2);
        assert!((hits[0] - 3.0).abs() <= 1e-6);
        assert!((hits[1] - 7.0).abs() <= 1e-6);
        assert!(!s.bounds_object_space().is_infinite());
        let hyper = Surface::hyperboloid(1.0, 1.0, 1.0).unwrap();
        assert!(hyper.bounds_object_space().is_infinite());
    }

    #[test]
    fn ring_annulus() {
        let s = Surface::Ring {
            inner: 1.0,
            outer: 2.0,
        };
        assert_eq!(hit_ts(&s, Point3::new(1.5, 0.0, 3.0), -basis::Z).len(), 1);
        assert!(hit_ts(&s, Point3::new(0.5, 0.0, 3.0), -basis::Z).is_empty());
        assert!(hit_ts(&s, Point3::new(2.5, 0.0, 3.0), -basis::Z).is_empty());
    }

    #[test]
    fn containment_shapes() {
        let cone = Surface::Cone {
            radius: 1.0,
            height: 2.0,
        };
        assert!(cone.contains_object_space(Point3::new(0.0, 0.0, 1.0)));
        assert!(!cone.contains_object_space(Point3::new(0.9, 0.0, 1.0)));
        let torus = Surface::Torus {
            major: 2.0,
            minor: 0.5,
        };
        assert!(torus.contains_object_space(Point3::new(2.0, 0.0, 0.0)));
        assert!(!torus.contains_object_space(Point3::new(0.0, 0.0, 0.0)));
    }
}
