// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! The pinhole camera: maps image-plane coordinates to world rays and owns
//! the captured image plus the adaptive-antialiasing mask.

use cgmath::{Deg, InnerSpace as _, Rad};

use crate::error::{Error, Result};
use crate::geometry::{basis, magnitude, try_normalize, Point2, Point3, Ray, Vector2, Vector3};
use crate::image::{Grey8, Image, RgbId};
use crate::math::Precision;

/// A pinhole camera with a horizontal field of view.
///
/// Image-plane coordinates run over `[-1, 1]` horizontally and
/// `[-aspect, aspect]` vertically, `aspect` being `height / width`.
#[derive(Debug)]
pub struct Camera {
    position: Point3,
    look_at: Point3,
    fov: Deg<Precision>,
    width: usize,
    height: usize,
    forward: Vector3,
    right: Vector3,
    up: Vector3,
    tan_half_fov: Precision,
    aspect: Precision,
    /// The rendered HDR image.
    pub capture: Image<RgbId>,
    /// Contrast mask from the first antialiasing pass.
    pub mask: Image<Grey8>,
}

impl Camera {
    pub fn new(
        width: usize,
        height: usize,
        position: Point3,
        look_at: Point3,
        fov: Deg<Precision>,
    ) -> Result<Camera> {
        let gaze = look_at - position;
        if magnitude(gaze) <= 0.0 {
            return Err(Error::Domain("camera cannot look at its own position"));
        }
        if fov.0 <= 0.0 || fov.0 >= 180.0 {
            return Err(Error::Domain("field of view must be within (0, 180)"));
        }
        let forward = try_normalize(gaze)?;
        // World up, unless the camera looks straight along it.
        let world_up = if forward.cross(basis::Y).magnitude2() > 1e-12 {
            basis::Y
        } else {
            basis::Z
        };
        let right = try_normalize(forward.cross(world_up))?;
        let up = right.cross(forward);
        let half: Rad<Precision> = Deg(fov.0 / 2.0).into();
        Ok(Camera {
            position,
            look_at,
            fov,
            width,
            height,
            forward,
            right,
            up,
            tan_half_fov: half.0.tan(),
            aspect: height as Precision / width as Precision,
            capture: Image::new(width, height)?,
            mask: Image::new(width, height)?,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn position(&self) -> Point3 {
        self.position
    }

    #[inline]
    pub fn look_at(&self) -> Point3 {
        self.look_at
    }

    #[inline]
    pub fn field_of_view(&self) -> Deg<Precision> {
        self.fov
    }

    /// Maps integer pixel coordinates (plus a subpixel jitter in
    /// `[-0.5, 0.5]^2`) to the image plane. Row 0 is the top of the image.
    pub fn image_point(&self, x: usize, y: usize, jitter: Vector2) -> Point2 {
        let u = 2.0 * ((x as Precision + 0.5 + jitter.x) / self.width as Precision) - 1.0;
        let v = self.aspect
            * (1.0 - 2.0 * ((y as Precision + 0.5 + jitter.y) / self.height as Precision));
        Point2::new(u, v)
    }

    /// Builds the world ray from the focal point through the image-plane
    /// point. The direction is unit length.
    pub fn cast(&self, image_point: Point2) -> Ray {
        let direction = self.forward
            + self.right * (image_point.x * self.tan_half_fov)
            + self.up * (image_point.y * self.tan_half_fov);
        Ray::new(self.position, direction.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::nearly_equal_vectors;
    use cgmath::InnerSpace as _;

    fn camera() -> Camera {
        Camera::new(
            256,
            256,
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(0.0, 0.0, 0.0),
            Deg(90.0),
        )
        .unwrap()
    }

    #[test]
    fn center_ray_is_the_gaze() {
        let cam = camera();
        let ray = cam.cast(Point2::new(0.0, 0.0));
        assert!(nearly_equal_vectors(ray.direction, -basis::Z));
        assert_eq!(ray.origin, Point3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn ninety_degree_fov_spans_45_each_side() {
        let cam = camera();
        let edge = cam.cast(Point2::new(1.0, 0.0));
        // 45 degrees off axis.
        let cos = edge.direction.dot(-basis::Z);
        assert!((cos - (std::f64::consts::FRAC_PI_4).cos()).abs() <= 1e-9);
        assert!(edge.direction.x > 0.0);
    }

    #[test]
    fn image_points_cover_the_plane() {
        let cam = camera();
        let top_left = cam.image_point(0, 0, Vector2::new(-0.5, -0.5));
        assert!((top_left.x + 1.0).abs() <= 1e-9);
        assert!((top_left.y - 1.0).abs() <= 1e-9);
        let bottom_right = cam.image_point(255, 255, Vector2::new(0.5, 0.5));
        assert!((bottom_right.x - 1.0).abs() <= 1e-9);
        assert!((bottom_right.y + 1.0).abs() <= 1e-9);
        // Aspect scales the vertical range.
        let wide = Camera::new(
            200,
            100,
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(0.0, 0.0, 0.0),
            Deg(90.0),
        )
        .unwrap();
        let top = wide.image_point(100, 0, Vector2::new(0.0, -0.5));
        assert!((top.y - 0.5).abs() <= 1e-9);
    }

    #[test]
    fn vertical_gaze_still_builds_a_frame() {
        let cam = Camera::new(
            64,
            64,
            Point3::new(0.0, 10.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Deg(60.0),
        )
        .unwrap();
        let ray = cam.cast(Point2::new(0.0, 0.0));
        assert!(nearly_equal_vectors(ray.direction, -basis::Y));
    }

    #[test]
    fn rejects_degenerate_configs() {
        assert!(Camera::new(
            64,
            64,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Deg(90.0),
        )
        .is_err());
        assert!(Camera::new(
            64,
            64,
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 0.0),
            Deg(200.0),
        )
        .is_err());
    }
}
