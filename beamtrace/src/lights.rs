// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Light sources. Each exposes how many samples it wants, a ray from a
//! surface point toward one sample, and its color at a point.
//!
//! The incident ray's direction is *not* normalized: its length is the
//! distance to the light sample, so occlusion tests can compare a blocking
//! hit's distance against it directly.

use cgmath::{InnerSpace as _, Rad};
use rand::Rng as _;
use rand_xoshiro::rand_core::SeedableRng as _;
use rand_xoshiro::Xoshiro256Plus;

use crate::geometry::{try_normalize, Point3, Ray, Vector3};
use crate::math::{colors, Color, Precision};

/// Stand-in distance for sources at infinity.
const BEAM_DISTANCE: Precision = 1.0e6;

/// A light source.
#[derive(Clone, Debug)]
pub enum Light {
    /// A point source obeying the inverse square law.
    Speck {
        position: Point3,
        color: Color,
        intensity: Precision,
    },
    /// A directional source at infinity with constant irradiance.
    Beam {
        direction: Vector3,
        color: Color,
        intensity: Precision,
    },
    /// A point source windowed to a cone.
    Spot {
        position: Point3,
        direction: Vector3,
        half_angle: Rad<Precision>,
        color: Color,
        intensity: Precision,
    },
    /// A spherical area source, sampled.
    Bulb {
        position: Point3,
        radius: Precision,
        samples: usize,
        color: Color,
        intensity: Precision,
    },
}

impl Light {
    /// How many shadow samples this light wants per shading point.
    pub fn number_of_samples(&self) -> usize {
        match self {
            Light::Bulb { samples, .. } => (*samples).max(1),
            _ => 1,
        }
    }

    /// A ray from `world_point` toward sample `sample_index` of this
    /// light. The direction's magnitude is the distance to the sample.
    pub fn incident(&self, world_point: Point3, sample_index: usize) -> Ray {
        match self {
            Light::Speck { position, .. } | Light::Spot { position, .. } => {
                Ray::new(world_point, position - world_point)
            }
            Light::Beam { direction, .. } => {
                let toward = match try_normalize(-*direction) {
                    Ok(d) => d,
                    Err(_) => Vector3::new(0.0, 0.0, 1.0),
                };
                Ray::new(world_point, toward * BEAM_DISTANCE)
            }
            Light::Bulb {
                position, radius, ..
            } => {
                // Deterministic per-index jitter, so renders and their
                // tests are reproducible.
                let mut rng = Xoshiro256Plus::seed_from_u64(sample_index as u64);
                let offset = Vector3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                ) * *radius;
                Ray::new(world_point, position + offset - world_point)
            }
        }
    }

    /// The light's color as received at `world_point`.
    pub fn color_at(&self, world_point: Point3) -> Color {
        match self {
            Light::Speck {
                position,
                color,
                intensity,
            } => {
                let d2 = (position - world_point).magnitude2();
                if d2 <= 0.0 {
                    return *color;
                }
                *color * (intensity / d2)
            }
            Light::Beam {
                color, intensity, ..
            } => *color * *intensity,
            Light::Spot {
                position,
                direction,
                half_angle,
                color,
                intensity,
            } => {
                let to_point = world_point - *position;
                let d2 = to_point.magnitude2();
                if d2 <= 0.0 {
                    return *color;
                }
                let axis = match try_normalize(*direction) {
                    Ok(a) => a,
                    Err(_) => return colors::BLACK,
                };
                let cos_angle = (to_point / d2.sqrt()).dot(axis);
                let cos_edge = half_angle.0.cos();
                if cos_angle <= cos_edge {
                    return colors::BLACK;
                }
                // Smooth window from the cone edge to its axis.
                let window = ((cos_angle - cos_edge) / (1.0 - cos_edge)).clamp(0.0, 1.0);
                *color * (intensity * window / d2)
            }
            Light::Bulb {
                position,
                color,
                intensity,
                ..
            } => {
                let d2 = (position - world_point).magnitude2();
                if d2 <= 0.0 {
                    return *color;
                }
                *color * (intensity / d2)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{basis, magnitude};
    use std::f64::consts::PI;

    #[test]
    fn speck_inverse_square() {
        let l = Light::Speck {
            position: Point3::new(0.0, 0.0, 10.0),
            color: colors::WHITE,
            intensity: 100.0,
        };
        let near = l.color_at(Point3::new(0.0, 0.0, 5.0));
        let far = l.color_at(Point3::new(0.0, 0.0, -10.0));
        // 100/25 saturates; 100/400 = 0.25.
        assert_eq!(near, colors::WHITE);
        assert!((far.red() - 0.25).abs() <= 1e-9);
        let ray = l.incident(Point3::new(0.0, 0.0, 5.0), 0);
        assert!((magnitude(ray.direction) - 5.0).abs() <= 1e-9);
    }

    #[test]
    fn beam_is_uniform() {
        let l = Light::Beam {
            direction: -basis::Z,
            color: colors::WHITE,
            intensity: 1.0,
        };
        assert_eq!(l.color_at(Point3::new(0.0, 0.0, 0.0)), colors::WHITE);
        assert_eq!(l.color_at(Point3::new(100.0, -5.0, 3.0)), colors::WHITE);
        let ray = l.incident(Point3::new(0.0, 0.0, 0.0), 0);
        // Toward the light, far away.
        assert!(ray.direction.z > 0.0);
        assert!(magnitude(ray.direction) >= BEAM_DISTANCE * 0.99);
    }

    #[test]
    fn spot_cone_window() {
        let l = Light::Spot {
            position: Point3::new(0.0, 0.0, 10.0),
            direction: -basis::Z,
            half_angle: Rad(PI / 8.0),
            color: colors::WHITE,
            intensity: 100.0,
        };
        // On axis: lit.
        let on_axis = l.color_at(Point3::new(0.0, 0.0, 0.0));
        assert!(on_axis.red() > 0.0);
        // Outside the cone: black.
        let outside = l.color_at(Point3::new(50.0, 0.0, 0.0));
        assert_eq!(outside, colors::BLACK);
    }

    #[test]
    fn bulb_samples_are_deterministic_and_spread() {
        let l = Light::Bulb {
            position: Point3::new(0.0, 10.0, 0.0),
            radius: 1.0,
            samples: 8,
            color: colors::WHITE,
            intensity: 100.0,
        };
        assert_eq!(l.number_of_samples(), 8);
        let p = Point3::new(0.0, 0.0, 0.0);
        let a = l.incident(p, 3);
        let b = l.incident(p, 3);
        assert_eq!(a.direction, b.direction);
        let c = l.incident(p, 4);
        assert_ne!(a.direction, c.direction);
    }
}
