// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Procedural texture functions, each mapping a 2-D surface coordinate to a
//! color through a palette.

use std::sync::Arc;

use cgmath::{InnerSpace as _, Point2, Rad, Vector2};
use log::warn;
use noise::{NoiseFn as _, Perlin};
use once_cell::sync::{Lazy, OnceCell};

use crate::image::{Image, Pixel as _, Rgb8};
use crate::math::{colors, Color, Palette, Precision, TexturePoint};

/// Process-wide parameters of [`Texture::Noise`]: one direction vector per
/// channel plus a shared gain. Initialized once (explicitly via
/// [`initialize_noise`] or implicitly on first use) and immutable for the
/// rest of the process.
#[derive(Clone, Copy, Debug)]
pub struct NoiseParameters {
    pub gain: Precision,
    pub radius: Precision,
    pub theta_r: Rad<Precision>,
    pub theta_g: Rad<Precision>,
    pub theta_b: Rad<Precision>,
}

impl NoiseParameters {
    fn direction(radius: Precision, theta: Rad<Precision>) -> Vector2<Precision> {
        Vector2::new(radius * theta.0.cos(), radius * theta.0.sin())
    }

    fn vec_r(&self) -> Vector2<Precision> {
        Self::direction(self.radius, self.theta_r)
    }
    fn vec_g(&self) -> Vector2<Precision> {
        Self::direction(self.radius, self.theta_g)
    }
    fn vec_b(&self) -> Vector2<Precision> {
        Self::direction(self.radius, self.theta_b)
    }
}

impl Default for NoiseParameters {
    fn default() -> Self {
        let tau = std::f64::consts::TAU;
        NoiseParameters {
            gain: 1.0,
            radius: 1.0,
            theta_r: Rad(tau * 0.5),
            theta_g: Rad(tau * 0.2),
            theta_b: Rad(tau * 0.8),
        }
    }
}

static NOISE_PARAMS: OnceCell<NoiseParameters> = OnceCell::new();

/// Installs the noise parameters for the whole process. Call before the
/// first render; once any noise texture has been evaluated the block is
/// frozen and later calls are ignored (with a warning).
pub fn initialize_noise(params: NoiseParameters) {
    if NOISE_PARAMS.set(params).is_err() {
        warn!("noise parameters already initialized; ignoring new values");
    }
}

fn noise_params() -> &'static NoiseParameters {
    NOISE_PARAMS.get_or_init(NoiseParameters::default)
}

/// Deterministic per-vector noise in `[0, 1)`.
fn channel_noise(v: Vector2<Precision>, dir: Vector2<Precision>, gain: Precision) -> Precision {
    ((v.dot(dir)).sin() * 43_758.545_3 * gain).fract().abs()
}

static PERLIN: Lazy<Perlin> = Lazy::new(Perlin::new);

/// A callable producing a color from a 2-D surface coordinate.
#[derive(Clone, Debug)]
pub enum Texture {
    /// The same color everywhere.
    Solid(Color),
    /// Alternating cells of unit edge. Two colors tile the whole plane;
    /// eight assign a pair per quadrant.
    Checkerboard(Palette),
    /// Disks of the second color centered in each unit cell.
    Dots(Palette),
    /// Thin border strips of the first color around unit cells.
    Grid(Palette),
    /// Diagonal bands from the sum of the fractional coordinates.
    Diagonal(Palette),
    /// A deterministic face over the unit square; exercised by tests.
    HappyFace(Palette),
    /// Concentric contour bands over the unit square; exercised by tests.
    Contours(Palette),
    /// Per-channel pseudo-random noise driven by [`NoiseParameters`].
    Noise,
    /// Perlin gradient noise, scaled.
    Perlin { scale: Precision },
    /// Nearest-pixel lookup into an image, with wrapping coordinates.
    Image(Arc<Image<Rgb8>>),
    /// Any function of the surface coordinate.
    Function(fn(TexturePoint) -> Color),
}

impl Texture {
    /// Evaluates the texture at a surface coordinate.
    pub fn at(&self, uv: TexturePoint) -> Color {
        match self {
            Texture::Solid(c) => *c,
            Texture::Checkerboard(pal) => checkerboard(uv, pal),
            Texture::Dots(pal) => dots(uv, pal),
            Texture::Grid(pal) => grid(uv, pal),
            Texture::Diagonal(pal) => diagonal(uv, pal),
            Texture::HappyFace(pal) => happy_face(uv, pal),
            Texture::Contours(pal) => contours(uv, pal),
            Texture::Noise => pseudo_random_noise(uv),
            Texture::Perlin { scale } => {
                let v = PERLIN.get([uv.x * scale, uv.y * scale]);
                let v = (v + 1.0) / 2.0;
                Color::new(v, v, v)
            }
            Texture::Image(img) => {
                let wrap = |v: Precision| -> Precision {
                    let f = v.fract();
                    if f < 0.0 {
                        f + 1.0
                    } else {
                        f
                    }
                };
                let x = (wrap(uv.x) * img.width() as Precision) as usize;
                let y = (wrap(uv.y) * img.height() as Precision) as usize;
                img.pixel(x.min(img.width() - 1), y.min(img.height() - 1))
                    .to_color()
            }
            Texture::Function(f) => f(uv),
        }
    }
}

fn pair(pal: &Palette, quadrant: usize) -> (Color, Color) {
    if pal.len() >= 8 {
        (pal[quadrant * 2], pal[quadrant * 2 + 1])
    } else if pal.len() >= 2 {
        // Two colors tile every quadrant; the quadrant conditions below
        // keep the cells alternating across the axes.
        (pal[0], pal[1])
    } else {
        (colors::MAGENTA, colors::CYAN)
    }
}

/// Checkerboard with half-cell offsets and quadrant-aware handling of
/// negative coordinates; `fmod` alone would mirror the pattern at zero.
fn checkerboard(p: TexturePoint, pal: &Palette) -> Color {
    let h = 0.5;
    let u = p.x % 1.0;
    let v = p.y % 1.0;
    let u_positive = u >= 0.0;
    let v_positive = v >= 0.0;

    if u_positive && v_positive {
        let (a, b) = pair(pal, 0);
        if (u < h && v < h) || (u >= h && v >= h) {
            a
        } else {
            b
        }
    } else if !u_positive && v_positive {
        let (a, b) = pair(pal, 1);
        if (u > -h && v < h) || (u <= -h && v >= h) {
            b
        } else {
            a
        }
    } else if u_positive && !v_positive {
        let (a, b) = pair(pal, 3);
        if (u < h && v > -h) || (u >= h && v <= -h) {
            b
        } else {
            a
        }
    } else {
        let (a, b) = pair(pal, 2);
        if (u > -h && v > -h) || (u <= -h && v <= -h) {
            a
        } else {
            b
        }
    }
}

/// Radial distance to the cell center under a threshold.
fn dots(p: TexturePoint, pal: &Palette) -> Color {
    let u = (p.x % 1.0).abs();
    let v = (p.y % 1.0).abs();
    let h = 0.5;
    let r = (h - u).hypot(h - v);
    if r < 0.3 {
        pal.get(1).copied().unwrap_or(colors::MAGENTA)
    } else {
        pal.get(0).copied().unwrap_or(colors::MAGENTA)
    }
}

/// Border strips of fixed relative width.
fn grid(p: TexturePoint, pal: &Palette) -> Color {
    let u = (p.x % 1.0).abs();
    let v = (p.y % 1.0).abs();
    let l = 1.0 / 32.0; // line width
    let a = 1.0 - l;
    if l < u && u <= a && l < v && v <= a {
        pal.get(1).copied().unwrap_or(colors::MAGENTA)
    } else {
        pal.get(0).copied().unwrap_or(colors::MAGENTA)
    }
}

/// Sum-of-fractional-parts banding.
fn diagonal(p: TexturePoint, pal: &Palette) -> Color {
    let sum = p.x % 1.0 + p.y % 1.0;
    // Bands of width 1/2 over the sum, which ranges across (-2, 2).
    let band = ((sum + 2.0) / 0.5) as usize;
    let c = if band % 2 == 0 { 0 } else { 1 };
    pal.get(c).copied().unwrap_or(colors::MAGENTA)
}

/// Two eyes and a half-disc mouth over the unit square.
fn happy_face(p: TexturePoint, pal: &Palette) -> Color {
    let ink = pal.get(0).copied().unwrap_or(colors::BLACK);
    let paper = pal.get(1).copied().unwrap_or(colors::YELLOW);
    let uv = Point2::new((p.x % 1.0).abs(), (p.y % 1.0).abs());
    let eye_radius = 1.0 / 9.0;
    let mouth_radius = 2.0 / 9.0;
    let left_eye = Point2::new(3.0 / 9.0, 3.0 / 9.0);
    let right_eye = Point2::new(6.0 / 9.0, 3.0 / 9.0);
    let mouth_center = Point2::new(0.5, 0.5);
    if (uv - left_eye).magnitude() < eye_radius || (uv - right_eye).magnitude() < eye_radius {
        return ink;
    }
    if (uv - mouth_center).magnitude() < mouth_radius {
        // Only the lower half of the disc is mouth.
        let down = Vector2::new(0.0, -1.0);
        if down.dot(uv - mouth_center) < 0.0 {
            return ink;
        }
    }
    paper
}

/// Bands of the ratio of distances to two foci, quantized into the palette.
fn contours(p: TexturePoint, pal: &Palette) -> Color {
    let a = Point2::new(0.25, 0.5);
    let b = Point2::new(0.75, 0.5);
    let delta = 0.125;
    let ratio = (p - a).magnitude() / (p - b).magnitude();
    for i in (1..8).rev() {
        let level = i as Precision * 0.125;
        if (level - delta) <= ratio && ratio < (level + delta) {
            return pal.get(i).copied().unwrap_or(colors::MAGENTA);
        }
    }
    pal.get(0).copied().unwrap_or(colors::MAGENTA)
}

/// Deterministic per-vector noise with one tunable direction per channel.
fn pseudo_random_noise(p: TexturePoint) -> Color {
    let params = noise_params();
    let v = Vector2::new(p.x, p.y);
    Color::new(
        channel_noise(v, params.vec_r(), params.gain),
        channel_noise(v, params.vec_g(), params.gain),
        channel_noise(v, params.vec_b(), params.gain),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two() -> Palette {
        vec![colors::WHITE, colors::BLACK]
    }

    #[test]
    fn checkerboard_alternates() {
        let t = Texture::Checkerboard(two());
        assert_eq!(t.at(Point2::new(0.25, 0.25)), colors::WHITE);
        assert_eq!(t.at(Point2::new(0.75, 0.25)), colors::BLACK);
        assert_eq!(t.at(Point2::new(0.75, 0.75)), colors::WHITE);
        // The pattern has period 1 with half-cell alternation.
        assert_eq!(t.at(Point2::new(1.25, 0.25)), colors::WHITE);
        assert_eq!(t.at(Point2::new(1.75, 0.25)), colors::BLACK);
    }

    #[test]
    fn checkerboard_continues_across_zero() {
        let t = Texture::Checkerboard(two());
        // Crossing u = 0 at small v must flip the cell, not mirror it.
        assert_eq!(t.at(Point2::new(0.25, 0.25)), colors::WHITE);
        assert_eq!(t.at(Point2::new(-0.25, 0.25)), colors::BLACK);
        assert_eq!(t.at(Point2::new(-0.25, -0.25)), colors::WHITE);
        assert_eq!(t.at(Point2::new(0.25, -0.25)), colors::BLACK);
    }

    #[test]
    fn dots_hit_cell_centers() {
        let t = Texture::Dots(two());
        assert_eq!(t.at(Point2::new(0.5, 0.5)), colors::BLACK);
        assert_eq!(t.at(Point2::new(0.05, 0.05)), colors::WHITE);
    }

    #[test]
    fn grid_draws_borders() {
        let t = Texture::Grid(two());
        assert_eq!(t.at(Point2::new(0.5, 0.5)), colors::BLACK);
        assert_eq!(t.at(Point2::new(0.01, 0.5)), colors::WHITE);
    }

    #[test]
    fn happy_face_features() {
        let t = Texture::HappyFace(vec![colors::BLACK, colors::YELLOW]);
        // Left eye.
        assert_eq!(t.at(Point2::new(3.0 / 9.0, 3.0 / 9.0)), colors::BLACK);
        // Forehead.
        assert_eq!(t.at(Point2::new(0.5, 0.1)), colors::YELLOW);
        // Mouth is the lower half of its disc only.
        assert_eq!(t.at(Point2::new(0.5, 0.6)), colors::BLACK);
        assert_eq!(t.at(Point2::new(0.5, 0.45)), colors::YELLOW);
    }

    #[test]
    fn contours_band_zero_far_away() {
        let pal: Palette = (0..8)
            .map(|i| Color::new(i as Precision / 8.0, 0.0, 0.0))
            .collect();
        let t = Texture::Contours(pal.clone());
        // Close to focus `a` the ratio is tiny: band 1.
        assert_eq!(t.at(Point2::new(0.26, 0.5)), pal[1]);
    }

    #[test]
    fn noise_is_deterministic() {
        let t = Texture::Noise;
        let a = t.at(Point2::new(0.3, 0.7));
        let b = t.at(Point2::new(0.3, 0.7));
        assert_eq!(a, b);
        for c in [a.red(), a.green(), a.blue()].iter() {
            assert!((0.0..1.0).contains(c));
        }
    }

    #[test]
    fn perlin_is_bounded() {
        let t = Texture::Perlin { scale: 4.0 };
        let c = t.at(Point2::new(0.3, 0.9));
        assert!((0.0..=1.0).contains(&c.red()));
    }

    #[test]
    fn image_lookup_wraps() {
        use crate::image::Pixel as _;
        let mut img = Image::<Rgb8>::new(2, 2).unwrap();
        img.set_pixel(0, 0, Rgb8::from_color(colors::RED));
        img.set_pixel(1, 0, Rgb8::from_color(colors::GREEN));
        img.set_pixel(0, 1, Rgb8::from_color(colors::BLUE));
        img.set_pixel(1, 1, Rgb8::from_color(colors::WHITE));
        let t = Texture::Image(Arc::new(img));
        assert_eq!(t.at(Point2::new(0.1, 0.1)), colors::RED);
        assert_eq!(t.at(Point2::new(0.6, 0.1)), colors::GREEN);
        // Coordinates outside the unit square wrap around.
        assert_eq!(t.at(Point2::new(2.1, 1.1)), colors::RED);
        assert_eq!(t.at(Point2::new(-0.4, 0.1)), colors::GREEN);
    }
}
