// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Color data types. This module is private but reexported by its parent.
//!
//! A [`Color`] is four `Precision` channels (red, green, blue, intensity)
//! plus an [`Encoding`] tag recording whether the values are linear or have
//! the sRGB transfer curve applied. Everything the tracer computes with is
//! linear; gamma happens at the 8-bit image boundary.

use std::ops::{Add, AddAssign, Mul};

use cgmath::Point2;
use rand::Rng as _;

use crate::error::{Error, Result};
use crate::math::{lerp, Precision};

/// Whether channel values are linear or sRGB-encoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Encoding {
    /// Values proportional to radiance; safe to add and scale.
    Linear,
    /// Values passed through the sRGB transfer curve; display-ready.
    GammaCorrected,
}

/// sRGB transfer curve, as used when shipping a color to an 8-bit surface.
///
/// Linear below `0.0031308`, `1.055 * x^(1/2.4) - 0.055` above.
#[inline]
pub fn apply_gamma(value: Precision) -> Precision {
    if value <= 0.003_130_8 {
        12.92 * value
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

/// Inverse of [`apply_gamma`], as used when loading 8-bit image data.
#[inline]
pub fn remove_gamma(value: Precision) -> Precision {
    if value <= 0.040_45 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// A four-channel color sample.
#[derive(Clone, Copy, Debug)]
pub struct Color {
    channels: [Precision; 4],
    encoding: Encoding,
}

impl Color {
    /// Colors which differ by no more than this per channel compare equal.
    pub const EQUALITY_LIMIT: Precision = 1e-6;

    /// Constructs a linear color with unit intensity.
    #[inline]
    pub const fn new(r: Precision, g: Precision, b: Precision) -> Self {
        Self {
            channels: [r, g, b, 1.0],
            encoding: Encoding::Linear,
        }
    }

    /// Constructs a linear color including the intensity channel.
    #[inline]
    pub const fn with_intensity(r: Precision, g: Precision, b: Precision, i: Precision) -> Self {
        Self {
            channels: [r, g, b, i],
            encoding: Encoding::Linear,
        }
    }

    /// Constructs a gamma-encoded color, e.g. from 8-bit image data that
    /// has not been linearized yet.
    #[inline]
    pub const fn gamma_encoded(r: Precision, g: Precision, b: Precision) -> Self {
        Self {
            channels: [r, g, b, 1.0],
            encoding: Encoding::GammaCorrected,
        }
    }

    #[inline]
    pub const fn red(&self) -> Precision {
        self.channels[0]
    }
    #[inline]
    pub const fn green(&self) -> Precision {
        self.channels[1]
    }
    #[inline]
    pub const fn blue(&self) -> Precision {
        self.channels[2]
    }
    #[inline]
    pub const fn intensity(&self) -> Precision {
        self.channels[3]
    }
    #[inline]
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Converts to linear encoding; a no-op when already linear.
    pub fn to_linear(self) -> Self {
        match self.encoding {
            Encoding::Linear => self,
            Encoding::GammaCorrected => Self {
                channels: [
                    remove_gamma(self.channels[0]),
                    remove_gamma(self.channels[1]),
                    remove_gamma(self.channels[2]),
                    self.channels[3],
                ],
                encoding: Encoding::Linear,
            },
        }
    }

    /// Converts to the sRGB curve; a no-op when already gamma-encoded.
    ///
    /// The intensity channel is a weight, not a radiance, and is never
    /// gamma-encoded.
    pub fn to_gamma_corrected(self) -> Self {
        match self.encoding {
            Encoding::GammaCorrected => self,
            Encoding::Linear => Self {
                channels: [
                    apply_gamma(self.channels[0].clamp(0.0, 1.0)),
                    apply_gamma(self.channels[1].clamp(0.0, 1.0)),
                    apply_gamma(self.channels[2].clamp(0.0, 1.0)),
                    self.channels[3],
                ],
                encoding: Encoding::GammaCorrected,
            },
        }
    }

    /// Scales every channel, clamping the result into `[0, 1]`.
    pub fn scale(&mut self, a: Precision) {
        for c in self.channels.iter_mut() {
            *c = (*c * a).clamp(0.0, 1.0);
        }
    }

    /// Clamps every channel into `[0, 1]`.
    pub fn clamp(&mut self) {
        for c in self.channels.iter_mut() {
            *c = c.clamp(0.0, 1.0);
        }
    }

    /// Applies `f` to each channel in place.
    pub fn per_channel<F: FnMut(Precision) -> Precision>(&mut self, mut f: F) {
        for c in self.channels.iter_mut() {
            *c = f(*c);
        }
    }

    /// Equal-weight average of samples, performed in linear space so dark
    /// samples are not over-weighted.
    pub fn blend_samples(samples: &[Color]) -> Color {
        if samples.is_empty() {
            return colors::BLACK;
        }
        let mut acc = [0.0; 4];
        for s in samples {
            let s = s.to_linear();
            for (a, c) in acc.iter_mut().zip(s.channels.iter()) {
                *a += c;
            }
        }
        let n = samples.len() as Precision;
        Color {
            channels: [acc[0] / n, acc[1] / n, acc[2] / n, acc[3] / n],
            encoding: Encoding::Linear,
        }
    }

    /// Sums samples in linear space, saturating each channel at 1. Used
    /// where light sources genuinely add (across lights), as opposed to
    /// averaging (across samples of one light).
    pub fn accumulate_samples(samples: &[Color]) -> Color {
        let mut acc = colors::BLACK;
        for s in samples {
            acc += *s;
        }
        acc
    }

    /// Maps `d` in roughly `[-1, 1]` to a blue-through-red spectrum, for
    /// debug visualization of signed fields.
    pub fn jet(d: Precision) -> Color {
        let x = ((d + 1.0) / 2.0).clamp(0.0, 1.0);
        let r = (1.5 - (4.0 * x - 3.0).abs()).clamp(0.0, 1.0);
        let g = (1.5 - (4.0 * x - 2.0).abs()).clamp(0.0, 1.0);
        let b = (1.5 - (4.0 * x - 1.0).abs()).clamp(0.0, 1.0);
        Color::new(r, g, b)
    }

    /// Maps `d` in `[min, max]` to a grey. Out-of-range input returns
    /// magenta so mistakes are visible in the output image.
    pub fn greyscale(d: Precision, min: Precision, max: Precision) -> Color {
        if d < min || d > max || min >= max {
            return colors::MAGENTA;
        }
        let v = (d - min) / (max - min);
        Color::new(v, v, v)
    }

    /// A uniformly random linear color; handy for debug palettes.
    pub fn random() -> Color {
        let mut rng = rand::thread_rng();
        Color::new(rng.gen(), rng.gen(), rng.gen())
    }
}

impl Default for Color {
    fn default() -> Self {
        colors::BLACK
    }
}

/// Tolerance-based comparison using [`Color::EQUALITY_LIMIT`]; operands are
/// linearized first so encodings do not leak into equality.
impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        let a = self.to_linear();
        let b = other.to_linear();
        a.channels
            .iter()
            .zip(b.channels.iter())
            .all(|(x, y)| (x - y).abs() <= Color::EQUALITY_LIMIT)
    }
}

/// Componentwise saturating accumulation in linear space.
impl AddAssign for Color {
    fn add_assign(&mut self, other: Self) {
        let a = self.to_linear();
        let b = other.to_linear();
        self.encoding = Encoding::Linear;
        for (i, c) in self.channels.iter_mut().enumerate() {
            *c = (a.channels[i] + b.channels[i]).clamp(0.0, 1.0);
        }
    }
}

impl Add for Color {
    type Output = Color;
    fn add(mut self, other: Self) -> Color {
        self += other;
        self
    }
}

/// Pairwise color mixing, for when a light and a surface select the output
/// color together.
impl Mul<Color> for Color {
    type Output = Color;
    fn mul(self, other: Color) -> Color {
        let a = self.to_linear();
        let b = other.to_linear();
        Color {
            channels: [
                a.channels[0] * b.channels[0],
                a.channels[1] * b.channels[1],
                a.channels[2] * b.channels[2],
                a.channels[3] * b.channels[3],
            ],
            encoding: Encoding::Linear,
        }
    }
}

/// Scales all channels together, saturating into `[0, 1]`.
impl Mul<Precision> for Color {
    type Output = Color;
    fn mul(self, a: Precision) -> Color {
        let mut c = self.to_linear();
        c.scale(a);
        c
    }
}

impl Mul<Color> for Precision {
    type Output = Color;
    fn mul(self, c: Color) -> Color {
        c * self
    }
}

/// 50% blend; identical to `interpolate(x, y, 0.5)`.
pub fn blend(x: Color, y: Color) -> Color {
    interpolate(x, y, 0.5)
}

/// Gamma-correct interpolation `x * (1 - a) + y * a`: both operands are
/// converted to linear, mixed there, and the result stays linear.
pub fn interpolate(x: Color, y: Color, a: Precision) -> Color {
    let x = x.to_linear();
    let y = y.to_linear();
    Color {
        channels: [
            lerp(x.channels[0], y.channels[0], a),
            lerp(x.channels[1], y.channels[1], a),
            lerp(x.channels[2], y.channels[2], a),
            lerp(x.channels[3], y.channels[3], a),
        ],
        encoding: Encoding::Linear,
    }
}

/// Converts a wavelength in nanometers (380 to 780) to a tristimulus color
/// using simplified Gaussian responses at the LMS peaks.
pub fn wavelength_to_color(lambda_nm: Precision) -> Result<Color> {
    if !(380.0..=780.0).contains(&lambda_nm) {
        return Err(Error::Domain("wavelength outside the visible band"));
    }
    let response = |peak: Precision, width: Precision| -> Precision {
        let d = (lambda_nm - peak) / width;
        (-0.5 * d * d).exp()
    };
    // Peak sensitivities of the long/medium/short cones.
    let l = response(564.0, 45.0);
    let m = response(534.0, 40.0);
    let s = response(420.0, 25.0);
    Ok(Color::new(
        (1.91 * l - 1.11 * m - 0.02 * s).clamp(0.0, 1.0),
        (-0.37 * l + 1.47 * m - 0.05 * s).clamp(0.0, 1.0),
        s.clamp(0.0, 1.0),
    ))
}

/// A palette of colors given by name.
pub mod colors {
    use super::Color;

    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const GREY: Color = Color::new(0.735_360_62, 0.735_360_62, 0.735_360_62);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    // primaries
    pub const RED: Color = Color::new(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::new(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::new(0.0, 0.0, 1.0);
    // secondaries
    pub const YELLOW: Color = Color::new(1.0, 1.0, 0.0);
    pub const MAGENTA: Color = Color::new(1.0, 0.0, 1.0);
    pub const CYAN: Color = Color::new(0.0, 1.0, 1.0);
    // nice others
    pub const ORANGE: Color = Color::new(1.0, 0.84, 0.0);
    pub const BROWN: Color = Color::new(0.588_235_294, 0.294_117_647, 0.0);
    pub const FOREST_GREEN: Color = Color::new(0.133_333_333, 0.545_098_039, 0.133_333_333);
    pub const SILVER: Color = Color::new(0.752_941_176, 0.752_941_176, 0.752_941_176);
    pub const CORNFLOWER_BLUE: Color = Color::new(0.258_824, 0.258_824, 0.435_294);
    pub const DARK_SLATE_GRAY: Color = Color::new(0.184_314, 0.309_804, 0.309_804);
    pub const LIGHT_SKY_BLUE: Color = Color::new(135.0 / 255.0, 206.0 / 255.0, 235.0 / 255.0);
    pub const MEDIUM_GREY: Color = Color::new(0.5, 0.5, 0.5);
    pub const NAVY: Color = Color::new(0.137_255, 0.137_255, 0.556_863);
    // metallic colors
    pub const ALUMINUM: Color = Color::new(0.91, 0.91, 0.91);
    pub const BRONZE: Color = Color::new(0.47, 0.34, 0.18);
    pub const CHROME: Color = Color::new(0.8, 0.93, 1.0);
    pub const COPPER: Color = Color::new(0.778_431_5, 0.486_813_75, 0.133_627_5);
    pub const STAINLESS: Color = Color::new(0.97, 1.0, 1.0);
    pub const STEEL: Color = Color::new(0.62, 0.62, 0.51);
    pub const TIN: Color = Color::new(0.72, 0.71, 0.61);
}

/// A fixed list of colors used by the patterned textures.
pub type Palette = Vec<Color>;

/// 2-D surface coordinate handed to texture functions.
pub type TexturePoint = Point2<Precision>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_round_trip() {
        let mut x = 0.0;
        while x <= 1.0 {
            let y = apply_gamma(remove_gamma(x));
            assert!((x - y).abs() < 1e-5, "round trip failed at {}", x);
            x += 1.0 / 256.0;
        }
    }

    #[test]
    fn gamma_curve_knee() {
        // Below the knee the curve is linear.
        assert!((apply_gamma(0.001) - 0.01292).abs() < 1e-9);
        assert!((remove_gamma(0.01292) - 0.001).abs() < 1e-9);
    }

    #[test]
    fn interpolate_endpoints() {
        let a = Color::new(0.25, 0.5, 0.75);
        let b = Color::new(0.75, 0.25, 0.0);
        assert_eq!(interpolate(a, b, 0.0), a);
        assert_eq!(interpolate(a, b, 1.0), b);
        assert_eq!(interpolate(a, a, 0.37), a);
        assert_eq!(blend(a, b), interpolate(a, b, 0.5));
    }

    #[test]
    fn accumulate_saturates() {
        let mut c = Color::new(0.9, 0.9, 0.9);
        c += Color::new(0.9, 0.9, 0.9);
        assert_eq!(c, colors::WHITE);
    }

    #[test]
    fn blend_averages_in_linear() {
        let avg = Color::blend_samples(&[colors::WHITE, colors::BLACK]);
        assert_eq!(avg, Color::with_intensity(0.5, 0.5, 0.5, 1.0));
    }

    #[test]
    fn pairwise_mixing() {
        let light = Color::new(1.0, 0.5, 0.0);
        let surface = Color::new(0.5, 0.5, 0.5);
        assert_eq!(light * surface, Color::new(0.5, 0.25, 0.0));
    }

    #[test]
    fn encoding_round_trip() {
        let c = Color::new(0.2, 0.4, 0.8);
        let encoded = c.to_gamma_corrected();
        assert_eq!(encoded.encoding(), Encoding::GammaCorrected);
        assert_eq!(encoded.to_linear(), c);
    }

    #[test]
    fn wavelengths() {
        // Long wavelengths are red-dominated, short are blue-dominated.
        let red = wavelength_to_color(650.0).unwrap();
        assert!(red.red() > red.blue());
        let blue = wavelength_to_color(420.0).unwrap();
        assert!(blue.blue() > blue.red());
        assert!(wavelength_to_color(900.0).is_err());
    }

    #[test]
    fn greyscale_out_of_range_is_loud() {
        assert_eq!(Color::greyscale(2.0, 0.0, 1.0), colors::MAGENTA);
        assert_eq!(Color::greyscale(0.5, 0.0, 1.0), colors::MEDIUM_GREY);
    }
}
