// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Packed pixel formats, tagged with four-character codes.
//!
//! A format decides channel order, bit depth, and whether the stored
//! values carry the sRGB curve. Conversions to and from [`Color`] do the
//! gamma step exactly when the format crosses the linear/sRGB boundary.

use bytemuck::{Pod, Zeroable};
use half::f16;
use num_traits::{NumCast, PrimInt};

use crate::math::{Color, Precision};

/// The supported pixel formats, by fourcc tag.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum PixelFormat {
    Rgb8,
    Bgr8,
    Rgba8,
    Abgr8,
    Bgra8,
    Grey8,
    Y8,
    Y16,
    Y32,
    Yf32,
    Iyu2,
    Rgbf32,
    Rgbh,
    Rgbaf32,
    RgbId,
    Rgb565,
}

impl PixelFormat {
    /// The four-character code identifying this format on the wire.
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            PixelFormat::Rgb8 => *b"RGB8",
            PixelFormat::Bgr8 => *b"BGR8",
            PixelFormat::Rgba8 => *b"RGBA",
            PixelFormat::Abgr8 => *b"ABGR",
            PixelFormat::Bgra8 => *b"BGRA",
            PixelFormat::Grey8 => *b"GREY",
            PixelFormat::Y8 => *b"Y8  ",
            PixelFormat::Y16 => *b"Y16 ",
            PixelFormat::Y32 => *b"Y32 ",
            PixelFormat::Yf32 => *b"YF  ",
            PixelFormat::Iyu2 => *b"IYU2",
            PixelFormat::Rgbf32 => *b"RGBf",
            PixelFormat::Rgbh => *b"RGBh",
            PixelFormat::Rgbaf32 => *b"RGBF",
            PixelFormat::RgbId => *b"RGBI",
            PixelFormat::Rgb565 => *b"RGBP",
        }
    }

    pub fn bits_per_pixel(self) -> usize {
        match self {
            PixelFormat::Grey8 | PixelFormat::Y8 => 8,
            PixelFormat::Y16 | PixelFormat::Rgb565 => 16,
            PixelFormat::Rgb8 | PixelFormat::Bgr8 | PixelFormat::Iyu2 => 24,
            PixelFormat::Rgba8
            | PixelFormat::Abgr8
            | PixelFormat::Bgra8
            | PixelFormat::Y32
            | PixelFormat::Yf32 => 32,
            PixelFormat::Rgbh => 48,
            PixelFormat::Rgbf32 => 96,
            PixelFormat::Rgbaf32 => 128,
            PixelFormat::RgbId => 256,
        }
    }

    /// Whether stored values carry the sRGB transfer curve. Conversion
    /// across this boundary requires a gamma step.
    pub fn is_gamma_encoded(self) -> bool {
        matches!(
            self,
            PixelFormat::Rgb8
                | PixelFormat::Bgr8
                | PixelFormat::Rgba8
                | PixelFormat::Abgr8
                | PixelFormat::Bgra8
                | PixelFormat::Grey8
                | PixelFormat::Iyu2
                | PixelFormat::Rgb565
        )
    }
}

/// A storable pixel, convertible to and from the working [`Color`].
pub trait Pixel: Copy + Default + Send + Sync + 'static {
    const FORMAT: PixelFormat;
    fn from_color(c: Color) -> Self;
    fn to_color(self) -> Color;
}

#[inline]
fn to_byte(v: Precision) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[inline]
fn from_byte(v: u8) -> Precision {
    <Precision as From<_>>::from(v) / 255.0
}

/// Quantizes a nominal value into the full range of an unsigned integer.
fn quantize<T: PrimInt + NumCast>(v: Precision) -> T {
    let max = T::max_value().to_f64().unwrap_or(255.0);
    NumCast::from((v.clamp(0.0, 1.0) * max).round()).unwrap_or_else(T::max_value)
}

fn dequantize<T: PrimInt + NumCast>(v: T) -> Precision {
    let max = T::max_value().to_f64().unwrap_or(255.0);
    v.to_f64().unwrap_or(0.0) / max
}

/// Linear-light luminance (Rec. 709 weights).
fn luminance(c: Color) -> Precision {
    let c = c.to_linear();
    0.2126 * c.red() + 0.7152 * c.green() + 0.0722 * c.blue()
}

macro_rules! rgb8_like {
    ($name:ident, $format:expr, [$($field:ident),+], $from:expr, $to:expr) => {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
        pub struct $name {
            $(pub $field: u8),+
        }
        impl Pixel for $name {
            const FORMAT: PixelFormat = $format;
            fn from_color(c: Color) -> Self {
                let g = c.to_gamma_corrected();
                #[allow(clippy::redundant_closure_call)]
                ($from)(g)
            }
            fn to_color(self) -> Color {
                #[allow(clippy::redundant_closure_call)]
                ($to)(self)
            }
        }
    };
}

rgb8_like!(
    Rgb8,
    PixelFormat::Rgb8,
    [r, g, b],
    |c: Color| Rgb8 {
        r: to_byte(c.red()),
        g: to_byte(c.green()),
        b: to_byte(c.blue()),
    },
    |p: Rgb8| Color::gamma_encoded(from_byte(p.r), from_byte(p.g), from_byte(p.b))
);

rgb8_like!(
    Bgr8,
    PixelFormat::Bgr8,
    [b, g, r],
    |c: Color| Bgr8 {
        b: to_byte(c.blue()),
        g: to_byte(c.green()),
        r: to_byte(c.red()),
    },
    |p: Bgr8| Color::gamma_encoded(from_byte(p.r), from_byte(p.g), from_byte(p.b))
);

rgb8_like!(
    Rgba8,
    PixelFormat::Rgba8,
    [r, g, b, a],
    |c: Color| Rgba8 {
        r: to_byte(c.red()),
        g: to_byte(c.green()),
        b: to_byte(c.blue()),
        a: 255,
    },
    |p: Rgba8| Color::gamma_encoded(from_byte(p.r), from_byte(p.g), from_byte(p.b))
);

rgb8_like!(
    Abgr8,
    PixelFormat::Abgr8,
    [a, b, g, r],
    |c: Color| Abgr8 {
        a: 255,
        b: to_byte(c.blue()),
        g: to_byte(c.green()),
        r: to_byte(c.red()),
    },
    |p: Abgr8| Color::gamma_encoded(from_byte(p.r), from_byte(p.g), from_byte(p.b))
);

rgb8_like!(
    Bgra8,
    PixelFormat::Bgra8,
    [b, g, r, a],
    |c: Color| Bgra8 {
        b: to_byte(c.blue()),
        g: to_byte(c.green()),
        r: to_byte(c.red()),
        a: 255,
    },
    |p: Bgra8| Color::gamma_encoded(from_byte(p.r), from_byte(p.g), from_byte(p.b))
);

/// 8-bit gamma-encoded grey.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct Grey8(pub u8);

impl Pixel for Grey8 {
    const FORMAT: PixelFormat = PixelFormat::Grey8;
    fn from_color(c: Color) -> Self {
        let y = luminance(c);
        let grey = Color::new(y, y, y).to_gamma_corrected();
        Grey8(to_byte(grey.red()))
    }
    fn to_color(self) -> Color {
        let v = from_byte(self.0);
        Color::gamma_encoded(v, v, v)
    }
}

/// 8-bit linear luma.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct Y8(pub u8);

/// 16-bit linear luma.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct Y16(pub u16);

/// 32-bit linear luma.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct Y32(pub u32);

macro_rules! linear_luma {
    ($name:ident, $format:expr, $ty:ty) => {
        impl Pixel for $name {
            const FORMAT: PixelFormat = $format;
            fn from_color(c: Color) -> Self {
                $name(quantize::<$ty>(luminance(c)))
            }
            fn to_color(self) -> Color {
                let v = dequantize::<$ty>(self.0);
                Color::new(v, v, v)
            }
        }
    };
}

linear_luma!(Y8, PixelFormat::Y8, u8);
linear_luma!(Y16, PixelFormat::Y16, u16);
linear_luma!(Y32, PixelFormat::Y32, u32);

/// 32-bit float linear luma.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Yf32(pub f32);

impl Pixel for Yf32 {
    const FORMAT: PixelFormat = PixelFormat::Yf32;
    fn from_color(c: Color) -> Self {
        Yf32(luminance(c) as f32)
    }
    fn to_color(self) -> Color {
        let v = <Precision as From<_>>::from(self.0);
        Color::new(v, v, v)
    }
}

/// Packed U-Y-V, BT.601 from gamma-corrected values.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct Iyu2 {
    pub u: u8,
    pub y: u8,
    pub v: u8,
}

impl Pixel for Iyu2 {
    const FORMAT: PixelFormat = PixelFormat::Iyu2;
    fn from_color(c: Color) -> Self {
        let g = c.to_gamma_corrected();
        let (r, gg, b) = (g.red(), g.green(), g.blue());
        let y = 0.299 * r + 0.587 * gg + 0.114 * b;
        let u = 0.5 * (b - y) / (1.0 - 0.114) + 0.5;
        let v = 0.5 * (r - y) / (1.0 - 0.299) + 0.5;
        Iyu2 {
            u: to_byte(u),
            y: to_byte(y),
            v: to_byte(v),
        }
    }
    fn to_color(self) -> Color {
        let y = from_byte(self.y);
        let u = from_byte(self.u) - 0.5;
        let v = from_byte(self.v) - 0.5;
        let r = y + 2.0 * (1.0 - 0.299) * v;
        let b = y + 2.0 * (1.0 - 0.114) * u;
        let g = (y - 0.299 * r - 0.114 * b) / 0.587;
        Color::gamma_encoded(
            r.clamp(0.0, 1.0),
            g.clamp(0.0, 1.0),
            b.clamp(0.0, 1.0),
        )
    }
}

/// 32-bit float RGB, linear.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Rgbf32 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Pixel for Rgbf32 {
    const FORMAT: PixelFormat = PixelFormat::Rgbf32;
    fn from_color(c: Color) -> Self {
        let c = c.to_linear();
        Rgbf32 {
            r: c.red() as f32,
            g: c.green() as f32,
            b: c.blue() as f32,
        }
    }
    fn to_color(self) -> Color {
        Color::new(
            <Precision as From<_>>::from(self.r),
            <Precision as From<_>>::from(self.g),
            <Precision as From<_>>::from(self.b),
        )
    }
}

/// Half-float RGB, linear; the EXR interchange format.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rgbh {
    pub r: f16,
    pub g: f16,
    pub b: f16,
}

impl Pixel for Rgbh {
    const FORMAT: PixelFormat = PixelFormat::Rgbh;
    fn from_color(c: Color) -> Self {
        let c = c.to_linear();
        Rgbh {
            r: f16::from_f64(c.red()),
            g: f16::from_f64(c.green()),
            b: f16::from_f64(c.blue()),
        }
    }
    fn to_color(self) -> Color {
        Color::new(self.r.to_f64(), self.g.to_f64(), self.b.to_f64())
    }
}

/// 32-bit float RGBA, linear.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Rgbaf32 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Pixel for Rgbaf32 {
    const FORMAT: PixelFormat = PixelFormat::Rgbaf32;
    fn from_color(c: Color) -> Self {
        let c = c.to_linear();
        Rgbaf32 {
            r: c.red() as f32,
            g: c.green() as f32,
            b: c.blue() as f32,
            a: 1.0,
        }
    }
    fn to_color(self) -> Color {
        Color::new(
            <Precision as From<_>>::from(self.r),
            <Precision as From<_>>::from(self.g),
            <Precision as From<_>>::from(self.b),
        )
    }
}

/// Full-precision linear R, G, B, intensity; the HDR intermediate the
/// renderer accumulates into.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct RgbId {
    pub r: Precision,
    pub g: Precision,
    pub b: Precision,
    pub i: Precision,
}

impl Pixel for RgbId {
    const FORMAT: PixelFormat = PixelFormat::RgbId;
    fn from_color(c: Color) -> Self {
        let c = c.to_linear();
        RgbId {
            r: c.red(),
            g: c.green(),
            b: c.blue(),
            i: c.intensity(),
        }
    }
    fn to_color(self) -> Color {
        Color::with_intensity(self.r, self.g, self.b, self.i)
    }
}

/// Packed 5:6:5 RGB, gamma-encoded.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Pod, Zeroable)]
pub struct Rgb565(pub u16);

impl Pixel for Rgb565 {
    const FORMAT: PixelFormat = PixelFormat::Rgb565;
    fn from_color(c: Color) -> Self {
        let g = c.to_gamma_corrected();
        let r = (g.red().clamp(0.0, 1.0) * 31.0).round() as u16;
        let gg = (g.green().clamp(0.0, 1.0) * 63.0).round() as u16;
        let b = (g.blue().clamp(0.0, 1.0) * 31.0).round() as u16;
        Rgb565((r << 11) | (gg << 5) | b)
    }
    fn to_color(self) -> Color {
        let r = <Precision as From<_>>::from((self.0 >> 11) & 0x1f) / 31.0;
        let g = <Precision as From<_>>::from((self.0 >> 5) & 0x3f) / 63.0;
        let b = <Precision as From<_>>::from(self.0 & 0x1f) / 31.0;
        Color::gamma_encoded(r, g, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::colors;

    #[test]
    fn fourcc_tags() {
        assert_eq!(&PixelFormat::Rgb8.fourcc(), b"RGB8");
        assert_eq!(&PixelFormat::Y16.fourcc(), b"Y16 ");
        assert_eq!(&PixelFormat::Yf32.fourcc(), b"YF  ");
        assert_eq!(&PixelFormat::Rgb565.fourcc(), b"RGBP");
    }

    #[test]
    fn gamma_happens_at_the_8bit_boundary() {
        // Mid-grey in linear light is much brighter than 128 after the
        // sRGB curve.
        let px = Rgb8::from_color(Color::new(0.5, 0.5, 0.5));
        assert!(px.r > 180);
        // And the float formats stay linear.
        let f = Rgbf32::from_color(Color::new(0.5, 0.5, 0.5));
        assert!((f.r - 0.5).abs() < 1e-6);
    }

    #[test]
    fn rgb8_round_trip() {
        let c = Color::new(0.25, 0.5, 0.75);
        let round = Rgb8::from_color(c).to_color().to_linear();
        assert!((round.red() - 0.25).abs() < 0.01);
        assert!((round.green() - 0.5).abs() < 0.01);
        assert!((round.blue() - 0.75).abs() < 0.01);
    }

    #[test]
    fn channel_order_differs_not_value() {
        let c = Color::new(1.0, 0.5, 0.0);
        let rgb = Rgb8::from_color(c);
        let bgr = Bgr8::from_color(c);
        assert_eq!(rgb.r, bgr.r);
        assert_eq!(rgb.b, bgr.b);
        assert_eq!(rgb.to_color(), bgr.to_color());
    }

    #[test]
    fn luma_formats() {
        let white = Y16::from_color(colors::WHITE);
        assert_eq!(white.0, u16::MAX);
        let grey = Y8::from_color(Color::new(0.5, 0.5, 0.5));
        assert_eq!(grey.0, 128);
        // Grey8 applies gamma, so the same color lands much higher.
        let g = Grey8::from_color(Color::new(0.5, 0.5, 0.5));
        assert!(g.0 > 180);
    }

    #[test]
    fn hdr_formats_preserve_range() {
        let hot = Color::new(1.0, 1.0, 1.0);
        let h = Rgbh::from_color(hot);
        assert!((h.r.to_f64() - 1.0).abs() < 1e-3);
        let id = RgbId::from_color(Color::with_intensity(0.1, 0.2, 0.3, 0.5));
        assert_eq!(id.i, 0.5);
        assert_eq!(id.to_color(), Color::with_intensity(0.1, 0.2, 0.3, 0.5));
    }

    #[test]
    fn iyu2_round_trip_grey() {
        // Greys have no chroma, so they survive the YUV trip well.
        let c = Color::new(0.5, 0.5, 0.5).to_gamma_corrected();
        let p = Iyu2::from_color(c);
        assert_eq!(p.u, 128);
        assert_eq!(p.v, 128);
        let back = p.to_color().to_linear();
        assert!((back.red() - 0.5).abs() < 0.02);
    }

    #[test]
    fn packed_565() {
        let white = Rgb565::from_color(colors::WHITE);
        assert_eq!(white.0, 0xffff);
        let red = Rgb565::from_color(colors::RED);
        assert_eq!(red.0, 0xf800);
    }
}
