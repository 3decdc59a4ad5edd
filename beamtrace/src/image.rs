// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! A row-major container of packed pixels, spatial filters over it, and
//! the file formats it can be saved to and loaded from.

use itertools::Itertools as _;

use crate::error::{Error, Result};
use crate::geometry::Point2;
use crate::math::{Color, Precision};

mod io;
mod pixel;

pub use io::{load_exr, load_pfm, load_pgm16, load_pgm8, load_ppm, load_tga};
pub use pixel::{
    Abgr8, Bgr8, Bgra8, Grey8, Iyu2, Pixel, PixelFormat, Rgb565, Rgb8, RgbId, Rgba8, Rgbaf32,
    Rgbf32, Rgbh, Y16, Y32, Y8, Yf32,
};

/// Mask value meaning "adaptive antialiasing disabled"; no Sobel response
/// reaches it.
pub const AAA_MASK_DISABLED: u8 = u8::MAX;

/// A rectangular, row-major image of packed pixels.
#[derive(Clone, Debug)]
pub struct Image<P: Pixel> {
    width: usize,
    height: usize,
    pixels: Vec<P>,
}

impl<P: Pixel> Image<P> {
    /// An image of default-valued pixels; both dimensions must be nonzero.
    pub fn new(width: usize, height: usize) -> Result<Image<P>> {
        if width == 0 || height == 0 {
            return Err(Error::DimensionMismatch("image must be at least 1x1"));
        }
        Ok(Image {
            width,
            height,
            pixels: vec![P::default(); width * height],
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
    pub fn format(&self) -> PixelFormat {
        P::FORMAT
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> P {
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, p: P) {
        self.pixels[y * self.width + x] = p;
    }

    /// Checked access, for callers holding untrusted coordinates.
    pub fn get(&self, x: usize, y: usize) -> Result<P> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds {
                row: y,
                col: x,
                rows: self.height,
                cols: self.width,
            });
        }
        Ok(self.pixel(x, y))
    }

    /// One row of pixels.
    pub fn row(&self, y: usize) -> &[P] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    /// Visits every pixel with its coordinates.
    pub fn for_each_pixel<F: FnMut(usize, usize, &mut P)>(&mut self, mut f: F) {
        for y in 0..self.height {
            for x in 0..self.width {
                f(x, y, &mut self.pixels[y * self.width + x]);
            }
        }
    }

    /// Fills the image from a callable over normalized image coordinates
    /// (pixel centers mapped into the unit square).
    pub fn generate<F: FnMut(Point2) -> Color>(&mut self, mut f: F) {
        let w = self.width as Precision;
        let h = self.height as Precision;
        for (y, x) in (0..self.height).cartesian_product(0..self.width) {
            let p = Point2::new(
                (x as Precision + 0.5) / w,
                (y as Precision + 0.5) / h,
            );
            self.pixels[y * self.width + x] = P::from_color(f(p));
        }
    }

    /// Converts to another pixel format, gamma-correcting when crossing
    /// the linear/sRGB boundary.
    pub fn convert<Q: Pixel>(&self) -> Result<Image<Q>> {
        let mut out = Image::<Q>::new(self.width, self.height)?;
        for (dst, src) in out.pixels.iter_mut().zip(self.pixels.iter()) {
            *dst = Q::from_color(src.to_color());
        }
        Ok(out)
    }
}

/// Sobel gradient magnitude of the luminance, as an 8-bit mask. Pixels
/// where neighboring colors change sharply score high; the renderer
/// re-traces those with more samples.
pub fn sobel_mask(src: &Image<RgbId>) -> Result<Image<Grey8>> {
    let mut mask = Image::<Grey8>::new(src.width, src.height)?;
    let luma = |x: usize, y: usize| -> Precision {
        let p = src.pixel(x, y);
        0.2126 * p.r + 0.7152 * p.g + 0.0722 * p.b
    };
    for y in 0..src.height {
        for x in 0..src.width {
            if x == 0 || y == 0 || x + 1 == src.width || y + 1 == src.height {
                continue;
            }
            let gx = -luma(x - 1, y - 1) - 2.0 * luma(x - 1, y) - luma(x - 1, y + 1)
                + luma(x + 1, y - 1)
                + 2.0 * luma(x + 1, y)
                + luma(x + 1, y + 1);
            let gy = -luma(x - 1, y - 1) - 2.0 * luma(x, y - 1) - luma(x + 1, y - 1)
                + luma(x - 1, y + 1)
                + 2.0 * luma(x, y + 1)
                + luma(x + 1, y + 1);
            let magnitude = gx.hypot(gy);
            // Full-scale response is a black/white edge; map 0..4 to the
            // mask range, saturating just below the disabled sentinel.
            let v = ((magnitude / 4.0) * 255.0).round().clamp(0.0, 254.0) as u8;
            mask.set_pixel(x, y, Grey8(v));
        }
    }
    Ok(mask)
}

/// Separable 3-tap filter pass over the capture, normalized by the kernel
/// sum; `[1, 2, 1]` is the usual softening kernel.
pub fn filter(src: &Image<RgbId>, kernel: [i32; 3]) -> Result<Image<RgbId>> {
    let divisor: i32 = kernel.iter().sum();
    if divisor == 0 {
        return Err(Error::Domain("filter kernel must not sum to zero"));
    }
    let divisor = Precision::from(divisor);
    let weights = [
        Precision::from(kernel[0]),
        Precision::from(kernel[1]),
        Precision::from(kernel[2]),
    ];
    let clamp = |v: isize, max: usize| -> usize { v.clamp(0, max as isize - 1) as usize };

    // Horizontal pass, then vertical, in linear light.
    let mut horizontal = Image::<RgbId>::new(src.width, src.height)?;
    for y in 0..src.height {
        for x in 0..src.width {
            let mut acc = RgbId::default();
            for (k, w) in weights.iter().enumerate() {
                let sx = clamp(x as isize + k as isize - 1, src.width);
                let p = src.pixel(sx, y);
                acc.r += p.r * w;
                acc.g += p.g * w;
                acc.b += p.b * w;
                acc.i += p.i * w;
            }
            acc.r /= divisor;
            acc.g /= divisor;
            acc.b /= divisor;
            acc.i /= divisor;
            horizontal.set_pixel(x, y, acc);
        }
    }
    let mut out = Image::<RgbId>::new(src.width, src.height)?;
    for y in 0..src.height {
        for x in 0..src.width {
            let mut acc = RgbId::default();
            for (k, w) in weights.iter().enumerate() {
                let sy = clamp(y as isize + k as isize - 1, src.height);
                let p = horizontal.pixel(x, sy);
                acc.r += p.r * w;
                acc.g += p.g * w;
                acc.b += p.b * w;
                acc.i += p.i * w;
            }
            acc.r /= divisor;
            acc.g /= divisor;
            acc.b /= divisor;
            acc.i /= divisor;
            out.set_pixel(x, y, acc);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::colors;

    #[test]
    fn rejects_empty() {
        assert!(Image::<Rgb8>::new(0, 4).is_err());
        assert!(Image::<Rgb8>::new(4, 0).is_err());
    }

    #[test]
    fn generate_and_read_back() {
        let mut img = Image::<RgbId>::new(4, 2).unwrap();
        img.generate(|p| {
            if p.x < 0.5 {
                colors::BLACK
            } else {
                colors::WHITE
            }
        });
        assert_eq!(img.pixel(0, 0).r, 0.0);
        assert_eq!(img.pixel(3, 0).r, 1.0);
        assert!(img.get(4, 0).is_err());
    }

    #[test]
    fn conversion_crosses_gamma() {
        let mut hdr = Image::<RgbId>::new(2, 1).unwrap();
        hdr.set_pixel(0, 0, RgbId::from_color(Color::new(0.5, 0.5, 0.5)));
        let eight_bit = hdr.convert::<Rgb8>().unwrap();
        assert!(eight_bit.pixel(0, 0).r > 180);
    }

    #[test]
    fn sobel_finds_edges() {
        let mut img = Image::<RgbId>::new(8, 8).unwrap();
        img.generate(|p| {
            if p.x < 0.5 {
                colors::BLACK
            } else {
                colors::WHITE
            }
        });
        let mask = sobel_mask(&img).unwrap();
        // On the vertical edge the response is strong.
        assert!(mask.pixel(4, 4).0 > 64);
        // Far from the edge it is zero.
        assert_eq!(mask.pixel(1, 4).0, 0);
        assert_eq!(mask.pixel(6, 4).0, 0);
    }

    #[test]
    fn filter_smooths_but_preserves_flats() {
        let mut img = Image::<RgbId>::new(6, 6).unwrap();
        img.generate(|_| colors::GREY);
        let soft = filter(&img, [1, 2, 1]).unwrap();
        let before = img.pixel(3, 3);
        let after = soft.pixel(3, 3);
        assert!((before.r - after.r).abs() < 1e-12);

        let mut edge = Image::<RgbId>::new(6, 6).unwrap();
        edge.generate(|p| {
            if p.x < 0.5 {
                colors::BLACK
            } else {
                colors::WHITE
            }
        });
        let soft = filter(&edge, [1, 2, 1]).unwrap();
        // The edge column picks up some of its darker neighbor.
        let v = soft.pixel(3, 3).r;
        assert!(v > 0.0 && v < 1.0);
    }
}
