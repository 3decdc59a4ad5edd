// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Image file formats. The extension picks the format at save time:
//! `.ppm` (P6 8-bit RGB), `.pgm` (P5 8- or 16-bit grey), `.pfm` (32-bit
//! float RGB), `.tga` (8-bit BGR), `.exr` (16-bit half RGB, uncompressed).

use std::fs::File;
use std::io::{BufRead as _, BufReader, BufWriter, Read as _, Write as _};
use std::path::Path;

use half::f16;

use super::pixel::{Bgr8, Grey8, Pixel, PixelFormat, Rgb8, Rgbf32, Rgbh, Y16};
use super::Image;
use crate::error::{Error, Result};
use crate::math::Color;

impl<P: Pixel> Image<P> {
    /// Saves in the format selected by the path's extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);
        match ext.as_str() {
            "ppm" => self.write_ppm(&mut w),
            "pgm" => self.write_pgm(&mut w),
            "pfm" => self.write_pfm(&mut w),
            "tga" => self.write_tga(&mut w),
            "exr" => self.write_exr(&mut w),
            _ => Err(Error::Parse("unsupported image extension")),
        }
    }

    /// PPM binary (P6), 8-bit sRGB.
    fn write_ppm<W: std::io::Write>(&self, w: &mut W) -> Result<()> {
        write!(w, "P6\n{} {}\n255\n", self.width(), self.height())?;
        for y in 0..self.height() {
            for x in 0..self.width() {
                let px = Rgb8::from_color(self.pixel(x, y).to_color());
                w.write_all(bytemuck::bytes_of(&px))?;
            }
        }
        Ok(())
    }

    /// PGM binary (P5). 16-bit big-endian when the source is `Y16`,
    /// 8-bit grey otherwise.
    fn write_pgm<W: std::io::Write>(&self, w: &mut W) -> Result<()> {
        if P::FORMAT == PixelFormat::Y16 {
            write!(w, "P5\n{} {}\n65535\n", self.width(), self.height())?;
            for y in 0..self.height() {
                for x in 0..self.width() {
                    let px = Y16::from_color(self.pixel(x, y).to_color());
                    w.write_all(&px.0.to_be_bytes())?;
                }
            }
        } else {
            write!(w, "P5\n{} {}\n255\n", self.width(), self.height())?;
            for y in 0..self.height() {
                for x in 0..self.width() {
                    let px = Grey8::from_color(self.pixel(x, y).to_color());
                    w.write_all(&[px.0])?;
                }
            }
        }
        Ok(())
    }

    /// PFM color, little-endian (negative scale), rows bottom to top.
    fn write_pfm<W: std::io::Write>(&self, w: &mut W) -> Result<()> {
        write!(w, "PF\n{} {}\n-1.0\n", self.width(), self.height())?;
        for y in (0..self.height()).rev() {
            for x in 0..self.width() {
                let px = Rgbf32::from_color(self.pixel(x, y).to_color());
                w.write_all(&px.r.to_le_bytes())?;
                w.write_all(&px.g.to_le_bytes())?;
                w.write_all(&px.b.to_le_bytes())?;
            }
        }
        Ok(())
    }

    /// Targa type 2: uncompressed 24-bit BGR, top-left origin.
    fn write_tga<W: std::io::Write>(&self, w: &mut W) -> Result<()> {
        let mut header = [0u8; 18];
        header[2] = 2; // uncompressed true-color
        header[12..14].copy_from_slice(&(self.width() as u16).to_le_bytes());
        header[14..16].copy_from_slice(&(self.height() as u16).to_le_bytes());
        header[16] = 24;
        header[17] = 0x20; // top-left origin
        w.write_all(&header)?;
        for y in 0..self.height() {
            for x in 0..self.width() {
                let px = Rgb8::from_color(self.pixel(x, y).to_color());
                w.write_all(&[px.b, px.g, px.r])?;
            }
        }
        Ok(())
    }

    /// OpenEXR, single part, no compression, half-float R, G, B.
    fn write_exr<W: std::io::Write>(&self, w: &mut W) -> Result<()> {
        let width = self.width();
        let height = self.height();

        w.write_all(&[0x76, 0x2f, 0x31, 0x01])?; // magic
        w.write_all(&[2, 0, 0, 0])?; // version 2, no flags

        let mut header: Vec<u8> = Vec::new();
        // channels, alphabetical as the format requires.
        let mut chlist: Vec<u8> = Vec::new();
        for name in [b"B", b"G", b"R"].iter() {
            chlist.extend_from_slice(*name);
            chlist.push(0);
            chlist.extend_from_slice(&1i32.to_le_bytes()); // HALF
            chlist.extend_from_slice(&[0, 0, 0, 0]); // pLinear + reserved
            chlist.extend_from_slice(&1i32.to_le_bytes()); // xSampling
            chlist.extend_from_slice(&1i32.to_le_bytes()); // ySampling
        }
        chlist.push(0);
        write_attribute(&mut header, "channels", "chlist", &chlist);
        write_attribute(&mut header, "compression", "compression", &[0]);
        let mut window = Vec::new();
        window.extend_from_slice(&0i32.to_le_bytes());
        window.extend_from_slice(&0i32.to_le_bytes());
        window.extend_from_slice(&((width - 1) as i32).to_le_bytes());
        window.extend_from_slice(&((height - 1) as i32).to_le_bytes());
        write_attribute(&mut header, "dataWindow", "box2i", &window);
        write_attribute(&mut header, "displayWindow", "box2i", &window);
        write_attribute(&mut header, "lineOrder", "lineOrder", &[0]);
        write_attribute(&mut header, "pixelAspectRatio", "float", &1.0f32.to_le_bytes());
        let mut center = Vec::new();
        center.extend_from_slice(&0.0f32.to_le_bytes());
        center.extend_from_slice(&0.0f32.to_le_bytes());
        write_attribute(&mut header, "screenWindowCenter", "v2f", &center);
        write_attribute(&mut header, "screenWindowWidth", "float", &1.0f32.to_le_bytes());
        header.push(0); // end of header
        w.write_all(&header)?;

        // Scanline offset table: blocks are laid out sequentially.
        let table_start = 8 + header.len() as u64;
        let first_block = table_start + 8 * height as u64;
        let block_size = 8 + 3 * 2 * width as u64;
        for y in 0..height as u64 {
            w.write_all(&(first_block + y * block_size).to_le_bytes())?;
        }

        for y in 0..height {
            w.write_all(&(y as i32).to_le_bytes())?;
            w.write_all(&((3 * 2 * width) as i32).to_le_bytes())?;
            // One scanline per channel, B then G then R.
            for channel in 0..3 {
                for x in 0..width {
                    let px = Rgbh::from_color(self.pixel(x, y).to_color());
                    let h: f16 = match channel {
                        0 => px.b,
                        1 => px.g,
                        _ => px.r,
                    };
                    w.write_all(&h.to_bits().to_le_bytes())?;
                }
            }
        }
        Ok(())
    }
}

fn read_i32(bytes: &[u8], at: usize) -> Result<i32> {
    let slice = bytes.get(at..at + 4).ok_or(Error::Parse("truncated EXR"))?;
    Ok(i32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn read_cstr(bytes: &[u8], at: usize) -> Result<(&str, usize)> {
    let end = bytes[at..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::Parse("unterminated EXR string"))?;
    let s = std::str::from_utf8(&bytes[at..at + end])
        .map_err(|_| Error::Parse("non-UTF-8 EXR attribute name"))?;
    Ok((s, at + end + 1))
}

fn write_attribute(out: &mut Vec<u8>, name: &str, type_name: &str, value: &[u8]) {
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    out.extend_from_slice(type_name.as_bytes());
    out.push(0);
    out.extend_from_slice(&(value.len() as i32).to_le_bytes());
    out.extend_from_slice(value);
}

/// Reads a Netpbm header: magic line, dimensions, maxval.
fn read_netpbm_header<R: std::io::BufRead>(
    r: &mut R,
    magic: &str,
) -> Result<(usize, usize, usize)> {
    let mut tokens: Vec<String> = Vec::new();
    let mut line = String::new();
    while tokens.len() < 4 {
        line.clear();
        if r.read_line(&mut line)? == 0 {
            return Err(Error::Parse("truncated netpbm header"));
        }
        let before_comment = line.split('#').next().unwrap_or("");
        tokens.extend(before_comment.split_whitespace().map(String::from));
    }
    if tokens[0] != magic {
        return Err(Error::Parse("wrong netpbm magic"));
    }
    let width = tokens[1]
        .parse::<usize>()
        .map_err(|_| Error::Parse("bad width"))?;
    let height = tokens[2]
        .parse::<usize>()
        .map_err(|_| Error::Parse("bad height"))?;
    let maxval = tokens[3]
        .parse::<usize>()
        .map_err(|_| Error::Parse("bad maxval"))?;
    Ok((width, height, maxval))
}

/// Loads an 8-bit binary PPM.
pub fn load_ppm(path: &Path) -> Result<Image<Rgb8>> {
    let mut r = BufReader::new(File::open(path)?);
    let (width, height, maxval) = read_netpbm_header(&mut r, "P6")?;
    if maxval != 255 {
        return Err(Error::Parse("only 8-bit PPM is supported"));
    }
    let mut data = vec![0u8; width * height * 3];
    r.read_exact(&mut data)?;
    let mut img = Image::<Rgb8>::new(width, height)?;
    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) * 3;
            img.set_pixel(
                x,
                y,
                Rgb8 {
                    r: data[i],
                    g: data[i + 1],
                    b: data[i + 2],
                },
            );
        }
    }
    Ok(img)
}

/// Loads an 8-bit binary PGM.
pub fn load_pgm8(path: &Path) -> Result<Image<Grey8>> {
    let mut r = BufReader::new(File::open(path)?);
    let (width, height, maxval) = read_netpbm_header(&mut r, "P5")?;
    if maxval != 255 {
        return Err(Error::Parse("expected an 8-bit PGM"));
    }
    let mut data = vec![0u8; width * height];
    r.read_exact(&mut data)?;
    let mut img = Image::<Grey8>::new(width, height)?;
    for y in 0..height {
        for x in 0..width {
            img.set_pixel(x, y, Grey8(data[y * width + x]));
        }
    }
    Ok(img)
}

/// Loads a 16-bit binary PGM (big-endian samples, per Netpbm).
pub fn load_pgm16(path: &Path) -> Result<Image<Y16>> {
    let mut r = BufReader::new(File::open(path)?);
    let (width, height, maxval) = read_netpbm_header(&mut r, "P5")?;
    if maxval != 65535 {
        return Err(Error::Parse("expected a 16-bit PGM"));
    }
    let mut data = vec![0u8; width * height * 2];
    r.read_exact(&mut data)?;
    let mut img = Image::<Y16>::new(width, height)?;
    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) * 2;
            img.set_pixel(x, y, Y16(u16::from_be_bytes([data[i], data[i + 1]])));
        }
    }
    Ok(img)
}

/// Loads a color PFM, honoring its endianness and bottom-up row order.
pub fn load_pfm(path: &Path) -> Result<Image<Rgbf32>> {
    let mut r = BufReader::new(File::open(path)?);
    // Header: "PF", dimensions, scale (sign = endianness).
    let mut tokens: Vec<String> = Vec::new();
    let mut line = String::new();
    while tokens.len() < 4 {
        line.clear();
        if r.read_line(&mut line)? == 0 {
            return Err(Error::Parse("truncated PFM header"));
        }
        tokens.extend(line.split_whitespace().map(String::from));
    }
    if tokens[0] != "PF" {
        return Err(Error::Parse("not a color PFM"));
    }
    let width = tokens[1]
        .parse::<usize>()
        .map_err(|_| Error::Parse("bad width"))?;
    let height = tokens[2]
        .parse::<usize>()
        .map_err(|_| Error::Parse("bad height"))?;
    let scale = tokens[3]
        .parse::<f32>()
        .map_err(|_| Error::Parse("bad scale"))?;
    let little_endian = scale < 0.0;
    let mut data = vec![0u8; width * height * 12];
    r.read_exact(&mut data)?;
    let mut img = Image::<Rgbf32>::new(width, height)?;
    for row in 0..height {
        // PFM stores the bottom row first.
        let y = height - 1 - row;
        for x in 0..width {
            let i = (row * width + x) * 12;
            let mut ch = [0.0f32; 3];
            for (c, v) in ch.iter_mut().enumerate() {
                let bytes = [
                    data[i + c * 4],
                    data[i + c * 4 + 1],
                    data[i + c * 4 + 2],
                    data[i + c * 4 + 3],
                ];
                *v = if little_endian {
                    f32::from_le_bytes(bytes)
                } else {
                    f32::from_be_bytes(bytes)
                };
            }
            img.set_pixel(
                x,
                y,
                Rgbf32 {
                    r: ch[0],
                    g: ch[1],
                    b: ch[2],
                },
            );
        }
    }
    Ok(img)
}

/// Loads an uncompressed 24-bit Targa (the variant the writer produces).
pub fn load_tga(path: &Path) -> Result<Image<Bgr8>> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < 18 {
        return Err(Error::Parse("truncated TGA header"));
    }
    let id_length = bytes[0] as usize;
    if bytes[1] != 0 || bytes[2] != 2 || bytes[16] != 24 {
        return Err(Error::Parse("only uncompressed 24-bit TGA is supported"));
    }
    let width = u16::from_le_bytes([bytes[12], bytes[13]]) as usize;
    let height = u16::from_le_bytes([bytes[14], bytes[15]]) as usize;
    let top_left = bytes[17] & 0x20 != 0;
    let data = &bytes[18 + id_length..];
    if data.len() < width * height * 3 {
        return Err(Error::Parse("truncated TGA pixel data"));
    }
    let mut img = Image::<Bgr8>::new(width, height)?;
    for row in 0..height {
        let y = if top_left { row } else { height - 1 - row };
        for x in 0..width {
            let i = (row * width + x) * 3;
            img.set_pixel(
                x,
                y,
                Bgr8 {
                    b: data[i],
                    g: data[i + 1],
                    r: data[i + 2],
                },
            );
        }
    }
    Ok(img)
}

/// Loads a single-part uncompressed half-float RGB EXR (the variant the
/// writer produces).
pub fn load_exr(path: &Path) -> Result<Image<Rgbh>> {
    let bytes = std::fs::read(path)?;
    if bytes.len() < 8 || bytes[0..4] != [0x76, 0x2f, 0x31, 0x01] {
        return Err(Error::Parse("not an EXR file"));
    }

    // Walk the header attributes; we only need the data window, and we
    // insist on the layout the writer produces.
    let mut at = 8;
    let mut data_window = None;
    let mut compression_ok = false;
    loop {
        if *bytes.get(at).ok_or(Error::Parse("truncated EXR header"))? == 0 {
            at += 1;
            break;
        }
        let (name, after_name) = read_cstr(&bytes, at)?;
        let (_type_name, after_type) = read_cstr(&bytes, after_name)?;
        let size = read_i32(&bytes, after_type)? as usize;
        let value_at = after_type + 4;
        match name {
            "dataWindow" => {
                let x_min = read_i32(&bytes, value_at)?;
                let y_min = read_i32(&bytes, value_at + 4)?;
                let x_max = read_i32(&bytes, value_at + 8)?;
                let y_max = read_i32(&bytes, value_at + 12)?;
                data_window = Some((
                    (x_max - x_min + 1) as usize,
                    (y_max - y_min + 1) as usize,
                ));
            }
            "compression" => {
                compression_ok = bytes.get(value_at) == Some(&0);
            }
            _ => {}
        }
        at = value_at + size;
    }
    let (width, height) = data_window.ok_or(Error::Parse("EXR without a data window"))?;
    if !compression_ok {
        return Err(Error::Parse("only uncompressed EXR is supported"));
    }

    // Skip the scanline offset table; blocks follow in line order.
    at += 8 * height;
    let mut img = Image::<Rgbh>::new(width, height)?;
    for _ in 0..height {
        let y = read_i32(&bytes, at)? as usize;
        let size = read_i32(&bytes, at + 4)? as usize;
        if size != 3 * 2 * width || y >= height {
            return Err(Error::Parse("unexpected EXR scanline block"));
        }
        let data = bytes
            .get(at + 8..at + 8 + size)
            .ok_or(Error::Parse("truncated EXR scanline"))?;
        for x in 0..width {
            let half_at = |channel: usize| -> f16 {
                let i = channel * 2 * width + x * 2;
                f16::from_bits(u16::from_le_bytes([data[i], data[i + 1]]))
            };
            // Channels are stored alphabetically: B, G, R.
            img.set_pixel(
                x,
                y,
                Rgbh {
                    r: half_at(2),
                    g: half_at(1),
                    b: half_at(0),
                },
            );
        }
        at += 8 + size;
    }
    Ok(img)
}
