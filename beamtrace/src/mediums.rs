// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Surface mediums: the per-object parameter bundle the trace evaluator
//! queries for emission, reflectance, transparency, and attenuation.

use std::sync::Arc;

use cgmath::Rad;
use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::math::{colors, Color, Precision, TexturePoint, EPSILON};

mod texture;

pub use texture::{initialize_noise, NoiseParameters, Texture};

/// Everything the tracer wants to know about a surface's response to
/// light, indexed by the surface's 2-D texture coordinate.
///
/// Construct via the presets or [`Medium::custom`]; the latter enforces
/// the configuration invariants.
#[derive(Clone, Debug)]
pub struct Medium {
    /// Color lit by ambient light regardless of shadowing.
    pub ambient: Color,
    /// How much of the ambient color leaks in, 0 to 1.
    pub ambient_scale: Precision,
    /// Diffuse reflectance over the surface.
    pub diffuse: Texture,
    /// Specular lobe tint.
    pub specular: Color,
    /// Phong exponent of the specular lobe.
    pub tightness: Precision,
    /// Mirror-vs-matte blend in `[0, 1]`.
    pub smoothness: Precision,
    /// Fraction of outgoing light that is emitted rather than reflected.
    pub emissivity: Precision,
    /// Emitted color where `emissivity > 0`.
    pub emissive: Color,
    /// Fraction of light transmitted through the surface, `[0, 1]`.
    pub transparency: Precision,
    /// Refractive index, at least 1.
    pub refractive_index: Precision,
    /// Beer-Lambert attenuation coefficient per unit distance traveled
    /// inside the medium; 0 is lossless.
    pub fade: Precision,
}

impl Medium {
    /// Validates and returns a fully custom medium.
    #[allow(clippy::too_many_arguments)]
    pub fn custom(
        ambient: Color,
        ambient_scale: Precision,
        diffuse: Texture,
        specular: Color,
        tightness: Precision,
        smoothness: Precision,
        emissivity: Precision,
        emissive: Color,
        transparency: Precision,
        refractive_index: Precision,
        fade: Precision,
    ) -> Result<Medium> {
        let m = Medium {
            ambient,
            ambient_scale,
            diffuse,
            specular,
            tightness,
            smoothness,
            emissivity,
            emissive,
            transparency,
            refractive_index,
            fade,
        };
        m.validate()?;
        Ok(m)
    }

    /// Checks the configuration invariants.
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.smoothness) {
            return Err(Error::Config("smoothness must be within [0, 1]"));
        }
        if !unit.contains(&self.transparency) {
            return Err(Error::Config("transparency must be within [0, 1]"));
        }
        if !unit.contains(&self.emissivity) {
            return Err(Error::Config("emissivity must be within [0, 1]"));
        }
        if !unit.contains(&self.ambient_scale) {
            return Err(Error::Config("ambient scale must be within [0, 1]"));
        }
        if self.refractive_index < 1.0 {
            return Err(Error::Config("refractive index must be at least 1"));
        }
        if self.fade < 0.0 {
            return Err(Error::Config("fade must not be negative"));
        }
        // The radiosity weights are constructed to sum to 1, but guard the
        // raw inputs too.
        if self.emissivity + self.transparency > 1.0 + EPSILON {
            return Err(Error::Config(
                "emissivity + transparency must not exceed 1",
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // The callables the tracer uses.

    /// Ambient color at the surface coordinate.
    pub fn ambient(&self, _uv: TexturePoint) -> Color {
        self.ambient * self.ambient_scale
    }

    /// Diffuse color at the surface coordinate.
    pub fn diffuse(&self, uv: TexturePoint) -> Color {
        self.diffuse.at(uv)
    }

    /// Phong specular response for a reflection-light alignment `cosine`
    /// and the light's incident color.
    pub fn specular(&self, _uv: TexturePoint, cosine: Precision, incident: Color) -> Color {
        if cosine <= 0.0 {
            return colors::BLACK;
        }
        self.specular * incident * cosine.powf(self.tightness)
    }

    pub fn smoothness(&self, _uv: TexturePoint) -> Precision {
        self.smoothness
    }

    pub fn emissive(&self, _uv: TexturePoint) -> Color {
        self.emissive
    }

    pub fn refractive_index(&self, _uv: TexturePoint) -> Precision {
        self.refractive_index
    }

    /// Tint applied to light arriving via the mirror bounce.
    pub fn bounced(&self, _uv: TexturePoint, incoming: Color) -> Color {
        self.specular * incoming
    }

    /// Beer-Lambert attenuation of `color` over `distance` traveled inside
    /// this medium.
    pub fn absorbance(&self, distance: Precision, color: Color) -> Color {
        if self.fade <= 0.0 {
            return color;
        }
        if distance.is_infinite() {
            return colors::BLACK;
        }
        let factor = (-self.fade * distance).exp();
        let mut c = color.to_linear();
        c.per_channel(|v| v * factor);
        c
    }

    /// Splits unit radiance into `(emissivity, reflectivity,
    /// transparency)` weights for this incidence. Transparent surfaces
    /// shift transmitted weight back into reflection near grazing angles
    /// (Schlick); the three weights always sum to 1.
    pub fn radiosity(
        &self,
        _uv: TexturePoint,
        n_outside: Precision,
        incident: Rad<Precision>,
        _transmitted: Rad<Precision>,
    ) -> (Precision, Precision, Precision) {
        let e = self.emissivity;
        let t = if self.transparency > 0.0 {
            let r0 = ((n_outside - self.refractive_index)
                / (n_outside + self.refractive_index))
                .powi(2);
            let cos = incident.0.cos().abs().clamp(0.0, 1.0);
            let fresnel = r0 + (1.0 - r0) * (1.0 - cos).powi(5);
            self.transparency * (1.0 - fresnel) * (1.0 - e)
        } else {
            0.0
        };
        let r = (1.0 - e - t).max(0.0);
        (e, r, t)
    }

    // ------------------------------------------------------------------
    // Presets.

    /// The empty enclosing medium a scene starts in.
    pub fn vacuum() -> Medium {
        Medium {
            ambient: colors::BLACK,
            ambient_scale: 0.0,
            diffuse: Texture::Solid(colors::BLACK),
            specular: colors::BLACK,
            tightness: 1.0,
            smoothness: 0.0,
            emissivity: 0.0,
            emissive: colors::BLACK,
            transparency: 0.0,
            refractive_index: 1.0,
            fade: 0.0,
        }
    }

    /// Slightly hazy air: a vacuum with a touch of fade.
    pub fn air() -> Medium {
        Medium {
            fade: 0.001,
            ..Medium::vacuum()
        }
    }

    /// A colored metal: tinted specular, mostly mirror.
    pub fn metal(color: Color, smoothness: Precision, tightness: Precision) -> Medium {
        Medium {
            ambient: color,
            ambient_scale: 0.05,
            diffuse: Texture::Solid(color),
            specular: color,
            tightness,
            smoothness,
            emissivity: 0.0,
            emissive: colors::BLACK,
            transparency: 0.0,
            refractive_index: 1.0,
            fade: 0.0,
        }
    }

    /// A matte-to-glossy dielectric with a white highlight.
    pub fn plastic(color: Color, smoothness: Precision) -> Medium {
        Medium {
            ambient: color,
            ambient_scale: 0.1,
            diffuse: Texture::Solid(color),
            specular: colors::WHITE,
            tightness: 20.0,
            smoothness,
            emissivity: 0.0,
            emissive: colors::BLACK,
            transparency: 0.0,
            refractive_index: 1.0,
            fade: 0.0,
        }
    }

    /// A clear refractive solid.
    pub fn glass(refractive_index: Precision, fade: Precision) -> Medium {
        Medium {
            ambient: colors::BLACK,
            ambient_scale: 0.0,
            diffuse: Texture::Solid(colors::BLACK),
            specular: colors::WHITE,
            tightness: 100.0,
            smoothness: 1.0,
            emissivity: 0.0,
            emissive: colors::BLACK,
            transparency: 0.95,
            refractive_index,
            fade,
        }
    }

    /// A perfect white-backed mirror.
    pub fn mirror() -> Medium {
        Medium {
            ambient: colors::BLACK,
            ambient_scale: 0.0,
            diffuse: Texture::Solid(colors::BLACK),
            specular: colors::WHITE,
            tightness: 1000.0,
            smoothness: 1.0,
            emissivity: 0.0,
            emissive: colors::BLACK,
            transparency: 0.0,
            refractive_index: 1.0,
            fade: 0.0,
        }
    }

    /// A light-emitting surface.
    pub fn emitter(color: Color) -> Medium {
        Medium {
            ambient: colors::BLACK,
            ambient_scale: 0.0,
            diffuse: Texture::Solid(color),
            specular: colors::BLACK,
            tightness: 1.0,
            smoothness: 0.0,
            emissivity: 1.0,
            emissive: color,
            transparency: 0.0,
            refractive_index: 1.0,
            fade: 0.0,
        }
    }

    /// A matte checkerboard between two colors with unit cells.
    pub fn checkerboard(light: Color, dark: Color) -> Medium {
        Medium {
            ambient: light,
            ambient_scale: 0.1,
            diffuse: Texture::Checkerboard(vec![light, dark]),
            specular: colors::BLACK,
            tightness: 1.0,
            smoothness: 0.0,
            emissivity: 0.0,
            emissive: colors::BLACK,
            transparency: 0.0,
            refractive_index: 1.0,
            fade: 0.0,
        }
    }
}

/// The shared default enclosing medium.
pub static VACUUM: Lazy<Arc<Medium>> = Lazy::new(|| Arc::new(Medium::vacuum()));
