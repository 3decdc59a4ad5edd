// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! The scene and the recursive trace evaluator.
//!
//! A [`Scene`] references objects and lights owned by the caller, plus a
//! default enclosing medium and a background callable. [`Scene::trace`]
//! intersects one ray against everything and computes radiance recursively:
//! direct illumination from shadow-tested light samples, a mirror bounce
//! blended by smoothness (with an adaptive contribution cutoff), and a
//! refracted branch blended by transparency, all attenuated by the
//! enclosing medium's absorbance.

use std::iter::Sum;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cgmath::{InnerSpace as _, Rad};
use log::debug;
use rand::Rng as _;
use rand_xoshiro::rand_core::SeedableRng as _;
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelIterator as _, ParallelIterator as _};

use crate::camera::Camera;
use crate::error::Result;
use crate::geometry::{
    is_zero_vector, magnitude, try_normalize, Aabb, Point3, Ray, Vector2, Vector3,
};
use crate::image::{self, Grey8, Image, Pixel, RgbId, AAA_MASK_DISABLED};
use crate::lights::Light;
use crate::math::{colors, interpolate, Color, Precision, EPSILON};
use crate::mediums::{Medium, VACUUM};
use crate::objects::Object;

/// Counters accumulated while tracing. Per-thread during a render; the
/// render merges a snapshot at the end.
///
/// The contents of this structure are subject to change; use [`Debug`] to
/// view it. The [`Default`] value is the zero value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct TraceInfo {
    pub cast_rays: usize,
    pub intersected_rays: usize,
    pub missed_rays: usize,
    pub inside_out_hits: usize,
    pub degenerate_hits: usize,
    pub shadow_rays: usize,
    pub sampled_rays: usize,
    pub lit_samples: usize,
    pub shadowed_samples: usize,
    pub bounced_rays: usize,
    pub transmitted_rays: usize,
    pub saved_bounces: usize,
}

impl AddAssign<TraceInfo> for TraceInfo {
    fn add_assign(&mut self, other: Self) {
        self.cast_rays += other.cast_rays;
        self.intersected_rays += other.intersected_rays;
        self.missed_rays += other.missed_rays;
        self.inside_out_hits += other.inside_out_hits;
        self.degenerate_hits += other.degenerate_hits;
        self.shadow_rays += other.shadow_rays;
        self.sampled_rays += other.sampled_rays;
        self.lit_samples += other.lit_samples;
        self.shadowed_samples += other.shadowed_samples;
        self.bounced_rays += other.bounced_rays;
        self.transmitted_rays += other.transmitted_rays;
        self.saved_bounces += other.saved_bounces;
    }
}

impl Sum for TraceInfo {
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = Self>,
    {
        let mut sum = Self::default();
        for part in iter {
            sum += part;
        }
        sum
    }
}

/// Parameters of one render pass.
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// Rays per pixel (or per masked pixel when adaptive).
    pub number_of_samples: usize,
    /// Maximum reflection/refraction recursion depth.
    pub reflection_depth: usize,
    /// Sobel mask threshold for adaptive antialiasing;
    /// [`AAA_MASK_DISABLED`] shoots `number_of_samples` everywhere.
    pub adaptive_mask_threshold: u8,
    /// Soften the capture with a `[1, 2, 1]` pass after rendering.
    pub filter_capture: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            number_of_samples: 4,
            reflection_depth: 4,
            adaptive_mask_threshold: AAA_MASK_DISABLED,
            filter_capture: false,
        }
    }
}

/// Per-row progress callback; return `false` to cancel the render after
/// the in-flight rows finish.
pub type RowNotifier<'n> = &'n (dyn Fn(usize) -> bool + Sync);

/// The nearest usable hit of a ray, in world space.
#[derive(Clone, Copy, Debug)]
struct NearestHit {
    point: Point3,
    normal: Vector3,
    distance: Precision,
}

struct SceneEntry<'a> {
    object: &'a Object,
    bounds: Aabb,
    infinite: bool,
}

/// The object list, light list, and trace evaluator.
pub struct Scene<'a> {
    adaptive_reflection_threshold: Precision,
    entries: Vec<SceneEntry<'a>>,
    lights: Vec<&'a Light>,
    background: Box<dyn Fn(&Ray) -> Color + Send + Sync>,
    media: Arc<Medium>,
    /// Grown bounds over every finite object.
    bounds: Aabb,
}

impl<'a> Scene<'a> {
    /// An empty scene in a vacuum with a black background. The threshold
    /// is the adaptive reflection cutoff (0 disables it).
    pub fn new(adaptive_reflection_threshold: Precision) -> Scene<'a> {
        Scene {
            adaptive_reflection_threshold,
            entries: Vec::new(),
            lights: Vec::new(),
            background: Box::new(|_| colors::BLACK),
            media: VACUUM.clone(),
            bounds: Aabb::empty(),
        }
    }

    pub fn add_object(&mut self, object: &'a Object) {
        let bounds = object.get_world_bounds();
        let infinite = bounds.is_infinite();
        if !infinite {
            self.bounds.grow(&bounds);
        }
        self.entries.push(SceneEntry {
            object,
            bounds,
            infinite,
        });
    }

    pub fn add_light(&mut self, light: &'a Light) {
        self.lights.push(light);
    }

    /// Replaces the enclosing medium (a vacuum by default).
    pub fn set_media(&mut self, media: Arc<Medium>) {
        self.media = media;
    }

    /// Replaces the background callable (black by default).
    pub fn set_background<F>(&mut self, background: F)
    where
        F: Fn(&Ray) -> Color + Send + Sync + 'static,
    {
        self.background = Box::new(background);
    }

    pub fn number_of_objects(&self) -> usize {
        self.entries.len()
    }

    pub fn number_of_lights(&self) -> usize {
        self.lights.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lights.clear();
        self.bounds = Aabb::empty();
    }

    /// Nearest forward hit over all objects, skipping hits within the
    /// self-intersection guard. Finite objects are pruned by their world
    /// bounds; infinite objects are always tested.
    fn find_nearest(
        &self,
        world_ray: &Ray,
        info: &mut TraceInfo,
    ) -> Result<Option<(&'a Object, NearestHit)>> {
        let mut closest_distance2 = Precision::INFINITY;
        let mut closest: Option<(&'a Object, NearestHit)> = None;
        for entry in &self.entries {
            if !entry.infinite && !entry.bounds.hit(world_ray, 0.0, Precision::INFINITY) {
                continue;
            }
            let events = entry.object.events(world_ray)?;
            let mut found = false;
            for event in events {
                let offset = event.point - world_ray.origin;
                let distance2 = offset.magnitude2();
                // Self-hit guard: at or below epsilon squared is "already
                // touching".
                if distance2 <= EPSILON {
                    continue;
                }
                found = true;
                if distance2 < closest_distance2 {
                    closest_distance2 = distance2;
                    closest = Some((
                        entry.object,
                        NearestHit {
                            point: event.point,
                            normal: event.normal,
                            distance: distance2.sqrt(),
                        },
                    ));
                }
                break; // events are ordered; the first usable one is nearest
            }
            if found {
                info.intersected_rays += 1;
            } else {
                info.missed_rays += 1;
            }
        }
        Ok(closest)
    }

    /// Traces a ray through the scene starting in the scene's own
    /// enclosing medium.
    pub fn trace(&self, world_ray: &Ray, depth: usize) -> Result<(Color, TraceInfo)> {
        let mut info = TraceInfo::default();
        let color = self.trace_internal(world_ray, &self.media, depth, 1.0, &mut info)?;
        Ok((color, info))
    }

    /// Traces a ray starting inside an explicit enclosing medium with an
    /// explicit recursive contribution.
    pub fn trace_with(
        &self,
        world_ray: &Ray,
        media: &Medium,
        depth: usize,
        contribution: Precision,
    ) -> Result<(Color, TraceInfo)> {
        let mut info = TraceInfo::default();
        let color = self.trace_internal(world_ray, media, depth, contribution, &mut info)?;
        Ok((color, info))
    }

    fn trace_internal(
        &self,
        world_ray: &Ray,
        media: &Medium,
        depth: usize,
        contribution: Precision,
        info: &mut TraceInfo,
    ) -> Result<Color> {
        info.cast_rays += 1;

        let nearest = self.find_nearest(world_ray, info)?;
        let (object, hit) = match nearest {
            Some(found) => found,
            None => {
                // The ray escaped; the enclosing medium absorbs the
                // background over an unbounded path.
                return Ok(media.absorbance(Precision::INFINITY, (self.background)(world_ray)));
            }
        };

        let world_surface_point = hit.point;
        let uv = object.map(world_surface_point);
        let surface_normal = match try_normalize(hit.normal) {
            Ok(n) => n,
            Err(_) => {
                // Degenerate geometry reports a null normal; treat the
                // ray as a miss rather than aborting the render.
                info.degenerate_hits += 1;
                return Ok(media.absorbance(Precision::INFINITY, (self.background)(world_ray)));
            }
        };

        // A positive projection means we hit the surface from behind or
        // from inside the solid.
        let inside_out = surface_normal.dot(world_ray.direction) > 0.0;
        if inside_out {
            info.inside_out_hits += 1;
        }
        let shading_normal = if inside_out {
            -surface_normal
        } else {
            surface_normal
        };

        // Child rays use the unflipped geometric normal.
        let reflection = object.reflection(world_ray, surface_normal, world_surface_point);
        let refraction = object.refraction(
            world_ray,
            surface_normal,
            world_surface_point,
            media.refractive_index(uv),
            object.medium().refractive_index(uv),
        );

        let incident_angle = crate::geometry::angle(shading_normal, world_ray.direction)
            .unwrap_or(Rad(0.0));
        let transmitted_angle = crate::geometry::angle(shading_normal, refraction.direction)
            .unwrap_or(Rad(0.0));

        let medium = object.medium();
        let (emissivity, reflectivity, transparency) = medium.radiosity(
            uv,
            media.refractive_index(uv),
            incident_angle,
            transmitted_angle,
        );

        let mut emitted = colors::BLACK;
        let mut reflected = colors::BLACK;
        let mut transmitted = colors::BLACK;

        if emissivity > 0.0 {
            emitted = medium.emissive(uv) * emissivity;
        }

        if reflectivity > 0.0 {
            info.shadow_rays += 1;
            // Direct illumination: ambient, then every light, each
            // averaged over its samples and summed together.
            let mut surface_colors = vec![medium.ambient(uv)];
            for light in &self.lights {
                let samples = light.number_of_samples();
                let mut sample_colors = vec![colors::BLACK; samples];
                for (sample_index, sample_color) in sample_colors.iter_mut().enumerate() {
                    info.sampled_rays += 1;
                    let ray_to_light = light.incident(world_surface_point, sample_index);
                    let light_distance = magnitude(ray_to_light.direction);
                    let light_direction = match try_normalize(ray_to_light.direction) {
                        Ok(d) => d,
                        Err(_) => continue, // sample coincides with the point
                    };
                    let shadow_ray = Ray::new(world_surface_point, light_direction);
                    let blocker = self.find_nearest(&shadow_ray, info)?;
                    // The light reaches this point unless something
                    // opaque and non-emissive sits closer than the light.
                    let not_in_shadow = match blocker {
                        None => true,
                        Some((blocking_object, blocking_hit)) => {
                            blocking_hit.distance > light_distance
                                || blocking_object.medium().transparency > 0.0
                                || blocking_object.medium().emissivity > 0.0
                        }
                    };
                    if not_in_shadow {
                        info.lit_samples += 1;
                        let raw_light_color = light.color_at(world_surface_point);
                        let incident_scaling = light_direction.dot(shading_normal);
                        let incident_light = if incident_scaling > 0.0 {
                            raw_light_color * incident_scaling
                        } else {
                            colors::BLACK
                        };
                        let diffuse_light = medium.diffuse(uv);
                        let specular_scaling = light_direction.dot(reflection.direction);
                        let specular_light = medium.specular(uv, specular_scaling, raw_light_color);
                        *sample_color = diffuse_light * incident_light;
                        // Accumulate the highlight; blending would dim it.
                        *sample_color += specular_light;
                    } else {
                        info.shadowed_samples += 1;
                    }
                }
                surface_colors.push(Color::blend_samples(&sample_colors));
            }
            let surface_properties = Color::accumulate_samples(&surface_colors);

            reflected = if depth > 0 {
                let smoothness = medium.smoothness(uv);
                if smoothness > 0.0 {
                    if contribution < self.adaptive_reflection_threshold {
                        // Not worth the recursion; credit the skipped
                        // bounces to the statistics.
                        info.saved_bounces += depth;
                        surface_properties
                    } else {
                        info.bounced_rays += 1;
                        let bounced = medium.bounced(
                            uv,
                            self.trace_internal(
                                &reflection,
                                media,
                                depth - 1,
                                contribution * smoothness,
                                info,
                            )?,
                        );
                        interpolate(surface_properties, bounced, smoothness)
                    }
                } else {
                    surface_properties
                }
            } else {
                surface_properties
            };
        }

        if transparency > 0.0 && depth > 0 && !is_zero_vector(refraction.direction) {
            info.transmitted_rays += 1;
            transmitted =
                self.trace_internal(&refraction, medium, depth - 1, contribution, info)?;
        }

        let mut surface = interpolate(reflected, transmitted, transparency);
        surface += emitted;
        Ok(media.absorbance(hit.distance, surface))
    }

    /// Renders the scene into the camera's capture.
    ///
    /// When the adaptive mask threshold is enabled the first pass shoots a
    /// single ray per pixel, a Sobel mask picks out contrast edges, and
    /// only pixels over the threshold are re-traced with the full sample
    /// count. The notifier runs per completed row and may cancel.
    pub fn render(
        &self,
        camera: &mut Camera,
        options: &RenderOptions,
        notifier: Option<RowNotifier<'_>>,
    ) -> Result<TraceInfo> {
        let adaptive = options.adaptive_mask_threshold != AAA_MASK_DISABLED;
        let cancelled = AtomicBool::new(false);
        let mut info = TraceInfo::default();

        let first_pass_samples = if adaptive {
            1
        } else {
            options.number_of_samples
        };
        info += self.render_pass(
            camera,
            first_pass_samples,
            None,
            options.reflection_depth,
            notifier,
            &cancelled,
        )?;

        if adaptive && !cancelled.load(Ordering::Relaxed) {
            camera.mask = image::sobel_mask(&camera.capture)?;
            let mask = camera.mask.clone();
            info += self.render_pass(
                camera,
                options.number_of_samples,
                Some((&mask, options.adaptive_mask_threshold)),
                options.reflection_depth,
                notifier,
                &cancelled,
            )?;
        }

        if options.filter_capture {
            camera.capture = image::filter(&camera.capture, [1, 2, 1])?;
        }
        debug!(
            "render complete: {} rays cast, {} bounced, {} transmitted, {} saved",
            info.cast_rays, info.bounced_rays, info.transmitted_rays, info.saved_bounces
        );
        Ok(info)
    }

    /// One full sweep over the image. With a mask, only pixels at or over
    /// the threshold are re-traced; the rest keep their capture value.
    fn render_pass(
        &self,
        camera: &mut Camera,
        samples: usize,
        mask: Option<(&Image<Grey8>, u8)>,
        depth: usize,
        notifier: Option<RowNotifier<'_>>,
        cancelled: &AtomicBool,
    ) -> Result<TraceInfo> {
        let rows = self.render_rows_impl(camera, samples, mask, depth, notifier, cancelled)?;
        let mut info = TraceInfo::default();
        for (y, row) in rows.into_iter().enumerate() {
            let (pixels, row_info) = row;
            info += row_info;
            if let Some(pixels) = pixels {
                for (x, p) in pixels.into_iter().enumerate() {
                    camera.capture.set_pixel(x, y, p);
                }
            }
        }
        Ok(info)
    }

    /// Traces one row of pixels; `None` when the render was cancelled
    /// before this row started.
    #[allow(clippy::too_many_arguments)]
    fn render_row(
        &self,
        camera: &Camera,
        y: usize,
        samples: usize,
        mask: Option<(&Image<Grey8>, u8)>,
        depth: usize,
        notifier: Option<RowNotifier<'_>>,
        cancelled: &AtomicBool,
    ) -> Result<(Option<Vec<RgbId>>, TraceInfo)> {
        if cancelled.load(Ordering::Relaxed) {
            return Ok((None, TraceInfo::default()));
        }
        let width = camera.width();
        let mut info = TraceInfo::default();
        let mut row = Vec::with_capacity(width);
        for x in 0..width {
            if let Some((mask, threshold)) = mask {
                if mask.pixel(x, y).0 < threshold {
                    row.push(camera.capture.pixel(x, y));
                    continue;
                }
            }
            // Deterministic per-pixel jitter; the first sample is always
            // the pixel center.
            let mut rng = Xoshiro256Plus::seed_from_u64((y * width + x) as u64);
            let mut sample_colors = Vec::with_capacity(samples);
            for sample in 0..samples.max(1) {
                let jitter = if sample == 0 {
                    Vector2::new(0.0, 0.0)
                } else {
                    Vector2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5))
                };
                let ray = camera.cast(camera.image_point(x, y, jitter));
                sample_colors.push(self.trace_internal(&ray, &self.media, depth, 1.0, &mut info)?);
            }
            row.push(RgbId::from_color(Color::blend_samples(&sample_colors)));
        }
        if let Some(notify) = notifier {
            if !notify(y) {
                cancelled.store(true, Ordering::Relaxed);
            }
        }
        Ok((Some(row), info))
    }

    #[cfg(feature = "rayon")]
    #[allow(clippy::type_complexity)]
    fn render_rows_impl(
        &self,
        camera: &Camera,
        samples: usize,
        mask: Option<(&Image<Grey8>, u8)>,
        depth: usize,
        notifier: Option<RowNotifier<'_>>,
        cancelled: &AtomicBool,
    ) -> Result<Vec<(Option<Vec<RgbId>>, TraceInfo)>> {
        (0..camera.height())
            .into_par_iter()
            .map(|y| self.render_row(camera, y, samples, mask, depth, notifier, cancelled))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    #[allow(clippy::type_complexity)]
    fn render_rows_impl(
        &self,
        camera: &Camera,
        samples: usize,
        mask: Option<(&Image<Grey8>, u8)>,
        depth: usize,
        notifier: Option<RowNotifier<'_>>,
        cancelled: &AtomicBool,
    ) -> Result<Vec<(Option<Vec<RgbId>>, TraceInfo)>> {
        (0..camera.height())
            .map(|y| self.render_row(camera, y, samples, mask, depth, notifier, cancelled))
            .collect()
    }
}
