// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Renders a small demonstration scene and writes `beamtrace-demo.ppm`.
//!
//! This binary is deliberately a thin shim over the library: a scene, a
//! camera, a render call, a save. Scene files and argument parsing are
//! out of scope for the core (see the library documentation).

use std::path::Path;
use std::sync::Arc;

use cgmath::Deg;

use beamtrace::camera::Camera;
use beamtrace::error::Result;
use beamtrace::geometry::{basis, Point3, Vector3};
use beamtrace::lights::Light;
use beamtrace::math::{colors, Color};
use beamtrace::mediums::Medium;
use beamtrace::objects::{Object, OverlapMode};
use beamtrace::scene::{RenderOptions, Scene};

fn main() {
    if let Err(e) = run() {
        eprintln!("render failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let steel = Arc::new(Medium::metal(colors::STEEL, 0.7, 60.0));
    let copper = Arc::new(Medium::metal(colors::COPPER, 0.4, 30.0));
    let glass = Arc::new(Medium::glass(1.5, 0.05));
    let floor_medium = Arc::new(Medium::checkerboard(colors::WHITE, colors::DARK_SLATE_GRAY));

    let floor = Object::plane(Point3::new(0.0, 0.0, 0.0), basis::Z, floor_medium)?;
    let ball = Object::sphere(Point3::new(-2.5, 0.0, 1.0), 1.0, steel)?;
    let marble = Object::sphere(Point3::new(2.5, 0.0, 1.0), 1.0, glass)?;
    // A copper lens: the intersection of two offset spheres.
    let lens = {
        let a = Object::sphere(Point3::new(0.0, -0.6, 1.0), 1.0, copper.clone())?;
        let b = Object::sphere(Point3::new(0.0, 0.6, 1.0), 1.0, copper.clone())?;
        Object::overlap(a, b, OverlapMode::Inclusive, copper)
    };

    let key = Light::Speck {
        position: Point3::new(6.0, -4.0, 8.0),
        color: colors::WHITE,
        intensity: 120.0,
    };
    let fill = Light::Beam {
        direction: Vector3::new(-0.2, 0.3, -1.0),
        color: colors::LIGHT_SKY_BLUE,
        intensity: 0.15,
    };

    let mut scene = Scene::new(0.001);
    scene.add_object(&floor);
    scene.add_object(&ball);
    scene.add_object(&marble);
    scene.add_object(&lens);
    scene.add_light(&key);
    scene.add_light(&fill);
    scene.set_background(|ray| {
        // A simple vertical sky gradient.
        let t = (ray.direction.z * 0.5 + 0.5).clamp(0.0, 1.0);
        beamtrace::math::interpolate(Color::new(0.8, 0.85, 0.95), colors::NAVY, t)
    });

    let mut camera = Camera::new(
        640,
        360,
        Point3::new(0.0, -9.0, 3.5),
        Point3::new(0.0, 0.0, 1.0),
        Deg(55.0),
    )?;

    let options = RenderOptions {
        number_of_samples: 4,
        reflection_depth: 5,
        adaptive_mask_threshold: 24,
        filter_capture: false,
    };
    let info = scene.render(
        &mut camera,
        &options,
        Some(&|row: usize| {
            if row % 36 == 0 {
                eprintln!("row {} done", row);
            }
            true
        }),
    )?;
    eprintln!(
        "cast {} rays ({} bounced, {} transmitted, {} saved by the cutoff)",
        info.cast_rays, info.bounced_rays, info.transmitted_rays, info.saved_bounces
    );

    camera.capture.save(Path::new("beamtrace-demo.ppm"))?;
    eprintln!("wrote beamtrace-demo.ppm");
    Ok(())
}
