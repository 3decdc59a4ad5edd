// Copyright 2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

use criterion::{criterion_group, criterion_main, Criterion};

use beamtrace::camera::Camera;
use beamtrace::geometry::{basis, Point3, Ray};
use beamtrace::lights::Light;
use beamtrace::math::colors;
use beamtrace::mediums::Medium;
use beamtrace::objects::Object;
use beamtrace::scene::{RenderOptions, Scene};
use cgmath::Deg;
use std::sync::Arc;

fn trace_bench(c: &mut Criterion) {
    let metal = Arc::new(Medium::metal(colors::STEEL, 0.6, 40.0));
    let floor_medium = Arc::new(Medium::checkerboard(colors::WHITE, colors::DARK_SLATE_GRAY));
    let sphere = Object::sphere(Point3::new(0.0, 0.0, 1.0), 1.0, metal).unwrap();
    let floor = Object::plane(Point3::new(0.0, 0.0, 0.0), basis::Z, floor_medium).unwrap();
    let light = Light::Speck {
        position: Point3::new(5.0, 5.0, 10.0),
        color: colors::WHITE,
        intensity: 200.0,
    };
    let mut scene = Scene::new(0.001);
    scene.add_object(&sphere);
    scene.add_object(&floor);
    scene.add_light(&light);

    c.bench_function("trace single ray", |b| {
        let ray = Ray::new(Point3::new(0.0, -5.0, 2.0), basis::Y);
        b.iter(|| scene.trace(&ray, 4).unwrap())
    });

    c.bench_function("render 32x32", |b| {
        b.iter(|| {
            let mut camera = Camera::new(
                32,
                32,
                Point3::new(0.0, -6.0, 3.0),
                Point3::new(0.0, 0.0, 1.0),
                Deg(60.0),
            )
            .unwrap();
            let options = RenderOptions {
                number_of_samples: 1,
                reflection_depth: 3,
                ..RenderOptions::default()
            };
            scene.render(&mut camera, &options, None).unwrap()
        })
    });
}

criterion_group!(benches, trace_bench);
criterion_main!(benches);
