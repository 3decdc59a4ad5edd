// Copyright 2020 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Beamtrace is a recursive ray tracer over analytically defined surfaces:
//! spheres, planes, boxes, quadrics, tori, triangles, and Boolean
//! combinations of them, lit by a Phong-style local model plus reflection
//! and refraction, with gamma handled correctly end to end.
//!
//! This crate is the numerical and geometric core; for a runnable scene
//! see the `beamtrace-cli` crate.

#![allow(clippy::collapsible_if)]
#![warn(clippy::cast_lossless)]

pub mod camera;
pub mod error;
pub mod geometry;
pub mod image;
pub mod lights;
pub mod linalg;
pub mod math;
pub mod mediums;
pub mod objects;
pub mod scene;
