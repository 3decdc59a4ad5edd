// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! Error type shared by all fallible operations in the crate.

use std::io;

/// Convenient alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All the ways the numeric and geometric machinery can fail.
///
/// Arithmetic and geometry errors propagate up to the render entry point and
/// abort the render; during tracing, a ray touching degenerate geometry is
/// treated as a miss instead (see [`crate::scene`]).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Matrix/vector operands of incompatible shape.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(&'static str),

    /// An index exceeded the valid range of a row, column, or channel.
    #[error("index ({row}, {col}) out of bounds for {rows}x{cols}")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Attempted to invert a matrix whose determinant is within tolerance
    /// of zero.
    #[error("matrix is singular, not invertible")]
    Singular,

    /// An operation requiring a square matrix (PLU, trace, determinant)
    /// was given a rectangular one.
    #[error("operation requires a square matrix, got {rows}x{cols}")]
    NonSquare { rows: usize, cols: usize },

    /// A scalar left the domain of the requested function; this usually
    /// indicates a broken invariant upstream.
    #[error("domain error: {0}")]
    Domain(&'static str),

    /// Geometry that cannot support the requested construction (zero-area
    /// triangle, zero normal, fully singular quadric, ...).
    #[error("degenerate geometry: {0}")]
    GeometryDegenerate(&'static str),

    /// Medium parameters violating `emissivity + reflectivity +
    /// transparency <= 1 + epsilon` or similar range rules.
    #[error("medium configuration rejected: {0}")]
    Config(&'static str),

    /// Image or matrix file could not be opened, read, written, or parsed.
    #[error("file error: {0}")]
    File(#[from] io::Error),

    /// A file parsed structurally but its contents were not usable.
    #[error("parse error: {0}")]
    Parse(&'static str),
}
