// Copyright 2020-2021 the beamtrace developers under the terms of the MIT License as detailed
// in the accompanying file LICENSE or <https://opensource.org/licenses/MIT>.

//! The dense matrix engine: arbitrary-rank real matrices with row reduction,
//! PLU decomposition, determinants, inverses, null spaces, and rank.
//!
//! Logical rows resolve through a permutation vector layered over one
//! contiguous element buffer, so a row swap is a constant-time exchange of
//! indices and the buffer itself never moves.

use std::fmt;
use std::fs::File;
use std::io::{Read as _, Write as _};
use std::ops::{Index, IndexMut};
use std::path::Path;

use cgmath::{Point3, Vector3};
use rand::Rng as _;

use crate::error::{Error, Result};
use crate::math::{nearly_zero, quadratic_roots, Precision, EPSILON};

/// A heap-allocated matrix of [`Precision`] values.
///
/// Dimensions are immutable after construction and always at least 1×1.
/// Copies are deep ([`Clone`]).
#[derive(Clone)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    /// Maps logical row index to physical row index within `elems`.
    order: Vec<usize>,
    elems: Vec<Precision>,
}

impl Matrix {
    /// An all-zeros matrix. Fails unless `rows >= 1 && cols >= 1`.
    pub fn zeros(rows: usize, cols: usize) -> Result<Matrix> {
        if rows == 0 || cols == 0 {
            return Err(Error::DimensionMismatch("matrix must be at least 1x1"));
        }
        Ok(Matrix {
            rows,
            cols,
            order: (0..rows).collect(),
            elems: vec![0.0; rows * cols],
        })
    }

    /// An all-ones matrix.
    pub fn ones(rows: usize, cols: usize) -> Result<Matrix> {
        let mut m = Matrix::zeros(rows, cols)?;
        m.fill(1.0);
        Ok(m)
    }

    /// The identity; rectangular shapes put ones on the main diagonal.
    pub fn identity(rows: usize, cols: usize) -> Result<Matrix> {
        let mut m = Matrix::zeros(rows, cols)?;
        for i in 0..rows.min(cols) {
            m[(i, i)] = 1.0;
        }
        Ok(m)
    }

    /// Builds a matrix from nested rows; every row must have the same
    /// nonzero length.
    pub fn from_rows(data: Vec<Vec<Precision>>) -> Result<Matrix> {
        let rows = data.len();
        let cols = data.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(Error::DimensionMismatch("matrix must be at least 1x1"));
        }
        if data.iter().any(|r| r.len() != cols) {
            return Err(Error::DimensionMismatch("ragged rows"));
        }
        let mut m = Matrix::zeros(rows, cols)?;
        for (r, row) in data.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                m[(r, c)] = v;
            }
        }
        Ok(m)
    }

    /// A single-row matrix.
    pub fn row_matrix(data: Vec<Precision>) -> Result<Matrix> {
        Matrix::from_rows(vec![data])
    }

    /// A single-column matrix.
    pub fn col_matrix(data: Vec<Precision>) -> Result<Matrix> {
        Matrix::from_rows(data.into_iter().map(|v| vec![v]).collect())
    }

    /// Fills with uniform random values in `[min, max)`, rounded up to
    /// `digits` decimal places so printed matrices stay readable.
    pub fn random(
        rows: usize,
        cols: usize,
        min: Precision,
        max: Precision,
        digits: u32,
    ) -> Result<Matrix> {
        let mut m = Matrix::zeros(rows, cols)?;
        let mut rng = rand::thread_rng();
        let scale = (10.0 as Precision).powi(digits as i32);
        for v in m.elems.iter_mut() {
            *v = (rng.gen_range(min..max) * scale).ceil() / scale;
        }
        Ok(m)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    #[inline]
    fn off(&self, r: usize, c: usize) -> usize {
        assert!(c < self.cols, "column {} out of bounds", c);
        self.order[r] * self.cols + c
    }

    /// Checked 0-based element access.
    pub fn get(&self, r: usize, c: usize) -> Result<Precision> {
        if r >= self.rows || c >= self.cols {
            return Err(Error::OutOfBounds {
                row: r,
                col: c,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(self[(r, c)])
    }

    /// Checked 0-based element write.
    pub fn set(&mut self, r: usize, c: usize, v: Precision) -> Result<()> {
        if r >= self.rows || c >= self.cols {
            return Err(Error::OutOfBounds {
                row: r,
                col: c,
                rows: self.rows,
                cols: self.cols,
            });
        }
        self[(r, c)] = v;
        Ok(())
    }

    /// 1-based positional access, for direct transcription out of a linear
    /// algebra text. Panics outside `1..=rows`, `1..=cols`.
    #[inline]
    pub fn at(&self, r: usize, c: usize) -> Precision {
        assert!(r >= 1 && c >= 1, "at() is 1-based");
        self[(r - 1, c - 1)]
    }

    /// Sets every element to `v`.
    pub fn fill(&mut self, v: Precision) {
        for e in self.elems.iter_mut() {
            *e = v;
        }
    }

    /// Visits every element as `(row, col, value)`.
    pub fn for_each<F: FnMut(usize, usize, Precision)>(&self, mut f: F) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                f(r, c, self[(r, c)]);
            }
        }
    }

    /// Mutates every element in place via `(row, col, &mut value)`.
    pub fn for_each_mut<F: FnMut(usize, usize, &mut Precision)>(&mut self, mut f: F) {
        for r in 0..self.rows {
            for c in 0..self.cols {
                let i = self.off(r, c);
                f(r, c, &mut self.elems[i]);
            }
        }
    }

    // ----------------------------------------------------------------
    // Elementary row operations. `swap_rows` exchanges row handles and is
    // O(1); the others are O(cols).

    pub fn swap_rows(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_row(a)?;
        self.check_row(b)?;
        if a != b {
            self.order.swap(a, b);
        }
        Ok(())
    }

    pub fn scale_row(&mut self, r: usize, a: Precision) -> Result<()> {
        self.check_row(r)?;
        for c in 0..self.cols {
            let i = self.off(r, c);
            self.elems[i] *= a;
        }
        Ok(())
    }

    /// `A[dst,:] += a * A[src,:]`.
    pub fn add_row(&mut self, dst: usize, src: usize, a: Precision) -> Result<()> {
        self.check_row(dst)?;
        self.check_row(src)?;
        if dst == src {
            return Err(Error::DimensionMismatch("row add onto itself"));
        }
        for c in 0..self.cols {
            let s = self.off(src, c);
            let d = self.off(dst, c);
            self.elems[d] += a * self.elems[s];
        }
        Ok(())
    }

    /// `A[dst,:] -= a * A[src,:]`.
    pub fn sub_row(&mut self, dst: usize, src: usize, a: Precision) -> Result<()> {
        self.add_row(dst, src, -a)
    }

    fn check_row(&self, r: usize) -> Result<()> {
        if r >= self.rows {
            return Err(Error::OutOfBounds {
                row: r,
                col: 0,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }

    // ----------------------------------------------------------------
    // Zero tests (tolerance-based).

    pub fn row_is_zero(&self, r: usize, start_col: usize) -> bool {
        (start_col..self.cols).all(|c| nearly_zero(self[(r, c)]))
    }

    pub fn col_is_zero(&self, c: usize, start_row: usize) -> bool {
        (start_row..self.rows).all(|r| nearly_zero(self[(r, c)]))
    }

    // ----------------------------------------------------------------
    // Gauss-Jordan.

    /// Forward elimination to row-echelon form, pivoting on the
    /// largest-magnitude entry in the working column at or below the
    /// working row. Zero rows end up at the bottom. Returns `self` for
    /// chaining; pass `usize::MAX` to process every column.
    pub fn eschelon(&mut self, stop_col: usize) -> &mut Matrix {
        let stop_col = stop_col.min(self.cols);
        let mut r = 0;
        for c in 0..stop_col {
            if r >= self.rows {
                break;
            }
            // Largest available pivot in this column.
            let mut pivot = r;
            for i in (r + 1)..self.rows {
                if self[(i, c)].abs() > self[(pivot, c)].abs() {
                    pivot = i;
                }
            }
            if self[(pivot, c)].abs() <= EPSILON {
                continue;
            }
            self.order.swap(r, pivot);
            let lead = self[(r, c)];
            let _ = self.scale_row(r, 1.0 / lead);
            for i in (r + 1)..self.rows {
                let v = self[(i, c)];
                if !nearly_zero(v) {
                    let _ = self.sub_row(i, r, v);
                }
            }
            r += 1;
        }
        self
    }

    /// Copying form of [`Matrix::eschelon`].
    pub fn escheloned(&self, stop_col: usize) -> Matrix {
        let mut m = self.clone();
        m.eschelon(stop_col);
        m
    }

    /// Back-substitution over an echelon matrix: each pivot becomes the
    /// only nonzero entry in its column, over the first `stop_row` rows.
    pub fn reduce(&mut self, stop_row: usize) -> &mut Matrix {
        let stop_row = stop_row.min(self.rows);
        let lnz = self.leading_nonzero(usize::MAX);
        for (pr, &pc) in lnz.iter().enumerate() {
            if pc >= self.cols {
                continue; // zero row
            }
            for r in 0..stop_row {
                if r == pr {
                    continue;
                }
                let v = self[(r, pc)];
                if !nearly_zero(v) {
                    let _ = self.sub_row(r, pr, v);
                }
            }
        }
        self
    }

    /// Copying form of [`Matrix::reduce`].
    pub fn reduced(&self, stop_row: usize) -> Matrix {
        let mut m = self.clone();
        m.reduce(stop_row);
        m
    }

    /// Reduced row-echelon form, in place.
    pub fn rref(&mut self) -> &mut Matrix {
        self.eschelon(usize::MAX).reduce(usize::MAX)
    }

    /// Copying form of [`Matrix::rref`].
    pub fn rrefed(&self) -> Matrix {
        let mut m = self.clone();
        m.rref();
        m
    }

    /// Column index of each row's leading nonzero, or `usize::MAX` for a
    /// zero row.
    pub fn leading_nonzero(&self, stop_col: usize) -> Vec<usize> {
        let stop_col = stop_col.min(self.cols);
        (0..self.rows)
            .map(|r| {
                (0..stop_col)
                    .find(|&c| !nearly_zero(self[(r, c)]))
                    .unwrap_or(usize::MAX)
            })
            .collect()
    }

    /// Pivot column indexes. Meaningful on an [`Matrix::rref`]ed matrix.
    pub fn pivots(&self) -> Vec<usize> {
        self.leading_nonzero(usize::MAX)
            .into_iter()
            .filter(|&c| c < self.cols)
            .collect()
    }

    /// Free (non-pivot) column indexes. Meaningful on an
    /// [`Matrix::rref`]ed matrix.
    pub fn frees(&self) -> Vec<usize> {
        let pivots = self.pivots();
        (0..self.cols).filter(|c| !pivots.contains(c)).collect()
    }

    /// The number of linearly independent rows.
    pub fn rank(&self) -> usize {
        let m = self.rrefed();
        (0..m.rows).filter(|&r| !m.row_is_zero(r, 0)).count()
    }

    /// A basis of the right null space, one vector per column. Fails when
    /// the null space is trivial (no free variables).
    pub fn nullspace(&self) -> Result<Matrix> {
        let a = self.rrefed();
        let frees = a.frees();
        if frees.is_empty() {
            return Err(Error::Domain("matrix has a trivial null space"));
        }
        let pivots = a.pivots();
        let mut b = Matrix::zeros(a.cols, frees.len())?;
        for (nf, &fc) in frees.iter().enumerate() {
            for (pr, &pc) in pivots.iter().enumerate() {
                // The pivot of row `pr` sits in column `pc`; that variable
                // takes the negated RREF entry of the free column.
                b[(pc, nf)] = -a[(pr, fc)];
            }
            b[(fc, nf)] = 1.0;
        }
        Ok(b)
    }

    /// The pivot columns of the RREF, as a basis of the column space.
    pub fn basis(&self) -> Result<Matrix> {
        let a = self.rrefed();
        let pivots = a.pivots();
        if pivots.is_empty() {
            return Err(Error::Domain("matrix has no pivot columns"));
        }
        let mut b = Matrix::zeros(a.rows, pivots.len())?;
        for (n, &c) in pivots.iter().enumerate() {
            for r in 0..a.rows {
                b[(r, n)] = a[(r, c)];
            }
        }
        Ok(b)
    }

    // ----------------------------------------------------------------
    // Decomposition and determinants.

    /// PLU decomposition with partial pivoting: `P * A = L * U` with `P` a
    /// permutation, `L` unit-lower-triangular, and `U` upper-triangular.
    pub fn plu(&self) -> Result<(Matrix, Matrix, Matrix)> {
        if !self.is_square() {
            return Err(Error::NonSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let n = self.rows;
        let mut p = Matrix::identity(n, n)?;
        let mut l = Matrix::identity(n, n)?;
        let mut u = self.clone();
        for k in 0..n {
            let mut pivot = k;
            for i in (k + 1)..n {
                if u[(i, k)].abs() > u[(pivot, k)].abs() {
                    pivot = i;
                }
            }
            if u[(pivot, k)].abs() <= EPSILON {
                continue;
            }
            if pivot != k {
                u.order.swap(k, pivot);
                p.order.swap(k, pivot);
                // The already-filled multipliers move with their rows.
                for c in 0..k {
                    let a = l[(k, c)];
                    let b = l[(pivot, c)];
                    l[(k, c)] = b;
                    l[(pivot, c)] = a;
                }
            }
            for i in (k + 1)..n {
                let f = u[(i, k)] / u[(k, k)];
                if !nearly_zero(f) {
                    l[(i, k)] = f;
                    u.sub_row(i, k, f)?;
                }
                u[(i, k)] = 0.0;
            }
        }
        Ok((p, l, u))
    }

    /// Determinant: closed forms for orders 1 to 3 (Sarrus for 3),
    /// cofactor expansion along row 0 for order 4 and up.
    pub fn determinant(&self) -> Result<Precision> {
        if !self.is_square() {
            return Err(Error::NonSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(match self.rows {
            1 => self[(0, 0)],
            2 => self[(0, 0)] * self[(1, 1)] - self[(0, 1)] * self[(1, 0)],
            3 => {
                self[(0, 0)] * (self[(1, 1)] * self[(2, 2)] - self[(2, 1)] * self[(1, 2)])
                    - self[(0, 1)] * (self[(2, 2)] * self[(1, 0)] - self[(1, 2)] * self[(2, 0)])
                    + self[(0, 2)] * (self[(1, 0)] * self[(2, 1)] - self[(2, 0)] * self[(1, 1)])
            }
            _ => {
                let mut det = 0.0;
                for c in 0..self.cols {
                    det += self.cofactor(0, c)? * self[(0, c)];
                }
                det
            }
        })
    }

    /// The matrix with row `r` and column `c` removed.
    pub fn without(&self, r: usize, c: usize) -> Result<Matrix> {
        if self.rows < 2 || self.cols < 2 {
            return Err(Error::DimensionMismatch("nothing left to remove"));
        }
        let mut m = Matrix::zeros(self.rows - 1, self.cols - 1)?;
        let mut mr = 0;
        for sr in 0..self.rows {
            if sr == r {
                continue;
            }
            let mut mc = 0;
            for sc in 0..self.cols {
                if sc == c {
                    continue;
                }
                m[(mr, mc)] = self[(sr, sc)];
                mc += 1;
            }
            mr += 1;
        }
        Ok(m)
    }

    /// Determinant of the submatrix omitting row `r` and column `c`.
    pub fn minor(&self, r: usize, c: usize) -> Result<Precision> {
        self.without(r, c)?.determinant()
    }

    /// Signed minor.
    pub fn cofactor(&self, r: usize, c: usize) -> Result<Precision> {
        let sign = if (r + c) % 2 == 0 { 1.0 } else { -1.0 };
        Ok(self.minor(r, c)? * sign)
    }

    /// Matrix of minors.
    pub fn minors(&self) -> Result<Matrix> {
        let mut m = Matrix::zeros(self.rows, self.cols)?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                m[(r, c)] = self.minor(r, c)?;
            }
        }
        Ok(m)
    }

    /// Matrix of cofactors.
    pub fn comatrix(&self) -> Result<Matrix> {
        let mut m = Matrix::zeros(self.rows, self.cols)?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                m[(r, c)] = self.cofactor(r, c)?;
            }
        }
        Ok(m)
    }

    /// Transpose of the comatrix.
    pub fn adjugate(&self) -> Result<Matrix> {
        Ok(self.comatrix()?.transpose())
    }

    /// Inverse: reciprocal for 1×1, closed form for 2×2, adjugate over
    /// determinant above that. Fails with [`Error::Singular`] when the
    /// determinant is within tolerance of zero.
    pub fn inverse(&self) -> Result<Matrix> {
        let det = self.determinant()?;
        if nearly_zero(det) {
            return Err(Error::Singular);
        }
        match self.rows {
            1 => Matrix::from_rows(vec![vec![1.0 / det]]),
            2 => Matrix::from_rows(vec![
                vec![self[(1, 1)] / det, -self[(0, 1)] / det],
                vec![-self[(1, 0)] / det, self[(0, 0)] / det],
            ]),
            _ => Ok(scale(&self.adjugate()?, 1.0 / det)),
        }
    }

    pub fn transpose(&self) -> Matrix {
        let mut m = Matrix {
            rows: self.cols,
            cols: self.rows,
            order: (0..self.cols).collect(),
            elems: vec![0.0; self.rows * self.cols],
        };
        for r in 0..self.rows {
            for c in 0..self.cols {
                m[(c, r)] = self[(r, c)];
            }
        }
        m
    }

    /// Sum of the main diagonal.
    pub fn trace(&self) -> Result<Precision> {
        if !self.is_square() {
            return Err(Error::NonSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok((0..self.rows).map(|i| self[(i, i)]).sum())
    }

    /// Copies a rectangular region into a new matrix.
    pub fn subset(&self, row: usize, col: usize, nrows: usize, ncols: usize) -> Result<Matrix> {
        if row + nrows > self.rows || col + ncols > self.cols {
            return Err(Error::DimensionMismatch("subset exceeds parent"));
        }
        let mut m = Matrix::zeros(nrows, ncols)?;
        for r in 0..nrows {
            for c in 0..ncols {
                m[(r, c)] = self[(row + r, col + c)];
            }
        }
        Ok(m)
    }

    /// A single row as a 1×cols matrix.
    pub fn row(&self, r: usize) -> Result<Matrix> {
        self.subset(r, 0, 1, self.cols)
    }

    /// A single column as a rows×1 matrix.
    pub fn col(&self, c: usize) -> Result<Matrix> {
        self.subset(0, c, self.rows, 1)
    }

    /// Reinterprets the elements, in logical row-major order, as a matrix
    /// of different dimensions with the same element count.
    pub fn resize(&self, rows: usize, cols: usize) -> Result<Matrix> {
        if rows * cols != self.rows * self.cols {
            return Err(Error::DimensionMismatch(
                "resize must preserve the element count",
            ));
        }
        let mut m = Matrix::zeros(rows, cols)?;
        for i in 0..rows * cols {
            m.elems[i] = self[(i / self.cols, i % self.cols)];
        }
        Ok(m)
    }

    // ----------------------------------------------------------------
    // Predicates. All of these are tolerance-based and return false for
    // shapes they do not apply to.

    pub fn singular(&self) -> bool {
        self.is_square() && nearly_zero(self.determinant().unwrap_or(0.0))
    }

    pub fn invertible(&self) -> bool {
        self.is_square() && !self.singular()
    }

    /// `A * At == At * A == I`.
    pub fn orthogonal(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let t = self.transpose();
        let i = match Matrix::identity(self.rows, self.cols) {
            Ok(i) => i,
            Err(_) => return false,
        };
        match (multiply(self, &t), multiply(&t, self)) {
            (Ok(a), Ok(b)) => a == i && b == i,
            _ => false,
        }
    }

    pub fn symmetric(&self) -> bool {
        self.is_square() && *self == self.transpose()
    }

    pub fn skew_symmetric(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let t = self.transpose();
        self.elems_match(&t, |a, b| (a + b).abs() <= EPSILON)
    }

    pub fn diagonal(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let mut ok = true;
        self.for_each(|r, c, v| {
            if r != c && !nearly_zero(v) {
                ok = false;
            }
        });
        ok
    }

    pub fn upper_triangular(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let mut ok = true;
        self.for_each(|r, c, v| {
            if r > c && !nearly_zero(v) {
                ok = false;
            }
        });
        ok
    }

    pub fn lower_triangular(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let mut ok = true;
        self.for_each(|r, c, v| {
            if r < c && !nearly_zero(v) {
                ok = false;
            }
        });
        ok
    }

    pub fn triangular(&self) -> bool {
        self.upper_triangular() || self.lower_triangular()
    }

    /// Whether `lambda` is an eigenvalue, i.e. `det(A - lambda*I)` is
    /// within tolerance of zero.
    pub fn eigenvalue(&self, lambda: Precision) -> bool {
        if !self.is_square() {
            return false;
        }
        let mut shifted = self.clone();
        for i in 0..self.rows {
            shifted[(i, i)] -= lambda;
        }
        nearly_zero(shifted.determinant().unwrap_or(Precision::NAN))
    }

    /// Eigenvalues of a 2×2 matrix, the roots of
    /// `lambda^2 - tr(A)*lambda + det(A)`. Larger orders go through the
    /// root solvers directly and are not provided here.
    pub fn eigenvalues_2x2(&self) -> Result<(Precision, Precision)> {
        if self.rows != 2 || self.cols != 2 {
            return Err(Error::NonSquare {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(quadratic_roots(1.0, -self.trace()?, self.determinant()?))
    }

    fn elems_match<F: Fn(Precision, Precision) -> bool>(&self, other: &Matrix, f: F) -> bool {
        if self.rows != other.rows || self.cols != other.cols {
            return false;
        }
        for r in 0..self.rows {
            for c in 0..self.cols {
                if !f(self[(r, c)], other[(r, c)]) {
                    return false;
                }
            }
        }
        true
    }

    // ----------------------------------------------------------------
    // Persistence: `rows` and `cols` as native-endian `usize`, then the
    // elements in logical row-major order as native-endian `Precision`.

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut f = File::create(path)?;
        f.write_all(&self.rows.to_ne_bytes())?;
        f.write_all(&self.cols.to_ne_bytes())?;
        for r in 0..self.rows {
            for c in 0..self.cols {
                f.write_all(&self[(r, c)].to_ne_bytes())?;
            }
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Matrix> {
        let mut f = File::open(path)?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)?;
        let word = std::mem::size_of::<usize>();
        if buf.len() < 2 * word {
            return Err(Error::Parse("matrix file shorter than its header"));
        }
        let mut word_bytes = [0u8; std::mem::size_of::<usize>()];
        word_bytes.copy_from_slice(&buf[0..word]);
        let rows = usize::from_ne_bytes(word_bytes);
        word_bytes.copy_from_slice(&buf[word..2 * word]);
        let cols = usize::from_ne_bytes(word_bytes);
        let elem = std::mem::size_of::<Precision>();
        if buf.len() != 2 * word + rows * cols * elem {
            return Err(Error::Parse("matrix file length does not match header"));
        }
        let mut m = Matrix::zeros(rows, cols)?;
        let mut elem_bytes = [0u8; std::mem::size_of::<Precision>()];
        for i in 0..rows * cols {
            let start = 2 * word + i * elem;
            elem_bytes.copy_from_slice(&buf[start..start + elem]);
            m.elems[i] = Precision::from_ne_bytes(elem_bytes);
        }
        Ok(m)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Precision;
    #[inline]
    fn index(&self, (r, c): (usize, usize)) -> &Precision {
        let i = self.off(r, c);
        &self.elems[i]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (r, c): (usize, usize)) -> &mut Precision {
        let i = self.off(r, c);
        &mut self.elems[i]
    }
}

/// Tolerance-based elementwise comparison.
impl PartialEq for Matrix {
    fn eq(&self, other: &Matrix) -> bool {
        self.elems_match(other, |a, b| (a - b).abs() <= EPSILON)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "matrix {}x{} {{", self.rows, self.cols)?;
        for r in 0..self.rows {
            write!(f, "  [")?;
            for c in 0..self.cols {
                if c > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self[(r, c)])?;
            }
            writeln!(f, "]")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// --------------------------------------------------------------------
// Free operations, mirroring the non-member layer of the engine.

/// `a + b`, elementwise.
pub fn addition(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    if a.rows != b.rows || a.cols != b.cols {
        return Err(Error::DimensionMismatch("addition needs equal shapes"));
    }
    let mut m = a.clone();
    m.for_each_mut(|r, c, v| *v += b[(r, c)]);
    Ok(m)
}

/// `a - b`, elementwise.
pub fn subtraction(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    if a.rows != b.rows || a.cols != b.cols {
        return Err(Error::DimensionMismatch("subtraction needs equal shapes"));
    }
    let mut m = a.clone();
    m.for_each_mut(|r, c, v| *v -= b[(r, c)]);
    Ok(m)
}

/// Matrix product.
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    if a.cols != b.rows {
        return Err(Error::DimensionMismatch("inner dimensions must match"));
    }
    let mut m = Matrix::zeros(a.rows, b.cols)?;
    for r in 0..m.rows {
        for c in 0..m.cols {
            let mut acc = 0.0;
            for i in 0..a.cols {
                acc += a[(r, i)] * b[(i, c)];
            }
            m[(r, c)] = acc;
        }
    }
    Ok(m)
}

/// `a * r` for a scalar `r`.
pub fn scale(a: &Matrix, r: Precision) -> Matrix {
    let mut m = a.clone();
    m.for_each_mut(|_, _, v| *v *= r);
    m
}

/// Elementwise (Hadamard) product.
pub fn hadamard(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    if a.rows != b.rows || a.cols != b.cols {
        return Err(Error::DimensionMismatch("hadamard needs equal shapes"));
    }
    let mut m = a.clone();
    m.for_each_mut(|r, c, v| *v *= b[(r, c)]);
    Ok(m)
}

/// Joins horizontally: m×n | m×k -> m×(n+k).
pub fn rowjoin(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    if a.rows != b.rows {
        return Err(Error::DimensionMismatch("rowjoin needs equal row counts"));
    }
    let mut m = Matrix::zeros(a.rows, a.cols + b.cols)?;
    for r in 0..a.rows {
        for c in 0..a.cols {
            m[(r, c)] = a[(r, c)];
        }
        for c in 0..b.cols {
            m[(r, a.cols + c)] = b[(r, c)];
        }
    }
    Ok(m)
}

/// Joins vertically: m×n over k×n -> (m+k)×n.
pub fn coljoin(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    if a.cols != b.cols {
        return Err(Error::DimensionMismatch(
            "coljoin needs equal column counts",
        ));
    }
    let mut m = Matrix::zeros(a.rows + b.rows, a.cols)?;
    for c in 0..a.cols {
        for r in 0..a.rows {
            m[(r, c)] = a[(r, c)];
        }
        for r in 0..b.rows {
            m[(a.rows + r, c)] = b[(r, c)];
        }
    }
    Ok(m)
}

/// `M * v` for a 3×3 matrix.
pub fn multiply_vector3(m: &Matrix, v: Vector3<Precision>) -> Result<Vector3<Precision>> {
    if m.rows != 3 || m.cols != 3 {
        return Err(Error::DimensionMismatch("vector multiply needs 3x3"));
    }
    Ok(Vector3::new(
        m[(0, 0)] * v.x + m[(0, 1)] * v.y + m[(0, 2)] * v.z,
        m[(1, 0)] * v.x + m[(1, 1)] * v.y + m[(1, 2)] * v.z,
        m[(2, 0)] * v.x + m[(2, 1)] * v.y + m[(2, 2)] * v.z,
    ))
}

/// `M * p` for a 3×3 matrix.
pub fn multiply_point3(m: &Matrix, p: Point3<Precision>) -> Result<Point3<Precision>> {
    use cgmath::EuclideanSpace as _;
    Ok(Point3::from_vec(multiply_vector3(m, p.to_vec())?))
}
