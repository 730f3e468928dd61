//! Sparse storage for the global system.
//!
//! Element kernels are scattered into a [`TripletMatrix`] (one per Rayon
//! worker during assembly), merged, and compressed into nalgebra-sparse CSR.
//! Right-hand sides are dense [`LoadVector`]s.

use crate::error::{Error, Result};
use nalgebra::DMatrix;
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csr::CsrMatrix as NalgebraCsr;
use rayon::prelude::*;
use std::ops::AddAssign;

/// Global stiffness matrix storage.
pub type CsrMatrix = NalgebraCsr<f64>;

/// Coordinate-format accumulator. Repeated `(row, col)` entries are summed
/// when compressed with [`TripletMatrix::to_csr`].
#[derive(Debug, Clone)]
pub struct TripletMatrix {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl TripletMatrix {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    /// Reserve room for `nnz_estimate` entries.
    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz_estimate: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            rows: Vec::with_capacity(nnz_estimate),
            cols: Vec::with_capacity(nnz_estimate),
            values: Vec::with_capacity(nnz_estimate),
        }
    }

    /// Accumulate `value` at `(row, col)`. Exact zeros are not stored.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n_rows && col < self.n_cols);
        if value != 0.0 {
            self.rows.push(row);
            self.cols.push(col);
            self.values.push(value);
        }
    }

    /// Scatter an element matrix into the global rows/columns `dofs`.
    pub fn add_submatrix(&mut self, dofs: &[usize], local: &DMatrix<f64>) {
        debug_assert_eq!(local.shape(), (dofs.len(), dofs.len()));
        for (j, &col) in dofs.iter().enumerate() {
            for (i, &row) in dofs.iter().enumerate() {
                self.add(row, col, local[(i, j)]);
            }
        }
    }

    /// Move all entries of `other` into `self`.
    pub fn append(&mut self, mut other: TripletMatrix) {
        debug_assert_eq!((self.n_rows, self.n_cols), (other.n_rows, other.n_cols));
        self.rows.append(&mut other.rows);
        self.cols.append(&mut other.cols);
        self.values.append(&mut other.values);
    }

    /// Stored entries, duplicates included.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Compress to CSR.
    pub fn to_csr(self) -> Result<CsrMatrix> {
        let coo = CooMatrix::try_from_triplets(
            self.n_rows,
            self.n_cols,
            self.rows,
            self.cols,
            self.values,
        )
        .map_err(|e| Error::Assembly(format!("Invalid triplet data: {}", e)))?;
        Ok(CsrMatrix::from(&coo))
    }
}

/// Dense load vector with scatter-add.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadVector {
    values: Vec<f64>,
}

impl LoadVector {
    pub fn zeros(size: usize) -> Self {
        Self {
            values: vec![0.0; size],
        }
    }

    pub fn add(&mut self, index: usize, value: f64) {
        self.values[index] += value;
    }

    /// Scatter an element vector into the global entries `dofs`.
    pub fn add_subvector(&mut self, dofs: &[usize], local: &[f64]) {
        debug_assert_eq!(dofs.len(), local.len());
        for (&d, &v) in dofs.iter().zip(local) {
            self.values[d] += v;
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

impl AddAssign<&LoadVector> for LoadVector {
    fn add_assign(&mut self, rhs: &LoadVector) {
        debug_assert_eq!(self.values.len(), rhs.values.len());
        self.values
            .iter_mut()
            .zip(&rhs.values)
            .for_each(|(a, b)| *a += b);
    }
}

/// `y = A x`, rows in parallel.
pub fn spmv(matrix: &CsrMatrix, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(matrix.ncols(), x.len());
    debug_assert_eq!(matrix.nrows(), y.len());
    let offsets = matrix.row_offsets();
    let cols = matrix.col_indices();
    let vals = matrix.values();
    y.par_iter_mut().enumerate().for_each(|(i, yi)| {
        let range = offsets[i]..offsets[i + 1];
        *yi = cols[range.clone()]
            .iter()
            .zip(&vals[range])
            .map(|(&j, &a)| a * x[j])
            .sum();
    });
}

/// Main diagonal; missing entries read as zero.
pub fn diagonal(matrix: &CsrMatrix) -> Vec<f64> {
    matrix
        .row_iter()
        .enumerate()
        .map(|(i, row)| {
            row.col_indices()
                .binary_search(&i)
                .map(|k| row.values()[k])
                .unwrap_or(0.0)
        })
        .collect()
}
