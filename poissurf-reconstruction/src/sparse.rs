//! Compressed sparse row systems and a preconditioned conjugate gradient solver

use crate::error::{ReconstructionError, Result};
use crate::parallel::execute_parallel;
use nalgebra::DVector;
use rayon::prelude::*;
use tracing::debug;

/// Symmetric positive definite system `A x = b` in CSR form.
///
/// Row `i` stands for the triangulation vertex `unknowns[i]`.
#[derive(Debug, Clone)]
pub struct SparseSystem {
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
    values: Vec<f64>,
    pub rhs: DVector<f64>,
    pub unknowns: Vec<usize>,
}

impl SparseSystem {
    /// Build from per-row `(column, value)` entries. Entries are sorted by
    /// column and duplicates are summed.
    pub fn from_rows(rows: Vec<Vec<(usize, f64)>>, rhs: DVector<f64>, unknowns: Vec<usize>) -> Self {
        debug_assert_eq!(rows.len(), rhs.len());
        debug_assert_eq!(rows.len(), unknowns.len());

        let mut row_offsets = Vec::with_capacity(rows.len() + 1);
        let mut columns = Vec::new();
        let mut values = Vec::new();
        row_offsets.push(0);
        for mut row in rows {
            row.sort_by_key(|&(col, _)| col);
            let start = columns.len();
            for (col, value) in row {
                if columns.len() > start && columns[columns.len() - 1] == col {
                    let last = values.len() - 1;
                    values[last] += value;
                } else {
                    columns.push(col);
                    values.push(value);
                }
            }
            row_offsets.push(columns.len());
        }

        Self {
            row_offsets,
            columns,
            values,
            rhs,
            unknowns,
        }
    }

    pub fn dim(&self) -> usize {
        self.row_offsets.len() - 1
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored entries of row `i` as `(column, value)`
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_offsets[i]..self.row_offsets[i + 1];
        self.columns[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.row(i).find(|&(col, _)| col == j).map_or(0.0, |(_, v)| v)
    }

    pub fn diagonal(&self) -> DVector<f64> {
        DVector::from_iterator(self.dim(), (0..self.dim()).map(|i| self.get(i, i)))
    }

    /// `A x`, rows computed in parallel and collected in order
    pub fn multiply(&self, x: &DVector<f64>) -> DVector<f64> {
        let n = self.dim();
        let product: Vec<f64> = execute_parallel(|| {
            (0..n)
                .into_par_iter()
                .map(|i| self.row(i).map(|(j, v)| v * x[j]).sum())
                .collect()
        });
        DVector::from_vec(product)
    }
}

/// Output of a successful solve
#[derive(Debug, Clone)]
pub struct Solution {
    pub values: DVector<f64>,
    pub iterations: usize,
    /// Final relative residual `|b - A x| / |b|`
    pub residual: f64,
}

/// Jacobi-preconditioned conjugate gradient.
///
/// Stops when the relative residual drops to `tolerance`. Fails with
/// `DidNotConverge` after `max_iterations` or on a breakdown of the
/// recurrence (non positive definite matrix).
pub fn solve(system: &SparseSystem, tolerance: f64, max_iterations: usize) -> Result<Solution> {
    let n = system.dim();
    let b = &system.rhs;
    let b_norm = b.norm();
    if n == 0 || b_norm == 0.0 {
        return Ok(Solution {
            values: DVector::zeros(n),
            iterations: 0,
            residual: 0.0,
        });
    }

    let inv_diag = system.diagonal().map(|d| if d > 0.0 { 1.0 / d } else { 1.0 });
    let mut x = DVector::zeros(n);
    let mut r = b.clone();
    let mut z = r.component_mul(&inv_diag);
    let mut p = z.clone();
    let mut rz = r.dot(&z);
    let mut residual = 1.0;

    for iteration in 1..=max_iterations {
        let ap = system.multiply(&p);
        let pap = p.dot(&ap);
        if !(pap > 0.0) {
            debug!("Conjugate gradient breakdown at iteration {} (pAp = {:e})", iteration, pap);
            return Err(ReconstructionError::DidNotConverge {
                iterations: iteration,
                residual,
                tolerance,
            });
        }

        let alpha = rz / pap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);
        residual = r.norm() / b_norm;
        if residual <= tolerance {
            debug!("Conjugate gradient converged in {} iterations, residual {:e}", iteration, residual);
            return Ok(Solution {
                values: x,
                iterations: iteration,
                residual,
            });
        }

        z = r.component_mul(&inv_diag);
        let rz_next = r.dot(&z);
        let beta = rz_next / rz;
        rz = rz_next;
        p = &z + &p * beta;
    }

    Err(ReconstructionError::DidNotConverge {
        iterations: max_iterations,
        residual,
        tolerance,
    })
}
