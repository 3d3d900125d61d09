//! Dense linear system solving.

use super::equations::Equation;
use crate::error::{KirchhoffError, Result};

/// Square linear system Ax = z over branch currents.
#[derive(Debug, Clone)]
pub struct EquationSystem {
    /// Coefficient matrix A (row-major)
    pub a: Vec<f64>,
    /// Constant vector z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
}

impl EquationSystem {
    /// Create an all-zero system of the given size.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
        }
    }

    /// Load accepted equations, sparsest rows first.
    ///
    /// Returns `None` unless there are exactly as many equations as
    /// unknowns.
    pub fn from_equations(equations: &[Equation], unknowns: usize, epsilon: f64) -> Option<Self> {
        if equations.len() != unknowns {
            return None;
        }
        let mut order: Vec<&Equation> = equations.iter().collect();
        order.sort_by_key(|e| e.nonzero_count(epsilon));

        let mut system = Self::new(unknowns);
        for (row, eq) in order.iter().enumerate() {
            for (col, &c) in eq.coefficients.iter().enumerate() {
                system.set(row, col, c);
            }
            system.z[row] = eq.constant;
        }
        Some(system)
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.a[row * self.size + col]
    }

    /// Set matrix element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] = value;
    }

    /// Largest current any single row implies on its own: `|z_i|` over the
    /// row's largest coefficient. Zero when every constant is zero.
    pub fn current_scale(&self) -> f64 {
        let n = self.size;
        (0..n)
            .map(|i| {
                let row = row_scale(&self.a[i * n..(i + 1) * n]);
                if row > 0.0 {
                    self.z[i].abs() / row
                } else {
                    0.0
                }
            })
            .fold(0.0_f64, f64::max)
    }

    /// Solve by Gaussian elimination with partial pivoting, reducing to
    /// diagonal form and reading each unknown off its row.
    ///
    /// The matrix itself is left untouched. Rows are equilibrated to a
    /// largest coefficient of one first, so a pivot below `epsilon` fails
    /// with [`KirchhoffError::SingularSystem`] whatever the units of its row.
    pub fn solve(&mut self, epsilon: f64) -> Result<&[f64]> {
        let n = self.size;
        let mut m = self.a.clone();
        let mut z = self.z.clone();

        for i in 0..n {
            let scale = row_scale(&m[i * n..(i + 1) * n]);
            if scale == 0.0 {
                return Err(KirchhoffError::SingularSystem);
            }
            for v in &mut m[i * n..(i + 1) * n] {
                *v /= scale;
            }
            z[i] /= scale;
        }

        // Eliminate downward to upper triangular form
        for k in 0..n {
            let mut max_val = m[k * n + k].abs();
            let mut max_row = k;
            for i in (k + 1)..n {
                let val = m[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if max_val <= epsilon {
                return Err(KirchhoffError::SingularSystem);
            }

            if max_row != k {
                for j in 0..n {
                    m.swap(k * n + j, max_row * n + j);
                }
                z.swap(k, max_row);
            }

            let pivot = m[k * n + k];
            for i in (k + 1)..n {
                let factor = m[i * n + k] / pivot;
                if factor == 0.0 {
                    continue;
                }
                for j in k..n {
                    m[i * n + j] -= factor * m[k * n + j];
                }
                z[i] -= factor * z[k];
            }
        }

        // Back-substitute upward to diagonal form
        for k in (0..n).rev() {
            let pivot = m[k * n + k];
            for i in 0..k {
                let factor = m[i * n + k] / pivot;
                if factor == 0.0 {
                    continue;
                }
                m[i * n + k] = 0.0;
                z[i] -= factor * z[k];
            }
        }

        for i in 0..n {
            self.x[i] = z[i] / m[i * n + i];
        }

        Ok(&self.x)
    }
}

fn row_scale(row: &[f64]) -> f64 {
    row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}
