//! Kirchhoff equation solver.
//!
//! This module turns the filtered topology into currents and potentials.
//!
//! ## Branch current analysis
//!
//! Each valid branch with a finite, positive resistance gets one unknown
//! current. The system Ax = z is assembled from:
//! - one KVL row per eligible loop: `sum(±R_b * i_b) = sum(±emf_b)`
//! - KCL rows at nodes when the loops leave the system short:
//!   `sum(±i_b) = 0`
//!
//! Rows that are linearly dependent on accepted rows are dropped. The
//! square system is solved by Gaussian elimination with partial pivoting.
//! Zero-resistance branches and segments merged into nodes receive their
//! currents afterwards from current balance, and node potentials follow by
//! walking the loops from a reference node.

mod analyzer;
mod classify;
pub mod equations;
mod linear;
mod potentials;
mod propagate;

pub use analyzer::{Analysis, Analyzer, AnalyzerConfig};
pub use classify::{bridge_branches, classify, Classification};
pub use equations::{Equation, EquationKind};
pub use linear::EquationSystem;

/// Default cap on discovery depth.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Default cap on distinct loops.
pub const DEFAULT_MAX_LOOPS: usize = 50;

/// Default numeric tolerance.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Default pass limit for current and potential propagation.
pub const DEFAULT_MAX_PASSES: usize = 64;
