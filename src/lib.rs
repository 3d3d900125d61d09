//! # Kirchhoff Core
//!
//! Topology discovery and Kirchhoff equation solving for DC schematics.
//!
//! This library provides:
//! - A component graph of devices, terminals and wires, with fault injection
//! - Node, segment, branch and loop discovery over that graph
//! - KVL/KCL equation synthesis and a dense linear solver
//! - Branch currents, node potentials, meter readings and fault
//!   classification (open circuit, power short, bridge, ...)
//!
//! ## Architecture
//!
//! - [`dsl`] - Parser for the netlist description language
//! - [`circuit`] - Component graph representation and validation
//! - [`components`] - Device models and the [`components::Resistance`] value
//! - [`topology`] - Nodes, segments, branches, loops and loop filtering
//! - [`solver`] - Equations, solving, propagation and classification
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! kirchhoff circuit.cir --verbose
//! ```
//!
//! ### Library
//!
//! ```
//! use kirchhoff_core::{dsl, Analyzer, Circuit, Classification};
//!
//! let ast = dsl::parse(
//!     "BAT1 9\n\
//!      R1 30\n\
//!      W1 BAT1.pos R1.left\n\
//!      W2 R1.right BAT1.neg\n",
//! )?;
//! let circuit = Circuit::from_ast(ast)?;
//! let analysis = Analyzer::new().analyze(&circuit)?;
//! assert_eq!(analysis.classification(), Classification::Basic);
//! # Ok::<(), kirchhoff_core::KirchhoffError>(())
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmAnalyzer } from 'kirchhoff_core';
//!
//! const analyzer = new WasmAnalyzer(netlist);
//! analyzer.toggle_switch("SW1");
//! console.log(analyzer.classification(), analyzer.current("R1"));
//! ```
//!
//! ## Analysis Pipeline
//!
//! Every call to [`Analyzer::analyze`] rebuilds all derived state:
//!
//! 1. Merge terminals joined by ideal conductors into nodes
//! 2. Build one segment per device terminal pair and per wire
//! 3. Chain segments through two-way nodes into branches
//! 4. Enumerate the loops through each source and filter them
//! 5. Solve KVL/KCL for branch currents, then propagate currents and
//!    potentials to everything else

pub mod circuit;
pub mod components;
pub mod dsl;
pub mod error;
pub mod solver;
pub mod topology;

// Re-export main types for convenience
pub use circuit::Circuit;
pub use error::{KirchhoffError, Result};
pub use solver::{Analysis, Analyzer, AnalyzerConfig, Classification};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmAnalyzer;
