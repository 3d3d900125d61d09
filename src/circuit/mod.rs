//! Circuit graph representation and validation.
//!
//! This module holds the raw component graph supplied by the editor. The
//! [`Circuit`] struct owns devices, their terminals and the wires joining
//! them; everything the analyzer derives from it is rebuilt per pass.

mod graph;
mod types;
mod validate;

pub use graph::{Circuit, Terminal, Wire};
pub use types::*;
pub use validate::validate_circuit;
