//! Circuit validation.

use crate::components::Device;
use crate::error::{KirchhoffError, Result};

use super::Circuit;

/// Validate a circuit before analysis.
///
/// Checks:
/// - Every wire end names a terminal of this circuit
/// - Device values are finite and in range
pub fn validate_circuit(circuit: &Circuit) -> Result<()> {
    for wire in &circuit.wires {
        for end in wire.ends.iter().flatten() {
            if end.0 >= circuit.terminals.len() {
                return Err(KirchhoffError::DanglingTerminal {
                    terminal: end.to_string(),
                });
            }
        }
    }

    for device in &circuit.devices {
        match device {
            Device::Battery(b) if !b.emf.is_finite() => {
                return Err(KirchhoffError::invalid_parameter(&b.name, "emf", "must be finite"));
            }
            Device::Resistor(r) if r.resistance.is_nan() => {
                return Err(KirchhoffError::invalid_parameter(&r.name, "resistance", "must be a number"));
            }
            Device::Potentiometer(p) if !(p.total_resistance >= 0.0) => {
                return Err(KirchhoffError::invalid_parameter(
                    &p.name,
                    "total",
                    "must be a non-negative number",
                ));
            }
            _ => {}
        }
    }

    Ok(())
}
