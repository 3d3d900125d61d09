//! Linear passive loads.

use super::{Element, Resistance, TWO_TERMINALS};
use crate::circuit::{Fault, TerminalKey};

/// A resistor.
#[derive(Debug, Clone)]
pub struct Resistor {
    pub name: String,
    /// Resistance in ohms; zero or negative values behave as a short
    pub resistance: f64,
    pub fault: Fault,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(name: impl Into<String>, resistance: f64) -> Self {
        Self {
            name: name.into(),
            resistance,
            fault: Fault::None,
        }
    }

    /// Power dissipated for a given current.
    pub fn power(&self, current: f64) -> f64 {
        current * current * self.resistance.max(0.0)
    }
}

impl Element for Resistor {
    fn name(&self) -> &str {
        &self.name
    }

    fn terminal_keys(&self) -> &'static [TerminalKey] {
        TWO_TERMINALS
    }

    fn fault(&self) -> Fault {
        self.fault
    }

    fn nominal_resistance(&self, a: TerminalKey, b: TerminalKey) -> Resistance {
        if a == b {
            Resistance::Short
        } else {
            Resistance::ohms(self.resistance)
        }
    }
}
