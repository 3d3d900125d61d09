//! Ideal meters.

use super::{Element, Resistance, TWO_TERMINALS};
use crate::circuit::{Fault, TerminalKey};

/// An ideal ammeter: zero resistance, reads the current through it.
#[derive(Debug, Clone)]
pub struct Ammeter {
    pub name: String,
    pub fault: Fault,
}

impl Ammeter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fault: Fault::None,
        }
    }
}

impl Element for Ammeter {
    fn name(&self) -> &str {
        &self.name
    }

    fn terminal_keys(&self) -> &'static [TerminalKey] {
        TWO_TERMINALS
    }

    fn fault(&self) -> Fault {
        self.fault
    }

    fn nominal_resistance(&self, _a: TerminalKey, _b: TerminalKey) -> Resistance {
        Resistance::Short
    }
}

/// An ideal voltmeter: open circuit, reads V(right) - V(left).
#[derive(Debug, Clone)]
pub struct Voltmeter {
    pub name: String,
    pub fault: Fault,
}

impl Voltmeter {
    pub const NEGATIVE: TerminalKey = TerminalKey::Left;
    pub const POSITIVE: TerminalKey = TerminalKey::Right;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fault: Fault::None,
        }
    }
}

impl Element for Voltmeter {
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
            Resistance::Open
        }
    }
}
