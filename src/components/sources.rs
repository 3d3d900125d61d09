//! Voltage sources.

use super::{Element, Resistance, SourceInfo, TWO_TERMINALS};
use crate::circuit::{Fault, TerminalKey};

/// A battery (ideal EMF with optional internal resistance).
///
/// The negative terminal is [`TerminalKey::Left`], the positive one
/// [`TerminalKey::Right`]. Inside the battery current is driven from
/// negative to positive.
#[derive(Debug, Clone)]
pub struct Battery {
    pub name: String,
    /// Electromotive force in volts
    pub emf: f64,
    /// Internal resistance (short for an ideal cell)
    pub internal: Resistance,
    pub fault: Fault,
}

impl Battery {
    pub const NEGATIVE: TerminalKey = TerminalKey::Left;
    pub const POSITIVE: TerminalKey = TerminalKey::Right;

    /// Create an ideal battery.
    pub fn new(name: impl Into<String>, emf: f64) -> Self {
        Self {
            name: name.into(),
            emf,
            internal: Resistance::Short,
            fault: Fault::None,
        }
    }

    /// Set the internal resistance in ohms.
    pub fn with_internal_resistance(mut self, ohms: f64) -> Self {
        self.internal = Resistance::ohms(ohms);
        self
    }

    /// EMF seen by the circuit. A shorted cell delivers none.
    pub fn effective_emf(&self) -> f64 {
        match self.fault {
            Fault::Short => 0.0,
            Fault::None | Fault::Open => self.emf,
        }
    }
}

impl Element for Battery {
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
            self.internal
        }
    }

    fn source(&self) -> Option<SourceInfo> {
        Some(SourceInfo {
            emf: self.effective_emf(),
            negative: Self::NEGATIVE,
            positive: Self::POSITIVE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_polarity() {
        let b = Battery::new("B1", 9.0);
        let info = b.source().unwrap();
        assert_eq!(info.negative, TerminalKey::Left);
        assert_eq!(info.positive, TerminalKey::Right);
        assert_eq!(info.emf, 9.0);
    }

    #[test]
    fn test_shorted_battery_loses_emf() {
        let mut b = Battery::new("B1", 9.0).with_internal_resistance(0.5);
        assert_eq!(
            b.resistance_between(TerminalKey::Left, TerminalKey::Right),
            Resistance::Finite(0.5)
        );
        b.fault = Fault::Short;
        assert_eq!(b.source().unwrap().emf, 0.0);
        assert!(b
            .resistance_between(TerminalKey::Left, TerminalKey::Right)
            .is_short());
    }
}
