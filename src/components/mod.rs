//! Device models for circuit analysis.
//!
//! This module provides the devices an editor can place:
//! - Sources: Battery
//! - Loads: Resistor
//! - Controls: Switch, Potentiometer
//! - Meters: Ammeter, Voltmeter
//!
//! Every device implements [`Element`], the capability the analyzer needs:
//! the list of its terminals and the resistance between any two of them.

mod controls;
mod linear;
mod meters;
mod resistance;
mod sources;

pub use controls::{Potentiometer, Switch};
pub use linear::Resistor;
pub use meters::{Ammeter, Voltmeter};
pub use resistance::Resistance;
pub use sources::Battery;

use crate::circuit::{Fault, TerminalKey};

/// Keys of a plain two-terminal device.
pub const TWO_TERMINALS: &[TerminalKey] = &[TerminalKey::Left, TerminalKey::Right];

/// Polarity and EMF of a source device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    /// Electromotive force in volts, driving current from `negative` to
    /// `positive` inside the source.
    pub emf: f64,
    pub negative: TerminalKey,
    pub positive: TerminalKey,
}

/// Capability interface implemented by every device variant.
pub trait Element {
    /// Instance name, unique within the circuit.
    fn name(&self) -> &str;

    /// Keys of the terminals this device exposes.
    fn terminal_keys(&self) -> &'static [TerminalKey];

    fn fault(&self) -> Fault;

    /// Resistance of the healthy device between two of its terminals.
    fn nominal_resistance(&self, a: TerminalKey, b: TerminalKey) -> Resistance;

    /// Resistance between two terminals with the fault flag applied.
    fn resistance_between(&self, a: TerminalKey, b: TerminalKey) -> Resistance {
        match self.fault() {
            Fault::None => self.nominal_resistance(a, b),
            Fault::Short => Resistance::Short,
            Fault::Open => Resistance::Open,
        }
    }

    /// Terminal pairs that form segments, given which terminals are wired.
    ///
    /// The default pairs every two connected terminals in key order.
    fn segment_pairs(&self, connected: &dyn Fn(TerminalKey) -> bool) -> Vec<(TerminalKey, TerminalKey)> {
        let keys: Vec<TerminalKey> = self
            .terminal_keys()
            .iter()
            .copied()
            .filter(|k| connected(*k))
            .collect();
        let mut pairs = Vec::new();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                pairs.push((*a, *b));
            }
        }
        pairs
    }

    /// Source polarity and EMF, `None` for passive devices.
    fn source(&self) -> Option<SourceInfo> {
        None
    }
}

/// A circuit device.
#[derive(Debug, Clone)]
pub enum Device {
    Battery(Battery),
    Resistor(Resistor),
    Switch(Switch),
    Potentiometer(Potentiometer),
    Ammeter(Ammeter),
    Voltmeter(Voltmeter),
}

impl Device {
    /// Dispatch to the variant's [`Element`] implementation.
    pub fn as_element(&self) -> &dyn Element {
        match self {
            Device::Battery(b) => b,
            Device::Resistor(r) => r,
            Device::Switch(s) => s,
            Device::Potentiometer(p) => p,
            Device::Ammeter(a) => a,
            Device::Voltmeter(v) => v,
        }
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        self.as_element().name()
    }

    /// Short label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Device::Battery(_) => "battery",
            Device::Resistor(_) => "resistor",
            Device::Switch(_) => "switch",
            Device::Potentiometer(_) => "potentiometer",
            Device::Ammeter(_) => "ammeter",
            Device::Voltmeter(_) => "voltmeter",
        }
    }

    pub fn is_source(&self) -> bool {
        self.as_element().source().is_some()
    }

    pub fn fault(&self) -> Fault {
        self.as_element().fault()
    }

    /// Set the fault flag.
    pub fn set_fault(&mut self, fault: Fault) {
        match self {
            Device::Battery(b) => b.fault = fault,
            Device::Resistor(r) => r.fault = fault,
            Device::Switch(s) => s.fault = fault,
            Device::Potentiometer(p) => p.fault = fault,
            Device::Ammeter(a) => a.fault = fault,
            Device::Voltmeter(v) => v.fault = fault,
        }
    }

    /// Check whether `key` is one of this device's terminals.
    pub fn has_terminal(&self, key: TerminalKey) -> bool {
        self.as_element().terminal_keys().contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_overrides_nominal_resistance() {
        let mut device = Device::Resistor(Resistor::new("R1", 100.0));
        let element = device.as_element();
        assert_eq!(
            element.resistance_between(TerminalKey::Left, TerminalKey::Right),
            Resistance::Finite(100.0)
        );

        device.set_fault(Fault::Short);
        assert!(device
            .as_element()
            .resistance_between(TerminalKey::Left, TerminalKey::Right)
            .is_short());

        device.set_fault(Fault::Open);
        assert!(device
            .as_element()
            .resistance_between(TerminalKey::Left, TerminalKey::Right)
            .is_open());
    }

    #[test]
    fn test_default_segment_pairs_skip_unconnected() {
        let device = Device::Resistor(Resistor::new("R1", 100.0));
        let both = device.as_element().segment_pairs(&|_| true);
        assert_eq!(both, vec![(TerminalKey::Left, TerminalKey::Right)]);

        let one = device
            .as_element()
            .segment_pairs(&|k| k == TerminalKey::Left);
        assert!(one.is_empty());
    }

    #[test]
    fn test_only_batteries_are_sources() {
        assert!(Device::Battery(Battery::new("B1", 9.0)).is_source());
        assert!(!Device::Switch(Switch::new("S1", true)).is_source());
        assert!(!Device::Ammeter(Ammeter::new("A1")).is_source());
    }
}
