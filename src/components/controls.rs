//! Control components: Switch and Potentiometer.

use super::{Element, Resistance, TWO_TERMINALS};
use crate::circuit::{Fault, TerminalKey};

/// A single-pole switch.
///
/// Ideal: a closed switch is a short, an open switch is an open path.
#[derive(Debug, Clone)]
pub struct Switch {
    pub name: String,
    pub closed: bool,
    pub fault: Fault,
}

impl Switch {
    /// Create a new switch.
    pub fn new(name: impl Into<String>, closed: bool) -> Self {
        Self {
            name: name.into(),
            closed,
            fault: Fault::None,
        }
    }

    /// Set the switch state.
    pub fn set_state(&mut self, closed: bool) {
        self.closed = closed;
    }

    /// Toggle the switch state.
    pub fn toggle(&mut self) {
        self.closed = !self.closed;
    }
}

impl Element for Switch {
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
        if a == b || self.closed {
            Resistance::Short
        } else {
            Resistance::Open
        }
    }
}

/// A potentiometer.
///
/// Modeled as two resistors in series with a wiper tap:
///   left ----[R1]---- wiper ----[R2]---- right
///
/// where R1 = position * total_resistance
/// and   R2 = (1 - position) * total_resistance
#[derive(Debug, Clone)]
pub struct Potentiometer {
    pub name: String,
    pub total_resistance: f64,
    /// Wiper position from 0.0 (at left) to 1.0 (at right)
    pub position: f64,
    pub fault: Fault,
}

impl Potentiometer {
    const KEYS: &'static [TerminalKey] = &[TerminalKey::Left, TerminalKey::Middle, TerminalKey::Right];

    /// Create a new potentiometer.
    pub fn new(name: impl Into<String>, total_resistance: f64, position: f64) -> Self {
        Self {
            name: name.into(),
            total_resistance,
            position: position.clamp(0.0, 1.0),
            fault: Fault::None,
        }
    }

    /// Set the wiper position.
    pub fn set_position(&mut self, position: f64) {
        self.position = position.clamp(0.0, 1.0);
    }

    /// Resistance from left to wiper.
    pub fn r1(&self) -> f64 {
        self.position * self.total_resistance
    }

    /// Resistance from wiper to right.
    pub fn r2(&self) -> f64 {
        (1.0 - self.position) * self.total_resistance
    }
}

impl Element for Potentiometer {
    fn name(&self) -> &str {
        &self.name
    }

    fn terminal_keys(&self) -> &'static [TerminalKey] {
        Self::KEYS
    }

    fn fault(&self) -> Fault {
        self.fault
    }

    fn nominal_resistance(&self, a: TerminalKey, b: TerminalKey) -> Resistance {
        use TerminalKey::*;
        match (a, b) {
            (Left, Middle) | (Middle, Left) => Resistance::ohms(self.r1()),
            (Middle, Right) | (Right, Middle) => Resistance::ohms(self.r2()),
            (Left, Right) | (Right, Left) => Resistance::ohms(self.total_resistance),
            _ => Resistance::Short,
        }
    }

    /// Left-wiper and wiper-right when the wiper is wired, otherwise the
    /// whole track between left and right.
    fn segment_pairs(&self, connected: &dyn Fn(TerminalKey) -> bool) -> Vec<(TerminalKey, TerminalKey)> {
        use TerminalKey::*;
        let (left, middle, right) = (connected(Left), connected(Middle), connected(Right));
        let mut pairs = Vec::new();
        if middle {
            if left {
                pairs.push((Left, Middle));
            }
            if right {
                pairs.push((Middle, Right));
            }
        } else if left && right {
            pairs.push((Left, Right));
        }
        pairs
    }
}
