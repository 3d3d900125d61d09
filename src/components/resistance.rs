//! Tagged resistance values.
//!
//! An open path and a short path are not ordinary numbers: an open path
//! carries no current whatever the voltage, and a short path drops no
//! voltage whatever the current. Both states are kept as explicit variants
//! so they never leak into floating point arithmetic as `inf` or `NaN`.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

/// Resistance between two terminals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Resistance {
    /// Zero resistance: no potential drop.
    #[default]
    Short,
    /// A strictly positive, finite value in ohms.
    Finite(f64),
    /// No conducting path.
    Open,
}

impl Resistance {
    /// Build a resistance from a raw value.
    ///
    /// Non-finite values map to [`Resistance::Open`], zero and negative
    /// values to [`Resistance::Short`].
    pub fn ohms(value: f64) -> Self {
        if !value.is_finite() {
            Resistance::Open
        } else if value <= 0.0 {
            Resistance::Short
        } else {
            Resistance::Finite(value)
        }
    }

    pub fn is_short(&self) -> bool {
        matches!(self, Resistance::Short)
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Resistance::Open)
    }

    /// True for a strictly positive, finite resistance.
    pub fn is_positive(&self) -> bool {
        matches!(self, Resistance::Finite(_))
    }

    /// Numeric value in ohms, `None` for an open path.
    pub fn value(&self) -> Option<f64> {
        match self {
            Resistance::Short => Some(0.0),
            Resistance::Finite(r) => Some(*r),
            Resistance::Open => None,
        }
    }

    /// Voltage drop for a current flowing through this resistance.
    pub fn drop_for(&self, current: f64) -> Option<f64> {
        self.value().map(|r| r * current)
    }

    /// Series combination. Open dominates, short is the identity.
    pub fn series(self, other: Resistance) -> Resistance {
        match (self, other) {
            (Resistance::Open, _) | (_, Resistance::Open) => Resistance::Open,
            (Resistance::Short, r) | (r, Resistance::Short) => r,
            (Resistance::Finite(a), Resistance::Finite(b)) => Resistance::Finite(a + b),
        }
    }
}

impl Add for Resistance {
    type Output = Resistance;

    fn add(self, rhs: Resistance) -> Resistance {
        self.series(rhs)
    }
}

impl Sum for Resistance {
    fn sum<I: Iterator<Item = Resistance>>(iter: I) -> Resistance {
        iter.fold(Resistance::Short, Resistance::series)
    }
}

impl<'a> Sum<&'a Resistance> for Resistance {
    fn sum<I: Iterator<Item = &'a Resistance>>(iter: I) -> Resistance {
        iter.copied().sum()
    }
}

impl fmt::Display for Resistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resistance::Short => write!(f, "short"),
            Resistance::Finite(r) => write!(f, "{} ohm", r),
            Resistance::Open => write!(f, "open"),
        }
    }
}
