//! Abstract Syntax Tree types for the netlist.

use std::collections::HashMap;
use std::fmt;

/// Complete AST representation of a parsed netlist.
#[derive(Debug, Clone, Default)]
pub struct NetlistAst {
    /// Device instances in declaration order
    pub devices: Vec<DeviceDef>,
    /// Wires in declaration order
    pub wires: Vec<WireDef>,
    /// Analyzer options from `.option` directives
    pub options: HashMap<String, f64>,
}

impl NetlistAst {
    /// Create a new empty netlist AST.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A parameter value: `key=10k` or `key=open`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Word(String),
}

/// A device definition from the netlist.
#[derive(Debug, Clone)]
pub struct DeviceDef {
    pub kind: DeviceKind,
    /// Unique device name
    pub name: String,
    /// Positional numeric values (EMF, resistance, pot position, ...)
    pub values: Vec<f64>,
    /// Positional state word (`open` / `closed` for switches)
    pub state: Option<String>,
    /// `key=value` parameters
    pub params: HashMap<String, ParamValue>,
    /// Source line number for error reporting
    pub line: usize,
}

/// A wire definition from the netlist.
#[derive(Debug, Clone)]
pub struct WireDef {
    pub name: String,
    /// `DEVICE.key` references; `None` for an unconnected (`nc`) end
    pub ends: [Option<String>; 2],
    pub params: HashMap<String, ParamValue>,
    pub line: usize,
}

/// Device kinds, inferred from the name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Battery,
    Resistor,
    Switch,
    Potentiometer,
    Ammeter,
    Voltmeter,
}

/// What a line declares, decided by the name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    Device(DeviceKind),
    Wire,
}

impl Declaration {
    /// Classify an element name by prefix, longest prefix first.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        const PREFIXES: &[(&str, Declaration)] = &[
            ("BAT", Declaration::Device(DeviceKind::Battery)),
            ("POT", Declaration::Device(DeviceKind::Potentiometer)),
            ("SW", Declaration::Device(DeviceKind::Switch)),
            ("AM", Declaration::Device(DeviceKind::Ammeter)),
            ("VM", Declaration::Device(DeviceKind::Voltmeter)),
            ("W", Declaration::Wire),
            ("R", Declaration::Device(DeviceKind::Resistor)),
        ];
        PREFIXES
            .iter()
            .find(|(prefix, _)| upper.starts_with(prefix))
            .map(|(_, decl)| *decl)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceKind::Battery => "battery",
            DeviceKind::Resistor => "resistor",
            DeviceKind::Switch => "switch",
            DeviceKind::Potentiometer => "potentiometer",
            DeviceKind::Ammeter => "ammeter",
            DeviceKind::Voltmeter => "voltmeter",
        };
        f.write_str(s)
    }
}
