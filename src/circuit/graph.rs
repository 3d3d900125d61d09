//! Circuit graph structure.
//!
//! [`Circuit`] is the raw component graph owned by the caller: devices with
//! their terminals, and wires joining terminal pairs. The analyzer only ever
//! reads it; every analysis pass derives its own nodes, segments, branches
//! and loops from scratch.

use std::collections::HashMap;

use super::types::{DeviceId, ElementRef, Fault, TerminalId, TerminalKey, WireId};
use crate::components::{Ammeter, Battery, Device, Potentiometer, Resistor, Switch, Voltmeter};
use crate::dsl::{DeviceDef, DeviceKind, NetlistAst, ParamValue, WireDef};
use crate::error::{KirchhoffError, Result};

/// A connection point on a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    pub id: TerminalId,
    /// Owning device
    pub device: DeviceId,
    pub key: TerminalKey,
}

/// A wire between two terminals. Either end may be unconnected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub id: WireId,
    pub name: String,
    pub ends: [Option<TerminalId>; 2],
    pub fault: Fault,
}

impl Wire {
    /// Both ends attached to a terminal.
    pub fn is_connected(&self) -> bool {
        self.ends[0].is_some() && self.ends[1].is_some()
    }

    /// The end opposite to `terminal`, if `terminal` is one of the ends.
    pub fn other_end(&self, terminal: TerminalId) -> Option<TerminalId> {
        match self.ends {
            [Some(a), b] if a == terminal => b,
            [a, Some(b)] if b == terminal => a,
            _ => None,
        }
    }

    /// A wire conducts unless it carries an open fault.
    pub fn conducts(&self) -> bool {
        self.fault != Fault::Open
    }
}

/// A complete component graph ready for analysis.
#[derive(Debug, Clone, Default)]
pub struct Circuit {
    /// All devices, indexed by [`DeviceId`]
    pub devices: Vec<Device>,

    /// All terminals, indexed by [`TerminalId`]
    pub terminals: Vec<Terminal>,

    /// All wires, indexed by [`WireId`]
    pub wires: Vec<Wire>,

    /// Terminals of each device in key order
    device_terminals: Vec<Vec<TerminalId>>,

    /// Wires attached to each terminal (the junctions)
    junctions: Vec<Vec<WireId>>,

    /// Name lookup for devices and wires
    names: HashMap<String, ElementRef>,
}

impl Circuit {
    /// Create an empty circuit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a device, creating one terminal per key it exposes.
    pub fn add_device(&mut self, device: Device) -> Result<DeviceId> {
        let name = device.name().to_string();
        if self.names.contains_key(&name) {
            return Err(KirchhoffError::DuplicateName { name });
        }

        let id = DeviceId(self.devices.len());
        let mut terminal_ids = Vec::new();
        for &key in device.as_element().terminal_keys() {
            let tid = TerminalId(self.terminals.len());
            self.terminals.push(Terminal { id: tid, device: id, key });
            self.junctions.push(Vec::new());
            terminal_ids.push(tid);
        }

        self.devices.push(device);
        self.device_terminals.push(terminal_ids);
        self.names.insert(name, ElementRef::Device(id));
        Ok(id)
    }

    /// Add a wire. `None` leaves that end unconnected.
    pub fn add_wire(
        &mut self,
        name: impl Into<String>,
        a: Option<TerminalId>,
        b: Option<TerminalId>,
    ) -> Result<WireId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(KirchhoffError::DuplicateName { name });
        }
        for end in [a, b].into_iter().flatten() {
            if end.0 >= self.terminals.len() {
                return Err(KirchhoffError::DanglingTerminal {
                    terminal: end.to_string(),
                });
            }
        }

        let id = WireId(self.wires.len());
        for end in [a, b].into_iter().flatten() {
            self.junctions[end.0].push(id);
        }
        self.wires.push(Wire {
            id,
            name: name.clone(),
            ends: [a, b],
            fault: Fault::None,
        });
        self.names.insert(name, ElementRef::Wire(id));
        Ok(id)
    }

    /// Add a wire between two terminals.
    pub fn connect(&mut self, name: impl Into<String>, a: TerminalId, b: TerminalId) -> Result<WireId> {
        self.add_wire(name, Some(a), Some(b))
    }

    /// Get a device by id.
    pub fn device(&self, id: DeviceId) -> &Device {
        &self.devices[id.0]
    }

    /// Get a mutable device by id.
    pub fn device_mut(&mut self, id: DeviceId) -> &mut Device {
        &mut self.devices[id.0]
    }

    /// Get a wire by id.
    pub fn wire(&self, id: WireId) -> &Wire {
        &self.wires[id.0]
    }

    /// Get a terminal by id.
    pub fn terminal(&self, id: TerminalId) -> &Terminal {
        &self.terminals[id.0]
    }

    /// Terminals of a device in key order.
    pub fn terminals_of(&self, device: DeviceId) -> &[TerminalId] {
        &self.device_terminals[device.0]
    }

    /// Find the terminal of `device` with the given key.
    pub fn terminal_of(&self, device: DeviceId, key: TerminalKey) -> Result<TerminalId> {
        self.terminals_of(device)
            .iter()
            .copied()
            .find(|t| self.terminals[t.0].key == key)
            .ok_or_else(|| KirchhoffError::NoSuchTerminal {
                device: self.device(device).name().to_string(),
                key: key.to_string(),
            })
    }

    /// Wires attached to a terminal.
    pub fn junctions(&self, terminal: TerminalId) -> &[WireId] {
        &self.junctions[terminal.0]
    }

    /// A terminal counts as connected when at least one fully attached wire
    /// meets it.
    pub fn is_connected(&self, terminal: TerminalId) -> bool {
        self.junctions(terminal)
            .iter()
            .any(|w| self.wires[w.0].is_connected())
    }

    /// Look up a device or wire by name.
    pub fn find(&self, name: &str) -> Option<ElementRef> {
        self.names.get(name).copied()
    }

    /// Look up a device by name.
    pub fn find_device(&self, name: &str) -> Option<DeviceId> {
        match self.find(name)? {
            ElementRef::Device(id) => Some(id),
            ElementRef::Wire(_) => None,
        }
    }

    /// Resolve a `DEVICE.key` reference.
    pub fn resolve_terminal(&self, reference: &str) -> Result<TerminalId> {
        let unknown = || KirchhoffError::UnknownTerminal {
            reference: reference.to_string(),
        };
        let (device, key) = reference.rsplit_once('.').ok_or_else(unknown)?;
        let device = self.find_device(device).ok_or_else(unknown)?;
        let key: TerminalKey = key.parse().map_err(|_| unknown())?;
        self.terminal_of(device, key)
    }

    /// Name of a device or wire.
    pub fn element_name(&self, element: ElementRef) -> &str {
        match element {
            ElementRef::Device(id) => self.device(id).name(),
            ElementRef::Wire(id) => &self.wire(id).name,
        }
    }

    /// `DEVICE.key` label of a terminal.
    pub fn terminal_label(&self, terminal: TerminalId) -> String {
        let t = self.terminal(terminal);
        format!("{}.{}", self.device(t.device).name(), t.key)
    }

    // ============ Edit operations ============

    /// Set a switch state. Returns false if the device is not a switch.
    pub fn set_switch(&mut self, device: DeviceId, closed: bool) -> bool {
        match self.device_mut(device) {
            Device::Switch(s) => {
                s.set_state(closed);
                true
            }
            _ => false,
        }
    }

    /// Toggle a switch. Returns false if the device is not a switch.
    pub fn toggle_switch(&mut self, device: DeviceId) -> bool {
        match self.device_mut(device) {
            Device::Switch(s) => {
                s.toggle();
                true
            }
            _ => false,
        }
    }

    /// Move a potentiometer wiper. Returns false if the device is not a
    /// potentiometer.
    pub fn set_position(&mut self, device: DeviceId, position: f64) -> bool {
        match self.device_mut(device) {
            Device::Potentiometer(p) => {
                p.set_position(position);
                true
            }
            _ => false,
        }
    }

    /// Inject or clear a fault on a device or wire.
    pub fn set_fault(&mut self, element: ElementRef, fault: Fault) {
        match element {
            ElementRef::Device(id) => self.devices[id.0].set_fault(fault),
            ElementRef::Wire(id) => self.wires[id.0].fault = fault,
        }
    }

    // ============ Netlist construction ============

    /// Build a circuit from a parsed netlist.
    pub fn from_ast(ast: NetlistAst) -> Result<Self> {
        let mut circuit = Circuit::new();

        for def in &ast.devices {
            let device = device_from_def(def)?;
            circuit.add_device(device)?;
        }

        for def in &ast.wires {
            circuit.add_wire_from_def(def)?;
        }

        Ok(circuit)
    }

    fn add_wire_from_def(&mut self, def: &WireDef) -> Result<WireId> {
        let mut ends = [None, None];
        for (slot, reference) in ends.iter_mut().zip(def.ends.iter()) {
            if let Some(reference) = reference {
                *slot = Some(self.resolve_terminal(reference)?);
            }
        }
        let id = self.add_wire(def.name.clone(), ends[0], ends[1])?;
        if let Some(fault) = fault_param(&def.name, &def.params)? {
            self.wires[id.0].fault = fault;
        }
        Ok(id)
    }
}

/// Build a device from its netlist definition.
fn device_from_def(def: &DeviceDef) -> Result<Device> {
    let value = |i: usize, what: &str| {
        def.values.get(i).copied().ok_or_else(|| {
            KirchhoffError::invalid_component(&def.name, def.line, format!("{} requires {}", def.kind, what))
        })
    };

    let mut device = match def.kind {
        DeviceKind::Battery => {
            let mut battery = Battery::new(def.name.clone(), value(0, "an EMF")?);
            match def.params.get("r") {
                Some(ParamValue::Number(r)) => battery = battery.with_internal_resistance(*r),
                Some(ParamValue::Word(w)) => {
                    return Err(KirchhoffError::invalid_parameter(
                        &def.name,
                        "r",
                        format!("expected a resistance, got '{}'", w),
                    ))
                }
                None => {}
            }
            Device::Battery(battery)
        }

        DeviceKind::Resistor => Device::Resistor(Resistor::new(def.name.clone(), value(0, "a resistance")?)),

        DeviceKind::Switch => {
            let state = def
                .state
                .clone()
                .or_else(|| match def.params.get("state") {
                    Some(ParamValue::Word(w)) => Some(w.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| "closed".to_string());
            let closed = match state.to_ascii_lowercase().as_str() {
                "closed" | "on" => true,
                "open" | "off" => false,
                other => {
                    return Err(KirchhoffError::invalid_parameter(
                        &def.name,
                        "state",
                        format!("expected 'open' or 'closed', got '{}'", other),
                    ))
                }
            };
            Device::Switch(Switch::new(def.name.clone(), closed))
        }

        DeviceKind::Potentiometer => {
            let total = value(0, "a total resistance")?;
            let position = def.values.get(1).copied().unwrap_or(0.5);
            if !(0.0..=1.0).contains(&position) {
                return Err(KirchhoffError::invalid_parameter(
                    &def.name,
                    "position",
                    format!("{} is outside 0..1", position),
                ));
            }
            Device::Potentiometer(Potentiometer::new(def.name.clone(), total, position))
        }

        DeviceKind::Ammeter => Device::Ammeter(Ammeter::new(def.name.clone())),

        DeviceKind::Voltmeter => Device::Voltmeter(Voltmeter::new(def.name.clone())),
    };

    if let Some(fault) = fault_param(&def.name, &def.params)? {
        device.set_fault(fault);
    }

    Ok(device)
}

/// Read an optional `fault=` parameter.
fn fault_param(name: &str, params: &HashMap<String, ParamValue>) -> Result<Option<Fault>> {
    match params.get("fault") {
        None => Ok(None),
        Some(ParamValue::Word(w)) => w.parse::<Fault>().map(Some).map_err(|_| {
            KirchhoffError::invalid_parameter(name, "fault", format!("unknown fault '{}'", w))
        }),
        Some(ParamValue::Number(n)) => Err(KirchhoffError::invalid_parameter(
            name,
            "fault",
            format!("expected none/short/open, got {}", n),
        )),
    }
}
