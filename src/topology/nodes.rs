//! Node merging.
//!
//! Terminals joined by a conducting wire, or by a zero-resistance path
//! through a passive device, share one potential and collapse into a single
//! [`Node`]. Sources never merge their own terminals.

use crate::circuit::{BranchId, Circuit, NodeId, TerminalId};

/// A set of terminals at the same potential.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Member terminals in discovery order
    pub terminals: Vec<TerminalId>,
    /// Potential in volts, `None` until propagated
    pub potential: Option<f64>,
    /// Branches ending at this node
    pub branches: Vec<BranchId>,
}

/// Terminal to node assignment for one analysis pass.
#[derive(Debug, Clone, Default)]
pub struct NodeMap {
    pub nodes: Vec<Node>,
    terminal_nodes: Vec<NodeId>,
}

impl NodeMap {
    /// Node containing a terminal.
    pub fn node_of(&self, terminal: TerminalId) -> NodeId {
        self.terminal_nodes[terminal.0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Clear potentials and branch back-lists.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.potential = None;
            node.branches.clear();
        }
    }
}

/// Partition every terminal of the circuit into nodes.
///
/// Flood fill from each unassigned terminal, in terminal order, following
/// conducting wires whose both ends are attached and zero-resistance paths
/// inside non-source devices.
pub fn merge_nodes(circuit: &Circuit) -> NodeMap {
    let mut terminal_nodes: Vec<Option<NodeId>> = vec![None; circuit.terminals.len()];
    let mut nodes = Vec::new();
    let mut stack = Vec::new();

    for start in 0..circuit.terminals.len() {
        if terminal_nodes[start].is_some() {
            continue;
        }

        let id = NodeId(nodes.len());
        let mut members = Vec::new();
        terminal_nodes[start] = Some(id);
        stack.push(TerminalId(start));

        while let Some(terminal) = stack.pop() {
            members.push(terminal);
            for next in shorted_neighbours(circuit, terminal) {
                if terminal_nodes[next.0].is_none() {
                    terminal_nodes[next.0] = Some(id);
                    stack.push(next);
                }
            }
        }

        members.sort();
        nodes.push(Node {
            id,
            terminals: members,
            potential: None,
            branches: Vec::new(),
        });
    }

    NodeMap {
        nodes,
        // every terminal is assigned by the loop above
        terminal_nodes: terminal_nodes.into_iter().flatten().collect(),
    }
}

/// Terminals reachable from `terminal` without any potential drop.
fn shorted_neighbours(circuit: &Circuit, terminal: TerminalId) -> Vec<TerminalId> {
    let mut out = Vec::new();

    for &wire in circuit.junctions(terminal) {
        let wire = circuit.wire(wire);
        if wire.is_connected() && wire.conducts() {
            if let Some(other) = wire.other_end(terminal) {
                out.push(other);
            }
        }
    }

    let owner = circuit.terminal(terminal);
    let device = circuit.device(owner.device);
    if !device.is_source() {
        let element = device.as_element();
        for &other in circuit.terminals_of(owner.device) {
            if other == terminal {
                continue;
            }
            let key = circuit.terminal(other).key;
            if element.resistance_between(owner.key, key).is_short() {
                out.push(other);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{ElementRef, Fault, TerminalKey};
    use crate::components::{Battery, Device, Resistor, Switch};

    fn series_with_switch(closed: bool) -> Circuit {
        let mut c = Circuit::new();
        let bat = c.add_device(Device::Battery(Battery::new("BAT1", 9.0))).unwrap();
        let sw = c.add_device(Device::Switch(Switch::new("SW1", closed))).unwrap();
        let r = c.add_device(Device::Resistor(Resistor::new("R1", 10.0))).unwrap();
        let t = |c: &Circuit, d, k| c.terminal_of(d, k).unwrap();
        let (bp, bn) = (t(&c, bat, TerminalKey::Right), t(&c, bat, TerminalKey::Left));
        let (sl, sr) = (t(&c, sw, TerminalKey::Left), t(&c, sw, TerminalKey::Right));
        let (rl, rr) = (t(&c, r, TerminalKey::Left), t(&c, r, TerminalKey::Right));
        c.connect("W1", bp, sl).unwrap();
        c.connect("W2", sr, rl).unwrap();
        c.connect("W3", rr, bn).unwrap();
        c
    }

    #[test]
    fn test_closed_switch_merges_terminals() {
        let c = series_with_switch(true);
        let nodes = merge_nodes(&c);
        // {BAT+, SW.l, SW.r, R.l} and {R.r, BAT-}
        assert_eq!(nodes.len(), 2);
        let bat_pos = c.resolve_terminal("BAT1.pos").unwrap();
        let r_left = c.resolve_terminal("R1.left").unwrap();
        assert_eq!(nodes.node_of(bat_pos), nodes.node_of(r_left));
    }

    #[test]
    fn test_open_switch_separates_nodes() {
        let c = series_with_switch(false);
        let nodes = merge_nodes(&c);
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_source_terminals_never_merge() {
        let mut c = Circuit::new();
        let bat = c.add_device(Device::Battery(Battery::new("BAT1", 9.0))).unwrap();
        c.set_fault(ElementRef::Device(bat), Fault::Short);
        let nodes = merge_nodes(&c);
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_open_wire_does_not_merge() {
        let mut c = series_with_switch(true);
        let w = c.find("W3").unwrap();
        c.set_fault(w, Fault::Open);
        let nodes = merge_nodes(&c);
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_every_terminal_assigned_once() {
        let c = series_with_switch(true);
        let nodes = merge_nodes(&c);
        let total: usize = nodes.nodes.iter().map(|n| n.terminals.len()).sum();
        assert_eq!(total, c.terminals.len());
        for node in &nodes.nodes {
            for &t in &node.terminals {
                assert_eq!(nodes.node_of(t), node.id);
            }
        }
    }
}
