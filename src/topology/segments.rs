//! Segment assembly.
//!
//! A segment is one device or wire between two of its terminals. Source
//! segments always run from the negative to the positive terminal; every
//! other segment is turned so that, where it touches a source terminal's
//! node, it points away from the positive side and towards the negative
//! side.

use std::collections::HashSet;

use super::nodes::NodeMap;
use super::signature::SegmentKey;
use crate::circuit::{Circuit, DeviceId, ElementRef, NodeId, SegmentId, TerminalId};
use crate::components::Resistance;
use crate::error::{KirchhoffError, Result};

/// The smallest path unit: one element between two terminals.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    pub a: TerminalId,
    pub b: TerminalId,
    pub element: ElementRef,
    pub resistance: Resistance,
    /// EMF driving current from `a` to `b`
    pub emf: f64,
    /// Set for the segment of a source device
    pub source: Option<DeviceId>,
    pub node_a: NodeId,
    pub node_b: NodeId,
}

impl Segment {
    /// Build a segment between two terminals.
    ///
    /// Both terminals are required; a missing one is an input error.
    pub fn new(
        id: SegmentId,
        element: ElementRef,
        a: Option<TerminalId>,
        b: Option<TerminalId>,
        resistance: Resistance,
        nodes: &NodeMap,
    ) -> Result<Self> {
        let (a, b) = match (a, b) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(KirchhoffError::InvalidSegment {
                    element: element.to_string(),
                })
            }
        };
        Ok(Self {
            id,
            a,
            b,
            element,
            resistance,
            emf: 0.0,
            source: None,
            node_a: nodes.node_of(a),
            node_b: nodes.node_of(b),
        })
    }

    pub fn is_source(&self) -> bool {
        self.source.is_some()
    }

    /// Both ends lie in the same node.
    pub fn is_internal(&self) -> bool {
        self.node_a == self.node_b
    }

    /// Takes part in branch and loop discovery. A shorted-out source still
    /// does, as a one-segment ring.
    pub fn is_traversable(&self) -> bool {
        !self.is_internal() || self.is_source()
    }

    /// A passive segment that drops voltage.
    pub fn is_load(&self) -> bool {
        !self.is_source() && self.resistance.is_positive()
    }

    /// Node at the far end when entering from `node`.
    pub fn other_node(&self, node: NodeId) -> NodeId {
        if self.node_a == node {
            self.node_b
        } else {
            self.node_a
        }
    }

    /// Undirected structural key.
    pub fn key(&self) -> SegmentKey {
        SegmentKey::new(self.element, self.a, self.b)
    }

    fn flip(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
        std::mem::swap(&mut self.node_a, &mut self.node_b);
        self.emf = -self.emf;
    }
}

/// Build every segment of the circuit.
///
/// Devices come first in device order, one segment per connected terminal
/// pair; then one segment per wire with both ends attached.
pub fn assemble_segments(circuit: &Circuit, nodes: &NodeMap) -> Result<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();

    for (index, device) in circuit.devices.iter().enumerate() {
        let device_id = DeviceId(index);
        let element = device.as_element();
        let connected = |key| {
            circuit
                .terminal_of(device_id, key)
                .map(|t| circuit.is_connected(t))
                .unwrap_or(false)
        };

        for (ka, kb) in element.segment_pairs(&connected) {
            let id = SegmentId(segments.len());
            let resistance = element.resistance_between(ka, kb);
            let ta = circuit.terminal_of(device_id, ka).ok();
            let tb = circuit.terminal_of(device_id, kb).ok();
            let mut segment = Segment::new(id, ElementRef::Device(device_id), ta, tb, resistance, nodes)?;

            if let Some(info) = element.source() {
                segment.source = Some(device_id);
                segment.emf = info.emf;
                if circuit.terminal(segment.a).key != info.negative {
                    segment.flip();
                }
            }
            segments.push(segment);
        }
    }

    for wire in &circuit.wires {
        if !wire.is_connected() {
            continue;
        }
        let resistance = if wire.conducts() {
            Resistance::Short
        } else {
            Resistance::Open
        };
        let id = SegmentId(segments.len());
        segments.push(Segment::new(
            id,
            ElementRef::Wire(wire.id),
            wire.ends[0],
            wire.ends[1],
            resistance,
            nodes,
        )?);
    }

    orient_segments(&mut segments);
    Ok(segments)
}

/// Turn passive segments so they run from a source's positive side to its
/// negative side where they touch one.
fn orient_segments(segments: &mut [Segment]) {
    let mut negative: HashSet<NodeId> = HashSet::new();
    let mut positive: HashSet<NodeId> = HashSet::new();
    for s in segments.iter().filter(|s| s.is_source()) {
        negative.insert(s.node_a);
        positive.insert(s.node_b);
    }

    for s in segments.iter_mut().filter(|s| !s.is_source()) {
        let a_neg = negative.contains(&s.node_a);
        let b_neg = negative.contains(&s.node_b);
        let a_pos = positive.contains(&s.node_a);
        let b_pos = positive.contains(&s.node_b);
        if (a_neg && !b_neg) || (b_pos && !a_pos) {
            s.flip();
        }
    }
}
