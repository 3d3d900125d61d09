//! Node potential propagation.

use crate::circuit::{LoopId, NodeId};
use crate::components::Resistance;
use crate::topology::{BranchSet, Loop, NodeMap, Segment};

/// Node with the most incident indexed branches; ties go to the lowest id.
pub fn reference_node(nodes: &NodeMap, branches: &BranchSet) -> Option<NodeId> {
    nodes
        .nodes
        .iter()
        .map(|n| {
            let count = branches.incident(n.id).filter(|b| b.index.is_some()).count();
            (count, n.id)
        })
        .filter(|(count, _)| *count > 0)
        .max_by(|x, y| x.0.cmp(&y.0).then(y.1.cmp(&x.1)))
        .map(|(_, id)| id)
}

/// Potential rise from `a` to `b` across a segment: EMF minus IR drop.
///
/// `None` for an open segment, or when the current is unknown and the
/// resistance is not zero.
fn rise(segment: &Segment, current: Option<f64>) -> Option<f64> {
    match segment.resistance {
        Resistance::Open => None,
        Resistance::Short => Some(segment.emf),
        Resistance::Finite(r) => current.map(|i| segment.emf - i * r),
    }
}

/// Fill one end of a segment from the other. Returns true if a potential
/// was assigned.
fn step_across(nodes: &mut NodeMap, segment: &Segment, current: Option<f64>) -> bool {
    if segment.is_internal() {
        return false;
    }
    let va = nodes.node(segment.node_a).potential;
    let vb = nodes.node(segment.node_b).potential;
    match (va, vb) {
        (Some(va), None) => match rise(segment, current) {
            Some(du) => {
                nodes.node_mut(segment.node_b).potential = Some(va + du);
                true
            }
            None => false,
        },
        (None, Some(vb)) => match rise(segment, current) {
            Some(du) => {
                nodes.node_mut(segment.node_a).potential = Some(vb - du);
                true
            }
            None => false,
        },
        _ => false,
    }
}

/// Assign node potentials from a zero-potential reference.
///
/// Walks each eligible loop forward and then backward, filling only
/// undefined potentials, then spreads across any remaining segment whose
/// current is known. Potentials are shifted up if any came out negative.
#[allow(clippy::too_many_arguments)]
pub fn propagate_potentials(
    nodes: &mut NodeMap,
    segments: &[Segment],
    branches: &BranchSet,
    loops: &[Loop],
    eligible: &[LoopId],
    currents: &[Option<f64>],
    reference: NodeId,
    max_passes: usize,
) {
    for node in nodes.nodes.iter_mut() {
        node.potential = None;
    }
    nodes.node_mut(reference).potential = Some(0.0);

    let walks: Vec<Vec<usize>> = eligible
        .iter()
        .map(|id| {
            loops[id.0]
                .segment_steps(branches)
                .iter()
                .map(|s| s.segment.0)
                .collect()
        })
        .collect();

    for _ in 0..max_passes {
        let mut progress = false;
        for walk in &walks {
            for &i in walk.iter().chain(walk.iter().rev()) {
                progress |= step_across(nodes, &segments[i], currents[i]);
            }
        }
        if !progress {
            break;
        }
    }

    spread(nodes, segments, currents, max_passes);
    shift_non_negative(nodes);
}

/// Potentials for a circuit where no current flows: each source's negative
/// node sits at zero and its positive node at the EMF.
pub fn seed_open_circuit(nodes: &mut NodeMap, segments: &[Segment], max_passes: usize) {
    for node in nodes.nodes.iter_mut() {
        node.potential = None;
    }
    let idle: Vec<Option<f64>> = vec![Some(0.0); segments.len()];

    for s in segments.iter().filter(|s| s.is_source() && !s.is_internal()) {
        if nodes.node(s.node_a).potential.is_none() && nodes.node(s.node_b).potential.is_none() {
            nodes.node_mut(s.node_a).potential = Some(0.0);
        }
        step_across(nodes, s, Some(0.0));
        spread(nodes, segments, &idle, max_passes);
    }

    shift_non_negative(nodes);
}

fn spread(nodes: &mut NodeMap, segments: &[Segment], currents: &[Option<f64>], max_passes: usize) {
    for _ in 0..max_passes {
        let mut progress = false;
        for (s, current) in segments.iter().zip(currents) {
            progress |= step_across(nodes, s, *current);
        }
        if !progress {
            break;
        }
    }
}

fn shift_non_negative(nodes: &mut NodeMap) {
    let min = nodes
        .nodes
        .iter()
        .filter_map(|n| n.potential)
        .fold(f64::INFINITY, f64::min);
    if min < 0.0 {
        for node in nodes.nodes.iter_mut() {
            if let Some(v) = node.potential.as_mut() {
                *v -= min;
            }
        }
    }
}
