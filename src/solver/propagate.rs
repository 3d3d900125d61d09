//! Current propagation.
//!
//! The solved system yields currents for indexed branches only. Valid
//! zero-resistance branches get theirs from node balance, and segments
//! collapsed inside a node (wires, closed switches, ammeters) from current
//! balance at each terminal.

use crate::circuit::{Circuit, TerminalId};
use crate::topology::{BranchSet, NodeMap, Segment};

/// Write solved currents onto the branches. Branches outside every
/// eligible loop carry no current; valid unindexed ones stay unknown.
pub fn assign_branch_currents(branches: &mut BranchSet, solution: &[f64]) {
    for b in branches.branches.iter_mut() {
        b.current = match b.index {
            Some(i) => solution.get(i).copied(),
            None if !b.valid => Some(0.0),
            None => None,
        };
    }
}

/// Resolve unknown branch currents by node balance.
///
/// At a node with exactly one unknown incident branch, that branch carries
/// whatever the others leave unbalanced. Returns true when every branch
/// current is known.
pub fn balance_branch_currents(branches: &mut BranchSet, nodes: &NodeMap, max_passes: usize) -> bool {
    for _ in 0..max_passes {
        let mut progress = false;

        for node in &nodes.nodes {
            let mut unknown = None;
            let mut unknown_count = 0;
            let mut inflow = 0.0;

            for b in branches.incident(node.id).filter(|b| !b.is_ring()) {
                let sign = if b.end == node.id { 1.0 } else { -1.0 };
                match b.current {
                    Some(i) => inflow += sign * i,
                    None => {
                        unknown = Some((b.id, sign));
                        unknown_count += 1;
                    }
                }
            }

            if let (1, Some((id, sign))) = (unknown_count, unknown) {
                branches.get_mut(id).current = Some(-inflow / sign);
                progress = true;
            }
        }

        if branches.iter().all(|b| b.current.is_some()) {
            return true;
        }
        if !progress {
            break;
        }
    }

    let unresolved = branches.iter().filter(|b| b.current.is_none()).count();
    log::warn!("{} branch currents left undetermined after node balance", unresolved);
    false
}

/// Current through every segment, from `a` to `b`.
///
/// Segments inside branches take the branch current. Zero-resistance
/// segments collapsed into a node are solved by current balance at their
/// terminals, leaves first; any left in a zero-resistance cycle stay `None`.
pub fn segment_currents(
    circuit: &Circuit,
    segments: &[Segment],
    branches: &BranchSet,
    max_passes: usize,
) -> Vec<Option<f64>> {
    let mut currents: Vec<Option<f64>> = segments
        .iter()
        .map(|s| {
            if s.a == s.b {
                return Some(0.0);
            }
            if s.is_traversable() {
                return match branches.branch_of(s.id) {
                    Some(id) => {
                        let branch = branches.get(id);
                        let forward = branch.step_of(s.id).map_or(true, |step| step.forward);
                        branch.current.map(|i| if forward { i } else { -i })
                    }
                    None => Some(0.0),
                };
            }
            if s.resistance.is_short() {
                None
            } else {
                Some(0.0)
            }
        })
        .collect();

    let mut at_terminal: Vec<Vec<usize>> = vec![Vec::new(); circuit.terminals.len()];
    for (i, s) in segments.iter().enumerate() {
        if s.a != s.b {
            at_terminal[s.a.0].push(i);
            at_terminal[s.b.0].push(i);
        }
    }

    for _ in 0..max_passes {
        if currents.iter().all(Option::is_some) {
            break;
        }
        let mut progress = false;

        for (t, incident) in at_terminal.iter().enumerate() {
            let terminal = TerminalId(t);
            let mut unknown = None;
            let mut unknown_count = 0;
            let mut inflow = 0.0;

            for &i in incident {
                let s = &segments[i];
                let sign = if s.b == terminal { 1.0 } else { -1.0 };
                match currents[i] {
                    Some(c) => inflow += sign * c,
                    None => {
                        unknown = Some((i, sign));
                        unknown_count += 1;
                    }
                }
            }

            if let (1, Some((i, sign))) = (unknown_count, unknown) {
                currents[i] = Some(-inflow / sign);
                progress = true;
            }
        }

        if !progress {
            break;
        }
    }

    let unresolved = currents.iter().filter(|c| c.is_none()).count();
    if unresolved > 0 {
        log::warn!("{} segment currents undetermined (zero-resistance cycle)", unresolved);
    }
    currents
}
