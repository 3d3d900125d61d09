//! Loop and branch filtering.
//!
//! Decides which discovered loops may contribute a KVL equation and which
//! branches take part in the solution. A segment whose two terminals share
//! a node never reaches a branch, so section shorts are already gone by
//! the time loops are filtered.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::branches::BranchSet;
use super::loops::{Loop, LoopStatus, Rejection};
use crate::circuit::{BranchId, LoopId, NodeId};

/// Series and parallel relations among valid branches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relations {
    /// Branches adjacent in some eligible loop, lower id first
    pub series: Vec<(BranchId, BranchId)>,
    /// Distinct branches bounded by the same two nodes, lower id first
    pub parallel: Vec<(BranchId, BranchId)>,
}

/// Result of one filtering pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Eligible loops in discovery order
    pub eligible: Vec<LoopId>,
    pub relations: Relations,
}

impl FilterOutcome {
    pub fn valid_branches<'a>(&self, branches: &'a BranchSet) -> impl Iterator<Item = BranchId> + 'a {
        branches.iter().filter(|b| b.valid).map(|b| b.id)
    }
}

/// Classify every loop, then mark the branches and relations it implies.
///
/// The pass recomputes everything from the loops' structure, so running it
/// again over its own output changes nothing.
pub fn filter_loops(loops: &mut [Loop], branches: &mut BranchSet) -> FilterOutcome {
    let mut eligible = Vec::new();
    for l in loops.iter_mut() {
        l.status = judge(l);
        if l.is_eligible() {
            eligible.push(l.id);
        } else {
            log::trace!("loop {} rejected: {:?}", l.id, l.status);
        }
    }

    for b in branches.branches.iter_mut() {
        b.valid = false;
        b.reversals = 0;
    }

    let mut first_direction: HashMap<BranchId, bool> = HashMap::new();
    let mut series: BTreeSet<(BranchId, BranchId)> = BTreeSet::new();

    for &id in &eligible {
        let l = &loops[id.0];
        for step in &l.steps {
            let branch = branches.get_mut(step.branch);
            branch.valid = true;
            match first_direction.get(&step.branch) {
                None => {
                    first_direction.insert(step.branch, step.forward);
                }
                Some(&dir) if dir != step.forward => branch.reversals += 1,
                Some(_) => {}
            }
        }
        for pair in l.steps.windows(2) {
            let (x, y) = (pair[0].branch, pair[1].branch);
            if x != y {
                series.insert((x.min(y), x.max(y)));
            }
        }
    }

    let relations = Relations {
        series: series.into_iter().collect(),
        parallel: parallel_pairs(branches),
    };

    FilterOutcome { eligible, relations }
}

fn judge(l: &Loop) -> LoopStatus {
    let mut visited: HashSet<NodeId> = HashSet::new();
    if !l.nodes.iter().all(|n| visited.insert(*n)) {
        return LoopStatus::Rejected(Rejection::NodeCrossing);
    }
    if l.resistance.is_open() {
        return LoopStatus::Rejected(Rejection::Open);
    }
    if l.resistance.is_short() {
        return LoopStatus::Rejected(Rejection::Shorted);
    }
    LoopStatus::Eligible
}

fn parallel_pairs(branches: &BranchSet) -> Vec<(BranchId, BranchId)> {
    let valid: Vec<_> = branches.iter().filter(|b| b.valid && !b.is_ring()).collect();
    let mut pairs = Vec::new();
    for (i, x) in valid.iter().enumerate() {
        let ends = (x.start.min(x.end), x.start.max(x.end));
        for y in &valid[i + 1..] {
            if (y.start.min(y.end), y.start.max(y.end)) == ends {
                pairs.push((x.id, y.id));
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, DeviceId};
    use crate::components::{Battery, Device, Resistance, Resistor};
    use crate::topology::{assemble_segments, find_branches, find_loops, merge_nodes, BranchStep, LoopLimits};

    fn wire(c: &mut Circuit, name: &str, a: &str, b: &str) {
        let a = c.resolve_terminal(a).unwrap();
        let b = c.resolve_terminal(b).unwrap();
        c.connect(name, a, b).unwrap();
    }

    fn discover(c: &Circuit) -> (BranchSet, Vec<Loop>) {
        let nodes = merge_nodes(c);
        let segments = assemble_segments(c, &nodes).unwrap();
        let branches = find_branches(&segments, nodes.len(), 100).unwrap();
        let limits = LoopLimits {
            max_depth: 100,
            max_loops: 50,
        };
        let loops = find_loops(&segments, &branches, limits).unwrap();
        (branches, loops)
    }

    /// Wheatstone bridge: R1/R2 and R3/R4 dividers joined by R5.
    fn bridge() -> Circuit {
        let mut c = Circuit::new();
        c.add_device(Device::Battery(Battery::new("BAT1", 10.0))).unwrap();
        for (name, r) in [("R1", 10.0), ("R2", 20.0), ("R3", 30.0), ("R4", 40.0), ("R5", 50.0)] {
            c.add_device(Device::Resistor(Resistor::new(name, r))).unwrap();
        }
        wire(&mut c, "W1", "BAT1.pos", "R1.left");
        wire(&mut c, "W2", "BAT1.pos", "R3.left");
        wire(&mut c, "W3", "R1.right", "R2.left");
        wire(&mut c, "W4", "R3.right", "R4.left");
        wire(&mut c, "W5", "R2.right", "BAT1.neg");
        wire(&mut c, "W6", "R4.right", "BAT1.neg");
        wire(&mut c, "W7", "R1.right", "R5.left");
        wire(&mut c, "W8", "R5.right", "R3.right");
        c
    }

    #[test]
    fn test_bridge_branch_reverses() {
        let (mut branches, mut loops) = discover(&bridge());
        let outcome = filter_loops(&mut loops, &mut branches);
        assert_eq!(outcome.eligible.len(), 4);

        let reversed: Vec<_> = branches.iter().filter(|b| b.reversals > 0).collect();
        assert_eq!(reversed.len(), 1);
        assert_eq!(reversed[0].steps.len(), 1);
        assert!(branches.iter().all(|b| b.valid));
    }

    #[test]
    fn test_rejections() {
        let node_crossing = Loop {
            id: LoopId(0),
            steps: vec![BranchStep {
                branch: BranchId(0),
                forward: true,
            }],
            nodes: vec![NodeId(0), NodeId(1), NodeId(0)],
            source: DeviceId(0),
            emf: 1.0,
            resistance: Resistance::Finite(1.0),
            status: LoopStatus::Candidate,
        };
        assert_eq!(judge(&node_crossing), LoopStatus::Rejected(Rejection::NodeCrossing));

        let mut open = node_crossing.clone();
        open.nodes = vec![NodeId(0), NodeId(1)];
        open.resistance = Resistance::Open;
        assert_eq!(judge(&open), LoopStatus::Rejected(Rejection::Open));

        let mut shorted = open.clone();
        shorted.resistance = Resistance::Short;
        assert_eq!(judge(&shorted), LoopStatus::Rejected(Rejection::Shorted));

        shorted.resistance = Resistance::Finite(2.0);
        assert_eq!(judge(&shorted), LoopStatus::Eligible);
    }

    #[test]
    fn test_relations() {
        let mut c = Circuit::new();
        c.add_device(Device::Battery(Battery::new("BAT1", 12.0))).unwrap();
        c.add_device(Device::Resistor(Resistor::new("R1", 4.0))).unwrap();
        c.add_device(Device::Resistor(Resistor::new("R2", 6.0))).unwrap();
        wire(&mut c, "W1", "BAT1.pos", "R1.left");
        wire(&mut c, "W2", "BAT1.pos", "R2.left");
        wire(&mut c, "W3", "R1.right", "BAT1.neg");
        wire(&mut c, "W4", "R2.right", "BAT1.neg");
        let (mut branches, mut loops) = discover(&c);
        let outcome = filter_loops(&mut loops, &mut branches);

        // both loads sit across the source branch
        assert_eq!(outcome.relations.parallel.len(), 3);
        assert_eq!(outcome.relations.series.len(), 2);
        assert!(branches.iter().all(|b| b.reversals == 0));
    }

    #[test]
    fn test_filter_is_a_fixed_point() {
        let (mut branches, mut loops) = discover(&bridge());
        let first = filter_loops(&mut loops, &mut branches);
        let valid: Vec<_> = first.valid_branches(&branches).collect();
        let second = filter_loops(&mut loops, &mut branches);
        assert_eq!(first, second);
        assert_eq!(valid, second.valid_branches(&branches).collect::<Vec<_>>());
    }
}
