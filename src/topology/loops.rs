//! Loop discovery.
//!
//! Loops are enumerated at branch level. From every source, a depth-first
//! search extends partial paths out of the source's positive end until one
//! returns to the negative end. Partial paths live in a [`PathArena`] as
//! parent-linked entries, so exploring an alternative never copies the
//! shared prefix.

use std::collections::HashSet;

use super::branches::{BranchSet, Step};
use super::segments::Segment;
use super::signature::PathSignature;
use crate::circuit::{BranchId, DeviceId, LoopId, NodeId};
use crate::components::Resistance;
use crate::error::{KirchhoffError, Result};

/// One branch of a loop and the direction it is walked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchStep {
    pub branch: BranchId,
    /// True when the loop walks the branch from `start` to `end`
    pub forward: bool,
}

/// Why a loop was kept out of the equation system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The path passes through a node twice
    NodeCrossing,
    /// No resistance around the loop
    Shorted,
    /// No conducting path around the loop
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Candidate,
    Eligible,
    Rejected(Rejection),
}

/// A closed path through a source.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub id: LoopId,
    pub steps: Vec<BranchStep>,
    /// Node at the start of each step; the path closes on `nodes[0]`
    pub nodes: Vec<NodeId>,
    /// Source the loop was discovered from
    pub source: DeviceId,
    /// Net EMF along the walking direction
    pub emf: f64,
    pub resistance: Resistance,
    pub status: LoopStatus,
}

impl Loop {
    pub fn is_eligible(&self) -> bool {
        self.status == LoopStatus::Eligible
    }

    /// Direction this loop walks `branch`, if it uses it.
    pub fn direction_of(&self, branch: BranchId) -> Option<bool> {
        self.steps
            .iter()
            .find(|s| s.branch == branch)
            .map(|s| s.forward)
    }

    /// The loop expanded to segments in walking order.
    pub fn segment_steps(&self, branches: &BranchSet) -> Vec<Step> {
        let mut out = Vec::new();
        for step in &self.steps {
            let branch = branches.get(step.branch);
            if step.forward {
                out.extend(branch.steps.iter().copied());
            } else {
                out.extend(branch.steps.iter().rev().map(|s| Step {
                    segment: s.segment,
                    forward: !s.forward,
                }));
            }
        }
        out
    }
}

/// Arena of partial paths. Each entry adds one step to its parent's path.
#[derive(Debug, Default)]
pub struct PathArena {
    entries: Vec<PathEntry>,
}

#[derive(Debug, Clone, Copy)]
struct PathEntry {
    step: BranchStep,
    /// Node reached after the step
    node: NodeId,
    parent: Option<usize>,
    len: usize,
}

impl PathArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the path ending at `parent` by one step.
    pub fn push(&mut self, parent: Option<usize>, step: BranchStep, node: NodeId) -> usize {
        let len = parent.map_or(1, |p| self.entries[p].len + 1);
        self.entries.push(PathEntry {
            step,
            node,
            parent,
            len,
        });
        self.entries.len() - 1
    }

    pub fn node(&self, at: usize) -> NodeId {
        self.entries[at].node
    }

    pub fn len_of(&self, at: usize) -> usize {
        self.entries[at].len
    }

    fn walk(&self, at: usize) -> impl Iterator<Item = &PathEntry> {
        let mut cursor = Some(at);
        std::iter::from_fn(move || {
            let entry = &self.entries[cursor?];
            cursor = entry.parent;
            Some(entry)
        })
    }

    pub fn uses_branch(&self, at: usize, branch: BranchId) -> bool {
        self.walk(at).any(|e| e.step.branch == branch)
    }

    pub fn visits(&self, at: usize, node: NodeId) -> bool {
        self.walk(at).any(|e| e.node == node)
    }

    /// Steps and reached nodes from the root to `at`.
    pub fn path(&self, at: usize) -> Vec<(BranchStep, NodeId)> {
        let mut out: Vec<(BranchStep, NodeId)> = self.walk(at).map(|e| (e.step, e.node)).collect();
        out.reverse();
        out
    }
}

/// Limits applied to loop enumeration.
#[derive(Debug, Clone, Copy)]
pub struct LoopLimits {
    /// Longest partial path, in branches
    pub max_depth: usize,
    /// Most distinct loops
    pub max_loops: usize,
}

/// Enumerate every distinct simple loop through a source.
pub fn find_loops(segments: &[Segment], branches: &BranchSet, limits: LoopLimits) -> Result<Vec<Loop>> {
    let mut loops: Vec<Loop> = Vec::new();
    let mut seen: HashSet<PathSignature> = HashSet::new();

    let adjacency = branch_adjacency(branches);

    for source in segments.iter().filter(|s| s.is_source()) {
        let Some(device) = source.source else {
            continue;
        };
        let Some(branch_id) = branches.branch_of(source.id) else {
            continue;
        };
        let branch = branches.get(branch_id);
        let forward = branch.step_of(source.id).map_or(true, |s| s.forward);
        let origin = if forward { branch.start } else { branch.end };
        let first = BranchStep {
            branch: branch_id,
            forward,
        };

        if branch.is_ring() {
            let candidate = vec![(first, origin)];
            record_loop(&mut loops, &mut seen, segments, branches, origin, device, candidate, limits)?;
            continue;
        }

        let mut arena = PathArena::new();
        let root = arena.push(None, first, branch.other_end(origin));
        let mut stack = vec![root];

        while let Some(at) = stack.pop() {
            if arena.len_of(at) > limits.max_depth {
                return Err(KirchhoffError::TooDeep {
                    limit: limits.max_depth,
                });
            }
            let node = arena.node(at);
            let mut children = Vec::new();

            for &next_id in adjacency.get(node.0).map(Vec::as_slice).unwrap_or(&[]) {
                let next = branches.get(next_id);
                if next.is_ring() || arena.uses_branch(at, next_id) {
                    continue;
                }
                let step = BranchStep {
                    branch: next_id,
                    forward: next.start == node,
                };
                let reached = next.other_end(node);

                if reached == origin {
                    let mut candidate = arena.path(at);
                    candidate.push((step, reached));
                    record_loop(&mut loops, &mut seen, segments, branches, origin, device, candidate, limits)?;
                } else if !arena.visits(at, reached) {
                    children.push(arena.push(Some(at), step, reached));
                }
            }

            // explore in adjacency order
            stack.extend(children.into_iter().rev());
        }
    }

    Ok(loops)
}

/// Branches incident to each node, ids ascending.
fn branch_adjacency(branches: &BranchSet) -> Vec<Vec<BranchId>> {
    let node_count = branches
        .iter()
        .map(|b| b.start.0.max(b.end.0) + 1)
        .max()
        .unwrap_or(0);
    let mut adjacency = vec![Vec::new(); node_count];
    for b in branches.iter() {
        adjacency[b.start.0].push(b.id);
        if b.end != b.start {
            adjacency[b.end.0].push(b.id);
        }
    }
    adjacency
}

#[allow(clippy::too_many_arguments)]
fn record_loop(
    loops: &mut Vec<Loop>,
    seen: &mut HashSet<PathSignature>,
    segments: &[Segment],
    branches: &BranchSet,
    origin: NodeId,
    source: DeviceId,
    path: Vec<(BranchStep, NodeId)>,
    limits: LoopLimits,
) -> Result<()> {
    let steps: Vec<BranchStep> = path.iter().map(|(s, _)| *s).collect();
    let mut nodes = vec![origin];
    nodes.extend(path.iter().take(path.len().saturating_sub(1)).map(|(_, n)| *n));

    let mut candidate = Loop {
        id: LoopId(loops.len()),
        steps,
        nodes,
        source,
        emf: 0.0,
        resistance: Resistance::Short,
        status: LoopStatus::Candidate,
    };

    let walked = candidate.segment_steps(branches);
    let signature = PathSignature::cyclic(walked.iter().map(|s| segments[s.segment.0].key()).collect());
    if !seen.insert(signature) {
        return Ok(());
    }
    if loops.len() >= limits.max_loops {
        return Err(KirchhoffError::TooManyLoops {
            limit: limits.max_loops,
        });
    }

    for step in &candidate.steps {
        let branch = branches.get(step.branch);
        candidate.resistance = candidate.resistance + branch.resistance;
        candidate.emf += if step.forward { branch.emf } else { -branch.emf };
    }

    log::trace!(
        "loop {}: {} branches from source {}, emf = {}, R = {}",
        candidate.id,
        candidate.steps.len(),
        source,
        candidate.emf,
        candidate.resistance
    );
    loops.push(candidate);
    Ok(())
}
