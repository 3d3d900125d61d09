//! Branch discovery.
//!
//! A branch is a maximal chain of segments whose interior nodes join exactly
//! two traversable segments. Discovery starts from every source segment and
//! works through an explicit worklist: each closed chain queues the
//! unassigned segments at its junction ends as the next generation.

use std::collections::{HashSet, VecDeque};

use super::segments::Segment;
use super::signature::PathSignature;
use crate::circuit::{BranchId, NodeId, SegmentId};
use crate::components::Resistance;
use crate::error::{KirchhoffError, Result};

/// One segment of a branch and the direction it is walked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub segment: SegmentId,
    /// True when the branch walks the segment from `a` to `b`
    pub forward: bool,
}

/// A chain of segments with no internal branch point.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub id: BranchId,
    pub steps: Vec<Step>,
    pub start: NodeId,
    pub end: NodeId,
    /// Series sum of segment resistances
    pub resistance: Resistance,
    /// Net EMF driving current from `start` to `end`
    pub emf: f64,
    /// Current from `start` to `end`, once solved
    pub current: Option<f64>,
    /// Equation column, for branches that are unknowns of the system
    pub index: Option<usize>,
    /// Eligible loops walking this branch against its first observed direction
    pub reversals: usize,
    /// Part of at least one eligible loop
    pub valid: bool,
    /// Discovery generation
    pub depth: usize,
}

impl Branch {
    /// Start and end coincide.
    pub fn is_ring(&self) -> bool {
        self.start == self.end
    }

    /// Far end when entering from `node`.
    pub fn other_end(&self, node: NodeId) -> NodeId {
        if self.start == node {
            self.end
        } else {
            self.start
        }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.start == node || self.end == node
    }

    pub fn contains(&self, segment: SegmentId) -> bool {
        self.steps.iter().any(|s| s.segment == segment)
    }

    /// Direction of `segment` within this branch.
    pub fn step_of(&self, segment: SegmentId) -> Option<Step> {
        self.steps.iter().copied().find(|s| s.segment == segment)
    }

    pub fn has_source(&self, segments: &[Segment]) -> bool {
        self.steps.iter().any(|s| segments[s.segment.0].is_source())
    }

    /// Number of load segments (passive, positive resistance).
    pub fn load_count(&self, segments: &[Segment]) -> usize {
        self.steps
            .iter()
            .filter(|s| segments[s.segment.0].is_load())
            .count()
    }
}

/// Discovered branches plus the segment to branch map.
#[derive(Debug, Clone, Default)]
pub struct BranchSet {
    pub branches: Vec<Branch>,
    segment_branch: Vec<Option<BranchId>>,
}

impl BranchSet {
    /// Assemble a set from prebuilt branches.
    pub fn from_branches(branches: Vec<Branch>, segment_count: usize) -> Self {
        let mut segment_branch = vec![None; segment_count];
        for b in &branches {
            for step in &b.steps {
                if let Some(slot) = segment_branch.get_mut(step.segment.0) {
                    *slot = Some(b.id);
                }
            }
        }
        Self {
            branches,
            segment_branch,
        }
    }

    pub fn get(&self, id: BranchId) -> &Branch {
        &self.branches[id.0]
    }

    pub fn get_mut(&mut self, id: BranchId) -> &mut Branch {
        &mut self.branches[id.0]
    }

    /// Branch owning a segment, if any.
    pub fn branch_of(&self, segment: SegmentId) -> Option<BranchId> {
        self.segment_branch.get(segment.0).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Branch> {
        self.branches.iter()
    }

    /// Branches with an end at `node`, in id order.
    pub fn incident(&self, node: NodeId) -> impl Iterator<Item = &Branch> {
        self.branches.iter().filter(move |b| b.touches(node))
    }

    /// Number of branches with an equation column.
    pub fn unknowns(&self) -> usize {
        self.branches.iter().filter(|b| b.index.is_some()).count()
    }
}

/// Which open ends of a chain may still grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extend {
    Head,
    Tail,
    Both,
    Neither,
}

impl Extend {
    fn from_ends(head: bool, tail: bool) -> Self {
        match (head, tail) {
            (true, true) => Extend::Both,
            (true, false) => Extend::Head,
            (false, true) => Extend::Tail,
            (false, false) => Extend::Neither,
        }
    }
}

/// Traversable segments at each node and their degree. A self-loop counts
/// twice towards the degree.
struct Incidence {
    segments: Vec<Vec<SegmentId>>,
    degree: Vec<usize>,
}

impl Incidence {
    fn new(segments: &[Segment], node_count: usize) -> Self {
        let mut incidence = Self {
            segments: vec![Vec::new(); node_count],
            degree: vec![0; node_count],
        };
        for s in segments.iter().filter(|s| s.is_traversable()) {
            incidence.segments[s.node_a.0].push(s.id);
            incidence.degree[s.node_a.0] += 1;
            if s.node_b != s.node_a {
                incidence.segments[s.node_b.0].push(s.id);
            }
            incidence.degree[s.node_b.0] += 1;
        }
        incidence
    }

    /// The segment continuing a chain through `node`, if `node` is a plain
    /// pass-through point.
    fn continuation(&self, node: NodeId, from: SegmentId) -> Option<SegmentId> {
        if self.degree[node.0] != 2 {
            return None;
        }
        self.segments[node.0].iter().copied().find(|&s| s != from)
    }
}

/// A chain under construction.
struct Chain {
    steps: VecDeque<Step>,
    head: NodeId,
    tail: NodeId,
}

impl Chain {
    fn seed(segment: &Segment) -> Self {
        let mut steps = VecDeque::new();
        steps.push_back(Step {
            segment: segment.id,
            forward: true,
        });
        Self {
            steps,
            head: segment.node_a,
            tail: segment.node_b,
        }
    }

    fn contains(&self, segment: SegmentId) -> bool {
        self.steps.iter().any(|s| s.segment == segment)
    }

    fn head_segment(&self) -> SegmentId {
        self.steps.front().map(|s| s.segment).unwrap_or(SegmentId(0))
    }

    fn tail_segment(&self) -> SegmentId {
        self.steps.back().map(|s| s.segment).unwrap_or(SegmentId(0))
    }
}

/// Discover every branch reachable from a source.
///
/// Segments never reached (islands without a source) belong to no branch.
/// Fails with [`KirchhoffError::TooDeep`] when discovery runs more than
/// `max_depth` generations away from the sources.
pub fn find_branches(segments: &[Segment], node_count: usize, max_depth: usize) -> Result<BranchSet> {
    let incidence = Incidence::new(segments, node_count);
    let mut set = BranchSet {
        branches: Vec::new(),
        segment_branch: vec![None; segments.len()],
    };
    let mut seen: HashSet<PathSignature> = HashSet::new();

    let mut worklist: VecDeque<(SegmentId, usize)> = segments
        .iter()
        .filter(|s| s.is_source() && s.is_traversable())
        .map(|s| (s.id, 0))
        .collect();

    while let Some((seed, depth)) = worklist.pop_front() {
        if set.segment_branch[seed.0].is_some() {
            continue;
        }
        if depth > max_depth {
            return Err(KirchhoffError::TooDeep { limit: max_depth });
        }

        let chain = grow_chain(segments, &incidence, &set.segment_branch, &segments[seed.0]);

        let signature = PathSignature::open(
            chain
                .steps
                .iter()
                .map(|s| segments[s.segment.0].key())
                .collect(),
        );
        if !seen.insert(signature) {
            continue;
        }

        let id = BranchId(set.branches.len());
        let steps: Vec<Step> = chain.steps.into_iter().collect();
        let mut resistance = Resistance::Short;
        let mut emf = 0.0;
        for step in &steps {
            let s = &segments[step.segment.0];
            set.segment_branch[s.id.0] = Some(id);
            resistance = resistance + s.resistance;
            emf += if step.forward { s.emf } else { -s.emf };
        }

        log::trace!(
            "branch {}: {} segments, {} -> {}, R = {}",
            id,
            steps.len(),
            chain.head,
            chain.tail,
            resistance
        );

        for end in [chain.head, chain.tail] {
            if incidence.degree[end.0] == 2 {
                continue;
            }
            for &next in &incidence.segments[end.0] {
                if set.segment_branch[next.0].is_none() {
                    worklist.push_back((next, depth + 1));
                }
            }
        }

        set.branches.push(Branch {
            id,
            steps,
            start: chain.head,
            end: chain.tail,
            resistance,
            emf,
            current: None,
            index: None,
            reversals: 0,
            valid: false,
            depth,
        });
    }

    Ok(set)
}

/// Extend a chain from `seed` in both directions through pass-through
/// nodes until neither end can grow.
fn grow_chain(
    segments: &[Segment],
    incidence: &Incidence,
    assigned: &[Option<BranchId>],
    seed: &Segment,
) -> Chain {
    let mut chain = Chain::seed(seed);

    loop {
        let next_at = |node: NodeId, from: SegmentId, chain: &Chain| {
            incidence
                .continuation(node, from)
                .filter(|&s| assigned[s.0].is_none() && !chain.contains(s))
                .filter(|&s| !segments[s.0].is_internal())
        };
        let head_next = next_at(chain.head, chain.head_segment(), &chain);
        let tail_next = next_at(chain.tail, chain.tail_segment(), &chain);

        let allow = Extend::from_ends(head_next.is_some(), tail_next.is_some());
        if allow == Extend::Neither {
            return chain;
        }

        if let (Extend::Tail | Extend::Both, Some(next)) = (allow, tail_next) {
            let s = &segments[next.0];
            let forward = s.node_a == chain.tail;
            chain.steps.push_back(Step {
                segment: next,
                forward,
            });
            chain.tail = s.other_node(chain.tail);
        }

        // the tail may have just consumed the head's candidate
        if let (Extend::Head | Extend::Both, Some(next)) = (allow, head_next) {
            if chain.contains(next) {
                continue;
            }
            let s = &segments[next.0];
            let forward = s.node_b == chain.head;
            chain.steps.push_front(Step {
                segment: next,
                forward,
            });
            chain.head = s.other_node(chain.head);
        }
    }
}
