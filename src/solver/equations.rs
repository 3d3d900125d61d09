//! Kirchhoff equation synthesis.
//!
//! Unknowns are the currents of valid branches with a finite, positive
//! resistance. One KVL row is written per eligible loop and, when the loops
//! leave the system short, KCL rows fill the remainder. A KCL row is a cut
//! around a node, or around several nodes joined by ideal sources. A row
//! joins the system only if it is linearly independent of the rows already
//! accepted.

use crate::circuit::{LoopId, NodeId};
use crate::topology::{BranchSet, Loop, NodeMap};

/// Which law a row expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquationKind {
    /// Voltage law around a loop
    Kvl(LoopId),
    /// Current law at a node
    Kcl(NodeId),
}

/// One row of the system: `coefficients · currents = constant`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub kind: EquationKind,
    /// One entry per branch index
    pub coefficients: Vec<f64>,
    pub constant: f64,
}

impl Equation {
    /// Number of coefficients above `epsilon` relative to the row's largest.
    pub fn nonzero_count(&self, epsilon: f64) -> usize {
        let floor = epsilon * self.scale();
        self.coefficients.iter().filter(|c| c.abs() > floor).count()
    }

    fn scale(&self) -> f64 {
        self.coefficients.iter().fold(0.0_f64, |acc, c| acc.max(c.abs()))
    }

    /// True if `other` is a scalar multiple of this row's coefficients,
    /// including the negated row.
    pub fn is_related(&self, other: &Equation, epsilon: f64) -> bool {
        let (sa, sb) = (self.scale(), other.scale());
        if sa == 0.0 || sb == 0.0 {
            return sa == sb;
        }
        let Some(pivot) = self.coefficients.iter().position(|c| c.abs() > epsilon * sa) else {
            return false;
        };
        let ratio = other.coefficients[pivot] / self.coefficients[pivot];
        if ratio == 0.0 {
            return false;
        }
        self.coefficients
            .iter()
            .zip(&other.coefficients)
            .all(|(a, b)| (b - ratio * a).abs() <= epsilon * sb)
    }

    /// `coefficients · x - constant`.
    pub fn residual(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(x)
            .map(|(c, v)| c * v)
            .sum::<f64>()
            - self.constant
    }
}

/// Accepted rows plus a reduced basis used for the independence test.
#[derive(Debug, Clone)]
pub struct EquationSet {
    rows: Vec<Equation>,
    /// Normalized basis rows with their pivot column
    basis: Vec<(usize, Vec<f64>)>,
    epsilon: f64,
}

impl EquationSet {
    pub fn new(epsilon: f64) -> Self {
        Self {
            rows: Vec::new(),
            basis: Vec::new(),
            epsilon,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Accept `eq` if it is independent of the accepted rows.
    pub fn try_push(&mut self, eq: Equation) -> bool {
        if eq.scale() == 0.0 {
            return false;
        }
        if self.rows.iter().any(|r| r.is_related(&eq, self.epsilon)) {
            log::trace!("{:?} rejected: proportional to an accepted row", eq.kind);
            return false;
        }

        let mut reduced = eq.coefficients.clone();
        for (pivot, row) in &self.basis {
            let factor = reduced[*pivot];
            if factor != 0.0 {
                for (r, b) in reduced.iter_mut().zip(row) {
                    *r -= factor * b;
                }
            }
        }

        let (pivot, max) = reduced
            .iter()
            .enumerate()
            .fold((0, 0.0_f64), |(pi, pm), (i, v)| if v.abs() > pm { (i, v.abs()) } else { (pi, pm) });
        if max <= self.epsilon * eq.scale() {
            log::trace!("{:?} rejected: linearly dependent", eq.kind);
            return false;
        }

        let p = reduced[pivot];
        for v in reduced.iter_mut() {
            *v /= p;
        }
        self.basis.push((pivot, reduced));
        self.rows.push(eq);
        true
    }

    pub fn into_rows(self) -> Vec<Equation> {
        self.rows
    }
}

/// Give each valid branch with a finite, positive resistance an equation
/// column, in first-appearance order across the eligible loops. Returns the
/// number of unknowns.
pub fn index_branches(branches: &mut BranchSet, loops: &[Loop], eligible: &[LoopId]) -> usize {
    for b in branches.branches.iter_mut() {
        b.index = None;
    }
    let mut next = 0;
    for &id in eligible {
        for step in &loops[id.0].steps {
            let branch = branches.get_mut(step.branch);
            if branch.valid && branch.index.is_none() && branch.resistance.is_positive() {
                branch.index = Some(next);
                next += 1;
            }
        }
    }
    next
}

/// KVL row for one loop.
pub fn kvl_row(l: &Loop, branches: &BranchSet, unknowns: usize) -> Equation {
    let mut coefficients = vec![0.0; unknowns];
    let mut constant = 0.0;
    for step in &l.steps {
        let branch = branches.get(step.branch);
        let sign = if step.forward { 1.0 } else { -1.0 };
        if let (Some(i), Some(r)) = (branch.index, branch.resistance.value()) {
            coefficients[i] += sign * r;
        }
        constant += sign * branch.emf;
    }
    Equation {
        kind: EquationKind::Kvl(l.id),
        coefficients,
        constant,
    }
}

/// Groups of nodes joined by valid branches that carry no unknown, such as
/// an ideal source. Each group is sorted and the groups are ordered by their
/// lowest node.
pub fn supernodes(node_count: usize, branches: &BranchSet) -> Vec<Vec<NodeId>> {
    let mut parent: Vec<usize> = (0..node_count).collect();
    fn root(parent: &mut [usize], mut n: usize) -> usize {
        while parent[n] != n {
            parent[n] = parent[parent[n]];
            n = parent[n];
        }
        n
    }

    for b in branches.iter().filter(|b| b.valid && b.index.is_none() && !b.is_ring()) {
        let (ra, rb) = (root(&mut parent, b.start.0), root(&mut parent, b.end.0));
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut groups: Vec<Vec<NodeId>> = vec![Vec::new(); node_count];
    for n in 0..node_count {
        let r = root(&mut parent, n);
        groups[r].push(NodeId(n));
    }
    groups.retain(|g| !g.is_empty());
    groups
}

/// KCL row for a cut around a group of nodes: current entering the group
/// positive, leaving negative. Branches inside the group cancel out.
///
/// `None` when no unknown crosses the cut.
pub fn kcl_row(group: &[NodeId], branches: &BranchSet, unknowns: usize) -> Option<Equation> {
    let first = *group.first()?;
    let mut coefficients = vec![0.0; unknowns];
    for &node in group {
        for b in branches.incident(node).filter(|b| b.valid && !b.is_ring()) {
            if let Some(i) = b.index {
                coefficients[i] += if b.end == node { 1.0 } else { -1.0 };
            }
        }
    }
    coefficients.iter().any(|c| *c != 0.0).then_some(Equation {
        kind: EquationKind::Kcl(first),
        coefficients,
        constant: 0.0,
    })
}

/// Build an independent set of rows, KVL first, then KCL by node group.
///
/// Groups are tried in order of how many unknown branches cross their cut,
/// most first, ties by lowest node id. Stops as soon as the set is square.
pub fn build_equations(
    branches: &BranchSet,
    loops: &[Loop],
    eligible: &[LoopId],
    nodes: &NodeMap,
    unknowns: usize,
    epsilon: f64,
) -> Vec<Equation> {
    let mut set = EquationSet::new(epsilon);

    for &id in eligible {
        if set.len() == unknowns {
            break;
        }
        set.try_push(kvl_row(&loops[id.0], branches, unknowns));
    }
    let kvl = set.len();

    if set.len() < unknowns {
        let mut rows: Vec<Equation> = supernodes(nodes.len(), branches)
            .iter()
            .filter_map(|group| kcl_row(group, branches, unknowns))
            .collect();
        rows.sort_by_key(|row| {
            let node = match row.kind {
                EquationKind::Kcl(n) => n,
                EquationKind::Kvl(_) => NodeId(usize::MAX),
            };
            (std::cmp::Reverse(row.nonzero_count(epsilon)), node)
        });

        for row in rows {
            if set.len() == unknowns {
                break;
            }
            set.try_push(row);
        }
    }

    log::debug!(
        "equations: {} KVL + {} KCL for {} unknowns",
        kvl,
        set.len() - kvl,
        unknowns
    );
    set.into_rows()
}
