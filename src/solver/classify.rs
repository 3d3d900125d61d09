//! Fault and topology classification.

use std::fmt;

use crate::circuit::BranchId;
use crate::topology::{BranchSet, FilterOutcome, Loop, Segment};

/// Overall state of an analyzed circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// No closed path through any source
    None,
    /// Every loop is broken somewhere
    AllOpen,
    /// A source is shorted by a zero-resistance loop
    PowerShort,
    /// One loop with at most one load
    Basic,
    /// One loop with several loads
    Series,
    /// Loads each directly across the sources
    Parallel,
    /// A branch whose current direction depends on the values
    Bridge,
    /// Series and parallel combined
    Mixed,
}

impl Classification {
    /// Currents and potentials can be computed for this state.
    pub fn is_solvable(&self) -> bool {
        !matches!(
            self,
            Classification::None | Classification::AllOpen | Classification::PowerShort
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::None => "none",
            Classification::AllOpen => "all-open",
            Classification::PowerShort => "power-short",
            Classification::Basic => "basic",
            Classification::Series => "series",
            Classification::Parallel => "parallel",
            Classification::Bridge => "bridge",
            Classification::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valid passive branches walked in both directions by eligible loops.
pub fn bridge_branches(branches: &BranchSet, segments: &[Segment]) -> Vec<BranchId> {
    branches
        .iter()
        .filter(|b| b.valid && b.reversals >= 1 && !b.has_source(segments))
        .map(|b| b.id)
        .collect()
}

/// Classify a circuit from its filtered loops.
pub fn classify(
    loops: &[Loop],
    outcome: &FilterOutcome,
    branches: &BranchSet,
    segments: &[Segment],
    epsilon: f64,
) -> Classification {
    if loops.is_empty() {
        return Classification::None;
    }
    if loops.iter().all(|l| l.resistance.is_open()) {
        return Classification::AllOpen;
    }
    if loops
        .iter()
        .any(|l| l.resistance.is_short() && l.emf.abs() > epsilon)
    {
        return Classification::PowerShort;
    }
    if outcome.eligible.is_empty() {
        return Classification::None;
    }
    if !bridge_branches(branches, segments).is_empty() {
        return Classification::Bridge;
    }

    if let [only] = outcome.eligible.as_slice() {
        let l = &loops[only.0];
        let loads: usize = l
            .steps
            .iter()
            .map(|s| branches.get(s.branch).load_count(segments))
            .sum();
        return if loads <= 1 {
            Classification::Basic
        } else {
            Classification::Series
        };
    }

    let loaded = |id: BranchId| branches.get(id).load_count(segments) > 0;
    let source_loaded = branches
        .iter()
        .any(|b| b.valid && b.has_source(segments) && b.load_count(segments) > 0);
    let chained_loads = outcome
        .relations
        .series
        .iter()
        .any(|&(x, y)| loaded(x) && loaded(y));

    if source_loaded || chained_loads {
        Classification::Mixed
    } else {
        Classification::Parallel
    }
}
