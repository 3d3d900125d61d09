//! Topology discovery.
//!
//! Turns the raw component graph into the structures the equation builder
//! works on, one stage feeding the next:
//!
//! 1. [`merge_nodes`] collapses zero-resistance terminal groups into nodes.
//! 2. [`assemble_segments`] emits one oriented segment per element.
//! 3. [`find_branches`] chains segments between branch points.
//! 4. [`find_loops`] enumerates closed paths through each source.
//! 5. [`filter_loops`] keeps the loops and branches fit for equations.
//!
//! Every structure here is addressed by index and rebuilt from scratch on
//! each analysis pass.

mod branches;
mod filter;
mod loops;
mod nodes;
mod segments;
mod signature;

pub use branches::{find_branches, Branch, BranchSet, Step};
pub use filter::{filter_loops, FilterOutcome, Relations};
pub use loops::{find_loops, BranchStep, Loop, LoopLimits, LoopStatus, PathArena, Rejection};
pub use nodes::{merge_nodes, Node, NodeMap};
pub use segments::{assemble_segments, Segment};
pub use signature::{PathSignature, SegmentKey};
