//! Canonical path signatures.
//!
//! Two discovered paths are the same path when they visit the same
//! segments in the same order, read in either direction. For closed loops
//! the starting point is irrelevant too. Signatures compare element and
//! terminal ids, never display names.

use crate::circuit::{ElementRef, TerminalId};

/// Undirected identity of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentKey {
    pub element: ElementRef,
    /// Bounding terminals, lower id first
    pub terminals: (TerminalId, TerminalId),
}

impl SegmentKey {
    pub fn new(element: ElementRef, a: TerminalId, b: TerminalId) -> Self {
        Self {
            element,
            terminals: (a.min(b), a.max(b)),
        }
    }
}

/// Direction- and rotation-independent identity of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathSignature(Vec<SegmentKey>);

impl PathSignature {
    /// Signature of an open path: the lesser of the forward and reversed
    /// sequences.
    pub fn open(keys: Vec<SegmentKey>) -> Self {
        let mut reversed = keys.clone();
        reversed.reverse();
        Self(keys.min(reversed))
    }

    /// Signature of a closed path: the least rotation of the forward and
    /// reversed sequences.
    pub fn cyclic(keys: Vec<SegmentKey>) -> Self {
        let mut reversed = keys.clone();
        reversed.reverse();
        Self(least_rotation(&keys).min(least_rotation(&reversed)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn least_rotation(keys: &[SegmentKey]) -> Vec<SegmentKey> {
    let n = keys.len();
    let mut best: Option<Vec<SegmentKey>> = None;
    for shift in 0..n {
        let rotated: Vec<SegmentKey> = keys[shift..].iter().chain(&keys[..shift]).copied().collect();
        if best.as_ref().map_or(true, |b| rotated < *b) {
            best = Some(rotated);
        }
    }
    best.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{DeviceId, WireId};

    fn key(device: usize, a: usize, b: usize) -> SegmentKey {
        SegmentKey::new(ElementRef::Device(DeviceId(device)), TerminalId(a), TerminalId(b))
    }

    #[test]
    fn test_segment_key_is_undirected() {
        assert_eq!(key(1, 2, 3), key(1, 3, 2));
        let wire = SegmentKey::new(ElementRef::Wire(WireId(1)), TerminalId(2), TerminalId(3));
        assert_ne!(key(1, 2, 3), wire);
    }

    #[test]
    fn test_open_signature_ignores_direction() {
        let fwd = vec![key(0, 0, 1), key(1, 2, 3), key(2, 4, 5)];
        let mut rev = fwd.clone();
        rev.reverse();
        assert_eq!(PathSignature::open(fwd.clone()), PathSignature::open(rev));

        let other = vec![key(1, 2, 3), key(0, 0, 1), key(2, 4, 5)];
        assert_ne!(PathSignature::open(fwd), PathSignature::open(other));
    }

    #[test]
    fn test_cyclic_signature_ignores_start_and_direction() {
        let base = vec![key(0, 0, 1), key(1, 2, 3), key(2, 4, 5), key(3, 6, 7)];
        let rotated = vec![key(2, 4, 5), key(3, 6, 7), key(0, 0, 1), key(1, 2, 3)];
        let reversed = vec![key(1, 2, 3), key(0, 0, 1), key(3, 6, 7), key(2, 4, 5)];
        let sig = PathSignature::cyclic(base);
        assert_eq!(sig, PathSignature::cyclic(rotated));
        assert_eq!(sig, PathSignature::cyclic(reversed));
        assert_eq!(sig.len(), 4);
    }
}
