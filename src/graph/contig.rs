//! Contigs: sequence, coverage annotations and the two ends

use crate::junction::Extension;
use crate::kmer::revcomp_string;

use super::node::NodeId;

/// Coverage annotation at a sequence offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JuncEntry {
    pub position: usize,
    pub coverage: u32,
}

/// Contig sequence with its coverage annotations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContigJuncs {
    seq: Vec<u8>,
    entries: Vec<JuncEntry>,
}

impl ContigJuncs {
    pub fn new(seq: Vec<u8>) -> Self {
        Self {
            seq,
            entries: Vec::new(),
        }
    }

    pub fn seq(&self) -> &[u8] {
        &self.seq
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn entries(&self) -> &[JuncEntry] {
        &self.entries
    }

    pub fn add(&mut self, position: usize, coverage: u32) {
        self.entries.push(JuncEntry { position, coverage });
    }

    /// Reverse complement the sequence and mirror the annotations
    pub fn reverse(&mut self) {
        self.seq = revcomp_string(&self.seq);
        let last = self.seq.len().saturating_sub(1);
        self.entries.reverse();
        for entry in &mut self.entries {
            entry.position = last - entry.position;
        }
    }

    /// Join `other` onto the end of `self`; the two share `overlap` bases.
    /// `None` if either is shorter than `overlap` or the shared bases differ.
    pub fn concatenate(&self, other: &ContigJuncs, overlap: usize) -> Option<ContigJuncs> {
        if self.seq.len() < overlap
            || other.seq.len() < overlap
            || self.seq[self.seq.len() - overlap..] != other.seq[..overlap]
        {
            return None;
        }
        let shift = self.seq.len() - overlap;
        let mut seq = Vec::with_capacity(shift + other.seq.len());
        seq.extend_from_slice(&self.seq);
        seq.extend_from_slice(&other.seq[overlap..]);

        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().map(|e| JuncEntry {
            position: e.position + shift,
            coverage: e.coverage,
        }));
        Some(ContigJuncs { seq, entries })
    }

    /// Mean annotated coverage, 0 without annotations
    pub fn avg_coverage(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total: u64 = self.entries.iter().map(|e| e.coverage as u64).sum();
        total as f64 / self.entries.len() as f64
    }
}

/// Contig end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::One, Side::Two];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    #[inline]
    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

/// Node slot a contig end is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContigEnd {
    pub node: NodeId,
    pub slot: Extension,
}

impl ContigEnd {
    pub fn new(node: NodeId, slot: Extension) -> Self {
        Self { node, slot }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    juncs: ContigJuncs,
    ends: [Option<ContigEnd>; 2],
    leads_to_sink: bool,
}

impl Contig {
    pub fn new(juncs: ContigJuncs, end1: Option<ContigEnd>, end2: Option<ContigEnd>) -> Self {
        Self {
            juncs,
            ends: [end1, end2],
            leads_to_sink: false,
        }
    }

    pub fn juncs(&self) -> &ContigJuncs {
        &self.juncs
    }

    pub fn seq(&self) -> &[u8] {
        self.juncs.seq()
    }

    pub fn len(&self) -> usize {
        self.juncs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.juncs.is_empty()
    }

    pub fn avg_coverage(&self) -> f64 {
        self.juncs.avg_coverage()
    }

    pub fn end(&self, side: Side) -> Option<ContigEnd> {
        self.ends[side.index()]
    }

    /// The walk that built this contig stopped at a dead end
    pub fn leads_to_sink(&self) -> bool {
        self.leads_to_sink
    }

    pub(crate) fn set_leads_to_sink(&mut self, leads_to_sink: bool) {
        self.leads_to_sink = leads_to_sink;
    }

    pub(crate) fn set_end(&mut self, side: Side, end: Option<ContigEnd>) {
        self.ends[side.index()] = end;
    }

    /// Which side is attached to `(node, slot)`; side one wins for a
    /// degenerate loop
    pub fn side_of(&self, node: NodeId, slot: Extension) -> Option<Side> {
        let target = Some(ContigEnd { node, slot });
        Side::BOTH.into_iter().find(|&side| self.end(side) == target)
    }

    /// No node at either end
    pub fn is_isolated(&self) -> bool {
        self.ends.iter().all(Option::is_none)
    }

    /// Attached to a node at exactly one end
    pub fn is_dangling(&self) -> bool {
        self.ends.iter().filter(|e| e.is_some()).count() == 1
    }

    /// Both ends on the same node slot
    pub fn is_degenerate_loop(&self) -> bool {
        self.ends[0].is_some() && self.ends[0] == self.ends[1]
    }

    /// Reverse complement in place; the sides swap
    pub fn reverse(&mut self) {
        self.juncs.reverse();
        self.ends.swap(0, 1);
    }
}
