//! Contig graph vertices

use std::fmt;

use crate::junction::{Extension, Junction, NUM_SLOTS};

/// Handle of a node in a [`super::ContigGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Handle of a contig in a [`super::ContigGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContigId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A junction promoted into the graph. Each slot refers back to the contig
/// leaving the node through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContigNode {
    kmer: u64,
    contigs: [Option<ContigId>; NUM_SLOTS],
    coverage: [u32; NUM_SLOTS],
    valid: [bool; NUM_SLOTS],
}

impl ContigNode {
    pub fn new(kmer: u64, junction: &Junction) -> Self {
        Self {
            kmer,
            contigs: [None; NUM_SLOTS],
            coverage: junction.coverage,
            valid: junction.valid,
        }
    }

    pub fn kmer(&self) -> u64 {
        self.kmer
    }

    pub fn contig(&self, slot: Extension) -> Option<ContigId> {
        self.contigs[slot.index()]
    }

    pub(crate) fn set_contig(&mut self, slot: Extension, contig: Option<ContigId>) {
        self.contigs[slot.index()] = contig;
    }

    pub fn coverage(&self, slot: Extension) -> u32 {
        self.coverage[slot.index()]
    }

    pub fn is_valid(&self, slot: Extension) -> bool {
        self.valid[slot.index()]
    }

    /// Occupied forward slots
    pub fn forward_contigs(&self) -> impl Iterator<Item = (Extension, ContigId)> + '_ {
        Extension::FORWARD
            .into_iter()
            .filter_map(|slot| self.contig(slot).map(|c| (slot, c)))
    }

    /// Occupied slots of any kind
    pub fn slots(&self) -> impl Iterator<Item = (Extension, ContigId)> + '_ {
        Extension::ALL
            .into_iter()
            .filter_map(|slot| self.contig(slot).map(|c| (slot, c)))
    }

    pub fn degree(&self) -> usize {
        self.contigs.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.degree() == 0
    }

    /// Slots a walk can continue through after entering the node by `slot`
    pub fn continuation_slots(slot: Extension) -> &'static [Extension] {
        match slot {
            Extension::Backward => &Extension::FORWARD,
            Extension::Forward(_) => &[Extension::Backward],
        }
    }
}
