//! Contig graph: junction nodes joined by contigs
//!
//! Nodes and contigs live in arenas addressed by [`NodeId`] and [`ContigId`].
//! A contig end names the node slot it hangs from, and that slot refers back
//! to the contig. Every mutation here keeps the two directions in step;
//! [`ContigGraph::verify`] reports any place where they disagree.

pub mod contig;
pub mod fastg;
pub mod node;
pub mod traverse;
pub mod verify;

pub use contig::{Contig, ContigEnd, ContigJuncs, JuncEntry, Side};
pub use node::{ContigId, ContigNode, NodeId};
pub use traverse::{LinkSummary, SearchEnd, SearchResult, find_neighbor, walk_from_sink};
pub use verify::Violation;

use ahash::AHashMap;
use tracing::{debug, info};

use crate::error::{AssemblyError, Result};
use crate::junction::{Extension, Junction};
use crate::kmer::KmerCodec;

#[derive(Debug, Clone)]
pub struct ContigGraph {
    codec: KmerCodec,
    nodes: Vec<Option<ContigNode>>,
    contigs: Vec<Option<Contig>>,
    node_index: AHashMap<u64, NodeId>,
}

impl ContigGraph {
    pub fn new(k: usize) -> Result<Self> {
        Ok(Self {
            codec: KmerCodec::new(k)?,
            nodes: Vec::new(),
            contigs: Vec::new(),
            node_index: AHashMap::new(),
        })
    }

    pub fn k(&self) -> usize {
        self.codec.k()
    }

    pub fn codec(&self) -> &KmerCodec {
        &self.codec
    }

    /// Add a node for an oriented junction k-mer; returns the existing node
    /// if there already is one
    pub fn add_node(&mut self, kmer: u64, junction: &Junction) -> NodeId {
        if let Some(&id) = self.node_index.get(&kmer) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(ContigNode::new(kmer, junction)));
        self.node_index.insert(kmer, id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&ContigNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut ContigNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn node_id(&self, kmer: u64) -> Option<NodeId> {
        self.node_index.get(&kmer).copied()
    }

    pub fn contig(&self, id: ContigId) -> Option<&Contig> {
        self.contigs.get(id.0).and_then(Option::as_ref)
    }

    fn contig_mut(&mut self, id: ContigId) -> Option<&mut Contig> {
        self.contigs.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ContigNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    pub fn contigs(&self) -> impl Iterator<Item = (ContigId, &Contig)> {
        self.contigs
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (ContigId(i), c)))
    }

    pub(crate) fn node_ids(&self) -> Vec<NodeId> {
        self.nodes().map(|(id, _)| id).collect()
    }

    pub(crate) fn contig_ids(&self) -> Vec<ContigId> {
        self.contigs().map(|(id, _)| id).collect()
    }

    /// Add a contig and point the slots at its ends back at it
    pub fn add_contig(
        &mut self,
        juncs: ContigJuncs,
        end1: Option<ContigEnd>,
        end2: Option<ContigEnd>,
    ) -> ContigId {
        let id = ContigId(self.contigs.len());
        self.contigs.push(Some(Contig::new(juncs, end1, end2)));
        for end in [end1, end2].into_iter().flatten() {
            if let Some(node) = self.node_mut(end.node) {
                node.set_contig(end.slot, Some(id));
            }
        }
        id
    }

    /// Remove a contig, clearing the node slots that still refer to it
    pub fn remove_contig(&mut self, id: ContigId) -> Option<Contig> {
        let contig = self.contigs.get_mut(id.0)?.take()?;
        for side in Side::BOTH {
            if let Some(end) = contig.end(side) {
                if let Some(node) = self.node_mut(end.node) {
                    if node.contig(end.slot) == Some(id) {
                        node.set_contig(end.slot, None);
                    }
                }
            }
        }
        Some(contig)
    }

    /// Remove a node; contig ends attached to it become dangling
    pub fn remove_node(&mut self, id: NodeId) -> Option<ContigNode> {
        let node = self.nodes.get_mut(id.0)?.take()?;
        self.node_index.remove(&node.kmer());
        for (slot, contig_id) in node.slots() {
            if let Some(contig) = self.contig_mut(contig_id) {
                for side in Side::BOTH {
                    if contig.end(side) == Some(ContigEnd::new(id, slot)) {
                        contig.set_end(side, None);
                    }
                }
            }
        }
        Some(node)
    }

    /// Reverse complement a contig in place
    pub fn reverse_contig(&mut self, id: ContigId) -> Result<()> {
        self.contig_mut(id)
            .ok_or(AssemblyError::UnknownContig(id.0))?
            .reverse();
        Ok(())
    }

    /// Join `a` and `b` across the node their `side_a` and `side_b` ends share.
    ///
    /// `a` and `b` are removed. The merged contig takes over their outer ends
    /// and the two slots they held on the shared node are cleared.
    pub fn concatenate(
        &mut self,
        a: ContigId,
        side_a: Side,
        b: ContigId,
        side_b: Side,
    ) -> Result<ContigId> {
        let contig_a = self.contig(a).ok_or(AssemblyError::UnknownContig(a.0))?;
        let contig_b = self.contig(b).ok_or(AssemblyError::UnknownContig(b.0))?;
        let shared = match (contig_a.end(side_a), contig_b.end(side_b)) {
            (Some(ea), Some(eb)) if ea.node == eb.node && a != b => ea.node,
            _ => return Err(AssemblyError::NotAdjacent(a.0, b.0)),
        };

        // orient as a -> shared node -> b
        let mut left = contig_a.clone();
        let mut right = contig_b.clone();
        if side_a == Side::One {
            left.reverse();
        }
        if side_b == Side::Two {
            right.reverse();
        }
        let merged = left
            .juncs()
            .concatenate(right.juncs(), self.k() - 1)
            .ok_or(AssemblyError::NotAdjacent(a.0, b.0))?;
        let leads_to_sink = left.leads_to_sink() || right.leads_to_sink();
        let (outer_a, outer_b) = (left.end(Side::One), right.end(Side::Two));

        self.remove_contig(a);
        self.remove_contig(b);
        let id = self.add_contig(merged, outer_a, outer_b);
        if let Some(contig) = self.contig_mut(id) {
            contig.set_leads_to_sink(leads_to_sink);
        }

        debug!(a = %a, b = %b, node = %shared, merged = %id, "Concatenated contigs");
        Ok(id)
    }

    /// Merge away a node with one backward and one forward contig
    pub fn collapse_node(&mut self, id: NodeId) -> Result<Option<ContigId>> {
        let node = self.node(id).ok_or(AssemblyError::UnknownNode(id.0))?;
        let Some(back) = node.contig(Extension::Backward) else {
            return Ok(None);
        };
        let forwards: Vec<(Extension, ContigId)> = node.forward_contigs().collect();
        let (fwd_slot, fwd) = match forwards.as_slice() {
            [(slot, contig)] => (*slot, *contig),
            _ => return Ok(None),
        };
        if fwd == back {
            return Ok(None);
        }

        let back_contig = self.contig(back).ok_or(AssemblyError::UnknownContig(back.0))?;
        let fwd_contig = self.contig(fwd).ok_or(AssemblyError::UnknownContig(fwd.0))?;
        if back_contig.is_degenerate_loop() || fwd_contig.is_degenerate_loop() {
            return Ok(None);
        }
        let (Some(side_back), Some(side_fwd)) = (
            back_contig.side_of(id, Extension::Backward),
            fwd_contig.side_of(id, fwd_slot),
        ) else {
            return Err(AssemblyError::NotAdjacent(back.0, fwd.0));
        };

        let merged = self.concatenate(back, side_back, fwd, side_fwd)?;
        self.remove_node(id);
        Ok(Some(merged))
    }

    /// Collapse every pass-through node; returns how many were removed
    pub fn collapse_pass_through_nodes(&mut self) -> Result<usize> {
        let mut collapsed = 0;
        for id in self.node_ids() {
            if self.collapse_node(id)?.is_some() {
                collapsed += 1;
            }
        }
        info!(collapsed, remaining = self.num_nodes(), "Collapsed pass-through nodes");
        Ok(collapsed)
    }

    /// Remove contigs shorter than `max_tip_length` that run into a dead end
    /// from a forward slot whose node has another forward contig
    pub fn cut_tips(&mut self, max_tip_length: usize) -> usize {
        let mut removed = 0;
        for id in self.contig_ids() {
            let Some(contig) = self.contig(id) else { continue };
            if !contig.is_dangling()
                || !contig.leads_to_sink()
                || contig.len() >= max_tip_length
            {
                continue;
            }
            let Some(end) = contig.end(Side::One).or(contig.end(Side::Two)) else {
                continue;
            };
            let Some(node) = self.node(end.node) else { continue };
            let has_sibling = end.slot.is_forward()
                && node.forward_contigs().any(|(slot, other)| slot != end.slot && other != id);
            if has_sibling {
                debug!(contig = %id, len = contig.len(), node = %end.node, "Cutting tip");
                self.remove_contig(id);
                removed += 1;
            }
        }
        let emptied = self.remove_empty_nodes();
        info!(removed, emptied, "Cut tips");
        removed
    }

    /// Drop nodes that no contig refers to
    pub fn remove_empty_nodes(&mut self) -> usize {
        let empty: Vec<NodeId> = self
            .nodes()
            .filter(|(_, node)| node.is_empty())
            .map(|(id, _)| id)
            .collect();
        for &id in &empty {
            self.remove_node(id);
        }
        empty.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes().count()
    }

    pub fn num_contigs(&self) -> usize {
        self.contigs().count()
    }

    pub fn total_length(&self) -> usize {
        self.contigs().map(|(_, c)| c.len()).sum()
    }

    /// Contig length at which half the total length is reached, longest first
    pub fn n50(&self) -> usize {
        let mut lengths: Vec<usize> = self.contigs().map(|(_, c)| c.len()).collect();
        lengths.sort_unstable_by(|a, b| b.cmp(a));
        let total: usize = lengths.iter().sum();
        let mut running = 0;
        for len in lengths {
            running += len;
            if running * 2 >= total {
                return len;
            }
        }
        0
    }
}
