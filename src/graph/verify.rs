//! Structural integrity checks for the contig graph

use std::fmt;

use tracing::warn;

use super::contig::Side;
use super::node::{ContigId, NodeId};
use super::ContigGraph;
use crate::junction::Extension;

/// A place where contig ends and node slots disagree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Contig end names a node that is not in the graph
    MissingNode {
        contig: ContigId,
        side: Side,
        node: NodeId,
    },
    /// The node slot named by a contig end refers elsewhere
    BackReference {
        contig: ContigId,
        side: Side,
        node: NodeId,
        slot: Extension,
        found: Option<ContigId>,
    },
    /// The contig does not resolve its own end back to the same side
    SideMismatch {
        contig: ContigId,
        side: Side,
        node: NodeId,
        slot: Extension,
    },
    /// A node slot refers to a contig that is gone or does not end there
    DanglingSlot {
        node: NodeId,
        slot: Extension,
        contig: ContigId,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingNode { contig, side, node } => {
                write!(f, "contig {} side {:?} names missing node {}", contig, side, node)
            }
            Violation::BackReference {
                contig,
                side,
                node,
                slot,
                found,
            } => write!(
                f,
                "contig {} side {:?} attached to node {} slot {} which refers to {:?}",
                contig, side, node, slot, found
            ),
            Violation::SideMismatch {
                contig,
                side,
                node,
                slot,
            } => write!(
                f,
                "contig {} side {:?} at node {} slot {} resolves to the other side",
                contig, side, node, slot
            ),
            Violation::DanglingSlot { node, slot, contig } => {
                write!(f, "node {} slot {} refers to contig {} which does not end there", node, slot, contig)
            }
        }
    }
}

impl ContigGraph {
    /// Every disagreement between contig ends and node slots
    pub fn verify(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (id, contig) in self.contigs() {
            for side in Side::BOTH {
                let Some(end) = contig.end(side) else { continue };
                let Some(node) = self.node(end.node) else {
                    violations.push(Violation::MissingNode {
                        contig: id,
                        side,
                        node: end.node,
                    });
                    continue;
                };
                let found = node.contig(end.slot);
                if found != Some(id) {
                    violations.push(Violation::BackReference {
                        contig: id,
                        side,
                        node: end.node,
                        slot: end.slot,
                        found,
                    });
                }
                if !contig.is_degenerate_loop() && contig.side_of(end.node, end.slot) != Some(side) {
                    violations.push(Violation::SideMismatch {
                        contig: id,
                        side,
                        node: end.node,
                        slot: end.slot,
                    });
                }
            }
        }

        for (node_id, node) in self.nodes() {
            for (slot, contig_id) in node.slots() {
                let attached = self
                    .contig(contig_id)
                    .and_then(|c| c.side_of(node_id, slot))
                    .is_some();
                if !attached {
                    violations.push(Violation::DanglingSlot {
                        node: node_id,
                        slot,
                        contig: contig_id,
                    });
                }
            }
        }

        violations
    }

    /// Log every violation; true if the graph is consistent
    pub fn check_validity(&self) -> bool {
        let violations = self.verify();
        for violation in &violations {
            warn!(%violation, "Contig graph integrity violation");
        }
        violations.is_empty()
    }
}
