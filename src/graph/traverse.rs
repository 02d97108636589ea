//! Filter-driven walks between nodes
//!
//! A walk leaves a node through one of its slots and follows the unique
//! valid extension of each k-mer until it reaches another node, a dead end
//! or an unexpected branch. The walked sequence starts with the first `k-1`
//! bases of the first k-mer and gains one base per k-mer the contig owns.

use ahash::AHashSet;
use tracing::{debug, info};

use crate::filter::{BloomFilter, DoubleKmer};
use crate::junction::Extension;
use crate::kmer::{base_char, complement};
use crate::oracle::{ExtensionOracle, valid_extensions};

use super::contig::{ContigEnd, ContigJuncs};
use super::ContigGraph;

/// Where a walk stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEnd {
    /// Arrived at a node through `slot`
    Node { kmer: u64, slot: Extension },
    /// Oriented k-mer with no valid forward extension
    Sink { kmer: u64 },
    /// K-mer with several valid extensions that is not a node
    Branch { kmer: u64 },
    /// Walk exceeded the length bound
    Limit,
}

/// Outcome of a walk: its end and the walked sequence
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub end: SearchEnd,
    pub juncs: ContigJuncs,
}

/// Walk out of node `start` through `slot`
pub fn find_neighbor(
    start: u64,
    slot: Extension,
    filter: &BloomFilter,
    oracle: &dyn ExtensionOracle,
    is_node: &dyn Fn(u64) -> bool,
    max_len: usize,
) -> SearchResult {
    let node = DoubleKmer::from_kmer(start, filter.rolling());
    match slot {
        Extension::Forward(base) => walk(
            node.extend(base, filter.rolling()),
            Some(node),
            filter,
            oracle,
            is_node,
            max_len,
        ),
        Extension::Backward => walk(node.reversed(), None, filter, oracle, is_node, max_len),
    }
}

/// Walk away from the dead-end k-mer `sink`, i.e. along its reverse complement
pub fn walk_from_sink(
    sink: u64,
    filter: &BloomFilter,
    oracle: &dyn ExtensionOracle,
    is_node: &dyn Fn(u64) -> bool,
    max_len: usize,
) -> SearchResult {
    let start = DoubleKmer::from_kmer(sink, filter.rolling()).reversed();
    walk(start, None, filter, oracle, is_node, max_len)
}

fn walk(
    mut cur: DoubleKmer,
    mut pred: Option<DoubleKmer>,
    filter: &BloomFilter,
    oracle: &dyn ExtensionOracle,
    is_node: &dyn Fn(u64) -> bool,
    max_len: usize,
) -> SearchResult {
    let codec = filter.codec();
    let k = codec.k();
    let mut seq: Vec<u8> = (0..k - 1)
        .map(|i| base_char(codec.base_at(cur.forward(), i)))
        .collect();
    let mut owned = 0usize;

    let end = loop {
        let kmer = cur.forward();
        if is_node(kmer) {
            seq.push(base_char(codec.last_base(kmer)));
            break SearchEnd::Node {
                kmer,
                slot: Extension::Backward,
            };
        }
        if let Some(prev) = pred {
            if is_node(cur.reverse()) {
                let base = complement(codec.first_base(prev.forward()));
                break SearchEnd::Node {
                    kmer: cur.reverse(),
                    slot: Extension::Forward(base),
                };
            }
        }

        seq.push(base_char(codec.last_base(kmer)));
        owned += 1;
        if owned >= max_len {
            break SearchEnd::Limit;
        }

        let extensions = valid_extensions(&cur, filter, oracle);
        match extensions.count() {
            0 => break SearchEnd::Sink { kmer },
            1 => {
                let base = extensions.single().unwrap_or_default();
                pred = Some(cur);
                cur = cur.extend(base, filter.rolling());
            }
            _ => break SearchEnd::Branch { kmer },
        }
    };

    SearchResult {
        end,
        juncs: ContigJuncs::new(seq),
    }
}

/// Counts from [`ContigGraph::link_nodes`]
#[derive(Debug, Clone, Default)]
pub struct LinkSummary {
    pub created: usize,
    /// Canonical dead-end k-mers reached from some node
    pub dead_ends: AHashSet<u64>,
}

impl ContigGraph {
    /// Create a contig for every node slot that has a valid extension and no
    /// contig yet, discovering the far end by walking the filter
    pub fn link_nodes(
        &mut self,
        filter: &BloomFilter,
        oracle: &dyn ExtensionOracle,
        max_len: usize,
    ) -> LinkSummary {
        let mut summary = LinkSummary::default();
        let codec = *filter.codec();

        for id in self.node_ids() {
            for slot in Extension::ALL {
                let Some(node) = self.node(id) else { break };
                if node.contig(slot).is_some() || !node.is_valid(slot) {
                    continue;
                }
                let start_kmer = node.kmer();
                let start_coverage = node.coverage(slot);

                let result = find_neighbor(
                    start_kmer,
                    slot,
                    filter,
                    oracle,
                    &|kmer| self.node_id(kmer).is_some(),
                    max_len,
                );
                let mut juncs = result.juncs;
                juncs.add(0, start_coverage);
                let start = Some(ContigEnd::new(id, slot));
                let leads_to_sink = matches!(result.end, SearchEnd::Sink { .. });

                let far = match result.end {
                    SearchEnd::Node { kmer, slot: far_slot } => {
                        let Some(far_id) = self.node_id(kmer) else { continue };
                        let far_node = match self.node(far_id) {
                            Some(n) => n,
                            None => continue,
                        };
                        if far_node.contig(far_slot).is_some() {
                            debug!(
                                node = %id,
                                slot = %slot,
                                far = %far_id,
                                far_slot = %far_slot,
                                "Far slot already linked, skipping"
                            );
                            continue;
                        }
                        juncs.add(juncs.len() - 1, far_node.coverage(far_slot));
                        Some(ContigEnd::new(far_id, far_slot))
                    }
                    SearchEnd::Sink { kmer } => {
                        summary.dead_ends.insert(codec.canonical(kmer));
                        None
                    }
                    SearchEnd::Branch { kmer } => {
                        debug!(kmer = %codec.to_string(kmer), "Walk stopped at an unindexed branch");
                        None
                    }
                    SearchEnd::Limit => None,
                };

                let contig = self.add_contig(juncs, start, far);
                if leads_to_sink {
                    if let Some(contig) = self.contig_mut(contig) {
                        contig.set_leads_to_sink(true);
                    }
                }
                summary.created += 1;
            }
        }

        info!(
            contigs = summary.created,
            dead_ends = summary.dead_ends.len(),
            "Linked nodes"
        );
        summary
    }
}
