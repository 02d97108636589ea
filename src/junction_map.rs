//! Junction and sink index built by scanning reads against the filter
//!
//! Junctions are keyed by the oriented k-mer that branches forward. A read is
//! scanned on both strands at every position; consecutive junctions met by
//! the same read are linked by distance so later reads following the same
//! path can skip straight to the next junction.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use tracing::{debug, info};

use crate::error::{AssemblyError, Result};
use crate::filter::{BloomFilter, DoubleKmer};
use crate::graph::{ContigGraph, SearchEnd, walk_from_sink};
use crate::junction::{Extension, Junction};
use crate::kmer::{KmerCodec, base_runs, complement};
use crate::oracle::{ExtensionOracle, ExtensionSet, valid_extensions};

/// Last junction seen while scanning a read segment
#[derive(Debug, Clone, Copy)]
struct Anchor {
    kmer: u64,
    /// Slot the read leaves the junction by
    ahead: Extension,
    pos: usize,
}

#[derive(Debug, Clone)]
pub struct JunctionMap {
    codec: KmerCodec,
    junctions: AHashMap<u64, Junction>,
    sinks: AHashSet<u64>,
    max_read_length: usize,
}

impl JunctionMap {
    pub fn new(k: usize, max_read_length: usize) -> Result<Self> {
        Ok(Self {
            codec: KmerCodec::new(k)?,
            junctions: AHashMap::new(),
            sinks: AHashSet::new(),
            max_read_length,
        })
    }

    pub fn codec(&self) -> &KmerCodec {
        &self.codec
    }

    /// Forward extensions of `kmer` in the filter and confirmed by `oracle`
    pub fn valid_extensions(
        &self,
        kmer: &DoubleKmer,
        filter: &BloomFilter,
        oracle: &dyn ExtensionOracle,
    ) -> ExtensionSet {
        valid_extensions(kmer, filter, oracle)
    }

    /// Scan one read; returns the number of junctions created
    pub fn scan_read(
        &mut self,
        read: &[u8],
        filter: &BloomFilter,
        oracle: &dyn ExtensionOracle,
    ) -> usize {
        let before = self.junctions.len();
        for segment in base_runs(read, self.codec.k()) {
            self.scan_segment(&segment, filter, oracle);
        }
        self.junctions.len() - before
    }

    fn scan_segment(&mut self, codes: &[u8], filter: &BloomFilter, oracle: &dyn ExtensionOracle) {
        let k = self.codec.k();
        let rolling = filter.rolling();
        let n_kmers = codes.len() - k + 1;
        let mut cur = DoubleKmer::from_kmer(self.codec.pack(codes, 0), rolling);
        let mut pos = 0;
        let mut last: Option<Anchor> = None;

        loop {
            let next_base = (pos + 1 < n_kmers).then(|| codes[pos + k]);
            let prev_base = (pos > 0).then(|| codes[pos - 1]);
            let mut skip_to: Option<usize> = None;

            for reversed in [false, true] {
                let oriented = if reversed { cur.reversed() } else { cur };
                let key = oriented.forward();
                // slots the read uses, seen from this orientation
                let (ahead, behind) = if reversed {
                    (
                        next_base.map(|_| Extension::Backward),
                        prev_base.map(|b| Extension::Forward(complement(b))),
                    )
                } else {
                    (
                        next_base.map(Extension::Forward),
                        prev_base.map(|_| Extension::Backward),
                    )
                };

                if !self.junctions.contains_key(&key) {
                    let extensions = valid_extensions(&oriented, filter, oracle);
                    match extensions.count() {
                        0 => {
                            self.sinks.insert(key);
                            continue;
                        }
                        1 => continue,
                        _ => {
                            self.junctions.insert(key, Junction::new(extensions));
                        }
                    }
                }

                if let Some(anchor) = last {
                    let distance = (pos - anchor.pos) as u32;
                    if distance > 0 {
                        if let Some(prev) = self.junctions.get_mut(&anchor.kmer) {
                            prev.link(anchor.ahead, distance);
                        }
                        if let (Some(slot), Some(junction)) = (behind, self.junctions.get_mut(&key)) {
                            junction.link(slot, distance);
                        }
                    }
                }

                let Some(junction) = self.junctions.get_mut(&key) else { continue };
                if let Some(slot) = behind {
                    junction.add_coverage(slot);
                }
                if let Some(slot) = ahead {
                    junction.add_coverage(slot);
                    if let Some(d) = junction.distance(slot) {
                        let target = pos + d as usize;
                        if target < n_kmers {
                            skip_to = Some(skip_to.map_or(target, |s| s.min(target)));
                        }
                    }
                    last = Some(Anchor { kmer: key, ahead: slot, pos });
                }
            }

            if pos + 1 >= n_kmers {
                break;
            }
            let target = skip_to.unwrap_or(pos + 1);
            cur = cur.advance(codes, pos, target, rolling);
            pos = target;
        }

        // segment ends: look past the read for the dead end it runs into
        self.find_sink(cur, filter, oracle);
        let first = DoubleKmer::from_kmer(self.codec.pack(codes, 0), rolling);
        self.find_sink(first.reversed(), filter, oracle);
    }

    /// Follow single extensions from `start` for at most `max_read_length`
    /// bases, recording a dead end as a sink and a branch as a junction
    fn find_sink(&mut self, start: DoubleKmer, filter: &BloomFilter, oracle: &dyn ExtensionOracle) {
        let mut cur = start;
        for _ in 0..=self.max_read_length {
            let key = cur.forward();
            if self.junctions.contains_key(&key) || self.sinks.contains(&key) {
                return;
            }
            let extensions = valid_extensions(&cur, filter, oracle);
            match extensions.single() {
                Some(base) => cur = cur.extend(base, filter.rolling()),
                None if extensions.is_empty() => {
                    self.sinks.insert(key);
                    return;
                }
                None => {
                    self.junctions.insert(key, Junction::new(extensions));
                    return;
                }
            }
        }
    }

    pub fn is_junction(&self, kmer: u64) -> bool {
        self.junctions.contains_key(&kmer)
    }

    pub fn junction(&self, kmer: u64) -> Option<&Junction> {
        self.junctions.get(&kmer)
    }

    pub fn junction_mut(&mut self, kmer: u64) -> Option<&mut Junction> {
        self.junctions.get_mut(&kmer)
    }

    /// Junction at `kmer`, created with `extensions` if absent
    pub fn create_junction(&mut self, kmer: u64, extensions: ExtensionSet) -> &mut Junction {
        self.junctions
            .entry(kmer)
            .or_insert_with(|| Junction::new(extensions))
    }

    pub fn kill_junction(&mut self, kmer: u64) -> Option<Junction> {
        self.junctions.remove(&kmer)
    }

    /// Remove every junction in `kmers`; returns how many existed
    pub fn destroy_junction_set(&mut self, kmers: &AHashSet<u64>) -> usize {
        kmers
            .iter()
            .filter(|kmer| self.junctions.remove(kmer).is_some())
            .count()
    }

    /// Remove every junction with two or more valid forward extensions
    pub fn destroy_complex_junctions(&mut self) -> usize {
        let before = self.junctions.len();
        self.junctions.retain(|_, j| !j.is_complex());
        before - self.junctions.len()
    }

    pub fn num_junctions(&self) -> usize {
        self.junctions.len()
    }

    pub fn num_complex_junctions(&self) -> usize {
        self.junctions.values().filter(|j| j.is_complex()).count()
    }

    pub fn num_solid_junctions(&self, min_coverage: u32) -> usize {
        self.junctions
            .values()
            .filter(|j| j.is_solid(min_coverage))
            .count()
    }

    pub fn sinks(&self) -> &AHashSet<u64> {
        &self.sinks
    }

    pub fn is_sink(&self, kmer: u64) -> bool {
        self.sinks.contains(&kmer)
    }

    /// One `KMER\tVALID\tCOV\tDIST` line per junction, sorted by k-mer
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        let mut kmers: Vec<&u64> = self.junctions.keys().collect();
        kmers.sort_unstable();
        for kmer in kmers {
            writeln!(writer, "{}\t{}", self.codec.to_string(*kmer), self.junctions[kmer])?;
        }
        writer.flush()?;
        info!(path = %path.as_ref().display(), junctions = self.junctions.len(), "Wrote junctions");
        Ok(())
    }

    /// Add the junctions of a file written by [`Self::write_to_file`]
    pub fn build_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut loaded = 0;
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            let columns: Vec<&str> = line.split('\t').collect();
            let [kmer, valid, coverage, distance] = columns[..] else {
                return Err(AssemblyError::parse(
                    line_no,
                    format!("expected 4 tab-separated columns, found {}", columns.len()),
                ));
            };
            let kmer = self
                .codec
                .parse(kmer)
                .map_err(|e| AssemblyError::parse(line_no, e.to_string()))?;
            let junction = Junction::parse_columns(valid, coverage, distance, line_no)?;
            self.junctions.insert(kmer, junction);
            loaded += 1;
        }
        info!(path = %path.as_ref().display(), loaded, "Loaded junctions");
        Ok(loaded)
    }

    /// Promote every junction to a node, link the nodes through the filter
    /// and add the linear regions no node reaches
    pub fn build_contig_graph(
        &mut self,
        filter: &BloomFilter,
        oracle: &dyn ExtensionOracle,
        max_contig_length: usize,
    ) -> Result<ContigGraph> {
        let mut graph = ContigGraph::new(self.codec.k())?;
        let mut kmers: Vec<u64> = self.junctions.keys().copied().collect();
        kmers.sort_unstable();
        for kmer in kmers {
            if let Some(junction) = self.kill_junction(kmer) {
                graph.add_node(kmer, &junction);
            }
        }
        info!(nodes = graph.num_nodes(), "Promoted junctions to nodes");

        let mut summary = graph.link_nodes(filter, oracle, max_contig_length);
        self.build_linear_regions(&mut graph, filter, oracle, &mut summary.dead_ends, max_contig_length);
        Ok(graph)
    }

    /// Add an isolated contig for every sink whose component has no node.
    /// `reached` holds canonical dead ends already covered and is updated.
    pub fn build_linear_regions(
        &self,
        graph: &mut ContigGraph,
        filter: &BloomFilter,
        oracle: &dyn ExtensionOracle,
        reached: &mut AHashSet<u64>,
        max_contig_length: usize,
    ) -> usize {
        let mut sinks: Vec<u64> = self.sinks.iter().copied().collect();
        sinks.sort_unstable();
        let mut created = 0;

        for sink in sinks {
            if !reached.insert(self.codec.canonical(sink)) {
                continue;
            }
            let result = walk_from_sink(
                sink,
                filter,
                oracle,
                &|kmer| graph.node_id(kmer).is_some(),
                max_contig_length,
            );
            match result.end {
                SearchEnd::Node { .. } => {
                    debug!(sink = %self.codec.to_string(sink), "Sink leads to a node, skipping");
                    continue;
                }
                SearchEnd::Sink { kmer } => {
                    reached.insert(self.codec.canonical(kmer));
                }
                SearchEnd::Branch { .. } | SearchEnd::Limit => {}
            }
            graph.add_contig(result.juncs, None, None);
            created += 1;
        }

        info!(created, "Built linear regions");
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;
    use crate::oracle::LookaheadChecker;
    use tempfile::TempDir;

    fn exact_filter(seqs: &[&str], k: usize) -> BloomFilter {
        let mut filter = BloomFilter::new(1 << 16, k)
            .unwrap()
            .with_mode(FilterMode::Exact(Default::default()));
        for seq in seqs {
            for kmer in filter.codec().kmers(seq.as_bytes()) {
                filter.add(kmer);
            }
        }
        filter
    }

    #[test]
    fn test_linear_read_has_sinks_and_no_junctions() {
        let filter = exact_filter(&["ACCGTTAGCA"], 5);
        let oracle = LookaheadChecker::new(0);
        let mut map = JunctionMap::new(5, 100).unwrap();
        assert_eq!(map.scan_read(b"ACCGTTAGCA", &filter, &oracle), 0);
        let codec = *filter.codec();
        assert!(map.is_sink(codec.parse("TAGCA").unwrap()));
        assert!(map.is_sink(codec.parse("ACGGT").unwrap()));
        assert_eq!(map.sinks().len(), 2);
    }

    #[test]
    fn test_linear_region_becomes_isolated_contig() {
        let filter = exact_filter(&["ACCGTTAGCA"], 5);
        let oracle = LookaheadChecker::new(0);
        let mut map = JunctionMap::new(5, 100).unwrap();
        map.scan_read(b"ACCGTTAGCA", &filter, &oracle);
        let graph = map.build_contig_graph(&filter, &oracle, 1000).unwrap();
        assert_eq!(graph.num_nodes(), 0);
        assert_eq!(graph.num_contigs(), 1);
        let (_, contig) = graph.contigs().next().unwrap();
        assert_eq!(contig.len(), 10);
        assert!(contig.seq() == b"ACCGTTAGCA" || contig.seq() == b"TGCTAACGGT");
    }

    #[test]
    fn test_junction_map_queries() {
        let mut map = JunctionMap::new(5, 100).unwrap();
        let mut exts = ExtensionSet::default();
        exts.insert(0);
        exts.insert(1);
        map.create_junction(10, exts).add_coverage(Extension::Forward(0));
        map.create_junction(10, ExtensionSet::default()).add_coverage(Extension::Forward(0));
        map.create_junction(20, ExtensionSet::default());
        assert_eq!(map.num_junctions(), 2);
        assert_eq!(map.num_complex_junctions(), 1);
        assert_eq!(map.num_solid_junctions(1), 0);
        assert_eq!(map.junction(10).unwrap().coverage[0], 2);

        let dead: AHashSet<u64> = [20, 30].into_iter().collect();
        assert_eq!(map.destroy_junction_set(&dead), 1);
        assert_eq!(map.destroy_complex_junctions(), 1);
        assert_eq!(map.num_junctions(), 0);
    }

    #[test]
    fn test_file_round_trip_and_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("junctions.txt");

        let mut map = JunctionMap::new(5, 100).unwrap();
        let codec = *map.codec();
        let mut exts = ExtensionSet::default();
        exts.insert(2);
        exts.insert(3);
        let j = map.create_junction(codec.parse("ACGTA").unwrap(), exts);
        j.coverage[2] = 4;
        j.distance[4] = 17;
        map.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "ACGTA\t00111\t0,0,4,0,0\t0,0,0,0,17\n");

        let mut restored = JunctionMap::new(5, 100).unwrap();
        assert_eq!(restored.build_from_file(&path).unwrap(), 1);
        assert_eq!(
            restored.junction(codec.parse("ACGTA").unwrap()),
            map.junction(codec.parse("ACGTA").unwrap())
        );

        std::fs::write(&path, "ACGTA\t00111\t0,0,4,0,0\t0,0,0,0,17\nACGTA\t00111\n").unwrap();
        let err = JunctionMap::new(5, 100).unwrap().build_from_file(&path).unwrap_err();
        assert!(matches!(err, AssemblyError::Parse { line: 2, .. }));
    }
}
