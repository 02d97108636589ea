//! Batch assembly driver
//!
//! [`Assembler`] runs the stages in order: fill the filter from reads, scan
//! the reads again for junctions and sinks, build and simplify the contig
//! graph, then write the outputs. Reads are plain byte slices; parsing
//! sequence files is left to the caller.

use std::path::Path;

use ahash::AHashSet;
use tracing::{info, warn};
use validator::Validate;

use crate::config::AssemblerConfig;
use crate::error::{AssemblyError, Result};
use crate::filter::{BloomFilter, FilterMode};
use crate::graph::ContigGraph;
use crate::junction_map::JunctionMap;
use crate::logging::{ProgressReporter, StageTimer};
use crate::oracle::LookaheadChecker;

const PROGRESS_INTERVAL: u64 = 1_000_000;

/// Summary of a finished assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyStats {
    pub nodes: usize,
    pub contigs: usize,
    pub tips_removed: usize,
    pub nodes_collapsed: usize,
    pub total_length: usize,
    pub n50: usize,
}

pub struct Assembler {
    config: AssemblerConfig,
    filter: BloomFilter,
    oracle: LookaheadChecker,
    junctions: JunctionMap,
}

impl Assembler {
    pub fn new(config: AssemblerConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AssemblyError::config(format!("Configuration validation failed: {}", e)))?;

        let mut filter = BloomFilter::new(config.filter.bits, config.graph.k)?;
        if config.filter.exact {
            filter = filter.with_mode(FilterMode::Exact(AHashSet::new()));
        }
        if config.filter.seed != 0 {
            filter.set_seed(config.filter.seed);
        }
        filter.set_hash_count(config.filter.hash_count);

        let junctions = JunctionMap::new(config.graph.k, config.graph.max_read_length)?;
        info!(
            k = config.graph.k,
            filter_bits = filter.geometry().size(),
            hash_count = filter.hash_count(),
            exact = config.filter.exact,
            "Assembler initialized"
        );

        Ok(Self {
            oracle: LookaheadChecker::new(config.graph.lookahead),
            config,
            filter,
            junctions,
        })
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    pub fn junctions(&self) -> &JunctionMap {
        &self.junctions
    }

    /// Insert every k-mer of `reads` into the filter; returns the number of reads
    pub fn add_reads<I, R>(&mut self, reads: I) -> usize
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]>,
    {
        let timer = StageTimer::start("fill_filter");
        let progress = ProgressReporter::new("fill_filter", PROGRESS_INTERVAL);
        let codec = *self.filter.codec();
        let mut kmers = 0u64;
        for read in reads {
            for kmer in codec.kmers(read.as_ref()) {
                self.filter.add(kmer);
                kmers += 1;
            }
            progress.inc();
        }
        progress.finish();
        info!(
            reads = progress.current(),
            kmers,
            weight = self.filter.weight(),
            "Filled filter"
        );
        timer.finish();
        progress.current() as usize
    }

    pub fn dump_filter<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.filter.dump(path)
    }

    /// Replace the filter bits with a dump made under the same configuration.
    /// Fails for an exact-mode filter.
    pub fn load_filter<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.filter.load(path)?;
        info!(weight = self.filter.weight(), "Loaded filter");
        Ok(())
    }

    /// Scan `reads` against the filter; returns the number of junctions created
    pub fn scan_reads<I, R>(&mut self, reads: I) -> usize
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]>,
    {
        let timer = StageTimer::start("scan_reads");
        let progress = ProgressReporter::new("scan_reads", PROGRESS_INTERVAL);
        let mut created = 0;
        for read in reads {
            created += self.junctions.scan_read(read.as_ref(), &self.filter, &self.oracle);
            progress.inc();
        }
        progress.finish();
        info!(
            junctions = self.junctions.num_junctions(),
            complex = self.junctions.num_complex_junctions(),
            sinks = self.junctions.sinks().len(),
            "Scanned reads"
        );
        timer.finish();
        created
    }

    /// Build the contig graph from the scanned junctions, cut tips and
    /// collapse pass-through nodes. The junction map is consumed.
    pub fn assemble(&mut self) -> Result<(ContigGraph, AssemblyStats)> {
        if self.config.output.write_junctions {
            self.junctions
                .write_to_file(self.config.output.path("junctions"))?;
        }

        let timer = StageTimer::start("build_graph");
        let mut graph = self.junctions.build_contig_graph(
            &self.filter,
            &self.oracle,
            self.config.graph.max_contig_length,
        )?;
        timer.finish();

        let timer = StageTimer::start("simplify");
        let tips_removed = graph.cut_tips(self.config.graph.max_tip_length);
        let nodes_collapsed = if self.config.graph.collapse {
            graph.collapse_pass_through_nodes()?
        } else {
            0
        };
        timer.finish();

        if !graph.check_validity() {
            warn!("Contig graph failed its integrity check");
        }

        let stats = AssemblyStats {
            nodes: graph.num_nodes(),
            contigs: graph.num_contigs(),
            tips_removed,
            nodes_collapsed,
            total_length: graph.total_length(),
            n50: graph.n50(),
        };
        info!(
            nodes = stats.nodes,
            contigs = stats.contigs,
            tips_removed,
            nodes_collapsed,
            total_length = stats.total_length,
            n50 = stats.n50,
            "Assembly finished"
        );
        Ok((graph, stats))
    }

    /// Write the FASTA contigs and, if enabled, the FastG graph
    pub fn write_outputs(&self, graph: &ContigGraph) -> Result<usize> {
        let output = &self.config.output;
        let written = graph.write_contigs(output.path("contigs.fa"), output.min_contig_length)?;
        if output.write_fastg {
            graph.write_fastg(output.path("fastg"))?;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_config(dir: &TempDir) -> AssemblerConfig {
        let mut config = AssemblerConfig::default();
        config.filter.bits = 1 << 16;
        config.filter.exact = true;
        config.graph.k = 5;
        config.graph.lookahead = 0;
        config.output.prefix = dir.path().join("out").display().to_string();
        config.output.min_contig_length = 1;
        config.output.write_junctions = true;
        config
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = AssemblerConfig::default();
        config.graph.k = 4;
        assert!(matches!(Assembler::new(config), Err(AssemblyError::Config(_))));
    }

    #[test]
    fn test_linear_assembly_writes_outputs() {
        let dir = TempDir::new().unwrap();
        let mut assembler = Assembler::new(small_config(&dir)).unwrap();
        let reads = ["ACCGTTAGCA"];
        assert_eq!(assembler.add_reads(reads), 1);
        assert_eq!(assembler.scan_reads(reads), 0);

        let (graph, stats) = assembler.assemble().unwrap();
        assert_eq!(stats.contigs, 1);
        assert_eq!(stats.total_length, 10);
        assert_eq!(stats.n50, 10);

        assert_eq!(assembler.write_outputs(&graph).unwrap(), 1);
        assert!(dir.path().join("out.contigs.fa").exists());
        assert!(dir.path().join("out.fastg").exists());
        assert!(dir.path().join("out.junctions").exists());
    }

    #[test]
    fn test_exact_mode_rejects_filter_load() {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("filter.bin");
        let reads = ["GTCGGTTATCTTCGGATACTGTATAGTCCCACCTGGTGAT"];

        let mut exact = small_config(&dir);
        exact.graph.k = 7;

        let mut first = Assembler::new(exact.clone()).unwrap();
        first.add_reads(reads);
        first.dump_filter(&dump).unwrap();

        let mut second = Assembler::new(exact.clone()).unwrap();
        assert!(matches!(second.load_filter(&dump), Err(AssemblyError::Config(_))));

        let mut config = exact;
        config.filter.exact = false;
        let mut third = Assembler::new(config).unwrap();
        third.load_filter(&dump).unwrap();
        third.scan_reads(reads);
        let (_, stats) = third.assemble().unwrap();
        assert_eq!(stats.contigs, 1);
        assert_eq!(stats.total_length, 40);
    }
}
