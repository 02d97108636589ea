use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use needletail::parse_fastx_file;
use tracing::info;

use readscan::config::ConfigManager;
use readscan::logging::{LogLevel, LoggingSystem};
use readscan::pipeline::Assembler;

/// Reads per batch handed to the assembler
const BATCH_SIZE: usize = 100_000;

/// De Bruijn graph assembly of short reads through a Bloom filter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// FASTA/FASTQ read files (optionally gzipped)
    #[arg(required = true)]
    reads: Vec<PathBuf>,

    /// TOML or JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Built-in settings profile (fast, sensitive)
    #[arg(long)]
    profile: Option<String>,

    /// Output file prefix
    #[arg(short, long)]
    output: Option<String>,

    /// k-mer length (odd, 3..=31)
    #[arg(short)]
    k: Option<usize>,

    /// Requested Bloom filter size in bits
    #[arg(long)]
    filter_bits: Option<u64>,

    /// Number of Bloom filter hash functions
    #[arg(long)]
    hash_count: Option<usize>,

    /// Hash seed
    #[arg(long)]
    seed: Option<u64>,

    /// Lookahead depth for rejecting false-positive extensions
    #[arg(long)]
    lookahead: Option<usize>,

    /// Maximum read length; bounds the sink search past read ends
    #[arg(long)]
    max_read_length: Option<usize>,

    /// Remove dangling contigs shorter than this
    #[arg(long)]
    max_tip_length: Option<usize>,

    /// Shortest contig written to the FASTA output
    #[arg(long)]
    min_contig_length: Option<usize>,

    /// Keep pass-through nodes instead of merging their contigs
    #[arg(long)]
    no_collapse: bool,

    /// Write the junction map next to the other outputs
    #[arg(long)]
    write_junctions: bool,

    /// Load the filter from a previous dump instead of filling it from the reads
    #[arg(long)]
    load_filter: Option<PathBuf>,

    /// Dump the filter after filling it
    #[arg(long)]
    dump_filter: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Emit JSON log records
    #[arg(long)]
    json_logs: bool,

    /// Directory for the log file instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

/// Feed every read of `paths` to `sink` in batches
fn for_each_batch<F>(paths: &[PathBuf], mut sink: F) -> Result<usize>
where
    F: FnMut(&[Vec<u8>]),
{
    let mut total = 0;
    let mut batch: Vec<Vec<u8>> = Vec::with_capacity(BATCH_SIZE);
    for path in paths {
        let mut reader = open_reads(path)?;
        while let Some(record) = reader.next() {
            let record = record.with_context(|| format!("Invalid record in {}", path.display()))?;
            batch.push(record.seq().into_owned());
            if batch.len() == BATCH_SIZE {
                sink(&batch);
                total += batch.len();
                batch.clear();
            }
        }
    }
    if !batch.is_empty() {
        sink(&batch);
        total += batch.len();
    }
    Ok(total)
}

fn open_reads(path: &Path) -> Result<Box<dyn needletail::FastxReader>> {
    parse_fastx_file(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut manager = match &args.config {
        Some(path) => ConfigManager::load_from_file(path)?,
        None => ConfigManager::new(),
    };
    if let Some(profile) = &args.profile {
        manager.apply_profile(profile)?;
    }
    manager.load_from_env()?;

    let config = manager.config_mut();
    if let Some(prefix) = args.output {
        config.output.prefix = prefix;
    }
    if let Some(k) = args.k {
        config.graph.k = k;
    }
    if let Some(bits) = args.filter_bits {
        config.filter.bits = bits;
    }
    if let Some(n) = args.hash_count {
        config.filter.hash_count = n;
    }
    if let Some(seed) = args.seed {
        config.filter.seed = seed;
    }
    if let Some(depth) = args.lookahead {
        config.graph.lookahead = depth;
    }
    if let Some(len) = args.max_read_length {
        config.graph.max_read_length = len;
    }
    if let Some(len) = args.max_tip_length {
        config.graph.max_tip_length = len;
    }
    if let Some(len) = args.min_contig_length {
        config.output.min_contig_length = len;
    }
    if args.no_collapse {
        config.graph.collapse = false;
    }
    if args.write_junctions {
        config.output.write_junctions = true;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    if args.log_dir.is_some() {
        config.logging.log_dir = args.log_dir.clone();
    }

    if manager.config().filter.exact && args.load_filter.is_some() {
        anyhow::bail!("--load-filter cannot be combined with an exact-mode filter");
    }

    let _logging = LoggingSystem::init(manager.config().logging.clone())?;
    let mut assembler = Assembler::new(manager.config().clone())?;

    match &args.load_filter {
        Some(path) => assembler.load_filter(path)?,
        None => {
            let reads = for_each_batch(&args.reads, |batch| {
                assembler.add_reads(batch);
            })?;
            info!(reads, "Filter pass complete");
        }
    }
    if let Some(path) = &args.dump_filter {
        assembler.dump_filter(path)?;
    }

    let reads = for_each_batch(&args.reads, |batch| {
        assembler.scan_reads(batch);
    })?;
    info!(reads, "Scan pass complete");

    let (graph, stats) = assembler.assemble()?;
    let written = assembler.write_outputs(&graph)?;
    info!(
        contigs = stats.contigs,
        written,
        n50 = stats.n50,
        prefix = %assembler.config().output.prefix,
        "Done"
    );
    Ok(())
}
