use readscan::config::AssemblerConfig;
use readscan::kmer::revcomp_string;
use readscan::{Assembler, BloomFilter, Extension, FilterMode, JunctionMap, LookaheadChecker};
use tempfile::TempDir;

/// Genome path with one branching k-mer (k = 7)
const GENOME: &str = "GTCGGTTATCTTCGGATACTGTATAGTCCCACCTGGTGAT";
/// Shares the first 17 bases with GENOME, then leaves through a short tip
const TIP_READ: &str = "GTCGGTTATCTTCGGATTCC";
/// Last shared k-mer, where the tip branches off
const BRANCH: &str = "TTCGGAT";

fn config(dir: &TempDir) -> AssemblerConfig {
    let mut config = AssemblerConfig::default();
    config.filter.bits = 1 << 16;
    config.filter.exact = true;
    config.graph.k = 7;
    config.graph.lookahead = 0;
    config.graph.max_tip_length = 10;
    config.output.prefix = dir.path().join("asm").display().to_string();
    config.output.min_contig_length = 1;
    config
}

#[test]
fn test_scan_finds_the_single_branch() {
    let dir = TempDir::new().unwrap();
    let mut assembler = Assembler::new(config(&dir)).unwrap();
    let reads = [GENOME, TIP_READ];
    assembler.add_reads(reads);
    assert_eq!(assembler.scan_reads(reads), 1);

    let junctions = assembler.junctions();
    let branch = junctions.codec().parse(BRANCH).unwrap();
    let junction = junctions.junction(branch).unwrap();
    assert!(junction.is_complex());
    // A continues the genome, T enters the tip
    assert_eq!(junction.valid, [true, false, false, true, true]);
    assert_eq!(junction.coverage[Extension::Forward(0).index()], 1);
    assert_eq!(junction.coverage[Extension::Forward(3).index()], 1);
    assert_eq!(junction.coverage[Extension::Backward.index()], 2);

    let codec = junctions.codec();
    for sink in ["TGGTGAT", "GGATTCC", "AACCGAC"] {
        assert!(junctions.is_sink(codec.parse(sink).unwrap()), "{} is a sink", sink);
    }
    assert_eq!(junctions.sinks().len(), 3);
}

#[test]
fn test_graph_before_simplification() {
    let dir = TempDir::new().unwrap();
    let mut assembler = Assembler::new(config(&dir)).unwrap();
    let reads = [GENOME, TIP_READ];
    assembler.add_reads(reads);
    assembler.scan_reads(reads);

    let mut map = assembler.junctions().clone();
    let graph = map
        .build_contig_graph(assembler.filter(), &LookaheadChecker::new(0), 1000)
        .unwrap();
    assert_eq!(map.num_junctions(), 0);
    assert_eq!(graph.num_nodes(), 1);
    assert_eq!(graph.num_contigs(), 3);
    assert!(graph.check_validity());

    let mut lengths: Vec<usize> = graph.contigs().map(|(_, c)| c.len()).collect();
    lengths.sort_unstable();
    // tip, shared prefix, rest of the genome
    assert_eq!(lengths, vec![9, 17, 29]);
}

#[test]
fn test_tip_cut_then_collapse_leaves_one_contig() {
    let dir = TempDir::new().unwrap();
    let mut assembler = Assembler::new(config(&dir)).unwrap();
    let reads = [GENOME, TIP_READ];
    assembler.add_reads(reads);
    assembler.scan_reads(reads);

    let (graph, stats) = assembler.assemble().unwrap();
    assert_eq!(stats.tips_removed, 1);
    assert_eq!(stats.nodes_collapsed, 1);
    assert_eq!(stats.nodes, 0);
    assert_eq!(stats.contigs, 1);
    assert_eq!(stats.total_length, GENOME.len());

    let (_, contig) = graph.contigs().next().unwrap();
    let forward = GENOME.as_bytes().to_vec();
    let reverse = revcomp_string(GENOME.as_bytes());
    assert!(contig.seq() == forward.as_slice() || contig.seq() == reverse.as_slice());
    assert!(graph.check_validity());

    assert_eq!(assembler.write_outputs(&graph).unwrap(), 1);
    let fasta = std::fs::read_to_string(dir.path().join("asm.contigs.fa")).unwrap();
    assert!(fasta.starts_with(">NODE_"));
}

#[test]
fn test_junction_file_round_trip_after_scan() {
    let dir = TempDir::new().unwrap();
    let mut assembler = Assembler::new(config(&dir)).unwrap();
    let reads = [GENOME, TIP_READ];
    assembler.add_reads(reads);
    assembler.scan_reads(reads);

    let path = dir.path().join("junctions.txt");
    let original = assembler.junctions();
    original.write_to_file(&path).unwrap();

    let mut restored = JunctionMap::new(7, 250).unwrap();
    assert_eq!(restored.build_from_file(&path).unwrap(), 1);
    let branch = original.codec().parse(BRANCH).unwrap();
    assert_eq!(restored.junction(branch), original.junction(branch));
}

#[test]
fn test_lookahead_rejects_false_positive_branch() {
    let mut filter = BloomFilter::new(1 << 16, 7)
        .unwrap()
        .with_mode(FilterMode::Exact(Default::default()));
    let codec = *filter.codec();
    for read in [GENOME, TIP_READ] {
        for kmer in codec.kmers(read.as_bytes()) {
            filter.add(kmer);
        }
    }
    // a lone k-mer one base off the genome, as a false positive would appear
    filter.add(codec.parse("TCCCACA").unwrap());

    let scan = |depth: usize| {
        let mut map = JunctionMap::new(7, 250).unwrap();
        for read in [GENOME, TIP_READ] {
            map.scan_read(read.as_bytes(), &filter, &LookaheadChecker::new(depth));
        }
        map
    };

    let unchecked = scan(0);
    assert_eq!(unchecked.num_junctions(), 2);
    assert!(unchecked.is_junction(codec.parse("GTCCCAC").unwrap()));

    let checked = scan(1);
    assert_eq!(checked.num_junctions(), 1);
    assert!(checked.is_junction(codec.parse(BRANCH).unwrap()));
}
