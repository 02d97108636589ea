use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use readscan::filter::{CountingBloom2, CountingBloom3, CountingBloom4};
use readscan::kmer::base_runs;
use readscan::{AssemblyError, BloomFilter, DoubleKmer};
use tempfile::TempDir;

fn random_read(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| b"ACGT"[rng.random_range(0..4)]).collect()
}

proptest! {
    #[test]
    fn prop_rolled_cursor_matches_recomputed(
        k in prop::sample::select(vec![3usize, 5, 11, 21, 31]),
        read in prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 31..200),
        seed in 0u64..1000,
    ) {
        let mut filter = BloomFilter::new(1 << 20, k).unwrap();
        filter.set_seed(seed);
        let rolling = filter.rolling();
        let codec = *filter.codec();
        let codes = &base_runs(&read, k)[0];

        let mut cur = DoubleKmer::from_kmer(codec.pack(codes, 0), rolling);
        for pos in 1..=codes.len() - k {
            cur = cur.extend(codes[pos + k - 1], rolling);
            let fresh = DoubleKmer::from_kmer(codec.pack(codes, pos), rolling);
            prop_assert_eq!(cur, fresh);
        }

        let start = DoubleKmer::from_kmer(codec.pack(codes, 0), rolling);
        prop_assert_eq!(start.advance(codes, 0, codes.len() - k, rolling), cur);
    }

    #[test]
    fn prop_no_false_negatives(
        read in prop::collection::vec(prop::sample::select(b"ACGT".to_vec()), 21..300),
        n_hash in 1usize..=10,
    ) {
        let mut filter = BloomFilter::new(1 << 16, 21).unwrap();
        filter.set_hash_count(n_hash);
        let codec = *filter.codec();
        let kmers = codec.kmers(&read);
        for &kmer in &kmers {
            filter.add(kmer);
        }
        for &kmer in &kmers {
            prop_assert!(filter.contains(kmer));
            prop_assert!(filter.contains(codec.revcomp(kmer)));
        }
    }
}

#[test]
fn test_false_positive_rate_matches_theory() {
    let mut rng = StdRng::seed_from_u64(42);
    // 2^17 bits at 8 bits per element
    let mut filter = BloomFilter::new(1 << 16, 21).unwrap();
    let codec = *filter.codec();
    let m = filter.geometry().size() as f64;
    assert_eq!(m, 131_072.0);

    let inserted = random_read(&mut rng, 16_384 + 20);
    let kmers = codec.kmers(&inserted);
    for &kmer in &kmers {
        filter.add(kmer);
    }

    let queried = random_read(&mut rng, 100_020);
    let queries = codec.kmers(&queried);
    let hits = queries.iter().filter(|&&kmer| filter.contains(kmer)).count();
    let rate = hits as f64 / queries.len() as f64;

    let k = filter.hash_count() as f64;
    let n = kmers.len() as f64;
    let expected = (1.0 - (-k * n / m).exp()).powf(k);
    assert!(
        (rate - expected).abs() < 0.25 * expected,
        "false-positive rate {} vs expected {}",
        rate,
        expected
    );
}

#[test]
fn test_counters_saturate_per_layout() {
    let mut nibble = CountingBloom4::new(16, 11).unwrap();
    let mut tribit = CountingBloom3::new(16, 11).unwrap();
    let mut dibit = CountingBloom2::new(16, 11).unwrap();
    let kmer = nibble.geometry().mask() & 0x1234_5678;

    for _ in 0..20 {
        nibble.add(kmer);
        tribit.add(kmer);
        dibit.add(kmer);
    }
    assert_eq!(nibble.count(kmer), 15);
    assert_eq!(tribit.count(kmer), 7);
    assert_eq!(dibit.count(kmer), 3);
    assert!(dibit.contains_n_occ(kmer, 3));
    assert!(!dibit.contains_n_occ(kmer, 4));
}

#[test]
fn test_filter_dump_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("filter.bin");

    let mut filter = BloomFilter::new(1 << 12, 7).unwrap();
    let codec = *filter.codec();
    let kmers = codec.kmers(b"ACGTTGCAAGGCTTAACG");
    for &kmer in &kmers {
        filter.add(kmer);
    }
    filter.dump(&path).unwrap();

    let mut restored = BloomFilter::new(1 << 12, 7).unwrap();
    restored.load(&path).unwrap();
    assert_eq!(restored.weight(), filter.weight());
    assert!(kmers.iter().all(|&kmer| restored.contains(kmer)));

    let mut larger = BloomFilter::new(1 << 14, 7).unwrap();
    assert!(matches!(
        larger.load(&path),
        Err(AssemblyError::FilterSizeMismatch { .. })
    ));
}

#[test]
fn test_counting_dump_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("counts.bin");

    let mut counts = CountingBloom4::new(12, 9).unwrap();
    counts.add(77);
    counts.add(77);
    counts.dump(&path).unwrap();

    let mut restored = CountingBloom4::new(12, 9).unwrap();
    restored.load(&path).unwrap();
    assert_eq!(restored.count(77), 2);

    let mut other = CountingBloom2::new(12, 9).unwrap();
    assert!(other.load(&path).is_err());
}
