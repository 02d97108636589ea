//! Presence-only Bloom filter over canonical k-mers

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use ahash::AHashSet;
use tracing::{debug, warn};

use super::rolling::{DoubleKmer, RollingHash};
use super::seeds::HashSeedEngine;
use super::{FilterGeometry, HASH_COUNT_RANGE, allocate_zeroed};
use crate::error::{AssemblyError, Result};
use crate::kmer::KmerCodec;

/// Default number of probes per element
pub const DEFAULT_HASH_COUNT: usize = 4;

/// How `contains` answers queries
#[derive(Debug, Clone, Default)]
pub enum FilterMode {
    /// Answer from the bit array (false positives possible)
    #[default]
    Probabilistic,
    /// Answer from an explicit set of canonical k-mers. Used to pin the exact
    /// false positives a test wants to see.
    Exact(AHashSet<u64>),
}

/// Bloom filter keyed by canonical k-mers, probed with two rolling-hash lanes
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u8>,
    geometry: FilterGeometry,
    engine: HashSeedEngine,
    rolling: RollingHash,
    n_hash: usize,
    mode: FilterMode,
}

impl BloomFilter {
    /// Filter of `2^(floor(log2(requested_bits)) + 1)` bits for k-mers of length `k`
    pub fn new(requested_bits: u64, k: usize) -> Result<Self> {
        let codec = KmerCodec::new(k)?;
        let geometry = FilterGeometry::from_requested_bits(requested_bits)?;
        let bytes = (geometry.size() / 8).max(1) as usize;
        let bits = allocate_zeroed::<u8>(bytes)?;
        let engine = HashSeedEngine::default();
        let rolling = RollingHash::new(&engine, geometry, codec);

        debug!(
            size = geometry.size(),
            hash_size = geometry.hash_size(),
            bytes,
            k,
            "Allocated Bloom filter"
        );

        Ok(Self {
            bits,
            geometry,
            engine,
            rolling,
            n_hash: DEFAULT_HASH_COUNT,
            mode: FilterMode::Probabilistic,
        })
    }

    /// Replace the query mode
    pub fn with_mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> &FilterMode {
        &self.mode
    }

    /// Re-derive the seed tables. Refused if a non-zero seed is already set.
    pub fn set_seed(&mut self, seed: u64) {
        if self.engine.user_seed() != 0 {
            warn!(
                current = self.engine.user_seed(),
                requested = seed,
                "Filter seed already set, ignoring"
            );
            return;
        }
        self.engine = HashSeedEngine::new(seed);
        self.rolling = RollingHash::new(&self.engine, self.geometry, *self.rolling.codec());
    }

    /// Change the probe count. Values outside `1..=10` are refused.
    pub fn set_hash_count(&mut self, n_hash: usize) {
        if !HASH_COUNT_RANGE.contains(&n_hash) {
            warn!(
                requested = n_hash,
                current = self.n_hash,
                "Hash function count out of range, ignoring"
            );
            return;
        }
        self.n_hash = n_hash;
    }

    pub fn hash_count(&self) -> usize {
        self.n_hash
    }

    pub fn seed(&self) -> u64 {
        self.engine.user_seed()
    }

    pub fn geometry(&self) -> FilterGeometry {
        self.geometry
    }

    /// Rolling hash matching this filter's seed and geometry
    pub fn rolling(&self) -> &RollingHash {
        &self.rolling
    }

    pub fn codec(&self) -> &KmerCodec {
        self.rolling.codec()
    }

    #[inline]
    fn probes(&self, h0: u64, h1: u64) -> impl Iterator<Item = u64> + '_ {
        let size = self.geometry.size();
        (0..self.n_hash as u64).map(move |i| h0.wrapping_add(i.wrapping_mul(h1)) % size)
    }

    /// Insert a k-mer (either strand)
    pub fn add(&mut self, kmer: u64) {
        let canonical = self.codec().canonical(kmer);
        let [h0, h1] = self.rolling.hashes(canonical);
        self.add_hashes(h0, h1);
        if let FilterMode::Exact(set) = &mut self.mode {
            set.insert(canonical);
        }
    }

    /// Insert precomputed lane hashes of a canonical k-mer
    pub fn add_hashes(&mut self, h0: u64, h1: u64) {
        let size = self.geometry.size();
        for i in 0..self.n_hash as u64 {
            let h = h0.wrapping_add(i.wrapping_mul(h1)) % size;
            self.bits[(h >> 3) as usize] |= 1 << (h & 7);
        }
    }

    /// Membership of a k-mer (either strand)
    pub fn contains(&self, kmer: u64) -> bool {
        let canonical = self.codec().canonical(kmer);
        match &self.mode {
            FilterMode::Exact(set) => set.contains(&canonical),
            FilterMode::Probabilistic => {
                let [h0, h1] = self.rolling.hashes(canonical);
                self.contains_hashes(h0, h1)
            }
        }
    }

    /// Membership by precomputed lane hashes; always answered from the bits
    pub fn contains_hashes(&self, h0: u64, h1: u64) -> bool {
        self.probes(h0, h1)
            .all(|h| self.bits[(h >> 3) as usize] & (1 << (h & 7)) != 0)
    }

    /// Membership of a rolling cursor, using its canonical hashes
    pub fn contains_double(&self, kmer: &DoubleKmer) -> bool {
        match &self.mode {
            FilterMode::Exact(set) => set.contains(&kmer.canonical()),
            FilterMode::Probabilistic => {
                let [h0, h1] = kmer.canonical_hashes();
                self.contains_hashes(h0, h1)
            }
        }
    }

    /// Number of set bits
    pub fn weight(&self) -> u64 {
        self.bits.iter().map(|b| b.count_ones() as u64).sum()
    }

    /// Write the raw bit buffer
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        writer.write_all(&self.bits)?;
        writer.flush()?;
        debug!(path = %path.as_ref().display(), bytes = self.bits.len(), "Dumped Bloom filter");
        Ok(())
    }

    /// Replace the bit buffer with a previous `dump` of the same geometry.
    /// Refused in exact mode, whose answers do not come from the bits.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        if matches!(self.mode, FilterMode::Exact(_)) {
            return Err(AssemblyError::config(
                "cannot load a filter dump into an exact-mode filter",
            ));
        }
        let mut file = File::open(path.as_ref())?;
        let found = file.metadata()?.len();
        let expected = self.bits.len() as u64;
        if found != expected {
            return Err(AssemblyError::FilterSizeMismatch { expected, found });
        }
        file.read_exact(&mut self.bits)?;
        debug!(path = %path.as_ref().display(), bytes = expected, "Loaded Bloom filter");
        Ok(())
    }
}
