//! Counting Bloom filters with saturating 4, 3 and 2 bit counters
//!
//! Probe positions come from independent seeded hashes of the canonical
//! k-mer, not from the rolling-hash lanes used by [`super::BloomFilter`].

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::marker::PhantomData;
use std::path::Path;

use tracing::{debug, warn};

use super::seeds::HashSeedEngine;
use super::{FilterGeometry, HASH_COUNT_RANGE, allocate_zeroed};
use crate::error::{AssemblyError, Result};
use crate::kmer::KmerCodec;

/// Default number of probes per element
pub const DEFAULT_HASH_COUNT: usize = 2;

/// Packing of saturating counters inside `u64` words
pub trait CounterLayout {
    /// Bits per counter
    const BITS: u32;
    /// Counters per word
    const PER_WORD: u64;
    /// Display name for logging
    const NAME: &'static str;

    /// Saturation value
    const MAX: u64 = (1 << Self::BITS) - 1;
}

/// 4-bit counters, 16 per word, saturating at 15
#[derive(Debug, Clone, Copy)]
pub struct Nibble;

impl CounterLayout for Nibble {
    const BITS: u32 = 4;
    const PER_WORD: u64 = 16;
    const NAME: &'static str = "nibble";
}

/// 3-bit counters, 21 per word, saturating at 7
#[derive(Debug, Clone, Copy)]
pub struct Tribit;

impl CounterLayout for Tribit {
    const BITS: u32 = 3;
    const PER_WORD: u64 = 21;
    const NAME: &'static str = "tribit";
}

/// 2-bit counters, 32 per word, saturating at 3
#[derive(Debug, Clone, Copy)]
pub struct Dibit;

impl CounterLayout for Dibit {
    const BITS: u32 = 2;
    const PER_WORD: u64 = 32;
    const NAME: &'static str = "dibit";
}

pub type CountingBloom4 = CountingBloom<Nibble>;
pub type CountingBloom3 = CountingBloom<Tribit>;
pub type CountingBloom2 = CountingBloom<Dibit>;

/// Counting Bloom filter over canonical k-mers
#[derive(Debug, Clone)]
pub struct CountingBloom<L: CounterLayout> {
    words: Vec<u64>,
    geometry: FilterGeometry,
    codec: KmerCodec,
    engine: HashSeedEngine,
    n_hash: usize,
    _layout: PhantomData<L>,
}

impl<L: CounterLayout> CountingBloom<L> {
    /// Filter with `2^log2_size` counters for k-mers of length `k`
    pub fn new(log2_size: u32, k: usize) -> Result<Self> {
        let codec = KmerCodec::new(k)?;
        let geometry = FilterGeometry::from_log2(log2_size)?;
        let n_words = geometry.size().div_ceil(L::PER_WORD) as usize;
        let words = allocate_zeroed::<u64>(n_words)?;

        debug!(
            layout = L::NAME,
            counters = geometry.size(),
            words = n_words,
            "Allocated counting Bloom filter"
        );

        Ok(Self {
            words,
            geometry,
            codec,
            engine: HashSeedEngine::default(),
            n_hash: DEFAULT_HASH_COUNT,
            _layout: PhantomData,
        })
    }

    /// Re-derive the seed table. Refused if a non-zero seed is already set.
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

    #[inline]
    fn slot(h: u64) -> (usize, u32) {
        ((h / L::PER_WORD) as usize, ((h % L::PER_WORD) as u32) * L::BITS)
    }

    #[inline]
    fn counter(&self, h: u64) -> u64 {
        let (word, shift) = Self::slot(h);
        (self.words[word] >> shift) & L::MAX
    }

    fn positions(&self, kmer: u64) -> impl Iterator<Item = u64> + '_ {
        let canonical = self.codec.canonical(kmer);
        let mask = self.geometry.mask();
        (0..self.n_hash).map(move |i| self.engine.hash(canonical, i) & mask)
    }

    /// Saturating increment of every probed counter
    pub fn add(&mut self, kmer: u64) {
        let canonical = self.codec.canonical(kmer);
        let mask = self.geometry.mask();
        for i in 0..self.n_hash {
            let h = self.engine.hash(canonical, i) & mask;
            let (word, shift) = Self::slot(h);
            let value = (self.words[word] >> shift) & L::MAX;
            if value < L::MAX {
                self.words[word] += 1 << shift;
            }
        }
    }

    /// True if every probed counter is at least `n`
    pub fn contains_n_occ(&self, kmer: u64, n: u64) -> bool {
        self.positions(kmer).all(|h| self.counter(h) >= n)
    }

    /// Minimum over the probed counters
    pub fn count(&self, kmer: u64) -> u64 {
        self.positions(kmer).map(|h| self.counter(h)).min().unwrap_or(0)
    }

    /// Write the raw counter words in host byte order
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        for word in &self.words {
            writer.write_all(&word.to_ne_bytes())?;
        }
        writer.flush()?;
        debug!(path = %path.as_ref().display(), layout = L::NAME, "Dumped counting filter");
        Ok(())
    }

    /// Replace the counters with a previous `dump` of the same geometry
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut file = File::open(path.as_ref())?;
        let found = file.metadata()?.len();
        let expected = (self.words.len() * 8) as u64;
        if found != expected {
            return Err(AssemblyError::FilterSizeMismatch { expected, found });
        }
        let mut bytes = Vec::with_capacity(expected as usize);
        file.read_to_end(&mut bytes)?;
        for (word, chunk) in self.words.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            *word = u64::from_ne_bytes(raw);
        }
        debug!(path = %path.as_ref().display(), layout = L::NAME, "Loaded counting filter");
        Ok(())
    }
}
