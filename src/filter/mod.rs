//! Probabilistic k-mer membership filters
//!
//! All filters share a power-of-two geometry, a seed table derived from the
//! same base constants and, for the presence filter, a rolling hash that
//! lets read scanning update both hash lanes in constant time per base.

pub mod bloom;
pub mod counting;
pub mod rolling;
pub mod seeds;

pub use bloom::{BloomFilter, FilterMode};
pub use counting::{CounterLayout, CountingBloom, CountingBloom2, CountingBloom3, CountingBloom4};
pub use rolling::{DoubleKmer, RollingHash};
pub use seeds::HashSeedEngine;

use crate::error::{AssemblyError, Result};

/// Largest supported `hash_size` (log2 of the addressable size)
pub const MAX_HASH_SIZE: u32 = 40;

/// Power-of-two addressable size of a filter, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterGeometry {
    hash_size: u32,
    mask: u64,
}

impl FilterGeometry {
    /// Smallest power of two strictly greater than `requested_bits`
    /// (`hash_size = floor(log2(requested_bits)) + 1`)
    pub fn from_requested_bits(requested_bits: u64) -> Result<Self> {
        let requested = requested_bits.max(1);
        let hash_size = requested.ilog2() + 1;
        Self::from_log2(hash_size)
    }

    /// Geometry of exactly `2^log2_size` slots
    pub fn from_log2(log2_size: u32) -> Result<Self> {
        if log2_size == 0 || log2_size > MAX_HASH_SIZE {
            return Err(AssemblyError::config(format!(
                "filter size 2^{} is outside 2^1..=2^{}",
                log2_size, MAX_HASH_SIZE
            )));
        }
        Ok(Self {
            hash_size: log2_size,
            mask: (1u64 << log2_size) - 1,
        })
    }

    /// log2 of the addressable size
    #[inline]
    pub fn hash_size(&self) -> u32 {
        self.hash_size
    }

    /// `size - 1`
    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Addressable size in slots
    #[inline]
    pub fn size(&self) -> u64 {
        self.mask + 1
    }
}

/// Allocate a zeroed buffer, reporting allocation failure instead of aborting.
pub(crate) fn allocate_zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| AssemblyError::OutOfMemory((len * std::mem::size_of::<T>()) as u64))?;
    buffer.resize(len, T::default());
    Ok(buffer)
}

/// Number of hash functions a filter accepts
pub const HASH_COUNT_RANGE: std::ops::RangeInclusive<usize> = 1..=seeds::NSEEDS;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_from_requested_bits() {
        let g = FilterGeometry::from_requested_bits(1000).unwrap();
        assert_eq!(g.hash_size(), 10);
        assert_eq!(g.size(), 1024);
        assert_eq!(g.mask(), 1023);

        // exact power of two still rounds up
        let g = FilterGeometry::from_requested_bits(1024).unwrap();
        assert_eq!(g.size(), 2048);

        let g = FilterGeometry::from_requested_bits(0).unwrap();
        assert_eq!(g.size(), 2);
    }

    #[test]
    fn test_geometry_limits() {
        assert!(FilterGeometry::from_log2(0).is_err());
        assert!(FilterGeometry::from_log2(MAX_HASH_SIZE + 1).is_err());
    }

    #[test]
    fn test_allocate_zeroed() {
        let buf: Vec<u64> = allocate_zeroed(16).unwrap();
        assert_eq!(buf.len(), 16);
        assert!(buf.iter().all(|&w| w == 0));
    }
}
