//! Rolling k-mer hash with two independent lanes
//!
//! `H(x) = XOR_j rotr(L[x_j], j)` over the bases of `x`, where `L` is a per-lane
//! table of four masked seeds and rotations are circular over `hash_size`
//! bits. Sliding the window one base in either direction is O(1).

use super::FilterGeometry;
use super::seeds::HashSeedEngine;
use crate::kmer::{KmerCodec, complement};

/// Per-filter rolling hash: character tables, geometry and `k`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingHash {
    codec: KmerCodec,
    geometry: FilterGeometry,
    tables: [[u64; 4]; 2],
}

impl RollingHash {
    pub fn new(engine: &HashSeedEngine, geometry: FilterGeometry, codec: KmerCodec) -> Self {
        let mask = geometry.mask();
        Self {
            codec,
            geometry,
            tables: [engine.char_table(0, mask), engine.char_table(1, mask)],
        }
    }

    #[inline]
    pub fn codec(&self) -> &KmerCodec {
        &self.codec
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.codec.k()
    }

    #[inline]
    pub fn geometry(&self) -> FilterGeometry {
        self.geometry
    }

    #[inline]
    fn rotate_left(&self, hash: u64, dist: u32) -> u64 {
        let width = self.geometry.hash_size();
        let dist = dist % width;
        if dist == 0 {
            return hash & self.geometry.mask();
        }
        ((hash << dist) | (hash >> (width - dist))) & self.geometry.mask()
    }

    #[inline]
    fn rotate_right(&self, hash: u64, dist: u32) -> u64 {
        let width = self.geometry.hash_size();
        let dist = dist % width;
        if dist == 0 {
            return hash & self.geometry.mask();
        }
        ((hash >> dist) | (hash << (width - dist))) & self.geometry.mask()
    }

    #[inline]
    fn char_hash(&self, base: u8, lane: usize) -> u64 {
        self.tables[lane][(base & 3) as usize]
    }

    /// Hash of a whole k-mer on one lane
    pub fn hash(&self, kmer: u64, lane: usize) -> u64 {
        let k = self.k();
        let mut hash = self.char_hash(self.codec.last_base(kmer), lane);
        for i in (0..k - 1).rev() {
            hash = self.rotate_right(hash, 1);
            hash ^= self.char_hash(self.codec.base_at(kmer, i), lane);
        }
        hash
    }

    /// Both lanes of a whole k-mer
    pub fn hashes(&self, kmer: u64) -> [u64; 2] {
        [self.hash(kmer, 0), self.hash(kmer, 1)]
    }

    /// Slide one base to the right: `leaving` drops off the front, `entering`
    /// is appended at the back
    #[inline]
    pub fn roll_forward(&self, old: u64, leaving: u8, entering: u8, lane: usize) -> u64 {
        let k = self.k() as u32;
        self.rotate_left(old ^ self.char_hash(leaving, lane), 1)
            ^ self.rotate_right(self.char_hash(entering, lane), k - 1)
    }

    /// Slide one base to the left: `leaving_last` drops off the back,
    /// `entering_first` is prepended
    #[inline]
    pub fn roll_backward(&self, old: u64, leaving_last: u8, entering_first: u8, lane: usize) -> u64 {
        let k = self.k() as u32;
        self.rotate_right(
            old ^ self.rotate_right(self.char_hash(leaving_last, lane), k - 1),
            1,
        ) ^ self.char_hash(entering_first, lane)
    }

    /// Roll `hashes` (hash of the k-mer at `start`) forward over `read` (2-bit
    /// codes) until it is the hash of the k-mer at `end`
    pub fn advance(&self, read: &[u8], hashes: &mut [u64; 2], start: usize, end: usize) {
        let k = self.k();
        for i in start..end {
            for (lane, hash) in hashes.iter_mut().enumerate() {
                *hash = self.roll_forward(*hash, read[i], read[i + k], lane);
            }
        }
    }
}

/// A k-mer cursor carrying both strands and their rolling hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoubleKmer {
    forward: u64,
    reverse: u64,
    forward_hashes: [u64; 2],
    reverse_hashes: [u64; 2],
}

impl DoubleKmer {
    pub fn from_kmer(kmer: u64, rolling: &RollingHash) -> Self {
        let reverse = rolling.codec().revcomp(kmer);
        Self {
            forward: kmer,
            reverse,
            forward_hashes: rolling.hashes(kmer),
            reverse_hashes: rolling.hashes(reverse),
        }
    }

    #[inline]
    pub fn forward(&self) -> u64 {
        self.forward
    }

    #[inline]
    pub fn reverse(&self) -> u64 {
        self.reverse
    }

    #[inline]
    pub fn forward_hashes(&self) -> [u64; 2] {
        self.forward_hashes
    }

    /// The same k-mer seen from the opposite strand
    #[inline]
    pub fn reversed(&self) -> Self {
        Self {
            forward: self.reverse,
            reverse: self.forward,
            forward_hashes: self.reverse_hashes,
            reverse_hashes: self.forward_hashes,
        }
    }

    /// Canonical code
    #[inline]
    pub fn canonical(&self) -> u64 {
        self.forward.min(self.reverse)
    }

    /// Hash lanes of the canonical strand
    #[inline]
    pub fn canonical_hashes(&self) -> [u64; 2] {
        if self.forward <= self.reverse {
            self.forward_hashes
        } else {
            self.reverse_hashes
        }
    }

    /// Step forward by appending `base`; the reverse strand gains the
    /// complement at its front
    pub fn extend(&self, base: u8, rolling: &RollingHash) -> Self {
        let codec = rolling.codec();
        let k = codec.k();
        let leaving = codec.first_base(self.forward);
        let forward = codec.extend_forward(self.forward, base);

        let rev_leaving = codec.last_base(self.reverse);
        let comp = complement(base);
        let reverse = (self.reverse >> 2) | ((comp as u64) << (2 * (k - 1)));

        let mut forward_hashes = self.forward_hashes;
        let mut reverse_hashes = self.reverse_hashes;
        for lane in 0..2 {
            forward_hashes[lane] = rolling.roll_forward(forward_hashes[lane], leaving, base, lane);
            reverse_hashes[lane] =
                rolling.roll_backward(reverse_hashes[lane], rev_leaving, comp, lane);
        }

        Self {
            forward,
            reverse,
            forward_hashes,
            reverse_hashes,
        }
    }

    /// Step over `read[start + k..end + k]` (2-bit codes), so that a cursor on
    /// the k-mer at `start` ends on the k-mer at `end`
    pub fn advance(&self, read: &[u8], start: usize, end: usize, rolling: &RollingHash) -> Self {
        let k = rolling.k();
        (start..end).fold(*self, |cur, i| cur.extend(read[i + k], rolling))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rolling(k: usize, log2: u32, seed: u64) -> RollingHash {
        RollingHash::new(
            &HashSeedEngine::new(seed),
            FilterGeometry::from_log2(log2).unwrap(),
            KmerCodec::new(k).unwrap(),
        )
    }

    #[test]
    fn test_roll_forward_matches_recompute() {
        let rh = rolling(5, 20, 0);
        let codec = *rh.codec();
        let read: Vec<u8> = b"ACGTTGCAAGTC".iter().map(|&c| crate::kmer::base_code(c).unwrap()).collect();
        let mut hashes = rh.hashes(codec.pack(&read, 0));
        for i in 0..read.len() - 5 {
            rh.advance(&read, &mut hashes, i, i + 1);
            assert_eq!(hashes, rh.hashes(codec.pack(&read, i + 1)));
        }
    }

    #[test]
    fn test_double_kmer_tracks_both_strands() {
        let rh = rolling(7, 16, 3);
        let codec = *rh.codec();
        let start = codec.encode(b"GATTACA").unwrap();
        let mut cur = DoubleKmer::from_kmer(start, &rh);
        for &b in &[0u8, 3, 2, 1, 1, 0] {
            cur = cur.extend(b, &rh);
            let fresh = DoubleKmer::from_kmer(cur.forward(), &rh);
            assert_eq!(cur, fresh);
            assert_eq!(cur.reverse(), codec.revcomp(cur.forward()));
        }
    }

    #[test]
    fn test_reversed_is_involution() {
        let rh = rolling(9, 12, 0);
        let kmer = rh.codec().encode(b"ACCGTTAGC").unwrap();
        let dk = DoubleKmer::from_kmer(kmer, &rh);
        assert_eq!(dk.reversed().reversed(), dk);
        assert_eq!(dk.canonical(), dk.reversed().canonical());
        assert_eq!(dk.canonical_hashes(), dk.reversed().canonical_hashes());
    }

    #[test]
    fn test_rotations_are_inverse() {
        // widths below k - 1 = 30 wrap the rotation distance
        for log2 in [1u32, 2, 7, 13, 29, 30, 31, 40] {
            let rh = rolling(31, log2, 5);
            let mask = rh.geometry().mask();
            let values = [0, 1, mask, mask >> 1, 0x5555_5555_5555 & mask, 0xdead_beef_cafe & mask];
            for d in 1..log2 + 40 {
                for &h in &values {
                    assert_eq!(rh.rotate_left(rh.rotate_right(h, d), d), h, "width {} d {}", log2, d);
                    assert_eq!(rh.rotate_right(rh.rotate_left(h, d), d), h, "width {} d {}", log2, d);
                }
            }
            assert_eq!(rh.rotate_left(1, log2), 1);
        }
    }

    #[test]
    fn test_roll_backward_undoes_roll_forward() {
        let rh = rolling(31, 13, 9);
        let codec = *rh.codec();
        let read: Vec<u8> = (0..32u8).map(|i| (i * 7 + i / 3) & 3).collect();
        let first = rh.hashes(codec.pack(&read, 0));
        let second = rh.hashes(codec.pack(&read, 1));
        for lane in 0..2 {
            let rolled = rh.roll_forward(first[lane], read[0], read[31], lane);
            assert_eq!(rolled, second[lane]);
            assert_eq!(rh.roll_backward(rolled, read[31], read[0], lane), first[lane]);
        }
    }

    #[test]
    fn test_tiny_geometry_does_not_overflow() {
        let rh = rolling(3, 1, 0);
        let kmer = rh.codec().encode(b"ACG").unwrap();
        let dk = DoubleKmer::from_kmer(kmer, &rh).extend(3, &rh);
        assert!(dk.forward_hashes().iter().all(|&h| h <= 1));
    }
}
