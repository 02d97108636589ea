//! K-mer codec: 2-bit packing, reverse complement and canonical form
//!
//! K-mers are packed into a `u64` with two bits per base (A=0, C=1, G=2, T=3).
//! The first base of the k-mer occupies the most significant used bits, so
//! appending a base is a shift left followed by a mask. `k` must be odd so no
//! k-mer is its own reverse complement, which lets the junction index store a
//! branching k-mer once per orientation without ambiguity.

use crate::error::{AssemblyError, Result};

/// Maximum supported k-mer length
pub const MAX_K: usize = 31;

/// Minimum supported k-mer length
pub const MIN_K: usize = 3;

/// ASCII to 2-bit lookup, 0xFF for anything that is not ACGT/acgt.
static BASE_LUT: [u8; 256] = {
    const X: u8 = 0xFF;
    let mut t = [X; 256];
    t[b'A' as usize] = 0;
    t[b'a' as usize] = 0;
    t[b'C' as usize] = 1;
    t[b'c' as usize] = 1;
    t[b'G' as usize] = 2;
    t[b'g' as usize] = 2;
    t[b'T' as usize] = 3;
    t[b't' as usize] = 3;
    t
};

const BASE_CHARS: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// 2-bit code of an ASCII nucleotide, `None` if ambiguous.
#[inline]
pub fn base_code(c: u8) -> Option<u8> {
    let v = BASE_LUT[c as usize];
    if v <= 3 { Some(v) } else { None }
}

/// ASCII nucleotide of a 2-bit code.
#[inline]
pub fn base_char(code: u8) -> u8 {
    BASE_CHARS[(code & 3) as usize]
}

/// Complement of a 2-bit base.
#[inline]
pub fn complement(code: u8) -> u8 {
    3 - (code & 3)
}

/// Reverse complement of an ASCII sequence. Non-ACGT symbols become `N`.
pub fn revcomp_string(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&c| match base_code(c) {
            Some(code) => base_char(complement(code)),
            None => b'N',
        })
        .collect()
}

/// Split a read into maximal runs of unambiguous bases, as 2-bit codes.
///
/// Runs shorter than `min_len` are dropped.
pub fn base_runs(read: &[u8], min_len: usize) -> Vec<Vec<u8>> {
    let mut runs = Vec::new();
    let mut current = Vec::with_capacity(read.len());
    for &c in read {
        match base_code(c) {
            Some(code) => current.push(code),
            None => {
                if current.len() >= min_len {
                    runs.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() >= min_len {
        runs.push(current);
    }
    runs
}

/// Fixed-k codec for packed k-mers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerCodec {
    k: usize,
    mask: u64,
}

impl KmerCodec {
    /// Create a codec for k-mers of length `k` (odd, `MIN_K..=MAX_K`)
    pub fn new(k: usize) -> Result<Self> {
        if !(MIN_K..=MAX_K).contains(&k) || k % 2 == 0 {
            return Err(AssemblyError::invalid_kmer_length(k, MIN_K, MAX_K));
        }
        Ok(Self {
            k,
            mask: (1u64 << (2 * k)) - 1,
        })
    }

    /// K-mer length
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Mask covering the `2k` used bits
    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Pack `k` 2-bit codes starting at `pos`
    #[inline]
    pub fn pack(&self, codes: &[u8], pos: usize) -> u64 {
        codes[pos..pos + self.k]
            .iter()
            .fold(0u64, |acc, &b| (acc << 2) | b as u64)
    }

    /// Pack an ASCII window of length `k`; `None` on length mismatch or ambiguity
    pub fn encode(&self, window: &[u8]) -> Option<u64> {
        if window.len() != self.k {
            return None;
        }
        let mut code = 0u64;
        for &c in window {
            code = (code << 2) | base_code(c)? as u64;
        }
        Some(code)
    }

    /// Parse a k-mer string, failing with `InvalidKmer`
    pub fn parse(&self, text: &str) -> Result<u64> {
        self.encode(text.as_bytes())
            .ok_or_else(|| AssemblyError::InvalidKmer(text.to_string()))
    }

    /// Render a packed k-mer as ASCII bases
    pub fn to_string(&self, kmer: u64) -> String {
        let bytes: Vec<u8> = (0..self.k)
            .map(|i| base_char(self.base_at(kmer, i)))
            .collect();
        String::from_utf8(bytes).unwrap_or_default()
    }

    /// Base at position `i` (0 = first)
    #[inline]
    pub fn base_at(&self, kmer: u64, i: usize) -> u8 {
        ((kmer >> (2 * (self.k - 1 - i))) & 3) as u8
    }

    /// First (most significant) base
    #[inline]
    pub fn first_base(&self, kmer: u64) -> u8 {
        self.base_at(kmer, 0)
    }

    /// Last (least significant) base
    #[inline]
    pub fn last_base(&self, kmer: u64) -> u8 {
        (kmer & 3) as u8
    }

    /// Drop the first base and append `base`
    #[inline]
    pub fn extend_forward(&self, kmer: u64, base: u8) -> u64 {
        ((kmer << 2) | (base & 3) as u64) & self.mask
    }

    /// Reverse complement
    #[inline]
    pub fn revcomp(&self, kmer: u64) -> u64 {
        let mut x = !kmer;
        x = ((x >> 2) & 0x3333_3333_3333_3333) | ((x & 0x3333_3333_3333_3333) << 2);
        x = ((x >> 4) & 0x0F0F_0F0F_0F0F_0F0F) | ((x & 0x0F0F_0F0F_0F0F_0F0F) << 4);
        x = ((x >> 8) & 0x00FF_00FF_00FF_00FF) | ((x & 0x00FF_00FF_00FF_00FF) << 8);
        x = ((x >> 16) & 0x0000_FFFF_0000_FFFF) | ((x & 0x0000_FFFF_0000_FFFF) << 16);
        x = x.rotate_left(32);
        x >> (64 - 2 * self.k)
    }

    /// Numerically smaller of the k-mer and its reverse complement
    #[inline]
    pub fn canonical(&self, kmer: u64) -> u64 {
        kmer.min(self.revcomp(kmer))
    }

    /// All k-mers of an ASCII read, skipping windows with ambiguous bases
    pub fn kmers(&self, read: &[u8]) -> Vec<u64> {
        let mut out = Vec::new();
        for run in base_runs(read, self.k) {
            let mut kmer = self.pack(&run, 0);
            out.push(kmer);
            for &b in &run[self.k..] {
                kmer = self.extend_forward(kmer, b);
                out.push(kmer);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_rejects_bad_k() {
        assert!(KmerCodec::new(2).is_err());
        assert!(KmerCodec::new(4).is_err());
        assert!(KmerCodec::new(33).is_err());
        assert!(KmerCodec::new(31).is_ok());
    }

    #[test]
    fn test_encode_and_render() {
        let codec = KmerCodec::new(5).unwrap();
        let kmer = codec.encode(b"ACGTA").unwrap();
        assert_eq!(kmer, 0b00_01_10_11_00);
        assert_eq!(codec.to_string(kmer), "ACGTA");
        assert_eq!(codec.first_base(kmer), 0);
        assert_eq!(codec.last_base(kmer), 0);
        assert!(codec.encode(b"ACNTA").is_none());
        assert!(codec.parse("ACGT").is_err());
    }

    #[test]
    fn test_revcomp_matches_string_revcomp() {
        let codec = KmerCodec::new(7).unwrap();
        let kmer = codec.encode(b"AACGTTG").unwrap();
        let rc = codec.revcomp(kmer);
        assert_eq!(codec.to_string(rc), "CAACGTT");
        assert_eq!(codec.revcomp(rc), kmer);
        assert_eq!(revcomp_string(b"AACGTTG"), b"CAACGTT".to_vec());
    }

    #[test]
    fn test_canonical_is_strand_independent() {
        let codec = KmerCodec::new(9).unwrap();
        let kmer = codec.encode(b"TTTGCAGGA").unwrap();
        assert_eq!(codec.canonical(kmer), codec.canonical(codec.revcomp(kmer)));
    }

    #[test]
    fn test_kmers_split_on_ambiguous_bases() {
        let codec = KmerCodec::new(3).unwrap();
        let kmers = codec.kmers(b"ACGTNACG");
        let rendered: Vec<String> = kmers.iter().map(|&k| codec.to_string(k)).collect();
        assert_eq!(rendered, vec!["ACG", "CGT", "ACG"]);
    }

    #[test]
    fn test_base_runs() {
        let runs = base_runs(b"ACNNGTTA", 2);
        assert_eq!(runs, vec![vec![0, 1], vec![2, 3, 3, 0]]);
        assert!(base_runs(b"ANA", 2).is_empty());
    }
}
