//! False-positive resolution for filter-driven graph walks
//!
//! A Bloom filter answers "maybe" for k-mers that were never inserted. Before
//! a forward extension is trusted, an [`ExtensionOracle`] decides whether it is
//! real. [`LookaheadChecker`] accepts an extension when the filter contains a
//! continuation of at least `depth` further k-mers from it: isolated false
//! positives rarely chain that far.

use crate::filter::{BloomFilter, DoubleKmer};

/// Decides whether a filter-positive k-mer is a genuine extension
pub trait ExtensionOracle {
    /// `candidate` is already known to be in the filter
    fn confirms(&self, candidate: &DoubleKmer, filter: &BloomFilter) -> bool;
}

/// Bounded depth-first lookahead through the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookaheadChecker {
    depth: usize,
}

impl LookaheadChecker {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn extends(&self, from: &DoubleKmer, filter: &BloomFilter, remaining: usize) -> bool {
        if remaining == 0 {
            return true;
        }
        (0..4u8).any(|base| {
            let next = from.extend(base, filter.rolling());
            filter.contains_double(&next) && self.extends(&next, filter, remaining - 1)
        })
    }
}

impl Default for LookaheadChecker {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ExtensionOracle for LookaheadChecker {
    fn confirms(&self, candidate: &DoubleKmer, filter: &BloomFilter) -> bool {
        self.extends(candidate, filter, self.depth)
    }
}

/// Set of forward bases, one bit per base
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtensionSet(u8);

impl ExtensionSet {
    pub fn insert(&mut self, base: u8) {
        self.0 |= 1 << (base & 3);
    }

    pub fn contains(&self, base: u8) -> bool {
        self.0 & (1 << (base & 3)) != 0
    }

    pub fn count(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The only base, if exactly one is present
    pub fn single(&self) -> Option<u8> {
        if self.count() == 1 {
            Some(self.0.trailing_zeros() as u8)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..4u8).filter(|&b| self.contains(b))
    }

    /// Validity flags for the four forward slots
    pub fn as_flags(&self) -> [bool; 4] {
        [self.contains(0), self.contains(1), self.contains(2), self.contains(3)]
    }
}

/// Forward extensions of `kmer` that are in the filter and confirmed by the oracle
pub fn valid_extensions(
    kmer: &DoubleKmer,
    filter: &BloomFilter,
    oracle: &dyn ExtensionOracle,
) -> ExtensionSet {
    let mut set = ExtensionSet::default();
    for base in 0..4u8 {
        let next = kmer.extend(base, filter.rolling());
        if filter.contains_double(&next) && oracle.confirms(&next, filter) {
            set.insert(base);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterMode;

    fn filter_with(seqs: &[&str], k: usize) -> BloomFilter {
        let mut filter = BloomFilter::new(1 << 20, k)
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
    fn test_extension_set() {
        let mut set = ExtensionSet::default();
        assert!(set.is_empty());
        set.insert(2);
        assert_eq!(set.single(), Some(2));
        set.insert(0);
        assert_eq!(set.count(), 2);
        assert_eq!(set.single(), None);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(set.as_flags(), [true, false, true, false]);
    }

    #[test]
    fn test_lookahead_rejects_short_branch() {
        // GCAAC branches to GCAACA (long arm) and GCAACT (one k-mer only)
        let filter = filter_with(&["TTGCAACAGGTAC", "GCAACT"], 5);
        let codec = *filter.codec();
        let start = DoubleKmer::from_kmer(codec.parse("GCAAC").unwrap(), filter.rolling());

        let shallow = valid_extensions(&start, &filter, &LookaheadChecker::new(0));
        assert_eq!(shallow.count(), 2);

        let deep = valid_extensions(&start, &filter, &LookaheadChecker::new(2));
        assert_eq!(deep.single(), Some(0));
    }
}
