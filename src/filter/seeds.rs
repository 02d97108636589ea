//! Seed table and integer mixer shared by every filter

/// Number of seed-table entries, and therefore the maximum hash-function count
pub const NSEEDS: usize = 10;

const BASE_SEEDS: [u64; NSEEDS] = [
    0xAAAA_AAAA_5555_5555,
    0x3333_3333_CCCC_CCCC,
    0x6666_6666_9999_9999,
    0xB5B5_B5B5_4B4B_4B4B,
    0xAA55_AA55_5533_5533,
    0x33CC_33CC_CC66_CC66,
    0x6699_6699_99B5_99B5,
    0xB54B_B54B_4BAA_4BAA,
    0xAA33_AA33_55CC_55CC,
    0x3366_3366_CC99_CC99,
];

/// Deterministic seed derivation for a user seed.
///
/// The same user seed always yields the same tables, so filters built in two
/// runs with equal seeds are bit-for-bit identical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashSeedEngine {
    user_seed: u64,
    seeds: [u64; NSEEDS],
}

impl HashSeedEngine {
    pub fn new(user_seed: u64) -> Self {
        let mut seeds = BASE_SEEDS;
        for i in 0..NSEEDS {
            seeds[i] = seeds[i]
                .wrapping_mul(seeds[(i + 3) % NSEEDS])
                .wrapping_add(user_seed);
        }
        Self { user_seed, seeds }
    }

    pub fn user_seed(&self) -> u64 {
        self.user_seed
    }

    pub fn seed_table(&self) -> [u64; NSEEDS] {
        self.seeds
    }

    /// Per-base table for one rolling-hash lane (0 or 1), masked to the filter size
    pub fn char_table(&self, lane: usize, mask: u64) -> [u64; 4] {
        let offset = if lane == 0 { 0 } else { 4 };
        let mut table = [0u64; 4];
        table.copy_from_slice(&BASE_SEEDS[offset..offset + 4]);
        for i in 0..4 {
            table[i] = table[i]
                .wrapping_mul(table[(i + 3) % 4])
                .wrapping_add(self.user_seed);
        }
        for entry in table.iter_mut() {
            *entry &= mask;
        }
        table
    }

    /// Seeded 64-bit mixer; `num_hash` selects the seed (taken modulo `NSEEDS`)
    #[inline]
    pub fn hash(&self, key: u64, num_hash: usize) -> u64 {
        let mut hash = self.seeds[num_hash % NSEEDS];
        hash ^= (hash << 7)
            ^ key.wrapping_mul(hash >> 3)
            ^ !((hash << 11).wrapping_add(key ^ (hash >> 5)));
        hash = (!hash).wrapping_add(hash << 21);
        hash ^= hash >> 24;
        hash = hash.wrapping_add(hash << 3).wrapping_add(hash << 8);
        hash ^= hash >> 14;
        hash = hash.wrapping_add(hash << 2).wrapping_add(hash << 4);
        hash ^= hash >> 28;
        hash = hash.wrapping_add(hash << 31);
        hash
    }
}

impl Default for HashSeedEngine {
    fn default() -> Self {
        Self::new(0)
    }
}
