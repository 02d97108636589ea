// Filter buffers are indexed by u64 positions up to 2^40 bits
#[cfg(target_pointer_width = "32")]
compile_error!("readscan requires a 64-bit target to address large filters.");

pub mod config;
pub mod error;
pub mod filter;
pub mod graph;
pub mod junction;
pub mod junction_map;
pub mod kmer;
pub mod logging;
pub mod oracle;
pub mod pipeline;

pub use error::{AssemblyError, Result};
pub use filter::{BloomFilter, CountingBloom, DoubleKmer, FilterMode, HashSeedEngine, RollingHash};
pub use graph::{ContigGraph, ContigId, NodeId};
pub use junction::{Extension, Junction};
pub use junction_map::JunctionMap;
pub use kmer::KmerCodec;
pub use oracle::{ExtensionOracle, ExtensionSet, LookaheadChecker};
pub use pipeline::Assembler;
