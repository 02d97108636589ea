//! Error handling for the readscan assembler core
//!
//! Fatal conditions (I/O, allocation failure, malformed files, broken graph
//! handles) are reported through [`AssemblyError`]. Misconfiguration of an
//! already-built filter is not an error: it is logged and ignored so that the
//! previous valid state is preserved.

use thiserror::Error;

/// Error type for all assembler operations
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// I/O errors (filter dumps, junction files, graph export)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed line in a text input
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Invalid k-mer length
    #[error("K-mer length {k} is invalid (must be odd and between {min} and {max})")]
    InvalidKmerLength { k: usize, min: usize, max: usize },

    /// K-mer text containing something other than ACGT
    #[error("Invalid k-mer '{0}'")]
    InvalidKmer(String),

    /// Buffer allocation failed
    #[error("Memory allocation failed: requested {0} bytes")]
    OutOfMemory(u64),

    /// Loaded filter buffer does not match the constructed geometry
    #[error("Filter size mismatch: expected {expected} bytes, file holds {found}")]
    FilterSizeMismatch { expected: u64, found: u64 },

    /// Contig handle does not refer to a live contig
    #[error("Contig {0} not found")]
    UnknownContig(usize),

    /// Node handle does not refer to a live node
    #[error("Node {0} not found")]
    UnknownNode(usize),

    /// Two contigs were expected to share a node but do not
    #[error("Contigs {0} and {1} do not share a node on the given sides")]
    NotAdjacent(usize, usize),

    /// Generic error for nested failures
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AssemblyError {
    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Parse error for the given 1-based line number
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create an InvalidKmerLength error
    pub fn invalid_kmer_length(k: usize, min: usize, max: usize) -> Self {
        Self::InvalidKmerLength { k, min, max }
    }
}

/// Result type alias for assembler operations
pub type Result<T> = std::result::Result<T, AssemblyError>;
