//! Weighted finite-state transducer (WFST) engine.
//!
//! This crate provides the core machinery for building, transforming and
//! serializing weighted finite-state transducers: directed multigraphs whose
//! transitions carry an input label, an output label and a weight drawn from
//! a semiring.
//!
//! # Architecture
//!
//! - [`weight`] -- Semiring trait, stable accumulation, composite text I/O
//! - [`float_weight`] -- Tropical, log and min-max semirings over `f32`
//! - [`pair_weight`] -- Cartesian product of two semirings
//! - [`expectation_weight`] -- Expectation semiring (probability, value) pairs
//! - [`power_weight`] -- Fixed-length tuples of one semiring
//! - [`lexicographic_weight`] -- Lexicographic ordering of two path semirings
//! - [`signed_log_weight`] -- Log-domain magnitudes with a sign component
//! - [`string_weight`] -- String semirings and the gallic product
//! - [`transition`] -- The labeled, weighted transition record
//! - [`properties`] -- Structural property bits, inference and verification
//! - [`symbols`] -- Label-to-symbol tables with binary serialization
//! - [`fst`] -- Read-only, expanded and mutable transducer traits
//! - [`vector_fst`] -- Mutable adjacency-list representation
//! - [`cache`] -- Per-state lazy store with FIFO garbage collection
//! - [`compactor`] -- Element packing strategies for read-only transducers
//! - [`compact_fst`] -- Read-only, compactor-parameterized representation
//! - [`mapped`] -- Byte regions with heap or memory-mapped provenance
//! - [`io`] -- Binary header, alignment and primitive stream helpers
//! - [`variant`] -- Tagged union over the representations a file may hold
//! - [`config`] -- Library configuration knobs threaded through constructors

pub mod cache;
pub mod compact_fst;
pub mod compactor;
pub mod config;
pub mod expectation_weight;
pub mod float_weight;
pub mod fst;
pub mod io;
pub mod lexicographic_weight;
pub mod mapped;
pub mod pair_weight;
pub mod power_weight;
pub mod properties;
pub mod signed_log_weight;
pub mod string_weight;
pub mod symbols;
pub mod transition;
pub mod variant;
pub mod vector_fst;
pub mod weight;

pub use fst::{ExpandedFst, Fst, MutableFst};
pub use transition::Transition;
pub use weight::Weight;

/// Transition label. Positive values index into an external symbol table.
pub type Label = i32;

/// State identifier. Non-negative values are dense indices starting at 0.
pub type StateId = i32;

/// Sentinel for "no label"; also the label pair of a superfinal transition.
pub const NO_LABEL: Label = -1;

/// Sentinel for "no state"; an FST whose start is `NO_STATE_ID` is empty.
pub const NO_STATE_ID: StateId = -1;

/// The epsilon label, consumed or produced without a visible symbol.
pub const EPSILON: Label = 0;

/// Error type for FST parsing, serialization and construction.
///
/// Format violations are reported through this enum. Data-domain problems
/// (a weight that is not a semiring member, a compactor that disagrees with
/// its input) instead surface as the sticky [`properties::ERROR`] bit or a
/// `no_weight` value through normal return paths.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("invalid magic number in FST header: expected {expected:#010x}, got {found:#010x}")]
    BadMagic { expected: i32, found: i32 },
    #[error("file too short: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("unknown FST type '{0}'")]
    UnknownFstType(String),
    #[error("FST type mismatch: expected '{expected}', got '{found}'")]
    FstTypeMismatch { expected: String, found: String },
    #[error("transition type mismatch: expected '{expected}', got '{found}'")]
    ArcTypeMismatch { expected: String, found: String },
    #[error("unsupported version {version} for FST type '{fst_type}' (minimum {min})")]
    UnsupportedVersion {
        fst_type: String,
        version: i32,
        min: i32,
    },
    #[error("unknown compactor type '{0}'")]
    UnknownCompactor(String),
    #[error("invalid weight text: {0}")]
    BadWeightText(String),
    #[error("invalid symbol table: {0}")]
    BadSymbolTable(String),
    #[error("invalid string payload: {0}")]
    BadString(String),
    #[error("malformed FST file: {0}")]
    Format(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type used throughout the crate.
pub type Result<T, E = FstError> = std::result::Result<T, E>;
