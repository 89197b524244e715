//! FST archives (FARs): keyed collections of finite-state transducers in a
//! single container file.
//!
//! Three container layouts are supported:
//!
//! - [`sttable`] -- sorted table with a tail index; random-access lookup,
//!   keys must be added in strictly increasing order
//! - [`stlist`] -- streamable list; sequential scan, any key order, can be
//!   written to a non-seekable sink
//! - a degenerate single-FST container, where the key is the file's stem
//!
//! [`far`] ties them together behind keyed reader/writer interfaces that
//! also span concatenations of archives. [`extract`] and [`info`] are the
//! library halves of the corresponding archive tools.

pub mod extract;
pub mod far;
pub mod info;
pub mod stlist;
pub mod sttable;

use std::fmt;
use std::str::FromStr;

/// Magic number opening an STTABLE archive.
pub const STTABLE_MAGIC: i32 = 0x71a8c0e6;
/// Magic number opening an STLIST archive.
pub const STLIST_MAGIC: i32 = 0x3cb9b4b8;

/// Error type for archive reading and writing.
#[derive(Debug, thiserror::Error)]
pub enum FarError {
    #[error("invalid magic number in archive: got {0:#010x}")]
    BadMagic(i32),
    #[error("archive key '{key}' not greater than previous key '{last}'")]
    OutOfOrderKey { key: String, last: String },
    #[error("empty archive key")]
    EmptyKey,
    #[error("single-FST archive already holds an entry")]
    SingleFstOccupied,
    #[error("unknown archive type '{0}'")]
    UnknownFarType(String),
    #[error("unknown entry type '{0}'")]
    UnknownEntryType(String),
    #[error("unknown token type '{0}'")]
    UnknownTokenType(String),
    #[error("malformed archive: {0}")]
    Format(String),
    #[error(transparent)]
    Fst(#[from] verkko_fst::FstError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type used throughout the crate.
pub type Result<T, E = FarError> = std::result::Result<T, E>;

/// Archive container layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FarType {
    /// Writer's choice; resolves to the sorted table.
    #[default]
    Default,
    /// A single plain FST file.
    Fst,
    /// Streamable list.
    STList,
    /// Sorted table with an index.
    STTable,
}

impl FarType {
    pub fn resolve(self) -> FarType {
        match self {
            FarType::Default => FarType::STTable,
            other => other,
        }
    }
}

impl fmt::Display for FarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FarType::Default => "default",
            FarType::Fst => "fst",
            FarType::STList => "stlist",
            FarType::STTable => "sttable",
        };
        write!(f, "{name}")
    }
}

impl FromStr for FarType {
    type Err = FarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(FarType::Default),
            "fst" => Ok(FarType::Fst),
            "stlist" => Ok(FarType::STList),
            "sttable" => Ok(FarType::STTable),
            other => Err(FarError::UnknownFarType(other.to_string())),
        }
    }
}

/// How text input maps to string-FST entries: one per line, or one per file.
/// Only the text-to-FST conversion done by external tooling consumes this;
/// the archive itself is agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FarEntryType {
    #[default]
    Line,
    File,
}

impl fmt::Display for FarEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FarEntryType::Line => "line",
                FarEntryType::File => "file",
            }
        )
    }
}

impl FromStr for FarEntryType {
    type Err = FarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "line" => Ok(FarEntryType::Line),
            "file" => Ok(FarEntryType::File),
            other => Err(FarError::UnknownEntryType(other.to_string())),
        }
    }
}

/// How text symbols map to labels in string FSTs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FarTokenType {
    /// One byte, one label.
    #[default]
    Byte,
    /// One Unicode scalar, one label.
    Utf8,
    /// Labels via a provided symbol table.
    Symbol,
}

impl fmt::Display for FarTokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                FarTokenType::Byte => "byte",
                FarTokenType::Utf8 => "utf8",
                FarTokenType::Symbol => "symbol",
            }
        )
    }
}

impl FromStr for FarTokenType {
    type Err = FarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "byte" => Ok(FarTokenType::Byte),
            "utf8" => Ok(FarTokenType::Utf8),
            "symbol" => Ok(FarTokenType::Symbol),
            other => Err(FarError::UnknownTokenType(other.to_string())),
        }
    }
}
