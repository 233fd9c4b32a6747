//! Error types.
//!
//! Only configuration and output failures are fatal. Everything the extractor
//! or encoder cannot make sense of degrades to `Unknown` (see [`Degradation`]).

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::program::NodeId;

/// Project configuration could not be discovered or parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No tsconfig found walking up from the root
    #[error("Failed to find {name} from {}", start.display())]
    TsconfigNotFound {
        /// Config file name that was searched for
        name: String,
        /// Directory the search started from
        start: PathBuf,
    },
    /// Config file exists but could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// tsconfig is not valid JSON after stripping comments
    #[error("Failed to parse {}: {source}", path.display())]
    Json {
        /// Config file path
        path: PathBuf,
        /// Underlying parse error
        source: serde_json::Error,
    },
    /// routetypes.toml is malformed
    #[error("Failed to parse {}: {source}", path.display())]
    Toml {
        /// Settings file path
        path: PathBuf,
        /// Underlying parse error
        source: toml::de::Error,
    },
    /// tsconfig `extends` chain loops back on itself
    #[error("Circular tsconfig extends at {}", path.display())]
    CircularExtends {
        /// Config file that was reached twice
        path: PathBuf,
    },
    /// An include/exclude pattern is not a valid glob
    #[error("Invalid tsconfig pattern {pattern:?}: {source}")]
    Pattern {
        /// Offending pattern
        pattern: String,
        /// Underlying glob error
        source: glob::PatternError,
    },
    /// Project root cannot be resolved
    #[error("Failed to resolve project root {}: {source}", path.display())]
    Root {
        /// Requested root
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Fatal failure of a build or write.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Configuration is unusable
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Artifact could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Internal failure of an oracle query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OracleError {
    /// Node id is not in the arena
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    /// Node carries no declared type
    #[error("node {0} has no declared type")]
    Untyped(NodeId),
    /// Node is not an object-like declaration
    #[error("node {0} has no members")]
    NotAnObject(NodeId),
    /// Alias expansion exceeded the depth bound
    #[error("type alias expansion too deep at {0}")]
    DepthExceeded(String),
}

/// Reasons a node could not be encoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// An oracle query failed
    #[error(transparent)]
    Oracle(#[from] OracleError),
    /// The oracle type has no representation
    #[error("unrepresentable type: {0}")]
    Unrepresentable(&'static str),
    /// A self-referential object was reached again
    #[error("recursive object at {0}")]
    Recursive(NodeId),
    /// Nesting exceeded the depth bound
    #[error("nesting deeper than {0}")]
    TooDeep(usize),
}

/// Non-fatal conditions. They only shape the output (more `Unknown`) and are
/// surfaced in trace logs, never as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    /// File has no default export of the expected call-expression form
    NoDefaultExport,
    /// A type could not be classified or an oracle query failed
    UnresolvedType,
    /// A parameter type does not trace back to the framework module
    OriginMismatch,
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoDefaultExport => "no default export",
            Self::UnresolvedType => "unresolved type",
            Self::OriginMismatch => "origin mismatch",
        })
    }
}
