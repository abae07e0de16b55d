//src/error.rs

use thiserror::Error;

/// Result type alias for lcastar-rs operations
pub type Result<T> = std::result::Result<T, LcaStarError>;

/// Fatal conditions. Every one of these aborts the whole run.
#[derive(Error, Debug)]
pub enum LcaStarError {
    /// An input file could not be opened or read
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A table row has fewer tab-separated fields than its format requires
    #[error("'{path}' line {line}: expected at least {expected} fields, found {found}")]
    TooFewFields {
        path: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// The bitscore column of a hit row is not an integer
    #[error("'{path}' line {line}: score '{value}' is not an integer")]
    InvalidScore {
        path: String,
        line: usize,
        value: String,
    },

    /// A report row does not match its header
    #[error("'{path}' line {line}: expected {expected} columns, found {found}")]
    ColumnMismatch {
        path: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A contig has no entry in the per-contig reference table
    #[error("contig '{contig}' has no entry in the contig reference table")]
    MissingReference { contig: String },

    /// Unrecognised ORF summary strategy name
    #[error("unknown ORF summary method '{0}' (expected lca, besthit or orf_majority)")]
    InvalidOrfSummary(String),
}

impl LcaStarError {
    pub(crate) fn io(path: &str, source: std::io::Error) -> Self {
        LcaStarError::Io { path: path.to_string(), source }
    }
}
