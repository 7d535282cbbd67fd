//! Source error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::sentence::ParseError;

/// Error type for reading the sentence source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source could not be opened
    #[error("failed to open source {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading a line failed
    #[error("failed to read source: {0}")]
    Read(#[from] io::Error),

    /// End of input reached
    #[error("source exhausted")]
    Exhausted,

    /// A line was rejected by the parser
    #[error("malformed sentence on line {line}: {source}")]
    Parse {
        line: u64,
        #[source]
        source: ParseError,
    },
}
