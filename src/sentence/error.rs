//! Sentence parse error types

use thiserror::Error;

/// Error returned when a line is not a well-formed sentence
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line is not valid UTF-8
    #[error("sentence is not valid UTF-8")]
    InvalidUtf8,

    /// Line was empty after trimming
    #[error("empty sentence")]
    Empty,

    /// Line does not start with `$` or `!`
    #[error("sentence does not start with '$' or '!'")]
    MissingStartDelimiter,

    /// No `*` checksum separator
    #[error("sentence has no checksum")]
    MissingChecksum,

    /// Checksum is not exactly two hex digits
    #[error("invalid checksum field: {0:?}")]
    InvalidChecksum(String),

    /// Checksum does not match the sentence body
    #[error("checksum mismatch: computed {computed:02X}, found {found:02X}")]
    ChecksumMismatch { computed: u8, found: u8 },

    /// Address field is empty or not alphanumeric
    #[error("invalid address field: {0:?}")]
    InvalidAddress(String),
}
