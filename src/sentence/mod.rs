//! Sentence parsing service
//!
//! The relay only needs two things from a line: the sentence kind, used to
//! pick which records to forward, and a canonical re-serialization, which is
//! what goes on the wire. [`SentenceParser`] is that seam; [`NmeaParser`] is
//! the NMEA 0183 implementation used by the binary.

pub mod error;
pub mod nmea;

pub use error::ParseError;
pub use nmea::Sentence;

/// Result of a successful parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSentence {
    /// Sentence kind (e.g. `RMC`)
    pub kind: String,
    /// Canonical text form, without line terminator
    pub canonical: String,
}

/// Parses one input line into a kind and canonical string
pub trait SentenceParser: Send + Sync + 'static {
    fn parse(&self, line: &str) -> Result<ParsedSentence, ParseError>;
}

/// NMEA 0183 envelope parser
#[derive(Debug, Clone, Copy, Default)]
pub struct NmeaParser;

impl SentenceParser for NmeaParser {
    fn parse(&self, line: &str) -> Result<ParsedSentence, ParseError> {
        let sentence = Sentence::parse(line)?;
        Ok(ParsedSentence {
            canonical: sentence.to_string(),
            kind: sentence.kind,
        })
    }
}
