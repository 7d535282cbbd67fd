//! Sentence source
//!
//! Reads a sentence file at a fixed cadence and turns matching lines into
//! [`Record`](crate::registry::Record)s for the broadcast registry.

pub mod config;
pub mod error;
pub mod lines;
pub mod reader;

pub use config::{ParseErrorPolicy, SourceConfig, DEFAULT_DELAY, DEFAULT_TARGET_KIND};
pub use error::SourceError;
pub use lines::LineSource;
pub use reader::{ReaderExit, ReaderReport, SourceReader};
