//! Relay statistics

pub mod metrics;

pub use metrics::{ReaderStats, RegistryStats};
