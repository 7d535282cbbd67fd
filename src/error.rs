//! Crate error types

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::registry::RegistryError;
use crate::source::SourceError;

/// Top-level error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Listener could not bind
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Outbound connection failed
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Address string could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Source reader error
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Registry error
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A component task panicked or was aborted
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
