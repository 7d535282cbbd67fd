//! Registry error types

use thiserror::Error;

/// Error type for registry handle operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The coordinating task has stopped and no longer accepts input
    #[error("registry coordinator is closed")]
    Closed,
}
