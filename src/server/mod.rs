//! Relay server implementation
//!
//! Provides the TCP side of the relay:
//! - Accepting clients and registering them with the broadcast registry
//! - Running the source reader against the same registry
//! - Coordinated shutdown with a bounded grace period

pub mod config;
pub mod listener;
pub mod relay;
pub mod shutdown;

pub use config::{parse_addr, RelayConfig, DEFAULT_PORT, DEFAULT_SHUTDOWN_GRACE};
pub use listener::Acceptor;
pub use relay::{RelayServer, RelaySummary};
pub use shutdown::{force_exit, wait_for_signal, ShutdownCoordinator, ShutdownOutcome};
