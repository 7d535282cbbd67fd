//! Relay server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::registry::RegistryConfig;
use crate::source::SourceConfig;

/// Port used when an address is given without one
pub const DEFAULT_PORT: u16 = 8888;

/// Default grace period between cancellation and forced exit
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Relay server configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Source reader options
    pub source: SourceConfig,

    /// Broadcast registry options
    pub registry: RegistryConfig,

    /// Time allowed for components to stop after cancellation
    pub shutdown_grace: Duration,

    /// Enable TCP_NODELAY on accepted connections
    pub tcp_nodelay: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            source: SourceConfig::default(),
            registry: RegistryConfig::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            tcp_nodelay: true,
        }
    }
}

impl RelayConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the source file path
    pub fn source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source.path = path.into();
        self
    }

    /// Replace the source options
    pub fn source(mut self, source: SourceConfig) -> Self {
        self.source = source;
        self
    }

    /// Replace the registry options
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}

/// Parse a socket address from a command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:8888
/// - "localhost:9000" -> 127.0.0.1:9000
/// - "10.0.0.5" -> 10.0.0.5:8888
/// - "0.0.0.0:9000" -> 0.0.0.0:9000
pub fn parse_addr(arg: &str) -> Result<SocketAddr> {
    let normalized = arg.trim().replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(Error::InvalidAddress(format!(
        "'{}', expected IP:PORT, IP or 'localhost'",
        arg
    )))
}
