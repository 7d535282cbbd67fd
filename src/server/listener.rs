//! Relay listener
//!
//! Handles the TCP accept loop and hands accepted connections to the
//! broadcast registry.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::registry::RegistryHandle;
use crate::transport::{StreamTransport, TcpTransport};

/// TCP acceptor feeding the broadcast registry
pub struct Acceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
    tcp_nodelay: bool,
}

impl Acceptor {
    /// Bind a listener on `addr`
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        Self::from_listener(listener)
    }

    /// Wrap an already bound listener
    pub fn from_listener(listener: TcpListener) -> Result<Self> {
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            tcp_nodelay: true,
        })
    }

    /// Enable or disable TCP_NODELAY on accepted sockets
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Get the bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until cancelled or the registry stops
    ///
    /// Each connection is registered from its own task so a full
    /// registration channel never stalls `accept()`. Returns the number of
    /// connections accepted.
    pub async fn run(
        self,
        registry: RegistryHandle<TcpTransport>,
        cancel: CancellationToken,
    ) -> u64 {
        tracing::info!(addr = %self.local_addr, "Relay listening");
        let mut accepted = 0u64;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.listener.accept() => result,
            };

            match result {
                Ok((socket, peer_addr)) => {
                    if registry.is_closed() {
                        tracing::info!("Registry stopped, closing listener");
                        break;
                    }
                    accepted += 1;
                    self.handle_connection(socket, peer_addr, &registry);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }

        tracing::info!(addr = %self.local_addr, accepted = accepted, "Listener stopped");
        accepted
    }

    fn handle_connection(
        &self,
        socket: TcpStream,
        peer_addr: SocketAddr,
        registry: &RegistryHandle<TcpTransport>,
    ) {
        tracing::debug!(peer = %peer_addr, "New connection");

        if self.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = registry
                .register(StreamTransport::new(socket), Some(peer_addr))
                .await
            {
                tracing::debug!(peer = %peer_addr, error = %e, "Connection not registered");
            }
        });
    }
}
