//! Relay server
//!
//! Wires the acceptor, the source reader and the broadcast registry
//! together around one shared cancellation token.

use std::future::Future;
use std::net::SocketAddr;

use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::registry::{self, BroadcastRegistry, RegistryExit};
use crate::sentence::SentenceParser;
use crate::source::{LineSource, ReaderReport, SourceError, SourceReader};
use crate::transport::TcpTransport;

use super::config::RelayConfig;
use super::listener::Acceptor;
use super::shutdown::{force_exit, wait_for_signal, ShutdownCoordinator, ShutdownOutcome};

/// What each component reported after a graceful shutdown
#[derive(Debug)]
pub struct RelaySummary {
    /// Reader result, including a failure that ended it early
    pub reader: std::result::Result<ReaderReport, SourceError>,
    pub registry: RegistryExit,
    /// Connections accepted over the server's lifetime
    pub accepted: u64,
}

/// NMEA relay server
///
/// # Example
/// ```no_run
/// use nmea_relay::sentence::NmeaParser;
/// use nmea_relay::server::{RelayConfig, RelayServer};
///
/// # async fn example() -> nmea_relay::error::Result<()> {
/// let config = RelayConfig::default().source_path("track.nmea");
/// let server = RelayServer::bind(config, NmeaParser).await?;
/// server.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct RelayServer<P> {
    config: RelayConfig,
    parser: P,
    source: LineSource,
    acceptor: Acceptor,
    registry: BroadcastRegistry<TcpTransport>,
    coordinator: ShutdownCoordinator,
}

impl<P: SentenceParser> RelayServer<P> {
    /// Open the source and bind the listener
    pub async fn bind(config: RelayConfig, parser: P) -> Result<Self> {
        let source = LineSource::open(&config.source.path).await?;
        let acceptor = Acceptor::bind(config.bind_addr)
            .await?
            .tcp_nodelay(config.tcp_nodelay);
        let registry = BroadcastRegistry::with_config(config.registry.clone());
        let coordinator = ShutdownCoordinator::new(config.shutdown_grace);

        Ok(Self {
            config,
            parser,
            source,
            acceptor,
            registry,
            coordinator,
        })
    }

    /// Get the server configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.acceptor.local_addr()
    }

    /// Get the registry that will be driven by [`run`](Self::run)
    pub fn registry(&self) -> &BroadcastRegistry<TcpTransport> {
        &self.registry
    }

    /// Token shared by every component; cancelling it starts shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.coordinator.token()
    }

    /// Serve until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<RelaySummary> {
        self.run_until(async {
            if let Err(e) = wait_for_signal().await {
                tracing::error!(error = %e, "Failed to listen for interrupt signals");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves or the shared token is cancelled
    ///
    /// Exits the process if the components do not stop within the grace
    /// period.
    pub async fn run_until<F>(self, shutdown: F) -> Result<RelaySummary>
    where
        F: Future<Output = ()>,
    {
        let token = self.coordinator.token();
        let local_addr = self.acceptor.local_addr();
        let (handle, records, inputs) = registry::channel(self.registry.config());

        let registry_task = tokio::spawn(self.registry.run(inputs, token.clone()));
        let reader = SourceReader::new(self.config.source.clone(), self.parser);
        let mut reader_task =
            tokio::spawn(reader.run_with_source(self.source, records, token.clone()));
        let acceptor_task = tokio::spawn(self.acceptor.run(handle, token.clone()));

        tracing::info!(
            addr = %local_addr,
            path = %self.config.source.path.display(),
            "Relay server started"
        );

        tokio::pin!(shutdown);

        let reader_done = tokio::select! {
            _ = &mut shutdown => None,
            _ = token.cancelled() => None,
            joined = &mut reader_task => Some(joined),
        };

        if let Some(joined) = &reader_done {
            log_reader_end(joined);
            tokio::select! {
                _ = &mut shutdown => {}
                _ = token.cancelled() => {}
            }
        }

        let completion = async move {
            let reader = match reader_done {
                Some(joined) => joined,
                None => reader_task.await,
            };
            (reader, registry_task.await, acceptor_task.await)
        };

        match self.coordinator.drain(completion).await {
            ShutdownOutcome::Graceful((reader, registry, accepted)) => {
                let summary = RelaySummary {
                    reader: reader?,
                    registry: registry?,
                    accepted: accepted?,
                };
                tracing::info!(
                    accepted = summary.accepted,
                    rounds = summary.registry.stats.rounds,
                    deliveries = summary.registry.stats.deliveries,
                    "Relay server stopped"
                );
                Ok(summary)
            }
            ShutdownOutcome::TimedOut => force_exit(),
        }
    }
}

fn log_reader_end(
    joined: &std::result::Result<std::result::Result<ReaderReport, SourceError>, JoinError>,
) {
    match joined {
        Ok(Ok(report)) => tracing::info!(
            exit = %report.exit,
            records = report.stats.records_emitted,
            "Source finished, still accepting connections"
        ),
        Ok(Err(e)) => tracing::error!(
            error = %e,
            "Source failed, still accepting connections"
        ),
        Err(e) => tracing::error!(error = %e, "Source reader task failed"),
    }
}
