//! Record sender
//!
//! Dials a single remote endpoint and pushes the filtered record stream to
//! it. This is the relay's outbound mode: the same reader as the server, but
//! one connection instead of a registry.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::sentence::SentenceParser;
use crate::source::{ReaderReport, SourceConfig, SourceReader};
use crate::transport::{StreamTransport, Transport};

/// Events from the record sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendEvent {
    /// Connected to the remote endpoint
    Connected(SocketAddr),

    /// Writing to the remote failed
    Error(String),

    /// Connection closed
    Disconnected,
}

/// Final state of a sender that stopped without error
#[derive(Debug, Clone)]
pub struct SendSummary {
    pub reader: ReaderReport,
    pub records_sent: u64,
    pub bytes_sent: u64,
}

/// Pushes records from a sentence source to one remote endpoint
///
/// # Example
/// ```no_run
/// use nmea_relay::client::RecordSender;
/// use nmea_relay::sentence::NmeaParser;
/// use nmea_relay::source::SourceConfig;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> nmea_relay::error::Result<()> {
/// let remote = "127.0.0.1:8888".parse().unwrap();
/// let source = SourceConfig::new("track.nmea");
/// let (sender, mut events) = RecordSender::new(remote, source, NmeaParser);
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// sender.run(CancellationToken::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct RecordSender<P> {
    remote: SocketAddr,
    source: SourceConfig,
    parser: P,
    event_tx: mpsc::Sender<SendEvent>,
}

impl<P: SentenceParser> RecordSender<P> {
    /// Create a new sender.
    ///
    /// Returns the sender and a receiver for events.
    pub fn new(
        remote: SocketAddr,
        source: SourceConfig,
        parser: P,
    ) -> (Self, mpsc::Receiver<SendEvent>) {
        let (tx, rx) = mpsc::channel(16);

        let sender = Self {
            remote,
            source,
            parser,
            event_tx: tx,
        };

        (sender, rx)
    }

    /// Get the remote address
    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    /// Connect and send until the source ends, `cancel` fires, or a write
    /// fails.
    pub async fn run(self, cancel: CancellationToken) -> Result<SendSummary> {
        let stream = TcpStream::connect(self.remote)
            .await
            .map_err(|source| Error::Connect {
                addr: self.remote,
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(remote = %self.remote, error = %e, "Failed to set TCP_NODELAY");
        }

        tracing::info!(remote = %self.remote, "Connected");
        let _ = self.event_tx.try_send(SendEvent::Connected(self.remote));

        let mut transport = StreamTransport::new(stream);
        let (records_tx, mut records) = mpsc::channel(1);
        let reader_cancel = cancel.child_token();
        let reader = SourceReader::new(self.source, self.parser);
        let reader_task = tokio::spawn(reader.run(records_tx, reader_cancel.clone()));

        let mut records_sent = 0u64;
        let mut bytes_sent = 0u64;

        let written = loop {
            let Some(record) = records.recv().await else {
                break Ok(());
            };
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(remote = %self.remote, "Cancelled, abandoning pending write");
                    break Ok(());
                }
                result = transport.write(&record.data) => result,
            };
            if let Err(e) = result {
                break Err(e);
            }
            records_sent += 1;
            bytes_sent += record.len() as u64;
            tracing::debug!(record = record.canonical(), "Record sent");
        };

        if let Err(e) = written {
            tracing::error!(
                remote = %self.remote,
                error = %e,
                sent = records_sent,
                "Write failed"
            );
            let _ = self.event_tx.try_send(SendEvent::Error(e.to_string()));
            reader_cancel.cancel();
            drop(records);
            let _ = reader_task.await;
            let _ = transport.close().await;
            let _ = self.event_tx.try_send(SendEvent::Disconnected);
            return Err(Error::Io(e));
        }

        let report = reader_task.await??;
        if let Err(e) = transport.close().await {
            tracing::debug!(remote = %self.remote, error = %e, "Shutdown failed");
        }
        let _ = self.event_tx.try_send(SendEvent::Disconnected);

        tracing::info!(
            remote = %self.remote,
            exit = %report.exit,
            sent = records_sent,
            "Sender stopped"
        );

        Ok(SendSummary {
            reader: report,
            records_sent,
            bytes_sent,
        })
    }
}
