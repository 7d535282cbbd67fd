//! Broadcast registry implementation
//!
//! The registry owns every registered connection. It is driven by a single
//! coordinating task ([`BroadcastRegistry::run`]) that reads registrations,
//! records and the cancellation token, so the connection set is only ever
//! mutated from one place.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::stats::RegistryStats;
use crate::transport::Transport;

use super::config::{RegistryConfig, WriteFailurePolicy};
use super::connection::{probe_and_write, Connection, ConnectionId, DeliveryOutcome};
use super::error::RegistryError;
use super::record::Record;

/// A connection waiting to be added to the set
struct Registration<T> {
    transport: T,
    peer: Option<SocketAddr>,
}

/// Cloneable handle used by the acceptor to hand connections to the registry
pub struct RegistryHandle<T> {
    registrations: mpsc::Sender<Registration<T>>,
}

impl<T> Clone for RegistryHandle<T> {
    fn clone(&self) -> Self {
        Self {
            registrations: self.registrations.clone(),
        }
    }
}

impl<T: Transport> RegistryHandle<T> {
    /// Queue a connection for registration
    ///
    /// Waits for channel capacity, not for the coordinator to process it.
    pub async fn register(
        &self,
        transport: T,
        peer: Option<SocketAddr>,
    ) -> Result<(), RegistryError> {
        self.registrations
            .send(Registration { transport, peer })
            .await
            .map_err(|_| RegistryError::Closed)
    }

    /// Check whether the coordinator has stopped
    pub fn is_closed(&self) -> bool {
        self.registrations.is_closed()
    }
}

/// Receiving side of the registry channels, consumed by [`BroadcastRegistry::run`]
pub struct RegistryInputs<T> {
    registrations: mpsc::Receiver<Registration<T>>,
    records: mpsc::Receiver<Record>,
}

/// Create the registration handle, the record sender and the coordinator inputs
pub fn channel<T: Transport>(
    config: &RegistryConfig,
) -> (RegistryHandle<T>, mpsc::Sender<Record>, RegistryInputs<T>) {
    let (reg_tx, reg_rx) = mpsc::channel(config.register_capacity.max(1));
    let (rec_tx, rec_rx) = mpsc::channel(config.record_capacity.max(1));

    (
        RegistryHandle {
            registrations: reg_tx,
        },
        rec_tx,
        RegistryInputs {
            registrations: reg_rx,
            records: rec_rx,
        },
    )
}

/// Per-round delivery summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Connections the record was written to
    pub delivered: Vec<ConnectionId>,
    /// Connections whose write failed
    pub write_failed: Vec<ConnectionId>,
    /// Connections marked for removal at the sweep
    pub evicted: Vec<ConnectionId>,
    /// Per-connection tasks that panicked; their connections are gone
    pub lost: usize,
}

impl RoundReport {
    /// Number of connections the round touched
    pub fn snapshot_size(&self) -> usize {
        let probe_failed = self
            .evicted
            .iter()
            .filter(|id| !self.write_failed.contains(id))
            .count();
        self.delivered.len() + self.write_failed.len() + probe_failed + self.lost
    }
}

/// Why the coordinating loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shared cancellation token fired
    Cancelled,
    /// Every registration handle and the record sender were dropped
    InputsClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::InputsClosed => write!(f, "inputs closed"),
        }
    }
}

/// Final state reported by the coordinator
#[derive(Debug, Clone)]
pub struct RegistryExit {
    pub reason: StopReason,
    pub stats: RegistryStats,
}

/// Live connection set with fan-out delivery
pub struct BroadcastRegistry<T> {
    /// Registered connections keyed by id
    connections: HashMap<ConnectionId, Connection<T>>,

    /// Next id to hand out
    next_id: u64,

    /// Configuration
    config: RegistryConfig,

    /// Cumulative counters
    stats: RegistryStats,
}

impl<T: Transport> BroadcastRegistry<T> {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 1,
            config,
            stats: RegistryStats::new(),
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get cumulative statistics
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Check whether a connection is registered
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Add a connection to the set
    ///
    /// Every call yields a fresh id; there is no deduplication by peer.
    pub fn register(&mut self, transport: T, peer: Option<SocketAddr>) -> ConnectionId {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        self.connections
            .insert(id, Connection::new(id, transport, peer));
        self.stats.connections_registered += 1;

        tracing::info!(
            connection_id = %id,
            peer = ?peer,
            connections = self.connections.len(),
            "Connection registered"
        );

        id
    }

    /// Deliver a record to every connection registered at round start
    ///
    /// Each connection is probed and written in its own task; the round
    /// returns once all of them have joined. Connections are put back in the
    /// set afterwards; removal of the ones marked for eviction is left to
    /// [`sweep`](Self::sweep).
    pub async fn broadcast(&mut self, record: Record) -> RoundReport {
        let mut report = RoundReport::default();
        self.stats.rounds += 1;

        if self.connections.is_empty() {
            tracing::trace!(kind = %record.kind, "No connections, record dropped");
            return report;
        }

        let probe_timeout = self.config.probe_timeout;
        let mut round = JoinSet::new();

        for (_, mut conn) in self.connections.drain() {
            let record = record.clone();
            round.spawn(async move {
                let outcome = probe_and_write(&mut conn, &record, probe_timeout).await;
                (conn, outcome)
            });
        }

        while let Some(joined) = round.join_next().await {
            let (conn, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "Delivery task failed, connection dropped");
                    report.lost += 1;
                    continue;
                }
            };

            match outcome {
                DeliveryOutcome::Delivered => {
                    self.stats.deliveries += 1;
                    self.stats.bytes_sent += record.len() as u64;
                    report.delivered.push(conn.id);
                }
                DeliveryOutcome::ProbeFailed => {
                    self.stats.probe_failures += 1;
                    report.evicted.push(conn.id);
                }
                DeliveryOutcome::WriteFailed => {
                    self.stats.write_failures += 1;
                    report.write_failed.push(conn.id);
                    if self.config.write_failure_policy == WriteFailurePolicy::Evict {
                        report.evicted.push(conn.id);
                    }
                }
            }

            self.connections.insert(conn.id, conn);
        }

        self.stats.connections_evicted += report.lost as u64;

        tracing::trace!(
            kind = %record.kind,
            snapshot = report.snapshot_size(),
            delivered = report.delivered.len(),
            write_failed = report.write_failed.len(),
            evicted = report.evicted.len(),
            "Broadcast round complete"
        );

        report
    }

    /// Remove and close every connection marked for eviction in `report`
    ///
    /// Returns the number of connections removed.
    pub async fn sweep(&mut self, report: &RoundReport) -> usize {
        let mut removed = 0;

        for id in &report.evicted {
            if let Some(mut conn) = self.connections.remove(id) {
                conn.close().await;
                removed += 1;

                tracing::info!(
                    connection_id = %id,
                    peer = ?conn.peer,
                    delivered = conn.records_delivered,
                    connections = self.connections.len(),
                    "Connection evicted"
                );
            }
        }

        self.stats.connections_evicted += removed as u64;
        removed
    }

    /// Close and drop every remaining connection
    pub async fn close_all(&mut self) -> usize {
        let count = self.connections.len();

        for (_, mut conn) in self.connections.drain() {
            conn.close().await;
        }

        self.stats.connections_closed_at_shutdown += count as u64;
        count
    }

    /// Run the coordinating loop until cancelled or out of inputs
    ///
    /// A record that arrives while cancellation is pending is not broadcast.
    /// A round that is already running always completes before the loop
    /// checks for cancellation again.
    pub async fn run(
        mut self,
        inputs: RegistryInputs<T>,
        cancel: CancellationToken,
    ) -> RegistryExit {
        let RegistryInputs {
            mut registrations,
            mut records,
        } = inputs;
        let mut registrations_open = true;
        let mut records_open = true;

        let reason = loop {
            if !registrations_open && !records_open {
                break StopReason::InputsClosed;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break StopReason::Cancelled,

                registration = registrations.recv(), if registrations_open => match registration {
                    Some(Registration { transport, peer }) => {
                        self.register(transport, peer);
                    }
                    None => registrations_open = false,
                },

                record = records.recv(), if records_open => match record {
                    Some(record) => {
                        let report = self.broadcast(record).await;
                        self.sweep(&report).await;
                    }
                    None => {
                        tracing::info!("Record source closed");
                        records_open = false;
                    }
                },
            }
        };

        let closed = self.close_all().await;
        tracing::info!(
            reason = %reason,
            closed = closed,
            rounds = self.stats.rounds,
            deliveries = self.stats.deliveries,
            "Broadcast registry stopped"
        );

        RegistryExit {
            reason,
            stats: self.stats,
        }
    }
}

impl<T: Transport> Default for BroadcastRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
