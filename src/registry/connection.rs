//! Registered connection and per-connection delivery
//!
//! This module defines the per-connection state stored in the registry and
//! the probe-then-write step run for each connection in a broadcast round.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::transport::{ReadOutcome, Transport};

use super::record::Record;

/// Registry-assigned connection identity
///
/// Ids are never reused, so a client reconnecting from the same endpoint
/// is a distinct entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Result of delivering one record to one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Probe passed and the record was written
    Delivered,
    /// Probe saw the peer closed; the write was skipped
    ProbeFailed,
    /// Probe passed but the write returned an error
    WriteFailed,
}

/// A connection owned by the registry
#[derive(Debug)]
pub struct Connection<T> {
    /// Unique id
    pub id: ConnectionId,

    /// Remote peer address, when the transport has one
    pub peer: Option<SocketAddr>,

    /// When the connection was registered
    pub registered_at: Instant,

    /// Records successfully written to this connection
    pub records_delivered: u64,

    pub(super) transport: T,
}

impl<T: Transport> Connection<T> {
    pub(super) fn new(id: ConnectionId, transport: T, peer: Option<SocketAddr>) -> Self {
        Self {
            id,
            peer,
            registered_at: Instant::now(),
            records_delivered: 0,
            transport,
        }
    }

    /// Close the underlying transport, logging instead of failing
    pub(super) async fn close(&mut self) {
        if let Err(e) = self.transport.close().await {
            tracing::debug!(connection_id = %self.id, error = %e, "Close failed");
        }
    }
}

/// Probe a connection for liveness and, if it is alive, write the record
///
/// The probe is a single-byte read bounded by `probe_timeout`. Bytes the
/// client happens to send are discarded.
pub async fn probe_and_write<T: Transport>(
    conn: &mut Connection<T>,
    record: &Record,
    probe_timeout: Duration,
) -> DeliveryOutcome {
    let mut probe_buf = [0u8; 1];

    match conn
        .transport
        .read_with_deadline(&mut probe_buf, probe_timeout)
        .await
    {
        Ok(ReadOutcome::Eof) => {
            tracing::debug!(connection_id = %conn.id, "Peer closed connection");
            return DeliveryOutcome::ProbeFailed;
        }
        Ok(ReadOutcome::TimedOut) | Ok(ReadOutcome::Data(_)) => {}
        Err(e) if is_closed(&e) => {
            tracing::debug!(connection_id = %conn.id, error = %e, "Peer connection lost");
            return DeliveryOutcome::ProbeFailed;
        }
        Err(e) => {
            tracing::warn!(connection_id = %conn.id, error = %e, "Liveness probe error");
        }
    }

    match conn.transport.write(&record.data).await {
        Ok(()) => {
            conn.records_delivered += 1;
            DeliveryOutcome::Delivered
        }
        Err(e) => {
            tracing::warn!(connection_id = %conn.id, error = %e, "Write failed");
            DeliveryOutcome::WriteFailed
        }
    }
}

fn is_closed(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
    )
}
