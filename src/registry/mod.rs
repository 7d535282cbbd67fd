//! Broadcast registry for fan-out delivery
//!
//! The registry owns the set of live client connections and delivers every
//! record to all of them. A single coordinating task owns the set; the
//! acceptor and the source reader only talk to it through channels.
//!
//! # Architecture
//!
//! ```text
//!   [Acceptor]                [Source Reader]            [CancellationToken]
//!   handle.register()         records.send()             cancel.cancelled()
//!        │                          │                            │
//!        └──────────────┬───────────┴────────────────────────────┘
//!                       ▼
//!             BroadcastRegistry::run  (single task)
//!             ┌───────────────────────────────────┐
//!             │ connections: HashMap<Id, Conn>    │
//!             └────────────────┬──────────────────┘
//!                              │ broadcast(record)
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!    probe_and_write     probe_and_write     probe_and_write   (JoinSet)
//!          │                   │                   │
//!          └───────────── join ┴───────────────────┘
//!                              │
//!                        sweep(report)
//! ```
//!
//! # Rounds
//!
//! A round snapshots the set by moving every connection into its own task,
//! then puts them back once all tasks have joined. Connections registered
//! while a round is running wait in the registration channel and only join
//! the next round. Evictions decided by a round are applied by `sweep`
//! before the coordinator reads its next input.
//!
//! `bytes::Bytes` is reference counted, so every task in a round shares the
//! record's payload instead of copying it.

pub mod config;
pub mod connection;
pub mod error;
pub mod record;
pub mod store;

pub use config::{RegistryConfig, WriteFailurePolicy};
pub use connection::{probe_and_write, Connection, ConnectionId, DeliveryOutcome};
pub use error::RegistryError;
pub use record::Record;
pub use store::{
    channel, BroadcastRegistry, RegistryExit, RegistryHandle, RegistryInputs, RoundReport,
    StopReason,
};
