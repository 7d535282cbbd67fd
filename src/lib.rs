//! nmea-relay: NMEA sentence relay
//!
//! Tails a file of NMEA 0183 sentences at a fixed cadence, keeps the
//! sentences of one kind (RMC by default) and broadcasts them to every
//! connected TCP client.
//!
//! # Example
//!
//! ```no_run
//! use nmea_relay::{NmeaParser, RelayConfig, RelayServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig::default()
//!         .bind("0.0.0.0:8888".parse()?)
//!         .source_path("output.nmea");
//!
//!     let server = RelayServer::bind(config, NmeaParser).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Components
//!
//! - [`source`]: rate-limited reader producing [`Record`]s
//! - [`registry`]: connection set with concurrent probe-and-write rounds
//! - [`server`]: TCP acceptor, shutdown coordination and the server that
//!   wires them together
//! - [`client`]: outbound mode pushing records to one remote endpoint

pub mod client;
pub mod error;
pub mod registry;
pub mod sentence;
pub mod server;
pub mod source;
pub mod stats;
pub mod transport;

pub use client::RecordSender;
pub use error::{Error, Result};
pub use registry::{BroadcastRegistry, Record, RegistryConfig, WriteFailurePolicy};
pub use sentence::{NmeaParser, ParsedSentence, SentenceParser};
pub use server::{RelayConfig, RelayServer};
pub use source::{ParseErrorPolicy, SourceConfig, SourceReader};
pub use transport::{StreamTransport, TcpTransport, Transport};
