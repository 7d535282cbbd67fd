//! Outbound relay client
//!
//! Pushes the record stream to a single remote endpoint instead of serving
//! it to many.

pub mod sender;

pub use sender::{RecordSender, SendEvent, SendSummary};
