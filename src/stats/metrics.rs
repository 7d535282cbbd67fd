//! Statistics for the relay components

use std::time::{Duration, Instant};

/// Broadcast registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Connections ever registered
    pub connections_registered: u64,
    /// Connections removed by a sweep
    pub connections_evicted: u64,
    /// Connections closed by the shutdown sweep
    pub connections_closed_at_shutdown: u64,
    /// Broadcast rounds run
    pub rounds: u64,
    /// Successful per-connection writes
    pub deliveries: u64,
    /// Probes that found the peer closed
    pub probe_failures: u64,
    /// Writes that returned an error
    pub write_failures: u64,
    /// Total payload bytes written
    pub bytes_sent: u64,
}

impl RegistryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connections currently registered according to the counters
    pub fn active_connections(&self) -> u64 {
        self.connections_registered
            .saturating_sub(self.connections_evicted)
            .saturating_sub(self.connections_closed_at_shutdown)
    }
}

/// Source reader statistics
#[derive(Debug, Clone)]
pub struct ReaderStats {
    /// When the reader started
    pub started_at: Instant,
    /// Lines pulled from the source
    pub lines_read: u64,
    /// Records handed to the registry
    pub records_emitted: u64,
    /// Lines consumed without producing a record (other kinds, blanks, malformed)
    pub lines_skipped: u64,
    /// Malformed lines seen
    pub parse_failures: u64,
    /// Completed passes over the source
    pub passes: u64,
}

impl ReaderStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            lines_read: 0,
            records_emitted: 0,
            lines_skipped: 0,
            parse_failures: 0,
            passes: 0,
        }
    }

    /// Time since the reader started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Records emitted per second
    pub fn record_rate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.records_emitted as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for ReaderStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_stats_new() {
        let stats = RegistryStats::new();
        assert_eq!(stats.connections_registered, 0);
        assert_eq!(stats.deliveries, 0);
        assert_eq!(stats.active_connections(), 0);
    }

    #[test]
    fn test_registry_active_connections() {
        let stats = RegistryStats {
            connections_registered: 5,
            connections_evicted: 2,
            connections_closed_at_shutdown: 1,
            ..RegistryStats::default()
        };

        assert_eq!(stats.active_connections(), 2);
    }

    #[test]
    fn test_reader_stats_new() {
        let stats = ReaderStats::new();
        assert_eq!(stats.lines_read, 0);
        assert_eq!(stats.records_emitted, 0);
        assert_eq!(stats.passes, 0);
    }

    #[test]
    fn test_reader_record_rate_non_negative() {
        let mut stats = ReaderStats::new();
        stats.records_emitted = 10;

        assert!(stats.record_rate() >= 0.0);
    }
}
