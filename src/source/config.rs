//! Source reader configuration

use std::path::PathBuf;
use std::time::Duration;

/// Default sentence kind forwarded by the relay
pub const DEFAULT_TARGET_KIND: &str = "RMC";

/// Default delay between records (1 second)
pub const DEFAULT_DELAY: Duration = Duration::from_micros(1_000_000);

/// What the reader does with a line the parser rejects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseErrorPolicy {
    /// Stop the reader and report the failure
    #[default]
    Stop,
    /// Log the line and keep reading
    Skip,
}

/// Source reader configuration options
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Path of the sentence file
    pub path: PathBuf,

    /// Delay between ticks; each tick emits at most one record
    pub delay: Duration,

    /// Reopen the source from the beginning when it is exhausted
    pub loop_forever: bool,

    /// Sentence kind to forward (e.g. "RMC")
    pub target_kind: String,

    /// Handling of malformed lines
    pub parse_error_policy: ParseErrorPolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./output.nmea"),
            delay: DEFAULT_DELAY,
            loop_forever: false,
            target_kind: DEFAULT_TARGET_KIND.to_string(),
            parse_error_policy: ParseErrorPolicy::Stop,
        }
    }
}

impl SourceConfig {
    /// Create a config reading from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the delay between ticks (minimum 1µs)
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay.max(Duration::from_micros(1));
        self
    }

    /// Set the delay between ticks in microseconds
    pub fn delay_micros(self, micros: u64) -> Self {
        self.delay(Duration::from_micros(micros))
    }

    /// Enable or disable looping over the source
    pub fn loop_forever(mut self, enabled: bool) -> Self {
        self.loop_forever = enabled;
        self
    }

    /// Set the sentence kind to forward
    pub fn target_kind(mut self, kind: impl Into<String>) -> Self {
        self.target_kind = kind.into();
        self
    }

    /// Set the parse error policy
    pub fn parse_error_policy(mut self, policy: ParseErrorPolicy) -> Self {
        self.parse_error_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SourceConfig::default();

        assert_eq!(config.path, PathBuf::from("./output.nmea"));
        assert_eq!(config.delay, Duration::from_secs(1));
        assert!(!config.loop_forever);
        assert_eq!(config.target_kind, "RMC");
        assert_eq!(config.parse_error_policy, ParseErrorPolicy::Stop);
    }

    #[test]
    fn test_builder_delay_micros() {
        let config = SourceConfig::new("track.nmea").delay_micros(250);

        assert_eq!(config.path, PathBuf::from("track.nmea"));
        assert_eq!(config.delay, Duration::from_micros(250));
    }

    #[test]
    fn test_builder_delay_clamped() {
        let config = SourceConfig::default().delay_micros(0);

        assert_eq!(config.delay, Duration::from_micros(1));
    }

    #[test]
    fn test_builder_chaining() {
        let config = SourceConfig::new("a.nmea")
            .loop_forever(true)
            .target_kind("GGA")
            .parse_error_policy(ParseErrorPolicy::Skip);

        assert!(config.loop_forever);
        assert_eq!(config.target_kind, "GGA");
        assert_eq!(config.parse_error_policy, ParseErrorPolicy::Skip);
    }
}
