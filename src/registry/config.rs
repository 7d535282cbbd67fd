//! Registry configuration

use std::time::Duration;

/// What a broadcast round does with a connection whose write failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy {
    /// Log the failure and keep the connection; a dead peer is caught by the
    /// next round's liveness probe
    #[default]
    Retain,
    /// Evict the connection in the same round's sweep
    Evict,
}

/// Broadcast registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Upper bound on the liveness probe read
    pub probe_timeout: Duration,

    /// Handling of write failures
    pub write_failure_policy: WriteFailurePolicy,

    /// Capacity of the connection registration channel
    pub register_capacity: usize,

    /// Capacity of the record channel
    pub record_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(10),
            write_failure_policy: WriteFailurePolicy::Retain,
            register_capacity: 64,
            // One record in flight between reader and coordinator
            record_capacity: 1,
        }
    }
}

impl RegistryConfig {
    /// Set the liveness probe timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the write failure policy
    pub fn write_failure_policy(mut self, policy: WriteFailurePolicy) -> Self {
        self.write_failure_policy = policy;
        self
    }

    /// Set the registration channel capacity (minimum 1)
    pub fn register_capacity(mut self, capacity: usize) -> Self {
        self.register_capacity = capacity.max(1);
        self
    }

    /// Set the record channel capacity (minimum 1)
    pub fn record_capacity(mut self, capacity: usize) -> Self {
        self.record_capacity = capacity.max(1);
        self
    }
}
