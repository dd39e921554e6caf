//! Configuration for the processor module.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool sizes and event delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Concurrent segmenting runs, shared by every batch.
    #[serde(default = "default_max_batch")]
    pub max_parallel_batch: usize,

    /// Concurrent re-encodes in the repair pipeline.
    #[serde(default = "default_max_repair")]
    pub max_parallel_repair: usize,

    /// Concurrent title scans during catalog reconciliation.
    #[serde(default = "default_max_scans")]
    pub max_parallel_scans: usize,

    /// Progress events buffered per run before new ones are dropped.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Idle time after which a long-lived stream emits a heartbeat.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

fn default_max_batch() -> usize {
    5
}

fn default_max_repair() -> usize {
    4
}

fn default_max_scans() -> usize {
    16
}

fn default_event_buffer() -> usize {
    256
}

fn default_heartbeat_interval() -> u64 {
    30
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_parallel_batch: default_max_batch(),
            max_parallel_repair: default_max_repair(),
            max_parallel_scans: default_max_scans(),
            event_buffer: default_event_buffer(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl ProcessorConfig {
    /// Sets the batch pool size.
    pub fn with_max_batch(mut self, max: usize) -> Self {
        self.max_parallel_batch = max;
        self
    }

    /// Sets the repair pool size.
    pub fn with_max_repair(mut self, max: usize) -> Self {
        self.max_parallel_repair = max;
        self
    }

    pub fn with_event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size;
        self
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}
