use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// A batch is flushed once it holds this many requests...
    pub batch_size: usize,
    /// ...or this long after its first request arrived.
    pub batch_window_ms: u64,
    pub max_concurrent_writes: usize,
    pub queue_capacity: usize,
    pub shutdown_timeout_ms: u64,
    /// Attempts per document write, including the first.
    pub write_attempts: u32,
    /// Delay before the first retry. Doubles on every further attempt.
    pub retry_backoff_ms: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_window_ms: 2000,
            max_concurrent_writes: 16,
            queue_capacity: 1000,
            shutdown_timeout_ms: 5000,
            write_attempts: 3,
            retry_backoff_ms: 100,
        }
    }
}

impl PersistenceConfig {
    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch_window_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}
