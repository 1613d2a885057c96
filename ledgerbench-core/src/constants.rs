use std::time::Duration;

/// Interval between two resource readings of the monitored process.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on how long stopping the resource monitor may wait for its task.
pub const MONITOR_STOP_TIMEOUT: Duration = Duration::from_secs(1);

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Rows per INSERT statement when persisting samples.
pub const SAMPLE_INSERT_CHUNK: usize = 1_000;
