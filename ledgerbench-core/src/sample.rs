use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSecondsWithFrac};
use std::time::Duration;
use time::OffsetDateTime;

/// Outcome of a single unit of work: one unary call or one received event.
///
/// A successful Sample with a zero latency is the "unmeasured" sentinel used for the first event
/// of a stream, which has no predecessor to diff against. Such samples count towards throughput
/// and error rate but never towards latency statistics.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "latency_ms")]
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub latency: Duration,
    pub success: bool,
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Sample {
    pub fn success(latency: Duration) -> Self {
        Self {
            latency,
            success: true,
            error: None,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn failure(latency: Duration, error: impl ToString) -> Self {
        Self {
            latency,
            success: false,
            error: Some(error.to_string()),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn unmeasured() -> Self {
        Self::success(Duration::ZERO)
    }

    /// Whether this sample contributes to latency statistics.
    pub fn has_latency(&self) -> bool {
        self.success && !self.latency.is_zero()
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1_000.
    }
}

/// Aggregated host resource usage over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub cpu_avg_percent: f64,
    pub memory_avg_mb: f64,
    pub memory_peak_mb: f64,
    pub sample_count: usize,
}
