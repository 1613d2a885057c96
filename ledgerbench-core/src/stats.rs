use crate::ResourceStats;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSecondsWithFrac, DurationSecondsWithFrac};
use std::time::Duration;

/// Aggregate statistics of a finished run.
///
/// Latency figures only cover successful samples with a measured latency; counts, error rate and
/// throughput cover every sample.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_requests: usize,
    pub successful_requests: usize,
    /// Percentage in `[0, 100]`.
    pub error_rate: f64,
    /// Requests per second.
    pub throughput: f64,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    #[serde(rename = "duration_sec")]
    pub duration: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    #[serde(rename = "p50_latency_ms")]
    pub latency_p50: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    #[serde(rename = "p90_latency_ms")]
    pub latency_p90: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    #[serde(rename = "p99_latency_ms")]
    pub latency_p99: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    #[serde(rename = "avg_latency_ms")]
    pub latency_avg: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    #[serde(rename = "min_latency_ms")]
    pub latency_min: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    #[serde(rename = "max_latency_ms")]
    pub latency_max: Duration,
    pub resources: Option<ResourceStats>,
}

impl RunStatistics {
    pub fn failed_requests(&self) -> usize {
        self.total_requests.saturating_sub(self.successful_requests)
    }
}
