use crate::{Protocol, ResourceStats, RunStatistics, Sample, Scenario, WorkloadConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Descriptive columns of a persisted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub scenario: Scenario,
    pub protocol: Protocol,
    pub client: String,
    pub concurrency: usize,
    pub duration_sec: u64,
    pub rate_limit: Option<u32>,
    pub cpu_usage_avg: Option<f64>,
    pub memory_mb_avg: Option<f64>,
    pub memory_mb_peak: Option<f64>,
}

impl RunMetadata {
    pub fn new(
        config: &WorkloadConfig,
        protocol: Protocol,
        measured: Duration,
        resources: Option<ResourceStats>,
    ) -> Self {
        Self {
            scenario: config.scenario,
            protocol,
            client: format!("rust-{protocol}"),
            concurrency: config.concurrency.get(),
            duration_sec: measured.as_secs(),
            rate_limit: config.rate_limit(),
            cpu_usage_avg: resources.map(|r| r.cpu_avg_percent),
            memory_mb_avg: resources.map(|r| r.memory_avg_mb),
            memory_mb_peak: resources.map(|r| r.memory_peak_mb),
        }
    }
}

/// Everything produced by a run: metadata, derived statistics and every recorded sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: RunMetadata,
    pub statistics: RunStatistics,
    pub samples: Vec<Sample>,
}

impl RunReport {
    pub fn summary(&self) -> Summary<'_> {
        Summary {
            metadata: &self.metadata,
            statistics: &self.statistics,
        }
    }
}

/// Human readable report block.
pub struct Summary<'a> {
    metadata: &'a RunMetadata,
    statistics: &'a RunStatistics,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.statistics;
        let whole_secs = Duration::from_secs(stats.duration.as_secs());

        writeln!(
            f,
            "Benchmark: {} / {}",
            self.metadata.scenario, self.metadata.protocol
        )?;
        writeln!(
            f,
            "Duration: {} | Concurrency: {}",
            humantime::format_duration(whole_secs),
            self.metadata.concurrency
        )?;
        writeln!(f, "{}", "-".repeat(33))?;
        writeln!(f, "Requests:    {}", stats.total_requests)?;
        writeln!(f, "Throughput:  {:.2} req/s", stats.throughput)?;
        writeln!(f, "Latency:")?;
        writeln!(f, "  p50:  {:.2}ms", millis(stats.latency_p50))?;
        writeln!(f, "  p90:  {:.2}ms", millis(stats.latency_p90))?;
        writeln!(f, "  p99:  {:.2}ms", millis(stats.latency_p99))?;
        writeln!(f, "  avg:  {:.2}ms", millis(stats.latency_avg))?;
        writeln!(f, "  min:  {:.2}ms", millis(stats.latency_min))?;
        writeln!(f, "  max:  {:.2}ms", millis(stats.latency_max))?;
        writeln!(
            f,
            "Errors:      {} ({:.2}%)",
            stats.failed_requests(),
            stats.error_rate
        )?;
        if let Some(resources) = &stats.resources {
            writeln!(f, "Resources:")?;
            writeln!(f, "  CPU avg:   {:.1}%", resources.cpu_avg_percent)?;
            writeln!(f, "  Mem avg:   {:.1} MB", resources.memory_avg_mb)?;
            writeln!(f, "  Mem peak:  {:.1} MB", resources.memory_peak_mb)?;
        }
        Ok(())
    }
}

fn millis(dur: Duration) -> f64 {
    dur.as_secs_f64() * 1_000.
}
