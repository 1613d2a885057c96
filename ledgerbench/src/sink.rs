use ledgerbench_core::{
    Protocol, ResourceStats, RunMetadata, RunReport, RunStatistics, Sample, WorkloadConfig,
};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Concurrent-safe collection of every sample recorded during one run.
///
/// Appends take a short lock; every statistic is derived from a single locked snapshot so that it
/// is consistent at the moment of the read. Latency statistics ignore failed samples and samples
/// without a measured latency.
#[derive(Debug, Default)]
pub struct SampleSink {
    samples: Mutex<Vec<Sample>>,
    window: Mutex<Window>,
    resources: Mutex<Option<ResourceStats>>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Window {
    start: Option<Instant>,
    end: Option<Instant>,
}

impl Window {
    fn duration(&self) -> Duration {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }
}

impl SampleSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sample: Sample) {
        #[cfg(feature = "metrics")]
        record_metrics(&sample);

        lock(&self.samples).push(sample);
    }

    pub fn set_start(&self, at: Instant) {
        lock(&self.window).start = Some(at);
    }

    pub fn set_end(&self, at: Instant) {
        lock(&self.window).end = Some(at);
    }

    pub fn set_resource_stats(&self, stats: ResourceStats) {
        *lock(&self.resources) = Some(stats);
    }

    pub fn resource_stats(&self) -> Option<ResourceStats> {
        *lock(&self.resources)
    }

    pub fn total_requests(&self) -> usize {
        lock(&self.samples).len()
    }

    pub fn successful_requests(&self) -> usize {
        lock(&self.samples).iter().filter(|s| s.success).count()
    }

    /// Percentage of failed samples, `0.` when nothing was recorded.
    pub fn error_rate(&self) -> f64 {
        error_rate(&lock(&self.samples))
    }

    pub fn duration(&self) -> Duration {
        lock(&self.window).duration()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration().as_secs_f64()
    }

    /// Samples per second over the run window, `0.` until both markers are set.
    pub fn throughput(&self) -> f64 {
        let duration = self.duration_seconds();
        throughput(lock(&self.samples).len(), duration)
    }

    /// Nearest-rank percentile, `p` in `[0, 100]`.
    pub fn percentile(&self, p: f64) -> Duration {
        percentile(&self.latencies(), p)
    }

    pub fn avg_latency(&self) -> Duration {
        average(&self.latencies())
    }

    pub fn min_latency(&self) -> Duration {
        self.latencies().first().copied().unwrap_or_default()
    }

    pub fn max_latency(&self) -> Duration {
        self.latencies().last().copied().unwrap_or_default()
    }

    pub fn samples(&self) -> Vec<Sample> {
        lock(&self.samples).clone()
    }

    pub fn statistics(&self) -> RunStatistics {
        let window = *lock(&self.window);
        let resources = self.resource_stats();
        let samples = lock(&self.samples);

        let latencies = sorted_latencies(&samples);
        let duration = window.duration();

        RunStatistics {
            total_requests: samples.len(),
            successful_requests: samples.iter().filter(|s| s.success).count(),
            error_rate: error_rate(&samples),
            throughput: throughput(samples.len(), duration.as_secs_f64()),
            duration,
            latency_p50: percentile(&latencies, 50.),
            latency_p90: percentile(&latencies, 90.),
            latency_p99: percentile(&latencies, 99.),
            latency_avg: average(&latencies),
            latency_min: latencies.first().copied().unwrap_or_default(),
            latency_max: latencies.last().copied().unwrap_or_default(),
            resources,
        }
    }

    pub fn report(&self, config: &WorkloadConfig, protocol: Protocol) -> RunReport {
        let statistics = self.statistics();
        let metadata = RunMetadata::new(
            config,
            protocol,
            statistics.duration,
            statistics.resources,
        );

        RunReport {
            metadata,
            statistics,
            samples: self.samples(),
        }
    }

    fn latencies(&self) -> Vec<Duration> {
        sorted_latencies(&lock(&self.samples))
    }
}

// NOTE: A panicking worker must not take the collected results down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn sorted_latencies(samples: &[Sample]) -> Vec<Duration> {
    let mut latencies: Vec<_> = samples
        .iter()
        .filter(|s| s.has_latency())
        .map(|s| s.latency)
        .collect();
    latencies.sort_unstable();
    latencies
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }

    let idx = (sorted.len() as f64 * p / 100.).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn average(latencies: &[Duration]) -> Duration {
    if latencies.is_empty() {
        return Duration::ZERO;
    }

    let total: u128 = latencies.iter().map(Duration::as_nanos).sum();
    let avg = total / latencies.len() as u128;
    Duration::from_nanos(avg.min(u64::MAX as u128) as u64)
}

fn error_rate(samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.;
    }

    let errors = samples.iter().filter(|s| !s.success).count();
    errors as f64 / samples.len() as f64 * 100.
}

fn throughput(total: usize, duration_secs: f64) -> f64 {
    if duration_secs == 0. {
        0.
    } else {
        total as f64 / duration_secs
    }
}

#[cfg(feature = "metrics")]
fn record_metrics(sample: &Sample) {
    if sample.success {
        metrics::counter!("ledgerbench_success").increment(1);
    } else {
        metrics::counter!("ledgerbench_error").increment(1);
    }

    if sample.has_latency() {
        metrics::histogram!("ledgerbench_latency").record(sample.latency.as_nanos() as f64);
    }
}
