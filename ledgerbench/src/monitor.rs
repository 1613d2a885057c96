use ledgerbench_core::{ResourceStats, DEFAULT_MONITOR_INTERVAL, MONITOR_STOP_TIMEOUT};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

use crate::stop::StopSignal;

const BYTES_PER_MB: f64 = 1024. * 1024.;

/// One point-in-time reading of the current process.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProcessReading {
    /// Percent of one core since the previous reading.
    pub cpu_percent: f32,
    pub rss_bytes: u64,
}

/// Source of process readings. Returning `None` skips the tick.
pub trait Probe: Send + 'static {
    fn read(&mut self) -> Option<ProcessReading>;
}

/// Reads the current process through `sysinfo`.
pub struct SysinfoProbe {
    system: System,
    pid: Option<Pid>,
}

impl SysinfoProbe {
    pub fn current_process() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(err) => {
                warn!("Unable to resolve the current pid, resource usage will not be sampled: {err}");
                None
            }
        };

        Self {
            system: System::new(),
            pid,
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::current_process()
    }
}

impl Probe for SysinfoProbe {
    fn read(&mut self) -> Option<ProcessReading> {
        let pid = self.pid?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::new().with_cpu().with_memory(),
        );

        let process = self.system.process(pid)?;
        Some(ProcessReading {
            cpu_percent: process.cpu_usage(),
            rss_bytes: process.memory(),
        })
    }
}

/// Periodically samples CPU and memory of this process while a run is in flight.
pub struct ResourceMonitor<P = SysinfoProbe> {
    probe: P,
    interval: Duration,
}

impl ResourceMonitor<SysinfoProbe> {
    pub fn new() -> Self {
        Self::with_probe(SysinfoProbe::current_process())
    }
}

impl Default for ResourceMonitor<SysinfoProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Probe> ResourceMonitor<P> {
    pub fn with_probe(probe: P) -> Self {
        Self {
            probe,
            interval: DEFAULT_MONITOR_INTERVAL,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start sampling immediately, then once per interval until stopped.
    pub fn start(self) -> MonitorHandle {
        let readings = Arc::new(Mutex::new(Readings::default()));
        let stop = StopSignal::new();

        let task = tokio::spawn(sample_loop(
            self.probe,
            self.interval,
            readings.clone(),
            stop.clone(),
        ));

        MonitorHandle {
            readings,
            stop,
            task,
        }
    }
}

async fn sample_loop<P: Probe>(
    mut probe: P,
    period: Duration,
    readings: Arc<Mutex<Readings>>,
    stop: StopSignal,
) {
    let mut ticks = interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.stopped() => break,
            _ = ticks.tick() => {}
        }

        match probe.read() {
            Some(reading) => lock(&readings).push(reading),
            None => trace!("Skipped resource sample"),
        }
    }
}

/// A running [`ResourceMonitor`].
pub struct MonitorHandle {
    readings: Arc<Mutex<Readings>>,
    stop: StopSignal,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Stop sampling and aggregate. Waits up to a second for the sampler to wind down.
    pub async fn stop(mut self) -> ResourceStats {
        self.stop.stop();
        match tokio::time::timeout(MONITOR_STOP_TIMEOUT, &mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("Resource sampler failed: {err}"),
            Err(_) => {
                warn!("Resource sampler did not stop in time, abandoning it");
                self.task.abort();
            }
        }

        let stats = lock(&self.readings).stats();
        debug!(
            "Collected {} resource samples, cpu avg {:.1}%",
            stats.sample_count, stats.cpu_avg_percent
        );
        stats
    }
}

#[derive(Debug, Default)]
struct Readings {
    cpu: Vec<f64>,
    memory_mb: Vec<f64>,
    memory_peak_mb: f64,
}

impl Readings {
    fn push(&mut self, reading: ProcessReading) {
        let memory_mb = reading.rss_bytes as f64 / BYTES_PER_MB;
        self.cpu.push(reading.cpu_percent as f64);
        self.memory_mb.push(memory_mb);
        self.memory_peak_mb = self.memory_peak_mb.max(memory_mb);
    }

    fn stats(&self) -> ResourceStats {
        // NOTE: The first CPU reading has no baseline to diff against.
        let cpu = match self.cpu.len() {
            0 | 1 => &self.cpu[..],
            _ => &self.cpu[1..],
        };

        ResourceStats {
            cpu_avg_percent: mean(cpu),
            memory_avg_mb: mean(&self.memory_mb),
            memory_peak_mb: self.memory_peak_mb,
            sample_count: self.cpu.len(),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
