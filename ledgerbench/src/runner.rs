use crate::error::{RunnerError, WorkerError};
use crate::monitor::{Probe, ResourceMonitor};
use crate::sink::SampleSink;
use crate::stop::StopSignal;
use crate::target::Target;
use crate::workload::{AccountPicker, Step, StreamingWorkload, UnaryWorkload, Workload};
use ledgerbench_core::{Scenario, WorkloadConfig};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Lifecycle of a [`Runner`]. Transitions only move forward, one step at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    NotStarted = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunState::NotStarted,
            1 => RunState::Running,
            2 => RunState::Stopping,
            _ => RunState::Stopped,
        }
    }
}

/// Drives `concurrency` workers against a target for a bounded duration.
///
/// A runner is single-use. Samples accumulate in the shared [`SampleSink`] returned by
/// [`Runner::results`], which stays readable after the run.
pub struct Runner<T> {
    target: Arc<T>,
    account_ids: Vec<String>,
    sink: Arc<SampleSink>,
    stop: StopSignal,
    state: AtomicU8,
}

impl<T> Runner<T>
where
    T: Target + Send + Sync + 'static,
{
    pub fn new(target: T, account_ids: Vec<String>) -> Self {
        Self {
            target: Arc::new(target),
            account_ids,
            sink: Arc::new(SampleSink::new()),
            stop: StopSignal::new(),
            state: AtomicU8::new(RunState::NotStarted as u8),
        }
    }

    /// Share an externally owned stop signal, e.g. one already wired to process signals.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Request a cooperative stop. Idempotent, and safe before or after the run.
    pub fn stop(&self) {
        if self.stop.stop() {
            info!("Stop requested");
        }
        self.advance(RunState::Running, RunState::Stopping);
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn results(&self) -> &Arc<SampleSink> {
        &self.sink
    }

    /// Run the workload to completion: until the duration elapses or a stop is requested and
    /// every worker has finished its in-flight unit of work.
    ///
    /// Worker faults that were not captured as failed samples are surfaced after all workers
    /// have been joined; the first one is returned.
    #[instrument(name = "runner", skip_all, fields(scenario = %config.scenario, concurrency = config.concurrency.get()))]
    pub async fn run(&self, config: &WorkloadConfig) -> Result<(), RunnerError> {
        let accounts = match config.scenario {
            Scenario::Balance => Some(Arc::new(AccountPicker::new(self.account_ids.clone())?)),
            Scenario::Stream => None,
        };

        if !self.advance(RunState::NotStarted, RunState::Running) {
            return Err(RunnerError::AlreadyStarted);
        }

        info!(
            "Starting {} workers for {}",
            config.concurrency,
            humantime::format_duration(config.duration)
        );

        let start = Instant::now();
        let deadline = start + config.duration;
        self.sink.set_start(start.into_std());

        if self.stop.is_stopped() {
            self.advance(RunState::Running, RunState::Stopping);
        }

        let handles: Vec<_> = (0..config.concurrency.get())
            .map(|id| match &accounts {
                Some(accounts) => self.spawn_worker(
                    id,
                    UnaryWorkload::new(
                        self.target.clone(),
                        accounts.clone(),
                        deadline,
                        self.stop.clone(),
                    ),
                ),
                None => self.spawn_worker(
                    id,
                    StreamingWorkload::new(
                        self.target.clone(),
                        config.rate,
                        deadline,
                        self.stop.clone(),
                    ),
                ),
            })
            .collect();

        let joined = join_workers(handles);
        tokio::pin!(joined);

        let faults = tokio::select! {
            faults = &mut joined => faults,
            _ = self.stopping(deadline) => {
                self.advance(RunState::Running, RunState::Stopping);
                debug!("Waiting for workers to finish in-flight work");
                joined.await
            }
        };

        self.sink.set_end(Instant::now().into_std());
        self.advance(RunState::Running, RunState::Stopping);
        self.advance(RunState::Stopping, RunState::Stopped);

        info!(
            "Run finished with {} samples in {:.2}s",
            self.sink.total_requests(),
            self.sink.duration_seconds()
        );

        let mut faults = faults.into_iter();
        match faults.next() {
            Some(fault) => {
                for other in faults {
                    error!("Additional worker fault: {other}");
                }
                Err(fault.into())
            }
            None => Ok(()),
        }
    }

    /// [`Runner::run`] with a resource monitor sampling the process alongside.
    ///
    /// The monitor is stopped and its aggregate attached to the results whether or not the run
    /// succeeded.
    pub async fn run_monitored<P: Probe>(
        &self,
        config: &WorkloadConfig,
        monitor: ResourceMonitor<P>,
    ) -> Result<(), RunnerError> {
        let handle = monitor.start();
        let res = self.run(config).await;
        let resources = handle.stop().await;
        self.sink.set_resource_stats(resources);
        res
    }

    async fn stopping(&self, deadline: Instant) {
        tokio::select! {
            _ = sleep_until(deadline) => {}
            _ = self.stop.stopped() => {}
        }
    }

    fn advance(&self, from: RunState, to: RunState) -> bool {
        let advanced = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if advanced {
            trace!("Runner state {from:?} -> {to:?}");
        }
        advanced
    }

    fn spawn_worker<W>(&self, id: usize, mut workload: W) -> JoinHandle<Result<usize, WorkerError>>
    where
        W: Workload + Send + 'static,
    {
        let sink = self.sink.clone();
        tokio::spawn(
            async move {
                let mut recorded = 0usize;
                loop {
                    match workload.next().await? {
                        Step::Sample(sample) => {
                            sink.add(sample);
                            recorded += 1;
                        }
                        Step::Finished(finish) => {
                            debug!(worker = id, ?finish, recorded, "Worker finished");
                            return Ok(recorded);
                        }
                    }
                }
            }
            .in_current_span(),
        )
    }
}

/// Join every worker, in order, collecting faults rather than stopping at the first one.
async fn join_workers(handles: Vec<JoinHandle<Result<usize, WorkerError>>>) -> Vec<WorkerError> {
    let mut faults = vec![];
    for handle in handles {
        match handle.await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => faults.push(err),
            Err(err) => faults.push(WorkerError::Join(err)),
        }
    }
    faults
}
