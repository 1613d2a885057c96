use super::{Finish, Step, Workload};
use crate::error::{TargetError, WorkerError};
use crate::stop::StopSignal;
use crate::target::{EventStream, Target};
use futures_util::StreamExt;
use ledgerbench_core::Sample;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// One long-lived subscription per worker.
///
/// Each received event becomes a Sample whose latency is the gap since the previous event; the
/// first event has no predecessor and is recorded unmeasured. A subscription failure is recorded
/// as a single failed Sample unless a stop was already requested, in which case it is treated as
/// the expected consequence of tearing the connection down.
pub struct StreamingWorkload<T> {
    target: Arc<T>,
    rate: u32,
    deadline: Instant,
    stop: StopSignal,
    state: State,
}

enum State {
    Idle,
    Open {
        events: EventStream,
        last: Option<Instant>,
    },
    Done(Finish),
}

enum Received {
    Event,
    End(StreamEnd),
}

/// How a subscription ended, before deciding what gets recorded.
#[derive(Debug)]
enum StreamEnd {
    Elapsed,
    Closed,
    RequestedCancellation,
    UnexpectedStreamFailure(TargetError),
}

impl StreamEnd {
    fn classify(err: TargetError, stop: &StopSignal) -> Self {
        if stop.is_stopped() {
            trace!("Stream error after stop request suppressed: {err}");
            StreamEnd::RequestedCancellation
        } else {
            StreamEnd::UnexpectedStreamFailure(err)
        }
    }
}

impl<T> StreamingWorkload<T> {
    pub fn new(target: Arc<T>, rate: u32, deadline: Instant, stop: StopSignal) -> Self {
        Self {
            target,
            rate,
            deadline,
            stop,
            state: State::Idle,
        }
    }

    fn end(&mut self, end: StreamEnd) -> Step {
        let (finish, sample) = match end {
            StreamEnd::Elapsed => (Finish::Elapsed, None),
            StreamEnd::Closed => (Finish::Exhausted, None),
            StreamEnd::RequestedCancellation => (Finish::RequestedCancellation, None),
            StreamEnd::UnexpectedStreamFailure(err) => {
                warn!("Transaction stream failed: {err}");
                (
                    Finish::UnexpectedStreamFailure,
                    Some(Sample::failure(Duration::ZERO, err)),
                )
            }
        };

        // Dropping the stream closes the subscription.
        self.state = State::Done(finish);
        match sample {
            Some(sample) => Step::Sample(sample),
            None => Step::Finished(finish),
        }
    }
}

impl<T> Workload for StreamingWorkload<T>
where
    T: Target + Send + Sync,
{
    async fn next(&mut self) -> Result<Step, WorkerError> {
        loop {
            match &mut self.state {
                State::Done(finish) => return Ok(Step::Finished(*finish)),
                State::Idle => {
                    if self.stop.is_stopped() {
                        return Ok(self.end(StreamEnd::RequestedCancellation));
                    }
                    if Instant::now() >= self.deadline {
                        return Ok(self.end(StreamEnd::Elapsed));
                    }

                    match self.target.stream_events(self.rate).await {
                        Ok(events) => self.state = State::Open { events, last: None },
                        Err(err) => {
                            let end = StreamEnd::classify(err, &self.stop);
                            return Ok(self.end(end));
                        }
                    }
                }
                State::Open { events, last } => {
                    let received = tokio::select! {
                        biased;
                        _ = self.stop.stopped() => Received::End(StreamEnd::RequestedCancellation),
                        _ = sleep_until(self.deadline) => Received::End(StreamEnd::Elapsed),
                        item = events.next() => match item {
                            Some(Ok(_event)) => Received::Event,
                            Some(Err(err)) => Received::End(StreamEnd::classify(err, &self.stop)),
                            None => Received::End(StreamEnd::Closed),
                        },
                    };

                    match received {
                        Received::Event => {
                            let now = Instant::now();
                            let latency = last.map(|prev| now - prev).unwrap_or_default();
                            *last = Some(now);
                            return Ok(Step::Sample(Sample::success(latency)));
                        }
                        Received::End(end) => return Ok(self.end(end)),
                    }
                }
            }
        }
    }
}
