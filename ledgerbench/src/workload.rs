use crate::error::WorkerError;
use ledgerbench_core::Sample;

mod accounts;
mod streaming;
mod unary;

pub use accounts::AccountPicker;
pub use streaming::StreamingWorkload;
pub use unary::UnaryWorkload;

/// What a workload produced when asked for its next unit of work.
#[derive(Debug)]
pub enum Step {
    Sample(Sample),
    Finished(Finish),
}

/// Why a worker stopped producing samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finish {
    /// The configured duration elapsed.
    Elapsed,
    /// A stop was requested. Stream errors raised after the request are folded into this.
    RequestedCancellation,
    /// The server ended the subscription cleanly.
    Exhausted,
    /// The subscription failed; one failed sample was recorded for it.
    UnexpectedStreamFailure,
}

/// The loop body of one worker.
///
/// Each call performs at most one unit of work. A workload never cancels an in-flight unary call:
/// stop and deadline checks happen between units.
#[trait_variant::make(Workload: Send)]
pub trait LocalWorkload {
    async fn next(&mut self) -> Result<Step, WorkerError>;
}
