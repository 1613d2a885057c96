use super::{AccountPicker, Finish, Step, Workload};
use crate::error::WorkerError;
use crate::stop::StopSignal;
use crate::target::Target;
use ledgerbench_core::Sample;
use std::sync::Arc;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Closed-loop balance queries: one call at a time, back to back, each against a random account.
pub struct UnaryWorkload<T> {
    target: Arc<T>,
    accounts: Arc<AccountPicker>,
    deadline: Instant,
    stop: StopSignal,
}

impl<T> UnaryWorkload<T> {
    pub fn new(
        target: Arc<T>,
        accounts: Arc<AccountPicker>,
        deadline: Instant,
        stop: StopSignal,
    ) -> Self {
        Self {
            target,
            accounts,
            deadline,
            stop,
        }
    }
}

impl<T> Workload for UnaryWorkload<T>
where
    T: Target + Send + Sync,
{
    async fn next(&mut self) -> Result<Step, WorkerError> {
        if self.stop.is_stopped() {
            return Ok(Step::Finished(Finish::RequestedCancellation));
        }
        if Instant::now() >= self.deadline {
            return Ok(Step::Finished(Finish::Elapsed));
        }

        let account = self.accounts.pick()?;
        let start = Instant::now();
        let res = self.target.get_balance(account).await;
        let latency = start.elapsed();

        let sample = match res {
            Ok(()) => Sample::success(latency),
            Err(err) => {
                trace!("Balance query for {account} failed: {err}");
                Sample::failure(latency, err)
            }
        };

        Ok(Step::Sample(sample))
    }
}
