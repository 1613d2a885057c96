use crate::error::{BoxError, ConnectionError};
use ledgerbench_core::RetryPolicy;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Something that can open and verify a pooled connection to a dependency.
#[trait_variant::make(Connect: Send)]
pub trait LocalConnect {
    type Pool;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn open(&self) -> Result<Self::Pool, Self::Error>;

    /// Round-trip check run against a freshly opened pool.
    async fn verify(&self, pool: &Self::Pool) -> Result<(), Self::Error>;

    async fn release(&self, pool: Self::Pool);
}

/// Opens a connection with bounded exponential backoff.
///
/// Makes `max_retries + 1` attempts in total. The wait before attempt `n > 0` is
/// `retry_interval * 2^(n-1)`. A pool that opens but fails verification is released before
/// the next attempt.
pub struct RetryingConnector<C> {
    connector: C,
    policy: RetryPolicy,
}

impl<C> RetryingConnector<C>
where
    C: Connect + Sync,
    C::Pool: Send + Sync,
{
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self { connector, policy }
    }

    #[instrument(skip_all, fields(max_retries = self.policy.max_retries))]
    pub async fn connect(&self) -> Result<C::Pool, ConnectionError> {
        let mut last_error: Option<BoxError> = None;

        for attempt in 0..self.policy.attempts() {
            let delay = self.policy.delay_before(attempt);
            if delay > Duration::ZERO {
                debug!("Retrying in {}", humantime::format_duration(delay));
                tokio::time::sleep(delay).await;
            }

            let pool = match self.connector.open().await {
                Ok(pool) => pool,
                Err(err) => {
                    warn!("Connection attempt {} failed: {err}", attempt + 1);
                    last_error = Some(err.into());
                    continue;
                }
            };

            match self.connector.verify(&pool).await {
                Ok(()) => {
                    info!("Connected after {} attempt(s)", attempt + 1);
                    return Ok(pool);
                }
                Err(err) => {
                    warn!("Connection attempt {} failed verification: {err}", attempt + 1);
                    self.connector.release(pool).await;
                    last_error = Some(err.into());
                }
            }
        }

        Err(ConnectionError {
            retries: self.policy.max_retries,
            source: last_error.unwrap_or_else(|| "no connection attempt was made".into()),
        })
    }
}
