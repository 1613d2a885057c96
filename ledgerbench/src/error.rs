use std::sync::PoisonError;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a single call or stream read against the benchmarked service.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Malformed event stream: {0}")]
    Framing(String),

    #[error("gRPC call failed: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid target URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A worker fault that was not already captured as a failed sample.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Worker task failed to complete: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Shared worker state is poisoned")]
    PoisonData,
}

impl<T> From<PoisonError<T>> for WorkerError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::PoisonData
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("No account identifiers available for the balance scenario")]
    NoAccounts,

    #[error("Runner has already been started")]
    AlreadyStarted,

    #[error("Worker fault: {0}")]
    Worker(#[from] WorkerError),
}

/// The dependency could not be reached within the retry budget.
#[derive(Debug, Error)]
#[error("Failed to connect after {retries} retries: {source}")]
pub struct ConnectionError {
    pub retries: u32,
    #[source]
    pub source: BoxError,
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database not connected. Call connect() first.")]
    NotConnected,

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),
}
