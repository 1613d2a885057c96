use crate::error::TargetError;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[cfg(test)]
pub(crate) mod fake;
mod grpc;
mod rest;
mod sse;

pub use grpc::GrpcTarget;
pub use rest::RestTarget;

/// A push stream of transaction events. Ends when the server closes the subscription.
pub type EventStream = BoxStream<'static, Result<TransactionEvent, TargetError>>;

/// A transaction pushed by the ledger service over a subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub tx_id: String,
    pub from: String,
    pub to: String,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
}

/// The benchmarked service, as seen by a worker.
///
/// Implementations must be shareable across workers; every call is independent and the target
/// carries no per-worker state.
#[trait_variant::make(Target: Send)]
pub trait LocalTarget {
    /// Query the balance of one account. Only success or failure matters; the body is discarded.
    async fn get_balance(&self, account_id: &str) -> Result<(), TargetError>;

    /// Open a transaction subscription. `rate` is a hint for the server, `0` meaning unbounded.
    async fn stream_events(&self, rate: u32) -> Result<EventStream, TargetError>;
}
