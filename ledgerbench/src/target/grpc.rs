use super::{EventStream, Target, TransactionEvent};
use crate::error::TargetError;
use futures_util::stream::StreamExt;
use ledgerbench_proto::proto::{BalanceRequest, StreamRequest, Transaction};
use ledgerbench_proto::{BalanceServiceClient, TransactionServiceClient};
use tonic::transport::{Channel, Endpoint};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Ledger service reached over gRPC.
///
/// * `benchmark.BalanceService/GetBalance`
/// * `benchmark.TransactionService/StreamTransactions`, server streaming
///
/// All workers share one lazily connected channel. An unreachable server therefore shows up as
/// failed calls rather than a construction error. Must be created inside a tokio runtime.
#[derive(Clone, Debug)]
pub struct GrpcTarget {
    channel: Channel,
    addr: String,
}

impl GrpcTarget {
    pub fn new(addr: &str) -> Result<Self, TargetError> {
        let endpoint = Endpoint::from_shared(addr.to_string())?;
        Ok(Self {
            channel: endpoint.connect_lazy(),
            addr: addr.to_string(),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Target for GrpcTarget {
    async fn get_balance(&self, account_id: &str) -> Result<(), TargetError> {
        let mut client = BalanceServiceClient::new(self.channel.clone());
        client
            .get_balance(BalanceRequest {
                account_id: account_id.to_string(),
            })
            .await?;
        Ok(())
    }

    async fn stream_events(&self, rate: u32) -> Result<EventStream, TargetError> {
        let mut client = TransactionServiceClient::new(self.channel.clone());
        let request = StreamRequest {
            rate_limit: i32::try_from(rate).unwrap_or(i32::MAX),
            ..Default::default()
        };

        debug!("Subscribing to {} at rate {rate}", self.addr);
        let events = client.stream_transactions(request).await?.into_inner();

        Ok(events
            .map(|item| item.map(TransactionEvent::from).map_err(TargetError::from))
            .boxed())
    }
}

impl From<Transaction> for TransactionEvent {
    fn from(tx: Transaction) -> Self {
        Self {
            tx_id: tx.tx_id,
            from: tx.from_account,
            to: tx.to_account,
            amount: tx.amount_tinybar,
            kind: tx.tx_type,
            timestamp: tx.timestamp,
        }
    }
}
