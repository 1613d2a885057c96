//! Generated client and server code for the ledger's `BalanceService` and `TransactionService`.

pub mod proto {
    tonic::include_proto!("benchmark");
}

pub use proto::balance_service_client::BalanceServiceClient;
pub use proto::balance_service_server::{BalanceService, BalanceServiceServer};
pub use proto::transaction_service_client::TransactionServiceClient;
pub use proto::transaction_service_server::{TransactionService, TransactionServiceServer};
