use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures_util::stream::{self, Stream, StreamExt};
use ledgerbench_proto::proto as pb;
use ledgerbench_proto::{
    BalanceService, BalanceServiceServer, TransactionService, TransactionServiceServer,
};
#[allow(unused)]
use metrics::{counter, gauge, histogram};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// Behaviour knobs for the mock ledger.
#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Added to every balance query.
    pub balance_delay: Duration,
    /// Event spacing when the client does not ask for a rate.
    pub event_interval: Duration,
    /// Fail the subscription after this many transactions: an `error` event over REST, an
    /// `UNAVAILABLE` status over gRPC.
    pub fail_stream_after: Option<usize>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            balance_delay: Duration::from_millis(1),
            event_interval: Duration::from_millis(10),
            fail_stream_after: None,
        }
    }
}

pub fn router(config: MockConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/accounts/:account_id/balance", get(balance))
        .route("/api/v1/transactions/stream", get(transactions))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(config))
}

pub async fn run(addr: SocketAddr, config: MockConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Mock ledger listening on {}", listener.local_addr()?);
    axum::serve(listener, router(config)).await?;
    Ok(())
}

/// Serve on an ephemeral local port in the background and return the bound address.
pub async fn spawn(config: MockConfig) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router(config)).await {
            tracing::error!("Mock ledger on {addr} stopped: {err}");
        }
    });
    Ok(addr)
}

fn grpc_router(config: MockConfig) -> tonic::transport::server::Router {
    let ledger = MockLedger {
        config: Arc::new(config),
    };
    Server::builder()
        .add_service(BalanceServiceServer::new(ledger.clone()))
        .add_service(TransactionServiceServer::new(ledger))
}

pub async fn run_grpc(addr: SocketAddr, config: MockConfig) -> anyhow::Result<()> {
    info!("Mock ledger gRPC listening on {addr}");
    grpc_router(config).serve(addr).await?;
    Ok(())
}

/// gRPC counterpart of [`spawn`].
pub async fn spawn_grpc(config: MockConfig) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let incoming = TcpListenerStream::new(listener);
        if let Err(err) = grpc_router(config).serve_with_incoming(incoming).await {
            tracing::error!("Mock ledger gRPC on {addr} stopped: {err}");
        }
    });
    Ok(addr)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account_id: String,
    pub balance: i64,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[debug_handler]
async fn balance(
    State(config): State<Arc<MockConfig>>,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceResponse>, (StatusCode, Json<ErrorResponse>)> {
    counter!("mock-ledger.balance").increment(1);
    REQUESTS.fetch_add(1, Ordering::Relaxed);
    tokio::time::sleep(config.balance_delay).await;

    if account_id.starts_with("missing") {
        debug!("Unknown account {account_id}");
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("account {account_id} not found"),
            }),
        ));
    }

    let balance = rand::thread_rng().gen_range(0..1_000_000_000);
    Ok(Json(BalanceResponse {
        account_id,
        balance,
        timestamp: now(),
    }))
}

#[derive(Debug, Deserialize)]
struct StreamParams {
    #[serde(default)]
    rate: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub tx_id: String,
    pub from: String,
    pub to: String,
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: String,
}

#[debug_handler]
async fn transactions(
    State(config): State<Arc<MockConfig>>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    counter!("mock-ledger.subscriptions").increment(1);

    let events = feed(&config, params.rate).map(|tick| {
        let event = match tick {
            Tick::Transaction(tx) => match serde_json::to_string(&tx) {
                Ok(data) => Event::default().event("transaction").data(data),
                Err(err) => Event::default().event("error").data(err.to_string()),
            },
            Tick::Failure => Event::default().event("error").data(FEED_LOST),
        };
        Ok(event)
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

const FEED_LOST: &str = "upstream feed lost";

enum Tick {
    Transaction(TransactionEvent),
    Failure,
}

/// Paced transactions shared by both transports. Ends after the failure tick, if any.
fn feed(config: &MockConfig, rate: u32) -> impl Stream<Item = Tick> + Send + 'static {
    let interval = match rate {
        0 => config.event_interval,
        rate => Duration::from_secs_f64(1. / rate as f64),
    };
    let fail_after = config.fail_stream_after;
    debug!("New subscription, one event every {interval:?}");

    stream::unfold(0usize, move |n| async move {
        match fail_after {
            Some(limit) if n == limit => return Some((Tick::Failure, n + 1)),
            Some(limit) if n > limit => return None,
            _ => {}
        }

        tokio::time::sleep(interval).await;
        REQUESTS.fetch_add(1, Ordering::Relaxed);
        Some((Tick::Transaction(transaction(n)), n + 1))
    })
}

fn transaction(n: usize) -> TransactionEvent {
    let mut rng = rand::thread_rng();
    TransactionEvent {
        tx_id: format!("tx-{n}"),
        from: format!("0.0.{}", rng.gen_range(1_000..2_000)),
        to: format!("0.0.{}", rng.gen_range(1_000..2_000)),
        amount: rng.gen_range(1..100_000),
        kind: "transfer".to_string(),
        timestamp: now(),
    }
}

fn now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/** gRPC services **/

#[derive(Clone, Debug)]
struct MockLedger {
    config: Arc<MockConfig>,
}

#[tonic::async_trait]
impl BalanceService for MockLedger {
    async fn get_balance(
        &self,
        request: tonic::Request<pb::BalanceRequest>,
    ) -> Result<tonic::Response<pb::BalanceResponse>, tonic::Status> {
        counter!("mock-ledger.grpc.balance").increment(1);
        REQUESTS.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.config.balance_delay).await;

        let account_id = request.into_inner().account_id;
        if account_id.starts_with("missing") {
            debug!("Unknown account {account_id}");
            return Err(tonic::Status::not_found(format!(
                "account {account_id} not found"
            )));
        }

        Ok(tonic::Response::new(balance_of(account_id)))
    }

    async fn get_balances(
        &self,
        request: tonic::Request<pb::BatchBalanceRequest>,
    ) -> Result<tonic::Response<pb::BatchBalanceResponse>, tonic::Status> {
        REQUESTS.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.config.balance_delay).await;

        let balances = request
            .into_inner()
            .account_ids
            .into_iter()
            .filter(|id| !id.starts_with("missing"))
            .map(balance_of)
            .collect();
        Ok(tonic::Response::new(pb::BatchBalanceResponse { balances }))
    }
}

fn balance_of(account_id: String) -> pb::BalanceResponse {
    pb::BalanceResponse {
        account_id,
        balance_tinybar: rand::thread_rng().gen_range(0..1_000_000_000),
        timestamp: now(),
    }
}

type TransactionStream = Pin<Box<dyn Stream<Item = Result<pb::Transaction, tonic::Status>> + Send>>;

#[tonic::async_trait]
impl TransactionService for MockLedger {
    type StreamTransactionsStream = TransactionStream;

    async fn stream_transactions(
        &self,
        request: tonic::Request<pb::StreamRequest>,
    ) -> Result<tonic::Response<Self::StreamTransactionsStream>, tonic::Status> {
        counter!("mock-ledger.grpc.subscriptions").increment(1);

        let rate = u32::try_from(request.into_inner().rate_limit).unwrap_or(0);
        let transactions = feed(&self.config, rate).map(|tick| match tick {
            Tick::Transaction(tx) => Ok(pb::Transaction {
                tx_id: tx.tx_id,
                from_account: tx.from,
                to_account: tx.to,
                amount_tinybar: tx.amount,
                tx_type: tx.kind,
                timestamp: tx.timestamp,
            }),
            Tick::Failure => Err(tonic::Status::unavailable(FEED_LOST)),
        });

        Ok(tonic::Response::new(Box::pin(transactions)))
    }
}

/** Request rate printer **/

static REQUESTS: AtomicU64 = AtomicU64::new(0);

pub async fn request_rate_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let requests = REQUESTS.swap(0, Ordering::Relaxed);
        info!("{requests} requests/s");
        gauge!("mock-ledger.rps").set(requests as f64);
    }
}
