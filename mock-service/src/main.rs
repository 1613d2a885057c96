use metrics_exporter_prometheus::PrometheusBuilder;
use mock_service::MockConfig;
use std::net::SocketAddr;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=info,tower_http=info")
        .init();

    PrometheusBuilder::new()
        .with_http_listener("0.0.0.0:8003".parse::<SocketAddr>()?)
        .install()?;

    tokio::spawn(mock_service::request_rate_task());

    let rest: SocketAddr = "0.0.0.0:8080".parse()?;
    let grpc: SocketAddr = "0.0.0.0:50051".parse()?;
    tokio::try_join!(
        mock_service::run(rest, MockConfig::default()),
        mock_service::run_grpc(grpc, MockConfig::default()),
    )?;
    Ok(())
}
