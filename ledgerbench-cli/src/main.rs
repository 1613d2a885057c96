use anyhow::{bail, Context, Result};
use clap::Parser;
use ledgerbench::prelude::*;
use ledgerbench::{RunnerError, Target};
use ledgerbench_core::parse_duration;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_LOG_FILTER: &str = "ledgerbench=info,ledgerbench_cli=info";

/// Benchmark a ledger service's balance queries or transaction stream.
#[derive(Parser, Debug)]
#[command(name = "ledgerbench", version, about)]
struct Args {
    /// Request pattern: `balance` or `stream`.
    #[arg(long, default_value = "balance")]
    scenario: Scenario,

    /// Transport: `grpc` or `rest`.
    #[arg(long, default_value = "grpc")]
    protocol: Protocol,

    /// Number of concurrent workers.
    #[arg(long, default_value = "10")]
    concurrency: NonZeroUsize,

    /// Run length, e.g. `30`, `30s`, `5m` or `1h`.
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    duration: Duration,

    /// Events per second requested from the server for streaming runs. `0` for unbounded.
    #[arg(long, default_value_t = 0)]
    rate: u32,

    #[arg(long, default_value = "http://localhost:50051")]
    grpc_addr: String,

    #[arg(long, default_value = "http://localhost:8080")]
    rest_addr: String,

    #[arg(long, default_value = "localhost")]
    db_host: String,

    #[arg(long, default_value_t = 5432)]
    db_port: u16,

    #[arg(long, default_value = "benchmark")]
    db_user: String,

    #[arg(long, default_value = "benchmark_pass")]
    db_pass: String,

    #[arg(long, default_value = "grpc_benchmark")]
    db_name: String,

    /// Also write the full report, samples included, to this file.
    #[arg(long)]
    json: Option<PathBuf>,

    /// Do not persist the run to the results database.
    #[arg(long)]
    no_store: bool,

    /// Serve Prometheus metrics on this address while running.
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,
}

impl Args {
    fn workload(&self) -> WorkloadConfig {
        WorkloadConfig::new(self.scenario, self.concurrency, self.duration).rate(self.rate)
    }

    fn db_config(&self) -> DbConfig {
        DbConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            user: self.db_user.clone(),
            password: self.db_pass.clone(),
            database: self.db_name.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    if let Some(addr) = args.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing the Prometheus exporter")?;
        info!("Serving metrics on {addr}");
    }

    let config = args.workload();

    let mut db = Database::new(args.db_config());
    info!("Connecting to database {}", db.config());
    db.connect()
        .await
        .context("connecting to the results database")?;

    let account_ids = match config.scenario {
        Scenario::Balance => {
            let ids = db.load_account_ids().await?;
            if ids.is_empty() {
                db.close().await;
                bail!("No accounts found in the database; seed the accounts table first");
            }
            ids
        }
        Scenario::Stream => vec![],
    };

    let stop = StopSignal::new();
    tokio::spawn(stop_on_shutdown(stop.clone()));

    info!(
        "Starting {} benchmark ({} protocol), concurrency {} for {}",
        config.scenario,
        args.protocol,
        config.concurrency,
        humantime::format_duration(config.duration)
    );

    let (report, outcome) = match args.protocol {
        Protocol::Grpc => {
            let target = GrpcTarget::new(&args.grpc_addr)
                .with_context(|| format!("invalid gRPC address {}", args.grpc_addr))?;
            info!("Targeting {}", target.addr());
            benchmark(target, account_ids, &config, args.protocol, stop).await
        }
        Protocol::Rest => {
            let target = RestTarget::new(&args.rest_addr)
                .with_context(|| format!("invalid REST address {}", args.rest_addr))?;
            info!("Targeting {}", target.base_url());
            benchmark(target, account_ids, &config, args.protocol, stop).await
        }
        other => bail!("Protocol {other} is not supported"),
    };
    println!("\n{}", report.summary());

    if let Some(path) = &args.json {
        write_json(path, &report)?;
        info!("Wrote report to {}", path.display());
    }

    if args.no_store {
        info!("Not storing results");
    } else {
        match db.store_report(&report).await {
            Ok(run_id) => {
                println!("Results stored (run_id={run_id})");
                print_stored_percentiles(&db, run_id).await;
            }
            Err(err) => error!("Failed to store results: {err}"),
        }
    }

    if let Some(stats) = db.stats() {
        debug!("Pool size {} with {} idle", stats.size, stats.idle);
    }
    db.close().await;

    outcome.context("benchmark run did not complete cleanly")?;
    Ok(())
}

/// Drive one run against `target` and build its report, even when the run itself failed.
async fn benchmark<T>(
    target: T,
    account_ids: Vec<String>,
    config: &WorkloadConfig,
    protocol: Protocol,
    stop: StopSignal,
) -> (RunReport, Result<(), RunnerError>)
where
    T: Target + Send + Sync + 'static,
{
    let runner = Runner::new(target, account_ids).with_stop_signal(stop);
    let outcome = runner.run_monitored(config, ResourceMonitor::new()).await;
    (runner.results().report(config, protocol), outcome)
}

async fn print_stored_percentiles(db: &Database, run_id: i64) {
    match db.stored_percentiles(run_id).await {
        Ok(Some(p)) => println!(
            "Database stats (benchmark_stats view): p50 {:.2}ms, p90 {:.2}ms, p99 {:.2}ms",
            p.p50_ms, p.p90_ms, p.p99_ms
        ),
        Ok(None) => warn!("No benchmark_stats row for run {run_id}"),
        Err(err) => warn!("Could not read back stats for run {run_id}: {err}"),
    }
}

fn write_json(path: &Path, report: &RunReport) -> Result<()> {
    let body = serde_json::to_vec_pretty(report).context("serializing the report")?;
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Request a cooperative stop on Ctrl-C or SIGTERM.
async fn stop_on_shutdown(stop: StopSignal) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Unable to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(err) = res {
                warn!("Unable to listen for Ctrl-C: {err}");
                return;
            }
        }
        _ = terminate => {}
    }

    info!("Shutdown requested, letting in-flight work finish");
    stop.stop();
}
