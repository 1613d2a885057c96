use crate::connector::{Connect, RetryingConnector};
use crate::error::DatabaseError;
use ledgerbench_core::{DbConfig, RunReport, Sample, SAMPLE_INSERT_CHUNK};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder};
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Opens a Postgres pool sized and tuned from a [`DbConfig`], verified with `SELECT 1`.
#[derive(Clone, Debug)]
pub struct PgConnector {
    connect: PgConnectOptions,
    pool: PgPoolOptions,
}

impl PgConnector {
    pub fn new(config: &DbConfig) -> Self {
        let connect = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(config.idle_timeout)
            .acquire_timeout(config.connect_timeout);

        Self { connect, pool }
    }
}

impl Connect for PgConnector {
    type Pool = PgPool;
    type Error = sqlx::Error;

    async fn open(&self) -> Result<PgPool, sqlx::Error> {
        self.pool.clone().connect_with(self.connect.clone()).await
    }

    async fn verify(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    async fn release(&self, pool: PgPool) {
        pool.close().await;
    }
}

/// Point-in-time pool occupancy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

/// Latency percentiles of a stored run as computed by the `benchmark_stats` view, in
/// milliseconds. A run without measured samples reads as zeros.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StoredPercentiles {
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
}

const STORED_PERCENTILES: &str =
    "SELECT p50_latency, p90_latency, p99_latency FROM benchmark_stats WHERE run_id = $1";

/// Results database: a pooled Postgres connection plus the queries the benchmark needs.
pub struct Database {
    config: DbConfig,
    pool: Option<PgPool>,
}

impl Database {
    pub fn new(config: DbConfig) -> Self {
        Self { config, pool: None }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Open and verify the pool, retrying with backoff. A no-op when already connected.
    #[instrument(skip_all, fields(db = %self.config))]
    pub async fn connect(&mut self) -> Result<(), DatabaseError> {
        if self.pool.is_some() {
            return Ok(());
        }

        let connector =
            RetryingConnector::new(PgConnector::new(&self.config), self.config.retry);
        self.pool = Some(connector.connect().await?);
        Ok(())
    }

    pub fn connection(&self) -> Result<&PgPool, DatabaseError> {
        self.pool.as_ref().ok_or(DatabaseError::NotConnected)
    }

    /// Run one statement with text parameters and return its rows.
    pub async fn execute<'q>(
        &self,
        query: &'q str,
        params: &[&'q str],
    ) -> Result<Vec<PgRow>, DatabaseError> {
        let pool = self.connection()?;
        let mut stmt = sqlx::query(query);
        for param in params {
            stmt = stmt.bind(*param);
        }
        Ok(stmt.fetch_all(pool).await?)
    }

    /// Run one statement per parameter set inside a single transaction.
    pub async fn execute_many<'q>(
        &self,
        query: &'q str,
        params_list: &'q [Vec<String>],
    ) -> Result<(), DatabaseError> {
        let pool = self.connection()?;
        let mut tx = pool.begin().await?;
        for params in params_list {
            let mut stmt = sqlx::query(query);
            for param in params {
                stmt = stmt.bind(param.as_str());
            }
            stmt.execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub fn stats(&self) -> Option<PoolStats> {
        self.pool.as_ref().map(|pool| PoolStats {
            size: pool.size(),
            idle: pool.num_idle(),
        })
    }

    pub async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            info!("Closed connection pool to {}", self.config);
        }
    }

    /// Account identifiers for the balance scenario.
    pub async fn load_account_ids(&self) -> Result<Vec<String>, DatabaseError> {
        let pool = self.connection()?;
        let ids: Vec<String> = sqlx::query_scalar("SELECT account_id FROM accounts")
            .fetch_all(pool)
            .await?;
        info!("Loaded {} account ids", ids.len());
        Ok(ids)
    }

    /// Persist a run and all of its samples atomically. Returns the new run id.
    #[instrument(skip_all, fields(samples = report.samples.len()))]
    pub async fn store_report(&self, report: &RunReport) -> Result<i64, DatabaseError> {
        let pool = self.connection()?;
        let meta = &report.metadata;
        let mut tx = pool.begin().await?;

        let run_id: i64 = sqlx::query_scalar(
            "INSERT INTO benchmark_runs \
             (scenario, protocol, client, concurrency, duration_sec, rate_limit, \
              cpu_usage_avg, memory_mb_avg, memory_mb_peak) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(meta.scenario.as_str())
        .bind(meta.protocol.as_str())
        .bind(&meta.client)
        .bind(i32::try_from(meta.concurrency).unwrap_or(i32::MAX))
        .bind(i32::try_from(meta.duration_sec).unwrap_or(i32::MAX))
        .bind(meta.rate_limit.map(|rate| i32::try_from(rate).unwrap_or(i32::MAX)))
        .bind(meta.cpu_usage_avg)
        .bind(meta.memory_mb_avg)
        .bind(meta.memory_mb_peak)
        .fetch_one(&mut *tx)
        .await?;

        for chunk in report.samples.chunks(SAMPLE_INSERT_CHUNK) {
            sample_insert(run_id, chunk).build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!("Stored run {run_id} with {} samples", report.samples.len());
        Ok(run_id)
    }

    /// Read back the percentiles the database computed for a stored run. `None` when the view
    /// has no row for it.
    pub async fn stored_percentiles(
        &self,
        run_id: i64,
    ) -> Result<Option<StoredPercentiles>, DatabaseError> {
        let pool = self.connection()?;
        let row: Option<(Option<f64>, Option<f64>, Option<f64>)> =
            sqlx::query_as(STORED_PERCENTILES)
                .bind(run_id)
                .fetch_optional(pool)
                .await?;

        Ok(row.map(|(p50, p90, p99)| StoredPercentiles {
            p50_ms: p50.unwrap_or_default(),
            p90_ms: p90.unwrap_or_default(),
            p99_ms: p99.unwrap_or_default(),
        }))
    }
}

fn sample_insert(run_id: i64, samples: &[Sample]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::new(
        "INSERT INTO benchmark_samples (run_id, latency_ms, success, error_type, timestamp) ",
    );
    builder.push_values(samples, |mut row, sample| {
        row.push_bind(run_id)
            .push_bind(sample.latency_ms())
            .push_bind(sample.success)
            .push_bind(sample.error.as_deref())
            .push_bind(sample.timestamp);
    });
    builder
}
