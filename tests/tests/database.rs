mod utils;
#[allow(unused)]
use utils::*;

/// Runs against a live Postgres only when `LEDGERBENCH_DB_HOST` is set.
#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use ledgerbench::prelude::*;
    use ledgerbench_core::RetryPolicy;
    use std::time::Duration;

    fn config() -> Option<DbConfig> {
        let host = std::env::var("LEDGERBENCH_DB_HOST").ok()?;
        let port = std::env::var("LEDGERBENCH_DB_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(5432);

        Some(DbConfig {
            host,
            port,
            min_connections: 1,
            max_connections: 4,
            retry: RetryPolicy::new(1, Duration::from_millis(100)),
            ..Default::default()
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(30_000)]
    async fn execute_many_is_one_transaction() {
        init();
        let Some(config) = config() else {
            return;
        };
        let mut db = Database::new(config);
        db.connect().await.unwrap();

        let table = format!("ledgerbench_batch_{}", std::process::id());
        db.execute(
            &format!("CREATE TABLE {table} (account_id TEXT PRIMARY KEY, note TEXT)"),
            &[],
        )
        .await
        .unwrap();

        let insert = format!("INSERT INTO {table} (account_id, note) VALUES ($1, $2)");
        let rows: Vec<Vec<String>> = (0..3)
            .map(|i| vec![format!("0.0.{}", 3000 + i), "seed".to_string()])
            .collect();
        db.execute_many(&insert, &rows).await.unwrap();

        // A duplicate key in the second statement rolls back the first as well.
        let conflicting = vec![
            vec!["0.0.4000".to_string(), "new".to_string()],
            vec!["0.0.3000".to_string(), "dup".to_string()],
        ];
        assert!(db.execute_many(&insert, &conflicting).await.is_err());

        let count = format!("SELECT account_id FROM {table}");
        assert_eq!(db.execute(&count, &[]).await.unwrap().len(), 3);

        db.execute(&format!("DROP TABLE {table}"), &[]).await.unwrap();
        assert!(db.stats().is_some());
        db.close().await;
        assert!(db.connection().is_err());
    }
}
