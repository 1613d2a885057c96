mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use ledgerbench::prelude::*;
    use ledgerbench::RunState;
    use mock_service::MockConfig;
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::time::Duration;

    fn balance(concurrency: usize, duration: Duration) -> WorkloadConfig {
        WorkloadConfig::new(
            Scenario::Balance,
            NonZeroUsize::new(concurrency).unwrap(),
            duration,
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn balance_queries() {
        let base = mock(MockConfig {
            balance_delay: Duration::from_millis(5),
            ..Default::default()
        })
        .await;

        let runner = Runner::new(RestTarget::new(&base).unwrap(), account_ids(50));
        let config = balance(4, Duration::from_secs(1));
        runner.run(&config).await.unwrap();

        let stats = runner.results().statistics();
        assert_eq!(runner.state(), RunState::Stopped);
        assert!(stats.total_requests > 20, "only {} requests", stats.total_requests);
        // Four closed-loop workers, each call at least 5ms.
        assert!(stats.total_requests <= 4 * 201);
        assert_eq!(stats.error_rate, 0.);
        assert!(stats.latency_min >= Duration::from_millis(5));
        assert!(stats.latency_p50 <= stats.latency_p99);
        assert!(stats.duration >= Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn unknown_accounts_are_failures() {
        let base = mock(MockConfig::default()).await;

        let runner = Runner::new(
            RestTarget::new(&base).unwrap(),
            vec!["missing-1".to_string(), "missing-2".to_string()],
        );
        runner
            .run(&balance(2, Duration::from_millis(300)))
            .await
            .unwrap();

        let results = runner.results();
        assert!(results.total_requests() > 0);
        assert_eq!(results.error_rate(), 100.);
        assert_eq!(results.avg_latency(), Duration::ZERO);

        let samples = results.samples();
        assert!(samples[0].error.as_deref().unwrap().contains("404"));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn unreachable_target() {
        utils::init();
        let runner = Runner::new(
            RestTarget::new("http://127.0.0.1:1").unwrap(),
            account_ids(3),
        );
        runner
            .run(&balance(2, Duration::from_millis(200)))
            .await
            .unwrap();

        let results = runner.results();
        assert!(results.total_requests() > 0);
        assert_eq!(results.successful_requests(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn stop_ends_run_early() {
        let base = mock(MockConfig::default()).await;
        let runner = Arc::new(Runner::new(
            RestTarget::new(&base).unwrap(),
            account_ids(10),
        ));

        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run(&balance(8, Duration::from_secs(60))).await })
        };

        tokio::time::sleep(Duration::from_millis(300)).await;
        runner.stop();
        handle.await.unwrap().unwrap();

        let results = runner.results();
        assert!(results.total_requests() > 0);
        assert!(results.duration_seconds() < 5.);
        assert_eq!(results.error_rate(), 0.);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn monitored_report() {
        let base = mock(MockConfig::default()).await;
        let runner = Runner::new(RestTarget::new(&base).unwrap(), account_ids(10));
        let config = balance(2, Duration::from_millis(500));

        runner
            .run_monitored(&config, ResourceMonitor::new())
            .await
            .unwrap();

        let report = runner.results().report(&config, Protocol::Rest);
        assert_eq!(report.metadata.client, "rust-rest");
        assert_eq!(report.metadata.rate_limit, None);
        assert_eq!(report.samples.len(), report.statistics.total_requests);

        let resources = report.statistics.resources.unwrap();
        assert!(resources.sample_count >= 1);
        assert!(resources.memory_peak_mb > 0.);

        let summary = report.summary().to_string();
        assert!(summary.contains("Benchmark: balance / rest"));
        assert!(summary.contains("Resources:"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["metadata"]["scenario"], "balance");
        assert!(json["statistics"]["p99_latency_ms"].as_f64().unwrap() > 0.);
    }
}
