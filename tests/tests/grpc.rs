mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use futures::StreamExt;
    use ledgerbench::prelude::*;
    use ledgerbench::target::Target;
    use ledgerbench::RunState;
    use mock_service::MockConfig;
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::time::Duration;

    fn workload(scenario: Scenario, concurrency: usize, duration: Duration) -> WorkloadConfig {
        WorkloadConfig::new(
            scenario,
            NonZeroUsize::new(concurrency).unwrap(),
            duration,
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn balance_queries() {
        let addr = mock_grpc(MockConfig {
            balance_delay: Duration::from_millis(5),
            ..Default::default()
        })
        .await;

        let runner = Runner::new(GrpcTarget::new(&addr).unwrap(), account_ids(50));
        let config = workload(Scenario::Balance, 4, Duration::from_secs(1));
        runner.run(&config).await.unwrap();

        let stats = runner.results().statistics();
        assert_eq!(runner.state(), RunState::Stopped);
        assert!(stats.total_requests > 20, "only {} requests", stats.total_requests);
        assert!(stats.total_requests <= 4 * 201);
        assert_eq!(stats.error_rate, 0.);
        assert!(stats.latency_min >= Duration::from_millis(5));

        let report = runner.results().report(&config, Protocol::Grpc);
        assert_eq!(report.metadata.client, "rust-grpc");
        assert_eq!(report.summary().to_string().lines().next(), Some("Benchmark: balance / grpc"));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn unknown_accounts_are_failures() {
        let addr = mock_grpc(MockConfig::default()).await;

        let runner = Runner::new(
            GrpcTarget::new(&addr).unwrap(),
            vec!["missing-1".to_string()],
        );
        runner
            .run(&workload(Scenario::Balance, 2, Duration::from_millis(300)))
            .await
            .unwrap();

        let results = runner.results();
        assert!(results.total_requests() > 0);
        assert_eq!(results.error_rate(), 100.);
        let samples = results.samples();
        assert!(samples[0].error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn unreachable_server() {
        init();
        let runner = Runner::new(GrpcTarget::new("http://127.0.0.1:1").unwrap(), account_ids(3));
        runner
            .run(&workload(Scenario::Balance, 2, Duration::from_millis(200)))
            .await
            .unwrap();

        let results = runner.results();
        assert!(results.total_requests() > 0);
        assert_eq!(results.successful_requests(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn paced_subscription() {
        let addr = mock_grpc(MockConfig::default()).await;
        let runner = Runner::new(GrpcTarget::new(&addr).unwrap(), vec![]);
        let config = workload(Scenario::Stream, 2, Duration::from_secs(1)).rate(50);

        runner.run(&config).await.unwrap();

        let results = runner.results();
        assert!(results.total_requests() >= 40, "{}", results.total_requests());
        assert!(results.total_requests() <= 110, "{}", results.total_requests());
        assert_eq!(results.error_rate(), 0.);
        assert!(results.percentile(50.) >= Duration::from_millis(15));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn status_ends_subscription_with_one_failure() {
        let addr = mock_grpc(MockConfig {
            event_interval: Duration::from_millis(5),
            fail_stream_after: Some(5),
            ..Default::default()
        })
        .await;
        let runner = Runner::new(GrpcTarget::new(&addr).unwrap(), vec![]);

        runner
            .run(&workload(Scenario::Stream, 3, Duration::from_secs(5)))
            .await
            .unwrap();

        let results = runner.results();
        assert_eq!(results.total_requests(), 18);
        assert_eq!(results.successful_requests(), 15);
        assert!(results
            .samples()
            .iter()
            .filter(|s| !s.success)
            .all(|s| s.error.as_deref().unwrap().contains("upstream feed lost")));
        assert!(results.duration_seconds() < 2.);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn stop_closes_subscriptions() {
        let addr = mock_grpc(MockConfig::default()).await;
        let runner = Arc::new(Runner::new(GrpcTarget::new(&addr).unwrap(), vec![]));

        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move {
                runner
                    .run(&workload(Scenario::Stream, 4, Duration::from_secs(60)).rate(20))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        runner.stop();
        handle.await.unwrap().unwrap();

        let results = runner.results();
        assert!(results.total_requests() > 0);
        assert_eq!(results.error_rate(), 0.);
        assert!(results.duration_seconds() < 5.);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn transactions_convert() {
        let addr = mock_grpc(MockConfig::default()).await;
        let target = GrpcTarget::new(&addr).unwrap();
        let mut events = target.stream_events(100).await.unwrap();

        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.tx_id, "tx-0");
        assert_eq!(event.kind, "transfer");
        assert!(event.amount > 0);
    }
}
