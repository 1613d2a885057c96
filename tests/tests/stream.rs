mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use futures::StreamExt;
    use ledgerbench::prelude::*;
    use ledgerbench::target::Target;
    use mock_service::MockConfig;
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::time::Duration;

    fn stream(concurrency: usize, duration: Duration, rate: u32) -> WorkloadConfig {
        WorkloadConfig::new(
            Scenario::Stream,
            NonZeroUsize::new(concurrency).unwrap(),
            duration,
        )
        .rate(rate)
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn paced_subscription() {
        let base = mock(MockConfig::default()).await;
        let runner = Runner::new(RestTarget::new(&base).unwrap(), vec![]);
        let config = stream(2, Duration::from_secs(1), 50);

        runner.run(&config).await.unwrap();

        let results = runner.results();
        // 50 events/s on each of two subscriptions, give or take scheduling.
        assert!(results.total_requests() >= 40, "{}", results.total_requests());
        assert!(results.total_requests() <= 110, "{}", results.total_requests());
        assert_eq!(results.error_rate(), 0.);
        assert!(results.percentile(50.) >= Duration::from_millis(15));

        let report = results.report(&config, Protocol::Rest);
        assert_eq!(report.metadata.rate_limit, Some(50));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn error_event_is_one_failure() {
        let base = mock(MockConfig {
            event_interval: Duration::from_millis(5),
            fail_stream_after: Some(5),
            ..Default::default()
        })
        .await;
        let runner = Runner::new(RestTarget::new(&base).unwrap(), vec![]);

        runner
            .run(&stream(3, Duration::from_secs(5), 0))
            .await
            .unwrap();

        let results = runner.results();
        assert_eq!(results.total_requests(), 18);
        assert_eq!(results.successful_requests(), 15);

        let failures: Vec<_> = results
            .samples()
            .into_iter()
            .filter(|s| !s.success)
            .collect();
        assert!(failures
            .iter()
            .all(|s| s.error.as_deref() == Some("Stream error: upstream feed lost")));
        // Every subscription ended early, well before the deadline.
        assert!(results.duration_seconds() < 2.);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(10_000)]
    async fn stop_closes_subscriptions() {
        let base = mock(MockConfig::default()).await;
        let runner = Arc::new(Runner::new(RestTarget::new(&base).unwrap(), vec![]));

        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run(&stream(4, Duration::from_secs(60), 20)).await })
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
    async fn events_decode() {
        let base = mock(MockConfig::default()).await;
        let target = RestTarget::new(&base).unwrap();
        let mut events = target.stream_events(100).await.unwrap();

        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.tx_id, "tx-0");
        assert_eq!(event.kind, "transfer");
        assert!(event.amount > 0);
    }
}
