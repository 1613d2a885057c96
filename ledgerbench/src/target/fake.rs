use super::{EventStream, Target, TransactionEvent};
use crate::error::TargetError;
use crate::stop::StopSignal;
use futures_util::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How the fake serves a subscription.
#[derive(Clone, Debug)]
pub(crate) enum Feed {
    /// An event every `interval`, forever.
    Every(Duration),
    /// `count` events `interval` apart, then the server closes the stream.
    Finite { count: usize, interval: Duration },
    /// `count` events `interval` apart, then a transport error.
    FailAfter { count: usize, interval: Duration },
    /// Events every `interval` until the signal fires, then a transport error.
    FailOnStop {
        interval: Duration,
        signal: StopSignal,
    },
    /// Subscribing fails outright.
    Refuse,
}

pub(crate) struct FakeTarget {
    latency: Duration,
    fail_every: Option<usize>,
    panic_on: Option<usize>,
    feed: Feed,
    calls: AtomicUsize,
    accounts_seen: Mutex<Vec<String>>,
    rates_seen: Mutex<Vec<u32>>,
}

impl FakeTarget {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_every: None,
            panic_on: None,
            feed: Feed::Every(Duration::from_millis(10)),
            calls: AtomicUsize::new(0),
            accounts_seen: Mutex::new(vec![]),
            rates_seen: Mutex::new(vec![]),
        }
    }

    /// Every `n`th balance call fails.
    pub fn fail_every(mut self, n: usize) -> Self {
        self.fail_every = Some(n);
        self
    }

    /// The `n`th balance call (1-based) panics, taking its worker down with it.
    pub fn panic_on(mut self, n: usize) -> Self {
        self.panic_on = Some(n);
        self
    }

    pub fn feed(mut self, feed: Feed) -> Self {
        self.feed = feed;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn accounts_seen(&self) -> Vec<String> {
        self.accounts_seen.lock().unwrap().clone()
    }

    pub fn rates_seen(&self) -> Vec<u32> {
        self.rates_seen.lock().unwrap().clone()
    }
}

impl Target for FakeTarget {
    async fn get_balance(&self, account_id: &str) -> Result<(), TargetError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        self.accounts_seen
            .lock()
            .unwrap()
            .push(account_id.to_string());
        if self.panic_on == Some(call) {
            panic!("balance call {call} blew up");
        }
        tokio::time::sleep(self.latency).await;

        match self.fail_every {
            Some(n) if call % n == 0 => Err(TargetError::Stream(format!("call {call} failed"))),
            _ => Ok(()),
        }
    }

    async fn stream_events(&self, rate: u32) -> Result<EventStream, TargetError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.rates_seen.lock().unwrap().push(rate);

        let (count, interval, tail) = match self.feed.clone() {
            Feed::Every(interval) => (None, interval, Tail::Close),
            Feed::Finite { count, interval } => (Some(count), interval, Tail::Close),
            Feed::FailAfter { count, interval } => (Some(count), interval, Tail::Fail),
            Feed::FailOnStop { interval, signal } => (None, interval, Tail::FailOnStop(signal)),
            Feed::Refuse => return Err(TargetError::Stream("subscription refused".to_string())),
        };

        let events = stream::unfold((0usize, tail), move |(n, tail)| async move {
            if let Tail::FailOnStop(signal) = &tail {
                tokio::select! {
                    _ = signal.stopped() => {
                        return Some((Err(TargetError::Stream("connection reset".to_string())), (n, Tail::Done)));
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            } else if matches!(tail, Tail::Done) {
                return None;
            } else {
                if count.is_some_and(|count| n >= count) {
                    return match tail {
                        Tail::Fail => Some((
                            Err(TargetError::Stream("stream reset by peer".to_string())),
                            (n, Tail::Done),
                        )),
                        _ => None,
                    };
                }
                tokio::time::sleep(interval).await;
            }

            Some((Ok(event(n)), (n + 1, tail)))
        });

        Ok(events.boxed())
    }
}

enum Tail {
    Close,
    Fail,
    FailOnStop(StopSignal),
    Done,
}

fn event(n: usize) -> TransactionEvent {
    TransactionEvent {
        tx_id: format!("tx-{n}"),
        from: "0.0.1001".to_string(),
        to: "0.0.1002".to_string(),
        amount: 100,
        kind: "transfer".to_string(),
        timestamp: "2024-05-01T10:00:00Z".to_string(),
    }
}
