use crate::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown {kind} \"{value}\"")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Request pattern driven by each worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Closed-loop unary balance queries against random accounts.
    Balance,
    /// One long-lived transaction subscription per worker.
    Stream,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Balance => "balance",
            Scenario::Stream => "stream",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "balance" => Ok(Scenario::Balance),
            "stream" => Ok(Scenario::Stream),
            _ => Err(UnknownVariant {
                kind: "scenario",
                value: s.to_string(),
            }),
        }
    }
}

/// Transport used to reach the benchmarked service.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Grpc,
    Rest,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Grpc => "grpc",
            Protocol::Rest => "rest",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grpc" => Ok(Protocol::Grpc),
            "rest" => Ok(Protocol::Rest),
            _ => Err(UnknownVariant {
                kind: "protocol",
                value: s.to_string(),
            }),
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub scenario: Scenario,
    pub concurrency: NonZeroUsize,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub duration: Duration,
    /// Events per second requested from the server for streaming runs. `0` means unbounded.
    pub rate: u32,
}

impl WorkloadConfig {
    pub fn new(scenario: Scenario, concurrency: NonZeroUsize, duration: Duration) -> Self {
        Self {
            scenario,
            concurrency,
            duration,
            rate: 0,
        }
    }

    pub fn rate(mut self, rate: u32) -> Self {
        self.rate = rate;
        self
    }

    /// The rate limit worth recording: only streaming runs with an actual limit have one.
    pub fn rate_limit(&self) -> Option<u32> {
        match self.scenario {
            Scenario::Stream if self.rate > 0 => Some(self.rate),
            _ => None,
        }
    }
}

/// Bounded exponential backoff: `max_retries + 1` attempts, the wait doubling after each one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_interval: Duration) -> Self {
        Self {
            max_retries,
            retry_interval,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before the given attempt (0-based). The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        match attempt {
            0 => Duration::ZERO,
            n => self
                .retry_interval
                .saturating_mul(2u32.saturating_pow(n - 1)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    pub min_connections: u32,
    pub max_connections: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
    /// Upper bound for a single connection attempt.
    pub connect_timeout: Duration,

    pub retry: RetryPolicy,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "benchmark".to_string(),
            password: "benchmark_pass".to_string(),
            database: "grpc_benchmark".to_string(),
            min_connections: 5,
            max_connections: 50,
            max_lifetime: Duration::from_secs(3600),
            idle_timeout: Duration::from_secs(1800),
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Display for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.database, self.host, self.port)
    }
}
