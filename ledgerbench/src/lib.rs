#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod connector;
pub mod database;
pub mod error;
pub mod monitor;
pub mod runner;
pub mod sink;
pub mod stop;
pub mod target;
pub mod workload;

pub use database::{Database, PoolStats, StoredPercentiles};
pub use error::{ConnectionError, DatabaseError, RunnerError, TargetError, WorkerError};
pub use monitor::{MonitorHandle, ResourceMonitor};
pub use runner::{RunState, Runner};
pub use sink::SampleSink;
pub use stop::StopSignal;
pub use target::{GrpcTarget, RestTarget, Target};

pub mod prelude {
    pub use crate::{Database, GrpcTarget, ResourceMonitor, RestTarget, Runner, StopSignal};
    pub use ledgerbench_core::{
        DbConfig, Protocol, RunReport, RunStatistics, Scenario, WorkloadConfig,
    };
}
