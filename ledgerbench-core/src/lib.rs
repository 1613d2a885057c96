mod config;
mod constants;
mod duration;
mod report;
mod sample;
mod stats;

pub use config::*;
pub use constants::*;
pub use duration::*;
pub use report::*;
pub use sample::*;
pub use stats::*;
