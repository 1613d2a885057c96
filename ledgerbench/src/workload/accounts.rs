use crate::error::{RunnerError, WorkerError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Uniform random choice over a fixed, non-empty pool of account identifiers.
#[derive(Debug)]
pub struct AccountPicker {
    ids: Vec<String>,
    rng: Mutex<StdRng>,
}

impl AccountPicker {
    pub fn new(ids: Vec<String>) -> Result<Self, RunnerError> {
        Self::with_rng(ids, StdRng::from_entropy())
    }

    pub fn seeded(ids: Vec<String>, seed: u64) -> Result<Self, RunnerError> {
        Self::with_rng(ids, StdRng::seed_from_u64(seed))
    }

    fn with_rng(ids: Vec<String>, rng: StdRng) -> Result<Self, RunnerError> {
        if ids.is_empty() {
            return Err(RunnerError::NoAccounts);
        }

        Ok(Self {
            ids,
            rng: Mutex::new(rng),
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn pick(&self) -> Result<&str, WorkerError> {
        let idx = self.rng.lock()?.gen_range(0..self.ids.len());
        Ok(&self.ids[idx])
    }
}
