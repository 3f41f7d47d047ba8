//! Runtime settings for the `flashcards` binary.

use crate::models::DueItemSelector;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_DATABASE_PATH: &str = "db.sqlite3";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub database_path: PathBuf,
    /// Fixed seed for card selection; random per run when unset.
    pub rng_seed: Option<u64>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            rng_seed: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn selector(&self) -> DueItemSelector {
        match self.rng_seed {
            Some(seed) => DueItemSelector::with_seed(seed),
            None => DueItemSelector::new(),
        }
    }
}
