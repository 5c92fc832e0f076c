//! Process configuration, loaded from the environment.
//!
//! Follows `Xevion-Banner`'s `App::new()` pattern of layering a `Figment`
//! over `Env::raw()` rather than hand-rolling `std::env::var` calls.

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SEARCH_WORKERS, RANGE_BASE_BUDGET_SECONDS, SINGLE_DAY_BUDGET_SECONDS};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    pub log_level: String,
    pub single_day_budget_seconds: f64,
    pub range_budget_seconds: f64,
    pub search_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:7860".to_string(),
            log_level: "info".to_string(),
            single_day_budget_seconds: SINGLE_DAY_BUDGET_SECONDS,
            range_budget_seconds: RANGE_BASE_BUDGET_SECONDS,
            search_workers: DEFAULT_SEARCH_WORKERS,
        }
    }
}

impl Config {
    /// Loads configuration from the process environment, falling back to
    /// defaults for anything unset. Environment variables are read without a
    /// prefix (`BIND_ADDR`, `LOG_LEVEL`, ...).
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw())
            .extract()?;
        Ok(config)
    }
}
