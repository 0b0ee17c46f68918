//! Configuration for the operator.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use elasticjob_reconcile::RosterMode;

/// Operator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Interval between reconciliation passes.
    pub reconcile_interval: Duration,

    /// Whether tasks created in one pass see each other in their roster.
    pub roster_mode: RosterMode,

    /// Optional JSON file of jobs to load at startup.
    pub jobs_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            reconcile_interval: Duration::from_secs(5),
            roster_mode: RosterMode::Snapshot,
            jobs_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let log_level = lookup("ELASTICJOB_LOG_LEVEL").unwrap_or(defaults.log_level);

        let reconcile_interval = match lookup("ELASTICJOB_RECONCILE_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("invalid ELASTICJOB_RECONCILE_INTERVAL_SECS: {}", raw))?;
                if secs == 0 {
                    return Err(anyhow!("ELASTICJOB_RECONCILE_INTERVAL_SECS must be positive"));
                }
                Duration::from_secs(secs)
            }
            None => defaults.reconcile_interval,
        };

        let roster_mode = match lookup("ELASTICJOB_ROSTER_MODE") {
            Some(raw) => raw.parse::<RosterMode>().map_err(|e| anyhow!(e))?,
            None => defaults.roster_mode,
        };

        let jobs_file = lookup("ELASTICJOB_JOBS_FILE").map(PathBuf::from);

        Ok(Self {
            log_level,
            reconcile_interval,
            roster_mode,
            jobs_file,
        })
    }
}
