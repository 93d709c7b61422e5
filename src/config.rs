//! Scheduler configuration

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Environment variable forcing every task to run on each tick
pub const RUN_ALL_ENV: &str = "RECONCILE_RUN_ALL";

/// Settings of the periodic reconcile job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run every task instead of only the least recently run one
    pub run_all: bool,
    /// `tracing` filter directive used by [`crate::logging::init_with`]
    pub log_filter: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            run_all: false,
            log_filter: "info".to_string(),
        }
    }
}

impl SchedulerConfig {
    /// Parse settings from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> ReconcileResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ReconcileError::Validation(format!("Invalid scheduler config: {}", e)))
    }

    /// Read settings from `RECONCILE_RUN_ALL` and `RUST_LOG`
    pub fn from_env() -> ReconcileResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(RUN_ALL_ENV) {
            config.run_all = parse_flag(&value)?;
        }
        if let Ok(filter) = std::env::var("RUST_LOG") {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> ReconcileResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ReconcileError::Validation(format!(
            "{} must be a boolean, got '{}'",
            RUN_ALL_ENV, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_defaults_missing_fields() {
        let config = SchedulerConfig::from_json(r#"{"run_all": true}"#).unwrap();
        assert!(config.run_all);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(SchedulerConfig::from_json("run_all").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
