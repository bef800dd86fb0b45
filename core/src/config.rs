//! Run configuration.
//!
//! Defaults mirror the runner's flag defaults. A JSON file may supply any
//! subset of fields; the runner applies command-line flags on top.

use crate::{
    error::{DriverError, DriverResult},
    report::ReportFormat,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

pub const DEFAULT_RETRIES: u32 = 10;
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;

/// Backend connection parameters, passed through to backend construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub driver: String,
    pub uri: String,
    pub database: String,
    /// Let drivers with native find-and-modify use it.
    pub atomic_update_read: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            driver: "sqlite".to_string(),
            uri: String::new(),
            database: "tpcc".to_string(),
            atomic_update_read: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub warehouses: i32,
    pub threads: usize,
    pub scale_factor: f64,
    /// Run duration in seconds.
    pub time: u64,
    /// Report interval in seconds.
    pub report_interval: u64,
    pub percentile: f64,
    /// Percent of New-Orders that deliberately reference a bad item.
    pub percent_fail: i32,
    pub report_format: ReportFormat,
    /// Wrap protocols in backend transactions (and allow retries).
    pub transactions: bool,
    pub retries: u32,
    /// How long the aggregator keeps draining after cancelling workers.
    pub grace_period_ms: u64,
    pub seed: u64,
    pub connection: ConnectionConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            warehouses: 10,
            threads: 8,
            scale_factor: 1.0,
            time: 10,
            report_interval: 1,
            percentile: 95.0,
            percent_fail: 0,
            report_format: ReportFormat::Default,
            transactions: false,
            retries: DEFAULT_RETRIES,
            grace_period_ms: 1_000,
            seed: 42,
            connection: ConnectionConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> DriverResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Startup checks. Any failure here is fatal: the run does not begin.
    pub fn validate(&self) -> DriverResult<()> {
        let invalid = |msg: String| Err(DriverError::InvalidConfig(msg));

        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return invalid(format!("scalefactor must be > 0, got {}", self.scale_factor));
        }
        if !(0.0..=100.0).contains(&self.percentile) {
            return invalid(format!("percentile must be in 0..=100, got {}", self.percentile));
        }
        if !(0..=100).contains(&self.percent_fail) {
            return invalid(format!(
                "percent-fail must be in 0..=100, got {}",
                self.percent_fail
            ));
        }
        if self.warehouses < 1 {
            return invalid(format!("warehouses must be >= 1, got {}", self.warehouses));
        }
        if self.threads < 1 {
            return invalid("threads must be >= 1".to_string());
        }
        if self.report_interval < 1 {
            return invalid("report-interval must be >= 1 second".to_string());
        }
        if self.time < 1 {
            return invalid("time must be >= 1 second".to_string());
        }
        if self.retries < 1 {
            return invalid("retries must be >= 1".to_string());
        }
        if self.connection.driver.is_empty() {
            return invalid("dbdriver is required".to_string());
        }
        if self.connection.uri.is_empty() {
            return invalid("uri is required".to_string());
        }
        if self.connection.database.is_empty() {
            return invalid("db is required".to_string());
        }
        Ok(())
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.time)
    }

    pub fn report_every(&self) -> Duration {
        Duration::from_secs(self.report_interval)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RunConfig {
        RunConfig {
            connection: ConnectionConfig {
                uri: ":memory:".to_string(),
                ..ConnectionConfig::default()
            },
            ..RunConfig::default()
        }
    }

    #[test]
    fn defaults_with_uri_validate() {
        valid().validate().expect("valid config");
    }

    #[test]
    fn rejects_bad_percentile() {
        let config = RunConfig {
            percentile: 101.0,
            ..valid()
        };
        assert!(matches!(config.validate(), Err(DriverError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_non_positive_scale_factor() {
        let config = RunConfig {
            scale_factor: 0.0,
            ..valid()
        };
        assert!(matches!(config.validate(), Err(DriverError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_missing_uri() {
        assert!(matches!(
            RunConfig::default().validate(),
            Err(DriverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{ "threads": 2, "report_format": "csv", "connection": { "uri": "run.db" } }"#,
        )
        .expect("parse");
        assert_eq!(config.threads, 2);
        assert_eq!(config.report_format, ReportFormat::Csv);
        assert_eq!(config.connection.driver, "sqlite");
        assert_eq!(config.warehouses, 10);
    }
}
