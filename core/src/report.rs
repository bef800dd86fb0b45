//! Report line rendering.
//!
//! One `WindowReport` per tick, rendered in the configured format.
//! Renderers return the line without a trailing newline.

use crate::{
    error::{DriverError, DriverResult},
    event::TransactionType,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub const CSV_HEADER: &str = "Time,TPS,StockLevel,StockLevelLatency,Delivery,DeliveryLatency,\
OrderStatus,OrderStatusLatency,Payment,PaymentLatency,NewOrder,NewOrderLatency,Failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Default,
    Csv,
    Json,
}

impl ReportFormat {
    /// Line printed once before the first tick, if the format has one.
    pub fn header(self) -> Option<&'static str> {
        match self {
            Self::Csv => Some(CSV_HEADER),
            Self::Default | Self::Json => None,
        }
    }

    pub fn format_line(self, report: &WindowReport) -> DriverResult<String> {
        match self {
            Self::Default => Ok(default_line(report)),
            Self::Csv => Ok(csv_line(report)),
            Self::Json => json_line(report),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(DriverError::InvalidConfig(format!(
                "unknown report format '{other}' (expected default, csv or json)"
            ))),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

/// Aggregated figures for one report interval.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    /// Seconds since the run started, in whole intervals.
    pub elapsed_secs: u64,
    pub tps: f64,
    /// Completed transactions per type, indexed by `TransactionType::index`.
    pub counts: [u64; 5],
    /// Latency percentile per type in ms, same indexing.
    pub latencies: [f64; 5],
    pub failed: u64,
}

impl WindowReport {
    pub fn count(&self, ty: TransactionType) -> u64 {
        self.counts[ty.index()]
    }

    pub fn latency(&self, ty: TransactionType) -> f64 {
        self.latencies[ty.index()]
    }
}

fn default_line(r: &WindowReport) -> String {
    let mut line = format!("[ {}s ] TPS: {:.2}", r.elapsed_secs, r.tps);
    for ty in TransactionType::ALL {
        line.push_str(&format!(" {}: {} ({:.2} ms)", ty.name(), r.count(ty), r.latency(ty)));
    }
    line.push_str(&format!(" Failed: {}", r.failed));
    line
}

fn csv_line(r: &WindowReport) -> String {
    let mut line = format!("{},{:.2}", r.elapsed_secs, r.tps);
    for ty in TransactionType::ALL {
        line.push_str(&format!(",{},{:.2}", r.count(ty), r.latency(ty)));
    }
    line.push_str(&format!(",{}", r.failed));
    line
}

// ── JSON ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonTypeStats {
    #[serde(rename = "Trx")]
    trx: u64,
    #[serde(rename = "LatencyPercentile")]
    latency_percentile: f64,
}

#[derive(Serialize)]
struct JsonLine {
    time: u64,
    tps: f64,
    #[serde(rename = "StockLevel")]
    stock_level: JsonTypeStats,
    #[serde(rename = "Delivery")]
    delivery: JsonTypeStats,
    #[serde(rename = "OrderStatus")]
    order_status: JsonTypeStats,
    #[serde(rename = "Payment")]
    payment: JsonTypeStats,
    #[serde(rename = "NewOrder")]
    new_order: JsonTypeStats,
    #[serde(rename = "Failed")]
    failed: u64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn json_line(r: &WindowReport) -> DriverResult<String> {
    let stats = |ty: TransactionType| JsonTypeStats {
        trx: r.count(ty),
        latency_percentile: round2(r.latency(ty)),
    };
    let line = JsonLine {
        time: r.elapsed_secs,
        tps: round2(r.tps),
        stock_level: stats(TransactionType::StockLevel),
        delivery: stats(TransactionType::Delivery),
        order_status: stats(TransactionType::OrderStatus),
        payment: stats(TransactionType::Payment),
        new_order: stats(TransactionType::NewOrder),
        failed: r.failed,
    };
    Ok(serde_json::to_string(&line)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WindowReport {
        WindowReport {
            elapsed_secs: 2,
            tps: 4.0,
            counts: [0, 1, 0, 2, 3],
            latencies: [0.0, 12.5, 0.0, 3.333, 7.0],
            failed: 1,
        }
    }

    #[test]
    fn default_line_matches_layout() {
        let line = ReportFormat::Default.format_line(&sample()).unwrap();
        assert_eq!(
            line,
            "[ 2s ] TPS: 4.00 StockLevel: 0 (0.00 ms) Delivery: 1 (12.50 ms) \
             OrderStatus: 0 (0.00 ms) Payment: 2 (3.33 ms) NewOrder: 3 (7.00 ms) Failed: 1"
        );
    }

    #[test]
    fn csv_row_has_one_column_per_header_field() {
        let line = ReportFormat::Csv.format_line(&sample()).unwrap();
        assert_eq!(line, "2,4.00,0,0.00,1,12.50,0,0.00,2,3.33,3,7.00,1");
        assert_eq!(
            line.split(',').count(),
            CSV_HEADER.split(',').count(),
            "csv row and header disagree on column count"
        );
    }

    #[test]
    fn json_line_uses_report_keys() {
        let line = ReportFormat::Json.format_line(&sample()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["time"], 2);
        assert_eq!(parsed["tps"], 4.0);
        assert_eq!(parsed["Payment"]["Trx"], 2);
        assert_eq!(parsed["Payment"]["LatencyPercentile"], 3.33);
        assert_eq!(parsed["Failed"], 1);
        assert!(line.starts_with(r#"{"time":2,"tps":4.0,"StockLevel""#));
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("csv".parse::<ReportFormat>().unwrap(), ReportFormat::Csv);
        assert_eq!("json".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("default".parse::<ReportFormat>().unwrap(), ReportFormat::Default);
        assert!("xml".parse::<ReportFormat>().is_err());
    }
}
