//! tpcc-runner: headless TPC-C workload driver.
//!
//! Usage:
//!   tpcc-runner prepare --uri run.db --warehouses 2 --scalefactor 100
//!   tpcc-runner run --uri run.db --threads 4 --time 10 --report-format csv
//!   tpcc-runner run --uri :memory: --warehouses 1 --scalefactor 100
//!   tpcc-runner run --config run.json --threads 16
//!
//! Flags override values read from --config.

use anyhow::{bail, Result};
use log::info;
use std::env;
use std::io;
use tpcc_core::{
    backend::StorageBackend,
    config::RunConfig,
    driver::run_benchmark,
    error::DriverResult,
    loader::{load_parallel, DEFAULT_BATCH_SIZE},
    report::ReportFormat,
    scale::ScaleParameters,
    store::SqliteBackend,
};
use uuid::Uuid;

const USAGE: &str = "usage: tpcc-runner <prepare|run> [--config FILE] [--dbdriver sqlite] \
[--uri URI] [--db NAME] [--warehouses N] [--scalefactor F] [--threads N] [--time SECS] \
[--report-interval SECS] [--percentile P] [--percent-fail P] [--report-format default|csv|json] \
[--trx] [--retries N] [--seed N] [--batch-size N]";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1).map(String::as_str) else {
        bail!("{USAGE}");
    };
    let config = build_config(&args)?;
    let batch_size = parse_arg(&args, "--batch-size", DEFAULT_BATCH_SIZE);

    match command {
        "prepare" => prepare(&config, batch_size),
        "run" => run(config, batch_size),
        other => bail!("unknown command '{other}'\n{USAGE}"),
    }
}

/// Defaults, then the optional JSON file, then flags.
fn build_config(args: &[String]) -> Result<RunConfig> {
    let mut config = match string_arg(args, "--config") {
        Some(path) => RunConfig::from_json_file(path)?,
        None => RunConfig::default(),
    };

    config.warehouses = parse_arg(args, "--warehouses", config.warehouses);
    config.threads = parse_arg(args, "--threads", config.threads);
    config.scale_factor = parse_arg(args, "--scalefactor", config.scale_factor);
    config.time = parse_arg(args, "--time", config.time);
    config.report_interval = parse_arg(args, "--report-interval", config.report_interval);
    config.percentile = parse_arg(args, "--percentile", config.percentile);
    config.percent_fail = parse_arg(args, "--percent-fail", config.percent_fail);
    config.retries = parse_arg(args, "--retries", config.retries);
    config.seed = parse_arg(args, "--seed", config.seed);
    if args.iter().any(|a| a == "--trx") {
        config.transactions = true;
    }

    if let Some(driver) = string_arg(args, "--dbdriver") {
        config.connection.driver = driver.to_string();
    }
    if let Some(uri) = string_arg(args, "--uri") {
        config.connection.uri = uri.to_string();
    }
    if let Some(db) = string_arg(args, "--db") {
        config.connection.database = db.to_string();
    }
    if let Some(raw) = string_arg(args, "--report-format") {
        config.report_format = raw.parse::<ReportFormat>()?;
    }
    Ok(config)
}

fn prepare(config: &RunConfig, batch_size: usize) -> Result<()> {
    config.validate()?;
    let scale = ScaleParameters::tpcc(config.scale_factor, config.warehouses)?;
    let uri = config.connection.uri.as_str();
    if uri == ":memory:" {
        bail!("prepare needs a persistent --uri; use `run --uri :memory:` for a throwaway dataset");
    }

    println!("tpcc-runner prepare");
    println!("  uri:          {uri}");
    println!("  warehouses:   {}", scale.warehouse_count);
    println!("  items:        {}", scale.item_count);
    println!("  customers:    {} per district", scale.customers_per_district);
    println!();

    let schema = SqliteBackend::open(uri)?;
    schema.migrate()?;
    let rows = load_parallel(
        || open_session(uri, config.connection.atomic_update_read),
        scale,
        config.seed,
        config.threads,
        batch_size,
    )?;
    println!("Loaded {rows} rows.");
    Ok(())
}

fn run(mut config: RunConfig, batch_size: usize) -> Result<()> {
    config.validate()?;

    // A private :memory: database would give every worker its own empty
    // copy. Load one shared-cache dataset instead and hold a session on it
    // for the whole run so it is not dropped.
    let _keeper = if config.connection.uri == ":memory:" {
        let name = format!("tpcc_{}", Uuid::new_v4().simple());
        let uri = SqliteBackend::shared_memory_uri(&name);
        let keeper = SqliteBackend::open(&uri)?;
        keeper.migrate()?;
        let scale = ScaleParameters::tpcc(config.scale_factor, config.warehouses)?;
        info!("preparing in-memory dataset {name}");
        let atomic = config.connection.atomic_update_read;
        // Shared-cache sessions lock whole tables; load on one thread.
        load_parallel(|| open_session(&uri, atomic), scale, config.seed, 1, batch_size)?;
        config.connection.uri = uri;
        Some(keeper)
    } else {
        None
    };

    let summary = run_benchmark(&config, io::stdout())?;
    eprintln!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn open_session(uri: &str, atomic_update_read: bool) -> DriverResult<Box<dyn StorageBackend>> {
    let session = SqliteBackend::open(uri)?.with_atomic_update_read(atomic_update_read);
    Ok(Box::new(session))
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
