//! Run orchestration: validate, connect, spawn, aggregate, join.
//!
//! RULE: Every worker session is opened before any worker starts.
//! A connection failure aborts the run with nothing spawned.

use crate::{
    backend::{open_backend, StorageBackend},
    cancel::CancellationToken,
    config::{RunConfig, DEFAULT_EVENT_QUEUE_CAPACITY},
    error::{DriverError, DriverResult},
    executor::Executor,
    scale::ScaleParameters,
    stats::{RunSummary, StatsAggregator},
    worker::Worker,
};
use crossbeam::channel::bounded;
use log::{info, warn};
use std::{io::Write, sync::Arc, thread};

/// Run the configured workload and write one report line per interval
/// to `out`. Returns lifetime totals once every worker has stopped.
pub fn run_benchmark<W: Write>(config: &RunConfig, out: W) -> DriverResult<RunSummary> {
    config.validate()?;
    let scale = ScaleParameters::tpcc(config.scale_factor, config.warehouses)?;
    if scale.item_count < 1 || scale.customers_per_district < 1 {
        return Err(DriverError::InvalidConfig(format!(
            "scalefactor {} leaves an empty population ({} items, {} customers per district)",
            config.scale_factor, scale.item_count, scale.customers_per_district
        )));
    }

    let sessions = (0..config.threads)
        .map(|_| open_backend(&config.connection))
        .collect::<DriverResult<Vec<_>>>()?;
    run_with_sessions(config, scale, sessions, out)
}

/// Same as `run_benchmark` with caller-supplied sessions, one per worker.
pub fn run_with_sessions<W: Write>(
    config: &RunConfig,
    scale: ScaleParameters,
    sessions: Vec<Box<dyn StorageBackend>>,
    out: W,
) -> DriverResult<RunSummary> {
    let scale = Arc::new(scale);
    let cancel = CancellationToken::new();
    let (tx, rx) = bounded(DEFAULT_EVENT_QUEUE_CAPACITY);

    info!(
        "starting run: {} workers, {} warehouses, {}s, transactions={}",
        sessions.len(),
        scale.warehouse_count,
        config.time,
        config.transactions
    );

    let mut handles = Vec::with_capacity(sessions.len());
    for (id, backend) in sessions.into_iter().enumerate() {
        let worker = Worker::new(
            id,
            Executor::new(backend, config.transactions, config.retries),
            config.seed,
            Arc::clone(&scale),
            config.percent_fail,
            tx.clone(),
            cancel.clone(),
        );
        let spawned = thread::Builder::new()
            .name(format!("tpcc-worker-{id}"))
            .spawn(move || worker.run());
        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                cancel.cancel();
                return Err(e.into());
            }
        }
    }
    drop(tx);

    let mut aggregator = StatsAggregator::new(
        config.report_every(),
        config.percentile,
        config.report_format,
        out,
    );
    let result = aggregator.run(&rx, config.run_duration(), config.grace_period(), &cancel);

    // Workers blocked on a full queue see the disconnect and stop.
    cancel.cancel();
    drop(rx);
    for (id, handle) in handles.into_iter().enumerate() {
        if handle.join().is_err() {
            warn!("worker {id} panicked");
        }
    }

    let summary = result?;
    info!(
        "run finished: {} transactions, {} failed",
        summary.totals.total(),
        summary.totals.failed
    );
    Ok(summary)
}
