//! Live statistics aggregation.
//!
//! RULE: The aggregator is the sole owner of counters and latency buffers.
//! Workers never touch them; they only send CompletionEvents.
//!
//! Lifecycle: Collecting → (per tick) Reporting → Collecting … →
//! Terminated once the run timer fires and the grace period has drained.

use crate::{
    cancel::CancellationToken,
    error::DriverResult,
    event::{CompletionEvent, TransactionType},
    report::{ReportFormat, WindowReport},
    types::WorkerId,
};
use crossbeam::channel::{after, never, select, tick, Receiver};
use log::{debug, info};
use serde::Serialize;
use std::{collections::HashMap, io::Write, time::Duration};

/// Added to the run timer so a report tick due at the same instant fires first.
const DEADLINE_SLACK: Duration = Duration::from_millis(99);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Collecting,
    Reporting,
    Terminated,
}

/// Per-type completion counts plus failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub by_type: [u64; 5],
    pub failed: u64,
}

impl Counters {
    fn record(&mut self, event: &CompletionEvent) {
        self.by_type[event.transaction_type.index()] += 1;
        if event.failed {
            self.failed += 1;
        }
    }

    fn add(&mut self, other: &Counters) {
        for (mine, theirs) in self.by_type.iter_mut().zip(other.by_type) {
            *mine += theirs;
        }
        self.failed += other.failed;
    }

    pub fn count(&self, ty: TransactionType) -> u64 {
        self.by_type[ty.index()]
    }

    pub fn total(&self) -> u64 {
        self.by_type.iter().sum()
    }
}

/// Lifetime totals returned when the run ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub totals: Counters,
    pub workers: usize,
    pub reports: u64,
    pub elapsed_secs: u64,
}

/// Nearest-rank percentile: sorts `samples` in place and returns the
/// element at 1-based rank round(p/100 × n), clamped to [1, n].
/// An empty buffer yields 0.
pub fn percentile(samples: &mut [f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.sort_unstable_by(f64::total_cmp);
    let n = samples.len();
    let rank = ((p / 100.0) * n as f64).round() as usize;
    samples[rank.clamp(1, n) - 1]
}

pub struct StatsAggregator<W: Write> {
    state: AggregatorState,
    interval: Duration,
    percentile: f64,
    format: ReportFormat,
    lifetime: HashMap<WorkerId, Counters>,
    window: HashMap<WorkerId, Counters>,
    latencies: [Vec<f64>; 5],
    elapsed_secs: u64,
    reports: u64,
    out: W,
}

impl<W: Write> StatsAggregator<W> {
    pub fn new(interval: Duration, percentile: f64, format: ReportFormat, out: W) -> Self {
        Self {
            state: AggregatorState::Collecting,
            interval,
            percentile,
            format,
            lifetime: HashMap::new(),
            window: HashMap::new(),
            latencies: Default::default(),
            elapsed_secs: 0,
            reports: 0,
            out,
        }
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Count one event in the worker's lifetime and window counters.
    pub fn record(&mut self, event: &CompletionEvent) {
        self.lifetime.entry(event.worker_id).or_default().record(event);
        self.window.entry(event.worker_id).or_default().record(event);
        self.latencies[event.transaction_type.index()].push(event.latency_ms);
    }

    /// Close the current window: emit one report line and reset the
    /// window counters and latency buffers.
    pub fn tick(&mut self) -> DriverResult<WindowReport> {
        self.state = AggregatorState::Reporting;

        let mut window = Counters::default();
        for counters in self.window.values() {
            window.add(counters);
        }
        self.elapsed_secs += self.interval.as_secs();

        let mut latencies = [0.0; 5];
        for (slot, samples) in latencies.iter_mut().zip(self.latencies.iter_mut()) {
            *slot = percentile(samples, self.percentile);
        }

        let interval_secs = self.interval.as_secs_f64();
        let report = WindowReport {
            elapsed_secs: self.elapsed_secs,
            tps: if interval_secs > 0.0 {
                window.total() as f64 / interval_secs
            } else {
                0.0
            },
            counts: window.by_type,
            latencies,
            failed: window.failed,
        };
        writeln!(self.out, "{}", self.format.format_line(&report)?)?;
        self.out.flush()?;

        self.window.clear();
        self.latencies.iter_mut().for_each(Vec::clear);
        self.reports += 1;
        self.state = AggregatorState::Collecting;
        Ok(report)
    }

    /// Sum of every worker's lifetime counters.
    pub fn summary(&self) -> RunSummary {
        let mut totals = Counters::default();
        for counters in self.lifetime.values() {
            totals.add(counters);
        }
        RunSummary {
            totals,
            workers: self.lifetime.len(),
            reports: self.reports,
            elapsed_secs: self.elapsed_secs,
        }
    }

    /// Consume events and emit one report per interval until `run_for`
    /// elapses. Then cancel the workers, keep draining for `grace` into
    /// the lifetime counters only, and terminate.
    pub fn run(
        &mut self,
        events: &Receiver<CompletionEvent>,
        run_for: Duration,
        grace: Duration,
        cancel: &CancellationToken,
    ) -> DriverResult<RunSummary> {
        if let Some(header) = self.format.header() {
            writeln!(self.out, "{header}")?;
        }

        let ticker = tick(self.interval);
        let deadline = after(run_for + DEADLINE_SLACK);
        let mut inbox = events.clone();

        loop {
            let mut disconnected = false;
            let timed_out = select! {
                recv(inbox) -> msg => {
                    match msg {
                        Ok(event) => self.record(&event),
                        Err(_) => disconnected = true,
                    }
                    false
                }
                recv(ticker) -> _ => {
                    self.tick()?;
                    false
                }
                recv(deadline) -> _ => true,
            };
            if timed_out {
                break;
            }
            if disconnected {
                debug!("event queue disconnected before the run timer fired");
                inbox = never();
            }
        }

        info!("run timer fired, cancelling workers");
        cancel.cancel();
        let drained = self.drain(events, grace);
        debug!("drained {drained} events during the grace period");

        self.state = AggregatorState::Terminated;
        Ok(self.summary())
    }

    fn drain(&mut self, events: &Receiver<CompletionEvent>, grace: Duration) -> u64 {
        let until = after(grace);
        let mut drained = 0;
        loop {
            let event = select! {
                recv(events) -> msg => msg.ok(),
                recv(until) -> _ => None,
            };
            let Some(event) = event else {
                return drained;
            };
            self.lifetime.entry(event.worker_id).or_default().record(&event);
            drained += 1;
        }
    }
}
