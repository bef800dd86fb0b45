//! Aggregator lifecycle over a real event queue.

use crossbeam::channel::bounded;
use std::{thread, time::Duration};
use tpcc_core::{
    cancel::CancellationToken,
    event::{CompletionEvent, TransactionType},
    report::ReportFormat,
    stats::{AggregatorState, StatsAggregator},
};

fn event(worker_id: usize, ty: TransactionType, failed: bool, latency_ms: f64) -> CompletionEvent {
    CompletionEvent {
        worker_id,
        transaction_type: ty,
        failed,
        latency_ms,
    }
}

#[test]
fn reports_first_window_then_terminates_and_cancels() {
    let (tx, rx) = bounded(16);
    let senders: Vec<_> = (0..2)
        .map(|worker| {
            let tx = tx.clone();
            thread::spawn(move || {
                tx.send(event(worker, TransactionType::NewOrder, false, 5.0)).unwrap();
                tx.send(event(worker, TransactionType::Payment, true, 9.0)).unwrap();
            })
        })
        .collect();
    drop(tx);
    for s in senders {
        s.join().unwrap();
    }

    let cancel = CancellationToken::new();
    let mut agg = StatsAggregator::new(
        Duration::from_secs(1),
        95.0,
        ReportFormat::Default,
        Vec::new(),
    );
    let summary = agg
        .run(
            &rx,
            Duration::from_millis(1_500),
            Duration::from_millis(100),
            &cancel,
        )
        .expect("aggregator run");

    assert!(cancel.is_cancelled(), "run timer cancels the workers");
    assert_eq!(agg.state(), AggregatorState::Terminated);
    assert_eq!(summary.totals.total(), 4);
    assert_eq!(summary.totals.failed, 2);
    assert_eq!(summary.totals.count(TransactionType::Payment), 2);
    assert_eq!(summary.workers, 2);

    let out = String::from_utf8(agg.into_output()).unwrap();
    assert_eq!(
        out.lines().next().unwrap(),
        "[ 1s ] TPS: 4.00 StockLevel: 0 (0.00 ms) Delivery: 0 (0.00 ms) \
         OrderStatus: 0 (0.00 ms) Payment: 2 (9.00 ms) NewOrder: 2 (5.00 ms) Failed: 2"
    );
}

#[test]
fn csv_header_is_written_before_any_window() {
    let (tx, rx) = bounded::<CompletionEvent>(1);
    drop(tx);
    let cancel = CancellationToken::new();
    let mut agg = StatsAggregator::new(Duration::from_secs(5), 95.0, ReportFormat::Csv, Vec::new());
    let summary = agg
        .run(&rx, Duration::from_millis(50), Duration::from_millis(10), &cancel)
        .expect("aggregator run");

    assert_eq!(summary.totals.total(), 0);
    let out = String::from_utf8(agg.into_output()).unwrap();
    assert_eq!(out.lines().collect::<Vec<_>>(), vec![tpcc_core::report::CSV_HEADER]);
}

#[test]
fn events_after_the_run_timer_count_only_in_totals() {
    let (tx, rx) = bounded(16);
    let cancel = CancellationToken::new();
    let late = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            tx.send(event(0, TransactionType::Delivery, false, 1.0)).unwrap();
        })
    };

    let mut agg = StatsAggregator::new(Duration::from_secs(5), 95.0, ReportFormat::Csv, Vec::new());
    let summary = agg
        .run(&rx, Duration::from_millis(50), Duration::from_millis(500), &cancel)
        .expect("aggregator run");
    late.join().unwrap();

    assert_eq!(summary.totals.count(TransactionType::Delivery), 1);
    assert_eq!(summary.reports, 0, "no interval elapsed");
}

#[test]
fn window_due_with_the_run_timer_is_still_reported() {
    for _ in 0..3 {
        let (tx, rx) = bounded(16);
        tx.send(event(0, TransactionType::NewOrder, false, 2.0)).unwrap();
        drop(tx);

        let cancel = CancellationToken::new();
        let mut agg =
            StatsAggregator::new(Duration::from_secs(1), 95.0, ReportFormat::Csv, Vec::new());
        let summary = agg
            .run(&rx, Duration::from_secs(2), Duration::from_millis(1), &cancel)
            .expect("aggregator run");

        assert_eq!(summary.reports, 2, "one line per elapsed interval");
        let out = String::from_utf8(agg.into_output()).unwrap();
        let last = out.lines().last().unwrap();
        assert!(last.starts_with("2,"), "final window printed, got {last}");
    }
}
