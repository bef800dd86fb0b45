//! Delivery protocol tests.

use chrono::Utc;
use tpcc_core::{
    backend::StorageBackend,
    executor::Executor,
    loader::Loader,
    scale::{compute_scale, ScaleParameters},
    store::SqliteBackend,
    transactions::delivery::{self, DeliveryParams},
};

fn loaded(scale: ScaleParameters) -> SqliteBackend {
    let mut store = SqliteBackend::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    Loader::new(&mut store, scale, 42, 512)
        .load_all()
        .expect("load dataset");
    store
}

fn params(district_count: i32) -> DeliveryParams {
    DeliveryParams {
        w_id: 1,
        carrier_id: 7,
        delivery_d: Utc::now(),
        district_count,
    }
}

fn check_delivers_oldest_order_per_district(mut store: SqliteBackend) {
    let first_new = store.oldest_new_order(1, 1).unwrap().expect("marker").o_id;
    let order = store.order(1, 1, first_new).unwrap().unwrap();
    let customer_before = store.customer(1, 1, order.c_id).unwrap().unwrap();

    let outcome = delivery::execute(&mut store, &params(10)).expect("delivery");

    assert_eq!(outcome.delivered.len(), 10);
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.delivered[0], (1, first_new));

    let delivered = store.order(1, 1, first_new).unwrap().unwrap();
    assert_eq!(delivered.carrier_id, 7);
    assert!(delivered.lines.iter().all(|l| l.delivery_d.is_some()));

    let amount: f64 = order.lines.iter().map(|l| l.amount).sum();
    let customer_after = store.customer(1, 1, order.c_id).unwrap().unwrap();
    assert!((customer_after.balance - (customer_before.balance + amount)).abs() < 1e-6);
    assert_eq!(customer_after.delivery_cnt, customer_before.delivery_cnt + 1);

    assert_eq!(
        store.oldest_new_order(1, 1).unwrap().expect("next marker").o_id,
        first_new + 1,
        "delivered marker removed"
    );
}

#[test]
fn delivery_takes_oldest_new_order_in_every_district() {
    let scale = ScaleParameters::tpcc(100.0, 1).expect("scale");
    check_delivers_oldest_order_per_district(loaded(scale));
}

#[test]
fn delivery_without_atomic_pop_behaves_the_same() {
    let scale = ScaleParameters::tpcc(100.0, 1).expect("scale");
    check_delivers_oldest_order_per_district(loaded(scale).with_atomic_update_read(false));
}

#[test]
fn empty_district_is_skipped_not_failed() {
    // No undelivered orders at all.
    let scale = compute_scale(100.0, 100_000, 1, 2, 3_000, 0).expect("scale");
    let mut store = loaded(scale);
    assert!(store.oldest_new_order(1, 1).unwrap().is_none());

    let mut executor = Executor::new(Box::new(store), true, 10);
    let outcome = executor.do_delivery(&params(2)).expect("delivery succeeds");

    assert!(outcome.delivered.is_empty());
    assert_eq!(outcome.skipped, 2);
}

