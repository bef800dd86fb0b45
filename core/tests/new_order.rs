//! New-Order protocol tests.

use chrono::Utc;
use tpcc_core::{
    backend::{RowKey, StorageBackend},
    error::DriverError,
    executor::Executor,
    loader::Loader,
    scale::ScaleParameters,
    store::SqliteBackend,
    transactions::{
        new_order::{self, NewOrderLine, NewOrderParams},
        wrap_stock_quantity,
    },
};

fn loaded() -> SqliteBackend {
    let mut store = SqliteBackend::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    let scale = ScaleParameters::tpcc(100.0, 2).expect("scale");
    Loader::new(&mut store, scale, 42, 512)
        .load_all()
        .expect("load dataset");
    store
}

fn params(i_ids: &[i32]) -> NewOrderParams {
    NewOrderParams {
        w_id: 1,
        d_id: 1,
        c_id: 7,
        entry_d: Utc::now(),
        lines: i_ids
            .iter()
            .map(|&i_id| NewOrderLine {
                i_id,
                supply_w_id: 1,
                quantity: 3,
            })
            .collect(),
    }
}

#[test]
fn new_order_takes_next_order_id_exactly_once() {
    let mut store = loaded();
    let before = store.district(1, 1).unwrap().unwrap().next_o_id;

    let outcome = new_order::execute(&mut store, &params(&[1, 2, 3, 4, 5])).expect("new order");

    assert_eq!(outcome.o_id, before, "order id is the counter value observed");
    assert_eq!(outcome.ol_cnt, 5);
    assert_eq!(
        store.district(1, 1).unwrap().unwrap().next_o_id,
        before + 1,
        "counter incremented exactly once"
    );

    let order = store.order(1, 1, before).unwrap().expect("order inserted");
    assert_eq!(order.c_id, 7);
    assert_eq!(order.carrier_id, 0);
    assert_eq!(order.all_local, 1);
    assert_eq!(order.lines.len(), 5);
    assert!(order.lines.iter().all(|l| l.delivery_d.is_none()));

    store
        .delete(&RowKey::NewOrder {
            w_id: 1,
            d_id: 1,
            o_id: before,
        })
        .expect("new-order marker inserted with the same id");
}

#[test]
fn non_atomic_path_matches_atomic_path() {
    let mut store = loaded().with_atomic_update_read(false);
    assert!(!store.capabilities().supports_atomic_update_read);
    let before = store.district(1, 1).unwrap().unwrap().next_o_id;

    let outcome = new_order::execute(&mut store, &params(&[10, 11, 12, 13, 14])).expect("new order");

    assert_eq!(outcome.o_id, before);
    assert_eq!(store.district(1, 1).unwrap().unwrap().next_o_id, before + 1);
}

#[test]
fn stock_is_updated_and_total_includes_taxes_and_discount() {
    let mut store = loaded();
    let i_ids = [20, 21, 22, 23, 24];
    let keys: Vec<(i32, i32)> = i_ids.iter().map(|&i| (1, i)).collect();
    let stock_before = store.stocks(&keys).unwrap();
    let items = store.items(&i_ids).unwrap();
    let warehouse = store.warehouse(1).unwrap().unwrap();
    let district = store.district(1, 1).unwrap().unwrap();
    let customer = store.customer(1, 1, 7).unwrap().unwrap();

    let outcome = new_order::execute(&mut store, &params(&i_ids)).expect("new order");

    for before in &stock_before {
        let after = &store.stocks(&[(1, before.i_id)]).unwrap()[0];
        assert_eq!(after.quantity, wrap_stock_quantity(before.quantity, 3));
        assert_eq!(after.ytd, before.ytd + 3);
        assert_eq!(after.order_cnt, before.order_cnt + 1);
        assert_eq!(after.remote_cnt, before.remote_cnt, "local lines are not remote");
    }

    let amount: f64 = items.iter().map(|i| 3.0 * i.price).sum();
    let expected = amount * (1.0 - customer.discount) * (1.0 + warehouse.tax + district.tax);
    assert!(
        (outcome.total - expected).abs() < 1e-6,
        "total {} != expected {expected}",
        outcome.total
    );

    let order = store.order(1, 1, outcome.o_id).unwrap().unwrap();
    for line in &order.lines {
        let stock = stock_before.iter().find(|s| s.i_id == line.i_id).unwrap();
        assert_eq!(line.dist_info, stock.dists[0], "dist_info copied from district 1 column");
    }
}

#[test]
fn remote_line_increments_remote_count_and_clears_all_local() {
    let mut store = loaded();
    let before = store.stocks(&[(2, 30)]).unwrap().remove(0);

    let mut p = params(&[30, 31, 32, 33, 34]);
    p.lines[0].supply_w_id = 2;
    let outcome = new_order::execute(&mut store, &p).expect("new order");

    let after = store.stocks(&[(2, 30)]).unwrap().remove(0);
    assert_eq!(after.remote_cnt, before.remote_cnt + 1);
    assert_eq!(after.quantity, wrap_stock_quantity(before.quantity, 3));

    let order = store.order(1, 1, outcome.o_id).unwrap().unwrap();
    assert_eq!(order.all_local, 0);
}

#[test]
fn bad_item_rolls_back_with_transactions() {
    let store = loaded();
    let mut executor = Executor::new(Box::new(store), true, 3);
    assert!(executor.is_transactional());
    let before = executor.backend_mut().district(1, 1).unwrap().unwrap().next_o_id;

    let bad_item = 1_000 + 1; // one past the loaded catalogue
    let result = executor.do_new_order(&params(&[1, 2, 3, 4, bad_item]));

    assert!(matches!(result, Err(DriverError::BadItemRollback)));
    assert_eq!(
        executor.backend_mut().district(1, 1).unwrap().unwrap().next_o_id,
        before,
        "rolled-back New-Order leaves the counter unchanged"
    );
}

#[test]
fn bad_item_without_transactions_keeps_partial_writes() {
    let store = loaded();
    let mut executor = Executor::new(Box::new(store), false, 3);
    let before = executor.backend_mut().district(1, 1).unwrap().unwrap().next_o_id;

    let result = executor.do_new_order(&params(&[1, 2, 3, 4, 1_001]));

    assert!(matches!(result, Err(DriverError::BadItemRollback)));
    assert_eq!(
        executor.backend_mut().district(1, 1).unwrap().unwrap().next_o_id,
        before + 1,
        "single non-transactional attempt, nothing to roll back"
    );
}
