//! Payment protocol tests.

use chrono::Utc;
use tpcc_core::{
    backend::StorageBackend,
    error::DriverError,
    loader::Loader,
    models::Row,
    name_generator::NameGenerator,
    scale::ScaleParameters,
    store::SqliteBackend,
    transactions::{
        payment::{self, PaymentParams},
        CustomerSelector,
    },
    types::{BAD_CREDIT, MAX_C_DATA},
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

fn params(customer: CustomerSelector, amount: f64) -> PaymentParams {
    PaymentParams {
        w_id: 1,
        d_id: 2,
        amount,
        c_w_id: 1,
        c_d_id: 2,
        customer,
        date: Utc::now(),
        bad_credit: BAD_CREDIT.to_string(),
        max_data_len: MAX_C_DATA,
    }
}

#[test]
fn payment_moves_money_through_warehouse_district_and_customer() {
    let mut store = loaded();
    let w_before = store.warehouse(1).unwrap().unwrap();
    let d_before = store.district(1, 2).unwrap().unwrap();
    let c_before = store.customer(1, 2, 5).unwrap().unwrap();

    let outcome =
        payment::execute(&mut store, &params(CustomerSelector::Id(5), 100.0)).expect("payment");

    let w_after = store.warehouse(1).unwrap().unwrap();
    let d_after = store.district(1, 2).unwrap().unwrap();
    let c_after = store.customer(1, 2, 5).unwrap().unwrap();

    assert_eq!(outcome.c_id, 5);
    assert!((w_after.ytd - w_before.ytd - 100.0).abs() < 1e-9);
    assert!((d_after.ytd - d_before.ytd - 100.0).abs() < 1e-9);
    assert!((c_after.balance - (c_before.balance - 100.0)).abs() < 1e-9);
    assert!((c_after.ytd_payment - (c_before.ytd_payment + 100.0)).abs() < 1e-9);
    assert_eq!(c_after.payment_cnt, c_before.payment_cnt + 1);
}

#[test]
fn remote_customer_is_resolved_in_its_home_district() {
    let mut store = loaded();
    let c_before = store.customer(2, 4, 9).unwrap().unwrap();

    let mut p = params(CustomerSelector::Id(9), 42.0);
    p.c_w_id = 2;
    p.c_d_id = 4;
    payment::execute(&mut store, &p).expect("payment");

    let c_after = store.customer(2, 4, 9).unwrap().unwrap();
    assert_eq!(c_after.payment_cnt, c_before.payment_cnt + 1);
}

#[test]
fn last_name_lookup_takes_lower_median_by_first_name() {
    let mut store = loaded();
    let template = store.customer(1, 2, 3).unwrap().unwrap();

    // Loaded first names are lowercase, so these sort ahead of the original.
    for (c_id, first) in [(101, "AAAA"), (102, "BBBB"), (103, "CCCC")] {
        let mut twin = template.clone();
        twin.c_id = c_id;
        twin.first = first.to_string();
        store.insert(&Row::Customer(twin)).unwrap();
    }

    let matches = store
        .customers_by_last_name(1, 2, &template.last)
        .unwrap();
    assert_eq!(matches.len(), 4);

    let outcome = payment::execute(
        &mut store,
        &params(CustomerSelector::LastName(template.last.clone()), 10.0),
    )
    .expect("payment");
    assert_eq!(outcome.c_id, 102, "index (4 - 1) / 2 = 1 in first-name order");
}

#[test]
fn bad_credit_customer_gets_audit_prefix() {
    let mut store = loaded();
    let bad = (1..=30)
        .filter_map(|c_id| store.customer(1, 2, c_id).unwrap())
        .find(|c| c.credit == BAD_CREDIT)
        .expect("loader marks 10% bad credit");

    let outcome =
        payment::execute(&mut store, &params(CustomerSelector::Id(bad.c_id), 12.5)).expect("payment");
    assert!(outcome.bad_credit);

    let after = store.customer(1, 2, bad.c_id).unwrap().unwrap();
    let prefix = format!("{} 2 1 2 1 12.50|", bad.c_id);
    assert!(after.data.starts_with(&prefix), "data was: {}", after.data);
    assert!(after.data.chars().count() <= MAX_C_DATA);
    assert!(after.data[prefix.len()..].chars().all(|c| c.is_ascii_lowercase()));
}

#[test]
fn unknown_last_name_is_customer_not_found() {
    let mut store = loaded();
    let result = payment::execute(
        &mut store,
        &params(CustomerSelector::LastName("NOSUCHNAME".to_string()), 5.0),
    );
    assert!(matches!(result, Err(DriverError::CustomerNotFound)));
    assert!(result.unwrap_err().is_expected_abort());
}

#[test]
fn loaded_names_resolve_by_last_name() {
    let mut store = loaded();
    let last = NameGenerator::last_name(10);
    let outcome = payment::execute(
        &mut store,
        &params(CustomerSelector::LastName(last), 1.0),
    )
    .expect("payment");
    assert_eq!(outcome.c_id, 11, "customer 11 carries syllable name 10");
}
