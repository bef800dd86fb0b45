//! Dataset loader tests.

use tpcc_core::{
    backend::StorageBackend,
    loader::{BatchWriter, Loader},
    models::{NewOrder, Row},
    name_generator::NameGenerator,
    scale::ScaleParameters,
    store::SqliteBackend,
    types::{BAD_CREDIT, GOOD_CREDIT},
};

fn loaded(scale: ScaleParameters) -> SqliteBackend {
    let mut store = SqliteBackend::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    Loader::new(&mut store, scale, 42, 512)
        .load_all()
        .expect("load dataset");
    store
}

#[test]
fn districts_start_after_the_last_loaded_order() {
    let scale = ScaleParameters::tpcc(100.0, 2).expect("scale");
    let mut store = loaded(scale);

    for w_id in 1..=2 {
        for d_id in 1..=scale.districts_per_warehouse {
            let district = store.district(w_id, d_id).unwrap().expect("district row");
            assert_eq!(district.next_o_id, scale.customers_per_district + 1);
            assert!(
                store.order(w_id, d_id, scale.customers_per_district).unwrap().is_some(),
                "last loaded order exists"
            );
        }
    }
}

#[test]
fn newest_orders_are_undelivered() {
    let scale = ScaleParameters::tpcc(100.0, 1).expect("scale");
    let mut store = loaded(scale);

    let first_new = scale.customers_per_district - scale.new_orders_per_district + 1;
    let oldest = store.oldest_new_order(1, 1).unwrap().expect("new-order marker");
    assert_eq!(oldest.o_id, first_new);

    let undelivered = store.order(1, 1, first_new).unwrap().expect("order");
    assert_eq!(undelivered.carrier_id, 0);
    assert!(undelivered.lines.iter().all(|l| l.delivery_d.is_none()));
    assert!((5..=15).contains(&undelivered.lines.len()));

    let delivered = store.order(1, 1, first_new - 1).unwrap().expect("order");
    assert!((1..=10).contains(&delivered.carrier_id));
    assert!(delivered.lines.iter().all(|l| l.delivery_d.is_some()));
}

#[test]
fn every_item_has_stock_in_every_warehouse() {
    let scale = ScaleParameters::tpcc(100.0, 2).expect("scale");
    let mut store = loaded(scale);

    let ids: Vec<i32> = (1..=scale.item_count).collect();
    assert_eq!(store.items(&ids).unwrap().len(), scale.item_count as usize);

    let keys: Vec<(i32, i32)> = (1..=2)
        .flat_map(|w| (1..=scale.item_count).map(move |i| (w, i)))
        .collect();
    let stocks = store.stocks(&keys).unwrap();
    assert_eq!(stocks.len(), keys.len());
    assert!(stocks.iter().all(|s| (10..=100).contains(&s.quantity)));
    assert!(stocks.iter().all(|s| s.dists.len() == 10));

    let original = store
        .items(&ids)
        .unwrap()
        .iter()
        .filter(|i| i.data.contains("ORIGINAL"))
        .count();
    assert_eq!(original, scale.item_count as usize / 10);
}

#[test]
fn customers_get_syllable_names_and_ten_percent_bad_credit() {
    let scale = ScaleParameters::tpcc(100.0, 1).expect("scale");
    let mut store = loaded(scale);

    let mut bad = 0;
    for c_id in 1..=scale.customers_per_district {
        let customer = store.customer(1, 1, c_id).unwrap().expect("customer");
        assert_eq!(customer.last, NameGenerator::last_name(c_id - 1));
        match customer.credit.as_str() {
            BAD_CREDIT => bad += 1,
            GOOD_CREDIT => {}
            other => panic!("unexpected credit {other}"),
        }
    }
    assert_eq!(bad, scale.customers_per_district / 10);
}

#[test]
fn batch_writer_flushes_every_batch_size_rows() {
    let mut store = SqliteBackend::in_memory().expect("in-memory store");
    store.migrate().expect("migration");

    let mut writer = BatchWriter::new(&mut store, 3);
    for o_id in 1..=7 {
        writer
            .push(Row::NewOrder(NewOrder { o_id, d_id: 1, w_id: 1 }))
            .unwrap();
    }
    assert_eq!(writer.written(), 6, "two full batches flushed, one row buffered");
    writer.flush().unwrap();
    assert_eq!(writer.written(), 7);

    let oldest = store.oldest_new_order(1, 1).unwrap().expect("marker");
    assert_eq!(oldest.o_id, 1);
}
