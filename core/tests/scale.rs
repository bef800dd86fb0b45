//! Scale model tests.

use tpcc_core::{
    error::DriverError,
    scale::{compute_scale, ScaleParameters},
};

#[test]
fn compute_scale_floors_scalable_baselines() {
    let scale = compute_scale(3.0, 100, 4, 10, 3000, 900).expect("valid scale");
    assert_eq!(scale.item_count, 33, "100 / 3 floors to 33");
    assert_eq!(scale.customers_per_district, 1000);
    assert_eq!(scale.new_orders_per_district, 300);
    assert_eq!(scale.warehouse_count, 4, "warehouses are never scaled");
    assert_eq!(scale.districts_per_warehouse, 10, "districts are never scaled");
}

#[test]
fn fractional_scale_factor_grows_population() {
    let scale = compute_scale(0.5, 100_000, 1, 10, 3000, 900).expect("valid scale");
    assert_eq!(scale.item_count, 200_000);
    assert_eq!(scale.customers_per_district, 6000);
}

#[test]
fn non_positive_scale_factor_is_rejected() {
    for factor in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let result = compute_scale(factor, 100_000, 1, 10, 3000, 900);
        assert!(
            matches!(result, Err(DriverError::InvalidConfig(_))),
            "scale factor {factor} should be rejected"
        );
    }
}

#[test]
fn tpcc_baselines_at_scale_one() {
    let scale = ScaleParameters::tpcc(1.0, 2).expect("valid scale");
    assert_eq!(scale.item_count, 100_000);
    assert_eq!(scale.customers_per_district, 3_000);
    assert_eq!(scale.new_orders_per_district, 900);
    assert_eq!(scale.districts_per_warehouse, 10);
    assert_eq!(scale.warehouse_count, 2);
}
