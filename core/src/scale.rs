//! Population cardinalities derived from the scale factor.

use crate::{
    error::{DriverError, DriverResult},
    types::{
        CUSTOMERS_PER_DISTRICT, DISTRICTS_PER_WAREHOUSE, INITIAL_NEW_ORDERS_PER_DISTRICT,
        NUM_ITEMS,
    },
};
use serde::{Deserialize, Serialize};

/// Computed once per run and shared read-only by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleParameters {
    pub item_count: i32,
    pub warehouse_count: i32,
    pub districts_per_warehouse: i32,
    pub customers_per_district: i32,
    pub new_orders_per_district: i32,
}

impl ScaleParameters {
    /// Scale the TPC-C baselines. Districts per warehouse stay at 10.
    pub fn tpcc(scale_factor: f64, warehouses: i32) -> DriverResult<Self> {
        compute_scale(
            scale_factor,
            NUM_ITEMS,
            warehouses,
            DISTRICTS_PER_WAREHOUSE,
            CUSTOMERS_PER_DISTRICT,
            INITIAL_NEW_ORDERS_PER_DISTRICT,
        )
    }
}

/// Divide the scalable baselines by `scale_factor` (floor).
/// `warehouses` and `base_districts` pass through unscaled.
pub fn compute_scale(
    scale_factor: f64,
    base_items: i32,
    warehouses: i32,
    base_districts: i32,
    base_customers: i32,
    base_new_orders: i32,
) -> DriverResult<ScaleParameters> {
    if !scale_factor.is_finite() || scale_factor <= 0.0 {
        return Err(DriverError::InvalidConfig(format!(
            "scale factor must be > 0, got {scale_factor}"
        )));
    }

    let scaled = |base: i32| (base as f64 / scale_factor).floor() as i32;

    Ok(ScaleParameters {
        item_count: scaled(base_items),
        warehouse_count: warehouses,
        districts_per_warehouse: base_districts,
        customers_per_district: scaled(base_customers),
        new_orders_per_district: scaled(base_new_orders),
    })
}
