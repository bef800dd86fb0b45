//! The five TPC-C business transactions.
//!
//! RULE: Protocols receive already-valid parameters and a backend session.
//! They never open their own transaction scope (see retry.rs) and never
//! branch on which backend they hold, only on its Capabilities.

pub mod delivery;
pub mod new_order;
pub mod order_status;
pub mod payment;
pub mod stock_level;

use crate::{
    backend::StorageBackend,
    error::{DriverError, DriverResult},
    models::Customer,
    types::{CustomerId, DistrictId, WarehouseId},
};

/// How Payment and Order-Status identify their customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerSelector {
    Id(CustomerId),
    LastName(String),
}

/// Resolve a customer by id, or by last name taking the median match
/// in first-name order. Zero matches is `CustomerNotFound`.
pub fn resolve_customer(
    backend: &mut dyn StorageBackend,
    w_id: WarehouseId,
    d_id: DistrictId,
    selector: &CustomerSelector,
) -> DriverResult<Customer> {
    match selector {
        CustomerSelector::Id(c_id) => backend
            .customer(w_id, d_id, *c_id)?
            .ok_or(DriverError::CustomerNotFound),
        CustomerSelector::LastName(last) => {
            let mut matches = backend.customers_by_last_name(w_id, d_id, last)?;
            if matches.is_empty() {
                return Err(DriverError::CustomerNotFound);
            }
            let idx = median_index(matches.len());
            Ok(matches.swap_remove(idx))
        }
    }
}

/// Index of the customer picked from `count >= 1` last-name matches:
/// the lower median, ⌊(count − 1) / 2⌋.
pub fn median_index(count: usize) -> usize {
    count.saturating_sub(1) / 2
}

/// Stock quantity after ordering `ordered` units.
/// Restocks by 91 when fewer than 10 units would remain.
pub fn wrap_stock_quantity(current: i32, ordered: i32) -> i32 {
    if current >= ordered + 10 {
        current - ordered
    } else {
        current + 91 - ordered
    }
}

/// Bad-credit customer data after a payment: an audit prefix in front of
/// the old data, cut to `max_len` characters.
#[allow(clippy::too_many_arguments)]
pub fn payment_audit_data(
    c_id: CustomerId,
    c_d_id: DistrictId,
    c_w_id: WarehouseId,
    d_id: DistrictId,
    w_id: WarehouseId,
    amount: f64,
    old_data: &str,
    max_len: usize,
) -> String {
    let full = format!("{c_id} {c_d_id} {c_w_id} {d_id} {w_id} {amount:.2}|{old_data}");
    full.chars().take(max_len).collect()
}

/// History row data: warehouse and district names separated by four spaces.
pub fn history_data(warehouse_name: &str, district_name: &str) -> String {
    format!("{warehouse_name}    {district_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_count_is_lower_middle() {
        assert_eq!(median_index(1), 0);
        assert_eq!(median_index(2), 0);
        assert_eq!(median_index(3), 1);
        assert_eq!(median_index(4), 1);
        assert_eq!(median_index(5), 2);
    }

    #[test]
    fn stock_wraps_when_low() {
        assert_eq!(wrap_stock_quantity(15, 10), 96);
        assert_eq!(wrap_stock_quantity(25, 10), 15);
        assert_eq!(wrap_stock_quantity(20, 10), 10);
    }

    #[test]
    fn audit_data_is_prefixed_and_truncated() {
        let data = payment_audit_data(7, 2, 1, 3, 1, 12.5, "old", 500);
        assert_eq!(data, "7 2 1 3 1 12.50|old");

        let long = "x".repeat(600);
        let cut = payment_audit_data(7, 2, 1, 3, 1, 12.5, &long, 500);
        assert_eq!(cut.chars().count(), 500);
        assert!(cut.starts_with("7 2 1 3 1 12.50|x"));
    }

    #[test]
    fn history_data_joins_with_four_spaces() {
        assert_eq!(history_data("W1", "D1"), "W1    D1");
    }
}
