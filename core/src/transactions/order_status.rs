use super::{resolve_customer, CustomerSelector};
use crate::{
    backend::StorageBackend,
    error::{DriverError, DriverResult},
    models::{Customer, Order},
    types::{DistrictId, WarehouseId},
};

#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusParams {
    pub w_id: WarehouseId,
    pub d_id: DistrictId,
    pub customer: CustomerSelector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderStatusOutcome {
    pub customer: Customer,
    /// Most recent order, lines included.
    pub order: Order,
}

/// Read-only. The executor still runs it inside the retry envelope.
pub fn execute(
    backend: &mut dyn StorageBackend,
    params: &OrderStatusParams,
) -> DriverResult<OrderStatusOutcome> {
    let customer = resolve_customer(backend, params.w_id, params.d_id, &params.customer)?;
    let order = backend
        .latest_order(params.w_id, params.d_id, customer.c_id)?
        .ok_or(DriverError::OrderNotFound)?;
    Ok(OrderStatusOutcome { customer, order })
}
