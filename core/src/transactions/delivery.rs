use crate::{
    backend::{Field, FieldUpdate, RowKey, StorageBackend},
    error::{DriverError, DriverResult},
    models::NewOrder,
    types::{DistrictId, OrderId, WarehouseId},
};
use chrono::{DateTime, Utc};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryParams {
    pub w_id: WarehouseId,
    pub carrier_id: i32,
    pub delivery_d: DateTime<Utc>,
    /// Districts 1..=district_count are processed in order.
    pub district_count: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryOutcome {
    pub delivered: Vec<(DistrictId, OrderId)>,
    /// Districts with no undelivered order.
    pub skipped: usize,
}

pub fn execute(
    backend: &mut dyn StorageBackend,
    params: &DeliveryParams,
) -> DriverResult<DeliveryOutcome> {
    let mut outcome = DeliveryOutcome::default();
    for d_id in 1..=params.district_count {
        match deliver_district(backend, params, d_id)? {
            Some(o_id) => outcome.delivered.push((d_id, o_id)),
            None => {
                debug!("delivery: w_id={} d_id={d_id} has no new orders, skipping", params.w_id);
                outcome.skipped += 1;
            }
        }
    }
    Ok(outcome)
}

fn take_oldest(
    backend: &mut dyn StorageBackend,
    w_id: WarehouseId,
    d_id: DistrictId,
) -> DriverResult<Option<NewOrder>> {
    if backend.capabilities().supports_atomic_update_read {
        return backend.pop_oldest_new_order(w_id, d_id);
    }
    let Some(oldest) = backend.oldest_new_order(w_id, d_id)? else {
        return Ok(None);
    };
    backend.delete(&RowKey::NewOrder {
        w_id,
        d_id,
        o_id: oldest.o_id,
    })?;
    Ok(Some(oldest))
}

fn deliver_district(
    backend: &mut dyn StorageBackend,
    params: &DeliveryParams,
    d_id: DistrictId,
) -> DriverResult<Option<OrderId>> {
    let w_id = params.w_id;
    let Some(new_order) = take_oldest(backend, w_id, d_id)? else {
        return Ok(None);
    };
    let o_id = new_order.o_id;

    let order = backend
        .order(w_id, d_id, o_id)?
        .ok_or(DriverError::NotFound { table: "orders" })?;

    backend.update(
        &RowKey::Order { w_id, d_id, o_id },
        &[FieldUpdate::replace(Field::OrderCarrierId, params.carrier_id)],
    )?;
    backend.update(
        &RowKey::OrderLines { w_id, d_id, o_id },
        &[FieldUpdate::replace(Field::OrderLineDeliveryDate, params.delivery_d)],
    )?;

    let amount: f64 = order.lines.iter().map(|l| l.amount).sum();
    backend.update(
        &RowKey::Customer {
            w_id,
            d_id,
            c_id: order.c_id,
        },
        &[
            FieldUpdate::increment(Field::CustomerBalance, amount),
            FieldUpdate::increment(Field::CustomerDeliveryCnt, 1),
        ],
    )?;

    Ok(Some(o_id))
}
