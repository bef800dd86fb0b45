use super::{history_data, payment_audit_data, resolve_customer, CustomerSelector};
use crate::{
    backend::{Field, FieldUpdate, RowKey, StorageBackend},
    error::{DriverError, DriverResult},
    models::{History, Row},
    types::{CustomerId, DistrictId, WarehouseId},
};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentParams {
    pub w_id: WarehouseId,
    pub d_id: DistrictId,
    pub amount: f64,
    /// Customer's home warehouse and district (remote for ~15% of payments).
    pub c_w_id: WarehouseId,
    pub c_d_id: DistrictId,
    pub customer: CustomerSelector,
    pub date: DateTime<Utc>,
    pub bad_credit: String,
    pub max_data_len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub c_id: CustomerId,
    pub balance: f64,
    pub bad_credit: bool,
}

pub fn execute(
    backend: &mut dyn StorageBackend,
    params: &PaymentParams,
) -> DriverResult<PaymentOutcome> {
    let (w_id, d_id, amount) = (params.w_id, params.d_id, params.amount);

    backend.update(
        &RowKey::Warehouse { w_id },
        &[FieldUpdate::increment(Field::WarehouseYtd, amount)],
    )?;
    let warehouse = backend
        .warehouse(w_id)?
        .ok_or(DriverError::NotFound { table: "warehouse" })?;

    backend.update(
        &RowKey::District { w_id, d_id },
        &[FieldUpdate::increment(Field::DistrictYtd, amount)],
    )?;
    let district = backend
        .district(w_id, d_id)?
        .ok_or(DriverError::NotFound { table: "district" })?;

    let customer = resolve_customer(backend, params.c_w_id, params.c_d_id, &params.customer)?;
    let bad_credit = customer.credit == params.bad_credit;

    let mut changes = vec![
        FieldUpdate::increment(Field::CustomerBalance, -amount),
        FieldUpdate::increment(Field::CustomerYtdPayment, amount),
        FieldUpdate::increment(Field::CustomerPaymentCnt, 1),
    ];
    if bad_credit {
        let data = payment_audit_data(
            customer.c_id,
            customer.d_id,
            customer.w_id,
            d_id,
            w_id,
            amount,
            &customer.data,
            params.max_data_len,
        );
        changes.push(FieldUpdate::replace(Field::CustomerData, data));
    }
    backend.update(
        &RowKey::Customer {
            w_id: customer.w_id,
            d_id: customer.d_id,
            c_id: customer.c_id,
        },
        &changes,
    )?;

    backend.insert(&Row::History(History {
        c_id: customer.c_id,
        c_d_id: customer.d_id,
        c_w_id: customer.w_id,
        d_id,
        w_id,
        date: params.date,
        amount,
        data: history_data(&warehouse.name, &district.name),
    }))?;

    Ok(PaymentOutcome {
        c_id: customer.c_id,
        balance: customer.balance - amount,
        bad_credit,
    })
}
