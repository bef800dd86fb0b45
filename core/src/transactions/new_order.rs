use super::wrap_stock_quantity;
use crate::{
    backend::{Field, FieldUpdate, RowKey, StorageBackend},
    error::{DriverError, DriverResult},
    models::{NewOrder, Order, OrderLine, Row},
    types::{CustomerId, DistrictId, ItemId, OrderId, WarehouseId, NULL_CARRIER_ID},
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderLine {
    pub i_id: ItemId,
    pub supply_w_id: WarehouseId,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderParams {
    pub w_id: WarehouseId,
    pub d_id: DistrictId,
    pub c_id: CustomerId,
    pub entry_d: DateTime<Utc>,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderOutcome {
    pub o_id: OrderId,
    pub ol_cnt: usize,
    /// Σ amount × (1 − c_discount) × (1 + w_tax + d_tax)
    pub total: f64,
}

pub fn execute(
    backend: &mut dyn StorageBackend,
    params: &NewOrderParams,
) -> DriverResult<NewOrderOutcome> {
    let (w_id, d_id) = (params.w_id, params.d_id);
    let caps = backend.capabilities();

    let warehouse = backend
        .warehouse(w_id)?
        .ok_or(DriverError::NotFound { table: "warehouse" })?;

    // ── Order id ──────────────────────────────────────────────────
    let district = backend
        .district(w_id, d_id)?
        .ok_or(DriverError::NotFound { table: "district" })?;
    let o_id = if caps.supports_atomic_update_read {
        backend.take_next_order_id(w_id, d_id)?
    } else {
        backend.update(
            &RowKey::District { w_id, d_id },
            &[FieldUpdate::increment(Field::DistrictNextOrderId, 1)],
        )?;
        district.next_o_id
    };

    let customer = backend
        .customer(w_id, d_id, params.c_id)?
        .ok_or(DriverError::CustomerNotFound)?;

    let all_local = params.lines.iter().all(|l| l.supply_w_id == w_id);

    // ── Items ─────────────────────────────────────────────────────
    // An unused item id is the deliberate rollback case.
    let wanted_items: HashSet<ItemId> = params.lines.iter().map(|l| l.i_id).collect();
    let i_ids: Vec<ItemId> = wanted_items.iter().copied().collect();
    let items = backend.items(&i_ids)?;
    if items.len() != i_ids.len() {
        return Err(DriverError::BadItemRollback);
    }
    let prices: HashMap<ItemId, f64> = items.iter().map(|i| (i.i_id, i.price)).collect();

    // ── Stock ─────────────────────────────────────────────────────
    let wanted_stock: HashSet<(WarehouseId, ItemId)> = params
        .lines
        .iter()
        .map(|l| (l.supply_w_id, l.i_id))
        .collect();
    let stock_keys: Vec<(WarehouseId, ItemId)> = wanted_stock.iter().copied().collect();
    let stocks = backend.stocks(&stock_keys)?;
    if stocks.len() != stock_keys.len() {
        return Err(DriverError::ShortRead {
            table: "stock",
            expected: stock_keys.len(),
            actual: stocks.len(),
        });
    }
    let mut stock_by_key: HashMap<(WarehouseId, ItemId), _> =
        stocks.into_iter().map(|s| ((s.w_id, s.i_id), s)).collect();

    let mut lines = Vec::with_capacity(params.lines.len());
    let mut amount_sum = 0.0;
    for (number, line) in params.lines.iter().enumerate() {
        let key = (line.supply_w_id, line.i_id);
        let stock = stock_by_key
            .get_mut(&key)
            .ok_or(DriverError::NotFound { table: "stock" })?;
        let price = prices
            .get(&line.i_id)
            .copied()
            .ok_or(DriverError::BadItemRollback)?;

        let remote = line.supply_w_id != w_id;
        stock.quantity = wrap_stock_quantity(stock.quantity, line.quantity);
        stock.ytd += line.quantity;
        stock.order_cnt += 1;
        if remote {
            stock.remote_cnt += 1;
        }

        let mut changes = vec![
            FieldUpdate::replace(Field::StockQuantity, stock.quantity),
            FieldUpdate::increment(Field::StockYtd, line.quantity),
            FieldUpdate::increment(Field::StockOrderCnt, 1),
        ];
        if remote {
            changes.push(FieldUpdate::increment(Field::StockRemoteCnt, 1));
        }
        backend.update(
            &RowKey::Stock {
                w_id: line.supply_w_id,
                i_id: line.i_id,
            },
            &changes,
        )?;

        let amount = f64::from(line.quantity) * price;
        amount_sum += amount;
        lines.push(OrderLine {
            o_id,
            d_id,
            w_id,
            number: number as i32 + 1,
            i_id: line.i_id,
            supply_w_id: line.supply_w_id,
            delivery_d: None,
            quantity: line.quantity,
            amount,
            dist_info: stock.dist_info(d_id).unwrap_or_default().to_string(),
        });
    }

    // ── Order + marker ────────────────────────────────────────────
    let ol_cnt = lines.len();
    backend.insert(&Row::Order(Order {
        o_id,
        c_id: params.c_id,
        d_id,
        w_id,
        entry_d: params.entry_d,
        carrier_id: NULL_CARRIER_ID,
        ol_cnt: ol_cnt as i32,
        all_local: i32::from(all_local),
        lines,
    }))?;
    backend.insert(&Row::NewOrder(NewOrder { o_id, d_id, w_id }))?;

    let total = amount_sum * (1.0 - customer.discount) * (1.0 + warehouse.tax + district.tax);
    Ok(NewOrderOutcome { o_id, ol_cnt, total })
}
