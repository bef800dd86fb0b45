use super::SqliteBackend;
use crate::{
    error::DriverResult,
    models::{Customer, District, Item, NewOrder, Order, OrderLine, Stock, Warehouse},
    types::{CustomerId, DistrictId, ItemId, OrderId, WarehouseId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, OptionalExtension};

const WAREHOUSE_COLUMNS: &str =
    "w_id, w_name, w_street_1, w_street_2, w_city, w_state, w_zip, w_tax, w_ytd";

const DISTRICT_COLUMNS: &str = "d_id, d_w_id, d_name, d_street_1, d_street_2, d_city, d_state, \
     d_zip, d_tax, d_ytd, d_next_o_id";

const CUSTOMER_COLUMNS: &str = "c_id, c_d_id, c_w_id, c_first, c_middle, c_last, c_street_1, \
     c_street_2, c_city, c_state, c_zip, c_phone, c_since, c_credit, c_credit_lim, c_discount, \
     c_balance, c_ytd_payment, c_payment_cnt, c_delivery_cnt, c_data";

const ORDER_COLUMNS: &str =
    "o_id, o_c_id, o_d_id, o_w_id, o_entry_d, o_carrier_id, o_ol_cnt, o_all_local";

const ORDER_LINE_COLUMNS: &str = "ol_o_id, ol_d_id, ol_w_id, ol_number, ol_i_id, ol_supply_w_id, \
     ol_delivery_d, ol_quantity, ol_amount, ol_dist_info";

const STOCK_COLUMNS: &str = "s_i_id, s_w_id, s_quantity, s_dist_01, s_dist_02, s_dist_03, \
     s_dist_04, s_dist_05, s_dist_06, s_dist_07, s_dist_08, s_dist_09, s_dist_10, s_ytd, \
     s_order_cnt, s_remote_cnt, s_data";

const ITEM_COLUMNS: &str = "i_id, i_im_id, i_name, i_price, i_data";

pub(super) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn warehouse_row(row: &rusqlite::Row) -> rusqlite::Result<Warehouse> {
    Ok(Warehouse {
        w_id: row.get(0)?,
        name: row.get(1)?,
        street_1: row.get(2)?,
        street_2: row.get(3)?,
        city: row.get(4)?,
        state: row.get(5)?,
        zip: row.get(6)?,
        tax: row.get(7)?,
        ytd: row.get(8)?,
    })
}

fn district_row(row: &rusqlite::Row) -> rusqlite::Result<District> {
    Ok(District {
        d_id: row.get(0)?,
        w_id: row.get(1)?,
        name: row.get(2)?,
        street_1: row.get(3)?,
        street_2: row.get(4)?,
        city: row.get(5)?,
        state: row.get(6)?,
        zip: row.get(7)?,
        tax: row.get(8)?,
        ytd: row.get(9)?,
        next_o_id: row.get(10)?,
    })
}

fn customer_row(row: &rusqlite::Row) -> rusqlite::Result<Customer> {
    Ok(Customer {
        c_id: row.get(0)?,
        d_id: row.get(1)?,
        w_id: row.get(2)?,
        first: row.get(3)?,
        middle: row.get(4)?,
        last: row.get(5)?,
        street_1: row.get(6)?,
        street_2: row.get(7)?,
        city: row.get(8)?,
        state: row.get(9)?,
        zip: row.get(10)?,
        phone: row.get(11)?,
        since: from_millis(row.get(12)?),
        credit: row.get(13)?,
        credit_lim: row.get(14)?,
        discount: row.get(15)?,
        balance: row.get(16)?,
        ytd_payment: row.get(17)?,
        payment_cnt: row.get(18)?,
        delivery_cnt: row.get(19)?,
        data: row.get(20)?,
    })
}

/// Order header only; lines are attached by the caller.
fn order_row(row: &rusqlite::Row) -> rusqlite::Result<Order> {
    Ok(Order {
        o_id: row.get(0)?,
        c_id: row.get(1)?,
        d_id: row.get(2)?,
        w_id: row.get(3)?,
        entry_d: from_millis(row.get(4)?),
        carrier_id: row.get(5)?,
        ol_cnt: row.get(6)?,
        all_local: row.get(7)?,
        lines: Vec::new(),
    })
}

fn order_line_row(row: &rusqlite::Row) -> rusqlite::Result<OrderLine> {
    Ok(OrderLine {
        o_id: row.get(0)?,
        d_id: row.get(1)?,
        w_id: row.get(2)?,
        number: row.get(3)?,
        i_id: row.get(4)?,
        supply_w_id: row.get(5)?,
        delivery_d: row.get::<_, Option<i64>>(6)?.map(from_millis),
        quantity: row.get(7)?,
        amount: row.get(8)?,
        dist_info: row.get(9)?,
    })
}

fn stock_row(row: &rusqlite::Row) -> rusqlite::Result<Stock> {
    let dists = (3..13)
        .map(|i| row.get::<_, String>(i))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Stock {
        i_id: row.get(0)?,
        w_id: row.get(1)?,
        quantity: row.get(2)?,
        dists,
        ytd: row.get(13)?,
        order_cnt: row.get(14)?,
        remote_cnt: row.get(15)?,
        data: row.get(16)?,
    })
}

fn item_row(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    Ok(Item {
        i_id: row.get(0)?,
        im_id: row.get(1)?,
        name: row.get(2)?,
        price: row.get(3)?,
        data: row.get(4)?,
    })
}

impl SqliteBackend {
    // ── Point reads ──────────────────────────────────────────────

    pub(super) fn read_warehouse(&self, w_id: WarehouseId) -> DriverResult<Option<Warehouse>> {
        let sql = format!("SELECT {WAREHOUSE_COLUMNS} FROM warehouse WHERE w_id = ?1");
        let warehouse = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![w_id], warehouse_row)
            .optional()?;
        Ok(warehouse)
    }

    pub(super) fn read_district(
        &self,
        w_id: WarehouseId,
        d_id: DistrictId,
    ) -> DriverResult<Option<District>> {
        let sql = format!("SELECT {DISTRICT_COLUMNS} FROM district WHERE d_w_id = ?1 AND d_id = ?2");
        let district = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![w_id, d_id], district_row)
            .optional()?;
        Ok(district)
    }

    pub(super) fn read_customer(
        &self,
        w_id: WarehouseId,
        d_id: DistrictId,
        c_id: CustomerId,
    ) -> DriverResult<Option<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer
             WHERE c_w_id = ?1 AND c_d_id = ?2 AND c_id = ?3"
        );
        let customer = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![w_id, d_id, c_id], customer_row)
            .optional()?;
        Ok(customer)
    }

    pub(super) fn read_order(
        &self,
        w_id: WarehouseId,
        d_id: DistrictId,
        o_id: OrderId,
    ) -> DriverResult<Option<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE o_w_id = ?1 AND o_d_id = ?2 AND o_id = ?3"
        );
        let order = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![w_id, d_id, o_id], order_row)
            .optional()?;
        order.map(|o| self.with_lines(o)).transpose()
    }

    // ── Ordered reads ────────────────────────────────────────────

    pub(super) fn read_customers_by_last_name(
        &self,
        w_id: WarehouseId,
        d_id: DistrictId,
        last: &str,
    ) -> DriverResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer
             WHERE c_w_id = ?1 AND c_d_id = ?2 AND c_last = ?3
             ORDER BY c_first ASC"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![w_id, d_id, last], customer_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub(super) fn read_oldest_new_order(
        &self,
        w_id: WarehouseId,
        d_id: DistrictId,
    ) -> DriverResult<Option<NewOrder>> {
        let new_order = self
            .conn
            .prepare_cached(
                "SELECT no_o_id FROM new_order
                 WHERE no_w_id = ?1 AND no_d_id = ?2
                 ORDER BY no_o_id ASC LIMIT 1",
            )?
            .query_row(params![w_id, d_id], |row| {
                Ok(NewOrder {
                    o_id: row.get(0)?,
                    d_id,
                    w_id,
                })
            })
            .optional()?;
        Ok(new_order)
    }

    pub(super) fn read_latest_order(
        &self,
        w_id: WarehouseId,
        d_id: DistrictId,
        c_id: CustomerId,
    ) -> DriverResult<Option<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE o_w_id = ?1 AND o_d_id = ?2 AND o_c_id = ?3
             ORDER BY o_id DESC LIMIT 1"
        );
        let order = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![w_id, d_id, c_id], order_row)
            .optional()?;
        order.map(|o| self.with_lines(o)).transpose()
    }

    // ── Batched reads ────────────────────────────────────────────

    pub(super) fn read_items(&self, i_ids: &[ItemId]) -> DriverResult<Vec<Item>> {
        if i_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM item WHERE i_id IN ({})",
            placeholders(i_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(i_ids.iter()), item_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub(super) fn read_stocks(&self, keys: &[(WarehouseId, ItemId)]) -> DriverResult<Vec<Stock>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let pairs = vec!["(?, ?)"; keys.len()].join(", ");
        let sql = format!(
            "SELECT {STOCK_COLUMNS} FROM stock WHERE (s_w_id, s_i_id) IN (VALUES {pairs})"
        );
        let values: Vec<SqlValue> = keys
            .iter()
            .flat_map(|&(w, i)| [SqlValue::Integer(w as i64), SqlValue::Integer(i as i64)])
            .collect();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), stock_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Scans ────────────────────────────────────────────────────

    pub(super) fn read_order_line_items(
        &self,
        w_id: WarehouseId,
        d_id: DistrictId,
        from_o_id: OrderId,
        to_o_id: OrderId,
    ) -> DriverResult<Vec<ItemId>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT ol_i_id FROM order_line
             WHERE ol_w_id = ?1 AND ol_d_id = ?2 AND ol_o_id >= ?3 AND ol_o_id < ?4",
        )?;
        let rows = stmt.query_map(params![w_id, d_id, from_o_id, to_o_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub(super) fn read_low_stock_count(
        &self,
        w_id: WarehouseId,
        i_ids: &[ItemId],
        threshold: i32,
    ) -> DriverResult<u64> {
        if i_ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "SELECT COUNT(DISTINCT s_i_id) FROM stock
             WHERE s_w_id = ? AND s_quantity < ? AND s_i_id IN ({})",
            placeholders(i_ids.len())
        );
        let values: Vec<i64> = [w_id as i64, threshold as i64]
            .into_iter()
            .chain(i_ids.iter().map(|&i| i as i64))
            .collect();
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count as u64)
    }

    // ── Atomic update-read ───────────────────────────────────────

    pub(super) fn returning_next_order_id(
        &self,
        w_id: WarehouseId,
        d_id: DistrictId,
    ) -> DriverResult<Option<OrderId>> {
        let taken = self
            .conn
            .prepare_cached(
                "UPDATE district SET d_next_o_id = d_next_o_id + 1
                 WHERE d_w_id = ?1 AND d_id = ?2
                 RETURNING d_next_o_id - 1",
            )?
            .query_row(params![w_id, d_id], |row| row.get(0))
            .optional()?;
        Ok(taken)
    }

    pub(super) fn returning_oldest_new_order(
        &self,
        w_id: WarehouseId,
        d_id: DistrictId,
    ) -> DriverResult<Option<NewOrder>> {
        let popped = self
            .conn
            .prepare_cached(
                "DELETE FROM new_order
                 WHERE no_w_id = ?1 AND no_d_id = ?2 AND no_o_id = (
                     SELECT MIN(no_o_id) FROM new_order WHERE no_w_id = ?1 AND no_d_id = ?2
                 )
                 RETURNING no_o_id",
            )?
            .query_row(params![w_id, d_id], |row| {
                Ok(NewOrder {
                    o_id: row.get(0)?,
                    d_id,
                    w_id,
                })
            })
            .optional()?;
        Ok(popped)
    }

    fn with_lines(&self, mut order: Order) -> DriverResult<Order> {
        let sql = format!(
            "SELECT {ORDER_LINE_COLUMNS} FROM order_line
             WHERE ol_w_id = ?1 AND ol_d_id = ?2 AND ol_o_id = ?3
             ORDER BY ol_number ASC"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let lines = stmt
            .query_map(params![order.w_id, order.d_id, order.o_id], order_line_row)?
            .collect::<Result<Vec<_>, _>>()?;
        order.lines = lines;
        Ok(order)
    }
}
