use super::SqliteBackend;
use crate::{
    backend::{FieldUpdate, RowKey, Value},
    error::{DriverError, DriverResult},
    models::{Order, Row},
};
use rusqlite::{params, params_from_iter, types::Value as SqlValue};

fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Int(v) => SqlValue::Integer(*v),
        Value::Float(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Timestamp(v) => SqlValue::Integer(v.timestamp_millis()),
    }
}

/// WHERE clause and bound key values for a natural key.
fn key_predicate(key: &RowKey) -> (&'static str, Vec<SqlValue>) {
    let int = |v: i32| SqlValue::Integer(v as i64);
    match *key {
        RowKey::Warehouse { w_id } => ("w_id = ?", vec![int(w_id)]),
        RowKey::District { w_id, d_id } => ("d_w_id = ? AND d_id = ?", vec![int(w_id), int(d_id)]),
        RowKey::Customer { w_id, d_id, c_id } => (
            "c_w_id = ? AND c_d_id = ? AND c_id = ?",
            vec![int(w_id), int(d_id), int(c_id)],
        ),
        RowKey::Order { w_id, d_id, o_id } => (
            "o_w_id = ? AND o_d_id = ? AND o_id = ?",
            vec![int(w_id), int(d_id), int(o_id)],
        ),
        RowKey::OrderLines { w_id, d_id, o_id } => (
            "ol_w_id = ? AND ol_d_id = ? AND ol_o_id = ?",
            vec![int(w_id), int(d_id), int(o_id)],
        ),
        RowKey::NewOrder { w_id, d_id, o_id } => (
            "no_w_id = ? AND no_d_id = ? AND no_o_id = ?",
            vec![int(w_id), int(d_id), int(o_id)],
        ),
        RowKey::Stock { w_id, i_id } => ("s_w_id = ? AND s_i_id = ?", vec![int(w_id), int(i_id)]),
    }
}

impl SqliteBackend {
    pub(super) fn apply_update(&self, key: &RowKey, changes: &[FieldUpdate]) -> DriverResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let table = key.table();
        let mut assignments = Vec::with_capacity(changes.len());
        let mut values = Vec::with_capacity(changes.len() + 3);

        for change in changes {
            let field = change.field();
            if field.table() != table {
                return Err(DriverError::Other(anyhow::anyhow!(
                    "field {field:?} does not belong to table {table}"
                )));
            }
            let column = field.column();
            match change {
                FieldUpdate::Increment(_, by) => {
                    assignments.push(format!("{column} = {column} + ?"));
                    values.push(sql_value(by));
                }
                FieldUpdate::Replace(_, value) => {
                    assignments.push(format!("{column} = ?"));
                    values.push(sql_value(value));
                }
            }
        }

        let (predicate, key_values) = key_predicate(key);
        values.extend(key_values);
        let sql = format!("UPDATE {table} SET {} WHERE {predicate}", assignments.join(", "));

        let matched = self
            .conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(values))?;
        if matched == 0 {
            return Err(DriverError::NotFound { table });
        }
        Ok(())
    }

    pub(super) fn apply_delete(&self, key: &RowKey) -> DriverResult<()> {
        let table = key.table();
        let (predicate, values) = key_predicate(key);
        let sql = format!("DELETE FROM {table} WHERE {predicate}");
        let matched = self
            .conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(values))?;
        if matched == 0 {
            return Err(DriverError::NotFound { table });
        }
        Ok(())
    }

    pub(super) fn insert_row(&self, row: &Row) -> DriverResult<()> {
        match row {
            Row::Warehouse(w) => {
                self.conn
                    .prepare_cached(
                        "INSERT INTO warehouse (w_id, w_name, w_street_1, w_street_2, w_city,
                             w_state, w_zip, w_tax, w_ytd)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    )?
                    .execute(params![
                        w.w_id, w.name, w.street_1, w.street_2, w.city, w.state, w.zip, w.tax,
                        w.ytd
                    ])?;
            }
            Row::District(d) => {
                self.conn
                    .prepare_cached(
                        "INSERT INTO district (d_id, d_w_id, d_name, d_street_1, d_street_2,
                             d_city, d_state, d_zip, d_tax, d_ytd, d_next_o_id)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    )?
                    .execute(params![
                        d.d_id, d.w_id, d.name, d.street_1, d.street_2, d.city, d.state, d.zip,
                        d.tax, d.ytd, d.next_o_id
                    ])?;
            }
            Row::Customer(c) => {
                self.conn
                    .prepare_cached(
                        "INSERT INTO customer (c_id, c_d_id, c_w_id, c_first, c_middle, c_last,
                             c_street_1, c_street_2, c_city, c_state, c_zip, c_phone, c_since,
                             c_credit, c_credit_lim, c_discount, c_balance, c_ytd_payment,
                             c_payment_cnt, c_delivery_cnt, c_data)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                             ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
                    )?
                    .execute(params![
                        c.c_id,
                        c.d_id,
                        c.w_id,
                        c.first,
                        c.middle,
                        c.last,
                        c.street_1,
                        c.street_2,
                        c.city,
                        c.state,
                        c.zip,
                        c.phone,
                        c.since.timestamp_millis(),
                        c.credit,
                        c.credit_lim,
                        c.discount,
                        c.balance,
                        c.ytd_payment,
                        c.payment_cnt,
                        c.delivery_cnt,
                        c.data,
                    ])?;
            }
            Row::History(h) => {
                self.conn
                    .prepare_cached(
                        "INSERT INTO history (h_c_id, h_c_d_id, h_c_w_id, h_d_id, h_w_id,
                             h_date, h_amount, h_data)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    )?
                    .execute(params![
                        h.c_id,
                        h.c_d_id,
                        h.c_w_id,
                        h.d_id,
                        h.w_id,
                        h.date.timestamp_millis(),
                        h.amount,
                        h.data
                    ])?;
            }
            Row::Order(o) => self.insert_order(o)?,
            Row::NewOrder(no) => {
                self.conn
                    .prepare_cached(
                        "INSERT INTO new_order (no_o_id, no_d_id, no_w_id) VALUES (?1, ?2, ?3)",
                    )?
                    .execute(params![no.o_id, no.d_id, no.w_id])?;
            }
            Row::Stock(s) => {
                let dist = |d: usize| s.dists.get(d).map(String::as_str).unwrap_or_default();
                self.conn
                    .prepare_cached(
                        "INSERT INTO stock (s_i_id, s_w_id, s_quantity, s_dist_01, s_dist_02,
                             s_dist_03, s_dist_04, s_dist_05, s_dist_06, s_dist_07, s_dist_08,
                             s_dist_09, s_dist_10, s_ytd, s_order_cnt, s_remote_cnt, s_data)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                             ?15, ?16, ?17)",
                    )?
                    .execute(params![
                        s.i_id,
                        s.w_id,
                        s.quantity,
                        dist(0),
                        dist(1),
                        dist(2),
                        dist(3),
                        dist(4),
                        dist(5),
                        dist(6),
                        dist(7),
                        dist(8),
                        dist(9),
                        s.ytd,
                        s.order_cnt,
                        s.remote_cnt,
                        s.data,
                    ])?;
            }
            Row::Item(i) => {
                self.conn
                    .prepare_cached(
                        "INSERT INTO item (i_id, i_im_id, i_name, i_price, i_data)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )?
                    .execute(params![i.i_id, i.im_id, i.name, i.price, i.data])?;
            }
        }
        Ok(())
    }

    /// Orders are stored normalized: one header row plus one row per line.
    fn insert_order(&self, o: &Order) -> DriverResult<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO orders (o_id, o_c_id, o_d_id, o_w_id, o_entry_d, o_carrier_id,
                     o_ol_cnt, o_all_local)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?
            .execute(params![
                o.o_id,
                o.c_id,
                o.d_id,
                o.w_id,
                o.entry_d.timestamp_millis(),
                o.carrier_id,
                o.ol_cnt,
                o.all_local
            ])?;

        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO order_line (ol_o_id, ol_d_id, ol_w_id, ol_number, ol_i_id,
                 ol_supply_w_id, ol_delivery_d, ol_quantity, ol_amount, ol_dist_info)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for line in &o.lines {
            stmt.execute(params![
                line.o_id,
                line.d_id,
                line.w_id,
                line.number,
                line.i_id,
                line.supply_w_id,
                line.delivery_d.map(|d| d.timestamp_millis()),
                line.quantity,
                line.amount,
                line.dist_info,
            ])?;
        }
        Ok(())
    }
}
