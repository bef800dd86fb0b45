//! SQLite storage backend.
//!
//! RULE: Only store/ talks to SQLite.
//! Protocols call StorageBackend methods and never execute SQL directly.
//!
//! One SqliteBackend wraps one rusqlite Connection and is owned by exactly
//! one worker. Workers sharing a database each open their own session on the
//! same path (or the same shared-cache memory URI).

mod reads;
mod writes;

use crate::{
    backend::{Capabilities, FieldUpdate, RowKey, StorageBackend},
    error::{DriverError, DriverResult},
    models::{Customer, District, Item, NewOrder, Order, Row, Stock, Warehouse},
    types::{CustomerId, DistrictId, ItemId, OrderId, WarehouseId},
};
use log::debug;
use rusqlite::Connection;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteBackend {
    conn: Connection,
    atomic_update_read: bool,
}

impl SqliteBackend {
    /// Open (or create) the database at `path`. URIs such as
    /// `file:tpcc?mode=memory&cache=shared` are accepted.
    /// The plain path `:memory:` opens a private in-memory database.
    pub fn open(path: &str) -> DriverResult<Self> {
        if path == ":memory:" {
            return Self::in_memory();
        }
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode=WAL;") {
            debug!("journal_mode=WAL not applied to {path}: {e}");
        }
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn,
            atomic_update_read: true,
        })
    }

    /// Open a private in-memory database (used in tests).
    pub fn in_memory() -> DriverResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            atomic_update_read: true,
        })
    }

    /// Shared-cache in-memory URI for `name`. Every session opened on it
    /// sees the same database for as long as one session stays open.
    pub fn shared_memory_uri(name: &str) -> String {
        format!("file:{name}?mode=memory&cache=shared")
    }

    /// Toggle the native UPDATE/DELETE ... RETURNING paths.
    pub fn with_atomic_update_read(mut self, enabled: bool) -> Self {
        self.atomic_update_read = enabled;
        self
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> DriverResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_tpcc_schema.sql"))?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

impl StorageBackend for SqliteBackend {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_transactions: true,
            supports_atomic_update_read: self.atomic_update_read,
        }
    }

    fn begin(&mut self) -> DriverResult<()> {
        // IMMEDIATE takes the write lock up front so two sessions never
        // deadlock upgrading read locks.
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    fn commit(&mut self) -> DriverResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback(&mut self) -> DriverResult<()> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        Ok(())
    }

    fn warehouse(&mut self, w_id: WarehouseId) -> DriverResult<Option<Warehouse>> {
        self.read_warehouse(w_id)
    }

    fn district(&mut self, w_id: WarehouseId, d_id: DistrictId) -> DriverResult<Option<District>> {
        self.read_district(w_id, d_id)
    }

    fn customer(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        c_id: CustomerId,
    ) -> DriverResult<Option<Customer>> {
        self.read_customer(w_id, d_id, c_id)
    }

    fn order(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        o_id: OrderId,
    ) -> DriverResult<Option<Order>> {
        self.read_order(w_id, d_id, o_id)
    }

    fn customers_by_last_name(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        last: &str,
    ) -> DriverResult<Vec<Customer>> {
        self.read_customers_by_last_name(w_id, d_id, last)
    }

    fn oldest_new_order(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
    ) -> DriverResult<Option<NewOrder>> {
        self.read_oldest_new_order(w_id, d_id)
    }

    fn latest_order(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        c_id: CustomerId,
    ) -> DriverResult<Option<Order>> {
        self.read_latest_order(w_id, d_id, c_id)
    }

    fn items(&mut self, i_ids: &[ItemId]) -> DriverResult<Vec<Item>> {
        self.read_items(i_ids)
    }

    fn stocks(&mut self, keys: &[(WarehouseId, ItemId)]) -> DriverResult<Vec<Stock>> {
        self.read_stocks(keys)
    }

    fn order_line_items(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        from_o_id: OrderId,
        to_o_id: OrderId,
    ) -> DriverResult<Vec<ItemId>> {
        self.read_order_line_items(w_id, d_id, from_o_id, to_o_id)
    }

    fn count_low_stock(
        &mut self,
        w_id: WarehouseId,
        i_ids: &[ItemId],
        threshold: i32,
    ) -> DriverResult<u64> {
        self.read_low_stock_count(w_id, i_ids, threshold)
    }

    fn update(&mut self, key: &RowKey, changes: &[FieldUpdate]) -> DriverResult<()> {
        self.apply_update(key, changes)
    }

    fn delete(&mut self, key: &RowKey) -> DriverResult<()> {
        self.apply_delete(key)
    }

    fn insert(&mut self, row: &Row) -> DriverResult<()> {
        self.insert_row(row)
    }

    fn insert_batch(&mut self, rows: &[Row]) -> DriverResult<()> {
        // Outside a caller's transaction, group the batch into one
        // implicit transaction; per-row autocommit is orders of magnitude slower.
        if self.in_transaction() {
            return rows.iter().try_for_each(|row| self.insert_row(row));
        }
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        for row in rows {
            if let Err(e) = self.insert_row(row) {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK;") {
                    debug!("batch rollback failed: {rollback}");
                }
                return Err(e);
            }
        }
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn take_next_order_id(&mut self, w_id: WarehouseId, d_id: DistrictId) -> DriverResult<OrderId> {
        self.returning_next_order_id(w_id, d_id)?
            .ok_or(DriverError::NotFound { table: "district" })
    }

    fn pop_oldest_new_order(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
    ) -> DriverResult<Option<NewOrder>> {
        self.returning_oldest_new_order(w_id, d_id)
    }
}
