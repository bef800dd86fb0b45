//! The storage contract every database driver implements.
//!
//! RULE: Transaction protocols talk to storage only through this trait.
//! They may branch on `Capabilities`, never on which backend they hold.
//!
//! Each worker owns exactly one backend session. Sessions are never
//! shared between threads, so methods take `&mut self`.

use crate::{
    config::ConnectionConfig,
    error::{DriverError, DriverResult},
    models::{Customer, District, Item, NewOrder, Order, Row, Stock, Warehouse},
    store::SqliteBackend,
    types::{CustomerId, DistrictId, ItemId, OrderId, WarehouseId},
};
use chrono::{DateTime, Utc};

/// Optional features a backend advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Begin/Commit/Rollback are meaningful and retries are safe.
    pub supports_transactions: bool,
    /// Native find-and-modify: take-and-increment, pop-oldest.
    pub supports_atomic_update_read: bool,
}

/// Natural key of a row (or, for `OrderLines`, of every line of one order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKey {
    Warehouse { w_id: WarehouseId },
    District { w_id: WarehouseId, d_id: DistrictId },
    Customer { w_id: WarehouseId, d_id: DistrictId, c_id: CustomerId },
    Order { w_id: WarehouseId, d_id: DistrictId, o_id: OrderId },
    OrderLines { w_id: WarehouseId, d_id: DistrictId, o_id: OrderId },
    NewOrder { w_id: WarehouseId, d_id: DistrictId, o_id: OrderId },
    Stock { w_id: WarehouseId, i_id: ItemId },
}

impl RowKey {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Warehouse { .. } => "warehouse",
            Self::District { .. } => "district",
            Self::Customer { .. } => "customer",
            Self::Order { .. } => "orders",
            Self::OrderLines { .. } => "order_line",
            Self::NewOrder { .. } => "new_order",
            Self::Stock { .. } => "stock",
        }
    }
}

/// Mutable attributes the protocols touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    WarehouseYtd,
    DistrictYtd,
    DistrictNextOrderId,
    CustomerBalance,
    CustomerYtdPayment,
    CustomerPaymentCnt,
    CustomerDeliveryCnt,
    CustomerData,
    OrderCarrierId,
    OrderLineDeliveryDate,
    StockQuantity,
    StockYtd,
    StockOrderCnt,
    StockRemoteCnt,
}

impl Field {
    pub fn table(self) -> &'static str {
        match self {
            Self::WarehouseYtd => "warehouse",
            Self::DistrictYtd | Self::DistrictNextOrderId => "district",
            Self::CustomerBalance
            | Self::CustomerYtdPayment
            | Self::CustomerPaymentCnt
            | Self::CustomerDeliveryCnt
            | Self::CustomerData => "customer",
            Self::OrderCarrierId => "orders",
            Self::OrderLineDeliveryDate => "order_line",
            Self::StockQuantity | Self::StockYtd | Self::StockOrderCnt | Self::StockRemoteCnt => {
                "stock"
            }
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::WarehouseYtd => "w_ytd",
            Self::DistrictYtd => "d_ytd",
            Self::DistrictNextOrderId => "d_next_o_id",
            Self::CustomerBalance => "c_balance",
            Self::CustomerYtdPayment => "c_ytd_payment",
            Self::CustomerPaymentCnt => "c_payment_cnt",
            Self::CustomerDeliveryCnt => "c_delivery_cnt",
            Self::CustomerData => "c_data",
            Self::OrderCarrierId => "o_carrier_id",
            Self::OrderLineDeliveryDate => "ol_delivery_d",
            Self::StockQuantity => "s_quantity",
            Self::StockYtd => "s_ytd",
            Self::StockOrderCnt => "s_order_cnt",
            Self::StockRemoteCnt => "s_remote_cnt",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

/// One change applied by a point update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// `field = field + value`
    Increment(Field, Value),
    /// `field = value`
    Replace(Field, Value),
}

impl FieldUpdate {
    pub fn increment(field: Field, by: impl Into<Value>) -> Self {
        Self::Increment(field, by.into())
    }

    pub fn replace(field: Field, value: impl Into<Value>) -> Self {
        Self::Replace(field, value.into())
    }

    pub fn field(&self) -> Field {
        match self {
            Self::Increment(f, _) | Self::Replace(f, _) => *f,
        }
    }
}

pub trait StorageBackend: Send {
    /// Driver identifier, e.g. "sqlite".
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> Capabilities;

    // ── Transaction scope ─────────────────────────────────────────
    // Invoked only when `supports_transactions` is advertised.

    fn begin(&mut self) -> DriverResult<()>;
    fn commit(&mut self) -> DriverResult<()>;
    fn rollback(&mut self) -> DriverResult<()>;

    // ── Point reads ───────────────────────────────────────────────

    fn warehouse(&mut self, w_id: WarehouseId) -> DriverResult<Option<Warehouse>>;

    fn district(&mut self, w_id: WarehouseId, d_id: DistrictId) -> DriverResult<Option<District>>;

    fn customer(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        c_id: CustomerId,
    ) -> DriverResult<Option<Customer>>;

    /// The order with all of its lines.
    fn order(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        o_id: OrderId,
    ) -> DriverResult<Option<Order>>;

    // ── Ordered reads ─────────────────────────────────────────────

    /// Every customer with this last name, ordered by first name.
    fn customers_by_last_name(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        last: &str,
    ) -> DriverResult<Vec<Customer>>;

    /// Lowest-id undelivered order marker in the district.
    fn oldest_new_order(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
    ) -> DriverResult<Option<NewOrder>>;

    /// The customer's highest-id order, with its lines.
    fn latest_order(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        c_id: CustomerId,
    ) -> DriverResult<Option<Order>>;

    // ── Batched reads ─────────────────────────────────────────────
    // Return exactly the matched rows; callers detect short reads.

    fn items(&mut self, i_ids: &[ItemId]) -> DriverResult<Vec<Item>>;

    fn stocks(&mut self, keys: &[(WarehouseId, ItemId)]) -> DriverResult<Vec<Stock>>;

    // ── Scans ─────────────────────────────────────────────────────

    /// Item ids on every line of orders with id in `[from_o_id, to_o_id)`.
    fn order_line_items(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        from_o_id: OrderId,
        to_o_id: OrderId,
    ) -> DriverResult<Vec<ItemId>>;

    /// Distinct stock rows among `i_ids` in the warehouse with quantity < threshold.
    fn count_low_stock(
        &mut self,
        w_id: WarehouseId,
        i_ids: &[ItemId],
        threshold: i32,
    ) -> DriverResult<u64>;

    // ── Writes ────────────────────────────────────────────────────

    /// Apply every change to the row(s) at `key`.
    /// Fails with `NotFound` when zero rows matched.
    fn update(&mut self, key: &RowKey, changes: &[FieldUpdate]) -> DriverResult<()>;

    /// Fails with `NotFound` when zero rows matched.
    fn delete(&mut self, key: &RowKey) -> DriverResult<()>;

    fn insert(&mut self, row: &Row) -> DriverResult<()>;

    fn insert_batch(&mut self, rows: &[Row]) -> DriverResult<()> {
        for row in rows {
            self.insert(row)?;
        }
        Ok(())
    }

    // ── Atomic update-read ────────────────────────────────────────
    // Invoked only when `supports_atomic_update_read` is advertised.

    /// Increment the district's next order id, returning the value before.
    fn take_next_order_id(
        &mut self,
        _w_id: WarehouseId,
        _d_id: DistrictId,
    ) -> DriverResult<OrderId> {
        Err(DriverError::Unsupported("atomic take-next-order-id"))
    }

    /// Delete and return the district's oldest undelivered order marker.
    fn pop_oldest_new_order(
        &mut self,
        _w_id: WarehouseId,
        _d_id: DistrictId,
    ) -> DriverResult<Option<NewOrder>> {
        Err(DriverError::Unsupported("atomic pop-oldest-new-order"))
    }
}

/// Open one backend session for the configured driver.
pub fn open_backend(conn: &ConnectionConfig) -> DriverResult<Box<dyn StorageBackend>> {
    match conn.driver.as_str() {
        "sqlite" => {
            let backend = SqliteBackend::open(&conn.uri).map_err(|e| DriverError::Connection {
                driver: conn.driver.clone(),
                reason: e.to_string(),
            })?;
            Ok(Box::new(backend.with_atomic_update_read(conn.atomic_update_read)))
        }
        other => Err(DriverError::InvalidConfig(format!(
            "unsupported dbdriver '{other}'"
        ))),
    }
}
