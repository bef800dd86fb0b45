//! TPC-C row payloads exchanged with a StorageBackend.
//!
//! The backend is the system of record. These structs are transient
//! copies that live only for the duration of one transaction.

use crate::types::{CustomerId, DistrictId, ItemId, OrderId, WarehouseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub w_id: WarehouseId,
    pub name: String,
    pub street_1: String,
    pub street_2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub tax: f64,
    pub ytd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct District {
    pub d_id: DistrictId,
    pub w_id: WarehouseId,
    pub name: String,
    pub street_1: String,
    pub street_2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub tax: f64,
    pub ytd: f64,
    pub next_o_id: OrderId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub c_id: CustomerId,
    pub d_id: DistrictId,
    pub w_id: WarehouseId,
    pub first: String,
    pub middle: String,
    pub last: String,
    pub street_1: String,
    pub street_2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub phone: String,
    pub since: DateTime<Utc>,
    pub credit: String,
    pub credit_lim: f64,
    pub discount: f64,
    pub balance: f64,
    pub ytd_payment: f64,
    pub payment_cnt: i32,
    pub delivery_cnt: i32,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub c_id: CustomerId,
    pub c_d_id: DistrictId,
    pub c_w_id: WarehouseId,
    pub d_id: DistrictId,
    pub w_id: WarehouseId,
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub data: String,
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub o_id: OrderId,
    pub c_id: CustomerId,
    pub d_id: DistrictId,
    pub w_id: WarehouseId,
    pub entry_d: DateTime<Utc>,
    pub carrier_id: i32,
    pub ol_cnt: i32,
    pub all_local: i32,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub o_id: OrderId,
    pub d_id: DistrictId,
    pub w_id: WarehouseId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub o_id: OrderId,
    pub d_id: DistrictId,
    pub w_id: WarehouseId,
    pub number: i32,
    pub i_id: ItemId,
    pub supply_w_id: WarehouseId,
    pub delivery_d: Option<DateTime<Utc>>,
    pub quantity: i32,
    pub amount: f64,
    pub dist_info: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub i_id: ItemId,
    pub w_id: WarehouseId,
    pub quantity: i32,
    /// Per-district info strings, index 0 is district 1.
    pub dists: Vec<String>,
    pub ytd: i32,
    pub order_cnt: i32,
    pub remote_cnt: i32,
    pub data: String,
}

impl Stock {
    pub fn dist_info(&self, d_id: DistrictId) -> Option<&str> {
        let slot = usize::try_from(d_id).ok()?.checked_sub(1)?;
        self.dists.get(slot).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub i_id: ItemId,
    pub im_id: i32,
    pub name: String,
    pub price: f64,
    pub data: String,
}

/// Any insertable row. Used by single and batch inserts.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Warehouse(Warehouse),
    District(District),
    Customer(Customer),
    History(History),
    Order(Order),
    NewOrder(NewOrder),
    Stock(Stock),
    Item(Item),
}
