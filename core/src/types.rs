//! Shared primitive types and TPC-C constants used across the driver.

pub type WarehouseId = i32;
pub type DistrictId = i32;
pub type CustomerId = i32;
pub type OrderId = i32;
pub type ItemId = i32;
pub type WorkerId = usize;

// ── Population baselines (scale factor 1) ─────────────────────────

pub const NUM_ITEMS: i32 = 100_000;
pub const DISTRICTS_PER_WAREHOUSE: i32 = 10;
pub const CUSTOMERS_PER_DISTRICT: i32 = 3_000;
pub const INITIAL_NEW_ORDERS_PER_DISTRICT: i32 = 900;

// ── Transaction input ranges ──────────────────────────────────────

pub const MIN_OL_CNT: i32 = 5;
pub const MAX_OL_CNT: i32 = 15;
pub const MAX_OL_QUANTITY: i32 = 10;
pub const MIN_STOCK_LEVEL_THRESHOLD: i32 = 10;
pub const MAX_STOCK_LEVEL_THRESHOLD: i32 = 20;
pub const MIN_CARRIER_ID: i32 = 1;
pub const MAX_CARRIER_ID: i32 = 10;
pub const NULL_CARRIER_ID: i32 = 0;
pub const MIN_PAYMENT: f64 = 1.0;
pub const MAX_PAYMENT: f64 = 5_000.0;
pub const MONEY_DECIMALS: u32 = 2;

/// Orders inspected by Stock-Level, counting back from the district's next id.
pub const STOCK_LEVEL_ORDERS: i32 = 20;

// ── Customer credit ───────────────────────────────────────────────

pub const BAD_CREDIT: &str = "BC";
pub const GOOD_CREDIT: &str = "GC";
pub const MAX_C_DATA: usize = 500;

/// Percent chance (1..=100) that a lookup goes by last name instead of id.
pub const LAST_NAME_LOOKUP_PERCENT: i32 = 60;
/// Percent chance that Payment's customer lives in the home warehouse.
pub const LOCAL_PAYMENT_PERCENT: i32 = 85;
