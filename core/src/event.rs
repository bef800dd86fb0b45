//! Completion events: the only thing workers send to the aggregator.

use crate::types::WorkerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five TPC-C business transactions.
/// Variant order matches the report column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    StockLevel,
    Delivery,
    OrderStatus,
    Payment,
    NewOrder,
}

impl TransactionType {
    pub const ALL: [TransactionType; 5] = [
        Self::StockLevel,
        Self::Delivery,
        Self::OrderStatus,
        Self::Payment,
        Self::NewOrder,
    ];

    /// Map a uniform roll in 1..=100 onto the fixed TPC-C mix:
    /// 4% Stock-Level, 4% Delivery, 4% Order-Status, 43% Payment, 45% New-Order.
    pub fn from_roll(roll: i32) -> Self {
        match roll {
            r if r <= 4 => Self::StockLevel,
            r if r <= 8 => Self::Delivery,
            r if r <= 12 => Self::OrderStatus,
            r if r <= 55 => Self::Payment,
            _ => Self::NewOrder,
        }
    }

    /// Stable slot used to index per-type arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::StockLevel => "StockLevel",
            Self::Delivery => "Delivery",
            Self::OrderStatus => "OrderStatus",
            Self::Payment => "Payment",
            Self::NewOrder => "NewOrder",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One per attempted transaction, including attempts that exhausted retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub worker_id: WorkerId,
    pub transaction_type: TransactionType,
    pub failed: bool,
    pub latency_ms: f64,
}
