//! One backend session bound to the run's retry policy.
//!
//! RULE: Workers invoke transactions only through an Executor.
//! Every transaction except Stock-Level goes through the retry envelope.
//! Stock-Level never needs a transaction scope and runs directly.

use crate::{
    backend::StorageBackend,
    error::DriverResult,
    retry::run_with_retries,
    transactions::{
        delivery::{self, DeliveryOutcome, DeliveryParams},
        new_order::{self, NewOrderOutcome, NewOrderParams},
        order_status::{self, OrderStatusOutcome, OrderStatusParams},
        payment::{self, PaymentOutcome, PaymentParams},
        stock_level::{self, StockLevelParams},
    },
};

pub struct Executor {
    backend: Box<dyn StorageBackend>,
    retries: u32,
    transactional: bool,
}

impl Executor {
    /// `transactions` asks for a scope around each write transaction.
    /// It only takes effect when the backend supports transactions.
    pub fn new(backend: Box<dyn StorageBackend>, transactions: bool, retries: u32) -> Self {
        let transactional = transactions && backend.capabilities().supports_transactions;
        Self {
            backend,
            retries,
            transactional,
        }
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    pub fn backend_mut(&mut self) -> &mut dyn StorageBackend {
        self.backend.as_mut()
    }

    pub fn do_new_order(&mut self, params: &NewOrderParams) -> DriverResult<NewOrderOutcome> {
        run_with_retries(self.backend.as_mut(), self.retries, self.transactional, |b| {
            new_order::execute(b, params)
        })
    }

    pub fn do_payment(&mut self, params: &PaymentParams) -> DriverResult<PaymentOutcome> {
        run_with_retries(self.backend.as_mut(), self.retries, self.transactional, |b| {
            payment::execute(b, params)
        })
    }

    pub fn do_delivery(&mut self, params: &DeliveryParams) -> DriverResult<DeliveryOutcome> {
        run_with_retries(self.backend.as_mut(), self.retries, self.transactional, |b| {
            delivery::execute(b, params)
        })
    }

    pub fn do_order_status(
        &mut self,
        params: &OrderStatusParams,
    ) -> DriverResult<OrderStatusOutcome> {
        run_with_retries(self.backend.as_mut(), self.retries, self.transactional, |b| {
            order_status::execute(b, params)
        })
    }

    pub fn do_stock_level(&mut self, params: &StockLevelParams) -> DriverResult<u64> {
        stock_level::execute(self.backend.as_mut(), params)
    }
}
