//! Initial TPC-C population ("prepare").
//!
//! RULE: The loader writes only through `StorageBackend::insert_batch`.
//! Rows are buffered and flushed every `batch_size` rows, and on every
//! table boundary so each table is complete before the next starts.
//!
//! The loader draws from its own RNG stream (LOADER_STREAM), so a given
//! seed always produces the same dataset apart from wall-clock timestamps.

use crate::{
    backend::StorageBackend,
    error::{DriverError, DriverResult},
    models::{
        Customer, District, History, Item, NewOrder, Order, OrderLine, Row, Stock, Warehouse,
    },
    name_generator::{NameGenerator, MIDDLE_NAME},
    rng::{WorkerRng, LOADER_STREAM},
    scale::ScaleParameters,
    types::*,
};
use anyhow::anyhow;
use chrono::Utc;
use log::{debug, info};
use std::{collections::HashSet, thread};

pub const DEFAULT_BATCH_SIZE: usize = 512;

// ── Population constants ──────────────────────────────────────────

const ORIGINAL_MARKER: &str = "ORIGINAL";
const DIST_INFO_LEN: usize = 24;
const PHONE_LEN: usize = 16;

const MIN_NAME: usize = 6;
const MAX_NAME: usize = 10;
const MIN_TAX: f64 = 0.0;
const MAX_TAX: f64 = 0.2;
const TAX_DECIMALS: u32 = 4;
const INITIAL_W_YTD: f64 = 300_000.0;
const INITIAL_D_YTD: f64 = 30_000.0;

const MIN_IM: i32 = 1;
const MAX_IM: i32 = 10_000;
const MIN_PRICE: f64 = 1.0;
const MAX_PRICE: f64 = 100.0;
const MIN_I_NAME: usize = 14;
const MAX_I_NAME: usize = 24;
const MIN_I_DATA: usize = 26;
const MAX_I_DATA: usize = 50;

const MIN_QUANTITY: i32 = 10;
const MAX_QUANTITY: i32 = 100;

const INITIAL_CREDIT_LIM: f64 = 50_000.0;
const MIN_DISCOUNT: f64 = 0.0;
const MAX_DISCOUNT: f64 = 0.5;
const DISCOUNT_DECIMALS: u32 = 4;
const INITIAL_BALANCE: f64 = -10.0;
const INITIAL_YTD_PAYMENT: f64 = 10.0;
const INITIAL_PAYMENT_CNT: i32 = 1;
const INITIAL_DELIVERY_CNT: i32 = 0;
const MIN_C_DATA: usize = 300;

const INITIAL_HISTORY_AMOUNT: f64 = 10.0;
const MIN_H_DATA: usize = 12;
const MAX_H_DATA: usize = 24;

const INITIAL_OL_QUANTITY: i32 = 5;
const MIN_OL_AMOUNT: f64 = 0.01;
const INITIAL_ALL_LOCAL: i32 = 1;

/// Load items through one session, then spread warehouses round-robin
/// over `threads` loader threads (never more than there are warehouses).
/// Each thread opens its own session with `open`. Returns rows written.
pub fn load_parallel<F>(
    open: F,
    scale: ScaleParameters,
    seed: u64,
    threads: usize,
    batch_size: usize,
) -> DriverResult<u64>
where
    F: Fn() -> DriverResult<Box<dyn StorageBackend>> + Sync,
{
    let mut written = {
        let mut session = open()?;
        let mut loader = Loader::new(session.as_mut(), scale, seed, batch_size);
        loader.load_items()?;
        loader.written()
    };

    let workers = threads.clamp(1, usize::try_from(scale.warehouse_count.max(1)).unwrap_or(1));
    info!("loading {} warehouses on {workers} threads", scale.warehouse_count);

    let results: Vec<DriverResult<u64>> = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|t| {
                let open = &open;
                s.spawn(move || -> DriverResult<u64> {
                    let mut session = open()?;
                    let mut loader = Loader::new(session.as_mut(), scale, seed, batch_size)
                        .with_stream(LOADER_STREAM - 1 - t as u64);
                    for w_id in 1..=scale.warehouse_count {
                        if (w_id as usize - 1) % workers == t {
                            loader.load_warehouse(w_id)?;
                        }
                    }
                    Ok(loader.written())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(DriverError::Other(anyhow!("loader thread panicked"))))
            })
            .collect()
    });

    for result in results {
        written += result?;
    }
    Ok(written)
}

/// Buffers rows and hands them to the backend in batches.
pub struct BatchWriter<'a> {
    backend: &'a mut dyn StorageBackend,
    batch_size: usize,
    buffer: Vec<Row>,
    written: u64,
}

impl<'a> BatchWriter<'a> {
    pub fn new(backend: &'a mut dyn StorageBackend, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            backend,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            written: 0,
        }
    }

    pub fn push(&mut self, row: Row) -> DriverResult<()> {
        self.buffer.push(row);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> DriverResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.backend.insert_batch(&self.buffer)?;
        self.written += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    /// Rows handed to the backend so far (excluding the unflushed tail).
    pub fn written(&self) -> u64 {
        self.written
    }
}

pub struct Loader<'a> {
    writer: BatchWriter<'a>,
    rng: WorkerRng,
    seed: u64,
    scale: ScaleParameters,
}

impl<'a> Loader<'a> {
    pub fn new(
        backend: &'a mut dyn StorageBackend,
        scale: ScaleParameters,
        seed: u64,
        batch_size: usize,
    ) -> Self {
        Self {
            writer: BatchWriter::new(backend, batch_size),
            rng: WorkerRng::new(seed, LOADER_STREAM),
            seed,
            scale,
        }
    }

    /// Draw from another stream. Parallel loaders each take their own.
    pub fn with_stream(mut self, stream_index: u64) -> Self {
        self.rng = WorkerRng::new(self.seed, stream_index);
        self
    }

    pub fn written(&self) -> u64 {
        self.writer.written()
    }

    /// Items, then every warehouse in id order. Returns rows written.
    pub fn load_all(mut self) -> DriverResult<u64> {
        self.load_items()?;
        for w_id in 1..=self.scale.warehouse_count {
            self.load_warehouse(w_id)?;
        }
        self.writer.flush()?;
        Ok(self.writer.written())
    }

    /// The shared item catalogue; 10% of items carry "ORIGINAL" in their data.
    pub fn load_items(&mut self) -> DriverResult<()> {
        info!("loading {} items", self.scale.item_count);
        let original = self.pick_unique(self.scale.item_count / 10, self.scale.item_count);
        for i_id in 1..=self.scale.item_count {
            let item = self.item(i_id, original.contains(&i_id));
            self.writer.push(Row::Item(item))?;
        }
        self.writer.flush()
    }

    /// One warehouse with its districts, customers, history, orders and stock.
    pub fn load_warehouse(&mut self, w_id: WarehouseId) -> DriverResult<()> {
        info!("loading warehouse {w_id}");
        let warehouse = self.warehouse(w_id);
        self.writer.push(Row::Warehouse(warehouse))?;

        for d_id in 1..=self.scale.districts_per_warehouse {
            self.load_district(w_id, d_id)?;
        }

        let original = self.pick_unique(self.scale.item_count / 10, self.scale.item_count);
        for i_id in 1..=self.scale.item_count {
            let stock = self.stock(w_id, i_id, original.contains(&i_id));
            self.writer.push(Row::Stock(stock))?;
        }
        self.writer.flush()
    }

    fn load_district(&mut self, w_id: WarehouseId, d_id: DistrictId) -> DriverResult<()> {
        let customers = self.scale.customers_per_district;
        let district = self.district(w_id, d_id, customers + 1);
        self.writer.push(Row::District(district))?;

        let bad_credit = self.pick_unique(customers / 10, customers);
        for c_id in 1..=customers {
            let customer = self.customer(w_id, d_id, c_id, bad_credit.contains(&c_id));
            self.writer.push(Row::Customer(customer))?;
            let history = self.history(w_id, d_id, c_id);
            self.writer.push(Row::History(history))?;
        }
        self.writer.flush()?;

        // One order per customer, in a random customer order. The newest
        // `new_orders_per_district` orders stay undelivered.
        let mut owners: Vec<CustomerId> = (1..=customers).collect();
        self.rng.shuffle(&mut owners);
        let first_new_order = customers - self.scale.new_orders_per_district + 1;
        for (o_id, c_id) in (1..).zip(owners) {
            let undelivered = o_id >= first_new_order;
            let order = self.order(w_id, d_id, o_id, c_id, undelivered);
            self.writer.push(Row::Order(order))?;
            if undelivered {
                self.writer.push(Row::NewOrder(NewOrder { o_id, d_id, w_id }))?;
            }
        }
        self.writer.flush()?;
        debug!("loaded district {w_id}/{d_id}: {customers} customers");
        Ok(())
    }

    /// `count` distinct ids drawn from 1..=max.
    fn pick_unique(&mut self, count: i32, max: i32) -> HashSet<i32> {
        let mut ids: Vec<i32> = (1..=max).collect();
        self.rng.shuffle(&mut ids);
        ids.truncate(usize::try_from(count).unwrap_or(0));
        ids.into_iter().collect()
    }

    // ── Row synthesis ─────────────────────────────────────────────

    fn item(&mut self, i_id: ItemId, original: bool) -> Item {
        let rng = &mut self.rng;
        let mut data = rng.alpha_string_between(MIN_I_DATA, MAX_I_DATA);
        if original {
            data = rng.embed(&data, ORIGINAL_MARKER);
        }
        Item {
            i_id,
            im_id: rng.rand_int(MIN_IM, MAX_IM),
            name: rng.alpha_string_between(MIN_I_NAME, MAX_I_NAME),
            price: rng.rand_float(MIN_PRICE, MAX_PRICE, MONEY_DECIMALS),
            data,
        }
    }

    fn warehouse(&mut self, w_id: WarehouseId) -> Warehouse {
        let rng = &mut self.rng;
        let address = NameGenerator::address(rng);
        Warehouse {
            w_id,
            name: rng.alpha_string_between(MIN_NAME, MAX_NAME),
            street_1: address.street_1,
            street_2: address.street_2,
            city: address.city,
            state: address.state,
            zip: address.zip,
            tax: rng.rand_float(MIN_TAX, MAX_TAX, TAX_DECIMALS),
            ytd: INITIAL_W_YTD,
        }
    }

    fn district(&mut self, w_id: WarehouseId, d_id: DistrictId, next_o_id: OrderId) -> District {
        let rng = &mut self.rng;
        let address = NameGenerator::address(rng);
        District {
            d_id,
            w_id,
            name: rng.alpha_string_between(MIN_NAME, MAX_NAME),
            street_1: address.street_1,
            street_2: address.street_2,
            city: address.city,
            state: address.state,
            zip: address.zip,
            tax: rng.rand_float(MIN_TAX, MAX_TAX, TAX_DECIMALS),
            ytd: INITIAL_D_YTD,
            next_o_id,
        }
    }

    fn customer(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        c_id: CustomerId,
        bad_credit: bool,
    ) -> Customer {
        let rng = &mut self.rng;
        let address = NameGenerator::address(rng);
        Customer {
            c_id,
            d_id,
            w_id,
            first: NameGenerator::first_name(rng),
            middle: MIDDLE_NAME.to_string(),
            last: NameGenerator::customer_last_name(c_id, rng),
            street_1: address.street_1,
            street_2: address.street_2,
            city: address.city,
            state: address.state,
            zip: address.zip,
            phone: rng.numeric_string(PHONE_LEN),
            since: Utc::now(),
            credit: (if bad_credit { BAD_CREDIT } else { GOOD_CREDIT }).to_string(),
            credit_lim: INITIAL_CREDIT_LIM,
            discount: rng.rand_float(MIN_DISCOUNT, MAX_DISCOUNT, DISCOUNT_DECIMALS),
            balance: INITIAL_BALANCE,
            ytd_payment: INITIAL_YTD_PAYMENT,
            payment_cnt: INITIAL_PAYMENT_CNT,
            delivery_cnt: INITIAL_DELIVERY_CNT,
            data: rng.alpha_string_between(MIN_C_DATA, MAX_C_DATA),
        }
    }

    fn history(&mut self, w_id: WarehouseId, d_id: DistrictId, c_id: CustomerId) -> History {
        History {
            c_id,
            c_d_id: d_id,
            c_w_id: w_id,
            d_id,
            w_id,
            date: Utc::now(),
            amount: INITIAL_HISTORY_AMOUNT,
            data: self.rng.alpha_string_between(MIN_H_DATA, MAX_H_DATA),
        }
    }

    fn order(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        o_id: OrderId,
        c_id: CustomerId,
        undelivered: bool,
    ) -> Order {
        let entry_d = Utc::now();
        let carrier_id = if undelivered {
            NULL_CARRIER_ID
        } else {
            self.rng.rand_int(MIN_CARRIER_ID, MAX_CARRIER_ID)
        };
        let ol_cnt = self.rng.rand_int(MIN_OL_CNT, MAX_OL_CNT);
        let lines = (1..=ol_cnt)
            .map(|number| self.order_line(w_id, d_id, o_id, number, undelivered))
            .collect();
        Order {
            o_id,
            c_id,
            d_id,
            w_id,
            entry_d,
            carrier_id,
            ol_cnt,
            all_local: INITIAL_ALL_LOCAL,
            lines,
        }
    }

    fn order_line(
        &mut self,
        w_id: WarehouseId,
        d_id: DistrictId,
        o_id: OrderId,
        number: i32,
        undelivered: bool,
    ) -> OrderLine {
        let warehouses = self.scale.warehouse_count;
        let rng = &mut self.rng;
        let supply_w_id = if warehouses > 1 && rng.rand_int(1, 100) == 1 {
            rng.rand_int_excluding(1, warehouses, w_id)
        } else {
            w_id
        };
        OrderLine {
            o_id,
            d_id,
            w_id,
            number,
            i_id: rng.rand_int(1, self.scale.item_count),
            supply_w_id,
            delivery_d: if undelivered { None } else { Some(Utc::now()) },
            quantity: INITIAL_OL_QUANTITY,
            amount: rng.rand_float(
                MIN_OL_AMOUNT,
                MAX_PRICE * f64::from(MAX_OL_QUANTITY),
                MONEY_DECIMALS,
            ),
            dist_info: rng.alpha_string(DIST_INFO_LEN),
        }
    }

    fn stock(&mut self, w_id: WarehouseId, i_id: ItemId, original: bool) -> Stock {
        let rng = &mut self.rng;
        let mut data = rng.alpha_string_between(MIN_I_DATA, MAX_I_DATA);
        if original {
            data = rng.embed(&data, ORIGINAL_MARKER);
        }
        Stock {
            i_id,
            w_id,
            quantity: rng.rand_int(MIN_QUANTITY, MAX_QUANTITY),
            dists: (0..DISTRICTS_PER_WAREHOUSE)
                .map(|_| rng.alpha_string(DIST_INFO_LEN))
                .collect(),
            ytd: 0,
            order_cnt: 0,
            remote_cnt: 0,
            data,
        }
    }
}
