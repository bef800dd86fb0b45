//! Workers: weighted transaction choice, input synthesis, timing.
//!
//! RULE: A worker owns its executor (and so its backend session) and
//! its RNG outright. The only things it shares are the read-only scale
//! parameters, the event queue and the cancellation token.

use crate::{
    cancel::CancellationToken,
    error::DriverResult,
    event::{CompletionEvent, TransactionType},
    executor::Executor,
    name_generator::NameGenerator,
    rng::WorkerRng,
    scale::ScaleParameters,
    transactions::{
        delivery::DeliveryParams,
        new_order::{NewOrderLine, NewOrderParams},
        order_status::OrderStatusParams,
        payment::PaymentParams,
        stock_level::StockLevelParams,
        CustomerSelector,
    },
    types::*,
};
use chrono::Utc;
use crossbeam::channel::Sender;
use log::{debug, info, warn};
use std::{collections::HashSet, sync::Arc, time::Instant};

/// Percent chance that a New-Order line is supplied by another warehouse.
const REMOTE_LINE_PERCENT: i32 = 1;

pub struct Worker {
    id: WorkerId,
    executor: Executor,
    rng: WorkerRng,
    scale: Arc<ScaleParameters>,
    percent_fail: i32,
    events: Sender<CompletionEvent>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        id: WorkerId,
        executor: Executor,
        master_seed: u64,
        scale: Arc<ScaleParameters>,
        percent_fail: i32,
        events: Sender<CompletionEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            executor,
            rng: WorkerRng::new(master_seed, id as u64),
            scale,
            percent_fail,
            events,
            cancel,
        }
    }

    /// Run transactions until cancelled or until the event queue closes.
    /// Returns the number of transactions attempted.
    pub fn run(mut self) -> u64 {
        info!("worker {} started", self.id);
        let mut attempted = 0u64;

        while !self.cancel.is_cancelled() {
            let ty = choose_transaction(&mut self.rng);
            let started = Instant::now();
            let result = self.execute(ty);
            let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;

            let failed = match result {
                Ok(()) => false,
                Err(e) if e.is_expected_abort() => true,
                Err(e) => {
                    debug!("worker {}: {ty} failed: {e}", self.id);
                    true
                }
            };
            attempted += 1;

            let event = CompletionEvent {
                worker_id: self.id,
                transaction_type: ty,
                failed,
                latency_ms,
            };
            if self.events.send(event).is_err() {
                warn!("worker {}: event queue closed, stopping", self.id);
                break;
            }
        }

        info!("worker {} stopped after {attempted} transactions", self.id);
        attempted
    }

    fn execute(&mut self, ty: TransactionType) -> DriverResult<()> {
        let scale = *self.scale;
        let rng = &mut self.rng;
        match ty {
            TransactionType::NewOrder => {
                let params = new_order_params(rng, &scale, self.percent_fail);
                self.executor.do_new_order(&params).map(drop)
            }
            TransactionType::Payment => {
                let params = payment_params(rng, &scale);
                self.executor.do_payment(&params).map(drop)
            }
            TransactionType::OrderStatus => {
                let params = order_status_params(rng, &scale);
                self.executor.do_order_status(&params).map(drop)
            }
            TransactionType::Delivery => {
                let params = delivery_params(rng, &scale);
                self.executor.do_delivery(&params).map(drop)
            }
            TransactionType::StockLevel => {
                let params = stock_level_params(rng, &scale);
                self.executor.do_stock_level(&params).map(drop)
            }
        }
    }
}

// ── Input synthesis ───────────────────────────────────────────────

pub fn choose_transaction(rng: &mut WorkerRng) -> TransactionType {
    TransactionType::from_roll(rng.rand_int(1, 100))
}

fn customer_selector(rng: &mut WorkerRng, scale: &ScaleParameters) -> CustomerSelector {
    if rng.percent(LAST_NAME_LOOKUP_PERCENT) {
        CustomerSelector::LastName(NameGenerator::random_last_name(rng))
    } else {
        CustomerSelector::Id(rng.rand_int(1, scale.customers_per_district))
    }
}

/// Distinct item ids while the catalogue is large enough, repeats otherwise.
fn draw_item_ids(rng: &mut WorkerRng, count: usize, item_count: i32) -> Vec<ItemId> {
    let distinct = usize::try_from(item_count).unwrap_or(0) >= count;
    let mut seen = HashSet::with_capacity(count);
    let mut ids = Vec::with_capacity(count);
    while ids.len() < count {
        let i_id = rng.rand_int(1, item_count);
        if !distinct || seen.insert(i_id) {
            ids.push(i_id);
        }
    }
    ids
}

pub fn new_order_params(
    rng: &mut WorkerRng,
    scale: &ScaleParameters,
    percent_fail: i32,
) -> NewOrderParams {
    let w_id = rng.rand_int(1, scale.warehouse_count);
    let d_id = rng.rand_int(1, scale.districts_per_warehouse);
    let c_id = rng.rand_int(1, scale.customers_per_district);
    let ol_cnt = rng.rand_int(MIN_OL_CNT, MAX_OL_CNT) as usize;

    let mut lines: Vec<NewOrderLine> = draw_item_ids(rng, ol_cnt, scale.item_count)
        .into_iter()
        .map(|i_id| {
            let supply_w_id = if scale.warehouse_count > 1 && rng.percent(REMOTE_LINE_PERCENT) {
                rng.rand_int_excluding(1, scale.warehouse_count, w_id)
            } else {
                w_id
            };
            NewOrderLine {
                i_id,
                supply_w_id,
                quantity: rng.rand_int(1, MAX_OL_QUANTITY),
            }
        })
        .collect();

    if rng.percent(percent_fail) {
        if let Some(last) = lines.last_mut() {
            last.i_id = scale.item_count + 1;
        }
    }

    NewOrderParams {
        w_id,
        d_id,
        c_id,
        entry_d: Utc::now(),
        lines,
    }
}

pub fn payment_params(rng: &mut WorkerRng, scale: &ScaleParameters) -> PaymentParams {
    let w_id = rng.rand_int(1, scale.warehouse_count);
    let d_id = rng.rand_int(1, scale.districts_per_warehouse);
    let amount = rng.rand_float(MIN_PAYMENT, MAX_PAYMENT, MONEY_DECIMALS);

    let (c_w_id, c_d_id) =
        if scale.warehouse_count > 1 && !rng.percent(LOCAL_PAYMENT_PERCENT) {
            (
                rng.rand_int_excluding(1, scale.warehouse_count, w_id),
                rng.rand_int(1, scale.districts_per_warehouse),
            )
        } else {
            (w_id, d_id)
        };

    PaymentParams {
        w_id,
        d_id,
        amount,
        c_w_id,
        c_d_id,
        customer: customer_selector(rng, scale),
        date: Utc::now(),
        bad_credit: BAD_CREDIT.to_string(),
        max_data_len: MAX_C_DATA,
    }
}

pub fn order_status_params(rng: &mut WorkerRng, scale: &ScaleParameters) -> OrderStatusParams {
    OrderStatusParams {
        w_id: rng.rand_int(1, scale.warehouse_count),
        d_id: rng.rand_int(1, scale.districts_per_warehouse),
        customer: customer_selector(rng, scale),
    }
}

pub fn delivery_params(rng: &mut WorkerRng, scale: &ScaleParameters) -> DeliveryParams {
    DeliveryParams {
        w_id: rng.rand_int(1, scale.warehouse_count),
        carrier_id: rng.rand_int(MIN_CARRIER_ID, MAX_CARRIER_ID),
        delivery_d: Utc::now(),
        district_count: scale.districts_per_warehouse,
    }
}

pub fn stock_level_params(rng: &mut WorkerRng, scale: &ScaleParameters) -> StockLevelParams {
    StockLevelParams {
        w_id: rng.rand_int(1, scale.warehouse_count),
        d_id: rng.rand_int(1, scale.districts_per_warehouse),
        threshold: rng.rand_int(MIN_STOCK_LEVEL_THRESHOLD, MAX_STOCK_LEVEL_THRESHOLD),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(warehouses: i32) -> ScaleParameters {
        ScaleParameters::tpcc(100.0, warehouses).unwrap()
    }

    #[test]
    fn new_order_lines_are_in_range_and_distinct() {
        let scale = scale(1);
        let mut rng = WorkerRng::new(42, 0);
        for _ in 0..500 {
            let p = new_order_params(&mut rng, &scale, 0);
            assert!((MIN_OL_CNT as usize..=MAX_OL_CNT as usize).contains(&p.lines.len()));
            let ids: HashSet<_> = p.lines.iter().map(|l| l.i_id).collect();
            assert_eq!(ids.len(), p.lines.len(), "item ids repeat within one order");
            for line in &p.lines {
                assert!((1..=scale.item_count).contains(&line.i_id));
                assert!((1..=MAX_OL_QUANTITY).contains(&line.quantity));
                assert_eq!(line.supply_w_id, p.w_id, "single warehouse cannot be remote");
            }
        }
    }

    #[test]
    fn percent_fail_100_always_poisons_last_line() {
        let scale = scale(1);
        let mut rng = WorkerRng::new(42, 1);
        for _ in 0..50 {
            let p = new_order_params(&mut rng, &scale, 100);
            assert_eq!(p.lines.last().unwrap().i_id, scale.item_count + 1);
        }
    }

    #[test]
    fn percent_fail_0_never_poisons() {
        let scale = scale(1);
        let mut rng = WorkerRng::new(42, 2);
        for _ in 0..500 {
            let p = new_order_params(&mut rng, &scale, 0);
            assert!(p.lines.iter().all(|l| l.i_id <= scale.item_count));
        }
    }

    #[test]
    fn about_one_percent_of_new_order_lines_are_remote() {
        let scale = scale(3);
        let mut rng = WorkerRng::new(11, 0);
        let (mut lines, mut remote) = (0, 0);
        for _ in 0..2_000 {
            let p = new_order_params(&mut rng, &scale, 0);
            for line in &p.lines {
                lines += 1;
                if line.supply_w_id != p.w_id {
                    assert!((1..=scale.warehouse_count).contains(&line.supply_w_id));
                    remote += 1;
                }
            }
        }
        // ~20k lines, 1% expected
        let rate = remote as f64 * 100.0 / lines as f64;
        assert!((0.6..=1.4).contains(&rate), "remote line rate: {rate:.2}%");
    }

    #[test]
    fn remote_payment_customer_uses_another_warehouse() {
        let scale = scale(3);
        let mut rng = WorkerRng::new(7, 0);
        let mut remote = 0;
        for _ in 0..2_000 {
            let p = payment_params(&mut rng, &scale);
            assert!((MIN_PAYMENT..=MAX_PAYMENT).contains(&p.amount));
            if p.c_w_id != p.w_id {
                remote += 1;
            }
        }
        // 15% expected
        assert!((200..=400).contains(&remote), "remote payments: {remote}");
    }

    #[test]
    fn delivery_covers_every_district() {
        let scale = scale(2);
        let mut rng = WorkerRng::new(1, 0);
        let p = delivery_params(&mut rng, &scale);
        assert_eq!(p.district_count, DISTRICTS_PER_WAREHOUSE);
        assert!((MIN_CARRIER_ID..=MAX_CARRIER_ID).contains(&p.carrier_id));
    }
}
