use crate::{
    backend::StorageBackend,
    error::{DriverError, DriverResult},
    types::{DistrictId, ItemId, WarehouseId, STOCK_LEVEL_ORDERS},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevelParams {
    pub w_id: WarehouseId,
    pub d_id: DistrictId,
    pub threshold: i32,
}

/// Read-only. Counts distinct low-stock items sold in the district's
/// last 20 orders. Runs without a transaction scope.
pub fn execute(backend: &mut dyn StorageBackend, params: &StockLevelParams) -> DriverResult<u64> {
    let (w_id, d_id) = (params.w_id, params.d_id);
    let district = backend
        .district(w_id, d_id)?
        .ok_or(DriverError::NotFound { table: "district" })?;
    let next = district.next_o_id;

    let mut i_ids: Vec<ItemId> =
        backend.order_line_items(w_id, d_id, next - STOCK_LEVEL_ORDERS, next)?;
    if i_ids.is_empty() {
        return Ok(0);
    }
    i_ids.sort_unstable();
    i_ids.dedup();
    backend.count_low_stock(w_id, &i_ids, params.threshold)
}
