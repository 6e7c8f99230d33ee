use super::{emit, unchanged};
use crate::action::{MoreProducts, StorefrontAction};
use crate::config::StorefrontConfig;
use crate::event::StorefrontEvent;
use crate::state::{PageState, ProductsState};
use storefront_sync_core::{Effects, ReduceError, Reducer};

/// Owns the visible product window
pub struct ProductsReducer;

impl ProductsReducer {
    /// Splice an adjacent window onto the current one
    ///
    /// Returns `false` when the window does not touch the current edges, which
    /// happens when a newer search replaced the products meanwhile.
    fn splice(products: &mut ProductsState, more: &MoreProducts) -> bool {
        if more.forward && more.low == products.high {
            products.records.extend(more.records.iter().cloned());
            products.high = more.high;
        } else if !more.forward && more.high == products.low {
            let mut records = more.records.clone();
            records.append(&mut products.records);
            products.records = records;
            products.low = more.low;
        } else {
            return false;
        }
        true
    }
}

impl Reducer for ProductsReducer {
    type State = ProductsState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        products: &mut ProductsState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::ReceiveProducts(Ok(page)) => {
                *products = ProductsState {
                    records: page.records.clone(),
                    total: page.total,
                    low: page.low,
                    high: page.high,
                };
                emit(StorefrontEvent::ProductsUpdated)
            },
            StorefrontAction::ReceiveMoreProducts(Ok(more)) if !more.records.is_empty() => {
                if Self::splice(products, more) {
                    emit(StorefrontEvent::MoreProductsAdded)
                } else {
                    tracing::debug!(
                        low = more.low,
                        high = more.high,
                        current_low = products.low,
                        current_high = products.high,
                        "Ignoring products that do not border the current window"
                    );
                    unchanged()
                }
            },
            _ => unchanged(),
        }
    }
}

/// Owns pagination
pub struct PageReducer;

impl Reducer for PageReducer {
    type State = PageState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontConfig;

    fn reduce(
        &self,
        page: &mut PageState,
        action: &StorefrontAction,
        _config: &StorefrontConfig,
    ) -> Result<Effects<StorefrontEvent>, ReduceError> {
        match action {
            StorefrontAction::UpdateSearch { .. }
            | StorefrontAction::SelectRefinement { .. }
            | StorefrontAction::DeselectRefinement { .. }
            | StorefrontAction::AddRefinement { .. }
            | StorefrontAction::ResetRefinements { .. }
            | StorefrontAction::SelectSort { .. }
            | StorefrontAction::SelectCollection { .. } => {
                if page.current == 1 {
                    return unchanged();
                }
                page.current = 1;
            },
            StorefrontAction::UpdateCurrentPage { page: current } => page.current = *current,
            StorefrontAction::UpdatePageSize { size } => {
                page.size = *size;
                page.current = 1;
            },
            StorefrontAction::ReceivePage { record_start, total } => {
                if page.size == 0 {
                    return Err(ReduceError::new("page", "page size is zero"));
                }
                let current = record_start.saturating_sub(1) / page.size + 1;
                let last = total.div_ceil(page.size).max(1);
                if current == page.current && last == page.last {
                    return unchanged();
                }
                page.current = current;
                page.last = last;
            },
            _ => return unchanged(),
        }
        emit(StorefrontEvent::PageUpdated)
    }
}
