//! Order reconciler: settles pending marketplace orders from token transfers.
//!
//! Matching is by `(buyer, seller, amount)` only. Two simultaneously pending
//! orders of the same shape between the same accounts are indistinguishable;
//! the first one the store returns is settled.
//!
//! A transaction hash settles at most one order, so reconciling the same
//! transfer again after a replay is a no-op.

use std::sync::Arc;

use alloy_primitives::U256;
use tracing::{debug, info};

use crate::account::AccountRef;
use crate::error::SyncError;
use crate::store::OrderStore;

pub struct OrderReconciler {
    orders: Arc<dyn OrderStore>,
}

impl OrderReconciler {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Try to settle an order paid by `seller → buyer` token transfer.
    ///
    /// `from` is the paying side as seen on-chain (the seller's wallet sends
    /// to the buyer's wallet). Returns the settled order id, or `None` if the
    /// transfer is not a registered peer-to-peer transfer or matches no order.
    pub async fn reconcile(
        &self,
        tx_hash: &str,
        from: AccountRef,
        to: AccountRef,
        amount: U256,
    ) -> Result<Option<i64>, SyncError> {
        let (Some(seller), Some(buyer)) = (from.registered(), to.registered()) else {
            return Ok(None);
        };

        if let Some(order) = self.orders.find_by_tx_hash(tx_hash).await? {
            debug!(order = order.id, hash = %tx_hash, "transfer already settled an order");
            return Ok(None);
        }

        let Some(order) = self.orders.find_pending(buyer, seller, amount).await? else {
            debug!(buyer, seller, amount = %amount, "no pending order for transfer");
            return Ok(None);
        };

        if !self.orders.settle(order.id, tx_hash).await? {
            debug!(order = order.id, "order no longer pending");
            return Ok(None);
        }

        info!(order = order.id, buyer, seller, amount = %amount, hash = %tx_hash, "order settled");
        Ok(Some(order.id))
    }
}
