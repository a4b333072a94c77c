use std::sync::Arc;

use crate::domain::order::SalesOrder;
use crate::ledger::{LedgerSummary, WeightLedger};

/// The active order and its roll ledger, owned by whichever stage holds it.
#[derive(Clone, Debug)]
pub struct PackingSession {
    order: Arc<SalesOrder>,
    ledger: WeightLedger,
}

impl PackingSession {
    pub fn open(order: impl Into<Arc<SalesOrder>>) -> Self {
        let order = order.into();
        let ledger = WeightLedger::from_order(&order);
        tracing::info!(
            event_name = "packslip.session.opened",
            order_id = %order.order_id,
            rolls = ledger.len(),
            "packing session opened"
        );
        Self { order, ledger }
    }

    pub fn order(&self) -> &SalesOrder {
        &self.order
    }

    pub fn shared_order(&self) -> Arc<SalesOrder> {
        Arc::clone(&self.order)
    }

    pub fn ledger(&self) -> &WeightLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut WeightLedger {
        &mut self.ledger
    }

    /// Swaps in an edited order. A different instance regenerates the whole ledger,
    /// dropping every weight entered so far; the same instance changes nothing.
    pub fn resubmit(&mut self, order: Arc<SalesOrder>) -> bool {
        if Arc::ptr_eq(&self.order, &order) {
            return false;
        }

        let discarded = self.ledger.rolls().iter().filter(|roll| !roll.weight.is_empty()).count();
        if discarded > 0 {
            tracing::warn!(
                event_name = "packslip.session.weights_discarded",
                order_id = %order.order_id,
                discarded,
                "order resubmitted; entered weights were discarded"
            );
        }

        self.ledger = WeightLedger::from_order(&order);
        self.order = order;
        true
    }

    /// Opt-in alternative to [`Self::resubmit`] keeping weights of rolls that survive the edit.
    pub fn resubmit_preserving_weights(&mut self, order: Arc<SalesOrder>) -> bool {
        if Arc::ptr_eq(&self.order, &order) {
            return false;
        }

        self.ledger = self.ledger.rebuild_preserving(&order.lines);
        self.order = order;
        true
    }

    pub fn summary(&self) -> LedgerSummary {
        self.ledger.summary()
    }
}
