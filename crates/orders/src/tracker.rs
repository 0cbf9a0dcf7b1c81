//! Local view of order lifecycles built from processor events.

use {
    crate::{
        adapter::{OrderEvent, OrderEventKind, OrderRef},
        subscription::MAX_REORG_BLOCK_COUNT,
    },
    alloy::primitives::U256,
    model::{OrderId, OrderRecord, OrderStatus},
    std::collections::{BTreeMap, HashMap},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, derive_more::Display)]
pub enum TrackedState {
    #[display("active")]
    Active,
    #[display("partially_filled")]
    PartiallyFilled,
    /// Cancellation was requested but not yet confirmed. The order can still
    /// be filled.
    #[display("cancel_requested")]
    CancelRequested,
    #[display("fulfilled")]
    Fulfilled,
    #[display("cancelled")]
    Cancelled,
}

impl TrackedState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Cancelled)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrackedOrder {
    pub order: Option<OrderRef>,
    pub state: TrackedState,
    /// Quantity of the spent token the order was created with, if known.
    pub quantity: Option<U256>,
    pub filled: U256,
    pub received: U256,
    pub fees: U256,
    pub cancel_reason: Option<String>,
    /// Progress of events that can no longer be reorged and of events without
    /// a position in the chain.
    settled: Progress,
    /// Events that may still be reorged, by block number and log index.
    recent: BTreeMap<(u64, u64), OrderEventKind>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Progress {
    state: TrackedState,
    filled: U256,
    received: U256,
    fees: U256,
    cancel_reason: Option<String>,
}

impl Progress {
    const INITIAL: Self = Self {
        state: TrackedState::Active,
        filled: U256::ZERO,
        received: U256::ZERO,
        fees: U256::ZERO,
        cancel_reason: None,
    };

    /// Events for settled orders have no effect.
    fn step(&mut self, kind: &OrderEventKind, quantity: Option<U256>) {
        if self.state.is_terminal() {
            return;
        }
        match kind {
            OrderEventKind::Created(_) => {}
            OrderEventKind::Fill {
                filled,
                received,
                fees,
            } => {
                self.filled = self.filled.saturating_add(*filled);
                self.received = self.received.saturating_add(*received);
                self.fees = self.fees.saturating_add(*fees);
                let drained = quantity.is_some_and(|quantity| self.filled >= quantity);
                self.state = if drained {
                    TrackedState::Fulfilled
                } else if self.state == TrackedState::CancelRequested {
                    TrackedState::CancelRequested
                } else {
                    TrackedState::PartiallyFilled
                };
            }
            OrderEventKind::Fulfilled => self.state = TrackedState::Fulfilled,
            OrderEventKind::CancelRequested => self.state = TrackedState::CancelRequested,
            OrderEventKind::Cancelled { reason } => {
                self.state = TrackedState::Cancelled;
                self.cancel_reason = Some(reason.clone());
            }
        }
    }
}

impl TrackedOrder {
    fn new(order: Option<OrderRef>, quantity: Option<U256>) -> Self {
        Self {
            order,
            state: TrackedState::Active,
            quantity,
            filled: U256::ZERO,
            received: U256::ZERO,
            fees: U256::ZERO,
            cancel_reason: None,
            settled: Progress::INITIAL,
            recent: BTreeMap::new(),
        }
    }

    pub fn remaining(&self) -> Option<U256> {
        Some(self.quantity?.saturating_sub(self.filled))
    }

    fn progress(&self) -> Progress {
        Progress {
            state: self.state,
            filled: self.filled,
            received: self.received,
            fees: self.fees,
            cancel_reason: self.cancel_reason.clone(),
        }
    }

    /// Recomputes the public view from the settled progress and the recent
    /// events in chain order.
    fn replay(&mut self) {
        let mut progress = self.settled.clone();
        for kind in self.recent.values() {
            progress.step(kind, self.quantity);
        }
        let Progress {
            state,
            filled,
            received,
            fees,
            cancel_reason,
        } = progress;
        self.state = state;
        self.filled = filled;
        self.received = received;
        self.fees = fees;
        self.cancel_reason = cancel_reason;
    }

    /// Folds the events up to and including `block` into the settled
    /// progress.
    fn finalize(&mut self, block: u64) {
        let recent = self.recent.split_off(&(block.saturating_add(1), 0));
        for kind in std::mem::replace(&mut self.recent, recent).values() {
            self.settled.step(kind, self.quantity);
        }
    }
}

/// Applies events delivered at least once and in any order. Events that a
/// reorg removes are rolled back. Only the last [`MAX_REORG_BLOCK_COUNT`]
/// blocks are kept per order, older events are folded into a running total.
#[derive(Debug, Default)]
pub struct OrderTracker {
    orders: HashMap<OrderId, TrackedOrder>,
    /// Events at or below this block are considered final.
    finalized: Option<u64>,
}

impl OrderTracker {
    /// Starts tracking an order that was just submitted.
    pub fn track(&mut self, order: OrderRef, quantity: U256) {
        let tracked = self
            .orders
            .entry(order.id())
            .or_insert_with(|| TrackedOrder::new(None, None));
        tracked.order = Some(order);
        tracked.quantity = Some(quantity);
        tracked.replay();
    }

    pub fn get(&self, id: &OrderId) -> Option<&TrackedOrder> {
        self.orders.get(id)
    }

    pub fn orders(&self) -> impl Iterator<Item = (&OrderId, &TrackedOrder)> {
        self.orders.iter()
    }

    /// Applies an event and returns whether it changed the local view.
    /// Redelivered events, events for orders in a terminal state and removals
    /// of events that were never applied are ignored.
    pub fn apply(&mut self, event: &OrderEvent) -> bool {
        let finalized = self.finalized;
        let tracked = self
            .orders
            .entry(event.order_id)
            .or_insert_with(|| TrackedOrder::new(None, None));
        let before = tracked.progress();
        let mut changed = false;
        if let (OrderEventKind::Created(order), None, false) =
            (&event.kind, tracked.order, event.removed)
        {
            tracked.order = Some(*order);
            changed = true;
        }

        let position = event.block_number.zip(event.log_index);
        let recorded = match position {
            Some((block, _)) if finalized.is_some_and(|finalized| block <= finalized) => {
                tracing::debug!(order = %event.order_id, block, "ignoring event in finalized block");
                false
            }
            Some(position) if event.removed => tracked.recent.remove(&position).is_some(),
            Some(position) => tracked.recent.insert(position, event.kind.clone()).is_none(),
            None if event.removed => false,
            None => {
                tracked.settled.step(&event.kind, tracked.quantity);
                true
            }
        };
        if !recorded {
            tracing::trace!(order = %event.order_id, removed = event.removed, "ignoring redelivered event");
            return changed;
        }
        if before.state.is_terminal() && !event.removed {
            tracing::debug!(
                order = %event.order_id,
                state = %before.state,
                event = %event.kind,
                "event for settled order"
            );
        }
        if event.removed {
            tracing::info!(order = %event.order_id, event = %event.kind, block = ?event.block_number, "rolling back reorged event");
        }
        tracked.replay();
        if before.state != tracked.state {
            tracing::debug!(order = %event.order_id, from = %before.state, to = %tracked.state, "order state changed");
        }
        changed |= before != tracked.progress();

        if let Some((block, _)) = position {
            self.advance(block);
        }
        changed
    }

    /// Moves the finality horizon to [`MAX_REORG_BLOCK_COUNT`] blocks below
    /// `head`.
    fn advance(&mut self, head: u64) {
        let Some(finalized) = head.checked_sub(MAX_REORG_BLOCK_COUNT) else {
            return;
        };
        if self.finalized.is_some_and(|current| current >= finalized) {
            return;
        }
        self.finalized = Some(finalized);
        for tracked in self.orders.values_mut() {
            tracked.finalize(finalized);
        }
    }

    /// Replaces the local view of an order with what the processor reports.
    /// Records of unknown orders are ignored because the event that creates
    /// them may not be visible to the node yet.
    pub fn reconcile(&mut self, record: &OrderRecord) -> bool {
        if record.status == OrderStatus::None {
            return false;
        }
        let tracked = self
            .orders
            .entry(record.id)
            .or_insert_with(|| TrackedOrder::new(None, None));
        tracked.received = record.total_received;
        if let Some(quantity) = tracked.quantity {
            tracked.filled = quantity.saturating_sub(record.remaining_quantity);
        }
        tracked.state = match record.status {
            OrderStatus::Fulfilled => TrackedState::Fulfilled,
            OrderStatus::Cancelled => TrackedState::Cancelled,
            _ if tracked.state == TrackedState::CancelRequested => TrackedState::CancelRequested,
            _ if !tracked.filled.is_zero() || !tracked.received.is_zero() => {
                TrackedState::PartiallyFilled
            }
            _ => TrackedState::Active,
        };
        tracked.settled = tracked.progress();
        tracked.recent.clear();
        true
    }
}
