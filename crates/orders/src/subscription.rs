//! Stream of decoded processor events that survives transport drops.

use {
    crate::{
        adapter::{OrderEvent, Processor},
        error::Error,
        traits::LogSource,
    },
    alloy::rpc::types::Log,
    futures::{StreamExt, stream::BoxStream},
    model::OrderId,
    std::{collections::HashSet, sync::Arc, time::Duration},
    tokio::sync::watch,
};

/// Reorgs deeper than this many blocks are not handled.
pub const MAX_REORG_BLOCK_COUNT: u64 = 64;

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Stops the associated event stream when cancelled or dropped.
pub struct SubscriptionHandle {
    _cancel: watch::Sender<()>,
}

impl SubscriptionHandle {
    pub fn cancel(self) {}
}

/// Subscribes to the lifecycle events of `processor`.
///
/// The stream is lazy: nothing is requested before it is first polled. When
/// the live subscription drops, logs are backfilled from the last block that
/// was seen and the subscription is re-established. Every log is delivered at
/// most once even if the node redelivers it, and a log retracted by a reorg
/// is delivered again with `removed` set. If re-establishing fails the stream
/// yields [`Error::Subscription`] and ends.
pub fn subscribe(
    logs: Arc<dyn LogSource>,
    processor: Processor,
    from_block: Option<u64>,
) -> (SubscriptionHandle, BoxStream<'static, Result<OrderEvent, Error>>) {
    let (cancel, mut cancelled) = watch::channel(());
    let stream = async_stream::stream! {
        let filter = processor.filter();
        let mut last_block = from_block;
        let mut delivered = Delivered::default();
        let mut accept = move |log: &Log, head: Option<u64>| -> Option<OrderEvent> {
            let event = processor.decode_event(log)?;
            if !delivered.admit(&event, head) {
                return None;
            }
            Metrics::event(&event);
            Some(event)
        };

        'subscription: loop {
            if cancelled.has_changed().is_err() {
                break;
            }
            let mut live = match logs.subscribe(&filter).await {
                Ok(live) => live,
                Err(err) => {
                    yield Err(Error::Subscription(format!("{err:#}")));
                    break;
                }
            };
            tracing::debug!(processor = %processor.address, ?last_block, "subscribed to order events");

            // Subscribing first and backfilling second leaves no gap; overlaps
            // are deduplicated.
            let backfill = match last_block {
                Some(from) => logs.logs(&filter.clone().from_block(from)).await,
                None => logs.block_number().await.map(|block| {
                    last_block = Some(block);
                    Vec::new()
                }),
            };
            match backfill {
                Ok(backfill) => {
                    for log in backfill {
                        last_block = log.block_number.max(last_block);
                        if let Some(event) = accept(&log, last_block) {
                            yield Ok(event);
                        }
                    }
                }
                Err(err) => {
                    yield Err(Error::Subscription(format!("{err:#}")));
                    break;
                }
            }

            loop {
                let next = tokio::select! {
                    _ = cancelled.changed() => break 'subscription,
                    log = live.next() => log,
                };
                let Some(log) = next else {
                    tracing::warn!(?last_block, "order event subscription dropped, resubscribing");
                    Metrics::get().resubscriptions.inc();
                    tokio::select! {
                        _ = cancelled.changed() => break 'subscription,
                        _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
                    }
                    continue 'subscription;
                };
                last_block = log.block_number.max(last_block);
                if let Some(event) = accept(&log, last_block) {
                    yield Ok(event);
                }
            }
        }
    };
    (SubscriptionHandle { _cancel: cancel }, stream.boxed())
}

/// Logs delivered within the last [`MAX_REORG_BLOCK_COUNT`] blocks.
#[derive(Debug, Default)]
struct Delivered {
    keys: HashSet<(OrderId, u64, u64)>,
    /// Logs below this block are forgotten and no longer delivered.
    horizon: u64,
}

impl Delivered {
    /// Returns whether the event should be passed on: the first delivery of a
    /// log, or its removal after it was passed on.
    fn admit(&mut self, event: &OrderEvent, head: Option<u64>) -> bool {
        let horizon = head.unwrap_or_default().saturating_sub(MAX_REORG_BLOCK_COUNT);
        if horizon > self.horizon {
            self.horizon = horizon;
            self.keys.retain(|(_, block, _)| *block >= horizon);
        }
        let Some(key) = event.key() else {
            // Pending logs have no identity to deduplicate on.
            return !event.removed;
        };
        if event.removed {
            return self.keys.remove(&key);
        }
        key.1 >= self.horizon && self.keys.insert(key)
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "order_events")]
struct Metrics {
    /// Decoded order events by kind.
    #[metric(labels("kind"))]
    events: prometheus::IntCounterVec,

    /// Number of times the live subscription had to be re-established.
    resubscriptions: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    fn event(event: &OrderEvent) {
        Self::get()
            .events
            .with_label_values(&[event.kind.to_string().as_str()])
            .inc();
    }
}
