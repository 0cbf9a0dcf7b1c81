use {
    crate::{
        adapter::{OrderEvent, OrderRef},
        builder::{BuiltOrder, OrderBuilder, OrderParams},
        context::Context,
        error::Error,
        permit::PermitAuthorizer,
        submission::{Submission, SubmissionComposer},
        subscription::{self, SubscriptionHandle},
        tracker::{OrderTracker, TrackedOrder},
    },
    alloy::primitives::{Address, B256, U256},
    anyhow::Context as _,
    fee::ResolvedFee,
    futures::{StreamExt, stream::BoxStream},
    model::{Order, OrderRecord},
};

/// An order that was accepted by the processor.
#[derive(Clone, Debug)]
pub struct CreatedOrder {
    pub order: Order,
    pub fee: ResolvedFee,
    pub submission: Submission,
}

/// Creates, cancels and follows orders of one account on one processor.
pub struct OrderClient {
    context: Context,
    builder: OrderBuilder,
    composer: SubmissionComposer,
}

impl OrderClient {
    pub fn new(context: Context) -> Self {
        let builder = OrderBuilder::new(context.processor_reads.clone(), context.tokens.clone());
        let permits = PermitAuthorizer::new(
            context.chain_id,
            context.signer.clone(),
            context.chain.clone(),
            context.tokens.clone(),
        );
        let composer = SubmissionComposer::new(
            context.processor,
            context.mode,
            permits,
            context.tokens.clone(),
            context.writer.clone(),
        );
        Self {
            context,
            builder,
            composer,
        }
    }

    pub fn account(&self) -> Address {
        self.context.signer.address()
    }

    /// Builds, prices, authorizes and submits an order.
    pub async fn create(&self, params: OrderParams) -> Result<CreatedOrder, Error> {
        let BuiltOrder {
            order,
            proceeds_estimate,
        } = self.builder.build(self.account(), params).await?;
        let fee = self.context.fees.resolve(&order, proceeds_estimate).await?;
        let submission = self.composer.submit(&order, &fee).await?;
        Ok(CreatedOrder {
            order,
            fee,
            submission,
        })
    }

    pub async fn cancel(&self, order: &OrderRef) -> Result<B256, Error> {
        self.composer.request_cancel(order).await
    }

    pub async fn status(&self, order: &OrderRef) -> Result<OrderRecord, Error> {
        let reads = &self.context.processor_reads;
        reads.confirm_order_id(order).await?;
        Ok(reads.order_record(order).await.context("order record")?)
    }

    /// All processor events from `from_block` on, or only new ones.
    pub fn watch(
        &self,
        from_block: Option<u64>,
    ) -> Result<(SubscriptionHandle, BoxStream<'static, Result<OrderEvent, Error>>), Error> {
        let logs = self.context.logs.clone().ok_or_else(|| {
            Error::Configuration("watching events needs a websocket rpc url".to_string())
        })?;
        Ok(subscription::subscribe(
            logs,
            self.context.processor,
            from_block,
        ))
    }

    /// Follows one order until it is settled, yielding its state after
    /// every change.
    ///
    /// With `from_block` the state is rebuilt from the events since that block,
    /// which should be the block the order was created in. Without it the
    /// state starts from what the processor currently reports.
    pub fn follow(
        &self,
        order: OrderRef,
        quantity: U256,
        from_block: Option<u64>,
    ) -> Result<(SubscriptionHandle, BoxStream<'static, Result<TrackedOrder, Error>>), Error> {
        let (handle, events) = self.watch(from_block)?;
        let reads = self.context.processor_reads.clone();
        let id = order.id();
        let stream = async_stream::stream! {
            let mut tracker = OrderTracker::default();
            tracker.track(order, quantity);
            if from_block.is_none() {
                match reads.order_record(&order).await {
                    Ok(record) => {
                        tracker.reconcile(&record);
                    }
                    Err(err) => {
                        yield Err(Error::Other(err));
                        return;
                    }
                }
            }
            if let Some(tracked) = tracker.get(&id) {
                let settled = tracked.state.is_terminal();
                yield Ok(tracked.clone());
                if settled {
                    return;
                }
            }

            let mut events = events.filter(move |event| {
                let keep = !matches!(event, Ok(event) if event.order_id != id);
                futures::future::ready(keep)
            });
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        yield Err(err);
                        return;
                    }
                };
                if !tracker.apply(&event) {
                    continue;
                }
                let Some(tracked) = tracker.get(&id) else {
                    continue;
                };
                let settled = tracked.state.is_terminal();
                yield Ok(tracked.clone());
                if settled {
                    return;
                }
            }
        };
        Ok((handle, stream.boxed()))
    }
}
