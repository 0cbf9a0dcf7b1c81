pub mod adapter;
pub mod arguments;
pub mod builder;
pub mod chain;
pub mod client;
pub mod context;
pub mod error;
pub mod permit;
pub mod submission;
pub mod subscription;
pub mod tracker;
pub mod traits;

pub use error::Error;
use {
    arguments::{Arguments, Command},
    client::OrderClient,
    context::Context,
    futures::StreamExt,
};

/// Runs the requested command to completion.
pub async fn run(args: Arguments) -> Result<(), Error> {
    let context = Context::connect(&args).await?;
    let client = OrderClient::new(context);

    match &args.command {
        Command::Create(create) => {
            let params = create.params(&args, client.account())?;
            let created = client.create(params).await?;
            let submission = &created.submission;
            tracing::info!(
                order = %submission.order,
                tx = %submission.tx_hash,
                mode = %submission.mode,
                spend = %submission.spend,
                fee = %created.fee.amount,
                quoted = created.fee.quote.is_some(),
                "order created"
            );
            println!("{}", submission.order.id());
            if !create.follow {
                return Ok(());
            }
            let (_handle, mut updates) = client.follow(
                submission.order,
                created.order.quantity(),
                submission.block_number,
            )?;
            while let Some(tracked) = updates.next().await {
                let tracked = tracked?;
                tracing::info!(
                    state = %tracked.state,
                    filled = %tracked.filled,
                    received = %tracked.received,
                    fees = %tracked.fees,
                    reason = ?tracked.cancel_reason,
                    "order updated"
                );
            }
        }
        Command::Cancel(order) => {
            let order = order.order_ref(&args, client.account())?;
            let tx_hash = client.cancel(&order).await?;
            tracing::info!(%order, tx = %tx_hash, "cancellation requested");
            println!("{tx_hash}");
        }
        Command::Status(order) => {
            let order = order.order_ref(&args, client.account())?;
            let record = client.status(&order).await?;
            let record = serde_json::to_string_pretty(&record)
                .map_err(|err| Error::Other(err.into()))?;
            println!("{record}");
        }
        Command::Watch { from_block } => {
            let (_handle, mut events) = client.watch(*from_block)?;
            while let Some(event) = events.next().await {
                let event = event?;
                tracing::info!(
                    order = %event.order_id,
                    kind = %event.kind,
                    block = ?event.block_number,
                    tx = ?event.tx_hash,
                    removed = event.removed,
                    "order event"
                );
            }
        }
    }
    Ok(())
}
