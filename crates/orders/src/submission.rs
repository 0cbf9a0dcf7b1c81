//! Composes and sends the transactions that authorize and create an order.

use {
    crate::{
        adapter::{OrderRef, Processor},
        error::Error,
        permit::PermitAuthorizer,
        traits::{ChainWrite, Receipt, TokenRead},
    },
    alloy::{
        primitives::{Address, B256, Bytes, U256},
        sol_types::SolCall,
    },
    anyhow::{Context, anyhow},
    contracts::alloy::IERC20Permit::IERC20Permit,
    fee::ResolvedFee,
    model::{Order, PermitAuthorization},
    std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    },
    tokio::sync::OwnedMutexGuard,
};

/// Minimum time a quote or permit must stay valid after submission so the
/// transaction can still be included.
pub const INCLUSION_HEADROOM: Duration = Duration::from_secs(15);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum, derive_more::Display)]
pub enum SubmissionMode {
    /// Permit and order in one `multicall` transaction.
    #[default]
    #[display("atomic")]
    Atomic,
    /// `approve`, wait for it to be mined, then the order.
    #[display("approve")]
    Approve,
}

/// Serializes permits per `(token, owner)` so two submissions never sign
/// with the same nonce.
#[derive(Default)]
pub struct PermitLocks(Mutex<HashMap<(Address, Address), Arc<tokio::sync::Mutex<()>>>>);

impl PermitLocks {
    pub async fn lock(&self, token: Address, owner: Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry((token, owner)).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// A created order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Submission {
    pub order: OrderRef,
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    /// The mode that was actually used. Atomic submissions fall back to
    /// approvals for tokens without permits.
    pub mode: SubmissionMode,
    /// Amount of the spent token authorized for the processor.
    pub spend: U256,
}

pub struct SubmissionComposer {
    processor: Processor,
    mode: SubmissionMode,
    permits: PermitAuthorizer,
    tokens: Arc<dyn TokenRead>,
    writer: Arc<dyn ChainWrite>,
    locks: PermitLocks,
}

impl SubmissionComposer {
    pub fn new(
        processor: Processor,
        mode: SubmissionMode,
        permits: PermitAuthorizer,
        tokens: Arc<dyn TokenRead>,
        writer: Arc<dyn ChainWrite>,
    ) -> Self {
        Self {
            processor,
            mode,
            permits,
            tokens,
            writer,
            locks: PermitLocks::default(),
        }
    }

    /// Authorizes the spend of `order` including fees and creates it.
    pub async fn submit(&self, order: &Order, fee: &ResolvedFee) -> Result<Submission, Error> {
        let now = now();
        let headroom = INCLUSION_HEADROOM.as_secs();
        if let Some(quote) = fee.quote.as_ref().filter(|q| !q.is_valid_at(now, headroom)) {
            return Err(Error::QuoteExpired {
                deadline: quote.deadline,
            });
        }
        let spend = fee
            .total_spend(order)
            .ok_or_else(|| anyhow!("order spend overflows"))?;
        let order_call = self.processor.encode_order(order, fee)?;
        let token = order.spent_token();

        let _guard = self.locks.lock(token, self.permits.owner()).await;
        let (mode, result) = match self.mode {
            SubmissionMode::Atomic => {
                match self
                    .permits
                    .authorize(token, self.processor.address, spend)
                    .await?
                {
                    Some(permit) => {
                        if permit.message.deadline <= now + headroom {
                            return Err(Error::PermitExpired {
                                deadline: permit.message.deadline,
                            });
                        }
                        (SubmissionMode::Atomic, self.atomic(&permit, order_call).await)
                    }
                    None => {
                        tracing::warn!(%token, "token does not support permits, approving instead");
                        let result = self.approve_then_order(token, spend, order_call).await;
                        (SubmissionMode::Approve, result)
                    }
                }
            }
            SubmissionMode::Approve => {
                let result = self.approve_then_order(token, spend, order_call).await;
                (SubmissionMode::Approve, result)
            }
        };
        Metrics::submission(mode, &result);
        let receipt = result?;

        let created = self
            .processor
            .created_order(&receipt.logs)
            .with_context(|| format!("no order creation event in {}", receipt.tx_hash))?;
        tracing::info!(order = %created, tx = %receipt.tx_hash, %mode, %spend, "order submitted");
        Ok(Submission {
            order: created,
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            mode,
            spend,
        })
    }

    /// Requests cancellation. The order is only cancelled once the processor
    /// confirms it with an `OrderCancelled` event.
    pub async fn request_cancel(&self, order: &OrderRef) -> Result<B256, Error> {
        let calldata = self.processor.encode_cancel(order)?;
        let result = self.writer.send(self.processor.address, calldata).await;
        Metrics::cancel(&result);
        let receipt = result?;
        tracing::info!(%order, tx = %receipt.tx_hash, "cancellation requested");
        Ok(receipt.tx_hash)
    }

    async fn atomic(
        &self,
        permit: &PermitAuthorization,
        order_call: Bytes,
    ) -> Result<Receipt, Error> {
        let calldata = self
            .processor
            .encode_multicall(vec![self.processor.encode_self_permit(permit), order_call]);
        self.writer.send(self.processor.address, calldata).await
    }

    async fn approve_then_order(
        &self,
        token: Address,
        spend: U256,
        order_call: Bytes,
    ) -> Result<Receipt, Error> {
        let allowance = self
            .tokens
            .allowance(token, self.writer.sender(), self.processor.address)
            .await
            .context("allowance")?;
        if allowance < spend {
            let approve = IERC20Permit::approveCall {
                spender: self.processor.address,
                value: spend,
            }
            .abi_encode();
            let receipt = self.writer.send(token, approve.into()).await?;
            tracing::debug!(%token, %spend, tx = %receipt.tx_hash, "approved processor");
        }
        self.writer.send(self.processor.address, order_call).await
    }
}

fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "submission")]
struct Metrics {
    /// Order submissions by mode and result.
    #[metric(labels("mode", "result"))]
    orders: prometheus::IntCounterVec,

    /// Cancellation requests by result.
    #[metric(labels("result"))]
    cancellations: prometheus::IntCounterVec,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    fn submission(mode: SubmissionMode, result: &Result<Receipt, Error>) {
        Self::get()
            .orders
            .with_label_values(&[mode.to_string().as_str(), result_label(result)])
            .inc();
    }

    fn cancel(result: &Result<Receipt, Error>) {
        Self::get()
            .cancellations
            .with_label_values(&[result_label(result)])
            .inc();
    }
}

fn result_label(result: &Result<Receipt, Error>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(Error::ChainRevert { .. }) => "revert",
        Err(Error::SignatureMismatch(_) | Error::PermitExpired { .. }) => "signature",
        Err(_) => "error",
    }
}
