//! Node backed implementations of the chain boundaries.

use {
    crate::{
        adapter::{OrderRef, PrecisionPolicy, Processor, ProtocolVersion},
        error::Error,
        traits::{ChainRead, ChainWrite, LogSource, ProcessorRead, Receipt, TokenRead},
    },
    alloy::{
        primitives::{Address, Bytes, U256},
        providers::Provider,
        rpc::types::{BlockId, BlockNumberOrTag, Filter, Log, TransactionRequest},
    },
    anyhow::{Context, Result},
    contracts::alloy::{
        IERC20Permit,
        OrderProcessorV1,
        OrderProcessorV3,
        OrderProcessorV4,
    },
    ethrpc::{
        AlloyProvider,
        alloy::errors::{ignore_non_node_error, transport_revert_data},
    },
    fee::{FeeRates, StandardFee, StandardFeeSource},
    futures::{StreamExt, stream::BoxStream},
    model::{Order, OrderId, OrderRecord, OrderStatus},
};

/// Reads and writes through an HTTP provider that signs with `sender`.
pub struct Chain {
    provider: AlloyProvider,
    sender: Address,
    processor: Processor,
}

impl Chain {
    pub fn new(provider: AlloyProvider, sender: Address, processor: Processor) -> Self {
        Self {
            provider,
            sender,
            processor,
        }
    }

    fn v1(&self) -> OrderProcessorV1::Instance {
        OrderProcessorV1::Instance::new(self.processor.address, self.provider.clone())
    }

    fn v3(&self) -> OrderProcessorV3::Instance {
        OrderProcessorV3::Instance::new(self.processor.address, self.provider.clone())
    }

    fn v4(&self) -> OrderProcessorV4::Instance {
        OrderProcessorV4::Instance::new(self.processor.address, self.provider.clone())
    }

    fn token(&self, token: Address) -> IERC20Permit::Instance {
        IERC20Permit::Instance::new(token, self.provider.clone())
    }

    /// Re-executes a transaction that reverted on chain against the state of
    /// the block before it to recover the revert data. Mined receipts don't
    /// carry it.
    async fn replay_revert(&self, tx: TransactionRequest, block: Option<u64>) -> Option<Bytes> {
        let parent = block?.checked_sub(1)?;
        match self.provider.call(tx).block(BlockId::number(parent)).await {
            Ok(_) => {
                tracing::debug!(block = parent, "reverted transaction succeeds on replay");
                None
            }
            Err(err) => transport_revert_data(&err),
        }
    }
}

#[async_trait::async_trait]
impl ChainRead for Chain {
    async fn latest_block_timestamp(&self) -> Result<u64> {
        Ok(self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .context("failed to get latest block")?
            .context("no latest block")?
            .header
            .timestamp)
    }
}

#[async_trait::async_trait]
impl ProcessorRead for Chain {
    async fn precision_policy(&self, asset_token: Address) -> Result<PrecisionPolicy> {
        Ok(match self.processor.version {
            ProtocolVersion::V0_1 => PrecisionPolicy::Unrestricted,
            ProtocolVersion::V0_3 => {
                PrecisionPolicy::MaxDecimals(self.v3().maxOrderDecimals(asset_token).call().await?)
            }
            ProtocolVersion::V0_4 => PrecisionPolicy::DecimalReduction(
                self.v4().orderDecimalReduction(asset_token).call().await?,
            ),
        })
    }

    async fn order_record(&self, order: &OrderRef) -> Result<OrderRecord> {
        let id = order.id();
        let record = match self.processor.version {
            ProtocolVersion::V0_1 => {
                let processor = self.v1();
                let hash = id.as_b256();
                let active = processor.isOrderActive(hash);
                let remaining = processor.getRemainingOrder(hash);
                let received = processor.getTotalReceived(hash);
                let (active, remaining, received) =
                    tokio::try_join!(active.call(), remaining.call(), received.call())?;
                OrderRecord {
                    id,
                    status: v1_status(active, remaining, received),
                    remaining_quantity: remaining,
                    total_received: received,
                }
            }
            ProtocolVersion::V0_3 | ProtocolVersion::V0_4 => {
                // Both shapes share the status getters.
                let processor = self.v4();
                let status = processor.getOrderStatus(id.0);
                let remaining = processor.getUnfilledAmount(id.0);
                let received = processor.getReceivedAmount(id.0);
                let (status, remaining, received) =
                    tokio::try_join!(status.call(), remaining.call(), received.call())?;
                OrderRecord {
                    id,
                    status: OrderStatus::try_from(status)?,
                    remaining_quantity: remaining,
                    total_received: received,
                }
            }
        };
        Ok(record)
    }

    async fn confirm_order_id(&self, order: &OrderRef) -> Result<OrderId> {
        match (self.processor.version, order) {
            (ProtocolVersion::V0_1, OrderRef::Indexed { recipient, index }) => {
                let id = OrderId::from(self.v1().getOrderId(*recipient, *index).call().await?);
                anyhow::ensure!(
                    id == order.id(),
                    "processor derives order id {id} for {order}, expected {}",
                    order.id()
                );
                Ok(id)
            }
            (ProtocolVersion::V0_3, OrderRef::Salted { request, salt }) => {
                let request = OrderProcessorV3::OrderProcessorV3::OrderRequest {
                    recipient: request.recipient,
                    assetToken: request.asset_token,
                    paymentToken: request.payment_token,
                    quantityIn: request.quantity_in,
                    price: request.price,
                };
                let id = OrderId(
                    self.v3()
                        .getOrderIdFromOrderRequest(request, *salt)
                        .call()
                        .await?,
                );
                anyhow::ensure!(
                    id == order.id(),
                    "processor derives order id {id} for {order}, expected {}",
                    order.id()
                );
                Ok(id)
            }
            (version, OrderRef::Salted { .. }) => {
                anyhow::bail!("v{version} processors don't derive ids from salted order requests")
            }
            _ => Ok(order.id()),
        }
    }
}

/// v0.1 processors don't store a status. Inactive orders are told apart by
/// what is left of them.
fn v1_status(active: bool, remaining: U256, received: U256) -> OrderStatus {
    match (active, remaining.is_zero(), received.is_zero()) {
        (true, _, _) => OrderStatus::Active,
        (false, true, false) => OrderStatus::Fulfilled,
        (false, true, true) => OrderStatus::None,
        (false, false, _) => OrderStatus::Cancelled,
    }
}

#[async_trait::async_trait]
impl TokenRead for Chain {
    async fn decimals(&self, token: Address) -> Result<u8> {
        Ok(self.token(token).decimals().call().await?)
    }

    async fn name(&self, token: Address) -> Result<String> {
        Ok(self.token(token).name().call().await?)
    }

    async fn version(&self, token: Address) -> Result<Option<String>> {
        ignore_non_node_error(self.token(token).version().call().await)
    }

    async fn nonce(&self, token: Address, owner: Address) -> Result<Option<U256>> {
        ignore_non_node_error(self.token(token).nonces(owner).call().await)
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        Ok(self.token(token).allowance(owner, spender).call().await?)
    }
}

#[async_trait::async_trait]
impl ChainWrite for Chain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn send(&self, to: Address, calldata: Bytes) -> Result<Receipt, Error> {
        let tx = TransactionRequest::default()
            .from(self.sender)
            .to(to)
            .input(calldata.into());
        let pending = match self.provider.send_transaction(tx.clone()).await {
            Ok(pending) => pending,
            Err(err) => {
                return Err(match transport_revert_data(&err) {
                    Some(data) => Error::from_revert(&data, None),
                    None => Error::Other(anyhow::Error::new(err).context("failed to send transaction")),
                });
            }
        };
        let tx_hash = *pending.tx_hash();
        tracing::debug!(%to, tx = %tx_hash, "sent transaction");
        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("failed to get receipt of {tx_hash}"))?;
        if !receipt.status() {
            return Err(match self.replay_revert(tx, receipt.block_number).await {
                Some(data) => Error::from_revert(&data, Some(tx_hash)),
                None => Error::ChainRevert {
                    reason: "reverted on chain".to_string(),
                    tx_hash: Some(tx_hash),
                },
            });
        }
        Ok(Receipt {
            tx_hash,
            block_number: receipt.block_number,
            logs: receipt.inner.logs().to_vec(),
        })
    }
}

#[async_trait::async_trait]
impl StandardFeeSource for Chain {
    async fn standard_fee(&self, order: &Order, amount: U256) -> Result<StandardFee> {
        Ok(match self.processor.version {
            ProtocolVersion::V0_1 => {
                let rates = self
                    .v1()
                    .getFeeRatesForOrder(order.payment_token)
                    .call()
                    .await?;
                StandardFee::Rates(FeeRates {
                    flat: rates.flatFee,
                    rate: rates.percentageFeeRate.to::<u32>(),
                })
            }
            ProtocolVersion::V0_3 => StandardFee::Total(
                self.v3()
                    .estimateTotalFeesForOrder(
                        order.requester,
                        order.sell,
                        order.payment_token,
                        amount,
                    )
                    .call()
                    .await?,
            ),
            ProtocolVersion::V0_4 => StandardFee::Total(
                self.v4()
                    .totalStandardFee(order.sell, order.payment_token, amount)
                    .call()
                    .await?,
            ),
        })
    }
}

/// Log subscriptions over a websocket provider.
pub struct Logs {
    provider: AlloyProvider,
}

impl Logs {
    pub fn new(provider: AlloyProvider) -> Self {
        Self { provider }
    }
}

#[async_trait::async_trait]
impl LogSource for Logs {
    async fn subscribe(&self, filter: &Filter) -> Result<BoxStream<'static, Log>> {
        let subscription = self
            .provider
            .subscribe_logs(filter)
            .await
            .context("failed to subscribe to logs")?;
        Ok(subscription.into_stream().boxed())
    }

    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        self.provider
            .get_logs(filter)
            .await
            .context("failed to get logs")
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("failed to get block number")
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::sol_types::SolError,
        contracts::alloy::ProcessorErrors,
    };

    #[test]
    fn v1_status_from_amounts() {
        let zero = U256::ZERO;
        let one = U256::from(1);
        assert_eq!(v1_status(true, one, zero), OrderStatus::Active);
        assert_eq!(v1_status(false, zero, one), OrderStatus::Fulfilled);
        assert_eq!(v1_status(false, one, one), OrderStatus::Cancelled);
        assert_eq!(v1_status(false, zero, zero), OrderStatus::None);
    }

    #[tokio::test]
    async fn recovers_revert_reason_by_replaying() {
        let (provider, asserter) = ethrpc::alloy::mock_provider();
        let chain = Chain::new(
            provider,
            Address::repeat_byte(0x42),
            Processor::new(Address::repeat_byte(0x11), ProtocolVersion::V0_4),
        );
        let data = ProcessorErrors::OrderNotActive {}.abi_encode();
        asserter.push_failure(alloy::rpc::json_rpc::ErrorPayload {
            code: 3,
            message: "execution reverted".into(),
            data: Some(
                serde_json::value::RawValue::from_string(format!(
                    "\"{}\"",
                    alloy::primitives::hex::encode_prefixed(&data)
                ))
                .unwrap(),
            ),
        });
        let replayed = chain
            .replay_revert(TransactionRequest::default(), Some(10))
            .await
            .unwrap();
        assert_eq!(replayed.as_ref(), data.as_slice());
        let Error::ChainRevert { reason, .. } = Error::from_revert(&replayed, None) else {
            panic!("expected revert");
        };
        assert!(reason.contains("OrderNotActive"));

        // Nothing to replay against without a block.
        assert!(chain
            .replay_revert(TransactionRequest::default(), None)
            .await
            .is_none());

        asserter.push_success(&Bytes::new());
        assert!(chain
            .replay_revert(TransactionRequest::default(), Some(10))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn confirms_salted_ids_with_the_processor() {
        let (provider, asserter) = ethrpc::alloy::mock_provider();
        let chain = Chain::new(
            provider,
            Address::repeat_byte(0x42),
            Processor::new(Address::repeat_byte(0x11), ProtocolVersion::V0_3),
        );
        let order = OrderRef::Salted {
            request: model::OrderRequest {
                recipient: Address::with_last_byte(1),
                asset_token: Address::with_last_byte(2),
                payment_token: Address::with_last_byte(3),
                quantity_in: U256::from(1_000),
                price: U256::from(150),
            },
            salt: alloy::primitives::B256::repeat_byte(7),
        };

        asserter.push_success(&Bytes::from(order.id().0.to_be_bytes::<32>()));
        assert_eq!(chain.confirm_order_id(&order).await.unwrap(), order.id());

        asserter.push_success(&Bytes::from(U256::from(1).to_be_bytes::<32>()));
        let err = chain.confirm_order_id(&order).await.unwrap_err();
        assert!(err.to_string().contains("processor derives order id 1"));

        let chain = Chain::new(
            ethrpc::alloy::dummy_provider(),
            Address::repeat_byte(0x42),
            Processor::new(Address::repeat_byte(0x11), ProtocolVersion::V0_4),
        );
        assert!(chain.confirm_order_id(&order).await.is_err());
    }

    #[test]
    fn sends_from_configured_account() {
        let sender = Address::repeat_byte(0x42);
        let chain = Chain::new(
            ethrpc::alloy::dummy_provider(),
            sender,
            Processor::new(Address::repeat_byte(0x11), ProtocolVersion::V0_1),
        );
        assert_eq!(ChainWrite::sender(&chain), sender);
    }

    #[test]
    fn processors_share_status_getters() {
        use alloy::sol_types::SolCall;
        assert_eq!(
            OrderProcessorV3::OrderProcessorV3::getOrderStatusCall::SELECTOR,
            OrderProcessorV4::OrderProcessorV4::getOrderStatusCall::SELECTOR
        );
        assert_eq!(
            OrderProcessorV3::OrderProcessorV3::getUnfilledAmountCall::SELECTOR,
            OrderProcessorV4::OrderProcessorV4::getUnfilledAmountCall::SELECTOR
        );
    }
}
