//! Boundaries to the chain.
//!
//! Everything the order flow needs from a node goes through these traits so
//! the flow can be tested against mocks.

use {
    crate::{
        adapter::{OrderRef, PrecisionPolicy},
        error::Error,
    },
    alloy::{
        primitives::{Address, B256, Bytes, U256},
        rpc::types::{Filter, Log},
    },
    anyhow::Result,
    futures::stream::BoxStream,
    model::{OrderId, OrderRecord},
};

/// A mined, successful transaction.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Receipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub logs: Vec<Log>,
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait ChainRead: Send + Sync {
    /// Timestamp of the latest block in seconds.
    async fn latest_block_timestamp(&self) -> Result<u64>;
}

/// Read access to the configured processor.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait ProcessorRead: Send + Sync {
    /// How quantities of `asset_token` are restricted.
    async fn precision_policy(&self, asset_token: Address) -> Result<PrecisionPolicy>;

    async fn order_record(&self, order: &OrderRef) -> Result<OrderRecord>;

    /// Asks the processor for the id it uses for `order`. Processors that
    /// can't derive ids return the id carried by the reference.
    async fn confirm_order_id(&self, order: &OrderRef) -> Result<OrderId>;
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait TokenRead: Send + Sync {
    async fn decimals(&self, token: Address) -> Result<u8>;

    async fn name(&self, token: Address) -> Result<String>;

    /// The EIP-712 domain version, `None` if the token doesn't expose one.
    async fn version(&self, token: Address) -> Result<Option<String>>;

    /// The current permit nonce of `owner`, `None` if the token doesn't
    /// support EIP-2612.
    async fn nonce(&self, token: Address, owner: Address) -> Result<Option<U256>>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait ChainWrite: Send + Sync {
    /// The account transactions are sent from.
    fn sender(&self) -> Address;

    /// Sends a transaction and waits until it is mined.
    ///
    /// Reverts, either during gas estimation or on chain, are reported as
    /// [`Error::ChainRevert`] or one of the signature related variants.
    async fn send(&self, to: Address, calldata: Bytes) -> Result<Receipt, Error>;
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait LogSource: Send + Sync {
    /// Live logs matching `filter`. The stream ends when the transport drops.
    async fn subscribe(&self, filter: &Filter) -> Result<BoxStream<'static, Log>>;

    /// Historical logs matching `filter`.
    async fn logs(&self, filter: &Filter) -> Result<Vec<Log>>;

    async fn block_number(&self) -> Result<u64>;
}
