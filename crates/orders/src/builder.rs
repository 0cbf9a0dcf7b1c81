use {
    crate::{
        adapter::PrecisionPolicy,
        error::Error,
        traits::{ProcessorRead, TokenRead},
    },
    alloy::primitives::{Address, U256},
    anyhow::Context,
    model::{Order, OrderType, TimeInForce},
    std::sync::Arc,
};

/// A trade intent as entered by a user.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OrderParams {
    pub recipient: Address,
    pub asset_token: Address,
    pub payment_token: Address,
    pub sell: bool,
    pub order_type: OrderType,
    /// Asset quantity. Authoritative for sells, the limit quantity for limit
    /// buys, ignored for market buys.
    pub asset_quantity: U256,
    /// Payment quantity. Authoritative for buys, ignored for sells.
    pub payment_quantity: U256,
    pub limit_price: U256,
    pub time_in_force: TimeInForce,
    pub split: Option<(Address, U256)>,
    /// Expected price in payment token units per whole asset token. Prices
    /// the proceeds of market sells; limit sells use their limit price.
    pub price_estimate: Option<U256>,
}

/// A validated order together with the estimated proceeds of a sell.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuiltOrder {
    pub order: Order,
    /// `None` for buys and for market sells without a price estimate.
    pub proceeds_estimate: Option<U256>,
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum PrecisionError {
    #[error("quantity {quantity} is not a multiple of {step}: at most {max_decimals} decimals allowed")]
    TooPrecise {
        quantity: U256,
        step: U256,
        max_decimals: u8,
    },
    #[error("order quantity is zero")]
    ZeroQuantity,
    #[error("limit orders need a non-zero limit price")]
    MissingLimitPrice,
}

/// Normalizes `params` into the canonical order shape.
///
/// Quantities that the processor ignores for the given side are zeroed and
/// market orders never carry a price.
pub fn canonical_order(
    requester: Address,
    params: OrderParams,
    request_timestamp: u64,
) -> Result<Order, PrecisionError> {
    let (asset_token_quantity, payment_token_quantity) = match (params.sell, params.order_type) {
        (true, _) => (params.asset_quantity, U256::ZERO),
        (false, OrderType::Limit) => (params.asset_quantity, params.payment_quantity),
        (false, OrderType::Market) => (U256::ZERO, params.payment_quantity),
    };
    let limit_price = match params.order_type {
        OrderType::Limit if params.limit_price.is_zero() => {
            return Err(PrecisionError::MissingLimitPrice);
        }
        OrderType::Limit => params.limit_price,
        OrderType::Market => U256::ZERO,
    };
    let order = Order {
        requester,
        recipient: params.recipient,
        asset_token: params.asset_token,
        payment_token: params.payment_token,
        sell: params.sell,
        order_type: params.order_type,
        asset_token_quantity,
        payment_token_quantity,
        limit_price,
        time_in_force: params.time_in_force,
        split_recipient: params.split.map(|(recipient, _)| recipient),
        split_amount: params.split.map(|(_, amount)| amount),
        request_timestamp,
    };
    if order.quantity().is_zero() {
        return Err(PrecisionError::ZeroQuantity);
    }
    Ok(order)
}

/// Checks the asset quantity of sells and limit orders against the
/// processor's decimals policy. Never rounds.
pub fn check_precision(
    order: &Order,
    policy: PrecisionPolicy,
    asset_decimals: u8,
) -> Result<(), PrecisionError> {
    if !order.requires_precision_check() {
        return Ok(());
    }
    let step = policy.step(asset_decimals);
    let quantity = order.asset_token_quantity;
    if !(quantity % step).is_zero() {
        return Err(PrecisionError::TooPrecise {
            quantity,
            step,
            max_decimals: policy.max_decimals(asset_decimals),
        });
    }
    Ok(())
}

/// Builds validated orders, reading the decimals policy from chain only when
/// the order is subject to it.
pub struct OrderBuilder {
    processor: Arc<dyn ProcessorRead>,
    tokens: Arc<dyn TokenRead>,
}

impl OrderBuilder {
    pub fn new(processor: Arc<dyn ProcessorRead>, tokens: Arc<dyn TokenRead>) -> Self {
        Self { processor, tokens }
    }

    pub async fn build(&self, requester: Address, params: OrderParams) -> Result<BuiltOrder, Error> {
        let now = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
        let price_estimate = params.price_estimate;
        let order = canonical_order(requester, params, now)?;
        let mut proceeds_estimate = None;
        if order.requires_precision_check() {
            let policy = self
                .processor
                .precision_policy(order.asset_token)
                .await
                .context("precision policy")?;
            let decimals = self
                .tokens
                .decimals(order.asset_token)
                .await
                .context("asset decimals")?;
            check_precision(&order, policy, decimals)?;
            if order.sell {
                let price = price_estimate
                    .or((order.order_type == OrderType::Limit).then_some(order.limit_price));
                proceeds_estimate = price
                    .map(|price| {
                        fee::estimate_proceeds(order.asset_token_quantity, price, decimals)
                            .ok_or_else(|| {
                                Error::Configuration(format!(
                                    "proceeds of {} at price {price} overflow",
                                    order.asset_token_quantity
                                ))
                            })
                    })
                    .transpose()?;
            }
        }
        tracing::debug!(?order, ?proceeds_estimate, "built order");
        Ok(BuiltOrder {
            order,
            proceeds_estimate,
        })
    }
}
