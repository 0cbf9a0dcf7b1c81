//! Resolves the fee a processor charges for an order, either from a signed
//! off-chain quote or from the processor's standard fee schedule.

pub mod quote;
pub mod standard;

pub use {
    quote::QuoteFeeResolver,
    standard::{FeeRates, StandardFee, StandardFeeResolver, StandardFeeSource, standard_fee},
};
use {
    alloy::primitives::{Address, U256},
    model::{FeeQuote, Order},
};

/// Payment proceeds of selling `asset_quantity` at `price` payment token
/// units per whole asset token, or `None` on overflow.
pub fn estimate_proceeds(asset_quantity: U256, price: U256, asset_decimals: u8) -> Option<U256> {
    let one = U256::from(10).checked_pow(U256::from(asset_decimals))?;
    Some(asset_quantity.checked_mul(price)? / one)
}

/// The payment token amount percentage fees apply to: the payment quantity
/// of buys and the estimated proceeds of sells.
pub fn fee_base(order: &Order, proceeds_estimate: Option<U256>) -> Result<U256, FeeError> {
    if order.sell {
        proceeds_estimate.ok_or(FeeError::MissingProceedsEstimate)
    } else {
        Ok(order.payment_token_quantity)
    }
}

/// Which side of the trade the fee is charged on.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FeeApplication {
    /// Buy orders escrow the fee on top of the payment amount.
    AddedToSpend,
    /// Sell orders have the fee taken out of the payment proceeds.
    DeductedFromProceeds,
}

impl FeeApplication {
    pub fn for_order(order: &Order) -> Self {
        if order.sell {
            Self::DeductedFromProceeds
        } else {
            Self::AddedToSpend
        }
    }
}

/// A fee ready to be used for submission.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedFee {
    pub amount: U256,
    pub application: FeeApplication,
    /// Present when the fee comes from a signed quote. The processor only
    /// accepts the order together with this exact quote.
    pub quote: Option<FeeQuote>,
}

impl ResolvedFee {
    /// The amount of the spent token the requester has to authorize. Sells
    /// only escrow the asset quantity.
    pub fn total_spend(&self, order: &Order) -> Option<U256> {
        match self.application {
            FeeApplication::AddedToSpend => order.quantity().checked_add(self.amount),
            FeeApplication::DeductedFromProceeds => Some(order.quantity()),
        }
    }

    /// Payment proceeds left after fees for a sell that received `gross`.
    pub fn net_proceeds(&self, gross: U256) -> U256 {
        match self.application {
            FeeApplication::AddedToSpend => gross,
            FeeApplication::DeductedFromProceeds => gross.saturating_sub(self.amount),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FeeError {
    #[error("fee quote api rejected the api key")]
    Unauthorized,
    #[error("fee quote api error: {0}")]
    Api(String),
    #[error("fee quote is bound to {quoted} but the order is requested by {requester}")]
    RequesterMismatch { requester: Address, quoted: Address },
    #[error("fee quote expired at {deadline}")]
    Expired { deadline: u64 },
    #[error("fee computation overflowed")]
    Overflow,
    #[error("standard fees of sells need a price estimate for the proceeds")]
    MissingProceedsEstimate,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait FeeResolving: Send + Sync {
    /// Computes the fee for a fully built order. Sells carry no payment
    /// quantity, so their fee is based on `proceeds_estimate` where the
    /// strategy needs a base.
    async fn resolve(
        &self,
        order: &Order,
        proceeds_estimate: Option<U256>,
    ) -> Result<ResolvedFee, FeeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buy(amount: u64) -> Order {
        Order {
            payment_token_quantity: U256::from(amount),
            ..Default::default()
        }
    }

    #[test]
    fn buy_fee_is_added_to_spend() {
        let order = buy(100_000_000);
        let fee = ResolvedFee {
            amount: U256::from(500_000),
            application: FeeApplication::for_order(&order),
            quote: None,
        };
        assert_eq!(fee.application, FeeApplication::AddedToSpend);
        assert_eq!(fee.total_spend(&order), Some(U256::from(100_500_000)));
        assert_eq!(fee.net_proceeds(U256::from(7)), U256::from(7));
    }

    #[test]
    fn sell_fee_is_deducted_from_proceeds() {
        let order = Order {
            sell: true,
            asset_token_quantity: U256::from(10),
            ..Default::default()
        };
        let fee = ResolvedFee {
            amount: U256::from(3),
            application: FeeApplication::for_order(&order),
            quote: None,
        };
        assert_eq!(fee.total_spend(&order), Some(U256::from(10)));
        assert_eq!(fee.net_proceeds(U256::from(100)), U256::from(97));
        assert_eq!(fee.net_proceeds(U256::from(2)), U256::ZERO);
    }

    #[test]
    fn proceeds_of_whole_and_fractional_shares() {
        let price = U256::from(150_000_000);
        let share = U256::from(10).pow(U256::from(18));
        assert_eq!(estimate_proceeds(share, price, 18), Some(price));
        assert_eq!(
            estimate_proceeds(share / U256::from(4), price, 18),
            Some(U256::from(37_500_000))
        );
        assert_eq!(estimate_proceeds(U256::MAX, price, 18), None);
    }

    #[test]
    fn sells_are_based_on_proceeds() {
        let sell = Order {
            sell: true,
            asset_token_quantity: U256::from(10),
            ..Default::default()
        };
        assert_eq!(fee_base(&sell, Some(U256::from(7))).unwrap(), U256::from(7));
        assert!(matches!(
            fee_base(&sell, None),
            Err(FeeError::MissingProceedsEstimate)
        ));
        assert_eq!(
            fee_base(&buy(5), Some(U256::from(7))).unwrap(),
            U256::from(5)
        );
    }

    #[test]
    fn spend_overflow_is_detected() {
        let order = Order {
            payment_token_quantity: U256::MAX,
            ..Default::default()
        };
        let fee = ResolvedFee {
            amount: U256::from(1),
            application: FeeApplication::AddedToSpend,
            quote: None,
        };
        assert_eq!(fee.total_spend(&order), None);
    }
}
