use {
    crate::{FeeApplication, FeeError, FeeResolving, ResolvedFee, fee_base},
    alloy::primitives::U256,
    model::{FEE_RATE_DENOMINATOR, Order},
    std::sync::Arc,
};

/// Flat fee plus percentage rate in units of `1 / FEE_RATE_DENOMINATOR`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FeeRates {
    pub flat: U256,
    pub rate: u32,
}

/// `flat + floor(amount * rate / 10_000)`, or `None` on overflow.
pub fn standard_fee(rates: FeeRates, amount: U256) -> Option<U256> {
    let percentage = amount.checked_mul(U256::from(rates.rate))? / U256::from(FEE_RATE_DENOMINATOR);
    rates.flat.checked_add(percentage)
}

/// What a processor exposes about its standard fees: either the raw rates
/// or an already combined total.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StandardFee {
    Rates(FeeRates),
    Total(U256),
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait StandardFeeSource: Send + Sync {
    /// Standard fee of `order` for a payment token `amount`.
    async fn standard_fee(&self, order: &Order, amount: U256) -> anyhow::Result<StandardFee>;
}

/// Resolves fees from the processor's own fee schedule.
pub struct StandardFeeResolver {
    source: Arc<dyn StandardFeeSource>,
}

impl StandardFeeResolver {
    pub fn new(source: Arc<dyn StandardFeeSource>) -> Self {
        Self { source }
    }
}

#[async_trait::async_trait]
impl FeeResolving for StandardFeeResolver {
    async fn resolve(
        &self,
        order: &Order,
        proceeds_estimate: Option<U256>,
    ) -> Result<ResolvedFee, FeeError> {
        let base = fee_base(order, proceeds_estimate)?;
        let amount = match self.source.standard_fee(order, base).await? {
            StandardFee::Rates(rates) => standard_fee(rates, base).ok_or(FeeError::Overflow)?,
            StandardFee::Total(total) => total,
        };
        tracing::debug!(%amount, %base, sell = order.sell, "resolved standard fee");
        Ok(ResolvedFee {
            amount,
            application: FeeApplication::for_order(order),
            quote: None,
        })
    }
}
