use {
    crate::{order::OrderId, serialization::HexOrDecimalU256},
    alloy::primitives::{Address, Bytes, U256},
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

/// A fee quote signed by the off-chain fee service and bound to one
/// prospective order.
///
/// The processor only accepts the quote before `deadline` and only for
/// `requester`, so it can't be reused for another account or after expiry.
#[serde_as]
#[derive(Eq, PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    #[serde_as(as = "HexOrDecimalU256")]
    pub order_id: U256,
    pub requester: Address,
    #[serde_as(as = "HexOrDecimalU256")]
    pub fee: U256,
    /// Seconds since the unix epoch at which the quote was issued.
    pub timestamp: u64,
    /// Seconds since the unix epoch after which the quote is rejected.
    pub deadline: u64,
    pub signature: Bytes,
}

impl FeeQuote {
    pub fn order_id(&self) -> OrderId {
        OrderId(self.order_id)
    }

    /// Whether the quote is still acceptable at `now` (unix seconds) with
    /// `headroom` seconds left for the transaction to be mined.
    pub fn is_valid_at(&self, now: u64, headroom: u64) -> bool {
        now.saturating_add(headroom) < self.deadline
    }
}
