//! The client-side order and the chain-side order record.

use {
    crate::serialization::HexOrDecimalU256,
    alloy::{
        primitives::{Address, B256, U256, keccak256},
        sol_types::SolValue,
    },
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
    std::fmt::{self, Display},
    strum::{AsRefStr, EnumString},
};

#[derive(
    Eq, PartialEq, Clone, Copy, Debug, Default, Hash, Deserialize, Serialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

impl OrderType {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Market => 0,
            Self::Limit => 1,
        }
    }
}

/// Time in force.
#[derive(
    Eq, PartialEq, Clone, Copy, Debug, Default, Hash, Deserialize, Serialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimeInForce {
    /// Valid until the end of the trading day.
    Day,
    /// Good until cancelled.
    #[default]
    Gtc,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
}

impl TimeInForce {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Day => 0,
            Self::Gtc => 1,
            Self::Ioc => 2,
            Self::Fok => 3,
        }
    }
}

/// A canonical order as built on the client before submission.
///
/// For buy orders `payment_token_quantity` is authoritative and
/// `asset_token_quantity` is zero; for sell orders it is the other way around.
/// `limit_price` is zero unless `order_type` is [`OrderType::Limit`].
#[serde_as]
#[derive(Eq, PartialEq, Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub requester: Address,
    pub recipient: Address,
    pub asset_token: Address,
    pub payment_token: Address,
    pub sell: bool,
    pub order_type: OrderType,
    #[serde_as(as = "HexOrDecimalU256")]
    pub asset_token_quantity: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub payment_token_quantity: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub limit_price: U256,
    pub time_in_force: TimeInForce,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_recipient: Option<Address>,
    #[serde_as(as = "Option<HexOrDecimalU256>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_amount: Option<U256>,
    /// Milliseconds since the unix epoch at which the order was built.
    pub request_timestamp: u64,
}

impl Order {
    /// The quantity the processor acts on: the asset amount for sells and the
    /// payment amount for buys.
    pub fn quantity(&self) -> U256 {
        if self.sell {
            self.asset_token_quantity
        } else {
            self.payment_token_quantity
        }
    }

    /// The token the requester spends and therefore has to authorize.
    pub fn spent_token(&self) -> Address {
        if self.sell {
            self.asset_token
        } else {
            self.payment_token
        }
    }

    /// Whether the asset quantity is subject to the per-asset decimals
    /// policy of the processor.
    pub fn requires_precision_check(&self) -> bool {
        self.sell || self.order_type == OrderType::Limit
    }
}

/// Identifier of an order on the processor.
///
/// Depending on the protocol version it is either returned by the creation
/// event or derived from the `(recipient, index)` pair or an order request and
/// salt.
#[derive(
    Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Debug, Default, Hash, Deserialize, Serialize,
)]
pub struct OrderId(pub U256);

impl OrderId {
    /// `keccak256(abi.encode(recipient, index))`
    pub fn from_recipient_index(recipient: Address, index: U256) -> Self {
        let hash = keccak256((recipient, index).abi_encode_params());
        Self::from(hash)
    }

    /// Hashes an order request together with a salt the way salted processors
    /// derive their ids.
    pub fn from_order_request(request: &OrderRequest, salt: B256) -> Self {
        let hash = keccak256(
            (
                *ORDER_REQUEST_TYPEHASH,
                salt,
                request.recipient,
                request.asset_token,
                request.payment_token,
                request.quantity_in,
            )
                .abi_encode_params(),
        );
        Self::from(hash)
    }

    pub fn as_b256(&self) -> B256 {
        B256::from(self.0.to_be_bytes::<32>())
    }
}

impl From<B256> for OrderId {
    fn from(value: B256) -> Self {
        Self(U256::from_be_bytes(value.0))
    }
}

impl From<U256> for OrderId {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

static ORDER_REQUEST_TYPEHASH: std::sync::LazyLock<B256> = std::sync::LazyLock::new(|| {
    keccak256(
        "OrderRequest(bytes32 salt,address recipient,address assetToken,address paymentToken,uint256 quantityIn)",
    )
});

/// The reduced order shape hashed by salted processors.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Hash)]
pub struct OrderRequest {
    pub recipient: Address,
    pub asset_token: Address,
    pub payment_token: Address,
    pub quantity_in: U256,
    pub price: U256,
}

impl From<&Order> for OrderRequest {
    fn from(order: &Order) -> Self {
        Self {
            recipient: order.recipient,
            asset_token: order.asset_token,
            payment_token: order.payment_token,
            quantity_in: order.quantity(),
            price: order.limit_price,
        }
    }
}

/// Status as reported by the processor.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    /// The processor has no record of the id.
    #[default]
    None,
    Active,
    Fulfilled,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Cancelled)
    }
}

impl TryFrom<u8> for OrderStatus {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Active,
            2 => Self::Fulfilled,
            3 => Self::Cancelled,
            other => anyhow::bail!("unknown order status {other}"),
        })
    }
}

/// Read-only view of the processor's record for an order.
#[serde_as]
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: OrderId,
    pub status: OrderStatus,
    #[serde_as(as = "HexOrDecimalU256")]
    pub remaining_quantity: U256,
    #[serde_as(as = "HexOrDecimalU256")]
    pub total_received: U256,
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex, std::str::FromStr};

    #[test]
    fn recipient_index_id_is_stable() {
        let recipient = Address::from(hex!("1111111111111111111111111111111111111111"));
        let a = OrderId::from_recipient_index(recipient, U256::from(7));
        let b = OrderId::from_recipient_index(recipient, U256::from(7));
        assert_eq!(a, b);
        assert_ne!(a, OrderId::from_recipient_index(recipient, U256::from(8)));
        assert_ne!(
            a,
            OrderId::from_recipient_index(Address::with_last_byte(1), U256::from(7))
        );
    }

    #[test]
    fn recipient_index_id_matches_abi_encoding() {
        let recipient = Address::with_last_byte(0xaa);
        let mut buffer = [0u8; 64];
        buffer[12..32].copy_from_slice(recipient.as_slice());
        buffer[63] = 3;
        let expected = OrderId::from(keccak256(buffer));
        assert_eq!(
            OrderId::from_recipient_index(recipient, U256::from(3)),
            expected
        );
    }

    #[test]
    fn salted_id_depends_on_salt_and_request() {
        let request = OrderRequest {
            recipient: Address::with_last_byte(1),
            asset_token: Address::with_last_byte(2),
            payment_token: Address::with_last_byte(3),
            quantity_in: U256::from(1_000_000),
            price: U256::ZERO,
        };
        let salt = B256::with_last_byte(1);
        let id = OrderId::from_order_request(&request, salt);
        assert_eq!(id, OrderId::from_order_request(&request, salt));
        assert_ne!(id, OrderId::from_order_request(&request, B256::with_last_byte(2)));

        let other = OrderRequest {
            quantity_in: U256::from(1_000_001),
            ..request
        };
        assert_ne!(id, OrderId::from_order_request(&other, salt));
    }

    #[test]
    fn order_id_b256_conversion() {
        let id = OrderId(U256::from(0x1234));
        assert_eq!(OrderId::from(id.as_b256()), id);
        assert_eq!(id.to_string(), "4660");
    }

    #[test]
    fn quantity_follows_side() {
        let buy = Order {
            asset_token_quantity: U256::from(5),
            payment_token_quantity: U256::from(100),
            ..Default::default()
        };
        assert_eq!(buy.quantity(), U256::from(100));
        assert_eq!(buy.spent_token(), buy.payment_token);
        assert!(!buy.requires_precision_check());

        let sell = Order { sell: true, ..buy.clone() };
        assert_eq!(sell.quantity(), U256::from(5));
        assert!(sell.requires_precision_check());

        let limit = Order {
            order_type: OrderType::Limit,
            ..buy
        };
        assert!(limit.requires_precision_check());
    }

    #[test]
    fn parses_enums() {
        assert_eq!(OrderType::from_str("LIMIT").unwrap(), OrderType::Limit);
        assert_eq!(TimeInForce::from_str("gtc").unwrap(), TimeInForce::Gtc);
        assert_eq!(TimeInForce::Fok.as_u8(), 3);
        assert_eq!(OrderStatus::try_from(2).unwrap(), OrderStatus::Fulfilled);
        assert!(OrderStatus::try_from(4).is_err());
    }

    #[test]
    fn order_serialization() {
        let order = Order {
            payment_token_quantity: U256::from(100_000_000),
            ..Default::default()
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["paymentTokenQuantity"], "100000000");
        assert_eq!(json["orderType"], "market");
        assert_eq!(json["timeInForce"], "GTC");
        assert!(json.get("splitRecipient").is_none());
        let back: Order = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
