//! One processor type that speaks every supported ABI shape.
//!
//! The shapes differ in the order struct, the creation and cancel calls, the
//! way order ids are derived and the layout of the lifecycle events. All of
//! that is dispatched on [`ProtocolVersion`] here so the rest of the crate
//! never looks at raw bindings.

use {
    crate::error::Error,
    alloy::{
        primitives::{Address, B256, Bytes, U256},
        rpc::types::{Filter, Log},
        sol_types::{SolCall, SolEvent},
    },
    contracts::alloy::{
        OrderProcessorV1::OrderProcessorV1 as v1,
        OrderProcessorV3::OrderProcessorV3 as v3,
        OrderProcessorV4::OrderProcessorV4 as v4,
    },
    fee::ResolvedFee,
    model::{FeeQuote, Order, OrderId, OrderRequest, PermitAuthorization},
    std::{fmt, str::FromStr},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, derive_more::Display)]
pub enum ProtocolVersion {
    #[display("0.1")]
    V0_1,
    #[display("0.3")]
    V0_3,
    #[display("0.4")]
    V0_4,
}

impl FromStr for ProtocolVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('v') {
            "0.1" | "0.1.0" => Ok(Self::V0_1),
            "0.3" | "0.3.0" => Ok(Self::V0_3),
            "0.4" | "0.4.0" => Ok(Self::V0_4),
            other => anyhow::bail!("unsupported protocol version {other:?}"),
        }
    }
}

/// How a processor limits the precision of asset quantities.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PrecisionPolicy {
    /// No limit.
    Unrestricted,
    /// At most this many decimals may be used.
    MaxDecimals(u8),
    /// This many trailing decimals must be zero.
    DecimalReduction(u8),
}

impl PrecisionPolicy {
    /// The smallest quantity increment for an asset with `asset_decimals`.
    pub fn step(self, asset_decimals: u8) -> U256 {
        let exponent = match self {
            Self::Unrestricted => 0,
            Self::MaxDecimals(max) => asset_decimals.saturating_sub(max),
            Self::DecimalReduction(reduction) => reduction,
        };
        U256::from(10).pow(U256::from(exponent))
    }

    /// Decimals left usable by the policy.
    pub fn max_decimals(self, asset_decimals: u8) -> u8 {
        match self {
            Self::Unrestricted => asset_decimals,
            Self::MaxDecimals(max) => max.min(asset_decimals),
            Self::DecimalReduction(reduction) => asset_decimals.saturating_sub(reduction),
        }
    }
}

/// How the tracker identifies a submitted order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OrderRef {
    /// The creation event carried the id together with the account that owns
    /// the order.
    Explicit { id: OrderId, account: Address },
    /// The processor keys orders by recipient and a per-recipient index.
    Indexed { recipient: Address, index: U256 },
    /// The id is the hash of the order request and the salt it was submitted
    /// with.
    Salted { request: OrderRequest, salt: B256 },
}

impl OrderRef {
    pub fn id(&self) -> OrderId {
        match self {
            Self::Explicit { id, .. } => *id,
            Self::Indexed { recipient, index } => OrderId::from_recipient_index(*recipient, *index),
            Self::Salted { request, salt } => OrderId::from_order_request(request, *salt),
        }
    }

    pub fn account(&self) -> Address {
        match self {
            Self::Explicit { account, .. } => *account,
            Self::Indexed { recipient, .. } => *recipient,
            Self::Salted { request, .. } => request.recipient,
        }
    }
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit { id, account } => write!(f, "{id} ({account})"),
            Self::Indexed { recipient, index } => write!(f, "{recipient}#{index}"),
            Self::Salted { request, salt } => {
                write!(f, "{} ({}, salt {salt})", self.id(), request.recipient)
            }
        }
    }
}

/// A decoded lifecycle event of one order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub kind: OrderEventKind,
    pub block_number: Option<u64>,
    pub log_index: Option<u64>,
    pub tx_hash: Option<B256>,
    /// The log was dropped from the canonical chain by a reorg and its effect
    /// has to be undone.
    pub removed: bool,
}

impl OrderEvent {
    /// Identifies the log the event was decoded from. Logs without a block
    /// (pending) have no stable identity.
    pub fn key(&self) -> Option<(OrderId, u64, u64)> {
        Some((self.order_id, self.block_number?, self.log_index?))
    }
}

#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum OrderEventKind {
    #[display("created")]
    Created(OrderRef),
    /// `filled` is in the spent token and reduces the remaining quantity,
    /// `received` is what the recipient got in the other token.
    #[display("fill")]
    Fill {
        filled: U256,
        received: U256,
        fees: U256,
    },
    #[display("fulfilled")]
    Fulfilled,
    #[display("cancel_requested")]
    CancelRequested,
    #[display("cancelled")]
    Cancelled { reason: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Processor {
    pub address: Address,
    pub version: ProtocolVersion,
}

impl Processor {
    pub fn new(address: Address, version: ProtocolVersion) -> Self {
        Self { address, version }
    }

    /// Calldata that creates `order`.
    ///
    /// Quoted fees are only understood by v0.4 processors; the older shapes
    /// always charge their own fee schedule.
    pub fn encode_order(&self, order: &Order, fee: &ResolvedFee) -> Result<Bytes, Error> {
        if fee.quote.is_some() && self.version != ProtocolVersion::V0_4 {
            return Err(Error::Configuration(format!(
                "fee quotes are not supported by v{} processors",
                self.version
            )));
        }
        let calldata = match self.version {
            ProtocolVersion::V0_1 => v1::requestOrderCall {
                order: order_v1(order),
            }
            .abi_encode(),
            ProtocolVersion::V0_3 => v3::requestOrderCall {
                order: order_v3(order),
            }
            .abi_encode(),
            ProtocolVersion::V0_4 => match &fee.quote {
                Some(quote) => v4::createOrderCall {
                    order: order_v4(order),
                    feeQuote: fee_quote_v4(quote),
                    feeQuoteSignature: quote.signature.clone(),
                }
                .abi_encode(),
                None => v4::createOrderStandardFeesCall {
                    order: order_v4(order),
                }
                .abi_encode(),
            },
        };
        Ok(calldata.into())
    }

    pub fn encode_cancel(&self, order: &OrderRef) -> Result<Bytes, Error> {
        let calldata = match (self.version, order) {
            (ProtocolVersion::V0_1, OrderRef::Indexed { recipient, index }) => {
                v1::requestCancelCall {
                    recipient: *recipient,
                    index: *index,
                }
                .abi_encode()
            }
            (ProtocolVersion::V0_1, _) => {
                return Err(Error::Configuration(
                    "v0.1 processors cancel by recipient and index".to_string(),
                ));
            }
            (ProtocolVersion::V0_3, order) => v3::requestCancelCall { id: order.id().0 }.abi_encode(),
            (ProtocolVersion::V0_4, order) => v4::requestCancelCall { id: order.id().0 }.abi_encode(),
        };
        Ok(calldata.into())
    }

    pub fn encode_self_permit(&self, permit: &PermitAuthorization) -> Bytes {
        // All shapes share the same `selfPermit` signature.
        v4::selfPermitCall {
            token: permit.token,
            owner: permit.message.owner,
            value: permit.message.value,
            deadline: U256::from(permit.message.deadline),
            v: permit.signature.v,
            r: permit.signature.r,
            s: permit.signature.s,
        }
        .abi_encode()
        .into()
    }

    pub fn encode_multicall(&self, calls: Vec<Bytes>) -> Bytes {
        v4::multicallCall { data: calls }.abi_encode().into()
    }

    /// Topic0 of every lifecycle event of this shape.
    pub fn event_signatures(&self) -> Vec<B256> {
        match self.version {
            ProtocolVersion::V0_1 => vec![
                v1::OrderRequested::SIGNATURE_HASH,
                v1::OrderFill::SIGNATURE_HASH,
                v1::OrderFulfilled::SIGNATURE_HASH,
                v1::CancelRequested::SIGNATURE_HASH,
                v1::OrderCancelled::SIGNATURE_HASH,
            ],
            ProtocolVersion::V0_3 => vec![
                v3::OrderRequested::SIGNATURE_HASH,
                v3::OrderFill::SIGNATURE_HASH,
                v3::OrderFulfilled::SIGNATURE_HASH,
                v3::CancelRequested::SIGNATURE_HASH,
                v3::OrderCancelled::SIGNATURE_HASH,
            ],
            ProtocolVersion::V0_4 => vec![
                v4::OrderCreated::SIGNATURE_HASH,
                v4::OrderFill::SIGNATURE_HASH,
                v4::OrderFulfilled::SIGNATURE_HASH,
                v4::CancelRequested::SIGNATURE_HASH,
                v4::OrderCancelled::SIGNATURE_HASH,
            ],
        }
    }

    /// Log filter matching every lifecycle event emitted by the processor.
    pub fn filter(&self) -> Filter {
        Filter::new()
            .address(self.address)
            .event_signature(self.event_signatures())
    }

    /// Decodes a processor log. Logs of other contracts or events that aren't
    /// part of the order lifecycle yield `None`.
    pub fn decode_event(&self, log: &Log) -> Option<OrderEvent> {
        if log.address() != self.address {
            return None;
        }
        let (order_id, kind) = match self.version {
            ProtocolVersion::V0_1 => decode_v1(log),
            ProtocolVersion::V0_3 => decode_v3(log),
            ProtocolVersion::V0_4 => decode_v4(log),
        }?;
        Some(OrderEvent {
            order_id,
            kind,
            block_number: log.block_number,
            log_index: log.log_index,
            tx_hash: log.transaction_hash,
            removed: log.removed,
        })
    }

    /// Finds the order created by a transaction from its receipt logs.
    pub fn created_order(&self, logs: &[Log]) -> Option<OrderRef> {
        logs.iter()
            .filter_map(|log| self.decode_event(log))
            .find_map(|event| match event.kind {
                OrderEventKind::Created(order) => Some(order),
                _ => None,
            })
    }
}

fn order_v1(order: &Order) -> v1::Order {
    v1::Order {
        recipient: order.recipient,
        assetToken: order.asset_token,
        paymentToken: order.payment_token,
        sell: order.sell,
        orderType: order.order_type.as_u8(),
        assetTokenQuantity: order.asset_token_quantity,
        paymentTokenQuantity: order.payment_token_quantity,
        price: order.limit_price,
        tif: order.time_in_force.as_u8(),
    }
}

fn order_v3(order: &Order) -> v3::Order {
    v3::Order {
        recipient: order.recipient,
        assetToken: order.asset_token,
        paymentToken: order.payment_token,
        sell: order.sell,
        orderType: order.order_type.as_u8(),
        assetTokenQuantity: order.asset_token_quantity,
        paymentTokenQuantity: order.payment_token_quantity,
        price: order.limit_price,
        tif: order.time_in_force.as_u8(),
        splitRecipient: order.split_recipient.unwrap_or_default(),
        splitAmount: order.split_amount.unwrap_or_default(),
    }
}

pub(crate) fn order_v4(order: &Order) -> v4::Order {
    v4::Order {
        requestTimestamp: order.request_timestamp,
        recipient: order.recipient,
        assetToken: order.asset_token,
        paymentToken: order.payment_token,
        sell: order.sell,
        orderType: order.order_type.as_u8(),
        assetTokenQuantity: order.asset_token_quantity,
        paymentTokenQuantity: order.payment_token_quantity,
        price: order.limit_price,
        tif: order.time_in_force.as_u8(),
    }
}

fn fee_quote_v4(quote: &FeeQuote) -> v4::FeeQuote {
    v4::FeeQuote {
        orderId: quote.order_id,
        requester: quote.requester,
        fee: quote.fee,
        timestamp: quote.timestamp,
        deadline: quote.deadline,
    }
}

fn decode<E: SolEvent>(log: &Log) -> Option<E> {
    if log.topic0() != Some(&E::SIGNATURE_HASH) {
        return None;
    }
    match E::decode_log(&log.inner) {
        Ok(decoded) => Some(decoded.data),
        Err(err) => {
            tracing::warn!(?err, event = E::SIGNATURE, "failed to decode processor log");
            None
        }
    }
}

fn fill(sell: bool, asset_amount: U256, payment_amount: U256, fees: U256) -> OrderEventKind {
    let (filled, received) = if sell {
        (asset_amount, payment_amount)
    } else {
        (payment_amount, asset_amount)
    };
    OrderEventKind::Fill {
        filled,
        received,
        fees,
    }
}

fn decode_v1(log: &Log) -> Option<(OrderId, OrderEventKind)> {
    let id = OrderId::from_recipient_index;
    if let Some(e) = decode::<v1::OrderRequested>(log) {
        let order = OrderRef::Indexed {
            recipient: e.recipient,
            index: e.index,
        };
        return Some((order.id(), OrderEventKind::Created(order)));
    }
    if let Some(e) = decode::<v1::OrderFill>(log) {
        let kind = OrderEventKind::Fill {
            filled: e.fillAmount,
            received: e.receivedAmount,
            fees: U256::ZERO,
        };
        return Some((id(e.recipient, e.index), kind));
    }
    if let Some(e) = decode::<v1::OrderFulfilled>(log) {
        return Some((id(e.recipient, e.index), OrderEventKind::Fulfilled));
    }
    if let Some(e) = decode::<v1::CancelRequested>(log) {
        return Some((id(e.recipient, e.index), OrderEventKind::CancelRequested));
    }
    if let Some(e) = decode::<v1::OrderCancelled>(log) {
        let kind = OrderEventKind::Cancelled { reason: e.reason };
        return Some((id(e.recipient, e.index), kind));
    }
    None
}

fn decode_v3(log: &Log) -> Option<(OrderId, OrderEventKind)> {
    if let Some(e) = decode::<v3::OrderRequested>(log) {
        let order = OrderRef::Explicit {
            id: OrderId(e.id),
            account: e.recipient,
        };
        return Some((order.id(), OrderEventKind::Created(order)));
    }
    if let Some(e) = decode::<v3::OrderFill>(log) {
        let kind = fill(e.sell, e.assetAmount, e.paymentAmount, e.feesTaken);
        return Some((OrderId(e.id), kind));
    }
    if let Some(e) = decode::<v3::OrderFulfilled>(log) {
        return Some((OrderId(e.id), OrderEventKind::Fulfilled));
    }
    if let Some(e) = decode::<v3::CancelRequested>(log) {
        return Some((OrderId(e.id), OrderEventKind::CancelRequested));
    }
    if let Some(e) = decode::<v3::OrderCancelled>(log) {
        let kind = OrderEventKind::Cancelled { reason: e.reason };
        return Some((OrderId(e.id), kind));
    }
    None
}

fn decode_v4(log: &Log) -> Option<(OrderId, OrderEventKind)> {
    if let Some(e) = decode::<v4::OrderCreated>(log) {
        let order = OrderRef::Explicit {
            id: OrderId(e.id),
            account: e.requester,
        };
        return Some((order.id(), OrderEventKind::Created(order)));
    }
    if let Some(e) = decode::<v4::OrderFill>(log) {
        let kind = fill(e.sell, e.assetAmount, e.paymentAmount, e.feesTaken);
        return Some((OrderId(e.id), kind));
    }
    if let Some(e) = decode::<v4::OrderFulfilled>(log) {
        return Some((OrderId(e.id), OrderEventKind::Fulfilled));
    }
    if let Some(e) = decode::<v4::CancelRequested>(log) {
        return Some((OrderId(e.id), OrderEventKind::CancelRequested));
    }
    if let Some(e) = decode::<v4::OrderCancelled>(log) {
        let kind = OrderEventKind::Cancelled { reason: e.reason };
        return Some((OrderId(e.id), kind));
    }
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use {
        super::*,
        alloy::primitives::Log as PrimitiveLog,
    };

    /// Wraps an encoded event into an RPC log emitted by `address`.
    pub fn log<E: SolEvent>(address: Address, event: &E, block: u64, index: u64) -> Log {
        Log {
            inner: PrimitiveLog {
                address,
                data: event.encode_log_data(),
            },
            block_number: Some(block),
            log_index: Some(index),
            transaction_hash: Some(B256::with_last_byte(u8::try_from(block % 256).unwrap())),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{testing::log, *},
        alloy::signers::local::PrivateKeySigner,
        fee::FeeApplication,
        model::{OrderType, PermitDomain, PermitMessage, TimeInForce},
    };

    const PROCESSOR: Address = Address::repeat_byte(0x11);

    fn order() -> Order {
        Order {
            requester: Address::with_last_byte(1),
            recipient: Address::with_last_byte(1),
            asset_token: Address::with_last_byte(2),
            payment_token: Address::with_last_byte(3),
            sell: false,
            order_type: OrderType::Market,
            payment_token_quantity: U256::from(100_000_000),
            time_in_force: TimeInForce::Gtc,
            request_timestamp: 1_700_000_000_000,
            ..Default::default()
        }
    }

    fn standard_fee() -> ResolvedFee {
        ResolvedFee {
            amount: U256::from(1_000),
            application: FeeApplication::AddedToSpend,
            quote: None,
        }
    }

    #[test]
    fn parses_versions() {
        assert_eq!("0.1".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V0_1);
        assert_eq!("v0.3".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V0_3);
        assert_eq!("0.4.0".parse::<ProtocolVersion>().unwrap(), ProtocolVersion::V0_4);
        assert!("0.2".parse::<ProtocolVersion>().is_err());
        assert_eq!(ProtocolVersion::V0_4.to_string(), "0.4");
    }

    #[test]
    fn precision_steps() {
        assert_eq!(PrecisionPolicy::Unrestricted.step(18), U256::from(1));
        assert_eq!(
            PrecisionPolicy::MaxDecimals(2).step(18),
            U256::from(10).pow(U256::from(16))
        );
        // More allowed decimals than the token has means no reduction.
        assert_eq!(PrecisionPolicy::MaxDecimals(20).step(18), U256::from(1));
        assert_eq!(PrecisionPolicy::DecimalReduction(3).step(6), U256::from(1_000));
        assert_eq!(PrecisionPolicy::DecimalReduction(3).max_decimals(6), 3);
        assert_eq!(PrecisionPolicy::MaxDecimals(20).max_decimals(18), 18);
    }

    #[test]
    fn order_call_per_version() {
        let order = order();
        let fee = standard_fee();

        let calldata = Processor::new(PROCESSOR, ProtocolVersion::V0_1)
            .encode_order(&order, &fee)
            .unwrap();
        let call = v1::requestOrderCall::abi_decode(&calldata).unwrap();
        assert_eq!(call.order.paymentTokenQuantity, order.payment_token_quantity);
        assert_eq!(call.order.tif, 1);

        let split = Order {
            split_recipient: Some(Address::with_last_byte(7)),
            split_amount: Some(U256::from(5)),
            ..order.clone()
        };
        let calldata = Processor::new(PROCESSOR, ProtocolVersion::V0_3)
            .encode_order(&split, &fee)
            .unwrap();
        let call = v3::requestOrderCall::abi_decode(&calldata).unwrap();
        assert_eq!(call.order.splitRecipient, Address::with_last_byte(7));
        assert_eq!(call.order.splitAmount, U256::from(5));

        let calldata = Processor::new(PROCESSOR, ProtocolVersion::V0_4)
            .encode_order(&order, &fee)
            .unwrap();
        let call = v4::createOrderStandardFeesCall::abi_decode(&calldata).unwrap();
        assert_eq!(call.order.requestTimestamp, order.request_timestamp);
    }

    #[test]
    fn quoted_fee_uses_create_order() {
        let quote = FeeQuote {
            order_id: U256::from(9),
            requester: Address::with_last_byte(1),
            fee: U256::from(500_000),
            timestamp: 1_700_000_000,
            deadline: 1_700_000_300,
            signature: Bytes::from(vec![1, 2, 3]),
        };
        let fee = ResolvedFee {
            amount: quote.fee,
            application: FeeApplication::AddedToSpend,
            quote: Some(quote.clone()),
        };
        let calldata = Processor::new(PROCESSOR, ProtocolVersion::V0_4)
            .encode_order(&order(), &fee)
            .unwrap();
        let call = v4::createOrderCall::abi_decode(&calldata).unwrap();
        assert_eq!(call.feeQuote.fee, quote.fee);
        assert_eq!(call.feeQuote.deadline, quote.deadline);
        assert_eq!(call.feeQuoteSignature, quote.signature);

        let err = Processor::new(PROCESSOR, ProtocolVersion::V0_3)
            .encode_order(&order(), &fee)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn cancel_call_per_version() {
        let indexed = OrderRef::Indexed {
            recipient: Address::with_last_byte(1),
            index: U256::from(4),
        };
        let explicit = OrderRef::Explicit {
            id: OrderId(U256::from(77)),
            account: Address::with_last_byte(1),
        };

        let v01 = Processor::new(PROCESSOR, ProtocolVersion::V0_1);
        let call = v1::requestCancelCall::abi_decode(&v01.encode_cancel(&indexed).unwrap()).unwrap();
        assert_eq!(call.index, U256::from(4));
        assert!(v01.encode_cancel(&explicit).is_err());

        let v04 = Processor::new(PROCESSOR, ProtocolVersion::V0_4);
        let call = v4::requestCancelCall::abi_decode(&v04.encode_cancel(&explicit).unwrap()).unwrap();
        assert_eq!(call.id, U256::from(77));
    }

    #[test]
    fn salted_orders_cancel_by_derived_id() {
        let request = OrderRequest::from(&order());
        let salt = B256::repeat_byte(9);
        let salted = OrderRef::Salted { request, salt };
        assert_eq!(salted.id(), OrderId::from_order_request(&request, salt));
        assert_eq!(salted.account(), order().recipient);

        let v03 = Processor::new(PROCESSOR, ProtocolVersion::V0_3);
        let call = v3::requestCancelCall::abi_decode(&v03.encode_cancel(&salted).unwrap()).unwrap();
        assert_eq!(OrderId(call.id), salted.id());
        assert!(
            Processor::new(PROCESSOR, ProtocolVersion::V0_1)
                .encode_cancel(&salted)
                .is_err()
        );
    }

    #[test]
    fn multicall_puts_permit_first() {
        let signer = PrivateKeySigner::from_bytes(&B256::repeat_byte(3)).unwrap();
        let domain = PermitDomain {
            name: "USD Coin".to_string(),
            version: "2".to_string(),
            chain_id: 1,
            verifying_contract: Address::with_last_byte(3),
        };
        let permit = PermitAuthorization::sign(
            &domain,
            PermitMessage {
                owner: signer.address(),
                spender: PROCESSOR,
                value: U256::from(100_001_000),
                nonce: U256::ZERO,
                deadline: 1_700_000_300,
            },
            &signer,
        )
        .unwrap();
        let processor = Processor::new(PROCESSOR, ProtocolVersion::V0_4);
        let order_call = processor.encode_order(&order(), &standard_fee()).unwrap();
        let calldata = processor.encode_multicall(vec![
            processor.encode_self_permit(&permit),
            order_call.clone(),
        ]);

        let call = v4::multicallCall::abi_decode(&calldata).unwrap();
        assert_eq!(call.data.len(), 2);
        let self_permit = v4::selfPermitCall::abi_decode(&call.data[0]).unwrap();
        assert_eq!(self_permit.value, U256::from(100_001_000));
        assert_eq!(self_permit.owner, signer.address());
        assert_eq!(self_permit.v, permit.signature.v);
        assert_eq!(call.data[1], order_call);
    }

    #[test]
    fn decodes_v1_events_with_derived_ids() {
        let processor = Processor::new(PROCESSOR, ProtocolVersion::V0_1);
        let recipient = Address::with_last_byte(1);
        let index = U256::from(3);
        let expected = OrderId::from_recipient_index(recipient, index);

        let created = log(
            PROCESSOR,
            &v1::OrderRequested {
                recipient,
                index,
                order: order_v1(&order()),
            },
            10,
            0,
        );
        let event = processor.decode_event(&created).unwrap();
        assert_eq!(event.order_id, expected);
        assert_eq!(
            processor.created_order(&[created]),
            Some(OrderRef::Indexed { recipient, index })
        );

        let fill = log(
            PROCESSOR,
            &v1::OrderFill {
                recipient,
                index,
                fillAmount: U256::from(60),
                receivedAmount: U256::from(2),
            },
            11,
            1,
        );
        let event = processor.decode_event(&fill).unwrap();
        assert_eq!(event.order_id, expected);
        assert_eq!(event.key(), Some((expected, 11, 1)));
        assert_eq!(
            event.kind,
            OrderEventKind::Fill {
                filled: U256::from(60),
                received: U256::from(2),
                fees: U256::ZERO
            }
        );
        assert!(!event.removed);

        let mut reorged = fill;
        reorged.removed = true;
        let event = processor.decode_event(&reorged).unwrap();
        assert!(event.removed);
        assert_eq!(event.key(), Some((expected, 11, 1)));
    }

    #[test]
    fn decodes_v4_events() {
        let processor = Processor::new(PROCESSOR, ProtocolVersion::V0_4);
        let id = U256::from(42);
        let requester = Address::with_last_byte(1);

        let created = log(
            PROCESSOR,
            &v4::OrderCreated {
                id,
                requester,
                order: order_v4(&order()),
                feesEscrowed: U256::from(500_000),
            },
            1,
            0,
        );
        assert_eq!(
            processor.created_order(&[created]),
            Some(OrderRef::Explicit {
                id: OrderId(id),
                account: requester
            })
        );

        let sell_fill = log(
            PROCESSOR,
            &v4::OrderFill {
                id,
                paymentToken: Address::with_last_byte(3),
                assetToken: Address::with_last_byte(2),
                requester,
                assetAmount: U256::from(5),
                paymentAmount: U256::from(1_000),
                feesTaken: U256::from(10),
                sell: true,
            },
            2,
            0,
        );
        assert_eq!(
            processor.decode_event(&sell_fill).unwrap().kind,
            OrderEventKind::Fill {
                filled: U256::from(5),
                received: U256::from(1_000),
                fees: U256::from(10)
            }
        );

        let cancelled = log(
            PROCESSOR,
            &v4::OrderCancelled {
                id,
                requester,
                reason: "market closed".to_string(),
            },
            3,
            0,
        );
        assert_eq!(
            processor.decode_event(&cancelled).unwrap().kind,
            OrderEventKind::Cancelled {
                reason: "market closed".to_string()
            }
        );
    }

    #[test]
    fn ignores_foreign_logs() {
        let processor = Processor::new(PROCESSOR, ProtocolVersion::V0_4);
        let event = v4::OrderFulfilled {
            id: U256::from(1),
            requester: Address::with_last_byte(1),
        };
        assert!(processor.decode_event(&log(Address::with_last_byte(9), &event, 1, 0)).is_none());
        // A v0.4 log doesn't decode with the v0.1 shape.
        let v01 = Processor::new(PROCESSOR, ProtocolVersion::V0_1);
        assert!(v01.decode_event(&log(PROCESSOR, &event, 1, 0)).is_none());
    }
}
