//! Contains the data types shared between the order client components: the
//! client-side order, fee quotes, permit authorizations and the read-only view
//! of an order record kept by the processor contract.

pub mod order;
pub mod permit;
pub mod quote;
pub mod serialization;
pub mod signature;

pub use {
    order::{Order, OrderId, OrderRecord, OrderRequest, OrderStatus, OrderType, TimeInForce},
    permit::{PermitAuthorization, PermitDomain, PermitMessage},
    quote::FeeQuote,
    signature::EcdsaSignature,
};

/// Denominator of the percentage fee rate used by the processor contracts. A
/// rate of `10_000` means 100%.
pub const FEE_RATE_DENOMINATOR: u32 = 10_000;
