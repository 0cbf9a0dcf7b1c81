//! Client for the fee quote service. A quote binds a fee to one requester and
//! one prospective order and is signed by the service so the processor can
//! verify it on creation.

use {
    crate::{FeeApplication, FeeError, FeeResolving, ResolvedFee},
    alloy::primitives::{Address, U256},
    model::{FeeQuote, Order},
    reqwest::{Client, StatusCode, header},
    std::time::Duration,
    url::Url,
};

const FEE_PATH: &str = "api/v1/web3/orders/fee";

pub struct QuoteFeeResolver {
    /// Full URL of the fee endpoint.
    endpoint: Url,
    api_key: String,
    client: Client,
    chain_id: u64,
    processor: Address,
    timeout: Duration,
}

impl QuoteFeeResolver {
    pub fn new(
        base_url: &Url,
        api_key: String,
        client: Client,
        chain_id: u64,
        processor: Address,
        timeout: Duration,
    ) -> Result<Self, FeeError> {
        let endpoint = base_url
            .join(FEE_PATH)
            .map_err(|err| FeeError::Other(anyhow::anyhow!("invalid fee api url: {err}")))?;
        Ok(Self {
            endpoint,
            api_key,
            client,
            chain_id,
            processor,
            timeout,
        })
    }

    async fn request(&self, order: &Order) -> Result<dto::FeeQuoteResponse, FeeError> {
        let body = dto::FeeQuoteRequest {
            chain_id: self.chain_id,
            contract_address: self.processor,
            order_data: dto::OrderData::from(order),
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| FeeError::Api(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| FeeError::Api(err.to_string()))?;
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FeeError::Unauthorized),
            status if !status.is_success() => Err(FeeError::Api(format!("{status}: {text}"))),
            _ => serde_json::from_str(&text)
                .map_err(|err| FeeError::Api(format!("invalid response {text:?}: {err}"))),
        }
    }
}

/// Validates the service's answer against the order it was requested for.
fn into_quote(
    response: dto::FeeQuoteResponse,
    requester: Address,
    now: u64,
) -> Result<FeeQuote, FeeError> {
    let dto::FeeQuoteResponse {
        fee_quote,
        fee_quote_signature,
    } = response;
    if fee_quote.requester != requester {
        return Err(FeeError::RequesterMismatch {
            requester,
            quoted: fee_quote.requester,
        });
    }
    if fee_quote.deadline <= now {
        return Err(FeeError::Expired {
            deadline: fee_quote.deadline,
        });
    }
    Ok(FeeQuote {
        order_id: fee_quote.order_id,
        requester: fee_quote.requester,
        fee: fee_quote.fee,
        timestamp: fee_quote.timestamp,
        deadline: fee_quote.deadline,
        signature: fee_quote_signature,
    })
}

#[async_trait::async_trait]
impl FeeResolving for QuoteFeeResolver {
    /// The service prices the order itself, so no proceeds estimate is
    /// needed.
    async fn resolve(
        &self,
        order: &Order,
        _proceeds_estimate: Option<U256>,
    ) -> Result<ResolvedFee, FeeError> {
        let response = self.request(order).await?;
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        let quote = into_quote(response, order.requester, now)?;
        tracing::debug!(
            order_id = %quote.order_id,
            fee = %quote.fee,
            deadline = quote.deadline,
            "received fee quote"
        );
        Ok(ResolvedFee {
            amount: quote.fee,
            application: FeeApplication::for_order(order),
            quote: Some(quote),
        })
    }
}

mod dto {
    use {
        alloy::primitives::{Address, Bytes, U256},
        model::{Order, serialization::HexOrDecimalU256},
        serde::{Deserialize, Serialize},
        serde_with::serde_as,
    };

    #[derive(Clone, Debug, Serialize)]
    pub struct FeeQuoteRequest {
        pub chain_id: u64,
        pub contract_address: Address,
        pub order_data: OrderData,
    }

    /// The order in the shape of the processor's `Order` struct.
    #[serde_as]
    #[derive(Clone, Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct OrderData {
        pub request_timestamp: u64,
        pub recipient: Address,
        pub asset_token: Address,
        pub payment_token: Address,
        pub sell: bool,
        pub order_type: u8,
        #[serde_as(as = "HexOrDecimalU256")]
        pub asset_token_quantity: U256,
        #[serde_as(as = "HexOrDecimalU256")]
        pub payment_token_quantity: U256,
        #[serde_as(as = "HexOrDecimalU256")]
        pub price: U256,
        pub tif: u8,
    }

    impl From<&Order> for OrderData {
        fn from(order: &Order) -> Self {
            Self {
                request_timestamp: order.request_timestamp,
                recipient: order.recipient,
                asset_token: order.asset_token,
                payment_token: order.payment_token,
                sell: order.sell,
                order_type: order.order_type.as_u8(),
                asset_token_quantity: order.asset_token_quantity,
                payment_token_quantity: order.payment_token_quantity,
                price: order.limit_price,
                tif: order.time_in_force.as_u8(),
            }
        }
    }

    #[derive(Clone, Debug, Deserialize)]
    pub struct FeeQuoteResponse {
        pub fee_quote: FeeQuote,
        pub fee_quote_signature: Bytes,
    }

    #[serde_as]
    #[derive(Clone, Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct FeeQuote {
        #[serde_as(as = "HexOrDecimalU256")]
        pub order_id: U256,
        pub requester: Address,
        #[serde_as(as = "HexOrDecimalU256")]
        pub fee: U256,
        pub timestamp: u64,
        pub deadline: u64,
    }
}
