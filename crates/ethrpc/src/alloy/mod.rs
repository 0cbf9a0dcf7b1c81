pub mod errors;
mod instrumentation;

#[cfg(any(test, feature = "test-util"))]
use alloy::providers::mock;
use {
    crate::AlloyProvider,
    alloy::{
        network::EthereumWallet,
        providers::{Provider, ProviderBuilder, WsConnect},
        rpc::client::ClientBuilder,
        signers::local::PrivateKeySigner,
    },
    anyhow::{Context, Result},
    instrumentation::InstrumentationLayer,
    url::Url,
};

/// Read-only HTTP provider.
pub fn provider(url: &Url) -> AlloyProvider {
    let rpc = ClientBuilder::default()
        .layer(InstrumentationLayer {
            label: "http".into(),
        })
        .http(url.clone());
    ProviderBuilder::new().connect_client(rpc).erased()
}

/// HTTP provider that fills and signs transactions with `signer`.
pub fn provider_with_signer(url: &Url, signer: PrivateKeySigner) -> AlloyProvider {
    let rpc = ClientBuilder::default()
        .layer(InstrumentationLayer {
            label: "signer".into(),
        })
        .http(url.clone());
    ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer))
        .connect_client(rpc)
        .erased()
}

/// Websocket provider used for log subscriptions.
///
/// Pubsub transports can't be wrapped in tower layers without losing the
/// ability to subscribe, so this provider is not instrumented.
pub async fn ws_provider(url: &Url) -> Result<AlloyProvider> {
    let provider = ProviderBuilder::new()
        .connect_ws(WsConnect::new(url.as_str()))
        .await
        .with_context(|| format!("failed to connect websocket {url}"))?;
    Ok(provider.erased())
}

#[cfg(any(test, feature = "test-util"))]
pub fn dummy_provider() -> AlloyProvider {
    mock_provider().0
}

/// Provider answering requests with the responses pushed to the returned
/// asserter, in order.
#[cfg(any(test, feature = "test-util"))]
pub fn mock_provider() -> (AlloyProvider, mock::Asserter) {
    let asserter = mock::Asserter::new();
    let provider = ProviderBuilder::new()
        .connect_mocked_client(asserter.clone())
        .erased();
    (provider, asserter)
}
