//! Everything an [`crate::client::OrderClient`] needs, wired once at startup.

use {
    crate::{
        adapter::Processor,
        arguments::{Arguments, FeeStrategy},
        chain::{Chain, Logs},
        error::Error,
        submission::SubmissionMode,
        traits::{ChainRead, ChainWrite, LogSource, ProcessorRead, TokenRead},
    },
    alloy::{providers::Provider, signers::local::PrivateKeySigner},
    anyhow::Context as _,
    fee::{FeeResolving, QuoteFeeResolver, StandardFeeResolver},
    std::sync::Arc,
};

pub struct Context {
    pub chain_id: u64,
    pub signer: PrivateKeySigner,
    pub processor: Processor,
    pub mode: SubmissionMode,
    pub chain: Arc<dyn ChainRead>,
    pub processor_reads: Arc<dyn ProcessorRead>,
    pub tokens: Arc<dyn TokenRead>,
    pub writer: Arc<dyn ChainWrite>,
    /// Only available with a websocket endpoint.
    pub logs: Option<Arc<dyn LogSource>>,
    pub fees: Arc<dyn FeeResolving>,
}

impl Context {
    /// Connects to the configured node and fee service.
    pub async fn connect(args: &Arguments) -> Result<Self, Error> {
        let signer = args.signer()?;
        let rpc_url = args.required("rpc-url", args.rpc_url.as_ref())?;
        let processor = Processor::new(
            *args.required("processor", args.processor.as_ref())?,
            args.protocol_version,
        );
        args.validate()?;

        let provider = ethrpc::alloy::provider_with_signer(rpc_url, signer.clone());
        let chain_id = provider
            .get_chain_id()
            .await
            .context("failed to get chain id")?;
        let chain = Arc::new(Chain::new(provider, signer.address(), processor));

        let fees: Arc<dyn FeeResolving> = match args.fee_strategy {
            FeeStrategy::Quote => Arc::new(QuoteFeeResolver::new(
                &args.fee_api_url,
                args.required("fee-api-key", args.fee_api_key.as_ref())?.clone(),
                reqwest::Client::new(),
                chain_id,
                processor.address,
                args.fee_api_timeout,
            )?),
            FeeStrategy::Standard => Arc::new(StandardFeeResolver::new(chain.clone())),
        };
        let logs: Option<Arc<dyn LogSource>> = match &args.rpc_url_wss {
            Some(url) => Some(Arc::new(Logs::new(ethrpc::alloy::ws_provider(url).await?))),
            None => None,
        };
        tracing::info!(chain_id, processor = %processor.address, version = %processor.version, "connected");

        Ok(Self {
            chain_id,
            signer,
            processor,
            mode: args.submission_mode,
            chain: chain.clone(),
            processor_reads: chain.clone(),
            tokens: chain.clone(),
            writer: chain,
            logs,
            fees,
        })
    }
}
