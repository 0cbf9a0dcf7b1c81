use {
    crate::builder::PrecisionError,
    alloy::{
        primitives::{B256, hex},
        sol_types::{Panic, Revert, SolError, SolInterface},
    },
    contracts::alloy::ProcessorErrors::ProcessorErrorsErrors,
    fee::FeeError,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Precision(#[from] PrecisionError),
    #[error("fee quote expires at {deadline} which leaves no time for inclusion")]
    QuoteExpired { deadline: u64 },
    #[error("permit expires at {deadline} which leaves no time for inclusion")]
    PermitExpired { deadline: u64 },
    #[error("signature rejected on chain: {0}")]
    SignatureMismatch(String),
    #[error("transaction reverted: {reason}")]
    ChainRevert { reason: String, tx_hash: Option<B256> },
    #[error("event subscription failed: {0}")]
    Subscription(String),
    #[error(transparent)]
    Fee(FeeError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<FeeError> for Error {
    fn from(err: FeeError) -> Self {
        match err {
            FeeError::Expired { deadline } => Self::QuoteExpired { deadline },
            err => Self::Fee(err),
        }
    }
}

impl Error {
    /// Classifies the revert data of a failed call or transaction.
    ///
    /// Permit and signature failures get their own variants so callers can
    /// re-sign instead of treating them like any other revert.
    pub fn from_revert(data: &[u8], tx_hash: Option<B256>) -> Self {
        match ProcessorErrorsErrors::abi_decode(data) {
            Ok(ProcessorErrorsErrors::ERC2612ExpiredSignature(err)) => Self::PermitExpired {
                deadline: err.deadline.saturating_to(),
            },
            Ok(
                err @ (ProcessorErrorsErrors::InvalidSignature(_)
                | ProcessorErrorsErrors::InvalidAccountNonce(_)
                | ProcessorErrorsErrors::ERC2612InvalidSigner(_)),
            ) => Self::SignatureMismatch(format!("{err:?}")),
            Ok(err) => Self::ChainRevert {
                reason: format!("{err:?}"),
                tx_hash,
            },
            Err(_) => Self::ChainRevert {
                reason: revert_reason(data),
                tx_hash,
            },
        }
    }
}

/// `Error(string)` reasons and panic codes are shown decoded, anything else
/// as hex.
fn revert_reason(data: &[u8]) -> String {
    Revert::abi_decode(data)
        .map(|revert| revert.reason)
        .or_else(|_| Panic::abi_decode(data).map(|panic| format!("panic code {}", panic.code)))
        .unwrap_or_else(|_| hex::encode_prefixed(data))
}
