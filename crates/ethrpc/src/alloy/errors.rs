use alloy::{
    contract::Error as ContractError,
    primitives::Bytes,
    transports::{RpcError, TransportError},
};

/// Bubbles up node errors, ignoring all other errors.
pub fn ignore_non_node_error<T>(result: Result<T, ContractError>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(result) => Ok(Some(result)),
        Err(err) if err.is_node_error() => Err(err.into()),
        Err(_) => Ok(None),
    }
}

pub trait ContractErrorExt {
    /// Returns whether a given error is a contract error, this is considered to
    /// be all errors except the transport error where there is no revert data.
    fn is_contract_error(&self) -> bool;

    /// Returns whether a given error is a node error.
    fn is_node_error(&self) -> bool;
}

impl ContractErrorExt for ContractError {
    fn is_contract_error(&self) -> bool {
        !self.is_node_error()
    }

    fn is_node_error(&self) -> bool {
        match self {
            // Some reverts are reported as transport errors. An empty revert
            // (e.g. calling a function the contract doesn't have) still counts
            // as a revert, so look at the raw data instead of alloy's decoded
            // view which treats empty data as "no revert".
            ContractError::TransportError(err) => transport_is_node_error(err),
            _ => false,
        }
    }
}

fn transport_is_node_error(err: &TransportError) -> bool {
    match err {
        RpcError::ErrorResp(err) => {
            let no_revert_data = err.as_revert_data().is_none();
            tracing::debug!(?err, %no_revert_data, "transport rpc error");
            no_revert_data
        }
        _ => true,
    }
}

/// Extracts the revert data of a failed `eth_call`, `eth_estimateGas` or
/// `eth_sendTransaction` request.
pub fn transport_revert_data(err: &TransportError) -> Option<Bytes> {
    err.as_error_resp()?.as_revert_data()
}

/// Create an arbitrary alloy error that will convert into a "contract" error.
/// Useful for testing.
#[cfg(any(test, feature = "test-util"))]
pub fn testing_alloy_contract_error() -> ContractError {
    ContractError::NotADeploymentTransaction
}

/// Create an arbitrary alloy error that will convert into a "node" error.
/// Useful for testing.
#[cfg(any(test, feature = "test-util"))]
pub fn testing_alloy_node_error() -> ContractError {
    ContractError::TransportError(TransportError::ErrorResp(
        alloy::rpc::json_rpc::ErrorPayload::internal_error(),
    ))
}
