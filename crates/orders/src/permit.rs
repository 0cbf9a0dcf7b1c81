use {
    crate::{
        error::Error,
        traits::{ChainRead, TokenRead},
    },
    alloy::{
        primitives::{Address, U256},
        signers::local::PrivateKeySigner,
    },
    anyhow::Context,
    model::{PermitAuthorization, PermitDomain, PermitMessage},
    std::{sync::Arc, time::Duration},
};

/// How long a permit stays valid, counted from the latest block.
pub const PERMIT_VALIDITY: Duration = Duration::from_secs(300);

/// Signs EIP-2612 permits with the local key.
pub struct PermitAuthorizer {
    chain_id: u64,
    signer: PrivateKeySigner,
    chain: Arc<dyn ChainRead>,
    tokens: Arc<dyn TokenRead>,
}

impl PermitAuthorizer {
    pub fn new(
        chain_id: u64,
        signer: PrivateKeySigner,
        chain: Arc<dyn ChainRead>,
        tokens: Arc<dyn TokenRead>,
    ) -> Self {
        Self {
            chain_id,
            signer,
            chain,
            tokens,
        }
    }

    pub fn owner(&self) -> Address {
        self.signer.address()
    }

    /// The token's EIP-712 domain. Tokens without `version()` use "1".
    pub async fn domain(&self, token: Address) -> Result<PermitDomain, Error> {
        let name = self.tokens.name(token).await.context("token name")?;
        let version = match self.tokens.version(token).await.context("token version")? {
            Some(version) => version,
            None => {
                tracing::debug!(%token, "token has no domain version, using default");
                PermitDomain::DEFAULT_VERSION.to_string()
            }
        };
        Ok(PermitDomain {
            name,
            version,
            chain_id: self.chain_id,
            verifying_contract: token,
        })
    }

    /// Signs a permit letting `spender` pull `value` of `token`.
    ///
    /// Returns `None` if the token doesn't support permits. The nonce is read
    /// here, so callers must hold the `(token, owner)` permit lock until the
    /// permit is consumed.
    pub async fn authorize(
        &self,
        token: Address,
        spender: Address,
        value: U256,
    ) -> Result<Option<PermitAuthorization>, Error> {
        let owner = self.owner();
        let Some(nonce) = self.tokens.nonce(token, owner).await.context("permit nonce")? else {
            return Ok(None);
        };
        let block_time = self
            .chain
            .latest_block_timestamp()
            .await
            .context("block timestamp")?;
        let domain = self.domain(token).await?;
        let message = PermitMessage {
            owner,
            spender,
            value,
            nonce,
            deadline: block_time + PERMIT_VALIDITY.as_secs(),
        };
        let permit = PermitAuthorization::sign(&domain, message, &self.signer)?;
        tracing::debug!(
            %token,
            %spender,
            %value,
            %nonce,
            deadline = permit.message.deadline,
            version = %domain.version,
            "signed permit"
        );
        Ok(Some(permit))
    }
}
