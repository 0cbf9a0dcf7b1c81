//! EIP-2612 permit messages and their EIP-712 signing hashes.

use {
    crate::signature::EcdsaSignature,
    alloy::{
        primitives::{Address, B256, U256},
        signers::local::PrivateKeySigner,
        sol,
        sol_types::{Eip712Domain, SolStruct},
    },
    anyhow::Result,
    std::borrow::Cow,
};

sol! {
    struct Permit {
        address owner;
        address spender;
        uint256 value;
        uint256 nonce;
        uint256 deadline;
    }
}

/// The EIP-712 domain of a permit capable token.
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct PermitDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl PermitDomain {
    /// Version assumed when the token doesn't expose `version()`.
    pub const DEFAULT_VERSION: &'static str = "1";

    pub fn eip712_domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Owned(self.name.clone())),
            Some(Cow::Owned(self.version.clone())),
            Some(U256::from(self.chain_id)),
            Some(self.verifying_contract),
            None,
        )
    }

    pub fn separator(&self) -> B256 {
        self.eip712_domain().separator()
    }
}

/// The typed `Permit(owner,spender,value,nonce,deadline)` message.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Default)]
pub struct PermitMessage {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub nonce: U256,
    /// Unix seconds.
    pub deadline: u64,
}

impl PermitMessage {
    fn as_sol(&self) -> Permit {
        Permit {
            owner: self.owner,
            spender: self.spender,
            value: self.value,
            nonce: self.nonce,
            deadline: U256::from(self.deadline),
        }
    }

    pub fn struct_hash(&self) -> B256 {
        self.as_sol().eip712_hash_struct()
    }

    /// `keccak256("\x19\x01" || domainSeparator || structHash)`
    pub fn signing_hash(&self, domain: &PermitDomain) -> B256 {
        self.as_sol().eip712_signing_hash(&domain.eip712_domain())
    }
}

/// A signed permit ready to be passed to `selfPermit`.
#[derive(Eq, PartialEq, Clone, Debug)]
pub struct PermitAuthorization {
    pub token: Address,
    pub message: PermitMessage,
    pub signature: EcdsaSignature,
}

impl PermitAuthorization {
    pub fn sign(
        domain: &PermitDomain,
        message: PermitMessage,
        signer: &PrivateKeySigner,
    ) -> Result<Self> {
        let hash = message.signing_hash(domain);
        Ok(Self {
            token: domain.verifying_contract,
            message,
            signature: EcdsaSignature::sign(&hash, signer)?,
        })
    }

    /// Recovers the address that signed the permit for `domain`.
    pub fn recover_owner(&self, domain: &PermitDomain) -> Result<Address> {
        self.signature.recover(&self.message.signing_hash(domain))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            primitives::{address, keccak256},
            sol_types::SolValue,
        },
    };

    fn domain() -> PermitDomain {
        PermitDomain {
            name: "USD Coin".to_string(),
            version: "2".to_string(),
            chain_id: 11155111,
            verifying_contract: address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238"),
        }
    }

    #[test]
    fn struct_hash_matches_manual_encoding() {
        let message = PermitMessage {
            owner: Address::with_last_byte(1),
            spender: Address::with_last_byte(2),
            value: U256::from(1_000_000),
            nonce: U256::from(3),
            deadline: 1_700_000_000,
        };
        let typehash = keccak256(
            "Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)",
        );
        let expected = keccak256(
            (
                typehash,
                message.owner,
                message.spender,
                message.value,
                message.nonce,
                U256::from(message.deadline),
            )
                .abi_encode_params(),
        );
        assert_eq!(message.struct_hash(), expected);
    }

    #[test]
    fn separator_matches_manual_encoding() {
        let domain = domain();
        let typehash = keccak256(
            "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let expected = keccak256(
            (
                typehash,
                keccak256(domain.name.as_bytes()),
                keccak256(domain.version.as_bytes()),
                U256::from(domain.chain_id),
                domain.verifying_contract,
            )
                .abi_encode_params(),
        );
        assert_eq!(domain.separator(), expected);
    }

    #[test]
    fn signed_permit_recovers_owner() {
        let signer = PrivateKeySigner::from_bytes(&B256::repeat_byte(7)).unwrap();
        let domain = domain();
        let message = PermitMessage {
            owner: signer.address(),
            spender: Address::with_last_byte(9),
            value: U256::from(42),
            nonce: U256::ZERO,
            deadline: 1_700_000_300,
        };
        let permit = PermitAuthorization::sign(&domain, message, &signer).unwrap();
        assert_eq!(permit.token, domain.verifying_contract);
        assert_eq!(permit.recover_owner(&domain).unwrap(), signer.address());

        // A different version yields a different domain, so the signature no
        // longer recovers to the owner.
        let other = PermitDomain {
            version: PermitDomain::DEFAULT_VERSION.to_string(),
            ..domain
        };
        assert_ne!(permit.recover_owner(&other).ok(), Some(signer.address()));
    }

    #[test]
    fn altering_any_field_breaks_the_signature() {
        type Alter = fn(&mut PermitMessage, &mut PermitDomain);
        let cases: [(&str, Alter); 9] = [
            ("owner", |message, _| message.owner = Address::with_last_byte(8)),
            ("spender", |message, _| message.spender = Address::with_last_byte(8)),
            ("value", |message, _| message.value += U256::from(1)),
            ("nonce", |message, _| message.nonce += U256::from(1)),
            ("deadline", |message, _| message.deadline += 1),
            ("chain id", |_, domain| domain.chain_id = 1),
            ("verifying contract", |_, domain| {
                domain.verifying_contract = Address::with_last_byte(8)
            }),
            ("name", |_, domain| domain.name = "USD Coin ".to_string()),
            ("version", |_, domain| domain.version = "1".to_string()),
        ];

        let signer = PrivateKeySigner::from_bytes(&B256::repeat_byte(7)).unwrap();
        let domain = domain();
        let message = PermitMessage {
            owner: signer.address(),
            spender: Address::with_last_byte(9),
            value: U256::from(42),
            nonce: U256::from(5),
            deadline: 1_700_000_300,
        };
        let signed = PermitAuthorization::sign(&domain, message, &signer).unwrap();

        for (field, alter) in cases {
            let mut permit = signed.clone();
            let mut domain = domain.clone();
            alter(&mut permit.message, &mut domain);
            let recovered = permit.recover_owner(&domain).ok();
            assert_ne!(recovered, Some(signer.address()), "{field}");
            assert_ne!(recovered, Some(permit.message.owner), "{field}");
        }
    }
}
