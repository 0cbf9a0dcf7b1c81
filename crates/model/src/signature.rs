use {
    alloy::{
        primitives::{Address, B256, Signature, U256},
        signers::{SignerSync, local::PrivateKeySigner},
    },
    anyhow::{Context, Result, ensure},
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::fmt::{self, Debug, Formatter},
};

/// An ECDSA signature split into the `(v, r, s)` components expected by
/// `permit`-style contract functions.
#[derive(Eq, PartialEq, Clone, Copy, Default, Hash)]
pub struct EcdsaSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl EcdsaSignature {
    /// r + s + v
    pub fn to_bytes(self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        EcdsaSignature {
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        }
    }

    /// Signs an already computed EIP-712 signing hash.
    pub fn sign(hash: &B256, signer: &PrivateKeySigner) -> Result<Self> {
        let signature = signer
            .sign_hash_sync(hash)
            .context("failed to sign hash")?;
        Ok(Self::from(signature))
    }

    pub fn recover(&self, hash: &B256) -> Result<Address> {
        ensure!(
            matches!(self.v, 27 | 28),
            "invalid recovery id {}",
            self.v
        );
        let signature = Signature::new(
            U256::from_be_bytes(self.r.0),
            U256::from_be_bytes(self.s.0),
            self.v == 28,
        );
        signature
            .recover_address_from_prehash(hash)
            .context("unexpectedly invalid signature")
    }
}

impl From<Signature> for EcdsaSignature {
    fn from(signature: Signature) -> Self {
        Self {
            r: B256::from(signature.r().to_be_bytes::<32>()),
            s: B256::from(signature.s().to_be_bytes::<32>()),
            v: 27 + u8::from(signature.v()),
        }
    }
}

impl Debug for EcdsaSignature {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "0x{}", const_hex::encode(self.to_bytes()))
    }
}

impl Serialize for EcdsaSignature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&const_hex::encode_prefixed(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for EcdsaSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 65];
        const_hex::decode_to_slice(s.trim_start_matches("0x"), &mut bytes).map_err(|err| {
            de::Error::custom(format!("failed to decode {s:?} as 65 byte signature: {err}"))
        })?;
        Ok(Self::from_bytes(&bytes))
    }
}
