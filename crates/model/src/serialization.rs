use {
    alloy::primitives::U256,
    serde::{
        Deserializer,
        Serializer,
        de::{self, Visitor},
    },
    serde_with::{DeserializeAs, SerializeAs},
    std::fmt,
};

/// Serializes a [`U256`] as a decimal string and deserializes it from a
/// decimal string, a `0x` prefixed hex string or a plain JSON integer.
///
/// The fee API returns small amounts as JSON numbers and large ones as
/// strings, so both have to be accepted.
pub struct HexOrDecimalU256;

impl SerializeAs<U256> for HexOrDecimalU256 {
    fn serialize_as<S: Serializer>(source: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&source.to_string())
    }
}

impl<'de> DeserializeAs<'de, U256> for HexOrDecimalU256 {
    fn deserialize_as<D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct U256Visitor;

        impl Visitor<'_> for U256Visitor {
            type Value = U256;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(
                    formatter,
                    "a u256 encoded either as 0x hex prefixed string, decimal string or integer"
                )
            }

            fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let s = s.trim();
                match s.strip_prefix("0x") {
                    Some(hex) => U256::from_str_radix(hex, 16).map_err(|err| {
                        E::custom(format!("failed to decode {s:?} as hex u256: {err}"))
                    }),
                    None => U256::from_str_radix(s, 10).map_err(|err| {
                        E::custom(format!("failed to decode {s:?} as decimal u256: {err}"))
                    }),
                }
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(U256::from(v))
            }

            fn visit_u128<E>(self, v: u128) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(U256::from(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(v)
                    .map(U256::from)
                    .map_err(|_| E::custom(format!("negative value {v} is not a u256")))
            }
        }

        deserializer.deserialize_any(U256Visitor)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        serde::{Deserialize, Serialize},
        serde_json::json,
        serde_with::serde_as,
    };

    #[serde_as]
    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Amount(#[serde_as(as = "HexOrDecimalU256")] U256);

    #[test]
    fn deserializes_all_encodings() {
        for value in [json!("1000"), json!("0x3e8"), json!(1000), json!(" 1000 ")] {
            let amount: Amount = serde_json::from_value(value).unwrap();
            assert_eq!(amount.0, U256::from(1000));
        }
    }

    #[test]
    fn rejects_invalid_values() {
        for value in [json!("ten"), json!(-1), json!("0xzz"), json!(null)] {
            assert!(serde_json::from_value::<Amount>(value).is_err());
        }
    }

    #[test]
    fn serializes_as_decimal_string() {
        let value = serde_json::to_value(Amount(U256::MAX)).unwrap();
        assert_eq!(value, json!(U256::MAX.to_string()));
    }
}
