//! Tagged-value payload codec.
//!
//! Application payloads travel between chains as an ordered list of named,
//! tagged values. The wire form is SCALE: an `Option` presence byte for the
//! item list, a compact-encoded count, then per item a compact-length UTF-8
//! name, a one-byte variant index and the variant's value (fixed-width
//! integers little-endian, strings and arrays compact-length prefixed).
//!
//! 64- and 128-bit integers are carried as decimal text at every serde
//! boundary; inside the crate they are native wide integers.

use parity_scale_codec::{Decode, DecodeAll, Encode};
use serde::{Deserialize, Serialize};

/// Codec failures surfaced while decoding a payload buffer.
///
/// Covers unknown variant indices, truncated buffers, invalid UTF-8 in
/// string values and declared counts that exceed the remaining input, as
/// well as residual bytes after a complete decode.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("payload decode failed: {0}")]
    Decode(#[from] parity_scale_codec::Error),
}

/// A single named, tagged value inside a message payload.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct PayloadItem {
    pub name: String,
    pub value: PayloadValue,
}

impl PayloadItem {
    pub fn new(name: impl Into<String>, value: PayloadValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A foreign-chain address carried opaquely through the relay.
///
/// Either the 32-byte native form, the generic string form or both may be
/// present; `kind` tells the receiving contract how to interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct AddressData {
    pub native: Option<[u8; 32]>,
    pub generic: Option<String>,
    pub kind: u8,
}

/// The closed set of wire value tags.
///
/// Variant indices are the wire discriminants and must never be reordered.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PayloadValue {
    #[codec(index = 0)]
    String(String),
    #[codec(index = 1)]
    U8(u8),
    #[codec(index = 2)]
    U16(u16),
    #[codec(index = 3)]
    U32(u32),
    #[codec(index = 4)]
    #[serde(with = "num_text")]
    U64(u64),
    #[codec(index = 5)]
    #[serde(with = "num_text")]
    U128(u128),
    #[codec(index = 6)]
    I8(i8),
    #[codec(index = 7)]
    I16(i16),
    #[codec(index = 8)]
    I32(i32),
    #[codec(index = 9)]
    #[serde(with = "num_text")]
    I64(i64),
    #[codec(index = 10)]
    #[serde(with = "num_text")]
    I128(i128),
    #[codec(index = 11)]
    StringArray(Vec<String>),
    #[codec(index = 12)]
    U8Array(Vec<u8>),
    #[codec(index = 13)]
    U16Array(Vec<u16>),
    #[codec(index = 14)]
    U32Array(Vec<u32>),
    #[codec(index = 15)]
    #[serde(with = "num_text_vec")]
    U64Array(Vec<u64>),
    #[codec(index = 16)]
    #[serde(with = "num_text_vec")]
    U128Array(Vec<u128>),
    #[codec(index = 17)]
    I8Array(Vec<i8>),
    #[codec(index = 18)]
    I16Array(Vec<i16>),
    #[codec(index = 19)]
    I32Array(Vec<i32>),
    #[codec(index = 20)]
    #[serde(with = "num_text_vec")]
    I64Array(Vec<i64>),
    #[codec(index = 21)]
    #[serde(with = "num_text_vec")]
    I128Array(Vec<i128>),
    #[codec(index = 22)]
    Address(AddressData),
}

/// Wire wrapper: the item list is optional so that "no payload" encodes to a
/// single zero byte.
#[derive(Debug, PartialEq, Eq, Encode, Decode)]
struct MessagePayload {
    items: Option<Vec<PayloadItem>>,
}

/// Encodes an ordered item list into its wire form. Pure, never fails.
pub fn encode_payload(items: &[PayloadItem]) -> Vec<u8> {
    let payload = MessagePayload {
        items: if items.is_empty() {
            None
        } else {
            Some(items.to_vec())
        },
    };
    payload.encode()
}

/// Decodes a wire buffer back into the ordered item list.
///
/// The whole buffer must be consumed; trailing bytes are an error. An empty
/// buffer decodes to an empty list, matching the encoding of "no payload".
pub fn decode_payload(bytes: &[u8]) -> Result<Vec<PayloadItem>, CodecError> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let payload = MessagePayload::decode_all(&mut &bytes[..])?;
    Ok(payload.items.unwrap_or_default())
}

/// Serde helpers carrying wide integers as decimal text across runtime
/// boundaries whose native numbers cannot hold 64+ bits exactly.
pub(crate) mod num_text {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

pub(crate) mod num_text_vec {
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<T, S>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        let texts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        texts.serialize(serializer)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .into_iter()
            .map(|t| t.parse().map_err(de::Error::custom))
            .collect()
    }
}
