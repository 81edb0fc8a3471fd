//! Transaction metadata and auxiliary data

use crate::cbor::to_vec;
use crate::crypto::keyhash_256;
use crate::hash::Hash;
use minicbor::data::Int;
use std::collections::BTreeMap;
use thiserror::Error;

pub type MetadatumLabel = u64;
pub type Metadata = BTreeMap<MetadatumLabel, Metadatum>;
pub type AuxiliaryDataHash = Hash<32>;

/// Longest text or byte string a metadatum may hold
pub const MAX_METADATUM_STRING: usize = 64;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("invalid metadata json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} cannot be expressed as metadata")]
    Unsupported(&'static str),

    #[error("metadata string of {0} bytes exceeds the 64 byte limit")]
    TooLong(usize),

    #[error("integer {0} out of metadata range")]
    OutOfRange(String),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Metadatum {
    Int(i128),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Metadatum>),
    Map(Vec<(Metadatum, Metadatum)>),
}

impl Metadatum {
    /// Parse JSON using the "no schema" conversion: strings starting with
    /// `0x` become bytes, object keys that are decimal integers become
    /// integer keys.
    pub fn from_json(text: &str) -> Result<Self, MetadataError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, MetadataError> {
        use serde_json::Value as Json;
        match value {
            Json::Null => Err(MetadataError::Unsupported("null")),
            Json::Bool(_) => Err(MetadataError::Unsupported("a boolean")),
            Json::Number(n) => n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from))
                .map(Metadatum::Int)
                .ok_or(MetadataError::Unsupported("a fractional number")),
            Json::String(s) => Self::from_json_string(s),
            Json::Array(items) => Ok(Metadatum::Array(
                items.iter().map(Self::from_json_value).collect::<Result<_, _>>()?,
            )),
            Json::Object(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match key.parse::<i64>() {
                        Ok(n) => Metadatum::Int(n.into()),
                        Err(_) => Self::from_json_string(key)?,
                    };
                    pairs.push((key, Self::from_json_value(value)?));
                }
                Ok(Metadatum::Map(pairs))
            }
        }
    }

    fn from_json_string(s: &str) -> Result<Self, MetadataError> {
        if let Some(bytes) = s.strip_prefix("0x").and_then(|h| hex::decode(h).ok()) {
            if bytes.len() > MAX_METADATUM_STRING {
                return Err(MetadataError::TooLong(bytes.len()));
            }
            return Ok(Metadatum::Bytes(bytes));
        }
        if s.len() > MAX_METADATUM_STRING {
            return Err(MetadataError::TooLong(s.len()));
        }
        Ok(Metadatum::Text(s.to_string()))
    }
}

impl<C> minicbor::Encode<C> for Metadatum {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Metadatum::Int(n) => {
                let int = Int::try_from(*n).map_err(|_| {
                    minicbor::encode::Error::message(MetadataError::OutOfRange(n.to_string()))
                })?;
                e.int(int)?;
            }
            Metadatum::Bytes(bytes) => {
                e.bytes(bytes)?;
            }
            Metadatum::Text(text) => {
                e.str(text)?;
            }
            Metadatum::Array(items) => {
                e.array(items.len() as u64)?;
                for item in items {
                    e.encode_with(item, ctx)?;
                }
            }
            Metadatum::Map(pairs) => {
                e.map(pairs.len() as u64)?;
                for (k, v) in pairs {
                    e.encode_with(k, ctx)?.encode_with(v, ctx)?;
                }
            }
        }
        Ok(())
    }
}

/// Auxiliary data attached to a transaction. Only metadata is carried,
/// written in the Shelley map form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxiliaryData {
    pub metadata: Metadata,
}

impl AuxiliaryData {
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn hash(&self) -> AuxiliaryDataHash {
        keyhash_256(&to_vec(self))
    }
}

impl<C> minicbor::Encode<C> for AuxiliaryData {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(self.metadata.len() as u64)?;
        for (label, datum) in &self.metadata {
            e.u64(*label)?.encode_with(datum, ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_schema_conversion() {
        let datum = Metadatum::from_json(r#"{"1": "0xbeef", "name": ["a", 7]}"#).unwrap();
        assert_eq!(
            datum,
            Metadatum::Map(vec![
                (Metadatum::Int(1), Metadatum::Bytes(vec![0xbe, 0xef])),
                (
                    Metadatum::Text("name".into()),
                    Metadatum::Array(vec![Metadatum::Text("a".into()), Metadatum::Int(7)])
                ),
            ])
        );
    }

    #[test]
    fn rejects_what_metadata_cannot_hold() {
        assert!(matches!(Metadatum::from_json("1.5"), Err(MetadataError::Unsupported(_))));
        assert!(matches!(Metadatum::from_json("true"), Err(MetadataError::Unsupported(_))));
        let long = format!("\"{}\"", "x".repeat(65));
        assert!(matches!(Metadatum::from_json(&long), Err(MetadataError::TooLong(65))));
        assert!(matches!(Metadatum::from_json("{"), Err(MetadataError::Json(_))));
    }

    #[test]
    fn auxiliary_data_is_a_label_map() {
        let mut metadata = Metadata::new();
        metadata.insert(674, Metadatum::Text("hi".into()));
        let aux = AuxiliaryData { metadata };
        assert_eq!(to_vec(&aux), vec![0xa1, 0x19, 0x02, 0xa2, 0x62, b'h', b'i']);
        assert_eq!(aux.hash(), keyhash_256(&to_vec(&aux)));
    }
}
