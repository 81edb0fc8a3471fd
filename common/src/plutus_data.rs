//! Plutus data: datums and redeemer arguments

use crate::cbor::{decode_bytes, encode_bounded_bytes, to_vec};
use crate::crypto::keyhash_256;
use crate::hash::Hash;
use anyhow::{anyhow, bail, Context, Result};
use minicbor::data::{Int, Tag, Type};

pub type DatumHash = Hash<32>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlutusData {
    Constr { tag: u64, fields: Vec<PlutusData> },
    Map(Vec<(PlutusData, PlutusData)>),
    List(Vec<PlutusData>),
    Integer(i128),
    Bytes(Vec<u8>),
}

impl PlutusData {
    pub fn constr(tag: u64, fields: Vec<PlutusData>) -> Self {
        Self::Constr { tag, fields }
    }

    /// The unit value, `Constr 0 []`
    pub fn unit() -> Self {
        Self::constr(0, Vec::new())
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        minicbor::decode(bytes).map_err(|e| anyhow!("invalid plutus data: {e}"))
    }

    pub fn hash(&self) -> DatumHash {
        keyhash_256(&self.to_cbor())
    }

    /// Parse the detailed JSON schema used by cardano-cli, e.g.
    /// `{"constructor": 0, "fields": [{"int": 42}, {"bytes": "beef"}]}`
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    pub fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| anyhow!("plutus data must be an object"))?;
        if let Some(tag) = object.get("constructor") {
            let tag = tag.as_u64().ok_or_else(|| anyhow!("constructor must be a natural"))?;
            let fields = object
                .get("fields")
                .and_then(|f| f.as_array())
                .ok_or_else(|| anyhow!("constructor without fields"))?;
            let fields = fields.iter().map(Self::from_json_value).collect::<Result<_>>()?;
            return Ok(Self::constr(tag, fields));
        }
        if let Some(entries) = object.get("map") {
            let entries = entries.as_array().ok_or_else(|| anyhow!("map must be an array"))?;
            let mut pairs = Vec::with_capacity(entries.len());
            for entry in entries {
                let k = entry.get("k").ok_or_else(|| anyhow!("map entry without k"))?;
                let v = entry.get("v").ok_or_else(|| anyhow!("map entry without v"))?;
                pairs.push((Self::from_json_value(k)?, Self::from_json_value(v)?));
            }
            return Ok(Self::Map(pairs));
        }
        if let Some(items) = object.get("list") {
            let items = items.as_array().ok_or_else(|| anyhow!("list must be an array"))?;
            return Ok(Self::List(items.iter().map(Self::from_json_value).collect::<Result<_>>()?));
        }
        if let Some(int) = object.get("int") {
            let n = int
                .as_i64()
                .map(i128::from)
                .or_else(|| int.as_u64().map(i128::from))
                .ok_or_else(|| anyhow!("int out of range: {int}"))?;
            return Ok(Self::Integer(n));
        }
        if let Some(bytes) = object.get("bytes") {
            let text = bytes.as_str().ok_or_else(|| anyhow!("bytes must be a hex string"))?;
            return Ok(Self::Bytes(hex::decode(text).context("bytes must be hex")?));
        }
        bail!("unrecognised plutus data object")
    }
}

fn encode_list<W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    items: &[PlutusData],
) -> Result<(), minicbor::encode::Error<W::Error>> {
    // Non-empty lists are written indefinite, matching the node's own encoder
    if items.is_empty() {
        e.array(0)?;
    } else {
        e.begin_array()?;
        for item in items {
            e.encode(item)?;
        }
        e.end()?;
    }
    Ok(())
}

impl minicbor::Encode<()> for PlutusData {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            PlutusData::Constr { tag, fields } => match *tag {
                0..=6 => {
                    e.tag(Tag::new(121 + tag))?;
                    encode_list(e, fields)?;
                }
                7..=127 => {
                    e.tag(Tag::new(1280 + tag - 7))?;
                    encode_list(e, fields)?;
                }
                _ => {
                    e.tag(Tag::new(102))?.array(2)?.u64(*tag)?;
                    encode_list(e, fields)?;
                }
            },
            PlutusData::Map(pairs) => {
                e.map(pairs.len() as u64)?;
                for (k, v) in pairs {
                    e.encode(k)?.encode(v)?;
                }
            }
            PlutusData::List(items) => encode_list(e, items)?,
            PlutusData::Integer(n) => match Int::try_from(*n) {
                Ok(int) => {
                    e.int(int)?;
                }
                Err(_) => {
                    // Outside the 65-bit CBOR range: tagged big-endian magnitude
                    let (tag, magnitude) = if *n >= 0 {
                        (2, n.unsigned_abs())
                    } else {
                        (3, (-1 - *n).unsigned_abs())
                    };
                    let bytes = magnitude.to_be_bytes();
                    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
                    e.tag(Tag::new(tag))?;
                    encode_bounded_bytes(e, &bytes[start..])?;
                }
            },
            PlutusData::Bytes(bytes) => encode_bounded_bytes(e, bytes)?,
        }
        Ok(())
    }
}

fn decode_list(d: &mut minicbor::Decoder<'_>) -> Result<Vec<PlutusData>, minicbor::decode::Error> {
    d.array_iter::<PlutusData>()?.collect()
}

fn bignum(bytes: &[u8]) -> Result<u128, minicbor::decode::Error> {
    if bytes.len() > 16 {
        return Err(minicbor::decode::Error::message("bignum wider than 128 bits"));
    }
    Ok(bytes.iter().fold(0u128, |acc, b| (acc << 8) | *b as u128))
}

impl<'b> minicbor::Decode<'b, ()> for PlutusData {
    fn decode(d: &mut minicbor::Decoder<'b>, _ctx: &mut ()) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            Type::Tag => {
                let tag = d.tag()?.as_u64();
                match tag {
                    121..=127 => Ok(PlutusData::constr(tag - 121, decode_list(d)?)),
                    1280..=1400 => Ok(PlutusData::constr(tag - 1280 + 7, decode_list(d)?)),
                    102 => {
                        d.array()?;
                        let index = d.u64()?;
                        Ok(PlutusData::constr(index, decode_list(d)?))
                    }
                    2 => {
                        let magnitude = bignum(&decode_bytes(d)?)?;
                        i128::try_from(magnitude)
                            .map(PlutusData::Integer)
                            .map_err(|_| minicbor::decode::Error::message("bignum overflow"))
                    }
                    3 => {
                        let magnitude = bignum(&decode_bytes(d)?)?;
                        i128::try_from(magnitude)
                            .map(|m| PlutusData::Integer(-1 - m))
                            .map_err(|_| minicbor::decode::Error::message("bignum overflow"))
                    }
                    other => Err(minicbor::decode::Error::message(format!(
                        "unexpected tag {other} in plutus data"
                    ))),
                }
            }
            Type::Map | Type::MapIndef => {
                let pairs = d
                    .map_iter::<PlutusData, PlutusData>()?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(PlutusData::Map(pairs))
            }
            Type::Array | Type::ArrayIndef => Ok(PlutusData::List(decode_list(d)?)),
            Type::Bytes | Type::BytesIndef => Ok(PlutusData::Bytes(decode_bytes(d)?)),
            _ => Ok(PlutusData::Integer(i128::from(d.int()?))),
        }
    }
}
