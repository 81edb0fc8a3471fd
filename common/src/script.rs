use std::collections::BTreeSet;

use crate::{
    cbor::to_vec,
    crypto::{keyhash_224, keyhash_224_tagged},
    hash::Hash,
    plutus_data::{DatumHash, PlutusData},
    AddrKeyhash, ExUnits, KeyHash, ScriptHash,
};
use anyhow::{anyhow, Result};
use serde_with::{hex::Hex, serde_as};

pub type ScriptIntegrityHash = Hash<32>;

#[derive(
    Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum ScriptType {
    Native,
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

/// Plutus ledger language, as it appears in cost model maps
#[derive(
    Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum PlutusLanguage {
    V1,
    V2,
    V3,
}

impl PlutusLanguage {
    /// Key used for this language in cost model maps
    pub fn cost_model_key(&self) -> u8 {
        match self {
            PlutusLanguage::V1 => 0,
            PlutusLanguage::V2 => 1,
            PlutusLanguage::V3 => 2,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
pub enum NativeScript {
    ScriptPubkey(AddrKeyhash),
    ScriptAll(Vec<NativeScript>),
    ScriptAny(Vec<NativeScript>),
    ScriptNOfK(u32, Vec<NativeScript>),
    InvalidBefore(u64),
    InvalidHereafter(u64),
}

impl<'b, C> minicbor::decode::Decode<'b, C> for NativeScript {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        match d.u32()? {
            0 => Ok(NativeScript::ScriptPubkey(d.decode_with(ctx)?)),
            1 => Ok(NativeScript::ScriptAll(d.decode_with(ctx)?)),
            2 => Ok(NativeScript::ScriptAny(d.decode_with(ctx)?)),
            3 => Ok(NativeScript::ScriptNOfK(d.decode_with(ctx)?, d.decode_with(ctx)?)),
            4 => Ok(NativeScript::InvalidBefore(d.decode_with(ctx)?)),
            5 => Ok(NativeScript::InvalidHereafter(d.decode_with(ctx)?)),
            n => Err(minicbor::decode::Error::message(format!(
                "unknown variant id {n} for native script"
            ))),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for NativeScript {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            NativeScript::ScriptPubkey(v) => e.array(2)?.u8(0)?.encode_with(v, ctx)?,
            NativeScript::ScriptAll(v) => e.array(2)?.u8(1)?.encode_with(v, ctx)?,
            NativeScript::ScriptAny(v) => e.array(2)?.u8(2)?.encode_with(v, ctx)?,
            NativeScript::ScriptNOfK(n, v) => {
                e.array(3)?.u8(3)?.u32(*n)?.encode_with(v, ctx)?
            }
            NativeScript::InvalidBefore(v) => e.array(2)?.u8(4)?.u64(*v)?,
            NativeScript::InvalidHereafter(v) => e.array(2)?.u8(5)?.u64(*v)?,
        };
        Ok(())
    }
}

impl NativeScript {
    pub fn compute_hash(&self) -> ScriptHash {
        let mut data = vec![0u8];
        data.extend(to_vec(self));
        keyhash_224(&data)
    }

    /// Every key hash the script mentions; an upper bound on its signers
    pub fn collect_key_hashes(&self, into: &mut BTreeSet<KeyHash>) {
        match self {
            NativeScript::ScriptPubkey(hash) => {
                into.insert(*hash);
            }
            NativeScript::ScriptAll(scripts)
            | NativeScript::ScriptAny(scripts)
            | NativeScript::ScriptNOfK(_, scripts) => {
                scripts.iter().for_each(|s| s.collect_key_hashes(into));
            }
            NativeScript::InvalidBefore(_) | NativeScript::InvalidHereafter(_) => {}
        }
    }
}

/// A script in any language. Plutus variants hold the script bytes exactly
/// as they appear in the witness set.
#[serde_as]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
pub enum Script {
    Native(NativeScript),
    PlutusV1(#[serde_as(as = "Hex")] Vec<u8>),
    PlutusV2(#[serde_as(as = "Hex")] Vec<u8>),
    PlutusV3(#[serde_as(as = "Hex")] Vec<u8>),
}

impl Script {
    pub fn hash(&self) -> ScriptHash {
        match self {
            Script::Native(native) => native.compute_hash(),
            Script::PlutusV1(bytes) => keyhash_224_tagged(1, bytes),
            Script::PlutusV2(bytes) => keyhash_224_tagged(2, bytes),
            Script::PlutusV3(bytes) => keyhash_224_tagged(3, bytes),
        }
    }

    pub fn script_type(&self) -> ScriptType {
        match self {
            Script::Native(_) => ScriptType::Native,
            Script::PlutusV1(_) => ScriptType::PlutusV1,
            Script::PlutusV2(_) => ScriptType::PlutusV2,
            Script::PlutusV3(_) => ScriptType::PlutusV3,
        }
    }

    pub fn language(&self) -> Option<PlutusLanguage> {
        match self {
            Script::Native(_) => None,
            Script::PlutusV1(_) => Some(PlutusLanguage::V1),
            Script::PlutusV2(_) => Some(PlutusLanguage::V2),
            Script::PlutusV3(_) => Some(PlutusLanguage::V3),
        }
    }

    pub fn is_plutus(&self) -> bool {
        self.language().is_some()
    }

    /// Bytes counted against the reference script fee
    pub fn size(&self) -> usize {
        match self {
            Script::Native(native) => to_vec(native).len(),
            Script::PlutusV1(bytes) | Script::PlutusV2(bytes) | Script::PlutusV3(bytes) => {
                bytes.len()
            }
        }
    }

    /// Read the `[language, script]` form used by script references; the
    /// language comes from the leading tag
    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        minicbor::decode(bytes).map_err(|e| anyhow!("invalid script: {e}"))
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        to_vec(self)
    }
}

impl<C> minicbor::Encode<C> for Script {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            Script::Native(native) => e.u8(0)?.encode_with(native, ctx)?,
            Script::PlutusV1(bytes) => e.u8(1)?.bytes(bytes)?,
            Script::PlutusV2(bytes) => e.u8(2)?.bytes(bytes)?,
            Script::PlutusV3(bytes) => e.u8(3)?.bytes(bytes)?,
        };
        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Script {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        match d.u8()? {
            0 => Ok(Script::Native(d.decode_with(ctx)?)),
            1 => Ok(Script::PlutusV1(d.bytes()?.to_vec())),
            2 => Ok(Script::PlutusV2(d.bytes()?.to_vec())),
            3 => Ok(Script::PlutusV3(d.bytes()?.to_vec())),
            n => Err(minicbor::decode::Error::message(format!("unknown script language {n}"))),
        }
    }
}

/// Datum attached to an output, either by hash or inline
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datum {
    Hash(DatumHash),
    Inline(PlutusData),
}

impl Datum {
    pub fn hash(&self) -> DatumHash {
        match self {
            Datum::Hash(hash) => *hash,
            Datum::Inline(data) => data.hash(),
        }
    }
}

#[derive(
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
    minicbor::Decode,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
)]
#[cbor(index_only)]
pub enum RedeemerTag {
    #[n(0)]
    Spend,
    #[n(1)]
    Mint,
    #[n(2)]
    Cert,
    #[n(3)]
    Reward,
    #[n(4)]
    Vote,
    #[n(5)]
    Propose,
}

/// Position of the action a redeemer unlocks
#[derive(
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
    minicbor::Decode,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
)]
pub struct RedeemerPointer {
    #[n(0)]
    pub tag: RedeemerTag,
    #[n(1)]
    pub index: u32,
}

impl RedeemerPointer {
    pub fn new(tag: RedeemerTag, index: u32) -> Self {
        Self { tag, index }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redeemer {
    pub tag: RedeemerTag,
    pub index: u32,
    pub data: PlutusData,
    pub ex_units: ExUnits,
}

impl Redeemer {
    pub fn redeemer_pointer(&self) -> RedeemerPointer {
        RedeemerPointer {
            tag: self.tag,
            index: self.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn plutus_bytes_serialise_as_hex() {
        let script = Script::PlutusV2(vec![0x4e, 0x4d, 0x01]);
        let json = serde_json::to_string(&script).unwrap();
        assert_eq!(json, r#"{"PlutusV2":"4e4d01"}"#);
        assert_eq!(serde_json::from_str::<Script>(&json).unwrap(), script);
    }

    #[test]
    fn native_script_hash() {
        let native_script = NativeScript::ScriptPubkey(
            AddrKeyhash::from_str("976ec349c3a14f58959088e13e98f6cd5a1e8f27f6f3160b25e415ca")
                .unwrap(),
        );
        assert_eq!(
            native_script.compute_hash(),
            ScriptHash::from_str("c3a33acb8903cf42611e26b15c7731f537867c6469f5bf69c837e4a3")
                .unwrap()
        );
    }

    #[test]
    fn language_is_read_from_the_encoding() {
        let script = Script::PlutusV2(vec![0x4e, 0x4d, 0x01, 0x00, 0x00]);
        let decoded = Script::from_cbor(&script.to_cbor()).unwrap();
        assert_eq!(decoded.language(), Some(PlutusLanguage::V2));
        assert_eq!(decoded.hash(), keyhash_224_tagged(2, &[0x4e, 0x4d, 0x01, 0x00, 0x00]));
    }

    #[test]
    fn same_bytes_hash_differently_per_language() {
        let bytes = vec![1, 2, 3];
        assert_ne!(Script::PlutusV1(bytes.clone()).hash(), Script::PlutusV3(bytes).hash());
    }

    #[test]
    fn collects_nested_keys() {
        let a = Hash::new([1u8; 28]);
        let b = Hash::new([2u8; 28]);
        let script = NativeScript::ScriptAll(vec![
            NativeScript::ScriptPubkey(a),
            NativeScript::ScriptNOfK(1, vec![NativeScript::ScriptPubkey(b)]),
            NativeScript::InvalidHereafter(100),
        ]);
        let mut keys = BTreeSet::new();
        script.collect_key_hashes(&mut keys);
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn redeemer_tag_encodes_as_index() {
        assert_eq!(minicbor::to_vec(RedeemerTag::Reward).unwrap(), vec![0x03]);
    }
}
