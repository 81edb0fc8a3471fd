//! Core type definitions shared across the builder

use crate::declare_hash_newtype_with_bech32;
use crate::hash::Hash;
use crate::rational_number::RationalNumber;
use std::fmt;
use std::str::FromStr;

pub type Lovelace = u64;
pub type Slot = u64;

pub type TxHash = Hash<32>;
pub type KeyHash = Hash<28>;
pub type ScriptHash = Hash<28>;
pub type AddrKeyhash = KeyHash;
pub type DataHash = Hash<32>;

declare_hash_newtype_with_bech32!(
    /// Stake pool operator key hash, `pool1...` in bech32
    PoolId,
    28,
    "pool"
);

/// Network identifier as carried in address headers and the body
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum NetworkId {
    Testnet,
    #[default]
    Mainnet,
}

impl NetworkId {
    pub fn header_bits(&self) -> u8 {
        match self {
            NetworkId::Testnet => 0,
            NetworkId::Mainnet => 1,
        }
    }

    pub fn from_header_bits(bits: u8) -> Self {
        match bits & 0x0f {
            0 => NetworkId::Testnet,
            _ => NetworkId::Mainnet,
        }
    }
}

/// Payment or stake credential.
///
/// Variant order matches the ledger's derived ordering: script credentials
/// sort ahead of key credentials. Redeemer indexes over reward accounts and
/// voters depend on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Credential {
    ScriptHash(ScriptHash),
    AddrKeyHash(KeyHash),
}

pub type StakeCredential = Credential;

impl Credential {
    pub fn hash(&self) -> &Hash<28> {
        match self {
            Credential::ScriptHash(hash) | Credential::AddrKeyHash(hash) => hash,
        }
    }

    pub fn script_hash(&self) -> Option<ScriptHash> {
        match self {
            Credential::ScriptHash(hash) => Some(*hash),
            Credential::AddrKeyHash(_) => None,
        }
    }

    pub fn key_hash(&self) -> Option<KeyHash> {
        match self {
            Credential::AddrKeyHash(hash) => Some(*hash),
            Credential::ScriptHash(_) => None,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::ScriptHash(_))
    }
}

impl<C> minicbor::Encode<C> for Credential {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            Credential::AddrKeyHash(hash) => e.u8(0)?.encode_with(hash, ctx)?,
            Credential::ScriptHash(hash) => e.u8(1)?.encode_with(hash, ctx)?,
        };
        Ok(())
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Credential {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        match d.u8()? {
            0 => Ok(Credential::AddrKeyHash(d.decode_with(ctx)?)),
            1 => Ok(Credential::ScriptHash(d.decode_with(ctx)?)),
            n => Err(minicbor::decode::Error::message(format!("unknown credential kind {n}"))),
        }
    }
}

/// Execution budget of one script invocation
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

impl ExUnits {
    pub fn new(mem: u64, steps: u64) -> Self {
        Self { mem, steps }
    }

    pub fn saturating_add(self, other: ExUnits) -> ExUnits {
        ExUnits {
            mem: self.mem.saturating_add(other.mem),
            steps: self.steps.saturating_add(other.steps),
        }
    }
}

impl<C> minicbor::Encode<C> for ExUnits {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.u64(self.mem)?.u64(self.steps)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for ExUnits {
    fn decode(d: &mut minicbor::Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        Ok(ExUnits {
            mem: d.u64()?,
            steps: d.u64()?,
        })
    }
}

/// Price per unit of memory and per CPU step
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExUnitPrices {
    #[serde(with = "crate::rational_number::flexible")]
    pub mem_price: RationalNumber,
    #[serde(with = "crate::rational_number::flexible")]
    pub step_price: RationalNumber,
}

impl Default for ExUnitPrices {
    fn default() -> Self {
        Self {
            mem_price: RationalNumber::new(577, 10_000),
            step_price: RationalNumber::new(721, 10_000_000),
        }
    }
}

/// Reference to an output of a previous transaction
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct UTxOIdentifier {
    pub tx_hash: TxHash,
    pub output_index: u16,
}

impl UTxOIdentifier {
    pub fn new(tx_hash: TxHash, output_index: u16) -> Self {
        Self {
            tx_hash,
            output_index,
        }
    }
}

impl fmt::Display for UTxOIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.output_index)
    }
}

impl FromStr for UTxOIdentifier {
    type Err = anyhow::Error;

    /// Parse the `<tx hash>#<index>` form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, index) =
            s.split_once('#').ok_or_else(|| anyhow::anyhow!("missing '#' in {s}"))?;
        Ok(Self::new(hash.parse()?, index.parse()?))
    }
}

impl<C> minicbor::Encode<C> for UTxOIdentifier {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.encode_with(self.tx_hash, ctx)?.u16(self.output_index)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for UTxOIdentifier {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        Ok(Self::new(d.decode_with(ctx)?, d.u16()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::Bech32Conversion;

    #[test]
    fn script_credentials_sort_first() {
        let key = Credential::AddrKeyHash(Hash::new([0u8; 28]));
        let script = Credential::ScriptHash(Hash::new([0xff; 28]));
        assert!(script < key);
    }

    #[test]
    fn utxo_identifier_orders_by_hash_then_index() {
        let a = UTxOIdentifier::new(Hash::new([1u8; 32]), 5);
        let b = UTxOIdentifier::new(Hash::new([1u8; 32]), 7);
        let c = UTxOIdentifier::new(Hash::new([2u8; 32]), 0);
        let mut ids = vec![c, b, a];
        ids.sort();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn utxo_identifier_parses_hash_index_form() {
        let text = format!("{}#3", "11".repeat(32));
        let id: UTxOIdentifier = text.parse().unwrap();
        assert_eq!(id.output_index, 3);
        assert_eq!(id.to_string(), text);
    }

    #[test]
    fn pool_id_bech32() {
        let pool = PoolId::new(Hash::new([0x42; 28]));
        let text = pool.to_bech32().unwrap();
        assert!(text.starts_with("pool1"));
        assert_eq!(PoolId::from_bech32(&text).unwrap(), pool);
    }

    #[test]
    fn credential_cbor_layout() {
        let cred = Credential::ScriptHash(Hash::new([0u8; 28]));
        let bytes = minicbor::to_vec(cred).unwrap();
        assert_eq!(&bytes[..3], &[0x82, 0x01, 0x58]);
    }
}
