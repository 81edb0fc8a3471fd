use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    ops::{Add, AddAssign},
    str::FromStr,
};

use anyhow::{anyhow, bail};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hash::Hash;
use crate::types::Lovelace;

pub type PolicyId = Hash<28>;

/// Positive quantities per policy and asset name
pub type MultiAsset = BTreeMap<PolicyId, BTreeMap<AssetName, u64>>;

/// Signed quantities: positive entries mint, negative entries burn
pub type Mint = BTreeMap<PolicyId, BTreeMap<AssetName, i64>>;

/// Asset name of at most 32 bytes, stored inline
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct AssetName {
    len: u8,
    bytes: [u8; 32],
}

impl AssetName {
    pub fn new(data: &[u8]) -> Option<Self> {
        if data.len() > 32 {
            return None;
        }
        let mut bytes = [0u8; 32];
        bytes[..data.len()].copy_from_slice(data);
        Some(Self {
            len: data.len() as u8,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl Ord for AssetName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl PartialOrd for AssetName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetName({})", hex::encode(self.as_slice()))
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_slice()))
    }
}

impl FromStr for AssetName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        AssetName::new(&bytes).ok_or_else(|| anyhow!("asset name longer than 32 bytes"))
    }
}

impl Serialize for AssetName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl<C> minicbor::Encode<C> for AssetName {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(self.as_slice())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for AssetName {
    fn decode(d: &mut minicbor::Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        AssetName::new(d.bytes()?)
            .ok_or_else(|| minicbor::decode::Error::message("asset name longer than 32 bytes"))
    }
}

/// Policy id and asset name, written as the hex concatenation of both
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId {
    pub policy_id: PolicyId,
    pub asset_name: AssetName,
}

impl AssetId {
    pub fn new(policy_id: PolicyId, asset_name: AssetName) -> Self {
        Self {
            policy_id,
            asset_name,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        if bytes.len() < 28 {
            bail!("asset id shorter than a policy id: {} bytes", bytes.len());
        }
        let policy_id = PolicyId::try_from(&bytes[..28])?;
        let asset_name = AssetName::new(&bytes[28..])
            .ok_or_else(|| anyhow!("asset name longer than 32 bytes"))?;
        Ok(Self::new(policy_id, asset_name))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.policy_id, self.asset_name)
    }
}

impl FromStr for AssetId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(&hex::decode(s)?)
    }
}

/// Value (lovelace + multiasset)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub lovelace: Lovelace,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: MultiAsset,
}

impl Value {
    pub fn new(lovelace: Lovelace, assets: MultiAsset) -> Self {
        let mut value = Self { lovelace, assets };
        value.prune();
        value
    }

    pub fn from_lovelace(lovelace: Lovelace) -> Self {
        Self {
            lovelace,
            assets: MultiAsset::new(),
        }
    }

    pub fn coin(&self) -> Lovelace {
        self.lovelace
    }

    pub fn with_asset(mut self, policy: PolicyId, name: AssetName, amount: u64) -> Self {
        if amount > 0 {
            let have = self.assets.entry(policy).or_default().entry(name).or_default();
            *have = have.saturating_add(amount);
        }
        self
    }

    pub fn asset_quantity(&self, policy: &PolicyId, name: &AssetName) -> u64 {
        self.assets.get(policy).and_then(|a| a.get(name)).copied().unwrap_or(0)
    }

    pub fn has_assets(&self) -> bool {
        self.assets.values().any(|a| a.values().any(|q| *q > 0))
    }

    pub fn is_zero(&self) -> bool {
        self.lovelace == 0 && !self.has_assets()
    }

    /// Drop zero quantities and empty policies
    pub fn prune(&mut self) {
        for assets in self.assets.values_mut() {
            assets.retain(|_, q| *q > 0);
        }
        self.assets.retain(|_, a| !a.is_empty());
    }

    /// True when every component of `self` is at least the same component
    /// of `other`
    pub fn covers(&self, other: &Value) -> bool {
        self.lovelace >= other.lovelace
            && other.assets.iter().all(|(policy, assets)| {
                assets.iter().all(|(name, q)| self.asset_quantity(policy, name) >= *q)
            })
    }

    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        let mut result = self.clone();
        result.lovelace = self.lovelace.checked_add(other.lovelace)?;
        for (policy, assets) in &other.assets {
            let entry = result.assets.entry(*policy).or_default();
            for (name, q) in assets {
                let have = entry.entry(*name).or_default();
                *have = have.checked_add(*q)?;
            }
        }
        result.prune();
        Some(result)
    }

    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        if !self.covers(other) {
            return None;
        }
        Some(self.saturating_sub(other))
    }

    /// Component-wise subtraction floored at zero
    pub fn saturating_sub(&self, other: &Value) -> Value {
        let mut result = self.clone();
        result.lovelace = self.lovelace.saturating_sub(other.lovelace);
        for (policy, assets) in &other.assets {
            if let Some(mine) = result.assets.get_mut(policy) {
                for (name, q) in assets {
                    if let Some(have) = mine.get_mut(name) {
                        *have = have.saturating_sub(*q);
                    }
                }
            }
        }
        result.prune();
        result
    }

    /// Positive and negative halves of a mint field
    pub fn split_mint(mint: &Mint) -> (Value, Value) {
        let mut minted = Value::default();
        let mut burned = Value::default();
        for (policy, assets) in mint {
            for (name, q) in assets {
                match q.cmp(&0) {
                    Ordering::Greater => {
                        minted = minted.with_asset(*policy, *name, q.unsigned_abs())
                    }
                    Ordering::Less => burned = burned.with_asset(*policy, *name, q.unsigned_abs()),
                    Ordering::Equal => {}
                }
            }
        }
        (minted, burned)
    }

    pub fn sum<'a>(iter: impl Iterator<Item = &'a Value>) -> Value {
        iter.fold(Value::default(), |mut acc, v| {
            acc += v;
            acc
        })
    }
}

impl AddAssign<&Value> for Value {
    fn add_assign(&mut self, other: &Value) {
        self.lovelace = self.lovelace.saturating_add(other.lovelace);
        for (policy, assets) in &other.assets {
            let entry = self.assets.entry(*policy).or_default();
            for (name, q) in assets {
                let have = entry.entry(*name).or_default();
                *have = have.saturating_add(*q);
            }
        }
        self.prune();
    }
}

impl Add for Value {
    type Output = Self;

    fn add(mut self, other: Self) -> Self::Output {
        self += &other;
        self
    }
}

impl From<Lovelace> for Value {
    fn from(lovelace: Lovelace) -> Self {
        Value::from_lovelace(lovelace)
    }
}

pub(crate) fn encode_multiasset<W: minicbor::encode::Write, Q: minicbor::Encode<()>>(
    assets: &BTreeMap<PolicyId, BTreeMap<AssetName, Q>>,
    e: &mut minicbor::Encoder<W>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    e.map(assets.len() as u64)?;
    for (policy, names) in assets {
        e.encode(policy)?;
        e.map(names.len() as u64)?;
        for (name, q) in names {
            e.encode(name)?.encode(q)?;
        }
    }
    Ok(())
}

/// Value encodes as a bare coin when it has no assets, otherwise as
/// `[coin, multiasset]`
impl minicbor::Encode<()> for Value {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if self.has_assets() {
            e.array(2)?.u64(self.lovelace)?;
            encode_multiasset(&self.assets, e)
        } else {
            e.u64(self.lovelace)?.ok()
        }
    }
}

impl<'b> minicbor::Decode<'b, ()> for Value {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut ()) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            minicbor::data::Type::Array | minicbor::data::Type::ArrayIndef => {
                d.array()?;
                let lovelace = d.u64()?;
                let assets: MultiAsset = d.decode_with(ctx)?;
                Ok(Value::new(lovelace, assets))
            }
            _ => Ok(Value::from_lovelace(d.u64()?)),
        }
    }
}
