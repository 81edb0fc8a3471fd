//! DRep (Delegated Representative) types and structures

use crate::serialization::{decode_bech32, encode_bech32, Bech32Error};
use crate::types::{Credential, DataHash, KeyHash, Lovelace, ScriptHash};

pub type DRepCredential = Credential;

/// CIP-129 header bytes for DRep identifiers
const CIP129_DREP_KEY: u8 = 0x22;
const CIP129_DREP_SCRIPT: u8 = 0x23;

/// Anchor - verifiable link on-chain identifiers with off-chain content,
/// typically metadata that describes a DRep's identity, platform, or governance
/// philosophy.
#[derive(Default, Debug, Clone, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Anchor {
    /// Metadata URL
    pub url: String,

    /// Metadata hash
    pub data_hash: DataHash,
}

impl Anchor {
    pub fn new(url: impl Into<String>, data_hash: DataHash) -> Self {
        Self {
            url: url.into(),
            data_hash,
        }
    }
}

impl<C> minicbor::Encode<C> for Anchor {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.str(&self.url)?.encode_with(self.data_hash, ctx)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Anchor {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;
        let url = d.str()?.to_string();
        let data_hash = d.decode_with(ctx)?;
        Ok(Self { url, data_hash })
    }
}

/// Encode an optional anchor as `anchor / null`
pub(crate) fn encode_optional_anchor<W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    anchor: &Option<Anchor>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    match anchor {
        Some(anchor) => e.encode(anchor)?,
        None => e.null()?,
    };
    Ok(())
}

/// DRepChoice (=CDDL drep, badly named)
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum DRepChoice {
    /// Address key
    Key(KeyHash),

    /// Script key
    Script(ScriptHash),

    /// Abstain
    Abstain,

    /// No confidence
    NoConfidence,
}

impl DRepChoice {
    /// Parse a DRep id in either CIP-129 or legacy CIP-105 form
    pub fn from_bech32(text: &str) -> Result<Self, Bech32Error> {
        Ok(match drep_credential_from_bech32(text)? {
            Credential::AddrKeyHash(hash) => DRepChoice::Key(hash),
            Credential::ScriptHash(hash) => DRepChoice::Script(hash),
        })
    }
}

impl From<DRepCredential> for DRepChoice {
    fn from(credential: DRepCredential) -> Self {
        match credential {
            Credential::AddrKeyHash(hash) => DRepChoice::Key(hash),
            Credential::ScriptHash(hash) => DRepChoice::Script(hash),
        }
    }
}

impl<C> minicbor::Encode<C> for DRepChoice {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            DRepChoice::Key(hash) => e.array(2)?.u8(0)?.encode_with(hash, ctx)?,
            DRepChoice::Script(hash) => e.array(2)?.u8(1)?.encode_with(hash, ctx)?,
            DRepChoice::Abstain => e.array(1)?.u8(2)?,
            DRepChoice::NoConfidence => e.array(1)?.u8(3)?,
        };
        Ok(())
    }
}

/// Decode a DRep credential from its bech32 id.
///
/// CIP-129 ids carry a 29 byte payload under `drep` whose header selects
/// key or script. The older CIP-105 form carries a bare 28 byte hash under
/// `drep` (key) or `drep_script`.
pub fn drep_credential_from_bech32(text: &str) -> Result<DRepCredential, Bech32Error> {
    let (hrp, data) = decode_bech32(text)?;
    let hash = |bytes: &[u8]| -> Result<KeyHash, Bech32Error> {
        KeyHash::try_from(bytes).map_err(|_| Bech32Error::BadLength(bytes.len()))
    };
    match (hrp.as_str(), data.len()) {
        ("drep", 29) => match data[0] {
            CIP129_DREP_KEY => Ok(Credential::AddrKeyHash(hash(&data[1..])?)),
            CIP129_DREP_SCRIPT => Ok(Credential::ScriptHash(hash(&data[1..])?)),
            other => Err(Bech32Error::BadPayload(format!("unknown drep header {other:#04x}"))),
        },
        ("drep", 28) => Ok(Credential::AddrKeyHash(hash(&data)?)),
        ("drep_script", 28) => Ok(Credential::ScriptHash(hash(&data)?)),
        ("drep" | "drep_script", n) => Err(Bech32Error::BadLength(n)),
        (other, _) => Err(Bech32Error::WrongPrefix {
            expected: "drep".to_string(),
            found: other.to_string(),
        }),
    }
}

/// Encode a DRep credential as a CIP-129 id
pub fn drep_credential_to_bech32(credential: &DRepCredential) -> Result<String, Bech32Error> {
    let header = match credential {
        Credential::AddrKeyHash(_) => CIP129_DREP_KEY,
        Credential::ScriptHash(_) => CIP129_DREP_SCRIPT,
    };
    let mut data = Vec::with_capacity(29);
    data.push(header);
    data.extend_from_slice(credential.hash().as_ref());
    encode_bech32("drep", &data)
}

/// DRep Registration = reg_drep_cert
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DRepRegistration {
    /// DRep credential
    pub credential: DRepCredential,

    /// Deposit paid
    pub deposit: Lovelace,

    /// Optional anchor
    pub anchor: Option<Anchor>,
}

/// DRep Deregistration = unreg_drep_cert
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DRepDeregistration {
    /// DRep credential
    pub credential: DRepCredential,

    /// Deposit to refund
    pub refund: Lovelace,
}

/// DRep Update = update_drep_cert
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DRepUpdate {
    /// DRep credential
    pub credential: DRepCredential,

    /// Optional anchor
    pub anchor: Option<Anchor>,
}
