//! Cardano address definitions (CIP-19)

use crate::cip19::{VarIntDecoder, VarIntEncoder};
use crate::serialization::{decode_bech32, encode_bech32, Bech32Error};
use crate::types::{Credential, KeyHash, NetworkId, ScriptHash, StakeCredential};
use serde_with::{hex::Hex, serde_as};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error(transparent)]
    Bech32(#[from] Bech32Error),

    #[error("not a base58 or bech32 address")]
    Unrecognised,

    #[error("empty address data")]
    Empty,

    #[error("unknown header byte {0:#04x}")]
    InvalidHeader(u8),

    #[error("bad address length {0}")]
    InvalidLength(usize),

    #[error("bad pointer: {0}")]
    InvalidPointer(String),

    #[error("prefix {0} does not match the address header")]
    PrefixMismatch(String),
}

impl AddressError {
    /// True when the text could not be decoded at all
    pub fn is_malformed(&self) -> bool {
        match self {
            AddressError::Bech32(e) => e.is_malformed(),
            AddressError::Unrecognised => true,
            _ => false,
        }
    }
}

/// A Byron-era address, kept as its raw CBOR payload
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ByronAddress {
    #[serde_as(as = "Hex")]
    pub payload: Vec<u8>,
}

/// A Shelley-era address - payment part
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShelleyAddressPaymentPart {
    PaymentKeyHash(KeyHash),
    ScriptHash(ScriptHash),
}

impl ShelleyAddressPaymentPart {
    pub fn to_credential(&self) -> Credential {
        match self {
            Self::PaymentKeyHash(hash) => Credential::AddrKeyHash(*hash),
            Self::ScriptHash(hash) => Credential::ScriptHash(*hash),
        }
    }
}

/// Delegation pointer
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShelleyAddressPointer {
    pub slot: u64,
    pub tx_index: u64,
    pub cert_index: u64,
}

/// A Shelley-era address - delegation part
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShelleyAddressDelegationPart {
    /// Enterprise address
    #[default]
    None,
    StakeKeyHash(KeyHash),
    ScriptHash(ScriptHash),
    Pointer(ShelleyAddressPointer),
}

/// A Shelley-era address
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ShelleyAddress {
    pub network: NetworkId,
    pub payment: ShelleyAddressPaymentPart,
    pub delegation: ShelleyAddressDelegationPart,
}

impl ShelleyAddress {
    pub fn to_bytes(&self) -> Vec<u8> {
        let (payment_hash, payment_bits) = match &self.payment {
            ShelleyAddressPaymentPart::PaymentKeyHash(hash) => (hash, 0u8),
            ShelleyAddressPaymentPart::ScriptHash(hash) => (hash, 1u8),
        };

        let (delegation, delegation_bits) = match &self.delegation {
            ShelleyAddressDelegationPart::StakeKeyHash(hash) => (hash.to_vec(), 0u8),
            ShelleyAddressDelegationPart::ScriptHash(hash) => (hash.to_vec(), 1u8),
            ShelleyAddressDelegationPart::Pointer(pointer) => {
                let mut encoder = VarIntEncoder::new();
                encoder.push(pointer.slot);
                encoder.push(pointer.tx_index);
                encoder.push(pointer.cert_index);
                (encoder.to_vec(), 2u8)
            }
            ShelleyAddressDelegationPart::None => (Vec::new(), 3u8),
        };

        let header =
            self.network.header_bits() | ((payment_bits | (delegation_bits << 1)) << 4);
        let mut data = Vec::with_capacity(57);
        data.push(header);
        data.extend_from_slice(payment_hash.as_ref());
        data.extend(delegation);
        data
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, AddressError> {
        let header = *data.first().ok_or(AddressError::Empty)?;
        let kind = header >> 4;
        if kind > 7 {
            return Err(AddressError::InvalidHeader(header));
        }
        if data.len() < 29 {
            return Err(AddressError::InvalidLength(data.len()));
        }

        let payment_hash = hash28(&data[1..29])?;
        let payment = match kind & 0x01 {
            0 => ShelleyAddressPaymentPart::PaymentKeyHash(payment_hash),
            _ => ShelleyAddressPaymentPart::ScriptHash(payment_hash),
        };

        let rest = &data[29..];
        let delegation = match kind >> 1 {
            0 | 1 => {
                if rest.len() != 28 {
                    return Err(AddressError::InvalidLength(data.len()));
                }
                let hash = hash28(rest)?;
                if kind >> 1 == 0 {
                    ShelleyAddressDelegationPart::StakeKeyHash(hash)
                } else {
                    ShelleyAddressDelegationPart::ScriptHash(hash)
                }
            }
            2 => {
                let mut decoder = VarIntDecoder::new(rest);
                let mut next =
                    || decoder.read().map_err(|e| AddressError::InvalidPointer(e.to_string()));
                let pointer = ShelleyAddressPointer {
                    slot: next()?,
                    tx_index: next()?,
                    cert_index: next()?,
                };
                ShelleyAddressDelegationPart::Pointer(pointer)
            }
            _ => {
                if !rest.is_empty() {
                    return Err(AddressError::InvalidLength(data.len()));
                }
                ShelleyAddressDelegationPart::None
            }
        };

        Ok(ShelleyAddress {
            network: NetworkId::from_header_bits(header),
            payment,
            delegation,
        })
    }

    pub fn hrp(&self) -> &'static str {
        match self.network {
            NetworkId::Mainnet => "addr",
            NetworkId::Testnet => "addr_test",
        }
    }

    /// Read from `addr1...` / `addr_test1...` form
    pub fn from_string(text: &str) -> Result<Self, AddressError> {
        let (hrp, data) = decode_bech32(text)?;
        let address = Self::from_bytes(&data)?;
        if address.hrp() != hrp {
            return Err(AddressError::PrefixMismatch(hrp));
        }
        Ok(address)
    }

    pub fn to_string(&self) -> Result<String, AddressError> {
        Ok(encode_bech32(self.hrp(), &self.to_bytes())?)
    }

    pub fn payment_credential(&self) -> Credential {
        self.payment.to_credential()
    }

    pub fn stake_credential(&self) -> Option<StakeCredential> {
        match &self.delegation {
            ShelleyAddressDelegationPart::StakeKeyHash(hash) => Some(Credential::AddrKeyHash(*hash)),
            ShelleyAddressDelegationPart::ScriptHash(hash) => Some(Credential::ScriptHash(*hash)),
            _ => None,
        }
    }
}

/// A stake (reward) address.
///
/// Ordering follows the ledger's reward account ordering: network first,
/// then credential.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct StakeAddress {
    pub network: NetworkId,
    pub credential: StakeCredential,
}

impl StakeAddress {
    pub fn new(credential: StakeCredential, network: NetworkId) -> Self {
        StakeAddress {
            network,
            credential,
        }
    }

    pub fn hrp(&self) -> &'static str {
        match self.network {
            NetworkId::Mainnet => "stake",
            NetworkId::Testnet => "stake_test",
        }
    }

    /// Convert to string stake1xxx format
    pub fn to_string(&self) -> Result<String, AddressError> {
        Ok(encode_bech32(self.hrp(), &self.to_binary())?)
    }

    /// Read from a string format ("stake1xxx...")
    pub fn from_string(text: &str) -> Result<Self, AddressError> {
        let (hrp, data) = decode_bech32(text)?;
        let address = Self::from_binary(&data)?;
        if address.hrp() != hrp {
            return Err(AddressError::PrefixMismatch(hrp));
        }
        Ok(address)
    }

    /// Convert to binary format (29 bytes)
    pub fn to_binary(&self) -> Vec<u8> {
        let kind: u8 = match self.credential {
            Credential::AddrKeyHash(_) => 0b1110,
            Credential::ScriptHash(_) => 0b1111,
        };
        let mut data = Vec::with_capacity(29);
        data.push(self.network.header_bits() | (kind << 4));
        data.extend_from_slice(self.credential.hash().as_ref());
        data
    }

    /// Read from binary format (29 bytes)
    pub fn from_binary(data: &[u8]) -> Result<Self, AddressError> {
        let header = *data.first().ok_or(AddressError::Empty)?;
        if data.len() != 29 {
            return Err(AddressError::InvalidLength(data.len()));
        }
        let hash = hash28(&data[1..])?;
        let credential = match header >> 4 {
            0b1110 => Credential::AddrKeyHash(hash),
            0b1111 => Credential::ScriptHash(hash),
            _ => return Err(AddressError::InvalidHeader(header)),
        };
        Ok(StakeAddress {
            network: NetworkId::from_header_bits(header),
            credential,
        })
    }
}

impl Display for StakeAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.to_string() {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str(&hex::encode(self.to_binary())),
        }
    }
}

impl<C> minicbor::Encode<C> for StakeAddress {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.to_binary())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for StakeAddress {
    fn decode(d: &mut minicbor::Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let bytes = d.bytes()?;
        Self::from_binary(bytes)
            .map_err(|e| minicbor::decode::Error::message(format!("invalid stake address: {e}")))
    }
}

/// A Cardano address
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Address {
    #[default]
    None,
    Byron(ByronAddress),
    Shelley(ShelleyAddress),
    Stake(StakeAddress),
}

impl Address {
    /// Read from any textual form: bech32 Shelley and stake addresses or
    /// base58 Byron addresses
    pub fn from_string(text: &str) -> Result<Self, AddressError> {
        if text.starts_with("addr") {
            Ok(Self::Shelley(ShelleyAddress::from_string(text)?))
        } else if text.starts_with("stake") {
            Ok(Self::Stake(StakeAddress::from_string(text)?))
        } else {
            let bytes = bs58::decode(text).into_vec().map_err(|_| AddressError::Unrecognised)?;
            match bytes.first() {
                Some(0x82) => Ok(Self::Byron(ByronAddress { payload: bytes })),
                Some(header) => Err(AddressError::InvalidHeader(*header)),
                None => Err(AddressError::Empty),
            }
        }
    }

    pub fn to_string(&self) -> Result<String, AddressError> {
        match self {
            Self::None => Err(AddressError::Empty),
            Self::Byron(byron) => Ok(bs58::encode(&byron.payload).into_string()),
            Self::Shelley(shelley) => shelley.to_string(),
            Self::Stake(stake) => stake.to_string(),
        }
    }

    /// Raw bytes as they appear inside a transaction output
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::None => Vec::new(),
            Self::Byron(byron) => byron.payload.clone(),
            Self::Shelley(shelley) => shelley.to_bytes(),
            Self::Stake(stake) => stake.to_binary(),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, AddressError> {
        let header = *data.first().ok_or(AddressError::Empty)?;
        match header >> 4 {
            0..=7 => Ok(Self::Shelley(ShelleyAddress::from_bytes(data)?)),
            8 => Ok(Self::Byron(ByronAddress {
                payload: data.to_vec(),
            })),
            14 | 15 => Ok(Self::Stake(StakeAddress::from_binary(data)?)),
            _ => Err(AddressError::InvalidHeader(header)),
        }
    }

    pub fn payment_credential(&self) -> Option<Credential> {
        match self {
            Self::Shelley(shelley) => Some(shelley.payment_credential()),
            _ => None,
        }
    }

    /// Script hash guarding outputs at this address, if any
    pub fn payment_script_hash(&self) -> Option<ScriptHash> {
        self.payment_credential().and_then(|c| c.script_hash())
    }

    pub fn is_script(&self) -> bool {
        self.payment_script_hash().is_some()
    }

    pub fn network(&self) -> Option<NetworkId> {
        match self {
            Self::Shelley(shelley) => Some(shelley.network),
            Self::Stake(stake) => Some(stake.network),
            _ => None,
        }
    }
}

impl<C> minicbor::Encode<C> for Address {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.to_bytes())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Address {
    fn decode(d: &mut minicbor::Decoder<'b>, _ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let bytes = d.bytes()?;
        Self::from_bytes(bytes)
            .map_err(|e| minicbor::decode::Error::message(format!("invalid address: {e}")))
    }
}

fn hash28(bytes: &[u8]) -> Result<crate::hash::Hash<28>, AddressError> {
    crate::hash::Hash::try_from(bytes).map_err(|_| AddressError::InvalidLength(bytes.len()))
}
