//! Bech32 helpers shared by addresses and identifiers

use bech32::{Bech32, Hrp};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Bech32Error {
    #[error("malformed bech32: {0}")]
    Decode(String),

    #[error("bad human readable part {0}")]
    Hrp(String),

    #[error("expected prefix {expected}, found {found}")]
    WrongPrefix { expected: String, found: String },

    #[error("unexpected payload length {0}")]
    BadLength(usize),

    #[error("unexpected payload: {0}")]
    BadPayload(String),
}

impl Bech32Error {
    /// True when the string itself is not valid bech32, as opposed to a well
    /// formed string carrying the wrong payload
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Hrp(_))
    }
}

pub trait Bech32Conversion: Sized {
    fn to_bech32(&self) -> Result<String, Bech32Error>;
    fn from_bech32(s: &str) -> Result<Self, Bech32Error>;
}

pub fn encode_bech32(hrp: &str, data: &[u8]) -> Result<String, Bech32Error> {
    let hrp = Hrp::parse(hrp).map_err(|e| Bech32Error::Hrp(e.to_string()))?;
    bech32::encode::<Bech32>(hrp, data).map_err(|e| Bech32Error::Decode(e.to_string()))
}

/// Decode any bech32 string, returning its prefix and payload
pub fn decode_bech32(text: &str) -> Result<(String, Vec<u8>), Bech32Error> {
    let (hrp, data) = bech32::decode(text).map_err(|e| Bech32Error::Decode(e.to_string()))?;
    Ok((hrp.as_str().to_string(), data))
}

pub fn decode_bech32_with_hrp(text: &str, expected: &str) -> Result<Vec<u8>, Bech32Error> {
    let (hrp, data) = decode_bech32(text)?;
    if hrp != expected {
        return Err(Bech32Error::WrongPrefix {
            expected: expected.to_string(),
            found: hrp,
        });
    }
    Ok(data)
}
