//! Errors raised while building a transaction

use portico_common::{
    metadata::MetadataError, serialization::Bech32Error, AddressError, RedeemerPointer,
    ScriptHash, UTxOIdentifier,
};
use thiserror::Error;

/// Coarse classification of a builder failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required argument or precondition is missing
    PointerIsNull,
    InvalidAddressFormat,
    Decoding,
    InvalidArgument,
    BalanceInsufficient,
    IllegalState,
    Evaluation,
    Encoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxBuilderError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("script {0} is not attached or referenced")]
    MissingScript(ScriptHash),

    #[error("no redeemer for script purpose {0:?}")]
    MissingRedeemer(RedeemerPointer),

    #[error("no datum for script locked input {0}")]
    MissingDatum(UTxOIdentifier),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Cannot decode {what}: {reason}")]
    Decoding { what: &'static str, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient balance: {0}")]
    BalanceInsufficient(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl TxBuilderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Missing(_)
            | Self::MissingScript(_)
            | Self::MissingRedeemer(_)
            | Self::MissingDatum(_) => ErrorKind::PointerIsNull,
            Self::InvalidAddress(_) => ErrorKind::InvalidAddressFormat,
            Self::Decoding { .. } => ErrorKind::Decoding,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::BalanceInsufficient(_) => ErrorKind::BalanceInsufficient,
            Self::IllegalState(_) => ErrorKind::IllegalState,
            Self::Evaluation(_) => ErrorKind::Evaluation,
            Self::Encoding(_) => ErrorKind::Encoding,
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    pub fn decoding(what: &'static str, reason: impl ToString) -> Self {
        Self::Decoding {
            what,
            reason: reason.to_string(),
        }
    }

    /// Hex arguments are a decoding problem whatever the cause
    pub fn from_hex(what: &'static str, err: hex::FromHexError) -> Self {
        Self::decoding(what, err)
    }

    /// Malformed bech32 is a decoding error; a well formed id with the wrong
    /// prefix or payload is an invalid argument
    pub fn from_bech32(what: &'static str, err: Bech32Error) -> Self {
        if err.is_malformed() {
            Self::decoding(what, err)
        } else {
            Self::InvalidArgument(format!("{what}: {err}"))
        }
    }
}

impl From<AddressError> for TxBuilderError {
    fn from(err: AddressError) -> Self {
        if err.is_malformed() {
            Self::decoding("address", err)
        } else {
            Self::InvalidAddress(err.to_string())
        }
    }
}

impl From<MetadataError> for TxBuilderError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Json(e) => Self::decoding("metadata json", e),
            other => Self::InvalidArgument(other.to_string()),
        }
    }
}
