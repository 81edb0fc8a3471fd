use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, ops::Deref, str::FromStr};

/// Fixed-size digest of `BYTES` bytes.
///
/// Serialises as lowercase hex in JSON and as a CBOR byte string on the
/// wire. The common Cardano sizes are 28 bytes (key and script hashes) and
/// 32 bytes (transaction ids, datum hashes, auxiliary data hashes).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash<const BYTES: usize>([u8; BYTES]);

impl<const BYTES: usize> Default for Hash<BYTES> {
    fn default() -> Self {
        Self([0u8; BYTES])
    }
}

impl<const BYTES: usize> Hash<BYTES> {
    #[inline]
    pub const fn new(bytes: [u8; BYTES]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    #[inline]
    pub fn into_inner(self) -> [u8; BYTES] {
        self.0
    }
}

impl<const BYTES: usize> Serialize for Hash<BYTES> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de, const BYTES: usize> Deserialize<'de> for Hash<BYTES> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl<const BYTES: usize> From<[u8; BYTES]> for Hash<BYTES> {
    fn from(bytes: [u8; BYTES]) -> Self {
        Self(bytes)
    }
}

impl<const BYTES: usize> TryFrom<&[u8]> for Hash<BYTES> {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(value.try_into()?))
    }
}

impl<const BYTES: usize> TryFrom<Vec<u8>> for Hash<BYTES> {
    type Error = Vec<u8>;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(Self(value.try_into()?))
    }
}

impl<const BYTES: usize> From<Hash<BYTES>> for Vec<u8> {
    fn from(hash: Hash<BYTES>) -> Self {
        hash.0.to_vec()
    }
}

impl<const BYTES: usize> AsRef<[u8]> for Hash<BYTES> {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const BYTES: usize> Deref for Hash<BYTES> {
    type Target = [u8; BYTES];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const BYTES: usize> fmt::Debug for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(&format!("Hash<{BYTES}>")).field(&hex::encode(self.0)).finish()
    }
}

impl<const BYTES: usize> fmt::Display for Hash<BYTES> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl<const BYTES: usize> FromStr for Hash<BYTES> {
    type Err = hex::FromHexError;

    /// Parse from hex; the decoded length must be exactly `BYTES`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; BYTES];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl<C, const BYTES: usize> minicbor::Encode<C> for Hash<BYTES> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.0)?.ok()
    }
}

impl<'a, C, const BYTES: usize> minicbor::Decode<'a, C> for Hash<BYTES> {
    fn decode(
        d: &mut minicbor::Decoder<'a>,
        _ctx: &mut C,
    ) -> Result<Self, minicbor::decode::Error> {
        let bytes = d.bytes()?;
        Self::try_from(bytes).map_err(|_| {
            minicbor::decode::Error::message(format!(
                "expected {BYTES} byte hash, got {}",
                bytes.len()
            ))
        })
    }
}

/// Declares a distinct newtype over a hash with its own bech32 prefix.
///
/// Two identifiers of the same width (pool ids and DRep ids are both 28
/// bytes) need different human readable parts, so an alias is not enough.
#[macro_export]
macro_rules! declare_hash_newtype_with_bech32 {
    ($(#[$meta:meta])* $name:ident, $size:expr, $hrp:expr) => {
        $(#[$meta])*
        #[derive(
            Default,
            Debug,
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
        #[serde(transparent)]
        pub struct $name($crate::hash::Hash<$size>);

        impl $name {
            pub const fn new(hash: $crate::hash::Hash<$size>) -> Self {
                Self(hash)
            }

            pub fn into_inner(self) -> $crate::hash::Hash<$size> {
                self.0
            }
        }

        impl From<$crate::hash::Hash<$size>> for $name {
            fn from(hash: $crate::hash::Hash<$size>) -> Self {
                Self(hash)
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::hash::Hash<$size>;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = hex::FromHexError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl<C> minicbor::Encode<C> for $name {
            fn encode<W: minicbor::encode::Write>(
                &self,
                e: &mut minicbor::Encoder<W>,
                ctx: &mut C,
            ) -> Result<(), minicbor::encode::Error<W::Error>> {
                minicbor::Encode::encode(&self.0, e, ctx)
            }
        }

        impl<'a, C> minicbor::Decode<'a, C> for $name {
            fn decode(
                d: &mut minicbor::Decoder<'a>,
                ctx: &mut C,
            ) -> Result<Self, minicbor::decode::Error> {
                Ok(Self(minicbor::Decode::decode(d, ctx)?))
            }
        }

        impl $crate::serialization::Bech32Conversion for $name {
            fn to_bech32(&self) -> Result<String, $crate::serialization::Bech32Error> {
                $crate::serialization::encode_bech32($hrp, self.0.as_ref())
            }

            fn from_bech32(s: &str) -> Result<Self, $crate::serialization::Bech32Error> {
                let data = $crate::serialization::decode_bech32_with_hrp(s, $hrp)?;
                let len = data.len();
                $crate::hash::Hash::<$size>::try_from(data)
                    .map(Self)
                    .map_err(|_| $crate::serialization::Bech32Error::BadLength(len))
            }
        }
    };
}
