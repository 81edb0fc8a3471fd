//! Small CBOR helpers shared by the encoders in this crate

use minicbor::encode::{Error, Write};
use minicbor::Encoder;

/// Byte strings longer than this are split into indefinite-length chunks
/// inside Plutus data
pub const BOUNDED_BYTES_CHUNK: usize = 64;

/// Encode into a fresh buffer.
///
/// Writing into a `Vec` cannot fail. The only encoder raising its own error
/// is an out of range metadata integer, which leaves the buffer empty; use
/// [`try_to_vec`] where that must be reported.
pub fn to_vec<T: minicbor::Encode<()>>(value: T) -> Vec<u8> {
    let mut buffer = Vec::new();
    if minicbor::encode(value, &mut buffer).is_err() {
        buffer.clear();
    }
    buffer
}

pub fn try_to_vec<T: minicbor::Encode<()>>(value: T) -> Result<Vec<u8>, String> {
    minicbor::to_vec(value).map_err(|e| e.to_string())
}

/// Encode a Plutus bounded byte string, chunking past 64 bytes
pub fn encode_bounded_bytes<W: Write>(
    e: &mut Encoder<W>,
    bytes: &[u8],
) -> Result<(), Error<W::Error>> {
    if bytes.len() <= BOUNDED_BYTES_CHUNK {
        e.bytes(bytes)?;
    } else {
        e.begin_bytes()?;
        for chunk in bytes.chunks(BOUNDED_BYTES_CHUNK) {
            e.bytes(chunk)?;
        }
        e.end()?;
    }
    Ok(())
}

/// Read a byte string that may be definite or chunked
pub fn decode_bytes(d: &mut minicbor::Decoder<'_>) -> Result<Vec<u8>, minicbor::decode::Error> {
    match d.datatype()? {
        minicbor::data::Type::BytesIndef => {
            let mut out = Vec::new();
            for chunk in d.bytes_iter()? {
                out.extend_from_slice(chunk?);
            }
            Ok(out)
        }
        _ => Ok(d.bytes()?.to_vec()),
    }
}
