//! Blake2b helpers used for key, script and body hashing

use crate::hash::Hash;
use blake2::{
    digest::consts::{U28, U32},
    Blake2b, Digest,
};

/// Blake2b-224, the width of key hashes and script hashes
pub fn keyhash_224(data: &[u8]) -> Hash<28> {
    let mut hasher = Blake2b::<U28>::new();
    hasher.update(data);
    Hash::new(hasher.finalize().into())
}

/// Blake2b-224 over a one byte tag followed by the data (script hashing)
pub fn keyhash_224_tagged(tag: u8, data: &[u8]) -> Hash<28> {
    let mut hasher = Blake2b::<U28>::new();
    hasher.update([tag]);
    hasher.update(data);
    Hash::new(hasher.finalize().into())
}

/// Blake2b-256, used for transaction ids, datum and auxiliary data hashes
pub fn keyhash_256(data: &[u8]) -> Hash<32> {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    Hash::new(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_digests() {
        assert_eq!(
            keyhash_256(&[]).to_string(),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
        assert_eq!(
            keyhash_224(&[]).to_string(),
            "836cc68931c2e4e3e838602eca1902591d216837bafddfe6f0c8cb07"
        );
    }

    #[test]
    fn tag_prefixes_the_data() {
        assert_eq!(keyhash_224_tagged(3, &[1, 2]), keyhash_224(&[3, 1, 2]));
    }
}
