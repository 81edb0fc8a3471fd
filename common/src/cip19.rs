//! Variable length naturals used by pointer addresses (CIP-19)
use anyhow::{anyhow, Result};

// Each byte carries 7 bits, most significant group first; the high bit is
// set on every byte except the last.

#[derive(Default)]
pub struct VarIntEncoder {
    data: Vec<u8>,
}

impl VarIntEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, num: u64) {
        let mut groups = Vec::with_capacity(10);
        let mut rest = num;
        groups.push((rest & 0x7f) as u8);
        rest >>= 7;
        while rest != 0 {
            groups.push((rest & 0x7f) as u8 | 0x80);
            rest >>= 7;
        }
        self.data.extend(groups.iter().rev());
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.data
    }
}

pub struct VarIntDecoder<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> VarIntDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        VarIntDecoder { data, position: 0 }
    }

    pub fn read(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        while let Some(byte) = self.data.get(self.position) {
            self.position += 1;
            value = value
                .checked_mul(128)
                .ok_or_else(|| anyhow!("Variable integer overflows 64 bits"))?
                | (byte & 0x7f) as u64;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(anyhow!("Variable integer ran out of data"))
    }

    pub fn is_finished(&self) -> bool {
        self.position == self.data.len()
    }
}
