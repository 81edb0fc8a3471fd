//! Transaction outputs and resolved UTxOs

use crate::address::Address;
use crate::asset::Value;
use crate::cbor::to_vec;
use crate::script::{Datum, Script};
use crate::types::{ScriptHash, UTxOIdentifier};
use minicbor::data::Tag;

/// CBOR tag for embedded CBOR (`#6.24`)
const ENCODED_CBOR: u64 = 24;

/// An output, as created by a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutput {
    pub address: Address,
    pub value: Value,
    pub datum: Option<Datum>,
    pub script_ref: Option<Script>,
}

impl TransactionOutput {
    pub fn new(address: Address, value: Value) -> Self {
        Self {
            address,
            value,
            datum: None,
            script_ref: None,
        }
    }

    pub fn with_datum(mut self, datum: Datum) -> Self {
        self.datum = Some(datum);
        self
    }

    pub fn with_script_ref(mut self, script: Script) -> Self {
        self.script_ref = Some(script);
        self
    }

    /// Script guarding this output, if its payment part is a script
    pub fn payment_script_hash(&self) -> Option<ScriptHash> {
        self.address.payment_script_hash()
    }

    /// Serialized size, as used for the minimum lovelace rule
    pub fn encoded_size(&self) -> usize {
        to_vec(self).len()
    }
}

/// Outputs are always written in the post-Alonzo map form
impl minicbor::Encode<()> for TransactionOutput {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut (),
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let fields = 2 + self.datum.is_some() as u64 + self.script_ref.is_some() as u64;
        e.map(fields)?;
        e.u8(0)?.bytes(&self.address.to_bytes())?;
        e.u8(1)?.encode_with(&self.value, ctx)?;
        match &self.datum {
            Some(Datum::Hash(hash)) => {
                e.u8(2)?.array(2)?.u8(0)?.encode(hash)?;
            }
            Some(Datum::Inline(data)) => {
                e.u8(2)?.array(2)?.u8(1)?.tag(Tag::new(ENCODED_CBOR))?.bytes(&data.to_cbor())?;
            }
            None => {}
        }
        if let Some(script) = &self.script_ref {
            e.u8(3)?.tag(Tag::new(ENCODED_CBOR))?.bytes(&script.to_cbor())?;
        }
        Ok(())
    }
}

/// A spendable output together with the input that references it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub input: UTxOIdentifier,
    pub output: TransactionOutput,
}

impl Utxo {
    pub fn new(input: UTxOIdentifier, output: TransactionOutput) -> Self {
        Self { input, output }
    }

    pub fn value(&self) -> &Value {
        &self.output.value
    }

    pub fn script_ref(&self) -> Option<&Script> {
        self.output.script_ref.as_ref()
    }

    /// True when the output sits at a key address and holds only lovelace,
    /// which makes it usable as collateral without a return output
    pub fn is_pure_ada_key_output(&self) -> bool {
        !self.output.address.is_script() && !self.output.value.has_assets()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plutus_data::PlutusData;

    fn address() -> Address {
        Address::from_string(
            "addr1qx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3n0d3vllmyqwsx5wktcd8cc3sq835lu7drv2xwl2wywfgse35a3x",
        )
        .unwrap()
    }

    #[test]
    fn plain_output_has_two_fields() {
        let output = TransactionOutput::new(address(), Value::from_lovelace(1_000_000));
        let bytes = to_vec(&output);
        assert_eq!(&bytes[..3], &[0xa2, 0x00, 0x58]);
    }

    #[test]
    fn inline_datum_is_embedded_cbor() {
        let output = TransactionOutput::new(address(), Value::from_lovelace(1))
            .with_datum(Datum::Inline(PlutusData::unit()));
        let bytes = to_vec(&output);
        assert_eq!(bytes[0], 0xa3);
        assert!(bytes.ends_with(&[0x02, 0x82, 0x01, 0xd8, 0x18, 0x43, 0xd8, 0x79, 0x80]));
    }
}
