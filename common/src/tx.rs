//! The Conway transaction envelope: body, witness set and auxiliary data

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    address::StakeAddress,
    asset::{encode_multiasset, Mint},
    cbor::{to_vec, try_to_vec},
    certificate::TxCertificate,
    crypto::keyhash_256,
    governance::{ProposalProcedure, VotingProcedures},
    metadata::{AuxiliaryData, AuxiliaryDataHash},
    plutus_data::PlutusData,
    script::{NativeScript, Redeemer, ScriptIntegrityHash},
    utxo::TransactionOutput,
    KeyHash, Lovelace, NetworkId, Slot, TxHash, UTxOIdentifier,
};

/// A verification key witness.
///
/// The builder never signs; it fills these with zeroed placeholders of the
/// right width so size based fees account for the signatures to come.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VKeyWitness {
    pub vkey: Vec<u8>,
    pub signature: Vec<u8>,
}

impl VKeyWitness {
    pub const VKEY_LEN: usize = 32;
    pub const SIGNATURE_LEN: usize = 64;

    pub fn placeholder(seed: usize) -> Self {
        // Distinct keys keep the witnesses distinct as a set
        let mut vkey = vec![0u8; Self::VKEY_LEN];
        vkey[..8].copy_from_slice(&(seed as u64).to_be_bytes());
        Self {
            vkey,
            signature: vec![0u8; Self::SIGNATURE_LEN],
        }
    }
}

impl<C> minicbor::Encode<C> for VKeyWitness {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.bytes(&self.vkey)?.bytes(&self.signature)?.ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionBody {
    pub inputs: BTreeSet<UTxOIdentifier>,
    pub outputs: Vec<TransactionOutput>,
    pub fee: Lovelace,
    /// Upper validity bound (`invalid_hereafter`)
    pub ttl: Option<Slot>,
    pub certificates: Vec<TxCertificate>,
    pub withdrawals: BTreeMap<StakeAddress, Lovelace>,
    pub auxiliary_data_hash: Option<AuxiliaryDataHash>,
    /// Lower validity bound (`invalid_before`)
    pub validity_start: Option<Slot>,
    pub mint: Mint,
    pub script_data_hash: Option<ScriptIntegrityHash>,
    pub collateral: BTreeSet<UTxOIdentifier>,
    pub required_signers: BTreeSet<KeyHash>,
    pub network_id: Option<NetworkId>,
    pub collateral_return: Option<TransactionOutput>,
    pub total_collateral: Option<Lovelace>,
    pub reference_inputs: BTreeSet<UTxOIdentifier>,
    pub voting_procedures: VotingProcedures,
    pub proposal_procedures: Vec<ProposalProcedure>,
}

impl TransactionBody {
    fn field_count(&self) -> u64 {
        [
            true,
            true,
            true,
            self.ttl.is_some(),
            !self.certificates.is_empty(),
            !self.withdrawals.is_empty(),
            self.auxiliary_data_hash.is_some(),
            self.validity_start.is_some(),
            !self.mint.is_empty(),
            self.script_data_hash.is_some(),
            !self.collateral.is_empty(),
            !self.required_signers.is_empty(),
            self.network_id.is_some(),
            self.collateral_return.is_some(),
            self.total_collateral.is_some(),
            !self.reference_inputs.is_empty(),
            !self.voting_procedures.is_empty(),
            !self.proposal_procedures.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count() as u64
    }
}

fn encode_inputs<W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    inputs: &BTreeSet<UTxOIdentifier>,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    e.array(inputs.len() as u64)?;
    for input in inputs {
        e.encode(input)?;
    }
    Ok(())
}

/// Body keys are written in ascending order and absent fields are omitted
impl minicbor::Encode<()> for TransactionBody {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(self.field_count())?;

        e.u8(0)?;
        encode_inputs(e, &self.inputs)?;

        e.u8(1)?.array(self.outputs.len() as u64)?;
        for output in &self.outputs {
            e.encode(output)?;
        }

        e.u8(2)?.u64(self.fee)?;

        if let Some(ttl) = self.ttl {
            e.u8(3)?.u64(ttl)?;
        }

        if !self.certificates.is_empty() {
            e.u8(4)?.array(self.certificates.len() as u64)?;
            for cert in &self.certificates {
                e.encode(cert)?;
            }
        }

        if !self.withdrawals.is_empty() {
            e.u8(5)?.map(self.withdrawals.len() as u64)?;
            for (account, amount) in &self.withdrawals {
                e.encode(account)?.u64(*amount)?;
            }
        }

        if let Some(hash) = &self.auxiliary_data_hash {
            e.u8(7)?.encode(hash)?;
        }

        if let Some(start) = self.validity_start {
            e.u8(8)?.u64(start)?;
        }

        if !self.mint.is_empty() {
            e.u8(9)?;
            encode_multiasset(&self.mint, e)?;
        }

        if let Some(hash) = &self.script_data_hash {
            e.u8(11)?.encode(hash)?;
        }

        if !self.collateral.is_empty() {
            e.u8(13)?;
            encode_inputs(e, &self.collateral)?;
        }

        if !self.required_signers.is_empty() {
            e.u8(14)?.array(self.required_signers.len() as u64)?;
            for signer in &self.required_signers {
                e.encode(signer)?;
            }
        }

        if let Some(network) = self.network_id {
            e.u8(15)?.u8(network.header_bits())?;
        }

        if let Some(output) = &self.collateral_return {
            e.u8(16)?.encode(output)?;
        }

        if let Some(total) = self.total_collateral {
            e.u8(17)?.u64(total)?;
        }

        if !self.reference_inputs.is_empty() {
            e.u8(18)?;
            encode_inputs(e, &self.reference_inputs)?;
        }

        if !self.voting_procedures.is_empty() {
            e.u8(19)?.map(self.voting_procedures.len() as u64)?;
            for (voter, votes) in &self.voting_procedures {
                e.encode(voter)?.map(votes.len() as u64)?;
                for (action, procedure) in votes {
                    e.encode(action)?.encode(procedure)?;
                }
            }
        }

        if !self.proposal_procedures.is_empty() {
            e.u8(20)?.array(self.proposal_procedures.len() as u64)?;
            for proposal in &self.proposal_procedures {
                e.encode(proposal)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<VKeyWitness>,
    pub native_scripts: Vec<NativeScript>,
    pub plutus_v1_scripts: Vec<Vec<u8>>,
    pub plutus_data: Vec<PlutusData>,
    pub redeemers: Vec<Redeemer>,
    pub plutus_v2_scripts: Vec<Vec<u8>>,
    pub plutus_v3_scripts: Vec<Vec<u8>>,
}

impl WitnessSet {
    fn field_count(&self) -> u64 {
        [
            !self.vkey_witnesses.is_empty(),
            !self.native_scripts.is_empty(),
            !self.plutus_v1_scripts.is_empty(),
            !self.plutus_data.is_empty(),
            !self.redeemers.is_empty(),
            !self.plutus_v2_scripts.is_empty(),
            !self.plutus_v3_scripts.is_empty(),
        ]
        .iter()
        .filter(|present| **present)
        .count() as u64
    }
}

/// Redeemers in the Conway map form, `{ [tag, index] => [data, ex_units] }`,
/// ordered by pointer
pub fn encode_redeemers<W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    redeemers: &[Redeemer],
) -> Result<(), minicbor::encode::Error<W::Error>> {
    let mut ordered: Vec<&Redeemer> = redeemers.iter().collect();
    ordered.sort_by_key(|r| r.redeemer_pointer());
    e.map(ordered.len() as u64)?;
    for redeemer in ordered {
        e.array(2)?.encode(redeemer.tag)?.u32(redeemer.index)?;
        e.array(2)?.encode(&redeemer.data)?.encode(redeemer.ex_units)?;
    }
    Ok(())
}

fn encode_script_bytes<W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    key: u8,
    scripts: &[Vec<u8>],
) -> Result<(), minicbor::encode::Error<W::Error>> {
    if !scripts.is_empty() {
        e.u8(key)?.array(scripts.len() as u64)?;
        for script in scripts {
            e.bytes(script)?;
        }
    }
    Ok(())
}

fn encode_datums<W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    datums: &[PlutusData],
) -> Result<(), minicbor::encode::Error<W::Error>> {
    e.array(datums.len() as u64)?;
    for datum in datums {
        e.encode(datum)?;
    }
    Ok(())
}

impl minicbor::Encode<()> for WitnessSet {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(self.field_count())?;
        if !self.vkey_witnesses.is_empty() {
            e.u8(0)?.array(self.vkey_witnesses.len() as u64)?;
            for witness in &self.vkey_witnesses {
                e.encode(witness)?;
            }
        }
        if !self.native_scripts.is_empty() {
            e.u8(1)?.array(self.native_scripts.len() as u64)?;
            for script in &self.native_scripts {
                e.encode(script)?;
            }
        }
        encode_script_bytes(e, 3, &self.plutus_v1_scripts)?;
        if !self.plutus_data.is_empty() {
            e.u8(4)?;
            encode_datums(e, &self.plutus_data)?;
        }
        if !self.redeemers.is_empty() {
            e.u8(5)?;
            encode_redeemers(e, &self.redeemers)?;
        }
        encode_script_bytes(e, 6, &self.plutus_v2_scripts)?;
        encode_script_bytes(e, 7, &self.plutus_v3_scripts)?;
        Ok(())
    }
}

/// Hash committing the body to the witnesses' redeemers, datums and the
/// cost models of the languages being run.
///
/// `language_views` is the already encoded view map. With datums but no
/// redeemers the ledger expects an empty redeemer map and an empty view map.
pub fn script_data_hash(
    redeemers: &[Redeemer],
    datums: &[PlutusData],
    language_views: &[u8],
) -> Result<ScriptIntegrityHash, String> {
    let mut preimage = Vec::new();
    let mut e = minicbor::Encoder::new(&mut preimage);
    encode_redeemers(&mut e, redeemers).map_err(|err| err.to_string())?;
    if !datums.is_empty() {
        encode_datums(&mut e, datums).map_err(|err| err.to_string())?;
    }
    if redeemers.is_empty() {
        preimage.push(0xa0);
    } else {
        preimage.extend_from_slice(language_views);
    }
    Ok(keyhash_256(&preimage))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub body: TransactionBody,
    pub witness_set: WitnessSet,
    pub is_valid: bool,
    pub auxiliary_data: Option<AuxiliaryData>,
}

impl Transaction {
    pub fn new(body: TransactionBody, witness_set: WitnessSet) -> Self {
        Self {
            body,
            witness_set,
            is_valid: true,
            auxiliary_data: None,
        }
    }

    /// Transaction id, the hash of the encoded body
    pub fn id(&self) -> TxHash {
        keyhash_256(&to_vec(&self.body))
    }

    pub fn to_cbor(&self) -> Vec<u8> {
        to_vec(self)
    }

    pub fn try_to_cbor(&self) -> Result<Vec<u8>, String> {
        try_to_vec(self)
    }

    pub fn size(&self) -> usize {
        self.to_cbor().len()
    }
}

impl minicbor::Encode<()> for Transaction {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(4)?.encode(&self.body)?.encode(&self.witness_set)?.bool(self.is_valid)?;
        match &self.auxiliary_data {
            Some(aux) => e.encode(aux)?,
            None => e.null()?,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;
    use crate::script::RedeemerTag;
    use crate::ExUnits;

    #[test]
    fn empty_transaction_layout() {
        let tx = Transaction::new(TransactionBody::default(), WitnessSet::default());
        assert_eq!(
            tx.to_cbor(),
            vec![0x84, 0xa3, 0x00, 0x80, 0x01, 0x80, 0x02, 0x00, 0xa0, 0xf5, 0xf6]
        );
    }

    #[test]
    fn id_covers_only_the_body() {
        let mut tx = Transaction::new(TransactionBody::default(), WitnessSet::default());
        let id = tx.id();
        tx.witness_set.vkey_witnesses.push(VKeyWitness::placeholder(0));
        assert_eq!(tx.id(), id);
        tx.body.fee = 1;
        assert_ne!(tx.id(), id);
    }

    #[test]
    fn redeemers_are_ordered_by_pointer() {
        let redeemer = |tag, index| Redeemer {
            tag,
            index,
            data: PlutusData::Integer(0),
            ex_units: ExUnits::default(),
        };
        let witnesses = WitnessSet {
            redeemers: vec![redeemer(RedeemerTag::Mint, 0), redeemer(RedeemerTag::Spend, 1)],
            ..Default::default()
        };
        let bytes = to_vec(&witnesses);
        // map(1) { 5: map(2) { [0, 1]: ...
        assert_eq!(&bytes[..6], &[0xa1, 0x05, 0xa2, 0x82, 0x00, 0x01]);
    }

    #[test]
    fn datum_only_script_data_hash() {
        let datums = vec![PlutusData::unit()];
        let mut preimage = vec![0xa0];
        preimage.extend(to_vec(&vec![PlutusData::unit()]));
        preimage.push(0xa0);
        assert_eq!(script_data_hash(&[], &datums, &[0xa1]).unwrap(), keyhash_256(&preimage));
    }

    #[test]
    fn redeemer_script_data_hash_ends_with_language_views() {
        let redeemers = vec![Redeemer {
            tag: RedeemerTag::Spend,
            index: 0,
            data: PlutusData::unit(),
            ex_units: ExUnits::new(1, 2),
        }];
        let views = [0xa1, 0x02, 0x80];
        let mut preimage = Vec::new();
        encode_redeemers(&mut minicbor::Encoder::new(&mut preimage), &redeemers).unwrap();
        preimage.extend_from_slice(&views);
        assert_eq!(script_data_hash(&redeemers, &[], &views).unwrap(), keyhash_256(&preimage));
    }

    #[test]
    fn placeholder_witnesses_are_distinct() {
        assert_ne!(VKeyWitness::placeholder(1), VKeyWitness::placeholder(2));
        let signers: BTreeSet<KeyHash> = [Hash::new([1; 28])].into();
        let body = TransactionBody {
            required_signers: signers,
            ..Default::default()
        };
        assert_eq!(to_vec(&body)[0], 0xa4);
    }
}
