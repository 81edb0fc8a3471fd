//! Accumulated intents of a transaction under construction

use std::collections::{BTreeMap, BTreeSet};

use portico_common::{
    certificate::TxCertificate,
    governance::{ProposalProcedure, Voter, VotingProcedures},
    metadata::{AuxiliaryData, Metadata},
    protocol_params::ProtocolParams,
    Address, AssetName, DatumHash, KeyHash, Lovelace, Mint, NetworkId, PlutusData, PolicyId,
    Script, ScriptHash, Slot, StakeAddress, TransactionOutput, UTxOIdentifier, Utxo, Value,
};

use crate::error::TxBuilderError;

/// An input the caller asked to spend, with what it needs to unlock it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedInput {
    pub utxo: Utxo,
    pub redeemer: Option<PlutusData>,
    /// Datum for inputs locked by datum hash
    pub datum: Option<PlutusData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCertificate {
    pub certificate: TxCertificate,
    pub redeemer: Option<PlutusData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWithdrawal {
    pub amount: Lovelace,
    pub redeemer: Option<PlutusData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingProposal {
    pub procedure: ProposalProcedure,
    pub redeemer: Option<PlutusData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionDraft {
    pub outputs: Vec<TransactionOutput>,
    /// Floor applied to the computed fee
    pub minimum_fee: Option<Lovelace>,
    pub invalid_before: Option<Slot>,
    pub invalid_after: Option<Slot>,
    pub network_id: Option<NetworkId>,

    /// Certificates in insertion order, which is also their redeemer order
    pub certificates: Vec<PendingCertificate>,
    pub withdrawals: BTreeMap<StakeAddress, PendingWithdrawal>,
    pub mint: Mint,
    pub mint_redeemers: BTreeMap<PolicyId, PlutusData>,
    pub required_signers: BTreeSet<KeyHash>,
    /// Extra placeholder witnesses beyond the ones the builder can infer
    pub signer_padding: usize,
    pub votes: VotingProcedures,
    pub vote_redeemers: BTreeMap<Voter, PlutusData>,
    pub proposals: Vec<PendingProposal>,

    pub scripts: BTreeMap<ScriptHash, Script>,
    pub datums: BTreeMap<DatumHash, PlutusData>,
    pub metadata: Metadata,

    pub inputs: BTreeMap<UTxOIdentifier, PinnedInput>,
    pub reference_inputs: BTreeMap<UTxOIdentifier, Utxo>,

    pub change_address: Option<Address>,
    pub collateral_change_address: Option<Address>,
}

impl TransactionDraft {
    /// Add `amount` of an asset to the mint field. Amounts for the same
    /// asset accumulate and an asset reaching zero is dropped.
    pub fn add_mint(
        &mut self,
        policy: PolicyId,
        name: AssetName,
        amount: i64,
        redeemer: Option<PlutusData>,
    ) -> Result<(), TxBuilderError> {
        if amount == 0 {
            return Err(TxBuilderError::invalid_argument("mint amount must not be zero"));
        }
        let assets = self.mint.entry(policy).or_default();
        let current = assets.get(&name).copied().unwrap_or(0);
        let total = current.checked_add(amount).ok_or_else(|| {
            TxBuilderError::InvalidArgument(format!("mint of {policy}.{name} overflows"))
        })?;
        if total == 0 {
            assets.remove(&name);
        } else {
            assets.insert(name, total);
        }
        if assets.is_empty() {
            self.mint.remove(&policy);
            self.mint_redeemers.remove(&policy);
        } else if let Some(redeemer) = redeemer {
            self.mint_redeemers.insert(policy, redeemer);
        }
        Ok(())
    }

    pub fn pinned_utxos(&self) -> Vec<Utxo> {
        self.inputs.values().map(|pinned| pinned.utxo.clone()).collect()
    }

    /// Lovelace locked as deposits by certificates and proposals
    pub fn deposits(&self, params: &ProtocolParams) -> Result<Lovelace, TxBuilderError> {
        let certificates = self
            .certificates
            .iter()
            .map(|pending| pending.certificate.deposit(params.key_deposit));
        let proposals = self.proposals.iter().map(|p| p.procedure.deposit);
        checked_total(certificates.chain(proposals), "deposits")
    }

    /// Lovelace returned to the transaction by deregistrations
    pub fn refunds(&self, params: &ProtocolParams) -> Result<Lovelace, TxBuilderError> {
        checked_total(
            self.certificates.iter().map(|pending| pending.certificate.refund(params.key_deposit)),
            "refunds",
        )
    }

    pub fn withdrawal_total(&self) -> Result<Lovelace, TxBuilderError> {
        checked_total(self.withdrawals.values().map(|w| w.amount), "withdrawals")
    }

    /// Value entering the transaction without being selected: mint,
    /// refunds and withdrawals
    pub fn implicit_input(&self, params: &ProtocolParams) -> Result<Value, TxBuilderError> {
        let (minted, _) = Value::split_mint(&self.mint);
        let lovelace =
            checked_total([self.refunds(params)?, self.withdrawal_total()?], "implicit input")?;
        minted
            .checked_add(&Value::from_lovelace(lovelace))
            .ok_or_else(|| TxBuilderError::invalid_argument("implicit input overflows"))
    }

    pub fn auxiliary_data(&self) -> Option<AuxiliaryData> {
        (!self.metadata.is_empty()).then(|| AuxiliaryData {
            metadata: self.metadata.clone(),
        })
    }
}

fn checked_total(
    amounts: impl IntoIterator<Item = Lovelace>,
    what: &str,
) -> Result<Lovelace, TxBuilderError> {
    amounts
        .into_iter()
        .try_fold(0, Lovelace::checked_add)
        .ok_or_else(|| TxBuilderError::InvalidArgument(format!("{what} overflow")))
}

/// UTxOs the builder may draw from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoPools {
    pub available: Option<Vec<Utxo>>,
    pub collateral: Option<Vec<Utxo>>,
}

impl UtxoPools {
    /// Spendable candidates for coin selection: the available pool without
    /// pinned inputs, reference inputs, collateral and anything locked by a
    /// script
    pub fn candidates(&self, draft: &TransactionDraft) -> Option<Vec<Utxo>> {
        let collateral: BTreeSet<UTxOIdentifier> = self
            .collateral
            .iter()
            .flatten()
            .map(|utxo| utxo.input)
            .collect();
        let available = self.available.as_ref()?;
        let mut seen = BTreeSet::new();
        Some(
            available
                .iter()
                .filter(|utxo| {
                    !draft.inputs.contains_key(&utxo.input)
                        && !draft.reference_inputs.contains_key(&utxo.input)
                        && !collateral.contains(&utxo.input)
                        && !utxo.output.address.is_script()
                        && seen.insert(utxo.input)
                })
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_common::hash::Hash;

    fn name() -> AssetName {
        AssetName::new(b"coin").unwrap()
    }

    #[test]
    fn mint_accumulates_and_cancels() {
        let policy = Hash::new([3; 28]);
        let mut draft = TransactionDraft::default();
        draft.add_mint(policy, name(), 4, Some(PlutusData::unit())).unwrap();
        draft.add_mint(policy, name(), 4, None).unwrap();
        assert_eq!(draft.mint[&policy][&name()], 8);
        assert!(draft.mint_redeemers.contains_key(&policy));

        draft.add_mint(policy, name(), -8, None).unwrap();
        assert!(draft.mint.is_empty());
        assert!(draft.mint_redeemers.is_empty());
    }

    #[test]
    fn zero_and_overflowing_mints_are_rejected() {
        let policy = Hash::new([3; 28]);
        let mut draft = TransactionDraft::default();
        assert!(draft.add_mint(policy, name(), 0, None).is_err());
        draft.add_mint(policy, name(), i64::MAX, None).unwrap();
        assert!(draft.add_mint(policy, name(), 1, None).is_err());
        assert_eq!(draft.mint[&policy][&name()], i64::MAX);
    }

    #[test]
    fn overflowing_withdrawals_are_rejected() {
        let params = ProtocolParams::default();
        let account = |tag: u8| {
            StakeAddress::new(
                portico_common::Credential::AddrKeyHash(Hash::new([tag; 28])),
                NetworkId::Testnet,
            )
        };
        let withdrawal = |amount| PendingWithdrawal {
            amount,
            redeemer: None,
        };
        let mut draft = TransactionDraft::default();
        draft.withdrawals.insert(account(1), withdrawal(u64::MAX));
        assert_eq!(draft.withdrawal_total().unwrap(), u64::MAX);
        assert_eq!(draft.implicit_input(&params).unwrap().lovelace, u64::MAX);

        draft.withdrawals.insert(account(2), withdrawal(1));
        assert!(matches!(draft.withdrawal_total(), Err(TxBuilderError::InvalidArgument(_))));
        assert!(matches!(draft.implicit_input(&params), Err(TxBuilderError::InvalidArgument(_))));
    }

    #[test]
    fn candidates_skip_pinned_and_collateral() {
        let utxo = |tag: u8| {
            Utxo::new(
                UTxOIdentifier::new(Hash::new([tag; 32]), 0),
                TransactionOutput::new(Address::None, Value::from_lovelace(1)),
            )
        };
        let mut draft = TransactionDraft::default();
        draft.inputs.insert(
            utxo(1).input,
            PinnedInput {
                utxo: utxo(1),
                redeemer: None,
                datum: None,
            },
        );
        draft.reference_inputs.insert(utxo(2).input, utxo(2));
        let pools = UtxoPools {
            available: Some(vec![utxo(1), utxo(2), utxo(3), utxo(4), utxo(4)]),
            collateral: Some(vec![utxo(3)]),
        };
        let candidates = pools.candidates(&draft).unwrap();
        assert_eq!(candidates, vec![utxo(4)]);
        assert_eq!(UtxoPools::default().candidates(&draft), None);
    }
}
