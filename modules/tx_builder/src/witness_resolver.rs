//! Pairing of script requirements with scripts, redeemers and datums

use std::collections::{BTreeMap, BTreeSet};

use portico_common::{
    protocol_params::CostModels,
    script::{PlutusLanguage, ScriptIntegrityHash},
    tx::{script_data_hash, WitnessSet},
    Credential, Datum, DatumHash, ExUnits, KeyHash, PlutusData, Redeemer, RedeemerPointer,
    RedeemerTag, Script, ScriptHash, Utxo,
};
use tracing::{debug, warn};

use crate::{draft::TransactionDraft, error::TxBuilderError, provider::Provider};

/// Which Plutus languages the transaction has seen so far, through attached
/// scripts or script references on added inputs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WitnessFlags {
    pub has_plutus_v1: bool,
    pub has_plutus_v2: bool,
    pub has_plutus_v3: bool,
}

impl WitnessFlags {
    pub fn note(&mut self, script: &Script) {
        match script.language() {
            Some(PlutusLanguage::V1) => self.has_plutus_v1 = true,
            Some(PlutusLanguage::V2) => self.has_plutus_v2 = true,
            Some(PlutusLanguage::V3) => self.has_plutus_v3 = true,
            None => {}
        }
    }

    pub fn any_plutus(&self) -> bool {
        self.has_plutus_v1 || self.has_plutus_v2 || self.has_plutus_v3
    }
}

/// An action that must be authorised by a script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptWitnessRequirement {
    pub script_hash: ScriptHash,
    pub purpose: RedeemerPointer,
    pub redeemer: Option<PlutusData>,
}

/// Everything the witness set needs apart from key witnesses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedWitnesses {
    /// Redeemers in pointer order, with budgets still to be filled
    pub redeemers: Vec<Redeemer>,
    pub datums: Vec<PlutusData>,
    /// Scripts carried in the witness set itself
    pub scripts: Vec<Script>,
    /// Languages of the Plutus scripts actually run
    pub languages: BTreeSet<PlutusLanguage>,
    /// Key hashes whose signatures the transaction will need
    pub key_hashes: BTreeSet<KeyHash>,
}

impl ResolvedWitnesses {
    pub fn requires_collateral(&self) -> bool {
        !self.redeemers.is_empty()
    }

    pub fn total_ex_units(&self) -> ExUnits {
        self.redeemers
            .iter()
            .fold(ExUnits::default(), |acc, r| acc.saturating_add(r.ex_units))
    }

    /// Give every redeemer an equal share of `budget`
    pub fn spread_budget(&mut self, budget: ExUnits) {
        let count = self.redeemers.len() as u64;
        if count == 0 {
            return;
        }
        let share = ExUnits::new(budget.mem / count, budget.steps / count);
        for redeemer in &mut self.redeemers {
            redeemer.ex_units = share;
        }
    }

    /// Write evaluated budgets into the redeemers
    pub fn apply_budgets(
        &mut self,
        budgets: &BTreeMap<RedeemerPointer, ExUnits>,
    ) -> Result<(), TxBuilderError> {
        for redeemer in &mut self.redeemers {
            let pointer = redeemer.redeemer_pointer();
            redeemer.ex_units = *budgets.get(&pointer).ok_or_else(|| {
                TxBuilderError::Evaluation(format!("no budget returned for {pointer:?}"))
            })?;
        }
        Ok(())
    }

    pub fn script_data_hash(
        &self,
        cost_models: &CostModels,
    ) -> Result<Option<ScriptIntegrityHash>, TxBuilderError> {
        if self.redeemers.is_empty() && self.datums.is_empty() {
            return Ok(None);
        }
        let views = cost_models
            .language_views(&self.languages)
            .map_err(|e| TxBuilderError::InvalidArgument(e.to_string()))?;
        script_data_hash(&self.redeemers, &self.datums, &views)
            .map(Some)
            .map_err(TxBuilderError::Encoding)
    }

    pub fn witness_set(&self) -> WitnessSet {
        let mut witnesses = WitnessSet {
            plutus_data: self.datums.clone(),
            redeemers: self.redeemers.clone(),
            ..Default::default()
        };
        for script in &self.scripts {
            match script {
                Script::Native(native) => witnesses.native_scripts.push(native.clone()),
                Script::PlutusV1(bytes) => witnesses.plutus_v1_scripts.push(bytes.clone()),
                Script::PlutusV2(bytes) => witnesses.plutus_v2_scripts.push(bytes.clone()),
                Script::PlutusV3(bytes) => witnesses.plutus_v3_scripts.push(bytes.clone()),
            }
        }
        witnesses
    }
}

pub struct WitnessResolver<'a> {
    draft: &'a TransactionDraft,
    provider: &'a dyn Provider,
}

impl<'a> WitnessResolver<'a> {
    pub fn new(draft: &'a TransactionDraft, provider: &'a dyn Provider) -> Self {
        Self { draft, provider }
    }

    /// Script requirements of the draft when spending `inputs`, which must
    /// be sorted by id
    pub fn requirements(
        &self,
        inputs: &[Utxo],
    ) -> Result<Vec<ScriptWitnessRequirement>, TxBuilderError> {
        let draft = self.draft;
        let mut requirements = Vec::new();
        let mut push = |script_hash: Option<ScriptHash>,
                        tag: RedeemerTag,
                        index: usize,
                        redeemer: Option<&PlutusData>|
         -> Result<(), TxBuilderError> {
            let purpose = RedeemerPointer::new(tag, index as u32);
            match script_hash {
                Some(script_hash) => requirements.push(ScriptWitnessRequirement {
                    script_hash,
                    purpose,
                    redeemer: redeemer.cloned(),
                }),
                None if redeemer.is_some() => {
                    return Err(TxBuilderError::InvalidArgument(format!(
                        "redeemer given for {purpose:?}, which is not script locked"
                    )));
                }
                None => {}
            }
            Ok(())
        };

        for (index, utxo) in inputs.iter().enumerate() {
            let redeemer = draft.inputs.get(&utxo.input).and_then(|p| p.redeemer.as_ref());
            push(utxo.output.payment_script_hash(), RedeemerTag::Spend, index, redeemer)?;
        }
        for (index, policy) in draft.mint.keys().enumerate() {
            push(Some(*policy), RedeemerTag::Mint, index, draft.mint_redeemers.get(policy))?;
        }
        for (index, pending) in draft.certificates.iter().enumerate() {
            let script = pending.certificate.required_witness().and_then(|c| c.script_hash());
            push(script, RedeemerTag::Cert, index, pending.redeemer.as_ref())?;
        }
        for (index, (account, withdrawal)) in draft.withdrawals.iter().enumerate() {
            let script = account.credential.script_hash();
            push(script, RedeemerTag::Reward, index, withdrawal.redeemer.as_ref())?;
        }
        for (index, voter) in draft.votes.keys().enumerate() {
            push(voter.script_hash(), RedeemerTag::Vote, index, draft.vote_redeemers.get(voter))?;
        }
        for (index, pending) in draft.proposals.iter().enumerate() {
            let script = pending.procedure.gov_action.policy_hash();
            push(script, RedeemerTag::Propose, index, pending.redeemer.as_ref())?;
        }
        Ok(requirements)
    }

    /// Resolve every requirement against the available scripts, producing
    /// redeemers, datums and the script part of the witness set
    pub fn resolve(&self, inputs: &[Utxo]) -> Result<ResolvedWitnesses, TxBuilderError> {
        let draft = self.draft;
        let requirements = self.requirements(inputs)?;

        let referenced: BTreeMap<ScriptHash, &Script> = draft
            .reference_inputs
            .values()
            .chain(inputs.iter())
            .filter_map(Utxo::script_ref)
            .map(|script| (script.hash(), script))
            .collect();

        let mut resolved = ResolvedWitnesses::default();
        let mut datums: BTreeMap<DatumHash, PlutusData> = draft.datums.clone();

        for requirement in &requirements {
            let script = draft
                .scripts
                .get(&requirement.script_hash)
                .or_else(|| referenced.get(&requirement.script_hash).copied())
                .ok_or(TxBuilderError::MissingScript(requirement.script_hash))?;

            match (script.language(), &requirement.redeemer) {
                (Some(language), Some(data)) => {
                    resolved.languages.insert(language);
                    resolved.redeemers.push(Redeemer {
                        tag: requirement.purpose.tag,
                        index: requirement.purpose.index,
                        data: data.clone(),
                        ex_units: ExUnits::default(),
                    });
                }
                (Some(_), None) => return Err(TxBuilderError::MissingRedeemer(requirement.purpose)),
                (None, Some(_)) => {
                    return Err(TxBuilderError::InvalidArgument(format!(
                        "native script {} takes no redeemer",
                        requirement.script_hash
                    )));
                }
                (None, None) => {
                    if let Script::Native(native) = script {
                        native.collect_key_hashes(&mut resolved.key_hashes);
                    }
                }
            }

            if requirement.purpose.tag == RedeemerTag::Spend {
                let utxo = &inputs[requirement.purpose.index as usize];
                if let Some((hash, data)) = self.spend_datum(utxo, script.language())? {
                    datums.insert(hash, data);
                }
            }
        }

        for (hash, script) in &draft.scripts {
            if referenced.contains_key(hash) {
                continue;
            }
            if let Script::Native(native) = script {
                native.collect_key_hashes(&mut resolved.key_hashes);
            }
            resolved.scripts.push(script.clone());
        }

        resolved.datums = datums.into_values().collect();
        resolved.key_hashes.extend(self.key_hashes(inputs));
        resolved.redeemers.sort_by_key(Redeemer::redeemer_pointer);

        debug!(
            requirements = requirements.len(),
            redeemers = resolved.redeemers.len(),
            scripts = resolved.scripts.len(),
            datums = resolved.datums.len(),
            "resolved witnesses"
        );
        Ok(resolved)
    }

    /// Datum the witness set must carry to spend a script locked `utxo`
    fn spend_datum(
        &self,
        utxo: &Utxo,
        language: Option<PlutusLanguage>,
    ) -> Result<Option<(DatumHash, PlutusData)>, TxBuilderError> {
        // Native scripts never read a datum
        if language.is_none() {
            return Ok(None);
        }
        let supplied = self.draft.inputs.get(&utxo.input).and_then(|p| p.datum.as_ref());
        match &utxo.output.datum {
            Some(Datum::Hash(hash)) => {
                if let Some(data) = supplied {
                    if data.hash() != *hash {
                        return Err(TxBuilderError::InvalidArgument(format!(
                            "datum supplied for {} does not match its datum hash",
                            utxo.input
                        )));
                    }
                    return Ok(Some((*hash, data.clone())));
                }
                if let Some(data) = self.draft.datums.get(hash) {
                    return Ok(Some((*hash, data.clone())));
                }
                match self.provider.resolve_datum(hash) {
                    Ok(Some(data)) => Ok(Some((*hash, data))),
                    Ok(None) => Err(TxBuilderError::MissingDatum(utxo.input)),
                    Err(e) => {
                        warn!("cannot resolve datum {hash}: {e:#}");
                        Err(TxBuilderError::MissingDatum(utxo.input))
                    }
                }
            }
            Some(Datum::Inline(_)) => Ok(None),
            // Plutus V3 may spend outputs without a datum, older languages cannot
            None => match language {
                Some(PlutusLanguage::V3) => Ok(None),
                _ => Err(TxBuilderError::MissingDatum(utxo.input)),
            },
        }
    }

    /// Key hashes that must sign: key locked inputs, required signers and the
    /// key credentials behind certificates, withdrawals and votes
    fn key_hashes(&self, inputs: &[Utxo]) -> BTreeSet<KeyHash> {
        let draft = self.draft;
        let mut keys: BTreeSet<KeyHash> = draft.required_signers.clone();
        let key_of = |credential: Credential| credential.key_hash();
        keys.extend(
            inputs.iter().filter_map(|u| u.output.address.payment_credential()).filter_map(key_of),
        );
        keys.extend(
            draft
                .certificates
                .iter()
                .filter_map(|p| p.certificate.required_witness())
                .filter_map(key_of),
        );
        keys.extend(draft.withdrawals.keys().filter_map(|a| key_of(a.credential)));
        keys.extend(draft.votes.keys().filter_map(|v| key_of(v.credential())));
        keys
    }
}
