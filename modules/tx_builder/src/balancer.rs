//! Fee and change fixed point
//!
//! Each round selects inputs for the current fee estimate, works out the
//! change, resolves script witnesses, picks collateral, serializes the
//! transaction with placeholder signatures and prices it. The round is
//! accepted once the price no longer exceeds the fee it was built with.

use std::collections::{BTreeMap, BTreeSet};

use portico_common::{
    cbor::to_vec,
    metadata::AuxiliaryData,
    protocol_params::ProtocolParams,
    tx::{Transaction, TransactionBody, VKeyWitness},
    ExUnits, Lovelace, RedeemerPointer, TransactionOutput, UTxOIdentifier, Utxo, Value,
};
use tracing::{debug, info, warn};

use crate::{
    coin_selection::CoinSelector,
    configuration::BuilderConfig,
    draft::{TransactionDraft, UtxoPools},
    error::TxBuilderError,
    evaluator::TxEvaluator,
    fee,
    provider::Provider,
    witness_resolver::{ResolvedWitnesses, WitnessResolver},
};

/// Collateral chosen for a round
#[derive(Debug, Clone)]
struct Collateral {
    inputs: Vec<Utxo>,
    total: Lovelace,
    change: Option<TransactionOutput>,
}

/// Budgets from the last evaluation, valid for one input set
struct Evaluated {
    inputs: BTreeSet<UTxOIdentifier>,
    budgets: BTreeMap<RedeemerPointer, ExUnits>,
}

pub struct Balancer<'a> {
    pub params: &'a ProtocolParams,
    pub config: &'a BuilderConfig,
    pub coin_selector: &'a dyn CoinSelector,
    pub evaluator: &'a dyn TxEvaluator,
    pub provider: &'a dyn Provider,
}

impl Balancer<'_> {
    pub fn balance(
        &self,
        draft: &TransactionDraft,
        pools: &UtxoPools,
    ) -> Result<Transaction, TxBuilderError> {
        let change_address =
            draft.change_address.as_ref().ok_or(TxBuilderError::Missing("change address"))?;
        let available = pools.candidates(draft).ok_or(TxBuilderError::Missing("utxos"))?;

        let outputs = self.prepare_outputs(&draft.outputs);
        let pinned = draft.pinned_utxos();
        let (_, burned) = Value::split_mint(&draft.mint);
        let implicit = draft.implicit_input(self.params)?;
        let deposits = draft.deposits(self.params)?;
        let committed = outputs
            .iter()
            .map(|o| &o.value)
            .chain([&burned, &Value::from_lovelace(deposits)])
            .try_fold(Value::default(), |acc, value| acc.checked_add(value))
            .ok_or_else(|| TxBuilderError::invalid_argument("value sent overflows"))?;

        let minimum_fee = draft.minimum_fee.unwrap_or(0);
        let mut fee = minimum_fee;
        let mut change_extra: Lovelace = 0;
        let mut evaluated: Option<Evaluated> = None;

        for round in 1..=self.config.max_balance_iterations {
            let spend = committed
                .checked_add(&Value::from_lovelace(fee))
                .ok_or_else(|| TxBuilderError::invalid_argument("value sent overflows"))?;
            let target =
                (spend.clone() + Value::from_lovelace(change_extra)).saturating_sub(&implicit);
            let selection = self
                .coin_selector
                .select(&pinned, &available, &target)
                .map_err(|e| TxBuilderError::BalanceInsufficient(e.to_string()))?;

            let mut inputs: Vec<Utxo> = pinned.iter().cloned().chain(selection.selected).collect();
            if inputs.is_empty() {
                // The ledger rejects a transaction without inputs
                let utxo = smallest_input(&available).ok_or_else(|| {
                    TxBuilderError::BalanceInsufficient("no utxo to spend".to_string())
                })?;
                debug!(input = %utxo.input, "spending an input the target does not need");
                inputs.push(utxo.clone());
            }
            inputs.sort_by(|a, b| a.input.cmp(&b.input));
            let provided = Value::sum(inputs.iter().map(Utxo::value)) + implicit.clone();
            let change = provided.checked_sub(&spend).ok_or_else(|| {
                TxBuilderError::BalanceInsufficient(format!(
                    "selected inputs cannot pay for {spend:?}"
                ))
            })?;

            let mut dust = 0;
            let change_output = if change.is_zero() {
                None
            } else {
                let output = TransactionOutput::new(change_address.clone(), change);
                let min = fee::min_ada_required(&output, self.params.coins_per_utxo_byte);
                if output.value.lovelace >= min {
                    Some(output)
                } else if !output.value.has_assets() {
                    dust = output.value.lovelace;
                    debug!(dust, "change below minimum, adding it to the fee");
                    None
                } else {
                    change_extra += min - output.value.lovelace;
                    debug!(round, change_extra, "change carrying assets is short of lovelace");
                    continue;
                }
            };
            let body_fee = fee + dust;

            let mut witnesses = WitnessResolver::new(draft, self.provider).resolve(&inputs)?;
            let collateral = if witnesses.requires_collateral() {
                Some(self.select_collateral(draft, pools, body_fee)?)
            } else {
                None
            };

            let input_ids: BTreeSet<UTxOIdentifier> = inputs.iter().map(|u| u.input).collect();
            let fresh = match &evaluated {
                Some(previous) if previous.inputs == input_ids => {
                    witnesses.apply_budgets(&previous.budgets)?;
                    false
                }
                _ => {
                    witnesses.spread_budget(self.params.max_tx_ex_units);
                    true
                }
            };

            let mut tx = self.assemble(
                draft,
                &inputs,
                &outputs,
                change_output.as_ref(),
                body_fee,
                &witnesses,
                collateral.as_ref(),
            )?;

            if fresh && witnesses.requires_collateral() && self.config.enable_evaluation {
                let resolved: Vec<Utxo> =
                    inputs.iter().chain(draft.reference_inputs.values()).cloned().collect();
                let budgets: BTreeMap<RedeemerPointer, ExUnits> =
                    self.evaluator.evaluate(&tx, &resolved)?.into_iter().collect();
                witnesses.apply_budgets(&budgets)?;
                evaluated = Some(Evaluated {
                    inputs: input_ids,
                    budgets,
                });
                tx = self.assemble(
                    draft,
                    &inputs,
                    &outputs,
                    change_output.as_ref(),
                    body_fee,
                    &witnesses,
                    collateral.as_ref(),
                )?;
            }

            let units = witnesses.total_ex_units();
            let ref_script_bytes: u64 = inputs
                .iter()
                .chain(draft.reference_inputs.values())
                .filter_map(Utxo::script_ref)
                .map(|script| script.size() as u64)
                .sum();
            let size = tx.size();
            let required = fee::min_fee(self.params, size, units, ref_script_bytes).max(minimum_fee);
            debug!(round, fee, required, size, inputs = inputs.len(), "balance round");

            if required <= fee {
                return self.finish(tx, &inputs, &implicit, deposits, &witnesses);
            }
            fee = required;
        }

        warn!(
            rounds = self.config.max_balance_iterations,
            "fee did not settle"
        );
        Err(TxBuilderError::IllegalState(format!(
            "fee did not settle after {} rounds",
            self.config.max_balance_iterations
        )))
    }

    /// Raise outputs below the minimum lovelace to the minimum
    fn prepare_outputs(&self, outputs: &[TransactionOutput]) -> Vec<TransactionOutput> {
        outputs
            .iter()
            .map(|output| {
                let min = fee::min_ada_required(output, self.params.coins_per_utxo_byte);
                let mut output = output.clone();
                if output.value.lovelace < min {
                    debug!(
                        from = output.value.lovelace,
                        to = min,
                        "raising output to minimum lovelace"
                    );
                    output.value.lovelace = min;
                }
                output
            })
            .collect()
    }

    /// Key locked collateral from the collateral pool, pure lovelace first,
    /// then largest first
    fn select_collateral(
        &self,
        draft: &TransactionDraft,
        pools: &UtxoPools,
        fee: Lovelace,
    ) -> Result<Collateral, TxBuilderError> {
        let pool = pools.collateral.as_ref().ok_or(TxBuilderError::Missing("collateral utxos"))?;
        let return_address = draft
            .collateral_change_address
            .as_ref()
            .ok_or(TxBuilderError::Missing("collateral change address"))?;
        let required = fee::required_collateral(self.params, fee) + self.config.collateral_margin;

        let mut candidates: Vec<&Utxo> =
            pool.iter().filter(|u| !u.output.address.is_script()).collect();
        candidates.sort_by(|a, b| {
            a.value()
                .has_assets()
                .cmp(&b.value().has_assets())
                .then(b.value().lovelace.cmp(&a.value().lovelace))
                .then(a.input.cmp(&b.input))
        });

        let mut inputs = Vec::new();
        let mut total = Value::default();
        for utxo in candidates.into_iter().take(self.params.max_collateral_inputs as usize) {
            inputs.push(utxo.clone());
            total += utxo.value();
            if total.lovelace < required {
                continue;
            }
            let rest = total.saturating_sub(&Value::from_lovelace(required));
            if rest.is_zero() {
                return Ok(Collateral {
                    inputs,
                    total: required,
                    change: None,
                });
            }
            let change = TransactionOutput::new(return_address.clone(), rest);
            let min = fee::min_ada_required(&change, self.params.coins_per_utxo_byte);
            if change.value.lovelace >= min {
                return Ok(Collateral {
                    inputs,
                    total: required,
                    change: Some(change),
                });
            }
            if !change.value.has_assets() {
                // Too little to return, forfeit it with the rest
                return Ok(Collateral {
                    inputs,
                    total: total.lovelace,
                    change: None,
                });
            }
        }
        Err(TxBuilderError::BalanceInsufficient(format!(
            "collateral pool cannot provide {required} lovelace"
        )))
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        draft: &TransactionDraft,
        inputs: &[Utxo],
        outputs: &[TransactionOutput],
        change: Option<&TransactionOutput>,
        fee: Lovelace,
        witnesses: &ResolvedWitnesses,
        collateral: Option<&Collateral>,
    ) -> Result<Transaction, TxBuilderError> {
        let auxiliary_data = draft.auxiliary_data();
        let mut body_outputs = outputs.to_vec();
        body_outputs.extend(change.cloned());

        let body = TransactionBody {
            inputs: inputs.iter().map(|u| u.input).collect(),
            outputs: body_outputs,
            fee,
            ttl: draft.invalid_after,
            certificates: draft.certificates.iter().map(|p| p.certificate.clone()).collect(),
            withdrawals: draft.withdrawals.iter().map(|(a, w)| (*a, w.amount)).collect(),
            auxiliary_data_hash: auxiliary_data.as_ref().map(AuxiliaryData::hash),
            validity_start: draft.invalid_before,
            mint: draft.mint.clone(),
            script_data_hash: witnesses.script_data_hash(&self.params.cost_models)?,
            collateral: collateral
                .map(|c| c.inputs.iter().map(|u| u.input).collect())
                .unwrap_or_default(),
            required_signers: draft.required_signers.clone(),
            network_id: draft.network_id,
            collateral_return: collateral.and_then(|c| c.change.clone()),
            total_collateral: collateral.map(|c| c.total),
            reference_inputs: draft.reference_inputs.keys().copied().collect(),
            voting_procedures: draft.votes.clone(),
            proposal_procedures: draft.proposals.iter().map(|p| p.procedure.clone()).collect(),
        };

        let mut signers = witnesses.key_hashes.clone();
        if let Some(collateral) = collateral {
            signers.extend(
                collateral
                    .inputs
                    .iter()
                    .filter_map(|u| u.output.address.payment_credential())
                    .filter_map(|c| c.key_hash()),
            );
        }
        let mut witness_set = witnesses.witness_set();
        witness_set.vkey_witnesses =
            (0..signers.len() + draft.signer_padding).map(VKeyWitness::placeholder).collect();

        let mut tx = Transaction::new(body, witness_set);
        tx.auxiliary_data = auxiliary_data;
        Ok(tx)
    }

    /// Limits and the balance equation, then drop the placeholders
    fn finish(
        &self,
        mut tx: Transaction,
        inputs: &[Utxo],
        implicit: &Value,
        deposits: Lovelace,
        witnesses: &ResolvedWitnesses,
    ) -> Result<Transaction, TxBuilderError> {
        let max_units = self.params.max_tx_ex_units;
        let units = witnesses.total_ex_units();
        if units.mem > max_units.mem || units.steps > max_units.steps {
            return Err(TxBuilderError::InvalidArgument(format!(
                "scripts need {units:?}, above the transaction limit {max_units:?}"
            )));
        }

        for output in &tx.body.outputs {
            let value_size = to_vec(&output.value).len();
            if value_size > self.params.max_value_size as usize {
                return Err(TxBuilderError::InvalidArgument(format!(
                    "output value of {value_size} bytes exceeds {}",
                    self.params.max_value_size
                )));
            }
        }

        let signed_size =
            tx.try_to_cbor().map_err(TxBuilderError::Encoding)?.len();
        if signed_size > self.params.max_tx_size as usize {
            return Err(TxBuilderError::InvalidArgument(format!(
                "transaction of {signed_size} bytes exceeds {}",
                self.params.max_tx_size
            )));
        }

        let (_, burned) = Value::split_mint(&tx.body.mint);
        let produced = Value::sum(tx.body.outputs.iter().map(|o| &o.value))
            + burned
            + Value::from_lovelace(tx.body.fee + deposits);
        let consumed = Value::sum(inputs.iter().map(Utxo::value)) + implicit.clone();
        if produced != consumed {
            return Err(TxBuilderError::IllegalState(format!(
                "unbalanced transaction: consumed {consumed:?}, produced {produced:?}"
            )));
        }

        tx.witness_set.vkey_witnesses.clear();
        info!(
            id = %tx.id(),
            fee = tx.body.fee,
            inputs = tx.body.inputs.len(),
            outputs = tx.body.outputs.len(),
            size = signed_size,
            "transaction balanced"
        );
        Ok(tx)
    }
}

/// Cheapest input to add when nothing else needs spending, pure lovelace
/// outputs first
fn smallest_input(available: &[Utxo]) -> Option<&Utxo> {
    available
        .iter()
        .min_by_key(|utxo| (utxo.value().has_assets(), utxo.value().lovelace, utxo.input))
}
