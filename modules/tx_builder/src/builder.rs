//! Intent API over a transaction draft

use std::{collections::BTreeMap, sync::Arc};

use portico_common::{
    certificate::TxCertificate,
    drep::{Anchor, DRepChoice, DRepCredential},
    genesis_values::GenesisValues,
    governance::{GovAction, GovActionId, ProposalProcedure, Voter, VotingProcedure},
    metadata::{Metadatum, MetadatumLabel},
    protocol_params::ProtocolParams,
    tx::Transaction,
    Address, AssetId, AssetName, Datum, KeyHash, Lovelace, Mint, NetworkId, PlutusData, PolicyId,
    PoolId, Script, ScriptHash, Slot, StakeAddress, TransactionOutput, Utxo, Value,
};
use tracing::{info, warn};

use crate::{
    balancer::Balancer,
    certificate_assembler::{self as certs, CertificateAssembler},
    coin_selection::{CoinSelector, LargeFirstCoinSelector},
    configuration::BuilderConfig,
    draft::{PendingProposal, PendingWithdrawal, PinnedInput, TransactionDraft, UtxoPools},
    error::TxBuilderError,
    evaluator::{ProviderEvaluator, TxEvaluator},
    provider::Provider,
    witness_resolver::WitnessFlags,
};

/// Lifecycle of a builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderState {
    Building,
    /// First error recorded; every later intent is ignored
    Failed(TxBuilderError),
    Built,
}

/// Collects intents and turns them into one balanced transaction.
///
/// Intent methods never fail on the spot. The first error is kept and
/// returned by [`TransactionBuilder::build`]; everything after it is a
/// no-op.
pub struct TransactionBuilder {
    params: ProtocolParams,
    provider: Arc<dyn Provider>,
    config: BuilderConfig,
    coin_selector: Arc<dyn CoinSelector>,
    evaluator: Arc<dyn TxEvaluator>,
    genesis: GenesisValues,
    draft: TransactionDraft,
    pools: UtxoPools,
    flags: WitnessFlags,
    state: BuilderState,
}

impl TransactionBuilder {
    pub fn new(params: ProtocolParams, provider: Arc<dyn Provider>) -> Self {
        Self::new_with_config(params, provider, BuilderConfig::default())
    }

    pub fn new_with_config(
        params: ProtocolParams,
        provider: Arc<dyn Provider>,
        config: BuilderConfig,
    ) -> Self {
        let magic = match config.network_magic {
            Some(magic) => Some(magic),
            None => match provider.get_network_magic() {
                Ok(magic) => Some(magic),
                Err(e) => {
                    warn!("Cannot read network magic from provider: {e:#}");
                    None
                }
            },
        };
        let genesis = match magic.and_then(GenesisValues::for_network_magic) {
            Some(genesis) => genesis,
            None => {
                warn!(?magic, "Unknown network, converting time with mainnet genesis");
                GenesisValues::mainnet()
            }
        };

        Self {
            params,
            evaluator: Arc::new(ProviderEvaluator::new(provider.clone())),
            provider,
            config,
            coin_selector: Arc::new(LargeFirstCoinSelector),
            genesis,
            draft: TransactionDraft::default(),
            pools: UtxoPools::default(),
            flags: WitnessFlags::default(),
            state: BuilderState::Building,
        }
    }

    pub fn with_coin_selector(mut self, coin_selector: Arc<dyn CoinSelector>) -> Self {
        self.coin_selector = coin_selector;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn TxEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Apply `intent` unless an error is already recorded
    fn record<F>(&mut self, intent: F) -> &mut Self
    where
        F: FnOnce(&mut Self) -> Result<(), TxBuilderError>,
    {
        match self.state {
            BuilderState::Building => {
                if let Err(e) = intent(self) {
                    self.state = BuilderState::Failed(e);
                }
            }
            BuilderState::Built => {
                self.state = BuilderState::Failed(TxBuilderError::IllegalState(
                    "transaction already built".to_string(),
                ));
            }
            BuilderState::Failed(_) => {}
        }
        self
    }

    // Network and validity

    pub fn set_network_id(&mut self, network_id: NetworkId) -> &mut Self {
        self.record(|b| {
            b.draft.network_id = Some(network_id);
            Ok(())
        })
    }

    /// Lower bound on the fee; the computed fee is used when larger
    pub fn set_minimum_fee(&mut self, fee: Lovelace) -> &mut Self {
        self.record(|b| {
            b.draft.minimum_fee = Some(fee);
            Ok(())
        })
    }

    pub fn set_invalid_before(&mut self, slot: Slot) -> &mut Self {
        self.record(|b| {
            b.draft.invalid_before = Some(slot);
            Ok(())
        })
    }

    pub fn set_invalid_after(&mut self, slot: Slot) -> &mut Self {
        self.record(|b| {
            b.draft.invalid_after = Some(slot);
            Ok(())
        })
    }

    /// Validity start from a unix timestamp in seconds
    pub fn set_invalid_before_ex(&mut self, timestamp: u64) -> &mut Self {
        self.record(|b| {
            b.draft.invalid_before = Some(b.genesis.timestamp_to_slot(timestamp));
            Ok(())
        })
    }

    /// Time to live from a unix timestamp in seconds
    pub fn set_invalid_after_ex(&mut self, timestamp: u64) -> &mut Self {
        self.record(|b| {
            b.draft.invalid_after = Some(b.genesis.timestamp_to_slot(timestamp));
            Ok(())
        })
    }

    pub fn set_genesis_values(&mut self, genesis: GenesisValues) -> &mut Self {
        self.record(|b| {
            b.genesis = genesis;
            Ok(())
        })
    }

    // Funding and change

    pub fn set_change_address(&mut self, address: &Address) -> &mut Self {
        self.record(|b| {
            b.draft.change_address = Some(address.clone());
            Ok(())
        })
    }

    pub fn set_change_address_ex(&mut self, address: &str) -> &mut Self {
        self.record(|b| {
            b.draft.change_address = Some(Address::from_string(address)?);
            Ok(())
        })
    }

    pub fn set_collateral_change_address(&mut self, address: &Address) -> &mut Self {
        self.record(|b| {
            b.draft.collateral_change_address = Some(address.clone());
            Ok(())
        })
    }

    pub fn set_collateral_change_address_ex(&mut self, address: &str) -> &mut Self {
        self.record(|b| {
            b.draft.collateral_change_address = Some(Address::from_string(address)?);
            Ok(())
        })
    }

    /// UTxOs balancing may spend
    pub fn set_utxos(&mut self, utxos: &[Utxo]) -> &mut Self {
        self.record(|b| {
            b.pools.available = Some(utxos.to_vec());
            Ok(())
        })
    }

    /// UTxOs reserved for collateral, never used to fund the transaction
    pub fn set_collateral_utxos(&mut self, utxos: &[Utxo]) -> &mut Self {
        self.record(|b| {
            b.pools.collateral = Some(utxos.to_vec());
            Ok(())
        })
    }

    // Outputs

    pub fn send_lovelace(&mut self, address: &Address, lovelace: Lovelace) -> &mut Self {
        self.send_value(address, &Value::from_lovelace(lovelace))
    }

    pub fn send_lovelace_ex(&mut self, address: &str, lovelace: Lovelace) -> &mut Self {
        self.send_value_ex(address, &Value::from_lovelace(lovelace))
    }

    pub fn send_value(&mut self, address: &Address, value: &Value) -> &mut Self {
        self.add_output(&TransactionOutput::new(address.clone(), value.clone()))
    }

    pub fn send_value_ex(&mut self, address: &str, value: &Value) -> &mut Self {
        self.record(|b| {
            let address = Address::from_string(address)?;
            b.draft.outputs.push(TransactionOutput::new(address, value.clone()));
            Ok(())
        })
    }

    pub fn lock_lovelace(
        &mut self,
        address: &Address,
        lovelace: Lovelace,
        datum: Option<&Datum>,
    ) -> &mut Self {
        self.lock_value(address, &Value::from_lovelace(lovelace), datum)
    }

    pub fn lock_lovelace_ex(
        &mut self,
        address: &str,
        lovelace: Lovelace,
        datum: Option<&Datum>,
    ) -> &mut Self {
        self.lock_value_ex(address, &Value::from_lovelace(lovelace), datum)
    }

    /// Send `value` to a script address, optionally with a datum
    pub fn lock_value(
        &mut self,
        address: &Address,
        value: &Value,
        datum: Option<&Datum>,
    ) -> &mut Self {
        self.record(|b| b.push_locked(address.clone(), value, datum))
    }

    pub fn lock_value_ex(&mut self, address: &str, value: &Value, datum: Option<&Datum>) -> &mut Self {
        self.record(|b| b.push_locked(Address::from_string(address)?, value, datum))
    }

    fn push_locked(
        &mut self,
        address: Address,
        value: &Value,
        datum: Option<&Datum>,
    ) -> Result<(), TxBuilderError> {
        if !address.is_script() {
            return Err(TxBuilderError::invalid_argument(
                "value can only be locked at a script address",
            ));
        }
        let mut output = TransactionOutput::new(address, value.clone());
        output.datum = datum.cloned();
        self.draft.outputs.push(output);
        Ok(())
    }

    pub fn add_output(&mut self, output: &TransactionOutput) -> &mut Self {
        self.record(|b| {
            b.draft.outputs.push(output.clone());
            Ok(())
        })
    }

    // Inputs

    /// Spend `utxo` whatever coin selection decides. Script locked inputs
    /// take a redeemer, and a datum when locked by datum hash.
    pub fn add_input(
        &mut self,
        utxo: &Utxo,
        redeemer: Option<&PlutusData>,
        datum: Option<&PlutusData>,
    ) -> &mut Self {
        self.record(|b| {
            if redeemer.is_some() {
                if b.pools.collateral.is_none() {
                    return Err(TxBuilderError::Missing("collateral utxos"));
                }
                if b.draft.collateral_change_address.is_none() {
                    return Err(TxBuilderError::Missing("collateral change address"));
                }
            }
            if let Some(script) = utxo.script_ref() {
                b.flags.note(script);
            }
            if let Some(datum) = datum {
                b.draft.datums.insert(datum.hash(), datum.clone());
            }
            b.draft.inputs.insert(
                utxo.input,
                PinnedInput {
                    utxo: utxo.clone(),
                    redeemer: redeemer.cloned(),
                    datum: datum.cloned(),
                },
            );
            Ok(())
        })
    }

    pub fn add_reference_input(&mut self, utxo: &Utxo) -> &mut Self {
        self.record(|b| {
            if let Some(script) = utxo.script_ref() {
                b.flags.note(script);
            }
            b.draft.reference_inputs.insert(utxo.input, utxo.clone());
            Ok(())
        })
    }

    // Minting

    /// Mint (positive) or burn (negative) `amount` of an asset
    pub fn mint_token(
        &mut self,
        policy: &PolicyId,
        name: &AssetName,
        amount: i64,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.record(|b| b.draft.add_mint(*policy, *name, amount, redeemer.cloned()))
    }

    pub fn mint_token_ex(
        &mut self,
        policy: &str,
        name: &str,
        amount: i64,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.record(|b| {
            let policy: PolicyId =
                policy.parse().map_err(|e| TxBuilderError::from_hex("policy id", e))?;
            let name = hex::decode(name).map_err(|e| TxBuilderError::from_hex("asset name", e))?;
            let name = AssetName::new(&name)
                .ok_or_else(|| TxBuilderError::invalid_argument("asset name longer than 32 bytes"))?;
            b.draft.add_mint(policy, name, amount, redeemer.cloned())
        })
    }

    pub fn mint_token_with_id(
        &mut self,
        asset: &AssetId,
        amount: i64,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.mint_token(&asset.policy_id, &asset.asset_name, amount, redeemer)
    }

    /// Asset id given as hex policy id followed by hex asset name
    pub fn mint_token_with_id_ex(
        &mut self,
        asset: &str,
        amount: i64,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.record(|b| {
            let bytes = hex::decode(asset).map_err(|e| TxBuilderError::from_hex("asset id", e))?;
            let asset = AssetId::from_bytes(&bytes)
                .map_err(|e| TxBuilderError::InvalidArgument(format!("asset id: {e}")))?;
            b.draft.add_mint(asset.policy_id, asset.asset_name, amount, redeemer.cloned())
        })
    }

    // Scripts and witnesses

    pub fn add_script(&mut self, script: &Script) -> &mut Self {
        self.record(|b| {
            b.flags.note(script);
            b.draft.scripts.insert(script.hash(), script.clone());
            Ok(())
        })
    }

    pub fn add_datum(&mut self, datum: &PlutusData) -> &mut Self {
        self.record(|b| {
            b.draft.datums.insert(datum.hash(), datum.clone());
            Ok(())
        })
    }

    pub fn add_signer(&mut self, key_hash: &KeyHash) -> &mut Self {
        self.record(|b| {
            b.draft.required_signers.insert(*key_hash);
            Ok(())
        })
    }

    pub fn add_signer_ex(&mut self, key_hash: &str) -> &mut Self {
        self.record(|b| {
            let key_hash: KeyHash =
                key_hash.parse().map_err(|e| TxBuilderError::from_hex("key hash", e))?;
            b.draft.required_signers.insert(key_hash);
            Ok(())
        })
    }

    /// Reserve room for `count` signatures the builder cannot infer
    pub fn pad_signer_count(&mut self, count: usize) -> &mut Self {
        self.record(|b| {
            b.draft.signer_padding = count;
            Ok(())
        })
    }

    // Certificates

    pub fn add_certificate(
        &mut self,
        certificate: &TxCertificate,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.record(|b| {
            CertificateAssembler::append(&mut b.draft, certificate.clone(), redeemer);
            Ok(())
        })
    }

    /// Apply a certificate built from the protocol parameters
    fn certify<F>(&mut self, redeemer: Option<&PlutusData>, build: F) -> &mut Self
    where
        F: FnOnce(&CertificateAssembler) -> Result<TxCertificate, TxBuilderError>,
    {
        self.record(|b| {
            let certificate = build(&CertificateAssembler::new(&b.params))?;
            CertificateAssembler::append(&mut b.draft, certificate, redeemer);
            Ok(())
        })
    }

    pub fn register_reward_address(
        &mut self,
        stake_address: &StakeAddress,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.register_reward_address(stake_address)))
    }

    pub fn register_reward_address_ex(
        &mut self,
        stake_address: &str,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| {
            Ok(a.register_reward_address(&certs::parse_stake_address(stake_address)?))
        })
    }

    pub fn deregister_reward_address(
        &mut self,
        stake_address: &StakeAddress,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.deregister_reward_address(stake_address)))
    }

    pub fn deregister_reward_address_ex(
        &mut self,
        stake_address: &str,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| {
            Ok(a.deregister_reward_address(&certs::parse_stake_address(stake_address)?))
        })
    }

    pub fn delegate_stake(
        &mut self,
        stake_address: &StakeAddress,
        pool: &PoolId,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.delegate_stake(stake_address, pool)))
    }

    pub fn delegate_stake_ex(
        &mut self,
        stake_address: &str,
        pool: &str,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| {
            let stake_address = certs::parse_stake_address(stake_address)?;
            Ok(a.delegate_stake(&stake_address, &certs::parse_pool_id(pool)?))
        })
    }

    pub fn delegate_voting_power(
        &mut self,
        stake_address: &StakeAddress,
        drep: &DRepChoice,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.delegate_voting_power(stake_address, drep)))
    }

    /// `drep` is a DRep id or one of `abstain` and `no_confidence`
    pub fn delegate_voting_power_ex(
        &mut self,
        stake_address: &str,
        drep: &str,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| {
            let stake_address = certs::parse_stake_address(stake_address)?;
            Ok(a.delegate_voting_power(&stake_address, &certs::parse_drep_choice(drep)?))
        })
    }

    pub fn register_drep(
        &mut self,
        drep: &DRepCredential,
        anchor: Option<&Anchor>,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.register_drep(drep, anchor)))
    }

    pub fn register_drep_ex(
        &mut self,
        drep: &str,
        anchor: Option<&Anchor>,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.register_drep(&certs::parse_drep_credential(drep)?, anchor)))
    }

    pub fn update_drep(
        &mut self,
        drep: &DRepCredential,
        anchor: Option<&Anchor>,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.update_drep(drep, anchor)))
    }

    pub fn update_drep_ex(
        &mut self,
        drep: &str,
        anchor: Option<&Anchor>,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.update_drep(&certs::parse_drep_credential(drep)?, anchor)))
    }

    pub fn deregister_drep(
        &mut self,
        drep: &DRepCredential,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.deregister_drep(drep)))
    }

    pub fn deregister_drep_ex(&mut self, drep: &str, redeemer: Option<&PlutusData>) -> &mut Self {
        self.certify(redeemer, |a| Ok(a.deregister_drep(&certs::parse_drep_credential(drep)?)))
    }

    // Governance

    /// Cast `voter`'s vote on `action`. A later vote by the same voter on
    /// the same action replaces the earlier one.
    pub fn vote(
        &mut self,
        voter: &Voter,
        action: &GovActionId,
        procedure: &VotingProcedure,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.record(|b| {
            b.draft.votes.entry(*voter).or_default().insert(*action, procedure.clone());
            if let Some(redeemer) = redeemer {
                b.draft.vote_redeemers.insert(*voter, redeemer.clone());
            }
            Ok(())
        })
    }

    pub fn propose(
        &mut self,
        procedure: &ProposalProcedure,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.record(|b| {
            b.draft.proposals.push(PendingProposal {
                procedure: procedure.clone(),
                redeemer: redeemer.cloned(),
            });
            Ok(())
        })
    }

    /// Info action; the deposit returns to `reward_account`
    pub fn propose_info(&mut self, reward_account: &StakeAddress, anchor: &Anchor) -> &mut Self {
        let procedure = self.proposal(reward_account, GovAction::Info, anchor);
        self.propose(&procedure, None)
    }

    /// Treasury withdrawal action, guarded by the constitution script
    /// `policy_hash` when there is one
    pub fn propose_treasury_withdrawals(
        &mut self,
        withdrawals: &BTreeMap<StakeAddress, Lovelace>,
        policy_hash: Option<&ScriptHash>,
        reward_account: &StakeAddress,
        anchor: &Anchor,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        let action = GovAction::TreasuryWithdrawals {
            withdrawals: withdrawals.clone(),
            policy_hash: policy_hash.copied(),
        };
        let procedure = self.proposal(reward_account, action, anchor);
        self.propose(&procedure, redeemer)
    }

    fn proposal(
        &self,
        reward_account: &StakeAddress,
        gov_action: GovAction,
        anchor: &Anchor,
    ) -> ProposalProcedure {
        ProposalProcedure {
            deposit: self.params.gov_action_deposit,
            reward_account: *reward_account,
            gov_action,
            anchor: anchor.clone(),
        }
    }

    // Withdrawals

    pub fn withdraw_rewards(
        &mut self,
        stake_address: &StakeAddress,
        amount: Lovelace,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.record(|b| {
            b.draft.withdrawals.insert(
                *stake_address,
                PendingWithdrawal {
                    amount,
                    redeemer: redeemer.cloned(),
                },
            );
            Ok(())
        })
    }

    pub fn withdraw_rewards_ex(
        &mut self,
        stake_address: &str,
        amount: Lovelace,
        redeemer: Option<&PlutusData>,
    ) -> &mut Self {
        self.record(|b| {
            let stake_address = certs::parse_stake_address(stake_address)?;
            b.draft.withdrawals.insert(
                stake_address,
                PendingWithdrawal {
                    amount,
                    redeemer: redeemer.cloned(),
                },
            );
            Ok(())
        })
    }

    // Metadata

    pub fn set_metadata(&mut self, label: MetadatumLabel, metadatum: &Metadatum) -> &mut Self {
        self.record(|b| {
            b.draft.metadata.insert(label, metadatum.clone());
            Ok(())
        })
    }

    /// Metadatum from JSON in the detailed schema
    pub fn set_metadata_ex(&mut self, label: MetadatumLabel, json: &str) -> &mut Self {
        self.record(|b| {
            b.draft.metadata.insert(label, Metadatum::from_json(json)?);
            Ok(())
        })
    }

    // Inspection

    /// The recorded error, if any intent failed
    pub fn last_error(&self) -> Option<&TxBuilderError> {
        match &self.state {
            BuilderState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn state(&self) -> &BuilderState {
        &self.state
    }

    pub fn witness_flags(&self) -> WitnessFlags {
        self.flags
    }

    pub fn mint(&self) -> &Mint {
        &self.draft.mint
    }

    pub fn draft_outputs(&self) -> &[TransactionOutput] {
        &self.draft.outputs
    }

    /// Balance the draft into a transaction. The builder is spent either
    /// way: later intents and builds fail.
    pub fn build(&mut self) -> Result<Transaction, TxBuilderError> {
        match &self.state {
            BuilderState::Failed(e) => return Err(e.clone()),
            BuilderState::Built => {
                return Err(TxBuilderError::IllegalState("transaction already built".to_string()));
            }
            BuilderState::Building => {}
        }

        info!(
            outputs = self.draft.outputs.len(),
            inputs = self.draft.inputs.len(),
            certificates = self.draft.certificates.len(),
            "Building transaction"
        );
        let draft = std::mem::take(&mut self.draft);
        let balancer = Balancer {
            params: &self.params,
            config: &self.config,
            coin_selector: self.coin_selector.as_ref(),
            evaluator: self.evaluator.as_ref(),
            provider: self.provider.as_ref(),
        };
        match balancer.balance(&draft, &self.pools) {
            Ok(tx) => {
                self.state = BuilderState::Built;
                Ok(tx)
            }
            Err(e) => {
                warn!("Transaction build failed: {e}");
                self.state = BuilderState::Failed(e.clone());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, provider::OfflineProvider};
    use portico_common::hash::Hash;
    use portico_test_utils as fixtures;

    fn builder() -> TransactionBuilder {
        let provider = Arc::new(OfflineProvider::new(fixtures::params(), 1));
        TransactionBuilder::new(fixtures::params(), provider)
    }

    #[test]
    fn first_error_sticks() {
        let mut builder = builder();
        builder
            .set_change_address_ex("not an address")
            .mint_token(&Hash::new([1; 28]), &AssetName::new(b"a").unwrap(), 0, None)
            .add_signer_ex("zz");
        assert_eq!(builder.last_error().unwrap().kind(), ErrorKind::Decoding);
        assert!(builder.mint().is_empty());
        assert_eq!(builder.build().unwrap_err().kind(), ErrorKind::Decoding);
    }

    #[test]
    fn bad_hex_and_names() {
        let mut builder = builder();
        builder.mint_token_ex("0102", "00", 1, None);
        assert_eq!(builder.last_error().unwrap().kind(), ErrorKind::Decoding);

        let mut builder = self::builder();
        builder.mint_token_ex(&"ab".repeat(28), &"00".repeat(33), 1, None);
        assert_eq!(builder.last_error().unwrap().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn locking_needs_a_script_address() {
        let mut builder = builder();
        builder.lock_lovelace(&fixtures::payment_address(), 2_000_000, None);
        assert_eq!(builder.last_error().unwrap().kind(), ErrorKind::InvalidArgument);

        let mut builder = self::builder();
        let script = fixtures::plutus_v3_script();
        let datum = Datum::Inline(PlutusData::Integer(1));
        builder.lock_lovelace(&fixtures::script_address(script.hash()), 2_000_000, Some(&datum));
        assert!(builder.last_error().is_none());
        assert_eq!(builder.draft_outputs()[0].datum, Some(datum));
    }

    #[test]
    fn intents_after_build_are_illegal() {
        let mut builder = builder();
        builder
            .set_utxos(&[fixtures::key_utxo(1, 10_000_000)])
            .set_change_address(&fixtures::change_address())
            .send_lovelace(&fixtures::payment_address(), 2_000_000);
        assert!(builder.build().is_ok());
        assert_eq!(builder.state(), &BuilderState::Built);
        assert!(builder.last_error().is_none());
        assert_eq!(builder.build().unwrap_err().kind(), ErrorKind::IllegalState);

        builder.set_minimum_fee(1);
        assert_eq!(builder.last_error().unwrap().kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn proposals_take_the_action_deposit() {
        let mut builder = builder();
        let anchor = Anchor::new("https://example.com/info.json", Hash::new([4; 32]));
        builder.propose_info(&fixtures::stake_address(), &anchor);
        let deposits = builder.draft.deposits(&builder.params).unwrap();
        assert_eq!(deposits, fixtures::params().gov_action_deposit);
    }

    #[test]
    fn reference_scripts_set_flags() {
        let mut builder = builder();
        builder.add_reference_input(&fixtures::reference_utxo(7, &fixtures::plutus_v1_script()));
        assert!(builder.witness_flags().has_plutus_v1);
        assert!(!builder.witness_flags().has_plutus_v2);
    }

    #[test]
    fn creating_a_reference_script_sets_no_flags() {
        let mut builder = builder();
        let output =
            TransactionOutput::new(fixtures::payment_address(), Value::from_lovelace(20_000_000))
                .with_script_ref(fixtures::plutus_v2_script());
        builder.add_output(&output);
        assert_eq!(builder.draft_outputs(), &[output]);
        assert!(!builder.witness_flags().any_plutus());
    }
}
