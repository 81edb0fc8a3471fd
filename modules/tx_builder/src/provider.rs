//! Chain access used by the builder

use std::{collections::BTreeMap, time::Duration};

use anyhow::{Result, bail};
use portico_common::{
    protocol_params::ProtocolParams, tx::Transaction, Address, AssetId, DatumHash, ExUnits,
    Lovelace, PlutusData, RedeemerPointer, StakeAddress, TxHash, UTxOIdentifier, Utxo,
};

/// Source of chain state and the place transactions are sent to.
///
/// Implementations are free to block. The builder only calls
/// `get_network_magic`, `resolve_datum` and `evaluate_transaction` itself;
/// the remaining queries exist for callers assembling UTxO pools and
/// submitting what was built.
pub trait Provider: Send + Sync {
    fn get_parameters(&self) -> Result<ProtocolParams>;

    fn get_network_magic(&self) -> Result<u32>;

    fn get_unspent_outputs(&self, address: &Address) -> Result<Vec<Utxo>>;

    fn get_unspent_outputs_with_asset(&self, address: &Address, asset: &AssetId)
    -> Result<Vec<Utxo>>;

    /// The single output holding an NFT, if it exists
    fn get_unspent_output_by_nft(&self, asset: &AssetId) -> Result<Option<Utxo>>;

    fn resolve_unspent_outputs(&self, inputs: &[UTxOIdentifier]) -> Result<Vec<Utxo>>;

    fn resolve_datum(&self, hash: &DatumHash) -> Result<Option<PlutusData>>;

    /// Execution units per redeemer for `tx`, given every UTxO it spends or
    /// references
    fn evaluate_transaction(
        &self,
        tx: &Transaction,
        utxos: &[Utxo],
    ) -> Result<Vec<(RedeemerPointer, ExUnits)>>;

    fn get_rewards_balance(&self, account: &StakeAddress) -> Result<Lovelace>;

    fn post_transaction_to_chain(&self, tx_cbor: &[u8]) -> Result<TxHash>;

    /// True once `tx_id` is on chain, false when `timeout` elapses first
    fn await_transaction_confirmation(&self, tx_id: &TxHash, timeout: Duration) -> Result<bool>;
}

/// Provider over a fixed set of chain data, for building without a node.
///
/// It answers UTxO queries from what it was given, evaluates every redeemer
/// to a fixed budget when one is configured and refuses to submit.
#[derive(Debug, Clone, Default)]
pub struct OfflineProvider {
    params: ProtocolParams,
    network_magic: u32,
    utxos: Vec<Utxo>,
    datums: BTreeMap<DatumHash, PlutusData>,
    rewards: BTreeMap<StakeAddress, Lovelace>,
    budget: Option<ExUnits>,
}

impl OfflineProvider {
    pub fn new(params: ProtocolParams, network_magic: u32) -> Self {
        Self {
            params,
            network_magic,
            ..Default::default()
        }
    }

    pub fn with_utxos(mut self, utxos: impl IntoIterator<Item = Utxo>) -> Self {
        self.utxos.extend(utxos);
        self
    }

    pub fn with_datum(mut self, datum: PlutusData) -> Self {
        self.datums.insert(datum.hash(), datum);
        self
    }

    pub fn with_rewards(mut self, account: StakeAddress, amount: Lovelace) -> Self {
        self.rewards.insert(account, amount);
        self
    }

    /// Budget reported for every redeemer by `evaluate_transaction`
    pub fn with_budget(mut self, budget: ExUnits) -> Self {
        self.budget = Some(budget);
        self
    }
}

impl Provider for OfflineProvider {
    fn get_parameters(&self) -> Result<ProtocolParams> {
        Ok(self.params.clone())
    }

    fn get_network_magic(&self) -> Result<u32> {
        Ok(self.network_magic)
    }

    fn get_unspent_outputs(&self, address: &Address) -> Result<Vec<Utxo>> {
        Ok(self.utxos.iter().filter(|u| &u.output.address == address).cloned().collect())
    }

    fn get_unspent_outputs_with_asset(
        &self,
        address: &Address,
        asset: &AssetId,
    ) -> Result<Vec<Utxo>> {
        Ok(self
            .get_unspent_outputs(address)?
            .into_iter()
            .filter(|u| u.value().asset_quantity(&asset.policy_id, &asset.asset_name) > 0)
            .collect())
    }

    fn get_unspent_output_by_nft(&self, asset: &AssetId) -> Result<Option<Utxo>> {
        let mut holders = self
            .utxos
            .iter()
            .filter(|u| u.value().asset_quantity(&asset.policy_id, &asset.asset_name) > 0);
        let Some(holder) = holders.next() else {
            return Ok(None);
        };
        if holders.next().is_some() {
            bail!("asset {asset} is held by more than one output");
        }
        Ok(Some(holder.clone()))
    }

    fn resolve_unspent_outputs(&self, inputs: &[UTxOIdentifier]) -> Result<Vec<Utxo>> {
        inputs
            .iter()
            .map(|input| match self.utxos.iter().find(|u| &u.input == input) {
                Some(utxo) => Ok(utxo.clone()),
                None => bail!("unknown output {input}"),
            })
            .collect()
    }

    fn resolve_datum(&self, hash: &DatumHash) -> Result<Option<PlutusData>> {
        Ok(self.datums.get(hash).cloned())
    }

    fn evaluate_transaction(
        &self,
        tx: &Transaction,
        _utxos: &[Utxo],
    ) -> Result<Vec<(RedeemerPointer, ExUnits)>> {
        let Some(budget) = self.budget else {
            bail!("offline provider has no script evaluator");
        };
        Ok(tx.witness_set.redeemers.iter().map(|r| (r.redeemer_pointer(), budget)).collect())
    }

    fn get_rewards_balance(&self, account: &StakeAddress) -> Result<Lovelace> {
        Ok(self.rewards.get(account).copied().unwrap_or(0))
    }

    fn post_transaction_to_chain(&self, _tx_cbor: &[u8]) -> Result<TxHash> {
        bail!("offline provider cannot submit transactions")
    }

    fn await_transaction_confirmation(&self, tx_id: &TxHash, _timeout: Duration) -> Result<bool> {
        bail!("offline provider cannot follow transaction {tx_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_common::{AssetName, Value};
    use portico_test_utils as fixtures;

    #[test]
    fn nft_lookup_needs_a_single_holder() {
        let policy = fixtures::policy_id(4);
        let name = AssetName::new(b"nft").unwrap();
        let asset = AssetId::new(policy, name);
        let holder = fixtures::key_utxo_with(
            1,
            Value::from_lovelace(2_000_000).with_asset(policy, name, 1),
        );
        let provider = OfflineProvider::new(ProtocolParams::default(), 1)
            .with_utxos([holder.clone(), fixtures::key_utxo(2, 5_000_000)]);
        assert_eq!(provider.get_unspent_output_by_nft(&asset).unwrap(), Some(holder.clone()));
        assert_eq!(
            provider.get_unspent_outputs_with_asset(&fixtures::payment_address(), &asset).unwrap(),
            vec![holder.clone()]
        );

        let twice = provider.with_utxos([fixtures::key_utxo_with(3, holder.output.value.clone())]);
        assert!(twice.get_unspent_output_by_nft(&asset).is_err());
    }

    #[test]
    fn resolves_known_outputs_only() {
        let utxo = fixtures::key_utxo(1, 5_000_000);
        let provider = OfflineProvider::default().with_utxos([utxo.clone()]);
        assert_eq!(provider.resolve_unspent_outputs(&[utxo.input]).unwrap(), vec![utxo]);
        assert!(provider.resolve_unspent_outputs(&[fixtures::key_utxo(2, 1).input]).is_err());
        assert!(provider.post_transaction_to_chain(&[]).is_err());
    }
}
