//! Input selection

use portico_common::{Utxo, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinSelectionError {
    /// The candidates cannot cover the target
    #[error("inputs exhausted, {0:?} still missing")]
    InputsExhausted(Value),
}

/// Outcome of a selection round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoinSelection {
    /// Newly chosen UTxOs, not including the pre-selected ones
    pub selected: Vec<Utxo>,
    /// Candidates left untouched
    pub remaining: Vec<Utxo>,
}

impl CoinSelection {
    pub fn selected_value(&self) -> Value {
        Value::sum(self.selected.iter().map(Utxo::value))
    }
}

/// Strategy picking inputs for a target value.
///
/// `pre_selected` UTxOs are already spent by the transaction and count
/// towards the target; `available` must not contain any of them.
pub trait CoinSelector: Send + Sync {
    fn select(
        &self,
        pre_selected: &[Utxo],
        available: &[Utxo],
        target: &Value,
    ) -> Result<CoinSelection, CoinSelectionError>;
}

/// Largest first over each asset in turn, then over lovelace.
///
/// Candidates are ordered by descending quantity of the thing being
/// covered; ties fall back to the UTxO id so a given pool always yields the
/// same selection.
#[derive(Debug, Default, Clone, Copy)]
pub struct LargeFirstCoinSelector;

impl LargeFirstCoinSelector {
    fn cover_by<F>(
        candidates: &mut Vec<Utxo>,
        selected: &mut Vec<Utxo>,
        total: &mut Value,
        needed: u64,
        by: F,
    ) where
        F: Fn(&Value) -> u64,
    {
        candidates.sort_by(|a, b| by(b.value()).cmp(&by(a.value())).then(a.input.cmp(&b.input)));
        while by(&*total) < needed {
            let Some(pos) = candidates.iter().position(|u| by(u.value()) > 0) else {
                return;
            };
            let utxo = candidates.remove(pos);
            *total += utxo.value();
            selected.push(utxo);
        }
    }
}

impl CoinSelector for LargeFirstCoinSelector {
    fn select(
        &self,
        pre_selected: &[Utxo],
        available: &[Utxo],
        target: &Value,
    ) -> Result<CoinSelection, CoinSelectionError> {
        let mut total = Value::sum(pre_selected.iter().map(Utxo::value));
        let mut candidates = available.to_vec();
        let mut selected = Vec::new();

        for (policy, assets) in &target.assets {
            for (name, quantity) in assets {
                Self::cover_by(&mut candidates, &mut selected, &mut total, *quantity, |v| {
                    v.asset_quantity(policy, name)
                });
            }
        }
        Self::cover_by(&mut candidates, &mut selected, &mut total, target.lovelace, |v| {
            v.lovelace
        });

        if !total.covers(target) {
            return Err(CoinSelectionError::InputsExhausted(target.saturating_sub(&total)));
        }

        candidates.sort_by(|a, b| a.input.cmp(&b.input));
        debug!(
            selected = selected.len(),
            remaining = candidates.len(),
            "coin selection complete"
        );
        Ok(CoinSelection {
            selected,
            remaining: candidates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_common::{
        hash::Hash, Address, AssetName, PolicyId, TransactionOutput, UTxOIdentifier,
    };

    fn utxo(tag: u8, value: Value) -> Utxo {
        Utxo::new(
            UTxOIdentifier::new(Hash::new([tag; 32]), 0),
            TransactionOutput::new(Address::None, value),
        )
    }

    fn token() -> (PolicyId, AssetName) {
        (Hash::new([7; 28]), AssetName::new(b"tok").unwrap())
    }

    #[test]
    fn picks_largest_lovelace_first() {
        let pool = vec![
            utxo(1, Value::from_lovelace(1_000_000)),
            utxo(2, Value::from_lovelace(9_000_000)),
            utxo(3, Value::from_lovelace(4_000_000)),
        ];
        let selection =
            LargeFirstCoinSelector.select(&[], &pool, &Value::from_lovelace(10_000_000)).unwrap();
        assert_eq!(selection.selected.len(), 2);
        assert_eq!(selection.selected[0].input.tx_hash, Hash::new([2; 32]));
        assert_eq!(selection.selected[1].input.tx_hash, Hash::new([3; 32]));
        assert_eq!(selection.remaining.len(), 1);
    }

    #[test]
    fn pre_selected_counts_towards_target() {
        let pinned = vec![utxo(9, Value::from_lovelace(5_000_000))];
        let pool = vec![utxo(1, Value::from_lovelace(1_000_000))];
        let selection =
            LargeFirstCoinSelector.select(&pinned, &pool, &Value::from_lovelace(4_000_000)).unwrap();
        assert!(selection.selected.is_empty());
        assert_eq!(selection.remaining.len(), 1);
    }

    #[test]
    fn covers_assets_before_lovelace() {
        let (policy, name) = token();
        let pool = vec![
            utxo(1, Value::from_lovelace(50_000_000)),
            utxo(2, Value::from_lovelace(2_000_000).with_asset(policy, name, 10)),
        ];
        let target = Value::from_lovelace(1_000_000).with_asset(policy, name, 5);
        let selection = LargeFirstCoinSelector.select(&[], &pool, &target).unwrap();
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected_value().asset_quantity(&policy, &name), 10);
    }

    #[test]
    fn ties_break_on_utxo_id() {
        let pool = vec![
            utxo(5, Value::from_lovelace(3_000_000)),
            utxo(4, Value::from_lovelace(3_000_000)),
        ];
        let selection =
            LargeFirstCoinSelector.select(&[], &pool, &Value::from_lovelace(1)).unwrap();
        assert_eq!(selection.selected[0].input.tx_hash, Hash::new([4; 32]));
    }

    #[test]
    fn reports_what_is_missing() {
        let (policy, name) = token();
        let pool = vec![utxo(1, Value::from_lovelace(2_000_000))];
        let target = Value::from_lovelace(1_000_000).with_asset(policy, name, 1);
        let Err(CoinSelectionError::InputsExhausted(missing)) =
            LargeFirstCoinSelector.select(&[], &pool, &target)
        else {
            panic!("selection should fail");
        };
        assert_eq!(missing.lovelace, 0);
        assert_eq!(missing.asset_quantity(&policy, &name), 1);
    }
}
