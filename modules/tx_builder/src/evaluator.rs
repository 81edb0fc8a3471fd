use std::sync::Arc;

use portico_common::{tx::Transaction, ExUnits, RedeemerPointer, Utxo};
use tracing::debug;

use crate::{error::TxBuilderError, provider::Provider};

/// Computes the execution budget of every redeemer in a transaction
pub trait TxEvaluator: Send + Sync {
    fn evaluate(
        &self,
        tx: &Transaction,
        utxos: &[Utxo],
    ) -> Result<Vec<(RedeemerPointer, ExUnits)>, TxBuilderError>;
}

/// Evaluator that hands the transaction to the provider
pub struct ProviderEvaluator {
    provider: Arc<dyn Provider>,
}

impl ProviderEvaluator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

impl TxEvaluator for ProviderEvaluator {
    fn evaluate(
        &self,
        tx: &Transaction,
        utxos: &[Utxo],
    ) -> Result<Vec<(RedeemerPointer, ExUnits)>, TxBuilderError> {
        let units = self
            .provider
            .evaluate_transaction(tx, utxos)
            .map_err(|e| TxBuilderError::Evaluation(format!("{e:#}")))?;
        debug!(redeemers = units.len(), "provider evaluated transaction");
        Ok(units)
    }
}
