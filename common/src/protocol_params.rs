use crate::{
    rational_number::RationalNumber, script::PlutusLanguage, ExUnitPrices, ExUnits, Lovelace,
};
use anyhow::{bail, Result};
use std::collections::BTreeSet;

pub type CostModel = Vec<i64>;

/// Cost models per Plutus language
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostModels {
    #[serde(default, rename = "PlutusV1")]
    pub plutus_v1: Option<CostModel>,
    #[serde(default, rename = "PlutusV2")]
    pub plutus_v2: Option<CostModel>,
    #[serde(default, rename = "PlutusV3")]
    pub plutus_v3: Option<CostModel>,
}

impl CostModels {
    pub fn get(&self, language: PlutusLanguage) -> Option<&CostModel> {
        match language {
            PlutusLanguage::V1 => self.plutus_v1.as_ref(),
            PlutusLanguage::V2 => self.plutus_v2.as_ref(),
            PlutusLanguage::V3 => self.plutus_v3.as_ref(),
        }
    }

    /// Encode the language views committed to by the script data hash.
    ///
    /// The map is written in canonical key order: the single byte keys of
    /// V2 and V3 come before the two byte key of V1. PlutusV1 keeps the
    /// historical double encoding, with both key and value wrapped in byte
    /// strings and the cost model as an indefinite list.
    pub fn language_views(&self, languages: &BTreeSet<PlutusLanguage>) -> Result<Vec<u8>> {
        let mut ordered: Vec<PlutusLanguage> = languages.iter().copied().collect();
        ordered.sort_by_key(|l| match l {
            PlutusLanguage::V1 => 3,
            PlutusLanguage::V2 => 1,
            PlutusLanguage::V3 => 2,
        });

        let mut buffer = Vec::new();
        let mut e = minicbor::Encoder::new(&mut buffer);
        e.map(ordered.len() as u64)?;
        for language in ordered {
            let Some(model) = self.get(language) else {
                bail!("no cost model for Plutus{language:?}");
            };
            match language {
                PlutusLanguage::V1 => {
                    let mut inner = Vec::new();
                    let mut ie = minicbor::Encoder::new(&mut inner);
                    ie.begin_array()?;
                    for cost in model {
                        ie.i64(*cost)?;
                    }
                    ie.end()?;
                    e.bytes(&[0x00])?;
                    e.bytes(&inner)?;
                }
                PlutusLanguage::V2 | PlutusLanguage::V3 => {
                    e.u8(language.cost_model_key())?;
                    e.array(model.len() as u64)?;
                    for cost in model {
                        e.i64(*cost)?;
                    }
                }
            }
        }
        Ok(buffer)
    }
}

/// Protocol parameters the builder needs, in the camelCase JSON form used
/// by node queries
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolParams {
    /// Fee per byte
    #[serde(rename = "minFeeA")]
    pub min_fee_a: u64,

    /// Constant fee
    #[serde(rename = "minFeeB")]
    pub min_fee_b: u64,

    pub max_tx_size: u32,
    pub max_value_size: u32,
    pub key_deposit: Lovelace,
    pub pool_deposit: Lovelace,
    pub drep_deposit: Lovelace,
    pub gov_action_deposit: Lovelace,

    #[serde(rename = "coinsPerUTxOByte")]
    pub coins_per_utxo_byte: Lovelace,

    pub collateral_percentage: u32,
    pub max_collateral_inputs: u32,
    pub execution_prices: ExUnitPrices,
    pub max_tx_ex_units: ExUnits,

    /// Base price per byte of reference scripts, before tiering
    #[serde(with = "crate::rational_number::flexible")]
    pub min_fee_ref_script_cost_per_byte: RationalNumber,

    #[serde(default)]
    pub cost_models: CostModels,
}

impl Default for ProtocolParams {
    /// Mainnet values at the start of the Conway era
    fn default() -> Self {
        Self {
            min_fee_a: 44,
            min_fee_b: 155_381,
            max_tx_size: 16_384,
            max_value_size: 5_000,
            key_deposit: 2_000_000,
            pool_deposit: 500_000_000,
            drep_deposit: 500_000_000,
            gov_action_deposit: 100_000_000_000,
            coins_per_utxo_byte: 4_310,
            collateral_percentage: 150,
            max_collateral_inputs: 3,
            execution_prices: ExUnitPrices::default(),
            max_tx_ex_units: ExUnits::new(14_000_000, 10_000_000_000),
            min_fee_ref_script_cost_per_byte: RationalNumber::from_integer(15),
            cost_models: CostModels::default(),
        }
    }
}

impl ProtocolParams {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_node_style_json() -> Result<()> {
        let params = ProtocolParams::from_json(
            r#"{
                "minFeeA": 44, "minFeeB": 155381, "maxTxSize": 16384,
                "maxValueSize": 5000, "keyDeposit": 2000000,
                "poolDeposit": 500000000, "drepDeposit": 500000000,
                "govActionDeposit": 100000000000, "coinsPerUTxOByte": 4310,
                "collateralPercentage": 150, "maxCollateralInputs": 3,
                "executionPrices": {
                    "memPrice": [577, 10000],
                    "stepPrice": {"numerator": 721, "denominator": 10000000}
                },
                "maxTxExUnits": {"mem": 14000000, "steps": 10000000000},
                "minFeeRefScriptCostPerByte": 15,
                "costModels": {"PlutusV2": [1, 2, 3]}
            }"#,
        )?;
        assert_eq!(params.min_fee_b, 155_381);
        assert_eq!(params.execution_prices, ExUnitPrices::default());
        assert_eq!(params.cost_models.plutus_v2, Some(vec![1, 2, 3]));
        assert_eq!(params.cost_models.plutus_v1, None);
        Ok(())
    }

    #[test]
    fn language_views_in_canonical_order() -> Result<()> {
        let models = CostModels {
            plutus_v1: Some(vec![1]),
            plutus_v2: Some(vec![2]),
            plutus_v3: None,
        };
        let languages = BTreeSet::from([PlutusLanguage::V1, PlutusLanguage::V2]);
        assert_eq!(
            models.language_views(&languages)?,
            vec![
                0xa2, // map(2)
                0x01, 0x81, 0x02, // V2: [2]
                0x41, 0x00, // V1 key as bytes(0x00)
                0x43, 0x9f, 0x01, 0xff, // V1 value as bytes of [_ 1]
            ]
        );
        assert!(models.language_views(&BTreeSet::from([PlutusLanguage::V3])).is_err());
        Ok(())
    }
}
