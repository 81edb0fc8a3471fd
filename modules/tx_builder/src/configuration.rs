use anyhow::Result;
use config::Config;
use portico_common::Lovelace;

const DEFAULT_MAX_BALANCE_ITERATIONS: u32 = 10;

/// Tunables for a builder, read from the `[tx-builder]` style config table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Upper bound on select / evaluate / re-fee rounds
    pub max_balance_iterations: u32,

    /// Network magic used for slot conversion. Falls back to the provider.
    pub network_magic: Option<u32>,

    /// Extra lovelace required on top of the collateral percentage
    pub collateral_margin: Lovelace,

    /// Ask the provider to evaluate scripts. When disabled, each redeemer
    /// is given an even share of the transaction budget.
    pub enable_evaluation: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_balance_iterations: DEFAULT_MAX_BALANCE_ITERATIONS,
            network_magic: None,
            collateral_margin: 0,
            enable_evaluation: true,
        }
    }
}

impl BuilderConfig {
    pub fn parse(config: &Config) -> Result<Self> {
        let max_balance_iterations = config
            .get("max-balance-iterations")
            .unwrap_or(DEFAULT_MAX_BALANCE_ITERATIONS);
        if max_balance_iterations == 0 {
            anyhow::bail!("max-balance-iterations must be at least 1");
        }
        let network_magic = config.get("network-magic").ok();
        let collateral_margin = config.get("collateral-margin").unwrap_or(0);
        let enable_evaluation = config.get_bool("enable-evaluation").unwrap_or(true);
        Ok(Self {
            max_balance_iterations,
            network_magic,
            collateral_margin,
            enable_evaluation,
        })
    }
}
