use std::{collections::BTreeMap, fs, path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use config::{Config, File};
use portico_common::{
    Address, AssetId, TransactionOutput, UTxOIdentifier, Utxo, Value,
    genesis_values::MAINNET_MAGIC, protocol_params::ProtocolParams,
};
use portico_module_tx_builder::{BuilderConfig, OfflineProvider, TransactionBuilder};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer as _, Registry, filter, fmt, layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};

fn default_config_path() -> PathBuf {
    PathBuf::from(option_env!("PORTICO_TX_BUILDER_DEFAULT_CONFIG").unwrap_or("tx-builder.toml"))
}

#[derive(clap::Parser, Clone)]
struct Args {
    /// Path to configuration.
    #[arg(long, default_value = default_config_path().into_os_string())]
    config: PathBuf,
    /// Protocol parameters as JSON.
    #[arg(long)]
    params: PathBuf,
    /// Spendable UTxOs as JSON, keyed by `<tx hash>#<index>`.
    #[arg(long)]
    utxos: PathBuf,
    /// Address receiving the change.
    #[arg(long)]
    change_address: String,
    /// Payment as `<address>=<lovelace>`; may be repeated.
    #[arg(long = "send")]
    payments: Vec<String>,
    /// Unix time after which the transaction is invalid.
    #[arg(long)]
    valid_until: Option<u64>,
}

#[derive(Debug, serde::Deserialize)]
struct UtxoJson {
    address: String,
    lovelace: u64,
    /// Quantities keyed by hex asset id
    #[serde(default)]
    assets: BTreeMap<String, u64>,
}

impl UtxoJson {
    fn into_utxo(self, id: &str) -> Result<Utxo> {
        let input: UTxOIdentifier = id.parse()?;
        let address =
            Address::from_string(&self.address).with_context(|| format!("address of {id}"))?;
        let mut value = Value::from_lovelace(self.lovelace);
        for (asset, quantity) in &self.assets {
            let asset: AssetId = asset.parse()?;
            value = value.with_asset(asset.policy_id, asset.asset_name, *quantity);
        }
        Ok(Utxo::new(input, TransactionOutput::new(address, value)))
    }
}

fn read_utxos(text: &str) -> Result<Vec<Utxo>> {
    let utxos: BTreeMap<String, UtxoJson> = serde_json::from_str(text)?;
    utxos.into_iter().map(|(id, utxo)| utxo.into_utxo(&id)).collect()
}

fn parse_payment(payment: &str) -> Result<(String, u64)> {
    let (address, lovelace) = payment
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("payment '{payment}' is not <address>=<lovelace>"))?;
    Ok((address.to_string(), lovelace.parse()?))
}

pub fn main() -> Result<()> {
    let args = Args::try_parse()?;

    // Standard logging using RUST_LOG for log levels default to INFO for events only
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env().add_directive(filter::LevelFilter::INFO.into()))
        .with_filter(filter::filter_fn(|meta| meta.is_event()));
    Registry::default().with(fmt_layer).init();

    let config = Config::builder().add_source(File::from(args.config.as_path())).build()?;
    let builder_config = BuilderConfig::parse(&config)?;
    let params = ProtocolParams::from_json(&fs::read_to_string(&args.params)?)?;
    let utxos = read_utxos(&fs::read_to_string(&args.utxos)?)?;
    info!(utxos = utxos.len(), "Loaded spendable outputs");

    let magic = builder_config.network_magic.unwrap_or(MAINNET_MAGIC);
    let provider = OfflineProvider::new(params.clone(), magic).with_utxos(utxos.clone());
    let mut builder =
        TransactionBuilder::new_with_config(params, Arc::new(provider), builder_config);
    builder.set_utxos(&utxos).set_change_address_ex(&args.change_address);
    for payment in &args.payments {
        let (address, lovelace) = parse_payment(payment)?;
        builder.send_lovelace_ex(&address, lovelace);
    }
    if let Some(timestamp) = args.valid_until {
        builder.set_invalid_after_ex(timestamp);
    }

    let tx = builder.build()?;
    info!(id = %tx.id(), fee = tx.body.fee, "Built transaction");
    println!("{}", hex::encode(tx.to_cbor()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payments_split_on_last_equals() {
        let (address, lovelace) = parse_payment("addr_test1xyz=2000000").unwrap();
        assert_eq!(address, "addr_test1xyz");
        assert_eq!(lovelace, 2_000_000);
        assert!(parse_payment("addr_test1xyz").is_err());
        assert!(parse_payment("addr_test1xyz=lots").is_err());
    }

    #[test]
    fn utxo_file_rejects_bad_ids() {
        let text = r#"{"nothex#0": {"address": "addr_test1xyz", "lovelace": 1}}"#;
        assert!(read_utxos(text).is_err());
        assert!(read_utxos("{}").unwrap().is_empty());
    }
}
