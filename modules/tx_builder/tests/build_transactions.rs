//! End to end builds through the public builder API

use std::sync::Arc;

use pallas::ledger::traverse::{Era, MultiEraTx};
use portico_common::{
    genesis_values::MAINNET_MAGIC, tx::Transaction, AssetName, ExUnits, Lovelace, PlutusData,
    RedeemerTag, Utxo, Value,
};
use portico_module_tx_builder::{
    fee, BuilderConfig, BuilderState, ErrorKind, OfflineProvider, TransactionBuilder,
};
use portico_test_utils as fixtures;

fn builder_with(provider: OfflineProvider) -> TransactionBuilder {
    TransactionBuilder::new(fixtures::params(), Arc::new(provider))
}

fn preprod_builder() -> TransactionBuilder {
    builder_with(OfflineProvider::new(fixtures::params(), 1))
}

fn spent(tx: &Transaction, pools: &[&[Utxo]]) -> Value {
    Value::sum(
        pools
            .iter()
            .flat_map(|pool| pool.iter())
            .filter(|utxo| tx.body.inputs.contains(&utxo.input))
            .map(Utxo::value),
    )
}

fn produced(tx: &Transaction) -> Value {
    Value::sum(tx.body.outputs.iter().map(|o| &o.value))
}

#[test]
fn change_only_transaction() {
    let pool = [fixtures::key_utxo(1, 10_000_000)];
    let mut builder = preprod_builder();
    builder.set_utxos(&pool).set_change_address(&fixtures::change_address());
    let tx = builder.build().unwrap();

    assert_eq!(tx.body.outputs.len(), 1);
    assert_eq!(tx.body.outputs[0].address, fixtures::change_address());
    assert_eq!(tx.body.outputs[0].value.lovelace + tx.body.fee, 10_000_000);

    // One key witness was priced in and then removed
    let params = fixtures::params();
    assert!(tx.body.fee > fee::linear_fee(&params, tx.size()));
    assert!(tx.body.fee <= fee::linear_fee(&params, tx.size() + 128));
}

#[test]
fn output_above_pool_is_insufficient() {
    let mut builder = preprod_builder();
    builder
        .set_utxos(&[fixtures::key_utxo(1, 3_000_000)])
        .set_change_address(&fixtures::change_address())
        .send_lovelace(&fixtures::payment_address(), 5_000_000);
    let err = builder.build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BalanceInsufficient);
    assert!(matches!(builder.state(), BuilderState::Failed(_)));
}

#[test]
fn unix_time_maps_to_mainnet_slot() {
    let mut builder = builder_with(OfflineProvider::new(fixtures::params(), MAINNET_MAGIC));
    builder
        .set_utxos(&[fixtures::key_utxo(1, 10_000_000)])
        .set_change_address(&fixtures::change_address())
        .set_invalid_after_ex(1_730_901_968);
    let tx = builder.build().unwrap();
    assert_eq!(tx.body.ttl, Some(139_335_677));
}

#[test]
fn configured_network_magic_wins() {
    let config = BuilderConfig {
        network_magic: Some(MAINNET_MAGIC),
        ..Default::default()
    };
    let mut builder = TransactionBuilder::new_with_config(
        fixtures::params(),
        Arc::new(OfflineProvider::new(fixtures::params(), 1)),
        config,
    );
    builder
        .set_utxos(&[fixtures::key_utxo(1, 10_000_000)])
        .set_change_address(&fixtures::change_address())
        .set_invalid_before_ex(1_730_901_968);
    assert_eq!(builder.build().unwrap().body.validity_start, Some(139_335_677));
}

#[test]
fn repeated_mints_accumulate() {
    let policy = fixtures::native_script().hash();
    let name = AssetName::new(b"coin").unwrap();
    let mut builder = preprod_builder();
    builder.mint_token(&policy, &name, 4, None).mint_token(&policy, &name, 4, None);
    assert_eq!(builder.mint()[&policy][&name], 8);
    assert!(builder.last_error().is_none());
}

#[test]
fn script_input_without_collateral_is_rejected() {
    let script = fixtures::plutus_v3_script();
    let locked = fixtures::script_utxo(9, &script, 5_000_000, None);
    let mut builder = preprod_builder();
    builder
        .set_utxos(&[fixtures::key_utxo(1, 10_000_000)])
        .set_change_address(&fixtures::change_address())
        .add_script(&script)
        .add_input(&locked, Some(&PlutusData::unit()), None);
    assert_eq!(builder.last_error().unwrap().kind(), ErrorKind::PointerIsNull);
    assert_eq!(builder.build().unwrap_err().kind(), ErrorKind::PointerIsNull);
}

#[test]
fn every_script_kind_is_witnessed_once() {
    let scripts = [
        fixtures::plutus_v1_script(),
        fixtures::plutus_v2_script(),
        fixtures::plutus_v3_script(),
        fixtures::native_script(),
    ];
    let mut builder = preprod_builder();
    builder
        .set_utxos(&[fixtures::key_utxo(1, 10_000_000)])
        .set_change_address(&fixtures::change_address());
    for script in &scripts {
        builder.add_script(script).add_script(script);
    }
    let flags = builder.witness_flags();
    assert!(flags.has_plutus_v1 && flags.has_plutus_v2 && flags.has_plutus_v3);

    let tx = builder.build().unwrap();
    assert_eq!(tx.witness_set.plutus_v1_scripts.len(), 1);
    assert_eq!(tx.witness_set.plutus_v2_scripts.len(), 1);
    assert_eq!(tx.witness_set.plutus_v3_scripts.len(), 1);
    assert_eq!(tx.witness_set.native_scripts.len(), 1);
}

#[test]
fn value_is_conserved_across_mint_withdrawal_and_refund() {
    let params = fixtures::params();
    let policy = fixtures::native_script().hash();
    let name = AssetName::new(b"coin").unwrap();
    let pool = [fixtures::key_utxo(1, 3_000_000), fixtures::key_utxo(2, 5_000_000)];

    let mut builder = preprod_builder();
    builder
        .set_utxos(&pool)
        .set_change_address(&fixtures::change_address())
        .send_lovelace(&fixtures::payment_address(), 6_000_000)
        .add_script(&fixtures::native_script())
        .mint_token(&policy, &name, 100, None)
        .withdraw_rewards(&fixtures::stake_address(), 1_500_000, None)
        .deregister_reward_address(&fixtures::stake_address(), None);
    let tx = builder.build().unwrap();

    let mut consumed = spent(&tx, &[&pool[..]]);
    consumed.lovelace += 1_500_000 + params.key_deposit;
    consumed = consumed.with_asset(policy, name, 100);
    let mut outgoing = produced(&tx);
    outgoing.lovelace += tx.body.fee;
    assert_eq!(consumed, outgoing);
    assert_eq!(tx.body.outputs.last().unwrap().value.asset_quantity(&policy, &name), 100);
    assert_eq!(tx.body.withdrawals.len(), 1);
}

#[test]
fn burning_and_registration_are_paid_for() {
    let params = fixtures::params();
    let policy = fixtures::native_script().hash();
    let name = AssetName::new(b"coin").unwrap();
    let holder = fixtures::key_utxo_with(1, Value::from_lovelace(6_000_000).with_asset(policy, name, 10));

    let mut builder = preprod_builder();
    builder
        .set_utxos(&[holder.clone(), fixtures::key_utxo(2, 2_000_000)])
        .set_change_address(&fixtures::change_address())
        .add_script(&fixtures::native_script())
        .mint_token(&policy, &name, -10, None)
        .register_reward_address(&fixtures::stake_address(), None);
    let tx = builder.build().unwrap();

    assert!(tx.body.inputs.contains(&holder.input));
    let pool = [holder, fixtures::key_utxo(2, 2_000_000)];
    let consumed = spent(&tx, &[&pool[..]]);
    let outgoing = produced(&tx).lovelace + tx.body.fee + params.key_deposit;
    assert_eq!(consumed.lovelace, outgoing);
    assert!(!produced(&tx).has_assets());
}

fn script_spend(budget: ExUnits) -> (TransactionBuilder, Utxo) {
    let script = fixtures::plutus_v3_script();
    let locked = fixtures::script_utxo(9, &script, 5_000_000, None);
    let mut builder = builder_with(OfflineProvider::new(fixtures::params(), 1).with_budget(budget));
    builder
        .set_utxos(&[fixtures::key_utxo(1, 10_000_000)])
        .set_collateral_utxos(&[fixtures::key_utxo(8, 5_000_000)])
        .set_collateral_change_address(&fixtures::change_address())
        .set_change_address(&fixtures::change_address())
        .send_lovelace(&fixtures::payment_address(), 8_000_000)
        .add_script(&script)
        .add_input(&locked, Some(&PlutusData::unit()), None);
    (builder, locked)
}

#[test]
fn script_spend_is_collateralised_and_paired() {
    let budget = ExUnits::new(2_000_000, 700_000_000);
    let (mut builder, locked) = script_spend(budget);
    let tx = builder.build().unwrap();

    // Key input sorts before the script input
    let position = tx.body.inputs.iter().position(|input| *input == locked.input).unwrap();
    assert_eq!(position, 1);
    assert_eq!(tx.witness_set.redeemers.len(), 1);
    let redeemer = &tx.witness_set.redeemers[0];
    assert_eq!((redeemer.tag, redeemer.index), (RedeemerTag::Spend, 1));
    assert_eq!(redeemer.ex_units, budget);

    assert!(tx.body.script_data_hash.is_some());
    assert_eq!(tx.body.collateral.len(), 1);
    let total = tx.body.total_collateral.unwrap();
    assert!(total >= fee::required_collateral(&fixtures::params(), tx.body.fee));
    let returned: Lovelace = tx.body.collateral_return.as_ref().unwrap().value.lovelace;
    assert_eq!(total + returned, 5_000_000);
    assert!(tx.body.fee >= fee::script_fee(&fixtures::params().execution_prices, budget));
}

#[test]
fn builds_are_deterministic() {
    let budget = ExUnits::new(1_000_000, 400_000_000);
    let (mut first, _) = script_spend(budget);
    let (mut second, _) = script_spend(budget);
    assert_eq!(first.build().unwrap().to_cbor(), second.build().unwrap().to_cbor());
}

#[test]
fn output_decodes_as_conway_transaction() {
    let pool = [fixtures::key_utxo(1, 10_000_000), fixtures::key_utxo(2, 3_000_000)];
    let mut builder = preprod_builder();
    builder
        .set_utxos(&pool)
        .set_change_address(&fixtures::change_address())
        .send_lovelace(&fixtures::payment_address(), 4_000_000)
        .set_invalid_after(90_000_000)
        .set_metadata_ex(674, r#"{"msg": ["portico"]}"#);
    let tx = builder.build().unwrap();
    assert!(tx.body.auxiliary_data_hash.is_some());

    let cbor = tx.to_cbor();
    let decoded = MultiEraTx::decode_for_era(Era::Conway, &cbor).unwrap();
    assert_eq!(decoded.fee(), Some(tx.body.fee));
    assert_eq!(decoded.inputs().len(), tx.body.inputs.len());
    assert_eq!(decoded.outputs().len(), 2);
    assert_eq!(decoded.ttl(), Some(90_000_000));
    assert_eq!(decoded.hash().to_string(), tx.id().to_string());
}

#[test]
fn script_transaction_decodes_as_conway_transaction() {
    let (mut builder, _) = script_spend(ExUnits::new(1_000_000, 400_000_000));
    let tx = builder.build().unwrap();
    let cbor = tx.to_cbor();
    let decoded = MultiEraTx::decode_for_era(Era::Conway, &cbor).unwrap();
    assert_eq!(decoded.redeemers().len(), 1);
    assert_eq!(decoded.collateral().len(), 1);
}
