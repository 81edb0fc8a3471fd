//! Certificates, withdrawals, votes and proposals through the public builder API

use std::{collections::BTreeMap, sync::Arc};

use portico_common::{
    certificate::TxCertificate,
    drep::{drep_credential_to_bech32, Anchor},
    governance::{GovActionId, Vote, Voter, VotingProcedure},
    hash::Hash,
    serialization::encode_bech32,
    tx::Transaction,
    AssetName, Credential, ExUnits, Lovelace, PlutusData, PoolId, RedeemerTag, Utxo, Value,
};
use portico_module_tx_builder::{fee, ErrorKind, OfflineProvider, TransactionBuilder};
use portico_test_utils as fixtures;
use test_case::test_case;

fn builder_with_budget(budget: ExUnits) -> TransactionBuilder {
    let provider = OfflineProvider::new(fixtures::params(), 1).with_budget(budget);
    TransactionBuilder::new(fixtures::params(), Arc::new(provider))
}

fn builder() -> TransactionBuilder {
    let provider = OfflineProvider::new(fixtures::params(), 1);
    TransactionBuilder::new(fixtures::params(), Arc::new(provider))
}

fn anchor() -> Anchor {
    Anchor::new("https://example.com/anchor.json", Hash::new([4; 32]))
}

fn pool_id() -> PoolId {
    PoolId::new(Hash::new([1; 28]))
}

fn stake_text() -> String {
    fixtures::stake_address().to_string().unwrap()
}

fn pool_text() -> String {
    encode_bech32("pool", &[1; 28]).unwrap()
}

fn drep_credential() -> Credential {
    Credential::AddrKeyHash(Hash::new([0x55; 28]))
}

fn drep_text() -> String {
    drep_credential_to_bech32(&drep_credential()).unwrap()
}

/// Well formed bech32 that is not a reward address
fn short_stake_text() -> String {
    encode_bech32("stake_test", &[0xe0; 20]).unwrap()
}

fn spent(tx: &Transaction, pool: &[Utxo]) -> Lovelace {
    pool.iter()
        .filter(|utxo| tx.body.inputs.contains(&utxo.input))
        .map(|utxo| utxo.value().lovelace)
        .sum()
}

fn produced(tx: &Transaction) -> Lovelace {
    tx.body.outputs.iter().map(|o| o.value.lovelace).sum::<Lovelace>() + tx.body.fee
}

#[test]
fn every_script_purpose_gets_its_redeemer() {
    let params = fixtures::params();
    let script = fixtures::plutus_v3_script();
    let script_stake = fixtures::script_stake_address(&script);
    let name = AssetName::new(b"gov").unwrap();
    let redeemer = PlutusData::unit();
    let budget = ExUnits::new(1_000_000, 400_000_000);
    let pool = [fixtures::key_utxo(1, 150_000_000_000)];
    let committee = Voter::ConstitutionalCommittee(Credential::AddrKeyHash(Hash::new([0x44; 28])));
    let script_drep = Voter::DRep(Credential::ScriptHash(script.hash()));
    let key_drep = Voter::DRep(drep_credential());
    let action = GovActionId::default();

    let mut builder = builder_with_budget(budget);
    builder
        .set_utxos(&pool)
        .set_collateral_utxos(&[fixtures::key_utxo(8, 5_000_000)])
        .set_collateral_change_address(&fixtures::change_address())
        .set_change_address(&fixtures::change_address())
        .add_script(&script)
        .mint_token(&script.hash(), &name, 5, Some(&redeemer))
        .register_reward_address(&fixtures::stake_address(), None)
        .delegate_stake(&script_stake, &pool_id(), Some(&redeemer))
        .withdraw_rewards(&fixtures::stake_address(), 2_000_000, None)
        .withdraw_rewards(&script_stake, 1_000_000, Some(&redeemer))
        .vote(&key_drep, &action, &VotingProcedure::new(Vote::No), None)
        .vote(&script_drep, &action, &VotingProcedure::new(Vote::Yes), Some(&redeemer))
        .vote(&committee, &action, &VotingProcedure::new(Vote::Abstain), None)
        .propose_treasury_withdrawals(
            &BTreeMap::from([(fixtures::stake_address(), 1_000_000)]),
            Some(&script.hash()),
            &fixtures::stake_address(),
            &anchor(),
            Some(&redeemer),
        );
    let tx = builder.build().unwrap();

    // Committee voters sort first, and script credentials before keys
    let pointers: Vec<(RedeemerTag, u32)> =
        tx.witness_set.redeemers.iter().map(|r| (r.tag, r.index)).collect();
    assert_eq!(
        pointers,
        vec![
            (RedeemerTag::Mint, 0),
            (RedeemerTag::Cert, 1),
            (RedeemerTag::Reward, 0),
            (RedeemerTag::Vote, 1),
            (RedeemerTag::Propose, 0),
        ]
    );
    assert!(tx.witness_set.redeemers.iter().all(|r| r.ex_units == budget));
    assert_eq!(tx.witness_set.plutus_v3_scripts.len(), 1);
    assert_eq!(tx.body.voting_procedures.len(), 3);
    assert_eq!(tx.body.proposal_procedures.len(), 1);

    assert_eq!(tx.body.collateral.len(), 1);
    let total = tx.body.total_collateral.unwrap();
    assert!(total >= fee::required_collateral(&params, tx.body.fee));
    let returned = tx.body.collateral_return.as_ref().unwrap().value.lovelace;
    assert_eq!(total + returned, 5_000_000);

    let consumed = spent(&tx, &pool) + 3_000_000;
    assert_eq!(consumed, produced(&tx) + params.key_deposit + params.gov_action_deposit);
    assert_eq!(tx.body.outputs.last().unwrap().value.asset_quantity(&script.hash(), &name), 5);
}

#[test]
fn staking_and_drep_intents_from_text() {
    let params = fixtures::params();
    let pool = [fixtures::key_utxo(1, 1_000_000_000)];
    let mut builder = builder();
    builder
        .set_utxos(&pool)
        .set_change_address(&fixtures::change_address())
        .register_reward_address_ex(&stake_text(), None)
        .delegate_stake_ex(&stake_text(), &pool_text(), None)
        .delegate_voting_power_ex(&stake_text(), "abstain", None)
        .register_drep_ex(&drep_text(), Some(&anchor()), None)
        .update_drep_ex(&drep_text(), None, None)
        .deregister_drep_ex(&drep_text(), None)
        .withdraw_rewards_ex(&stake_text(), 0, None);
    assert!(builder.last_error().is_none());
    let tx = builder.build().unwrap();

    let kinds: Vec<&str> = tx
        .body
        .certificates
        .iter()
        .map(|certificate| match certificate {
            TxCertificate::Registration(_) => "reg",
            TxCertificate::StakeDelegation(d) if d.operator == pool_id() => "stake",
            TxCertificate::VoteDelegation(_) => "vote",
            TxCertificate::DRepRegistration(r) if r.anchor == Some(anchor()) => "reg_drep",
            TxCertificate::DRepUpdate(_) => "update_drep",
            TxCertificate::DRepDeregistration(_) => "unreg_drep",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, ["reg", "stake", "vote", "reg_drep", "update_drep", "unreg_drep"]);
    assert_eq!(tx.body.withdrawals.get(&fixtures::stake_address()), Some(&0));

    // The DRep deposit is paid and refunded in the same transaction
    let consumed = spent(&tx, &pool) + params.drep_deposit;
    assert_eq!(consumed, produced(&tx) + params.key_deposit + params.drep_deposit);
}

#[test]
fn legacy_certificate_takes_the_key_deposit() {
    let params = fixtures::params();
    let pool = [fixtures::key_utxo(1, 10_000_000)];
    let mut builder = builder();
    builder
        .set_utxos(&pool)
        .set_change_address(&fixtures::change_address())
        .add_certificate(&TxCertificate::StakeRegistration(fixtures::stake_address()), None);
    let tx = builder.build().unwrap();
    assert_eq!(tx.body.certificates.len(), 1);
    assert_eq!(spent(&tx, &pool), produced(&tx) + params.key_deposit);
}

#[test]
fn padded_signers_are_paid_for() {
    let build = |padding: usize| {
        let mut builder = builder();
        builder
            .set_utxos(&[fixtures::key_utxo(1, 10_000_000)])
            .set_change_address(&fixtures::change_address())
            .send_lovelace(&fixtures::payment_address(), 2_000_000)
            .pad_signer_count(padding);
        builder.build().unwrap()
    };
    let plain = build(0);
    let padded = build(2);
    assert!(padded.body.fee > plain.body.fee);
    assert!(padded.witness_set.vkey_witnesses.is_empty());
}

#[test]
fn script_certificate_without_collateral_is_rejected() {
    let script = fixtures::plutus_v3_script();
    let mut builder = builder_with_budget(ExUnits::new(1, 1));
    builder
        .set_utxos(&[fixtures::key_utxo(1, 10_000_000)])
        .set_change_address(&fixtures::change_address())
        .add_script(&script)
        .deregister_drep(&Credential::ScriptHash(script.hash()), Some(&PlutusData::unit()));
    assert_eq!(builder.build().unwrap_err().kind(), ErrorKind::PointerIsNull);
}

#[test_case(
    |b: &mut TransactionBuilder| { b.register_reward_address_ex("stake1xyz", None); }
    => ErrorKind::Decoding; "register malformed"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.register_reward_address_ex(&short_stake_text(), None); }
    => ErrorKind::InvalidArgument; "register short"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.deregister_reward_address_ex("stake1xyz", None); }
    => ErrorKind::Decoding; "deregister malformed"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.delegate_stake_ex("stake1xyz", &pool_text(), None); }
    => ErrorKind::Decoding; "delegate malformed stake"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.delegate_stake_ex(&stake_text(), "pool1notbech32", None); }
    => ErrorKind::Decoding; "delegate malformed pool"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.delegate_stake_ex(&stake_text(), &drep_text(), None); }
    => ErrorKind::InvalidArgument; "delegate to a drep id"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.delegate_voting_power_ex(&stake_text(), "drep1xyz", None); }
    => ErrorKind::Decoding; "voting power malformed"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.delegate_voting_power_ex(&stake_text(), &pool_text(), None); }
    => ErrorKind::InvalidArgument; "voting power to a pool id"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.register_drep_ex("drep1xyz", None, None); }
    => ErrorKind::Decoding; "register drep malformed"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.update_drep_ex(&pool_text(), None, None); }
    => ErrorKind::InvalidArgument; "update drep with a pool id"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.deregister_drep_ex(&pool_text(), None); }
    => ErrorKind::InvalidArgument; "deregister drep with a pool id"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.withdraw_rewards_ex("stake1xyz", 1, None); }
    => ErrorKind::Decoding; "withdraw malformed"
)]
#[test_case(
    |b: &mut TransactionBuilder| { b.withdraw_rewards_ex(&short_stake_text(), 1, None); }
    => ErrorKind::InvalidArgument; "withdraw short"
)]
fn text_intent_errors(intent: fn(&mut TransactionBuilder)) -> ErrorKind {
    let mut builder = builder();
    intent(&mut builder);
    let kind = builder.last_error().unwrap().kind();
    assert_eq!(builder.build().unwrap_err().kind(), kind);
    kind
}

#[test]
fn reward_withdrawal_still_spends_an_input() {
    let mut builder = builder();
    let pool = [fixtures::key_utxo(1, 10_000_000)];
    builder
        .set_utxos(&pool)
        .set_change_address(&fixtures::change_address())
        .withdraw_rewards(&fixtures::stake_address(), 10_000_000, None);
    let tx = builder.build().unwrap();
    assert_eq!(tx.body.inputs.len(), 1);
    let change = Value::sum(tx.body.outputs.iter().map(|o| &o.value));
    assert_eq!(change.lovelace + tx.body.fee, 20_000_000);
}
