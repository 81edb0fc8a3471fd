//! Shared fixtures: parameters, addresses, scripts and UTxOs on testnet

use portico_common::{
    address::{ShelleyAddress, ShelleyAddressDelegationPart, ShelleyAddressPaymentPart},
    hash::Hash,
    protocol_params::{CostModels, ProtocolParams},
    Address, Credential, Datum, KeyHash, NativeScript, NetworkId, PolicyId, Script, ScriptHash,
    StakeAddress, TransactionOutput, UTxOIdentifier, Utxo, Value,
};

pub const PAYMENT_KEY: [u8; 28] = [0x11; 28];
pub const CHANGE_KEY: [u8; 28] = [0x22; 28];
pub const STAKE_KEY: [u8; 28] = [0x33; 28];

/// Mainnet Conway parameters with a small cost model for every language
pub fn params() -> ProtocolParams {
    ProtocolParams {
        cost_models: cost_models(),
        ..ProtocolParams::default()
    }
}

pub fn cost_models() -> CostModels {
    CostModels {
        plutus_v1: Some((0..16).collect()),
        plutus_v2: Some((100..120).collect()),
        plutus_v3: Some((200..230).collect()),
    }
}

pub fn payment_key_hash() -> KeyHash {
    Hash::new(PAYMENT_KEY)
}

pub fn change_key_hash() -> KeyHash {
    Hash::new(CHANGE_KEY)
}

pub fn stake_address() -> StakeAddress {
    StakeAddress::new(Credential::AddrKeyHash(Hash::new(STAKE_KEY)), NetworkId::Testnet)
}

pub fn script_stake_address(script: &Script) -> StakeAddress {
    StakeAddress::new(Credential::ScriptHash(script.hash()), NetworkId::Testnet)
}

fn key_address(key: [u8; 28]) -> Address {
    Address::Shelley(ShelleyAddress {
        network: NetworkId::Testnet,
        payment: ShelleyAddressPaymentPart::PaymentKeyHash(Hash::new(key)),
        delegation: ShelleyAddressDelegationPart::StakeKeyHash(Hash::new(STAKE_KEY)),
    })
}

/// Base address funding most fixtures
pub fn payment_address() -> Address {
    key_address(PAYMENT_KEY)
}

pub fn change_address() -> Address {
    key_address(CHANGE_KEY)
}

pub fn script_address(hash: ScriptHash) -> Address {
    Address::Shelley(ShelleyAddress {
        network: NetworkId::Testnet,
        payment: ShelleyAddressPaymentPart::ScriptHash(hash),
        delegation: ShelleyAddressDelegationPart::None,
    })
}

pub fn policy_id(tag: u8) -> PolicyId {
    Hash::new([tag; 28])
}

pub fn input(tag: u8) -> UTxOIdentifier {
    UTxOIdentifier::new(Hash::new([tag; 32]), 0)
}

pub fn plutus_v1_script() -> Script {
    Script::PlutusV1(vec![0x4e, 0x4d, 0x01, 0x00, 0x00, 0x33, 0x22, 0x22, 0x20, 0x05, 0x12])
}

pub fn plutus_v2_script() -> Script {
    Script::PlutusV2(vec![0x4e, 0x4d, 0x01, 0x00, 0x00, 0x33, 0x22, 0x22, 0x20, 0x05, 0x22])
}

pub fn plutus_v3_script() -> Script {
    Script::PlutusV3(vec![0x4e, 0x4d, 0x01, 0x00, 0x00, 0x33, 0x22, 0x22, 0x20, 0x05, 0x32])
}

/// Signature of the payment key
pub fn native_script() -> Script {
    Script::Native(NativeScript::ScriptPubkey(payment_key_hash()))
}

pub fn key_utxo(tag: u8, lovelace: u64) -> Utxo {
    key_utxo_with(tag, Value::from_lovelace(lovelace))
}

pub fn key_utxo_with(tag: u8, value: Value) -> Utxo {
    Utxo::new(input(tag), TransactionOutput::new(payment_address(), value))
}

/// Output locked by `script`
pub fn script_utxo(tag: u8, script: &Script, lovelace: u64, datum: Option<Datum>) -> Utxo {
    let mut output =
        TransactionOutput::new(script_address(script.hash()), Value::from_lovelace(lovelace));
    output.datum = datum;
    Utxo::new(input(tag), output)
}

/// Key output carrying `script` as a reference script
pub fn reference_utxo(tag: u8, script: &Script) -> Utxo {
    let output = TransactionOutput::new(payment_address(), Value::from_lovelace(20_000_000))
        .with_script_ref(script.clone());
    Utxo::new(input(tag), output)
}
