// Portico common library - main library exports

pub mod address;
pub mod asset;
pub mod calculations;
pub mod cbor;
pub mod certificate;
pub mod cip19;
pub mod crypto;
pub mod drep;
pub mod genesis_values;
pub mod governance;
pub mod hash;
pub mod metadata;
pub mod plutus_data;
pub mod protocol_params;
pub mod rational_number;
pub mod script;
pub mod serialization;
pub mod tx;
pub mod types;
pub mod utxo;

// Flattened re-exports
pub use self::address::{Address, AddressError, StakeAddress};
pub use self::asset::{AssetId, AssetName, Mint, MultiAsset, PolicyId, Value};
pub use self::plutus_data::{DatumHash, PlutusData};
pub use self::script::{Datum, NativeScript, Redeemer, RedeemerPointer, RedeemerTag, Script};
pub use self::types::*;
pub use self::utxo::{TransactionOutput, Utxo};
