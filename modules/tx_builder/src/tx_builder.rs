//! Portico transaction builder
//!
//! Collects payment, minting, script, staking and governance intents and
//! balances them into a Conway transaction ready for signing.

mod balancer;
mod builder;
pub mod certificate_assembler;
pub mod coin_selection;
pub mod configuration;
pub mod draft;
pub mod error;
pub mod evaluator;
pub mod fee;
pub mod provider;
pub mod witness_resolver;

pub use builder::{BuilderState, TransactionBuilder};
pub use coin_selection::{CoinSelection, CoinSelectionError, CoinSelector, LargeFirstCoinSelector};
pub use configuration::BuilderConfig;
pub use error::{ErrorKind, TxBuilderError};
pub use evaluator::{ProviderEvaluator, TxEvaluator};
pub use provider::{OfflineProvider, Provider};
pub use witness_resolver::WitnessFlags;
