//! Conway governance: votes and proposals

use crate::address::StakeAddress;
use crate::drep::{encode_optional_anchor, Anchor};
use crate::types::{Credential, Lovelace, PoolId, ScriptHash, TxHash};
use std::collections::BTreeMap;
use std::fmt;

/// Someone casting a vote.
///
/// Variant order follows the ledger: committee members, then DReps, then
/// stake pools. Vote redeemer indexes are positions in this order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Voter {
    /// Constitutional committee member, by hot credential
    ConstitutionalCommittee(Credential),
    DRep(Credential),
    StakePool(PoolId),
}

impl Voter {
    pub fn script_hash(&self) -> Option<ScriptHash> {
        match self {
            Voter::ConstitutionalCommittee(cred) | Voter::DRep(cred) => cred.script_hash(),
            Voter::StakePool(_) => None,
        }
    }

    /// Credential that signs the vote
    pub fn credential(&self) -> Credential {
        match self {
            Voter::ConstitutionalCommittee(cred) | Voter::DRep(cred) => *cred,
            Voter::StakePool(pool) => Credential::AddrKeyHash(**pool),
        }
    }
}

impl fmt::Display for Voter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Voter::ConstitutionalCommittee(cred) => write!(f, "cc:{}", cred.hash()),
            Voter::DRep(cred) => write!(f, "drep:{}", cred.hash()),
            Voter::StakePool(pool) => write!(f, "pool:{pool}"),
        }
    }
}

impl<C> minicbor::Encode<C> for Voter {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let (tag, hash) = match self {
            Voter::ConstitutionalCommittee(Credential::AddrKeyHash(h)) => (0, h),
            Voter::ConstitutionalCommittee(Credential::ScriptHash(h)) => (1, h),
            Voter::DRep(Credential::AddrKeyHash(h)) => (2, h),
            Voter::DRep(Credential::ScriptHash(h)) => (3, h),
            Voter::StakePool(pool) => (4, &**pool),
        };
        e.array(2)?.u8(tag)?.encode_with(hash, ctx)?.ok()
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, minicbor::Encode,
)]
#[cbor(index_only)]
pub enum Vote {
    #[n(0)]
    No,
    #[n(1)]
    Yes,
    #[n(2)]
    Abstain,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VotingProcedure {
    pub vote: Vote,
    pub anchor: Option<Anchor>,
}

impl VotingProcedure {
    pub fn new(vote: Vote) -> Self {
        Self { vote, anchor: None }
    }
}

impl<C> minicbor::Encode<C> for VotingProcedure {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.encode_with(self.vote, ctx)?;
        encode_optional_anchor(e, &self.anchor)
    }
}

/// Identifier of a governance action: the proposing transaction and the
/// proposal's position in it
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct GovActionId {
    pub transaction_id: TxHash,
    pub action_index: u16,
}

impl fmt::Display for GovActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.transaction_id, self.action_index)
    }
}

impl<C> minicbor::Encode<C> for GovActionId {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?.encode_with(self.transaction_id, ctx)?.u16(self.action_index)?.ok()
    }
}

pub type VotingProcedures = BTreeMap<Voter, BTreeMap<GovActionId, VotingProcedure>>;

/// Governance actions a transaction can propose
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GovAction {
    TreasuryWithdrawals {
        withdrawals: BTreeMap<StakeAddress, Lovelace>,
        /// Guardrail script, when the constitution has one
        policy_hash: Option<ScriptHash>,
    },
    NoConfidence {
        previous: Option<GovActionId>,
    },
    Info,
}

impl GovAction {
    pub fn policy_hash(&self) -> Option<ScriptHash> {
        match self {
            GovAction::TreasuryWithdrawals { policy_hash, .. } => *policy_hash,
            _ => None,
        }
    }
}

impl<C> minicbor::Encode<C> for GovAction {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            GovAction::TreasuryWithdrawals {
                withdrawals,
                policy_hash,
            } => {
                e.array(3)?.u8(2)?.map(withdrawals.len() as u64)?;
                for (account, amount) in withdrawals {
                    e.encode_with(account, ctx)?.u64(*amount)?;
                }
                e.encode_with(policy_hash, ctx)?;
            }
            GovAction::NoConfidence { previous } => {
                e.array(2)?.u8(3)?.encode_with(previous, ctx)?;
            }
            GovAction::Info => {
                e.array(1)?.u8(6)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProposalProcedure {
    pub deposit: Lovelace,
    /// Where the deposit is returned
    pub reward_account: StakeAddress,
    pub gov_action: GovAction,
    pub anchor: Anchor,
}

impl<C> minicbor::Encode<C> for ProposalProcedure {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(4)?
            .u64(self.deposit)?
            .encode_with(self.reward_account, ctx)?
            .encode_with(&self.gov_action, ctx)?
            .encode_with(&self.anchor, ctx)?
            .ok()
    }
}
