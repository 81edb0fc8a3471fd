//! Conway certificate definitions

use crate::address::StakeAddress;
use crate::drep::{
    encode_optional_anchor, Anchor, DRepChoice, DRepDeregistration, DRepRegistration, DRepUpdate,
};
use crate::types::{Credential, Lovelace, PoolId};

/// Pool retirement data
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct PoolRetirement {
    /// Operator pool key hash - used as ID
    pub operator: PoolId,

    /// Epoch it will retire at the end of
    pub epoch: u64,
}

/// Stake delegation data
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct StakeDelegation {
    /// Stake address
    pub stake_address: StakeAddress,

    /// Pool ID to delegate to
    pub operator: PoolId,
}

/// Register stake (Conway version) = 'reg_cert'
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct Registration {
    pub stake_address: StakeAddress,

    /// Deposit paid
    pub deposit: Lovelace,
}

/// Deregister stake (Conway version) = 'unreg_cert'
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct Deregistration {
    pub stake_address: StakeAddress,

    /// Deposit to be refunded
    pub refund: Lovelace,
}

/// Vote delegation (simple, existing registration) = vote_deleg_cert
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct VoteDelegation {
    pub stake_address: StakeAddress,
    pub drep: DRepChoice,
}

/// Stake+vote delegation (to SPO and DRep) = stake_vote_deleg_cert
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct StakeAndVoteDelegation {
    pub stake_address: StakeAddress,
    pub operator: PoolId,
    pub drep: DRepChoice,
}

/// Stake delegation to SPO + registration = stake_reg_deleg_cert
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct StakeRegistrationAndDelegation {
    pub stake_address: StakeAddress,
    pub operator: PoolId,
    pub deposit: Lovelace,
}

/// Vote delegation to DRep + registration = vote_reg_deleg_cert
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct StakeRegistrationAndVoteDelegation {
    pub stake_address: StakeAddress,
    pub drep: DRepChoice,
    pub deposit: Lovelace,
}

/// All the trimmings:
/// Vote delegation to DRep + Stake delegation to SPO + registration
/// = stake_vote_reg_deleg_cert
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct StakeRegistrationAndStakeAndVoteDelegation {
    pub stake_address: StakeAddress,
    pub operator: PoolId,
    pub drep: DRepChoice,
    pub deposit: Lovelace,
}

pub type CommitteeCredential = Credential;

/// Authorise a committee hot credential
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct AuthCommitteeHot {
    pub cold_credential: CommitteeCredential,
    pub hot_credential: CommitteeCredential,
}

/// Resign a committee cold credential
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct ResignCommitteeCold {
    pub cold_credential: CommitteeCredential,
    pub anchor: Option<Anchor>,
}

/// Certificate in a transaction
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub enum TxCertificate {
    /// Stake registration (legacy, deposit implied by key_deposit)
    StakeRegistration(StakeAddress),

    /// Stake de-registration (legacy, refund implied by key_deposit)
    StakeDeregistration(StakeAddress),

    /// Stake Delegation to a pool
    StakeDelegation(StakeDelegation),

    /// Pool retirement
    PoolRetirement(PoolRetirement),

    /// New stake registration
    Registration(Registration),

    /// Stake deregistration
    Deregistration(Deregistration),

    /// Vote delegation
    VoteDelegation(VoteDelegation),

    /// Combined stake and vote delegation
    StakeAndVoteDelegation(StakeAndVoteDelegation),

    /// Stake registration and SPO delegation
    StakeRegistrationAndDelegation(StakeRegistrationAndDelegation),

    /// Stake registration and vote delegation
    StakeRegistrationAndVoteDelegation(StakeRegistrationAndVoteDelegation),

    /// Stake registration and combined SPO and vote delegation
    StakeRegistrationAndStakeAndVoteDelegation(StakeRegistrationAndStakeAndVoteDelegation),

    /// Authorise a committee hot credential
    AuthCommitteeHot(AuthCommitteeHot),

    /// Resign a committee cold credential
    ResignCommitteeCold(ResignCommitteeCold),

    /// DRep registration
    DRepRegistration(DRepRegistration),

    /// DRep deregistration
    DRepDeregistration(DRepDeregistration),

    /// DRep update
    DRepUpdate(DRepUpdate),
}

impl TxCertificate {
    /// Deposit this certificate locks, given the current key deposit
    pub fn deposit(&self, key_deposit: Lovelace) -> Lovelace {
        match self {
            Self::StakeRegistration(_) => key_deposit,
            Self::Registration(reg) => reg.deposit,
            Self::StakeRegistrationAndDelegation(reg) => reg.deposit,
            Self::StakeRegistrationAndVoteDelegation(reg) => reg.deposit,
            Self::StakeRegistrationAndStakeAndVoteDelegation(reg) => reg.deposit,
            Self::DRepRegistration(reg) => reg.deposit,
            _ => 0,
        }
    }

    /// Deposit this certificate returns to the transaction
    pub fn refund(&self, key_deposit: Lovelace) -> Lovelace {
        match self {
            Self::StakeDeregistration(_) => key_deposit,
            Self::Deregistration(dereg) => dereg.refund,
            Self::DRepDeregistration(dereg) => dereg.refund,
            _ => 0,
        }
    }

    /// Credential which must authorise this certificate, if any.
    ///
    /// Follows the ledger's `witsVKeyNeeded`: a legacy stake registration
    /// needs no witness, every other certificate is authorised by the
    /// credential it acts on.
    /// Reference: https://github.com/IntersectMBO/cardano-ledger/blob/master/eras/conway/impl/src/Cardano/Ledger/Conway/TxCert.hs
    pub fn required_witness(&self) -> Option<Credential> {
        match self {
            Self::StakeRegistration(_) => None,
            Self::StakeDeregistration(addr) => Some(addr.credential),
            Self::StakeDelegation(deleg) => Some(deleg.stake_address.credential),
            Self::PoolRetirement(retirement) => {
                Some(Credential::AddrKeyHash(*retirement.operator))
            }
            Self::Registration(reg) => Some(reg.stake_address.credential),
            Self::Deregistration(dereg) => Some(dereg.stake_address.credential),
            Self::VoteDelegation(deleg) => Some(deleg.stake_address.credential),
            Self::StakeAndVoteDelegation(deleg) => Some(deleg.stake_address.credential),
            Self::StakeRegistrationAndDelegation(reg) => Some(reg.stake_address.credential),
            Self::StakeRegistrationAndVoteDelegation(reg) => Some(reg.stake_address.credential),
            Self::StakeRegistrationAndStakeAndVoteDelegation(reg) => {
                Some(reg.stake_address.credential)
            }
            Self::AuthCommitteeHot(auth) => Some(auth.cold_credential),
            Self::ResignCommitteeCold(resign) => Some(resign.cold_credential),
            Self::DRepRegistration(reg) => Some(reg.credential),
            Self::DRepDeregistration(dereg) => Some(dereg.credential),
            Self::DRepUpdate(update) => Some(update.credential),
        }
    }
}

impl<C> minicbor::Encode<C> for TxCertificate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::StakeRegistration(addr) => {
                e.array(2)?.u8(0)?.encode_with(addr.credential, ctx)?;
            }
            Self::StakeDeregistration(addr) => {
                e.array(2)?.u8(1)?.encode_with(addr.credential, ctx)?;
            }
            Self::StakeDelegation(deleg) => {
                e.array(3)?
                    .u8(2)?
                    .encode_with(deleg.stake_address.credential, ctx)?
                    .encode_with(deleg.operator, ctx)?;
            }
            Self::PoolRetirement(retirement) => {
                e.array(3)?.u8(4)?.encode_with(retirement.operator, ctx)?.u64(retirement.epoch)?;
            }
            Self::Registration(reg) => {
                e.array(3)?
                    .u8(7)?
                    .encode_with(reg.stake_address.credential, ctx)?
                    .u64(reg.deposit)?;
            }
            Self::Deregistration(dereg) => {
                e.array(3)?
                    .u8(8)?
                    .encode_with(dereg.stake_address.credential, ctx)?
                    .u64(dereg.refund)?;
            }
            Self::VoteDelegation(deleg) => {
                e.array(3)?
                    .u8(9)?
                    .encode_with(deleg.stake_address.credential, ctx)?
                    .encode_with(deleg.drep, ctx)?;
            }
            Self::StakeAndVoteDelegation(deleg) => {
                e.array(4)?
                    .u8(10)?
                    .encode_with(deleg.stake_address.credential, ctx)?
                    .encode_with(deleg.operator, ctx)?
                    .encode_with(deleg.drep, ctx)?;
            }
            Self::StakeRegistrationAndDelegation(reg) => {
                e.array(4)?
                    .u8(11)?
                    .encode_with(reg.stake_address.credential, ctx)?
                    .encode_with(reg.operator, ctx)?
                    .u64(reg.deposit)?;
            }
            Self::StakeRegistrationAndVoteDelegation(reg) => {
                e.array(4)?
                    .u8(12)?
                    .encode_with(reg.stake_address.credential, ctx)?
                    .encode_with(reg.drep, ctx)?
                    .u64(reg.deposit)?;
            }
            Self::StakeRegistrationAndStakeAndVoteDelegation(reg) => {
                e.array(5)?
                    .u8(13)?
                    .encode_with(reg.stake_address.credential, ctx)?
                    .encode_with(reg.operator, ctx)?
                    .encode_with(reg.drep, ctx)?
                    .u64(reg.deposit)?;
            }
            Self::AuthCommitteeHot(auth) => {
                e.array(3)?
                    .u8(14)?
                    .encode_with(auth.cold_credential, ctx)?
                    .encode_with(auth.hot_credential, ctx)?;
            }
            Self::ResignCommitteeCold(resign) => {
                e.array(3)?.u8(15)?.encode_with(resign.cold_credential, ctx)?;
                encode_optional_anchor(e, &resign.anchor)?;
            }
            Self::DRepRegistration(reg) => {
                e.array(4)?.u8(16)?.encode_with(reg.credential, ctx)?.u64(reg.deposit)?;
                encode_optional_anchor(e, &reg.anchor)?;
            }
            Self::DRepDeregistration(dereg) => {
                e.array(3)?.u8(17)?.encode_with(dereg.credential, ctx)?.u64(dereg.refund)?;
            }
            Self::DRepUpdate(update) => {
                e.array(3)?.u8(18)?.encode_with(update.credential, ctx)?;
                encode_optional_anchor(e, &update.anchor)?;
            }
        }
        Ok(())
    }
}
