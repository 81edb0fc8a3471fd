//! Certificates built from staking and DRep intents

use portico_common::{
    certificate::{Deregistration, Registration, StakeDelegation, TxCertificate, VoteDelegation},
    drep::{
        drep_credential_from_bech32, Anchor, DRepChoice, DRepCredential, DRepDeregistration,
        DRepRegistration, DRepUpdate,
    },
    protocol_params::ProtocolParams,
    serialization::Bech32Conversion,
    PlutusData, PoolId, StakeAddress,
};

use crate::{
    draft::{PendingCertificate, TransactionDraft},
    error::TxBuilderError,
};

/// Turns intents into certificates, taking deposits from the parameters
pub struct CertificateAssembler<'a> {
    params: &'a ProtocolParams,
}

impl<'a> CertificateAssembler<'a> {
    pub fn new(params: &'a ProtocolParams) -> Self {
        Self { params }
    }

    pub fn register_reward_address(&self, stake_address: &StakeAddress) -> TxCertificate {
        TxCertificate::Registration(Registration {
            stake_address: *stake_address,
            deposit: self.params.key_deposit,
        })
    }

    pub fn deregister_reward_address(&self, stake_address: &StakeAddress) -> TxCertificate {
        TxCertificate::Deregistration(Deregistration {
            stake_address: *stake_address,
            refund: self.params.key_deposit,
        })
    }

    pub fn delegate_stake(&self, stake_address: &StakeAddress, pool: &PoolId) -> TxCertificate {
        TxCertificate::StakeDelegation(StakeDelegation {
            stake_address: *stake_address,
            operator: *pool,
        })
    }

    pub fn delegate_voting_power(
        &self,
        stake_address: &StakeAddress,
        drep: &DRepChoice,
    ) -> TxCertificate {
        TxCertificate::VoteDelegation(VoteDelegation {
            stake_address: *stake_address,
            drep: *drep,
        })
    }

    pub fn register_drep(
        &self,
        credential: &DRepCredential,
        anchor: Option<&Anchor>,
    ) -> TxCertificate {
        TxCertificate::DRepRegistration(DRepRegistration {
            credential: *credential,
            deposit: self.params.drep_deposit,
            anchor: anchor.cloned(),
        })
    }

    pub fn update_drep(&self, credential: &DRepCredential, anchor: Option<&Anchor>) -> TxCertificate {
        TxCertificate::DRepUpdate(DRepUpdate {
            credential: *credential,
            anchor: anchor.cloned(),
        })
    }

    pub fn deregister_drep(&self, credential: &DRepCredential) -> TxCertificate {
        TxCertificate::DRepDeregistration(DRepDeregistration {
            credential: *credential,
            refund: self.params.drep_deposit,
        })
    }

    pub fn append(
        draft: &mut TransactionDraft,
        certificate: TxCertificate,
        redeemer: Option<&PlutusData>,
    ) {
        draft.certificates.push(PendingCertificate {
            certificate,
            redeemer: redeemer.cloned(),
        });
    }
}

pub fn parse_stake_address(text: &str) -> Result<StakeAddress, TxBuilderError> {
    StakeAddress::from_string(text).map_err(|e| {
        if e.is_malformed() {
            TxBuilderError::decoding("reward address", e)
        } else {
            TxBuilderError::InvalidArgument(format!("reward address: {e}"))
        }
    })
}

pub fn parse_pool_id(text: &str) -> Result<PoolId, TxBuilderError> {
    PoolId::from_bech32(text).map_err(|e| TxBuilderError::from_bech32("pool id", e))
}

pub fn parse_drep_credential(text: &str) -> Result<DRepCredential, TxBuilderError> {
    drep_credential_from_bech32(text).map_err(|e| TxBuilderError::from_bech32("drep id", e))
}

/// A DRep id, or the literal `abstain` / `no_confidence` choices
pub fn parse_drep_choice(text: &str) -> Result<DRepChoice, TxBuilderError> {
    match text {
        "abstain" => Ok(DRepChoice::Abstain),
        "no_confidence" => Ok(DRepChoice::NoConfidence),
        _ => parse_drep_credential(text).map(DRepChoice::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use portico_common::{
        drep::drep_credential_to_bech32, hash::Hash, serialization::encode_bech32, Credential,
    };

    #[test]
    fn deposits_come_from_parameters() {
        let params = ProtocolParams {
            key_deposit: 2_000_000,
            drep_deposit: 500_000_000,
            ..Default::default()
        };
        let assembler = CertificateAssembler::new(&params);
        let stake = portico_test_utils::stake_address();
        assert_eq!(assembler.register_reward_address(&stake).deposit(params.key_deposit), 2_000_000);
        assert_eq!(assembler.deregister_reward_address(&stake).refund(params.key_deposit), 2_000_000);

        let drep = Credential::AddrKeyHash(Hash::new([5; 28]));
        assert_eq!(assembler.register_drep(&drep, None).deposit(0), 500_000_000);
        assert_eq!(assembler.deregister_drep(&drep).refund(0), 500_000_000);
        assert_eq!(assembler.update_drep(&drep, None).deposit(0), 0);
    }

    #[test]
    fn append_keeps_insertion_order() {
        let params = ProtocolParams::default();
        let assembler = CertificateAssembler::new(&params);
        let stake = portico_test_utils::stake_address();
        let mut draft = TransactionDraft::default();
        CertificateAssembler::append(&mut draft, assembler.register_reward_address(&stake), None);
        CertificateAssembler::append(
            &mut draft,
            assembler.delegate_voting_power(&stake, &DRepChoice::Abstain),
            Some(&PlutusData::unit()),
        );
        assert!(matches!(draft.certificates[0].certificate, TxCertificate::Registration(_)));
        assert_eq!(draft.certificates[1].redeemer, Some(PlutusData::unit()));
    }

    #[test]
    fn parses_both_drep_id_forms() {
        let credential = Credential::ScriptHash(Hash::new([8; 28]));
        let id = drep_credential_to_bech32(&credential).unwrap();
        assert_eq!(parse_drep_credential(&id).unwrap(), credential);
        assert_eq!(parse_drep_choice("abstain").unwrap(), DRepChoice::Abstain);
    }

    #[test]
    fn pool_id_errors() {
        assert_eq!(parse_pool_id("pool1notbech32").unwrap_err().kind(), ErrorKind::Decoding);
        let drep = encode_bech32("drep", &[1; 28]).unwrap();
        assert_eq!(parse_pool_id(&drep).unwrap_err().kind(), ErrorKind::InvalidArgument);
        let short = encode_bech32("pool", &[1; 20]).unwrap();
        assert_eq!(parse_pool_id(&short).unwrap_err().kind(), ErrorKind::InvalidArgument);
        let pool = encode_bech32("pool", &[1; 28]).unwrap();
        assert_eq!(parse_pool_id(&pool).unwrap(), PoolId::new(Hash::new([1; 28])));
    }

    #[test]
    fn stake_address_text_round_trips() {
        let stake = portico_test_utils::stake_address();
        let text = stake.to_string().unwrap();
        assert_eq!(parse_stake_address(&text).unwrap(), stake);
        assert_eq!(parse_stake_address("stake1xyz").unwrap_err().kind(), ErrorKind::Decoding);
    }
}
