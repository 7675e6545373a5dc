//! Proposal creation parameters.

use serde::{Deserialize, Serialize};

use gasless_voting_core::{Address, Timestamp, U256};
use gasless_voting_governance::model::MAX_ACTIONS;
use gasless_voting_governance::{allow_failure_map_from_flags, DaoAction, ProposalParameters, StructCodec};

use crate::contract::CreateProposalCall;
use crate::error::{ClientError, ClientResult};

/// Parameters of a new proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProposalParams {
    pub plugin_address: Address,
    /// Election already published on the voting network
    pub vochain_proposal_id: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub tally_end_date: Timestamp,
    pub total_voting_power: U256,
    pub census_uri: String,
    pub census_root: String,
    pub actions: Vec<DaoAction>,
    /// Per-action permission to fail; empty means every action must succeed
    pub fail_safe_actions: Vec<bool>,
}

impl CreateProposalParams {
    /// Check the parameters without touching any collaborator
    pub fn validate(&self) -> ClientResult<()> {
        if self.vochain_proposal_id.trim().is_empty() {
            return Err(ClientError::InvalidParams("vochain proposal id is empty".to_string()));
        }
        self.election_bytes()?;
        if self.start_date > self.end_date || self.end_date > self.tally_end_date {
            return Err(ClientError::InvalidParams(format!(
                "dates must be ordered: start {}, end {}, tally end {}",
                self.start_date, self.end_date, self.tally_end_date
            )));
        }
        if self.actions.len() > MAX_ACTIONS {
            return Err(ClientError::SizeMismatch {
                expected: MAX_ACTIONS,
                actual: self.actions.len(),
            });
        }
        if !self.fail_safe_actions.is_empty() && self.fail_safe_actions.len() != self.actions.len() {
            return Err(ClientError::SizeMismatch {
                expected: self.actions.len(),
                actual: self.fail_safe_actions.len(),
            });
        }
        Ok(())
    }

    /// The election id as the bytes stored on chain
    fn election_bytes(&self) -> ClientResult<Vec<u8>> {
        let digits = self.vochain_proposal_id.trim_start_matches("0x");
        hex::decode(digits).map_err(|e| {
            ClientError::InvalidParams(format!(
                "vochain proposal id {} is not hex: {}",
                self.vochain_proposal_id, e
            ))
        })
    }

    /// Validate and build the contract call in the codec's layout
    pub fn to_call(&self, codec: &StructCodec) -> ClientResult<CreateProposalCall> {
        self.validate()?;

        let allow_failure_map = allow_failure_map_from_flags(&self.fail_safe_actions)?;
        let parameters = ProposalParameters {
            // assigned by the contract
            security_block: 0,
            start_date: self.start_date,
            end_date: self.end_date,
            tally_end_date: self.tally_end_date,
            total_voting_power: self.total_voting_power,
            census_uri: self.census_uri.clone(),
            census_root: self.census_root.clone(),
        };

        Ok(CreateProposalCall {
            vochain_proposal_id: self.election_bytes()?,
            allow_failure_map,
            parameters: (codec.parameters_to_on_chain)(&parameters)?,
            actions: self.actions.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_voting_core::{timestamp_from_chain, ProtocolVariant};
    use gasless_voting_governance::codec_for;

    fn action() -> DaoAction {
        DaoAction {
            to: Address::from_bytes([4; 20]),
            value: U256::zero(),
            data: vec![0xde, 0xad],
        }
    }

    fn params() -> CreateProposalParams {
        CreateProposalParams {
            plugin_address: Address::from_bytes([9; 20]),
            vochain_proposal_id: "c5d2460186f7".to_string(),
            start_date: timestamp_from_chain(1_700_000_000).unwrap(),
            end_date: timestamp_from_chain(1_700_003_600).unwrap(),
            tally_end_date: timestamp_from_chain(1_700_007_200).unwrap(),
            total_voting_power: U256::from(1_000u64),
            census_uri: "ipfs://census".to_string(),
            census_root: "0xroot".to_string(),
            actions: vec![action(), action()],
            fail_safe_actions: vec![false, true],
        }
    }

    #[test]
    fn test_call_carries_failure_map() {
        let call = params().to_call(&codec_for(ProtocolVariant::Current)).unwrap();
        assert_eq!(call.allow_failure_map, U256::from(2u64));
        assert_eq!(call.vochain_proposal_id, vec![0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7]);
        assert_eq!(call.parameters.0.len(), 7);

        let legacy = params().to_call(&codec_for(ProtocolVariant::Legacy)).unwrap();
        assert_eq!(legacy.parameters.0.len(), 6);
    }

    #[test]
    fn test_fail_safe_length_must_match() {
        let mismatched = CreateProposalParams {
            fail_safe_actions: vec![true],
            ..params()
        };
        assert!(matches!(
            mismatched.validate(),
            Err(ClientError::SizeMismatch { expected: 2, actual: 1 })
        ));

        let none = CreateProposalParams {
            fail_safe_actions: Vec::new(),
            ..params()
        };
        assert!(none.validate().is_ok());
    }

    #[test]
    fn test_election_id_must_be_hex() {
        let prefixed = CreateProposalParams {
            vochain_proposal_id: "0xc5d2".to_string(),
            ..params()
        };
        assert!(prefixed.validate().is_ok());

        let garbled = CreateProposalParams {
            vochain_proposal_id: "election-1".to_string(),
            ..params()
        };
        assert!(matches!(garbled.validate(), Err(ClientError::InvalidParams(_))));
    }

    #[test]
    fn test_dates_must_be_ordered() {
        let reversed = CreateProposalParams {
            end_date: timestamp_from_chain(1_600_000_000).unwrap(),
            ..params()
        };
        assert!(matches!(reversed.validate(), Err(ClientError::InvalidParams(_))));
    }

    #[test]
    fn test_too_many_actions() {
        let crowded = CreateProposalParams {
            actions: vec![action(); MAX_ACTIONS + 1],
            fail_safe_actions: Vec::new(),
            ..params()
        };
        let err = crowded.to_call(&codec_for(ProtocolVariant::Current)).unwrap_err();
        assert!(matches!(err, ClientError::SizeMismatch { expected: MAX_ACTIONS, .. }));
    }
}
