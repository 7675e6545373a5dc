//! Mapping between raw on-chain structs and the governance model.
//!
//! The plugin contract changed its settings and parameter layouts over
//! time. Each `ProtocolVariant` owns one pair of encode/decode functions;
//! a `StructCodec` is picked once when a client is built and nothing
//! downstream branches on the variant.

use serde::{Deserialize, Serialize};
use tracing::debug;

use gasless_voting_core::{
    ratio_decode, ratio_encode, time, Address, ProposalId, ProtocolVariant, RATIO_PRECISION, U256,
};

use crate::model::{Approvers, DaoAction, ProposalParameters, ProposalRecord, Tally, VotingSettings};
use crate::{GovernanceError, GovernanceResult};

/// A single ABI value inside a raw tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawValue {
    Bool(bool),
    Uint(U256),
    Address(Address),
    String(String),
}

/// A positional on-chain struct
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTuple(pub Vec<RawValue>);

impl RawTuple {
    fn field(&self, index: usize) -> GovernanceResult<&RawValue> {
        self.0.get(index).ok_or_else(|| {
            GovernanceError::StructLayout(format!(
                "missing field {} in a tuple of {}",
                index,
                self.0.len()
            ))
        })
    }

    fn mismatch(index: usize, expected: &str, found: &RawValue) -> GovernanceError {
        GovernanceError::StructLayout(format!("field {} should be {}, found {:?}", index, expected, found))
    }

    pub fn bool_at(&self, index: usize) -> GovernanceResult<bool> {
        match self.field(index)? {
            RawValue::Bool(value) => Ok(*value),
            other => Err(Self::mismatch(index, "bool", other)),
        }
    }

    pub fn uint_at(&self, index: usize) -> GovernanceResult<U256> {
        match self.field(index)? {
            RawValue::Uint(value) => Ok(*value),
            other => Err(Self::mismatch(index, "uint", other)),
        }
    }

    /// Read a uint field that must fit in 64 bits
    pub fn u64_at(&self, index: usize) -> GovernanceResult<u64> {
        let value = self.uint_at(index)?;
        if value.bits() > 64 {
            return Err(GovernanceError::StructLayout(format!(
                "field {} does not fit in 64 bits: {}",
                index, value
            )));
        }
        Ok(value.low_u64())
    }

    pub fn address_at(&self, index: usize) -> GovernanceResult<Address> {
        match self.field(index)? {
            RawValue::Address(value) => Ok(*value),
            other => Err(Self::mismatch(index, "address", other)),
        }
    }

    pub fn string_at(&self, index: usize) -> GovernanceResult<String> {
        match self.field(index)? {
            RawValue::String(value) => Ok(value.clone()),
            other => Err(Self::mismatch(index, "string", other)),
        }
    }

    fn expect_len(&self, expected: usize) -> GovernanceResult<()> {
        if self.0.len() != expected {
            return Err(GovernanceError::SizeMismatch {
                expected,
                actual: self.0.len(),
            });
        }
        Ok(())
    }
}

/// The proposal struct returned by `getProposal`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProposal {
    pub executed: bool,
    pub approvers: Vec<Address>,
    pub vochain_proposal_id: String,
    pub parameters: RawTuple,
    pub allow_failure_map: U256,
    pub tally: Vec<Vec<U256>>,
    pub actions: Vec<DaoAction>,
}

/// Versioned encode/decode functions for the plugin's structs
#[derive(Clone, Copy)]
pub struct StructCodec {
    pub variant: ProtocolVariant,
    /// Decoded settings carry no multisig members; those come from the indexer
    pub settings_from_on_chain: fn(&RawTuple) -> GovernanceResult<VotingSettings>,
    pub settings_to_on_chain: fn(&VotingSettings) -> GovernanceResult<RawTuple>,
    pub parameters_from_on_chain: fn(&RawTuple) -> GovernanceResult<ProposalParameters>,
    pub parameters_to_on_chain: fn(&ProposalParameters) -> GovernanceResult<RawTuple>,
}

impl std::fmt::Debug for StructCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructCodec").field("variant", &self.variant).finish()
    }
}

impl StructCodec {
    /// Build a proposal record from the contract's proposal struct
    pub fn proposal_from_on_chain(
        &self,
        id: ProposalId,
        raw: &RawProposal,
    ) -> GovernanceResult<ProposalRecord> {
        let parameters = (self.parameters_from_on_chain)(&raw.parameters)?;
        let tally = tally_matrix_from_raw(&raw.tally)?;

        debug!(
            "Decoded proposal {} with {} approvers and {} tally rows",
            id,
            raw.approvers.len(),
            tally.len()
        );

        Ok(ProposalRecord {
            id,
            creator: None,
            vochain_proposal_id: raw.vochain_proposal_id.clone(),
            parameters,
            actions: raw.actions.clone(),
            allow_failure_map: raw.allow_failure_map,
            approvers: raw.approvers.iter().copied().collect::<Approvers>(),
            tally,
            executed: raw.executed,
            execution: None,
            creation_date: None,
            creation_block_number: None,
        })
    }
}

/// Pick the codec for a protocol variant
pub fn codec_for(variant: ProtocolVariant) -> StructCodec {
    match variant {
        ProtocolVariant::Current => StructCodec {
            variant,
            settings_from_on_chain: current::settings_from_on_chain,
            settings_to_on_chain: current::settings_to_on_chain,
            parameters_from_on_chain: current::parameters_from_on_chain,
            parameters_to_on_chain: current::parameters_to_on_chain,
        },
        ProtocolVariant::Legacy => StructCodec {
            variant,
            settings_from_on_chain: legacy::settings_from_on_chain,
            settings_to_on_chain: legacy::settings_to_on_chain,
            parameters_from_on_chain: legacy::parameters_from_on_chain,
            parameters_to_on_chain: legacy::parameters_to_on_chain,
        },
    }
}

/// Convert an on-chain tally matrix, requiring three columns per row
pub fn tally_matrix_from_raw(raw: &[Vec<U256>]) -> GovernanceResult<Tally> {
    raw.iter()
        .map(|row| match row.as_slice() {
            [yes, no, abstain] => Ok([*yes, *no, *abstain]),
            _ => Err(GovernanceError::SizeMismatch {
                expected: 3,
                actual: row.len(),
            }),
        })
        .collect()
}

/// Convert a tally into the on-chain matrix
pub fn tally_matrix_to_raw(tally: &Tally) -> Vec<Vec<U256>> {
    tally.iter().map(|row| row.to_vec()).collect()
}

fn ratio_field(tuple: &RawTuple, index: usize) -> GovernanceResult<rust_decimal::Decimal> {
    Ok(ratio_decode(tuple.u64_at(index)?, RATIO_PRECISION)?)
}

fn ratio_value(fraction: rust_decimal::Decimal) -> GovernanceResult<RawValue> {
    Ok(RawValue::Uint(U256::from(ratio_encode(fraction, RATIO_PRECISION)?)))
}

fn min_tally_approvals(tuple: &RawTuple, index: usize) -> GovernanceResult<u16> {
    let value = tuple.u64_at(index)?;
    u16::try_from(value).map_err(|_| {
        GovernanceError::StructLayout(format!("minTallyApprovals does not fit in 16 bits: {}", value))
    })
}

fn seconds(timestamp: &gasless_voting_core::Timestamp) -> GovernanceResult<RawValue> {
    Ok(RawValue::Uint(U256::from(time::timestamp_to_chain(timestamp)?)))
}

fn timestamp_field(tuple: &RawTuple, index: usize) -> GovernanceResult<gasless_voting_core::Timestamp> {
    Ok(time::timestamp_from_chain(tuple.u64_at(index)?)?)
}

/// Settings `(bool, uint16, uint32, uint32, uint64, uint64, address, uint256, string)`
/// and parameters `(uint64 securityBlock, uint64, uint64, uint64, uint256, string, bytes32)`.
mod current {
    use super::*;

    pub(super) fn settings_from_on_chain(raw: &RawTuple) -> GovernanceResult<VotingSettings> {
        raw.expect_len(9)?;
        Ok(VotingSettings {
            only_execution_multisig_proposal_creation: raw.bool_at(0)?,
            min_tally_approvals: min_tally_approvals(raw, 1)?,
            min_participation: ratio_field(raw, 2)?,
            support_threshold: ratio_field(raw, 3)?,
            min_vote_duration: raw.u64_at(4)?,
            min_tally_duration: raw.u64_at(5)?,
            dao_token_address: raw.address_at(6)?,
            min_proposer_voting_power: raw.uint_at(7)?,
            census_strategy_uri: raw.string_at(8)?,
            execution_multisig_members: Vec::new(),
        })
    }

    pub(super) fn settings_to_on_chain(settings: &VotingSettings) -> GovernanceResult<RawTuple> {
        Ok(RawTuple(vec![
            RawValue::Bool(settings.only_execution_multisig_proposal_creation),
            RawValue::Uint(U256::from(settings.min_tally_approvals)),
            ratio_value(settings.min_participation)?,
            ratio_value(settings.support_threshold)?,
            RawValue::Uint(U256::from(settings.min_vote_duration)),
            RawValue::Uint(U256::from(settings.min_tally_duration)),
            RawValue::Address(settings.dao_token_address),
            RawValue::Uint(settings.min_proposer_voting_power),
            RawValue::String(settings.census_strategy_uri.clone()),
        ]))
    }

    pub(super) fn parameters_from_on_chain(raw: &RawTuple) -> GovernanceResult<ProposalParameters> {
        raw.expect_len(7)?;
        Ok(ProposalParameters {
            security_block: raw.u64_at(0)?,
            start_date: timestamp_field(raw, 1)?,
            end_date: timestamp_field(raw, 2)?,
            tally_end_date: timestamp_field(raw, 3)?,
            total_voting_power: raw.uint_at(4)?,
            census_uri: raw.string_at(5)?,
            census_root: raw.string_at(6)?,
        })
    }

    pub(super) fn parameters_to_on_chain(params: &ProposalParameters) -> GovernanceResult<RawTuple> {
        Ok(RawTuple(vec![
            RawValue::Uint(U256::from(params.security_block)),
            seconds(&params.start_date)?,
            seconds(&params.end_date)?,
            seconds(&params.tally_end_date)?,
            RawValue::Uint(params.total_voting_power),
            RawValue::String(params.census_uri.clone()),
            RawValue::String(params.census_root.clone()),
        ]))
    }
}

/// Settings `(bool, uint16, uint32, uint32, uint64, address, uint256, string)`
/// and parameters without the security block.
mod legacy {
    use super::*;

    pub(super) fn settings_from_on_chain(raw: &RawTuple) -> GovernanceResult<VotingSettings> {
        raw.expect_len(8)?;
        Ok(VotingSettings {
            only_execution_multisig_proposal_creation: raw.bool_at(0)?,
            min_tally_approvals: min_tally_approvals(raw, 1)?,
            min_participation: ratio_field(raw, 2)?,
            support_threshold: ratio_field(raw, 3)?,
            min_vote_duration: raw.u64_at(4)?,
            min_tally_duration: 0,
            dao_token_address: raw.address_at(5)?,
            min_proposer_voting_power: raw.uint_at(6)?,
            census_strategy_uri: raw.string_at(7)?,
            execution_multisig_members: Vec::new(),
        })
    }

    pub(super) fn settings_to_on_chain(settings: &VotingSettings) -> GovernanceResult<RawTuple> {
        Ok(RawTuple(vec![
            RawValue::Bool(settings.only_execution_multisig_proposal_creation),
            RawValue::Uint(U256::from(settings.min_tally_approvals)),
            ratio_value(settings.min_participation)?,
            ratio_value(settings.support_threshold)?,
            RawValue::Uint(U256::from(settings.min_vote_duration)),
            RawValue::Address(settings.dao_token_address),
            RawValue::Uint(settings.min_proposer_voting_power),
            RawValue::String(settings.census_strategy_uri.clone()),
        ]))
    }

    pub(super) fn parameters_from_on_chain(raw: &RawTuple) -> GovernanceResult<ProposalParameters> {
        raw.expect_len(6)?;
        Ok(ProposalParameters {
            security_block: 0,
            start_date: timestamp_field(raw, 0)?,
            end_date: timestamp_field(raw, 1)?,
            tally_end_date: timestamp_field(raw, 2)?,
            total_voting_power: raw.uint_at(3)?,
            census_uri: raw.string_at(4)?,
            census_root: raw.string_at(5)?,
        })
    }

    pub(super) fn parameters_to_on_chain(params: &ProposalParameters) -> GovernanceResult<RawTuple> {
        Ok(RawTuple(vec![
            seconds(&params.start_date)?,
            seconds(&params.end_date)?,
            seconds(&params.tally_end_date)?,
            RawValue::Uint(params.total_voting_power),
            RawValue::String(params.census_uri.clone()),
            RawValue::String(params.census_root.clone()),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn settings() -> VotingSettings {
        VotingSettings {
            only_execution_multisig_proposal_creation: true,
            min_tally_approvals: 2,
            min_participation: Decimal::new(2, 1),
            support_threshold: Decimal::new(5, 1),
            min_vote_duration: 3600,
            min_tally_duration: 1800,
            dao_token_address: Address::from_bytes([7; 20]),
            min_proposer_voting_power: U256::from(10u64),
            census_strategy_uri: "census://token".to_string(),
            execution_multisig_members: Vec::new(),
        }
    }

    fn parameters() -> ProposalParameters {
        ProposalParameters {
            security_block: 12,
            start_date: time::timestamp_from_chain(1_700_000_000).unwrap(),
            end_date: time::timestamp_from_chain(1_700_003_600).unwrap(),
            tally_end_date: time::timestamp_from_chain(1_700_007_200).unwrap(),
            total_voting_power: U256::from(1_000u64),
            census_uri: "ipfs://census".to_string(),
            census_root: "0xroot".to_string(),
        }
    }

    #[test]
    fn test_current_settings_field_order() {
        let codec = codec_for(ProtocolVariant::Current);
        let raw = (codec.settings_to_on_chain)(&settings()).unwrap();
        assert_eq!(raw.0.len(), 9);
        assert_eq!(raw.0[2], RawValue::Uint(U256::from(200_000u64)));
        assert_eq!(raw.0[3], RawValue::Uint(U256::from(500_000u64)));
        assert_eq!(raw.0[5], RawValue::Uint(U256::from(1800u64)));
        assert_eq!((codec.settings_from_on_chain)(&raw).unwrap(), settings());
    }

    #[test]
    fn test_legacy_settings_drop_tally_duration() {
        let codec = codec_for(ProtocolVariant::Legacy);
        let raw = (codec.settings_to_on_chain)(&settings()).unwrap();
        assert_eq!(raw.0.len(), 8);
        let decoded = (codec.settings_from_on_chain)(&raw).unwrap();
        assert_eq!(decoded.min_tally_duration, 0);
        assert_eq!(decoded.dao_token_address, settings().dao_token_address);
    }

    #[test]
    fn test_variant_mismatch_is_rejected() {
        let legacy_raw = (codec_for(ProtocolVariant::Legacy).settings_to_on_chain)(&settings()).unwrap();
        let err = (codec_for(ProtocolVariant::Current).settings_from_on_chain)(&legacy_raw).unwrap_err();
        assert_eq!(err, GovernanceError::SizeMismatch { expected: 9, actual: 8 });
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        let mut raw = (codec_for(ProtocolVariant::Current).settings_to_on_chain)(&settings()).unwrap();
        raw.0[6] = RawValue::String("not an address".to_string());
        let err = (codec_for(ProtocolVariant::Current).settings_from_on_chain)(&raw).unwrap_err();
        assert!(matches!(err, GovernanceError::StructLayout(_)));
    }

    #[test]
    fn test_ratio_above_base_is_rejected() {
        let mut raw = (codec_for(ProtocolVariant::Current).settings_to_on_chain)(&settings()).unwrap();
        raw.0[3] = RawValue::Uint(U256::from(1_000_001u64));
        let err = (codec_for(ProtocolVariant::Current).settings_from_on_chain)(&raw).unwrap_err();
        assert!(matches!(err, GovernanceError::Core(_)));
    }

    #[test]
    fn test_parameters_use_seconds() {
        for variant in [ProtocolVariant::Current, ProtocolVariant::Legacy] {
            let codec = codec_for(variant);
            let raw = (codec.parameters_to_on_chain)(&parameters()).unwrap();
            assert!(raw.0.contains(&RawValue::Uint(U256::from(1_700_003_600u64))));
            let decoded = (codec.parameters_from_on_chain)(&raw).unwrap();
            assert_eq!(decoded.end_date, parameters().end_date);
        }
    }

    #[test]
    fn test_proposal_from_on_chain() {
        let codec = codec_for(ProtocolVariant::Current);
        let member = Address::from_bytes([3; 20]);
        let raw = RawProposal {
            executed: false,
            approvers: vec![member, member],
            vochain_proposal_id: "c5d2".to_string(),
            parameters: (codec.parameters_to_on_chain)(&parameters()).unwrap(),
            allow_failure_map: U256::zero(),
            tally: vec![vec![U256::from(7u64), U256::from(3u64), U256::one()]],
            actions: Vec::new(),
        };
        let id = ProposalId::new(Address::from_bytes([9; 20]), 1u64);
        let record = codec.proposal_from_on_chain(id, &raw).unwrap();
        assert_eq!(record.approvers.len(), 1);
        assert_eq!(record.tally, vec![[U256::from(7u64), U256::from(3u64), U256::one()]]);
        assert_eq!(record.creator, None);

        let bad = RawProposal {
            tally: vec![vec![U256::one(), U256::one()]],
            ..raw
        };
        assert!(codec.proposal_from_on_chain(id, &bad).is_err());
    }
}
