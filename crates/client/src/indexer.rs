//! The read-only indexing service.
//!
//! The indexer reports timestamps as unix seconds and identifies entities
//! with `<plugin>_<suffix>` ids. Conversion into the governance model goes
//! through the same timestamp boundary as contract data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gasless_voting_core::{time, Address, CoreError, ProposalId, U256};
use gasless_voting_governance::{
    tally_matrix_from_raw, Approvers, DaoAction, ExecutionInfo, ProposalParameters, ProposalRecord,
    ProposalStatus,
};

use crate::error::{IndexerError, IndexerResult};

/// Order of a proposal listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProposalSortBy {
    #[default]
    CreatedAt,
    StartDate,
    EndDate,
    TallyEndDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Filter and pagination of a proposal listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalQuery {
    pub plugin_address: Address,
    pub skip: usize,
    pub limit: usize,
    pub sort_by: ProposalSortBy,
    pub direction: SortDirection,
    /// Applied by the client after the status is derived; when set, `skip`
    /// and `limit` count matching proposals
    pub status: Option<ProposalStatus>,
}

impl ProposalQuery {
    /// First page of ten, newest first
    pub fn new(plugin_address: Address) -> Self {
        Self {
            plugin_address,
            skip: 0,
            limit: 10,
            sort_by: ProposalSortBy::CreatedAt,
            direction: SortDirection::Desc,
            status: None,
        }
    }
}

/// A proposal as stored by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedProposal {
    /// Entity id, `<plugin>_0x<local id>`
    pub id: String,
    pub dao_address: Address,
    pub creator: Address,
    pub vochain_proposal_id: String,
    pub start_date: u64,
    pub end_date: u64,
    pub tally_end_date: u64,
    pub creation_date: u64,
    pub creation_block_number: u64,
    pub security_block: u64,
    pub total_voting_power: U256,
    pub census_uri: String,
    pub census_root: String,
    pub actions: Vec<DaoAction>,
    pub allow_failure_map: U256,
    /// Approver entity ids, `<plugin>_<member>`
    pub approvers: Vec<String>,
    /// On-chain tally, empty until set
    pub tally: Vec<Vec<U256>>,
    pub executed: bool,
    pub execution_date: Option<u64>,
    pub execution_block_number: Option<u64>,
    pub execution_tx_hash: Option<String>,
}

fn malformed(id: &str, err: CoreError) -> IndexerError {
    IndexerError::Malformed(format!("proposal {}: {}", id, err))
}

/// Member address of an approver entity id
pub fn approver_address(entity_id: &str) -> Result<Address, CoreError> {
    let member = entity_id.rsplit('_').next().unwrap_or(entity_id);
    Address::parse(member)
}

impl IndexedProposal {
    /// Convert into the governance model
    pub fn into_record(self) -> IndexerResult<ProposalRecord> {
        let id = ProposalId::decode(&self.id).map_err(|e| malformed(&self.id, e))?;
        let ts = |seconds: u64| time::timestamp_from_chain(seconds).map_err(|e| malformed(&self.id, e));

        let parameters = ProposalParameters {
            security_block: self.security_block,
            start_date: ts(self.start_date)?,
            end_date: ts(self.end_date)?,
            tally_end_date: ts(self.tally_end_date)?,
            total_voting_power: self.total_voting_power,
            census_uri: self.census_uri.clone(),
            census_root: self.census_root.clone(),
        };

        let approvers = self
            .approvers
            .iter()
            .map(|entity| approver_address(entity).map_err(|e| malformed(&self.id, e)))
            .collect::<IndexerResult<Approvers>>()?;

        let tally = tally_matrix_from_raw(&self.tally)
            .map_err(|e| IndexerError::Malformed(format!("proposal {}: {}", self.id, e)))?;

        let execution = if self.executed {
            Some(ExecutionInfo {
                date: self.execution_date.map(&ts).transpose()?,
                block_number: self.execution_block_number,
                tx_hash: self.execution_tx_hash.clone(),
            })
        } else {
            None
        };

        Ok(ProposalRecord {
            id,
            creator: Some(self.creator),
            vochain_proposal_id: self.vochain_proposal_id.clone(),
            parameters,
            actions: self.actions.clone(),
            allow_failure_map: self.allow_failure_map,
            approvers,
            tally,
            executed: self.executed,
            execution,
            creation_date: Some(ts(self.creation_date)?),
            creation_block_number: Some(self.creation_block_number),
        })
    }
}

/// A member that delegated its voting power
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegator {
    pub address: Address,
    pub balance: U256,
}

/// A token holder as stored by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedMember {
    pub address: Address,
    pub balance: U256,
    pub voting_power: U256,
    pub delegatee: Option<Address>,
    pub delegators: Vec<Delegator>,
}

/// A token holder of the plugin's DAO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingMember {
    pub address: Address,
    pub balance: U256,
    pub voting_power: U256,
    /// `None` when the member votes with its own power
    pub delegatee: Option<Address>,
    /// Other members delegating to this one
    pub delegators: Vec<Delegator>,
}

impl From<IndexedMember> for VotingMember {
    fn from(member: IndexedMember) -> Self {
        let address = member.address;
        Self {
            address,
            balance: member.balance,
            voting_power: member.voting_power,
            delegatee: member.delegatee.filter(|delegatee| *delegatee != address),
            delegators: member
                .delegators
                .into_iter()
                .filter(|delegator| delegator.address != address)
                .collect(),
        }
    }
}

/// The governance token of a plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDetails {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

/// Read-only queries against the indexing service
#[async_trait]
pub trait ProposalIndex: Send + Sync {
    /// A single proposal, `None` when it is not indexed yet
    async fn proposal(&self, id: &ProposalId) -> IndexerResult<Option<IndexedProposal>>;

    /// Proposals of a plugin, sorted and paginated by `query`
    async fn proposals(&self, query: &ProposalQuery) -> IndexerResult<Vec<IndexedProposal>>;

    async fn execution_multisig_members(&self, plugin: Address) -> IndexerResult<Vec<Address>>;

    async fn members(&self, plugin: Address) -> IndexerResult<Vec<IndexedMember>>;

    async fn token(&self, plugin: Address) -> IndexerResult<Option<TokenDetails>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin() -> Address {
        Address::from_bytes([0xab; 20])
    }

    fn indexed() -> IndexedProposal {
        let member = Address::from_bytes([1; 20]);
        IndexedProposal {
            id: ProposalId::new(plugin(), 5u64).encode(),
            dao_address: Address::from_bytes([0xda; 20]),
            creator: Address::from_bytes([2; 20]),
            vochain_proposal_id: "c5d2".to_string(),
            start_date: 1_700_000_000,
            end_date: 1_700_003_600,
            tally_end_date: 1_700_007_200,
            creation_date: 1_699_999_000,
            creation_block_number: 10,
            security_block: 9,
            total_voting_power: U256::from(100u64),
            census_uri: "ipfs://census".to_string(),
            census_root: "0xroot".to_string(),
            actions: Vec::new(),
            allow_failure_map: U256::zero(),
            approvers: vec![format!("{}_{}", plugin(), member)],
            tally: vec![vec![U256::from(7u64), U256::from(3u64), U256::one()]],
            executed: true,
            execution_date: Some(1_700_008_000),
            execution_block_number: Some(42),
            execution_tx_hash: Some("0xfeed".to_string()),
        }
    }

    #[test]
    fn test_into_record() {
        let record = indexed().into_record().unwrap();
        assert_eq!(record.id, ProposalId::new(plugin(), 5u64));
        assert_eq!(record.approvers.as_slice(), &[Address::from_bytes([1; 20])]);
        assert_eq!(record.parameters.end_date.timestamp(), 1_700_003_600);
        assert_eq!(record.parameters.security_block, 9);
        let execution = record.execution.unwrap();
        assert_eq!(execution.block_number, Some(42));
        assert_eq!(execution.date.unwrap().timestamp(), 1_700_008_000);
    }

    #[test]
    fn test_malformed_records_are_rejected() {
        let bad_id = IndexedProposal {
            id: "not-a-proposal".to_string(),
            ..indexed()
        };
        assert!(matches!(bad_id.into_record(), Err(IndexerError::Malformed(_))));

        let bad_tally = IndexedProposal {
            tally: vec![vec![U256::one()]],
            ..indexed()
        };
        assert!(matches!(bad_tally.into_record(), Err(IndexerError::Malformed(_))));
    }

    #[test]
    fn test_member_self_delegation() {
        let address = Address::from_bytes([1; 20]);
        let other = Address::from_bytes([2; 20]);
        let member = VotingMember::from(IndexedMember {
            address,
            balance: U256::from(10u64),
            voting_power: U256::from(15u64),
            delegatee: Some(address),
            delegators: vec![
                Delegator { address, balance: U256::from(10u64) },
                Delegator { address: other, balance: U256::from(5u64) },
            ],
        });
        assert_eq!(member.delegatee, None);
        assert_eq!(member.delegators.len(), 1);
        assert_eq!(member.delegators[0].address, other);
    }
}
