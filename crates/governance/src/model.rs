//! Proposal, settings and election records.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use gasless_voting_core::{Address, ProposalId, Timestamp, U256};

use crate::{GovernanceError, GovernanceResult};

/// Largest number of actions a proposal can carry (one bit each in the failure map)
pub const MAX_ACTIONS: usize = 256;

/// Plugin-wide governance parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSettings {
    /// Only execution multisig members may create proposals
    pub only_execution_multisig_proposal_creation: bool,
    /// Approvals required before the tally is considered ratified
    pub min_tally_approvals: u16,
    /// Fraction of the census weight that must vote
    pub min_participation: Decimal,
    /// Fraction of yes against yes + no required to pass
    pub support_threshold: Decimal,
    /// Minimum voting window, in seconds
    pub min_vote_duration: u64,
    /// Minimum tally window after voting ends, in seconds
    pub min_tally_duration: u64,
    /// Governance token of the DAO
    pub dao_token_address: Address,
    /// Voting power needed to create a proposal
    pub min_proposer_voting_power: U256,
    /// Census strategy consumed by the voting network
    pub census_strategy_uri: String,
    /// Members allowed to publish and approve tallies
    pub execution_multisig_members: Vec<Address>,
}

impl VotingSettings {
    /// Check whether an address may approve tallies
    pub fn is_execution_multisig_member(&self, address: &Address) -> bool {
        self.execution_multisig_members.contains(address)
    }
}

/// An action executed by the DAO when the proposal passes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoAction {
    /// Call target
    pub to: Address,
    /// Native value sent with the call
    pub value: U256,
    /// Calldata
    pub data: Vec<u8>,
}

/// Time window and census snapshot of a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalParameters {
    /// Block used as the census snapshot guard, 0 when unknown
    pub security_block: u64,
    /// Voting opens
    pub start_date: Timestamp,
    /// Voting closes
    pub end_date: Timestamp,
    /// Tally approvals close
    pub tally_end_date: Timestamp,
    /// Total voting power at the snapshot
    pub total_voting_power: U256,
    /// Census location on the voting network
    pub census_uri: String,
    /// Census merkle root
    pub census_root: String,
}

/// Insertion-ordered set of approver addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Approvers(Vec<Address>);

impl Approvers {
    /// Create an empty set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add an approver, returning false if it was already present
    pub fn insert(&mut self, address: Address) -> bool {
        if self.0.contains(&address) {
            return false;
        }
        self.0.push(address);
        true
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains(address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.0
    }
}

impl FromIterator<Address> for Approvers {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        let mut approvers = Approvers::new();
        for address in iter {
            approvers.insert(address);
        }
        approvers
    }
}

/// One tally row in canonical column order `[yes, no, abstain]`
pub type TallyRow = [U256; 3];

/// One row per question
pub type Tally = Vec<TallyRow>;

/// Execution details, present once the proposal executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    pub date: Option<Timestamp>,
    pub block_number: Option<u64>,
    pub tx_hash: Option<String>,
}

/// A proposal as recorded on chain and by the indexer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: ProposalId,
    /// Absent when read straight from the contract, which does not store it
    pub creator: Option<Address>,
    /// Election on the off-chain voting network
    pub vochain_proposal_id: String,
    pub parameters: ProposalParameters,
    pub actions: Vec<DaoAction>,
    /// Bit `i` set means action `i` may fail without reverting the batch
    pub allow_failure_map: U256,
    pub approvers: Approvers,
    /// Empty until a tally is set
    pub tally: Tally,
    pub executed: bool,
    pub execution: Option<ExecutionInfo>,
    pub creation_date: Option<Timestamp>,
    pub creation_block_number: Option<u64>,
}

impl ProposalRecord {
    /// Whether enough approvers ratified the tally
    pub fn is_approved(&self, min_tally_approvals: u16) -> bool {
        self.approvers.len() >= usize::from(min_tally_approvals)
    }

    /// Whether a tally has been published on chain
    pub fn has_tally(&self) -> bool {
        !self.tally.is_empty()
    }

    /// Per-action failure permissions decoded from the bitmap
    pub fn fail_safe_actions(&self) -> Vec<bool> {
        (0..self.actions.len().min(MAX_ACTIONS))
            .map(|i| self.allow_failure_map.bit(i))
            .collect()
    }
}

/// Build the failure bitmap from per-action flags
pub fn allow_failure_map_from_flags(flags: &[bool]) -> GovernanceResult<U256> {
    if flags.len() > MAX_ACTIONS {
        return Err(GovernanceError::SizeMismatch {
            expected: MAX_ACTIONS,
            actual: flags.len(),
        });
    }
    Ok(flags
        .iter()
        .enumerate()
        .filter(|(_, allowed)| **allowed)
        .fold(U256::zero(), |map, (i, _)| map | (U256::one() << i)))
}

/// A ballot choice and its result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub result: Option<U256>,
}

/// A ballot question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub title: String,
    pub choices: Vec<Choice>,
}

/// The voting network's view of an election
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSnapshot {
    pub election_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Total eligible voting power
    pub census_weight: U256,
    pub census_uri: String,
    pub census_root: String,
    pub questions: Vec<Question>,
    /// The voting network will not change the results any more
    pub final_results: bool,
}

/// The fixed vote vocabulary, in on-chain column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOption {
    Yes,
    No,
    Abstain,
}

impl VoteOption {
    /// Options in canonical column order
    pub const ALL: [VoteOption; 3] = [VoteOption::Yes, VoteOption::No, VoteOption::Abstain];

    /// Column of this option in a tally row
    pub fn column(&self) -> usize {
        match self {
            VoteOption::Yes => 0,
            VoteOption::No => 1,
            VoteOption::Abstain => 2,
        }
    }

    /// Match a choice label against the vocabulary, ignoring case
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        VoteOption::ALL
            .into_iter()
            .find(|option| option.as_str().eq_ignore_ascii_case(label))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteOption::Yes => "yes",
            VoteOption::No => "no",
            VoteOption::Abstain => "abstain",
        }
    }
}

/// Named outcome of a single tally row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResult {
    pub yes: U256,
    pub no: U256,
    pub abstain: U256,
}

impl VoteResult {
    /// Weight of every vote cast, abstentions included.
    ///
    /// Saturates rather than overflowing; a census never exceeds 2^256.
    pub fn total(&self) -> U256 {
        self.yes
            .saturating_add(self.no)
            .saturating_add(self.abstain)
    }

    pub fn get(&self, option: VoteOption) -> U256 {
        match option {
            VoteOption::Yes => self.yes,
            VoteOption::No => self.no,
            VoteOption::Abstain => self.abstain,
        }
    }

    pub fn set(&mut self, option: VoteOption, value: U256) {
        match option {
            VoteOption::Yes => self.yes = value,
            VoteOption::No => self.no = value,
            VoteOption::Abstain => self.abstain = value,
        }
    }
}

/// Externally visible proposal status, always derived and never stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Pending,
    Active,
    Succeeded,
    Executed,
    Defeated,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProposalStatus::Pending => "PENDING",
            ProposalStatus::Active => "ACTIVE",
            ProposalStatus::Succeeded => "SUCCEEDED",
            ProposalStatus::Executed => "EXECUTED",
            ProposalStatus::Defeated => "DEFEATED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approvers_keep_order_and_uniqueness() {
        let a = Address::from_bytes([1; 20]);
        let b = Address::from_bytes([2; 20]);
        let approvers: Approvers = vec![b, a, b].into_iter().collect();
        assert_eq!(approvers.as_slice(), &[b, a]);
        assert_eq!(approvers.len(), 2);
    }

    #[test]
    fn test_allow_failure_map() {
        let map = allow_failure_map_from_flags(&[true, false, true]).unwrap();
        assert_eq!(map, U256::from(0b101u64));
        assert!(allow_failure_map_from_flags(&vec![false; MAX_ACTIONS + 1]).is_err());
        assert_eq!(allow_failure_map_from_flags(&[]).unwrap(), U256::zero());
    }

    #[test]
    fn test_vote_option_labels() {
        assert_eq!(VoteOption::from_label("YES"), Some(VoteOption::Yes));
        assert_eq!(VoteOption::from_label(" Abstain "), Some(VoteOption::Abstain));
        assert_eq!(VoteOption::from_label("maybe"), None);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&ProposalStatus::Succeeded).unwrap(), "\"SUCCEEDED\"");
        let status: ProposalStatus = serde_json::from_str("\"DEFEATED\"").unwrap();
        assert_eq!(status, ProposalStatus::Defeated);
        assert_eq!(ProposalStatus::Executed.to_string(), "EXECUTED");
    }
}
