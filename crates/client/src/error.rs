//! Error types for the settlement client and its collaborators.

use std::time::Duration;

use thiserror::Error;

use gasless_voting_core::{Address, ConfigError, CoreError};
use gasless_voting_governance::GovernanceError;

/// Errors raised by the settlement contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// The transaction or call reverted
    #[error("Reverted: {0}")]
    Reverted(String),

    /// The node could not be reached or returned garbage
    #[error("Transport error: {0}")]
    Transport(String),

    /// No transaction with this hash is known
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),
}

/// Result type for contract calls
pub type ContractResult<T> = Result<T, ContractError>;

/// Errors raised by the off-chain voting network
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VotingNetworkError {
    /// The election does not exist yet
    #[error("Election not found: {0}")]
    ElectionNotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type for voting network calls
pub type VotingNetworkResult<T> = Result<T, VotingNetworkError>;

/// Errors raised by the indexing service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexerError {
    #[error("Query failed: {0}")]
    Query(String),

    /// A record could not be converted into the domain model
    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Result type for indexer queries
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Errors surfaced by the gasless voting client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The signer may not publish or approve tallies
    #[error("{0} is not an execution multisig member")]
    NotMultisigMember(Address),

    /// The voting network has not finalized the election yet; retry later
    #[error("Results of election {0} are not final yet")]
    ResultsNotFinal(String),

    /// The election is not available on the voting network yet
    #[error("Election not found: {0}")]
    ElectionNotFound(String),

    #[error("Proposal not found: {0}")]
    ProposalNotFound(String),

    /// The creation transaction was mined without a `ProposalCreated` event
    #[error("Proposal creation failed: {0}")]
    ProposalCreationError(String),

    #[error("Size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The signer already approved this tally
    #[error("{approver} already approved proposal {proposal_id}")]
    AlreadyApproved { proposal_id: String, approver: Address },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("Voting network error: {0}")]
    VotingNetwork(VotingNetworkError),

    #[error("Indexer error: {0}")]
    Indexer(#[from] IndexerError),

    /// A collaborator did not answer in time
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout { operation: String, elapsed: Duration },
}

impl ClientError {
    /// Whether retrying the same call later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::ResultsNotFinal(_) | ClientError::ElectionNotFound(_) | ClientError::Timeout { .. }
        )
    }
}

impl From<VotingNetworkError> for ClientError {
    fn from(err: VotingNetworkError) -> Self {
        match err {
            VotingNetworkError::ElectionNotFound(id) => ClientError::ElectionNotFound(id),
            other => ClientError::VotingNetwork(other),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(ClientError::ResultsNotFinal("e1".to_string()).is_recoverable());
        assert!(ClientError::from(VotingNetworkError::ElectionNotFound("e1".to_string())).is_recoverable());
        assert!(ClientError::Timeout {
            operation: "getProposal".to_string(),
            elapsed: Duration::from_secs(1),
        }
        .is_recoverable());

        assert!(!ClientError::NotMultisigMember(Address::ZERO).is_recoverable());
        assert!(!ClientError::from(VotingNetworkError::Transport("down".to_string())).is_recoverable());
        assert!(!ClientError::ProposalCreationError("no event".to_string()).is_recoverable());
    }
}
