//! Governance rules for gasless voting proposals
//!
//! Voting happens on an off-chain voting network; settlement happens on
//! chain once enough execution multisig members approve the published
//! tally. This crate holds the pure parts of that process: the proposal
//! model, the mapping of on-chain structs, tally reconciliation, and the
//! participation, outcome and status rules.

use thiserror::Error;

use gasless_voting_core::CoreError;

pub mod evaluation;
pub mod mapping;
pub mod model;
pub mod outcome;
pub mod participation;
pub mod status;
pub mod tally;

/// Error types for governance operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GovernanceError {
    /// Invalid core value
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A raw on-chain tuple does not match the expected layout
    #[error("Struct layout error: {0}")]
    StructLayout(String),

    /// Two sequences that must line up have different lengths
    #[error("Size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;

// Re-exports
pub use evaluation::{evaluate_proposal, ProposalEvaluation};
pub use mapping::{
    codec_for, tally_matrix_from_raw, tally_matrix_to_raw, RawProposal, RawTuple, RawValue, StructCodec,
};
pub use model::{
    allow_failure_map_from_flags, Approvers, Choice, DaoAction, ElectionSnapshot, ExecutionInfo,
    ProposalParameters, ProposalRecord, ProposalStatus, Question, Tally, TallyRow, VoteOption,
    VoteResult, VotingSettings,
};
pub use outcome::has_succeeded;
pub use participation::{evaluate_participation, ParticipationResult};
pub use status::{compute_status, proposal_status};
pub use tally::{from_on_chain_tally, to_on_chain_tally, vote_result_from_questions, vote_result_from_tally};
