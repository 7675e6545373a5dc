//! Full evaluation of a proposal at a point in time.

use serde::{Deserialize, Serialize};
use tracing::debug;

use gasless_voting_core::{Timestamp, U256};

use crate::model::{ProposalRecord, ProposalStatus, VoteResult, VotingSettings};
use crate::outcome::has_succeeded;
use crate::participation::{evaluate_participation, ParticipationResult};
use crate::status::proposal_status;
use crate::GovernanceResult;

/// Everything derived from a proposal, its settings and its vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalEvaluation {
    pub result: VoteResult,
    pub participation: ParticipationResult,
    /// Vote succeeded on final results
    pub has_succeeded: bool,
    /// Enough approvers ratified the tally
    pub approved: bool,
    pub status: ProposalStatus,
    /// The tally may be published and approved
    pub can_be_approved: bool,
}

/// Evaluate a proposal.
///
/// `final_results` gates success: results the voting network may still
/// change never make a proposal succeed. Inside the tally window such a
/// proposal is still awaiting its results and reads as `Active`.
pub fn evaluate_proposal(
    now: Timestamp,
    record: &ProposalRecord,
    settings: &VotingSettings,
    result: VoteResult,
    census_weight: U256,
    token_decimals: u32,
    final_results: bool,
) -> GovernanceResult<ProposalEvaluation> {
    let participation = evaluate_participation(
        settings.min_participation,
        result.total(),
        census_weight,
        token_decimals,
    )?;

    let succeeded = final_results
        && has_succeeded(
            result.yes,
            result.no,
            Some(settings.support_threshold),
            Some(participation.missing_participation),
        );
    let approved = record.is_approved(settings.min_tally_approvals);
    let status = match proposal_status(now, record, succeeded, approved) {
        ProposalStatus::Defeated if !final_results && now < record.parameters.tally_end_date => {
            ProposalStatus::Active
        }
        status => status,
    };

    debug!(
        "Proposal {} is {} (succeeded: {}, approvers: {}/{})",
        record.id,
        status,
        succeeded,
        record.approvers.len(),
        settings.min_tally_approvals
    );

    Ok(ProposalEvaluation {
        result,
        participation,
        has_succeeded: succeeded,
        approved,
        status,
        can_be_approved: succeeded && final_results,
    })
}
