//! Two-phase tally settlement.
//!
//! The first execution multisig member to approve publishes the final
//! off-chain tally with `setTally`, which also counts as their approval.
//! Later members ratify the published tally with `approveTally`. The
//! choice between the two is made from freshly fetched state on every
//! call, so `approve` can always be retried from the top.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gasless_voting_core::Address;
use gasless_voting_governance::{to_on_chain_tally, ElectionSnapshot, ProposalRecord, Tally, VotingSettings};

use crate::error::{ClientError, ClientResult};

/// The on-chain call `approve` resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStep {
    /// Publish the reconciled tally
    SetTally(Tally),
    /// Ratify the published tally
    ApproveTally { try_execution: bool },
}

/// Decide the next approval call for `signer`.
///
/// Fails before anything is submitted when the signer is not an execution
/// multisig member, when the election is not final, or when the signer
/// already approved.
pub fn plan_approval(
    record: &ProposalRecord,
    settings: &VotingSettings,
    election: &ElectionSnapshot,
    signer: Address,
    try_execution: bool,
) -> ClientResult<ApprovalStep> {
    if !settings.is_execution_multisig_member(&signer) {
        return Err(ClientError::NotMultisigMember(signer));
    }
    if !election.final_results {
        debug!("Election {} of proposal {} is not final", election.election_id, record.id);
        return Err(ClientError::ResultsNotFinal(election.election_id.clone()));
    }
    if record.approvers.contains(&signer) {
        return Err(ClientError::AlreadyApproved {
            proposal_id: record.id.encode(),
            approver: signer,
        });
    }

    if record.approvers.is_empty() {
        let tally = to_on_chain_tally(election);
        info!("Publishing the tally of proposal {} ({} rows)", record.id, tally.len());
        Ok(ApprovalStep::SetTally(tally))
    } else {
        info!(
            "Approving the tally of proposal {} ({} approvers so far)",
            record.id,
            record.approvers.len()
        );
        Ok(ApprovalStep::ApproveTally { try_execution })
    }
}
