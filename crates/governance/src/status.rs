//! Derived proposal status.
//!
//! Status is never stored. It is recomputed from the proposal record, the
//! current time and the vote outcome every time it is needed.

use gasless_voting_core::Timestamp;

use crate::model::{ProposalRecord, ProposalStatus};

/// Compute a proposal's status from its time window and flags.
///
/// Rules apply in order:
/// 1. before `start`: `Pending`
/// 2. executed: `Executed`
/// 3. before `end`: `Active`
/// 4. before `tally_end` with a successful vote: `Succeeded` once approved,
///    `Active` while approvals are pending
/// 5. otherwise `Defeated`
pub fn compute_status(
    now: Timestamp,
    executed: bool,
    start: Timestamp,
    end: Timestamp,
    tally_end: Timestamp,
    has_succeeded: bool,
    approved: bool,
) -> ProposalStatus {
    if now < start {
        return ProposalStatus::Pending;
    }
    if executed {
        return ProposalStatus::Executed;
    }
    if now < end {
        return ProposalStatus::Active;
    }
    if now < tally_end && has_succeeded {
        return if approved {
            ProposalStatus::Succeeded
        } else {
            ProposalStatus::Active
        };
    }
    ProposalStatus::Defeated
}

/// Status of a proposal record
pub fn proposal_status(
    now: Timestamp,
    record: &ProposalRecord,
    has_succeeded: bool,
    approved: bool,
) -> ProposalStatus {
    let params = &record.parameters;
    compute_status(
        now,
        record.executed,
        params.start_date,
        params.end_date,
        params.tally_end_date,
        has_succeeded,
        approved,
    )
}
