//! Proposal views returned to applications.

use serde::{Deserialize, Serialize};

use gasless_voting_core::{Address, ProposalId, Timestamp, U256};
use gasless_voting_governance::{
    evaluate_proposal, vote_result_from_questions, vote_result_from_tally, DaoAction, ElectionSnapshot,
    ExecutionInfo, GovernanceResult, ParticipationResult, ProposalRecord, ProposalStatus, VoteResult,
    VotingSettings,
};

use crate::indexer::TokenDetails;

/// Results as reported by the voting network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VochainTally {
    pub final_results: bool,
    /// Raw choice results of the first question, in ballot order
    pub value: Vec<U256>,
    pub parsed: VoteResult,
}

/// A proposal with its election, settings and derived state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalView {
    pub id: ProposalId,
    pub creator: Option<Address>,
    pub title: String,
    pub description: String,
    /// Title of the first ballot question
    pub summary: String,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub tally_end_date: Timestamp,
    pub creation_date: Option<Timestamp>,
    pub creation_block_number: Option<u64>,
    pub actions: Vec<DaoAction>,
    pub fail_safe_actions: Vec<bool>,
    pub settings: VotingSettings,
    pub token: Option<TokenDetails>,
    pub vochain_tally: VochainTally,
    /// Tally stored on chain, empty until published
    pub tally: Vec<[U256; 3]>,
    pub total_voting_weight: U256,
    pub total_used_weight: U256,
    pub participation: ParticipationResult,
    pub status: ProposalStatus,
    pub voters: Vec<Address>,
    pub approvers: Vec<Address>,
    pub executed: bool,
    pub execution: Option<ExecutionInfo>,
    pub can_be_approved: bool,
}

impl ProposalView {
    /// Combine an indexed proposal with its election as of `now`
    pub fn build(
        now: Timestamp,
        record: ProposalRecord,
        election: &ElectionSnapshot,
        settings: VotingSettings,
        token: Option<TokenDetails>,
        voters: Vec<Address>,
    ) -> GovernanceResult<Self> {
        let parsed = vote_result_from_questions(&election.questions);
        let decimals = token.as_ref().map(|token| token.decimals).unwrap_or(0);
        let evaluation = evaluate_proposal(
            now,
            &record,
            &settings,
            parsed,
            election.census_weight,
            decimals,
            election.final_results,
        )?;

        let value = election
            .questions
            .first()
            .map(|question| {
                question
                    .choices
                    .iter()
                    .map(|choice| choice.result.unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        let fail_safe_actions = record.fail_safe_actions();
        Ok(Self {
            id: record.id,
            creator: record.creator,
            title: election.title.clone(),
            description: election.description.clone().unwrap_or_default(),
            summary: election
                .questions
                .first()
                .map(|question| question.title.clone())
                .unwrap_or_default(),
            start_date: record.parameters.start_date,
            end_date: record.parameters.end_date,
            tally_end_date: record.parameters.tally_end_date,
            creation_date: record.creation_date,
            creation_block_number: record.creation_block_number,
            actions: record.actions,
            fail_safe_actions,
            settings,
            token,
            vochain_tally: VochainTally {
                final_results: election.final_results,
                value,
                parsed,
            },
            tally: record.tally,
            total_voting_weight: election.census_weight,
            total_used_weight: parsed.total(),
            participation: evaluation.participation,
            status: evaluation.status,
            voters,
            approvers: record.approvers.as_slice().to_vec(),
            executed: record.executed,
            execution: record.execution,
            can_be_approved: evaluation.can_be_approved,
        })
    }
}

/// A proposal in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalListItem {
    pub id: ProposalId,
    pub creator: Option<Address>,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    pub tally_end_date: Timestamp,
    pub creation_date: Option<Timestamp>,
    pub actions: Vec<DaoAction>,
    pub approvers: usize,
    pub status: ProposalStatus,
    /// Result of the tally stored on chain, zero until published
    pub result: VoteResult,
}

impl ProposalListItem {
    /// Derive a listing entry from the stored tally and the census weight.
    ///
    /// Only a published tally counts, so an unpublished proposal never
    /// reads as succeeded here.
    pub fn build(
        now: Timestamp,
        record: ProposalRecord,
        census_weight: U256,
        settings: &VotingSettings,
        token_decimals: u32,
    ) -> GovernanceResult<Self> {
        let result = vote_result_from_tally(&record.tally);
        let evaluation = evaluate_proposal(
            now,
            &record,
            settings,
            result,
            census_weight,
            token_decimals,
            record.has_tally(),
        )?;

        Ok(Self {
            id: record.id,
            creator: record.creator,
            start_date: record.parameters.start_date,
            end_date: record.parameters.end_date,
            tally_end_date: record.parameters.tally_end_date,
            creation_date: record.creation_date,
            actions: record.actions,
            approvers: record.approvers.len(),
            status: evaluation.status,
            result,
        })
    }
}
