//! Reconciliation between off-chain election results and the on-chain tally.

use tracing::debug;

use gasless_voting_core::U256;

use crate::model::{ElectionSnapshot, Question, Tally, TallyRow, VoteOption, VoteResult};

const ZERO_ROW: TallyRow = [U256([0; 4]); 3];

fn row_from_question(question: &Question) -> TallyRow {
    let mut row = ZERO_ROW;
    for choice in &question.choices {
        match VoteOption::from_label(&choice.label) {
            Some(option) => row[option.column()] = choice.result.unwrap_or_default(),
            None => debug!("Ignoring choice {:?} outside the vote vocabulary", choice.label),
        }
    }
    row
}

/// Convert an election's results into the on-chain tally shape.
///
/// One `[yes, no, abstain]` row per question. A non-final election or one
/// without questions yields a single zero row instead of an error; callers
/// check `final_results` before submitting a tally.
pub fn to_on_chain_tally(election: &ElectionSnapshot) -> Tally {
    if !election.final_results || election.questions.is_empty() {
        return vec![ZERO_ROW];
    }
    election.questions.iter().map(row_from_question).collect()
}

/// Name the columns of a tally row
pub fn from_on_chain_tally(row: &TallyRow) -> VoteResult {
    VoteResult {
        yes: row[VoteOption::Yes.column()],
        no: row[VoteOption::No.column()],
        abstain: row[VoteOption::Abstain.column()],
    }
}

/// Result of the first question of an election, zero when there is none
pub fn vote_result_from_questions(questions: &[Question]) -> VoteResult {
    questions
        .first()
        .map(|question| from_on_chain_tally(&row_from_question(question)))
        .unwrap_or_default()
}

/// Result of the first row of a stored tally, zero when no tally was set
pub fn vote_result_from_tally(tally: &Tally) -> VoteResult {
    tally.first().map(from_on_chain_tally).unwrap_or_default()
}
