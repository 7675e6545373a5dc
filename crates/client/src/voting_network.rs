//! The off-chain voting network.

use async_trait::async_trait;

use gasless_voting_core::Address;
use gasless_voting_governance::ElectionSnapshot;

use crate::error::VotingNetworkResult;

/// Read access to elections on the voting network
#[async_trait]
pub trait VotingNetwork: Send + Sync {
    /// Fetch an election, failing with `ElectionNotFound` for unknown ids
    async fn fetch_election(&self, election_id: &str) -> VotingNetworkResult<ElectionSnapshot>;

    /// Addresses that cast a vote in an election
    async fn fetch_voters(&self, election_id: &str) -> VotingNetworkResult<Vec<Address>>;
}
