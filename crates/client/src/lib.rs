//! Gasless voting settlement client
//!
//! Creates proposals for elections run on an off-chain voting network,
//! reads them back with their derived status, and drives the tally
//! approval workflow of the execution multisig. The chain, the voting
//! network and the indexer are reached through the collaborator traits
//! in [`contract`], [`voting_network`] and [`indexer`].

pub mod client;
pub mod contract;
pub mod error;
pub mod indexer;
pub mod params;
pub mod progress;
pub mod view;
pub mod voting_network;
pub mod workflow;
pub mod write_queue;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key components
pub use client::GaslessVotingClient;
pub use contract::{ContractEvent, CreateProposalCall, SettlementContract, TxHandle, TxReceipt};
pub use error::{
    ClientError, ClientResult, ContractError, ContractResult, IndexerError, IndexerResult, VotingNetworkError,
    VotingNetworkResult,
};
pub use indexer::{
    Delegator, IndexedMember, IndexedProposal, ProposalIndex, ProposalQuery, ProposalSortBy, SortDirection,
    TokenDetails, VotingMember,
};
pub use params::CreateProposalParams;
pub use progress::{complete, ProgressEvent, ProgressStream};
pub use view::{ProposalListItem, ProposalView, VochainTally};
pub use voting_network::VotingNetwork;
pub use workflow::{plan_approval, ApprovalStep};
pub use write_queue::{WriteGuard, WriteQueue};
