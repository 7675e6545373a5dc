//! Gasless voting
//!
//! Proposals voted on an off-chain voting network and settled on chain by
//! an execution multisig: identifiers, struct mapping, tally and outcome
//! rules, and the client that ties the chain, the voting network and the
//! indexer together.

/// Module version information
pub mod version {
    /// The current version of the gasless voting library
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Re-export core components for easy access
pub mod core {
    pub use gasless_voting_core::*;
}

/// Proposal rules
pub mod governance {
    pub use gasless_voting_governance::*;
}

/// Settlement client and its collaborators
pub mod client {
    pub use gasless_voting_client::*;
}

pub use gasless_voting_client::{ClientError, ClientResult, GaslessVotingClient};
pub use gasless_voting_core::{init_tracing, ClientConfig, ProposalId};
