//! The on-chain settlement contract, seen as an RPC substrate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use gasless_voting_core::{Address, U256};
use gasless_voting_governance::{DaoAction, RawProposal, RawTuple};

use crate::error::ContractResult;

/// A submitted, possibly unmined transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    pub hash: String,
}

impl TxHandle {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}

/// Events emitted by the plugin contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    ProposalCreated { proposal_id: U256 },
    TallySet { proposal_id: U256 },
    TallyApproved { proposal_id: U256, approver: Address },
    ProposalExecuted { proposal_id: U256 },
}

/// A mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub events: Vec<ContractEvent>,
}

impl TxReceipt {
    /// Local id of the proposal created by this transaction, if any
    pub fn created_proposal_id(&self) -> Option<U256> {
        self.events.iter().find_map(|event| match event {
            ContractEvent::ProposalCreated { proposal_id } => Some(*proposal_id),
            _ => None,
        })
    }
}

/// Arguments of `createProposal`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProposalCall {
    /// Election reference on the voting network
    pub vochain_proposal_id: Vec<u8>,
    pub allow_failure_map: U256,
    /// Parameters in the layout of the configured protocol variant
    pub parameters: RawTuple,
    pub actions: Vec<DaoAction>,
}

/// Calls the client needs from the gasless voting plugin contract
#[async_trait]
pub trait SettlementContract: Send + Sync {
    /// Account that signs submitted transactions
    fn signer_address(&self) -> Address;

    async fn create_proposal(&self, plugin: Address, call: CreateProposalCall) -> ContractResult<TxHandle>;

    /// Read a proposal, `None` when the local id is unknown
    async fn get_proposal(&self, plugin: Address, local_id: U256) -> ContractResult<Option<RawProposal>>;

    /// Publish the tally; counts as the signer's approval
    async fn set_tally(&self, plugin: Address, local_id: U256, tally: Vec<Vec<U256>>) -> ContractResult<TxHandle>;

    /// Ratify a published tally, executing when quorum is reached and `try_execution` is set
    async fn approve_tally(&self, plugin: Address, local_id: U256, try_execution: bool) -> ContractResult<TxHandle>;

    async fn execute_proposal(&self, plugin: Address, local_id: U256) -> ContractResult<TxHandle>;

    /// Raw settings tuple
    async fn get_plugin_settings(&self, plugin: Address) -> ContractResult<RawTuple>;

    /// Wait for a transaction to be mined with `confirmations` blocks on top
    async fn wait_for_receipt(&self, tx: &TxHandle, confirmations: u32) -> ContractResult<TxReceipt>;
}
