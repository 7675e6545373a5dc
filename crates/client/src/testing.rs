//! In-memory collaborators for tests and local development.
//!
//! `InMemoryContract` behaves like the plugin contract as seen through an
//! RPC node: submissions are accepted immediately and take effect when the
//! transaction is mined, which here happens on the first
//! `wait_for_receipt`. Two writes submitted before either is mined are
//! therefore checked against the same state, as on a real chain.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use gasless_voting_core::{Address, ProposalId, U256};
use gasless_voting_governance::{ElectionSnapshot, RawProposal, RawTuple};

use crate::contract::{ContractEvent, CreateProposalCall, SettlementContract, TxHandle, TxReceipt};
use crate::error::{
    ContractError, ContractResult, IndexerError, IndexerResult, VotingNetworkError, VotingNetworkResult,
};
use crate::indexer::{
    IndexedMember, IndexedProposal, ProposalIndex, ProposalQuery, ProposalSortBy, SortDirection, TokenDetails,
};
use crate::voting_network::VotingNetwork;

#[derive(Debug, Clone)]
enum Effect {
    Create {
        plugin: Address,
        call: CreateProposalCall,
    },
    SetTally {
        plugin: Address,
        local_id: U256,
        tally: Vec<Vec<U256>>,
        signer: Address,
    },
    ApproveTally {
        plugin: Address,
        local_id: U256,
        try_execution: bool,
        signer: Address,
    },
    Execute {
        plugin: Address,
        local_id: U256,
    },
}

#[derive(Debug, Default)]
struct PluginState {
    settings: RawTuple,
    proposals: Vec<RawProposal>,
}

#[derive(Debug, Default)]
struct ChainState {
    plugins: HashMap<Address, PluginState>,
    pending: HashMap<String, Effect>,
    receipts: HashMap<String, ContractResult<TxReceipt>>,
    submitted: Vec<String>,
    block_number: u64,
    drop_creation_events: bool,
}

impl ChainState {
    fn plugin(&mut self, plugin: Address) -> ContractResult<&mut PluginState> {
        self.plugins
            .get_mut(&plugin)
            .ok_or_else(|| ContractError::Reverted(format!("no plugin at {}", plugin)))
    }

    fn proposal(&mut self, plugin: Address, local_id: U256) -> ContractResult<(&mut RawProposal, u64)> {
        let state = self.plugin(plugin)?;
        let min_tally_approvals = state.settings.u64_at(1).unwrap_or(1);
        let index = usize::try_from(local_id.low_u64())
            .ok()
            .filter(|_| local_id.bits() <= 64)
            .ok_or_else(|| ContractError::Reverted(format!("unknown proposal {}", local_id)))?;
        let proposal = state
            .proposals
            .get_mut(index)
            .ok_or_else(|| ContractError::Reverted(format!("unknown proposal {}", local_id)))?;
        Ok((proposal, min_tally_approvals))
    }

    fn apply(&mut self, effect: Effect) -> ContractResult<Vec<ContractEvent>> {
        match effect {
            Effect::Create { plugin, call } => {
                let drop_events = self.drop_creation_events;
                let state = self.plugin(plugin)?;
                let proposal_id = U256::from(state.proposals.len());
                state.proposals.push(RawProposal {
                    executed: false,
                    approvers: Vec::new(),
                    vochain_proposal_id: hex::encode(&call.vochain_proposal_id),
                    parameters: call.parameters,
                    allow_failure_map: call.allow_failure_map,
                    tally: Vec::new(),
                    actions: call.actions,
                });
                if drop_events {
                    return Ok(Vec::new());
                }
                Ok(vec![ContractEvent::ProposalCreated { proposal_id }])
            }
            Effect::SetTally {
                plugin,
                local_id,
                tally,
                signer,
            } => {
                let (proposal, _) = self.proposal(plugin, local_id)?;
                if !proposal.approvers.is_empty() {
                    return Err(ContractError::Reverted("tally already set".to_string()));
                }
                proposal.tally = tally;
                proposal.approvers.push(signer);
                Ok(vec![ContractEvent::TallySet { proposal_id: local_id }])
            }
            Effect::ApproveTally {
                plugin,
                local_id,
                try_execution,
                signer,
            } => {
                let (proposal, min_tally_approvals) = self.proposal(plugin, local_id)?;
                if proposal.tally.is_empty() {
                    return Err(ContractError::Reverted("tally not set".to_string()));
                }
                if proposal.approvers.contains(&signer) {
                    return Err(ContractError::Reverted("already approved".to_string()));
                }
                proposal.approvers.push(signer);
                let mut events = vec![ContractEvent::TallyApproved {
                    proposal_id: local_id,
                    approver: signer,
                }];
                if try_execution && !proposal.executed && proposal.approvers.len() as u64 >= min_tally_approvals {
                    proposal.executed = true;
                    events.push(ContractEvent::ProposalExecuted { proposal_id: local_id });
                }
                Ok(events)
            }
            Effect::Execute { plugin, local_id } => {
                let (proposal, min_tally_approvals) = self.proposal(plugin, local_id)?;
                if proposal.executed {
                    return Err(ContractError::Reverted("already executed".to_string()));
                }
                if (proposal.approvers.len() as u64) < min_tally_approvals {
                    return Err(ContractError::Reverted("not enough approvals".to_string()));
                }
                proposal.executed = true;
                Ok(vec![ContractEvent::ProposalExecuted { proposal_id: local_id }])
            }
        }
    }
}

/// In-memory plugin contract
#[derive(Debug, Clone)]
pub struct InMemoryContract {
    state: Arc<Mutex<ChainState>>,
    tx_counter: Arc<AtomicU64>,
    signer: Address,
}

impl InMemoryContract {
    pub fn new(signer: Address) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChainState::default())),
            tx_counter: Arc::new(AtomicU64::new(0)),
            signer,
        }
    }

    /// Same chain, different signing account
    pub fn with_signer(&self, signer: Address) -> Self {
        Self {
            state: self.state.clone(),
            tx_counter: self.tx_counter.clone(),
            signer,
        }
    }

    /// Deploy a plugin with the given raw settings
    pub async fn deploy_plugin(&self, plugin: Address, settings: RawTuple) {
        let mut state = self.state.lock().await;
        state.plugins.insert(
            plugin,
            PluginState {
                settings,
                proposals: Vec::new(),
            },
        );
    }

    /// Mine creations without emitting `ProposalCreated`
    pub async fn drop_creation_events(&self, drop: bool) {
        self.state.lock().await.drop_creation_events = drop;
    }

    /// Hashes of every submitted transaction, in submission order
    pub async fn submitted(&self) -> Vec<String> {
        self.state.lock().await.submitted.clone()
    }

    /// Current state of a proposal
    pub async fn proposal(&self, plugin: Address, local_id: u64) -> Option<RawProposal> {
        let state = self.state.lock().await;
        state
            .plugins
            .get(&plugin)
            .and_then(|plugin| plugin.proposals.get(local_id as usize))
            .cloned()
    }

    async fn submit(&self, effect: Effect) -> ContractResult<TxHandle> {
        let nonce = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let tx = TxHandle::new(format!("0x{:064x}", nonce + 1));

        let mut state = self.state.lock().await;
        state.pending.insert(tx.hash.clone(), effect);
        state.submitted.push(tx.hash.clone());
        debug!("Accepted transaction {}", tx.hash);
        Ok(tx)
    }
}

#[async_trait]
impl SettlementContract for InMemoryContract {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn create_proposal(&self, plugin: Address, call: CreateProposalCall) -> ContractResult<TxHandle> {
        self.submit(Effect::Create { plugin, call }).await
    }

    async fn get_proposal(&self, plugin: Address, local_id: U256) -> ContractResult<Option<RawProposal>> {
        let state = self.state.lock().await;
        let plugin = state
            .plugins
            .get(&plugin)
            .ok_or_else(|| ContractError::Reverted(format!("no plugin at {}", plugin)))?;
        if local_id.bits() > 64 {
            return Ok(None);
        }
        Ok(plugin.proposals.get(local_id.low_u64() as usize).cloned())
    }

    async fn set_tally(&self, plugin: Address, local_id: U256, tally: Vec<Vec<U256>>) -> ContractResult<TxHandle> {
        let signer = self.signer;
        self.submit(Effect::SetTally {
            plugin,
            local_id,
            tally,
            signer,
        })
        .await
    }

    async fn approve_tally(&self, plugin: Address, local_id: U256, try_execution: bool) -> ContractResult<TxHandle> {
        let signer = self.signer;
        self.submit(Effect::ApproveTally {
            plugin,
            local_id,
            try_execution,
            signer,
        })
        .await
    }

    async fn execute_proposal(&self, plugin: Address, local_id: U256) -> ContractResult<TxHandle> {
        self.submit(Effect::Execute { plugin, local_id }).await
    }

    async fn get_plugin_settings(&self, plugin: Address) -> ContractResult<RawTuple> {
        let mut state = self.state.lock().await;
        Ok(state.plugin(plugin)?.settings.clone())
    }

    async fn wait_for_receipt(&self, tx: &TxHandle, _confirmations: u32) -> ContractResult<TxReceipt> {
        let mut state = self.state.lock().await;
        if let Some(receipt) = state.receipts.get(&tx.hash) {
            return receipt.clone();
        }
        let effect = state
            .pending
            .remove(&tx.hash)
            .ok_or_else(|| ContractError::UnknownTransaction(tx.hash.clone()))?;

        state.block_number += 1;
        let block_number = state.block_number;
        let receipt = state.apply(effect).map(|events| TxReceipt {
            tx_hash: tx.hash.clone(),
            block_number,
            events,
        });
        debug!("Mined transaction {} in block {}", tx.hash, block_number);
        state.receipts.insert(tx.hash.clone(), receipt.clone());
        receipt
    }
}

/// In-memory voting network
#[derive(Debug, Clone, Default)]
pub struct InMemoryVotingNetwork {
    elections: Arc<RwLock<HashMap<String, ElectionSnapshot>>>,
    voters: Arc<RwLock<HashMap<String, Vec<Address>>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
}

impl InMemoryVotingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish or replace an election
    pub async fn insert_election(&self, election: ElectionSnapshot) {
        self.elections
            .write()
            .await
            .insert(election.election_id.clone(), election);
    }

    pub async fn set_voters(&self, election_id: &str, voters: Vec<Address>) {
        self.voters.write().await.insert(election_id.to_string(), voters);
    }

    /// Delay every fetch of an election
    pub async fn set_delay(&self, election_id: &str, delay: Duration) {
        self.delays.write().await.insert(election_id.to_string(), delay);
    }

    async fn wait(&self, election_id: &str) {
        let delay = self.delays.read().await.get(election_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl VotingNetwork for InMemoryVotingNetwork {
    async fn fetch_election(&self, election_id: &str) -> VotingNetworkResult<ElectionSnapshot> {
        self.wait(election_id).await;
        self.elections
            .read()
            .await
            .get(election_id)
            .cloned()
            .ok_or_else(|| VotingNetworkError::ElectionNotFound(election_id.to_string()))
    }

    async fn fetch_voters(&self, election_id: &str) -> VotingNetworkResult<Vec<Address>> {
        self.wait(election_id).await;
        if !self.elections.read().await.contains_key(election_id) {
            return Err(VotingNetworkError::ElectionNotFound(election_id.to_string()));
        }
        Ok(self.voters.read().await.get(election_id).cloned().unwrap_or_default())
    }
}

/// In-memory indexing service
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndexer {
    proposals: Arc<RwLock<HashMap<String, IndexedProposal>>>,
    multisig_members: Arc<RwLock<HashMap<Address, Vec<Address>>>>,
    members: Arc<RwLock<HashMap<Address, Vec<IndexedMember>>>>,
    tokens: Arc<RwLock<HashMap<Address, TokenDetails>>>,
}

impl InMemoryIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_proposal(&self, proposal: IndexedProposal) {
        self.proposals.write().await.insert(proposal.id.clone(), proposal);
    }

    pub async fn set_multisig_members(&self, plugin: Address, members: Vec<Address>) {
        self.multisig_members.write().await.insert(plugin, members);
    }

    pub async fn set_members(&self, plugin: Address, members: Vec<IndexedMember>) {
        self.members.write().await.insert(plugin, members);
    }

    pub async fn set_token(&self, plugin: Address, token: TokenDetails) {
        self.tokens.write().await.insert(plugin, token);
    }
}

fn sort_key(proposal: &IndexedProposal, sort_by: ProposalSortBy) -> u64 {
    match sort_by {
        ProposalSortBy::CreatedAt => proposal.creation_date,
        ProposalSortBy::StartDate => proposal.start_date,
        ProposalSortBy::EndDate => proposal.end_date,
        ProposalSortBy::TallyEndDate => proposal.tally_end_date,
    }
}

#[async_trait]
impl ProposalIndex for InMemoryIndexer {
    async fn proposal(&self, id: &ProposalId) -> IndexerResult<Option<IndexedProposal>> {
        Ok(self.proposals.read().await.get(&id.encode()).cloned())
    }

    async fn proposals(&self, query: &ProposalQuery) -> IndexerResult<Vec<IndexedProposal>> {
        let proposals = self.proposals.read().await;
        let mut selected = Vec::new();
        for proposal in proposals.values() {
            let id = ProposalId::decode(&proposal.id)
                .map_err(|e| IndexerError::Malformed(format!("proposal {}: {}", proposal.id, e)))?;
            if id.plugin_address() == query.plugin_address {
                selected.push((id, proposal.clone()));
            }
        }

        selected.sort_by(|(a_id, a), (b_id, b)| {
            let order = sort_key(a, query.sort_by)
                .cmp(&sort_key(b, query.sort_by))
                .then_with(|| a_id.cmp(b_id));
            match query.direction {
                SortDirection::Asc => order,
                SortDirection::Desc => order.reverse(),
            }
        });

        Ok(selected
            .into_iter()
            .skip(query.skip)
            .take(query.limit)
            .map(|(_, proposal)| proposal)
            .collect())
    }

    async fn execution_multisig_members(&self, plugin: Address) -> IndexerResult<Vec<Address>> {
        Ok(self.multisig_members.read().await.get(&plugin).cloned().unwrap_or_default())
    }

    async fn members(&self, plugin: Address) -> IndexerResult<Vec<IndexedMember>> {
        Ok(self.members.read().await.get(&plugin).cloned().unwrap_or_default())
    }

    async fn token(&self, plugin: Address) -> IndexerResult<Option<TokenDetails>> {
        Ok(self.tokens.read().await.get(&plugin).cloned())
    }
}
