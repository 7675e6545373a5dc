//! Shared fixtures for the client integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use gasless_voting_client::testing::{InMemoryContract, InMemoryIndexer, InMemoryVotingNetwork};
use gasless_voting_client::{CreateProposalParams, GaslessVotingClient, IndexedProposal};
use gasless_voting_core::{
    timestamp_to_chain, Address, ClientConfig, DeploymentAddresses, Network, ProposalId, ProtocolVariant, Timestamp,
    U256,
};
use gasless_voting_governance::{codec_for, Choice, ElectionSnapshot, Question, VotingSettings};

pub const ELECTION_ID: &str = "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";

pub fn address(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

pub fn plugin() -> Address {
    address(0xaa)
}

pub fn member_a() -> Address {
    address(0x01)
}

pub fn member_b() -> Address {
    address(0x02)
}

pub fn outsider() -> Address {
    address(0x0e)
}

pub fn settings() -> VotingSettings {
    VotingSettings {
        only_execution_multisig_proposal_creation: true,
        min_tally_approvals: 2,
        min_participation: Decimal::new(2, 1),
        support_threshold: Decimal::new(5, 1),
        min_vote_duration: 3600,
        min_tally_duration: 3600,
        dao_token_address: address(0x70),
        min_proposer_voting_power: U256::zero(),
        census_strategy_uri: "census3://token".to_string(),
        execution_multisig_members: Vec::new(),
    }
}

pub fn config(variant: ProtocolVariant, serialize_writes: bool) -> ClientConfig {
    ClientConfig {
        network: Network::Local,
        deployment: Some(DeploymentAddresses {
            repo_address: address(0x10),
            setup_address: address(0x11),
        }),
        protocol_variant: variant,
        serialize_writes,
        ..ClientConfig::default()
    }
}

pub struct TestEnv {
    pub contract: InMemoryContract,
    pub voting: Arc<InMemoryVotingNetwork>,
    pub indexer: Arc<InMemoryIndexer>,
    pub config: ClientConfig,
}

impl TestEnv {
    /// A client signing as `signer`, sharing the environment's collaborators
    pub fn client(&self, signer: Address) -> GaslessVotingClient {
        GaslessVotingClient::new(
            self.config.clone(),
            Arc::new(self.contract.with_signer(signer)),
            self.voting.clone(),
            self.indexer.clone(),
        )
        .unwrap()
    }
}

pub async fn setup_test_env(config: ClientConfig) -> TestEnv {
    let codec = codec_for(config.protocol_variant);
    let contract = InMemoryContract::new(member_a());
    contract
        .deploy_plugin(plugin(), (codec.settings_to_on_chain)(&settings()).unwrap())
        .await;

    let indexer = Arc::new(InMemoryIndexer::new());
    indexer.set_multisig_members(plugin(), vec![member_a(), member_b()]).await;

    TestEnv {
        contract,
        voting: Arc::new(InMemoryVotingNetwork::new()),
        indexer,
        config,
    }
}

pub fn election(election_id: &str, final_results: bool, yes: u64, no: u64, abstain: u64) -> ElectionSnapshot {
    let choice = |label: &str, result: u64| Choice {
        label: label.to_string(),
        result: Some(U256::from(result)),
    };
    ElectionSnapshot {
        election_id: election_id.to_string(),
        title: "Fund the community garden".to_string(),
        description: Some("Buy seeds and tools".to_string()),
        census_weight: U256::from(100u64),
        census_uri: "ipfs://census".to_string(),
        census_root: "0xcensusroot".to_string(),
        questions: vec![Question {
            title: "Should we fund it?".to_string(),
            choices: vec![choice("Yes", yes), choice("No", no), choice("Abstain", abstain)],
        }],
        final_results,
    }
}

/// Voting ended `elapsed` seconds ago with the tally window open for another hour
pub fn window(elapsed: i64) -> (Timestamp, Timestamp, Timestamp) {
    let now = Utc::now();
    let end = now - Duration::seconds(elapsed);
    (end - Duration::seconds(3600), end, end + Duration::seconds(3600 + elapsed))
}

pub fn create_params(election_id: &str, dates: (Timestamp, Timestamp, Timestamp)) -> CreateProposalParams {
    CreateProposalParams {
        plugin_address: plugin(),
        vochain_proposal_id: election_id.to_string(),
        start_date: dates.0,
        end_date: dates.1,
        tally_end_date: dates.2,
        total_voting_power: U256::from(100u64),
        census_uri: "ipfs://census".to_string(),
        census_root: "0xcensusroot".to_string(),
        actions: Vec::new(),
        fail_safe_actions: Vec::new(),
    }
}

/// The indexer's copy of a proposal
pub fn indexed(
    local_id: u64,
    election_id: &str,
    dates: (Timestamp, Timestamp, Timestamp),
    approvers: &[Address],
    tally: Vec<Vec<U256>>,
) -> IndexedProposal {
    let seconds = |ts: Timestamp| timestamp_to_chain(&ts).unwrap();
    IndexedProposal {
        id: ProposalId::new(plugin(), local_id).encode(),
        dao_address: address(0xda),
        creator: member_a(),
        vochain_proposal_id: election_id.to_string(),
        start_date: seconds(dates.0),
        end_date: seconds(dates.1),
        tally_end_date: seconds(dates.2),
        creation_date: seconds(dates.0) - 60,
        creation_block_number: 100 + local_id,
        security_block: 99,
        total_voting_power: U256::from(100u64),
        census_uri: "ipfs://census".to_string(),
        census_root: "0xcensusroot".to_string(),
        actions: Vec::new(),
        allow_failure_map: U256::zero(),
        approvers: approvers
            .iter()
            .map(|approver| format!("{}_{}", plugin(), approver))
            .collect(),
        tally,
        executed: false,
        execution_date: None,
        execution_block_number: None,
        execution_tx_hash: None,
    }
}
