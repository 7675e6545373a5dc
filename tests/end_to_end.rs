//! End-to-end test of a proposal's life
//!
//! A proposal is created, voted off-chain, settled by two execution
//! multisig members and read back after every step, with the indexer
//! following the contract the way a subgraph would.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use gasless_voting::client::testing::{InMemoryContract, InMemoryIndexer, InMemoryVotingNetwork};
use gasless_voting::client::{complete, CreateProposalParams, IndexedProposal};
use gasless_voting::core::{
    timestamp_to_chain, Address, ClientConfig, DeploymentAddresses, Network, ProposalId, Timestamp, U256,
};
use gasless_voting::governance::{
    codec_for, Choice, ElectionSnapshot, ProposalStatus, Question, VotingSettings,
};
use gasless_voting::GaslessVotingClient;

const ELECTION_ID: &str = "0b1d4f8e9a7c3d2e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6";

fn address(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

fn election(final_results: bool) -> ElectionSnapshot {
    let choice = |label: &str, result: u64| Choice {
        label: label.to_string(),
        result: Some(U256::from(result) * U256::exp10(18)),
    };
    ElectionSnapshot {
        election_id: ELECTION_ID.to_string(),
        title: "Renew the hosting contract".to_string(),
        description: None,
        census_weight: U256::from(1_000u64) * U256::exp10(18),
        census_uri: "ipfs://census".to_string(),
        census_root: "0xroot".to_string(),
        questions: vec![Question {
            title: "Renew for a year?".to_string(),
            choices: vec![choice("Yes", 300), choice("No", 100), choice("Abstain", 50)],
        }],
        final_results,
    }
}

struct TestNetwork {
    contract: InMemoryContract,
    voting: Arc<InMemoryVotingNetwork>,
    indexer: Arc<InMemoryIndexer>,
    config: ClientConfig,
}

impl TestNetwork {
    fn client(&self, signer: Address) -> GaslessVotingClient {
        GaslessVotingClient::new(
            self.config.clone(),
            Arc::new(self.contract.with_signer(signer)),
            self.voting.clone(),
            self.indexer.clone(),
        )
        .unwrap()
    }

    /// Copy the contract's view of a proposal into the indexer
    async fn index(&self, id: &ProposalId, creation_date: Timestamp) {
        let record = self.client(address(1)).fetch_onchain_proposal(id).await.unwrap();
        let seconds = |ts: &Timestamp| timestamp_to_chain(ts).unwrap();
        self.indexer
            .insert_proposal(IndexedProposal {
                id: id.encode(),
                dao_address: address(0xda),
                creator: address(1),
                vochain_proposal_id: record.vochain_proposal_id.clone(),
                start_date: seconds(&record.parameters.start_date),
                end_date: seconds(&record.parameters.end_date),
                tally_end_date: seconds(&record.parameters.tally_end_date),
                creation_date: seconds(&creation_date),
                creation_block_number: 1,
                security_block: record.parameters.security_block,
                total_voting_power: record.parameters.total_voting_power,
                census_uri: record.parameters.census_uri.clone(),
                census_root: record.parameters.census_root.clone(),
                actions: record.actions.clone(),
                allow_failure_map: record.allow_failure_map,
                approvers: record
                    .approvers
                    .iter()
                    .map(|approver| format!("{}_{}", id.plugin_address(), approver))
                    .collect(),
                tally: record.tally.iter().map(|row| row.to_vec()).collect(),
                executed: record.executed,
                execution_date: None,
                execution_block_number: None,
                execution_tx_hash: None,
            })
            .await;
    }
}

async fn setup_network() -> TestNetwork {
    let plugin = address(0xaa);
    let config = ClientConfig {
        network: Network::Local,
        deployment: Some(DeploymentAddresses {
            repo_address: address(0x10),
            setup_address: address(0x11),
        }),
        ..ClientConfig::default()
    };
    let settings = VotingSettings {
        only_execution_multisig_proposal_creation: true,
        min_tally_approvals: 2,
        min_participation: Decimal::new(25, 2),
        support_threshold: Decimal::new(6, 1),
        min_vote_duration: 3600,
        min_tally_duration: 3600,
        dao_token_address: address(0x70),
        min_proposer_voting_power: U256::zero(),
        census_strategy_uri: String::new(),
        execution_multisig_members: Vec::new(),
    };

    let contract = InMemoryContract::new(address(1));
    let raw = (codec_for(config.protocol_variant).settings_to_on_chain)(&settings).unwrap();
    contract.deploy_plugin(plugin, raw).await;

    let indexer = Arc::new(InMemoryIndexer::new());
    indexer
        .set_multisig_members(plugin, vec![address(1), address(2), address(3)])
        .await;

    TestNetwork {
        contract,
        voting: Arc::new(InMemoryVotingNetwork::new()),
        indexer,
        config,
    }
}

#[tokio::test]
async fn test_proposal_lifecycle() {
    let network = setup_network().await;
    let now = Utc::now();
    let creation_date = now - Duration::seconds(4_000);

    // Voting closed 400 seconds ago, tally window open for another 3200
    let (_, id) = complete(
        network
            .client(address(1))
            .create_proposal(CreateProposalParams {
                plugin_address: address(0xaa),
                vochain_proposal_id: format!("0x{}", ELECTION_ID),
                start_date: now - Duration::seconds(4_000),
                end_date: now - Duration::seconds(400),
                tally_end_date: now + Duration::seconds(3_200),
                total_voting_power: U256::from(1_000u64) * U256::exp10(18),
                census_uri: "ipfs://census".to_string(),
                census_root: "0xroot".to_string(),
                actions: Vec::new(),
                fail_safe_actions: Vec::new(),
            })
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(id, ProposalId::new(address(0xaa), 0u64));
    network.index(&id, creation_date).await;

    // Results still being counted
    network.voting.insert_election(election(false)).await;
    let view = network.client(address(2)).get_proposal(&id).await.unwrap().unwrap();
    assert_eq!(view.status, ProposalStatus::Active);
    assert!(!view.can_be_approved);

    // Final results: 450 of 1000 voted, 75% in favour
    network.voting.insert_election(election(true)).await;
    let view = network.client(address(2)).get_proposal(&id).await.unwrap().unwrap();
    assert_eq!(view.participation.current_percentage, Decimal::from(45));
    assert_eq!(view.participation.missing_participation, Decimal::ZERO);
    assert_eq!(view.status, ProposalStatus::Active);
    assert!(view.can_be_approved);

    // First member publishes the tally
    complete(network.client(address(2)).approve(&id).await.unwrap())
        .await
        .unwrap();
    network.index(&id, creation_date).await;
    let view = network.client(address(3)).get_proposal(&id).await.unwrap().unwrap();
    assert_eq!(view.approvers, vec![address(2)]);
    assert_eq!(view.tally[0][0], U256::from(300u64) * U256::exp10(18));
    assert_eq!(view.status, ProposalStatus::Active);

    // Second member ratifies and the contract executes
    complete(network.client(address(3)).approve(&id).await.unwrap())
        .await
        .unwrap();
    network.index(&id, creation_date).await;
    let view = network.client(address(1)).get_proposal(&id).await.unwrap().unwrap();
    assert!(view.executed);
    assert_eq!(view.status, ProposalStatus::Executed);

    let listed = network
        .client(address(1))
        .list_proposals(&gasless_voting::client::ProposalQuery::new(address(0xaa)))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ProposalStatus::Executed);
    assert_eq!(listed[0].approvers, 2);
}
