//! The gasless voting client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::{join_all, try_join, try_join3, BoxFuture};
use futures::FutureExt;
use tracing::{debug, info, warn};

use gasless_voting_core::{Address, ClientConfig, ProposalId, U256};
use gasless_voting_governance::{codec_for, tally_matrix_to_raw, ProposalRecord, StructCodec, Tally, VotingSettings};

use crate::contract::{CreateProposalCall, SettlementContract, TxHandle, TxReceipt};
use crate::error::{ClientError, ClientResult};
use crate::indexer::{IndexedProposal, ProposalIndex, ProposalQuery, TokenDetails, VotingMember};
use crate::params::CreateProposalParams;
use crate::progress::{failed, progress_stream, ProgressStream, Submission};
use crate::view::{ProposalListItem, ProposalView};
use crate::voting_network::VotingNetwork;
use crate::workflow::{plan_approval, ApprovalStep};
use crate::write_queue::{WriteGuard, WriteQueue};

/// Run a collaborator call under a deadline
async fn timed<T, E, F>(operation: &str, limit: Duration, call: F) -> ClientResult<T>
where
    F: Future<Output = Result<T, E>>,
    ClientError: From<E>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(ClientError::from),
        Err(_) => {
            warn!("{} timed out after {:?}", operation, limit);
            Err(ClientError::Timeout {
                operation: operation.to_string(),
                elapsed: limit,
            })
        }
    }
}

/// Client for proposals voted on the off-chain voting network and settled
/// on chain by the execution multisig.
///
/// Collaborators are injected at construction. The client keeps no
/// proposal state of its own; every call works on freshly fetched data.
#[derive(Clone)]
pub struct GaslessVotingClient {
    config: Arc<ClientConfig>,
    codec: StructCodec,
    contract: Arc<dyn SettlementContract>,
    voting: Arc<dyn VotingNetwork>,
    indexer: Arc<dyn ProposalIndex>,
    write_queue: Option<WriteQueue>,
}

impl GaslessVotingClient {
    /// Create a client, validating the configuration
    pub fn new(
        config: ClientConfig,
        contract: Arc<dyn SettlementContract>,
        voting: Arc<dyn VotingNetwork>,
        indexer: Arc<dyn ProposalIndex>,
    ) -> ClientResult<Self> {
        config.validate()?;

        let codec = codec_for(config.protocol_variant);
        let write_queue = config.serialize_writes.then(WriteQueue::new);
        info!(
            "Gasless voting client on {} ({:?} structs, serialized writes: {})",
            config.network,
            codec.variant,
            write_queue.is_some()
        );

        Ok(Self {
            config: Arc::new(config),
            codec,
            contract,
            voting,
            indexer,
            write_queue,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Account that signs this client's transactions
    pub fn signer(&self) -> Address {
        self.contract.signer_address()
    }

    fn request_timeout(&self) -> Duration {
        self.config.request_timeout()
    }

    async fn guard(&self, id: &ProposalId) -> Option<WriteGuard> {
        match &self.write_queue {
            Some(queue) => Some(queue.acquire(id).await),
            None => None,
        }
    }

    /// Wait for a transaction to be mined under the confirmation deadline
    async fn confirm(&self, tx: TxHandle) -> ClientResult<TxReceipt> {
        let receipt = timed(
            "waitForReceipt",
            self.config.confirmation_timeout(),
            self.contract.wait_for_receipt(&tx, self.config.tx_confirmations),
        )
        .await?;
        debug!("Transaction {} mined in block {}", receipt.tx_hash, receipt.block_number);
        Ok(receipt)
    }

    fn confirming(&self) -> impl FnOnce(TxHandle) -> BoxFuture<'static, ClientResult<TxReceipt>> {
        let client = self.clone();
        move |tx| async move { client.confirm(tx).await }.boxed()
    }

    /// Create a proposal for an election already published on the voting
    /// network. Confirms with the new proposal's id.
    ///
    /// Parameters are validated before anything is submitted.
    pub fn create_proposal(&self, params: CreateProposalParams) -> ClientResult<ProgressStream<ProposalId>> {
        let call = params.to_call(&self.codec)?;
        let plugin = params.plugin_address;

        let client = self.clone();
        let submit = async move { client.create_submission(plugin, call).await }.boxed();

        let client = self.clone();
        let confirm = move |tx: TxHandle| async move { client.confirm_creation(plugin, tx).await }.boxed();

        Ok(progress_stream(submit, confirm))
    }

    /// Fetch a proposal with its election.
    ///
    /// `None` when the proposal is not indexed yet or its election is not
    /// available on the voting network yet.
    pub async fn get_proposal(&self, id: &ProposalId) -> ClientResult<Option<ProposalView>> {
        let indexed = timed("proposal", self.request_timeout(), self.indexer.proposal(id)).await?;
        let Some(indexed) = indexed else {
            debug!("Proposal {} is not indexed", id);
            return Ok(None);
        };
        let record = indexed.into_record()?;
        let plugin = id.plugin_address();

        let election_id = record.vochain_proposal_id.clone();
        let election = async {
            match timed("fetchElection", self.request_timeout(), self.voting.fetch_election(&election_id)).await {
                Ok(election) => Ok(Some(election)),
                Err(ClientError::ElectionNotFound(_)) => Ok(None),
                Err(e) => Err(e),
            }
        };
        let (election, settings, token) =
            try_join3(election, self.get_voting_settings(plugin), self.get_token(plugin)).await?;

        let Some(election) = election else {
            debug!("Election {} of proposal {} is not available", election_id, id);
            return Ok(None);
        };

        let voters = match timed("fetchVoters", self.request_timeout(), self.voting.fetch_voters(&election_id)).await {
            Ok(voters) => voters,
            Err(ClientError::ElectionNotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let view = ProposalView::build(Utc::now(), record, &election, settings, token, voters)?;
        Ok(Some(view))
    }

    /// List proposals of a plugin in the requested order.
    ///
    /// Elections are fetched concurrently; proposals whose election is not
    /// available yet are left out. With a status filter, `skip` and `limit`
    /// count matching proposals and the index is read page by page until
    /// enough of them are found.
    pub async fn list_proposals(&self, query: &ProposalQuery) -> ClientResult<Vec<ProposalListItem>> {
        let plugin = query.plugin_address;
        let mut page = query.clone();
        if query.status.is_some() {
            page.skip = 0;
        }

        let (indexed, settings, token) = try_join3(
            timed("proposals", self.request_timeout(), self.indexer.proposals(&page)),
            self.get_voting_settings(plugin),
            self.get_token(plugin),
        )
        .await?;
        let decimals = token.map(|token| token.decimals).unwrap_or(0);

        let Some(status) = query.status else {
            let items = self.list_items(indexed, &settings, decimals).await?;
            debug!("Listed {} proposals of plugin {}", items.len(), plugin);
            return Ok(items);
        };

        let mut items = Vec::new();
        let mut to_skip = query.skip;
        let mut indexed = indexed;
        while items.len() < query.limit {
            let fetched = indexed.len();
            for item in self.list_items(indexed, &settings, decimals).await? {
                if item.status != status || items.len() == query.limit {
                    continue;
                }
                if to_skip > 0 {
                    to_skip -= 1;
                } else {
                    items.push(item);
                }
            }
            if fetched < page.limit || items.len() == query.limit {
                break;
            }
            page.skip += fetched;
            indexed = timed("proposals", self.request_timeout(), self.indexer.proposals(&page)).await?;
        }

        debug!("Listed {} {:?} proposals of plugin {}", items.len(), status, plugin);
        Ok(items)
    }

    async fn list_items(
        &self,
        indexed: Vec<IndexedProposal>,
        settings: &VotingSettings,
        decimals: u32,
    ) -> ClientResult<Vec<ProposalListItem>> {
        let records = indexed
            .into_iter()
            .map(|proposal| proposal.into_record())
            .collect::<Result<Vec<_>, _>>()?;

        let weights = join_all(records.iter().map(|record| self.census_weight(record))).await;

        let now = Utc::now();
        let mut items = Vec::with_capacity(records.len());
        for (record, weight) in records.into_iter().zip(weights) {
            let Some(weight) = weight? else {
                continue;
            };
            items.push(ProposalListItem::build(now, record, weight, settings, decimals)?);
        }
        Ok(items)
    }

    async fn census_weight(&self, record: &ProposalRecord) -> ClientResult<Option<U256>> {
        let fetched = timed(
            "fetchElection",
            self.request_timeout(),
            self.voting.fetch_election(&record.vochain_proposal_id),
        )
        .await;
        match fetched {
            Ok(election) => Ok(Some(election.census_weight)),
            Err(ClientError::ElectionNotFound(id)) => {
                debug!("Skipping proposal {}: election {} not found", record.id, id);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Plugin settings decoded from the contract, with the execution
    /// multisig members reported by the indexer
    pub async fn get_voting_settings(&self, plugin: Address) -> ClientResult<VotingSettings> {
        let (raw, members) = try_join(
            timed("getPluginSettings", self.request_timeout(), self.contract.get_plugin_settings(plugin)),
            timed(
                "executionMultisigMembers",
                self.request_timeout(),
                self.indexer.execution_multisig_members(plugin),
            ),
        )
        .await?;

        let mut settings = (self.codec.settings_from_on_chain)(&raw)?;
        settings.execution_multisig_members = members;
        Ok(settings)
    }

    /// Token holders of the plugin's DAO
    pub async fn get_members(&self, plugin: Address) -> ClientResult<Vec<VotingMember>> {
        let members = timed("members", self.request_timeout(), self.indexer.members(plugin)).await?;
        Ok(members.into_iter().map(VotingMember::from).collect())
    }

    pub async fn get_token(&self, plugin: Address) -> ClientResult<Option<TokenDetails>> {
        timed("token", self.request_timeout(), self.indexer.token(plugin)).await
    }

    pub async fn is_multisig_member(&self, plugin: Address, address: Address) -> ClientResult<bool> {
        let members = timed(
            "executionMultisigMembers",
            self.request_timeout(),
            self.indexer.execution_multisig_members(plugin),
        )
        .await?;
        Ok(members.contains(&address))
    }

    /// Read a proposal straight from the contract
    pub async fn fetch_onchain_proposal(&self, id: &ProposalId) -> ClientResult<ProposalRecord> {
        let raw = timed(
            "getProposal",
            self.request_timeout(),
            self.contract.get_proposal(id.plugin_address(), id.local_id()),
        )
        .await?
        .ok_or_else(|| ClientError::ProposalNotFound(id.encode()))?;

        Ok(self.codec.proposal_from_on_chain(*id, &raw)?)
    }

    /// Approve the tally of a proposal as the signer.
    ///
    /// Publishes the final election results when nobody approved yet and
    /// ratifies the published tally otherwise. Guard failures are returned
    /// before anything is submitted; the call can be retried from the top.
    ///
    /// With serialized writes the queue is only joined once the stream is
    /// polled, and the approval is planned again from fresh data then, so a
    /// write that confirmed in the meantime is taken into account.
    pub async fn approve(&self, id: &ProposalId) -> ClientResult<ProgressStream<TxReceipt>> {
        self.next_approval_step(id).await?;

        let client = self.clone();
        let id = *id;
        let submit = async move { client.approval_submission(id).await }.boxed();
        Ok(progress_stream(submit, self.confirming()))
    }

    async fn next_approval_step(&self, id: &ProposalId) -> ClientResult<ApprovalStep> {
        let record = self.fetch_onchain_proposal(id).await?;
        let election = timed(
            "fetchElection",
            self.request_timeout(),
            self.voting.fetch_election(&record.vochain_proposal_id),
        );
        let (election, settings) = try_join(election, self.get_voting_settings(id.plugin_address())).await?;

        plan_approval(&record, &settings, &election, self.signer(), self.config.auto_execute)
    }

    async fn approval_submission(&self, id: ProposalId) -> ClientResult<Submission> {
        let guard = self.guard(&id).await;
        match self.next_approval_step(&id).await? {
            ApprovalStep::SetTally(tally) => self.set_tally_submission(id, tally, guard).await,
            ApprovalStep::ApproveTally { try_execution } => {
                self.approve_tally_submission(id, try_execution, guard).await
            }
        }
    }

    /// Publish a tally for a proposal
    pub fn set_tally(&self, id: &ProposalId, tally: Tally) -> ProgressStream<TxReceipt> {
        if tally.is_empty() {
            return failed(ClientError::SizeMismatch { expected: 1, actual: 0 });
        }
        let client = self.clone();
        let id = *id;
        let submit = async move {
            let guard = client.guard(&id).await;
            client.set_tally_submission(id, tally, guard).await
        }
        .boxed();
        progress_stream(submit, self.confirming())
    }

    /// Ratify the published tally of a proposal
    pub fn approve_tally(&self, id: &ProposalId, try_execution: bool) -> ProgressStream<TxReceipt> {
        let client = self.clone();
        let id = *id;
        let submit = async move {
            let guard = client.guard(&id).await;
            client.approve_tally_submission(id, try_execution, guard).await
        }
        .boxed();
        progress_stream(submit, self.confirming())
    }

    /// Execute a proposal whose tally reached quorum
    pub fn execute_proposal(&self, id: &ProposalId) -> ProgressStream<TxReceipt> {
        let client = self.clone();
        let id = *id;
        let submit = async move {
            let guard = client.guard(&id).await;
            client.execute_submission(id, guard).await
        }
        .boxed();
        progress_stream(submit, self.confirming())
    }

    async fn create_submission(&self, plugin: Address, call: CreateProposalCall) -> ClientResult<Submission> {
        let tx = timed(
            "createProposal",
            self.request_timeout(),
            self.contract.create_proposal(plugin, call),
        )
        .await?;
        info!("Submitted proposal creation {} on plugin {}", tx.hash, plugin);
        Ok(Submission { tx, guard: None })
    }

    async fn confirm_creation(&self, plugin: Address, tx: TxHandle) -> ClientResult<ProposalId> {
        let receipt = self.confirm(tx).await?;
        let local_id = receipt.created_proposal_id().ok_or_else(|| {
            ClientError::ProposalCreationError(format!(
                "no ProposalCreated event in transaction {}",
                receipt.tx_hash
            ))
        })?;
        let id = ProposalId::new(plugin, local_id);
        info!("Created proposal {}", id);
        Ok(id)
    }

    async fn execute_submission(&self, id: ProposalId, guard: Option<WriteGuard>) -> ClientResult<Submission> {
        let tx = timed(
            "executeProposal",
            self.request_timeout(),
            self.contract.execute_proposal(id.plugin_address(), id.local_id()),
        )
        .await?;
        info!("Submitted execution {} of proposal {}", tx.hash, id);
        Ok(Submission { tx, guard })
    }

    async fn set_tally_submission(
        &self,
        id: ProposalId,
        tally: Tally,
        guard: Option<WriteGuard>,
    ) -> ClientResult<Submission> {
        let tx = timed(
            "setTally",
            self.request_timeout(),
            self.contract
                .set_tally(id.plugin_address(), id.local_id(), tally_matrix_to_raw(&tally)),
        )
        .await?;
        info!("Submitted tally {} for proposal {}", tx.hash, id);
        Ok(Submission { tx, guard })
    }

    async fn approve_tally_submission(
        &self,
        id: ProposalId,
        try_execution: bool,
        guard: Option<WriteGuard>,
    ) -> ClientResult<Submission> {
        let tx = timed(
            "approveTally",
            self.request_timeout(),
            self.contract
                .approve_tally(id.plugin_address(), id.local_id(), try_execution),
        )
        .await?;
        info!(
            "Submitted tally approval {} for proposal {} (try execution: {})",
            tx.hash, id, try_execution
        );
        Ok(Submission { tx, guard })
    }
}

impl std::fmt::Debug for GaslessVotingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaslessVotingClient")
            .field("network", &self.config.network)
            .field("codec", &self.codec)
            .field("serialize_writes", &self.write_queue.is_some())
            .finish()
    }
}
