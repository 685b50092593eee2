//! The per-process actor: one `RwLock<ReplicaState>` plus the tickers
//! and message handlers that drive it.
//!
//! Every handler acquires the lock for the duration of a logical step,
//! builds whatever outbound message is needed, releases the lock, and
//! only then calls into `transport` — so a slow or lost send never
//! blocks another handler (spec.md §5/§9).

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::time;
use tracing::debug;
use uuid::Uuid;

use crate::config::ReplicaConfig;
use crate::transport::messages::{AppendRequest, AppendResponse, RequestVoteRequest, RequestVoteResponse};
use crate::transport::PeerClient;

use super::commit::try_advance_commit;
use super::election::{self, VoteOutcome};
use super::log::{Command, LogEntry};
use super::replication::{self, AppendResponseAction};
use super::state::{ReplicaState, Role};

/// Result of a client-facing mutation/CAS request, translated to HTTP
/// status codes by `server::handlers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// The write was applied; carries the value now visible for reads
    /// (`None` after a delete).
    Applied {
        /// Value observed after apply.
        value: Option<String>,
    },
    /// A CAS attempt completed; carries its boolean outcome.
    CasApplied {
        /// Whether the compare succeeded and the swap took effect.
        status: bool,
    },
    /// Not the leader; caller should retry at `leader_hint`, or after a
    /// delay if `None`.
    Redirect(Option<usize>),
}

/// Snapshot of replica status, used by `/healthz` and tests.
#[derive(Debug, Clone, Copy)]
pub struct ReplicaStatus {
    /// This replica's id.
    pub node_id: usize,
    /// Current role.
    pub role: Role,
    /// Current term.
    pub term: u64,
    /// Committed prefix length.
    pub commit_length: usize,
    /// Last known leader.
    pub leader_hint: Option<usize>,
}

/// One running replica: state plus its cluster configuration and
/// outbound transport.
pub struct Replica {
    state: RwLock<ReplicaState>,
    config: ReplicaConfig,
    transport: PeerClient,
}

impl Replica {
    /// Construct a replica in the initial follower state.
    pub fn new(node_id: usize, config: ReplicaConfig) -> Arc<Self> {
        let state = RwLock::new(ReplicaState::new(node_id, &config.timing));
        let transport = PeerClient::new(&config.timing);
        Arc::new(Self { state, config, transport })
    }

    /// This replica's id.
    pub fn node_id(&self) -> usize {
        self.state.read().node_id
    }

    /// Spawn the election and heartbeat tickers as background tasks.
    /// Both run at `T_hb`; the election ticker only acts once the
    /// deadline has actually elapsed.
    pub fn spawn(self: &Arc<Self>) {
        let election_replica = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = time::interval(election_replica.config.timing.heartbeat_interval);
            loop {
                interval.tick().await;
                election_replica.tick_election().await;
            }
        });

        let heartbeat_replica = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = time::interval(heartbeat_replica.config.timing.heartbeat_interval);
            loop {
                interval.tick().await;
                heartbeat_replica.tick_heartbeat().await;
            }
        });
    }

    async fn tick_election(&self) {
        let request = {
            let mut state = self.state.write();
            if !election::should_start_election(&state) {
                return;
            }
            election::start_election(&mut state, &self.config.timing)
        };
        self.broadcast_request_vote(request).await;
    }

    async fn tick_heartbeat(&self) {
        if self.state.read().role != Role::Leader {
            return;
        }
        self.replicate_to_all().await;
    }

    async fn broadcast_request_vote(&self, request: RequestVoteRequest) {
        for peer in self.config.cluster.peers_of(self.node_id()) {
            let url = self.config.cluster.peer_base_url(peer);
            self.transport.send_request_vote(&url, &request).await;
        }
    }

    async fn replicate_to_all(&self) {
        for peer in self.config.cluster.peers_of(self.node_id()) {
            self.replicate_to_peer(peer).await;
        }
    }

    async fn replicate_to_peer(&self, peer: usize) {
        let request = {
            let state = self.state.read();
            if state.role != Role::Leader {
                return;
            }
            replication::build_append_request(&state, peer)
        };
        let url = self.config.cluster.peer_base_url(peer);
        self.transport.send_append_request(&url, &request).await;
    }

    /// Handle an inbound vote request and produce the response to send
    /// back to the candidate.
    pub fn handle_request_vote(&self, request: RequestVoteRequest) -> RequestVoteResponse {
        let mut state = self.state.write();
        election::handle_request_vote(&mut state, request, &self.config.timing)
    }

    /// Handle an inbound vote request and asynchronously deliver the
    /// response on the reverse endpoint, per spec.md §6 ("responses are
    /// delivered asynchronously on the reverse endpoint").
    pub async fn reply_to_request_vote(&self, request: RequestVoteRequest) {
        let candidate = request.node_id;
        let response = self.handle_request_vote(request);
        let url = self.peer_base_url(candidate);
        self.transport.send_vote_response(&url, &response).await;
    }

    /// Handle an inbound vote response, becoming leader and kicking off
    /// replication if this grants quorum.
    pub async fn handle_vote_response(&self, response: RequestVoteResponse) {
        let became_leader = {
            let mut state = self.state.write();
            let node_count = self.config.cluster.node_count;
            let outcome = election::handle_vote_response(&mut state, response, node_count);
            if outcome == VoteOutcome::BecameLeader {
                let peers = self.config.cluster.peers_of(state.node_id);
                election::become_leader(&mut state, &peers);
                true
            } else {
                false
            }
        };
        if became_leader {
            self.replicate_to_all().await;
        }
    }

    /// Handle an inbound append request and produce the response to
    /// send back to the leader.
    pub fn handle_append_request(&self, request: AppendRequest) -> AppendResponse {
        let mut state = self.state.write();
        replication::handle_append_request(&mut state, request, &self.config.timing)
    }

    /// Handle an inbound append request and asynchronously deliver the
    /// response on the reverse endpoint.
    pub async fn reply_to_append_request(&self, request: AppendRequest) {
        let leader = request.leader_id;
        let response = self.handle_append_request(request);
        let url = self.peer_base_url(leader);
        self.transport.send_append_response(&url, &response).await;
    }

    /// Base URL for peer `node_id`, used by handlers to route a
    /// not-leader redirect.
    pub fn peer_base_url(&self, node_id: usize) -> String {
        self.config.cluster.peer_base_url(node_id)
    }

    /// Handle an inbound append response, retrying with a decremented
    /// `sent_length` if the follower rejected it.
    pub async fn handle_append_response(&self, response: AppendResponse) {
        let action = {
            let mut state = self.state.write();
            let node_count = self.config.cluster.node_count;
            replication::handle_append_response(&mut state, response, node_count)
        };
        if let AppendResponseAction::Resend(peer) = action {
            self.replicate_to_peer(peer).await;
        }
    }

    /// Create/update (`value = Some`) or delete (`value = None`) a key.
    /// Redirects if this replica isn't the leader; otherwise appends,
    /// fans out, and waits for the entry to be applied.
    pub async fn mutate(&self, key: String, value: Option<String>) -> GatewayOutcome {
        let command = match &value {
            Some(v) => Command::Put { key: key.clone(), value: v.clone() },
            None => Command::Delete { key: key.clone() },
        };

        {
            let mut state = self.state.write();
            if state.role != Role::Leader {
                return GatewayOutcome::Redirect(state.leader_hint);
            }
            self.append_local(&mut state, command);
        }

        self.replicate_to_all().await;
        self.poll_until(|state| (state.db.get(&key).cloned() == value).then(|| value.clone())).await
    }

    /// Compare-and-swap: redirects if not leader, otherwise appends,
    /// fans out, and waits for the CAS outcome to be recorded.
    pub async fn cas(&self, key: String, old_value: String, new_value: String) -> GatewayOutcome {
        let request_id = Uuid::new_v4();

        {
            let mut state = self.state.write();
            if state.role != Role::Leader {
                return GatewayOutcome::Redirect(state.leader_hint);
            }
            self.append_local(&mut state, Command::Cas { key, old_value, new_value, request_id });
        }

        self.replicate_to_all().await;
        loop {
            if let Some(status) = self.state.read().cas_results.get(&request_id).copied() {
                return GatewayOutcome::CasApplied { status };
            }
            time::sleep(self.config.timing.client_poll_interval).await;
        }
    }

    fn append_local(&self, state: &mut ReplicaState, command: Command) {
        let term = state.term;
        state.log.push(LogEntry { term, command });
        let self_id = state.node_id;
        state.acked_length.insert(self_id, state.log_length());
        try_advance_commit(state, self.config.cluster.node_count);
        debug!(node_id = self_id, log_length = state.log_length(), "appended local entry");
    }

    async fn poll_until<F>(&self, mut ready: F) -> GatewayOutcome
    where
        F: FnMut(&ReplicaState) -> Option<Option<String>>,
    {
        loop {
            if let Some(value) = ready(&self.state.read()) {
                return GatewayOutcome::Applied { value };
            }
            time::sleep(self.config.timing.client_poll_interval).await;
        }
    }

    /// A read straight from the local committed map. Not linearizable: a
    /// partitioned follower can return stale data (spec.md §9 Q7).
    pub fn local_get(&self, key: &str) -> Option<String> {
        self.state.read().db.get(key).cloned()
    }

    /// Status snapshot for the health endpoint and tests.
    pub fn status(&self) -> ReplicaStatus {
        let state = self.state.read();
        ReplicaStatus {
            node_id: state.node_id,
            role: state.role,
            term: state.term,
            commit_length: state.commit_length,
            leader_hint: state.leader_hint,
        }
    }
}
