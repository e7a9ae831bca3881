//! A single Raft-family replica: shared state, election, replication, and
//! the RPC wire types/transport that tie them to peers.

pub mod client;
pub mod election;
pub mod log;
pub mod replication;
pub mod rpc;
pub mod state;

use std::time::Duration;

use tokio::sync::Mutex;

pub use state::{ReplicaState, Role};

use client::RpcClient;

/// Everything one replica process owns: the guarded protocol state, the
/// command-submission lock (a distinct lock from the state mutex, held
/// across a whole quorum-wait window), and the timing/transport config the
/// background loops and handlers need.
pub struct Replica {
    pub state: Mutex<ReplicaState>,
    pub command_lock: Mutex<()>,
    pub client: RpcClient,
    pub heartbeat_timeout: Duration,
    pub election_timeout: Duration,
}

impl Replica {
    pub fn new(
        node_id: String,
        peers: Vec<String>,
        peer_port: u16,
        heartbeat_timeout: Duration,
        election_timeout: Duration,
    ) -> Self {
        Replica {
            state: Mutex::new(ReplicaState::new(node_id, peers)),
            command_lock: Mutex::new(()),
            client: RpcClient::new(heartbeat_timeout, peer_port),
            heartbeat_timeout,
            election_timeout,
        }
    }
}
