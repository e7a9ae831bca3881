use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use raftd::config::NodeConfig;
use raftd::raft::{election, replication, Replica};
use raftd::{http, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = NodeConfig::load()?;

    info!(
        node_id = %config.node_id,
        peers = ?config.peers,
        heartbeat_timeout = ?config.heartbeat_timeout,
        election_timeout = ?config.election_timeout,
        "starting raft replica"
    );

    let replica = Arc::new(Replica::new(
        config.node_id.clone(),
        config.peers.clone(),
        config.http_port,
        config.heartbeat_timeout,
        config.election_timeout,
    ));

    tokio::spawn(election::election_timer_loop(replica.clone()));
    tokio::spawn(replication::heartbeat_loop(replica.clone()));

    let app = http::router(replica);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
