use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use common::prelude::{PublicKey, SecretKey, StorageConfig};
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    // identity
    /// Key pairs held by the enclave. The first is the node's default key.
    pub keys: Vec<SecretKey>,

    // storage
    /// Backend for payloads and privacy groups
    pub storage: StorageConfig,
    /// Backend for the registry snapshot. Opened once when equal to `storage`.
    pub known_nodes_storage: StorageConfig,

    // network
    /// URL advertised to peers for our keys
    pub node_url: Url,
    /// Bootstrap peers for discovery
    pub other_nodes: Vec<Url>,
    pub always_send_to: Vec<PublicKey>,
    pub discovery_interval: Duration,
    /// Maximum pending pushes. None means unbounded.
    pub push_queue_size: Option<usize>,

    // http server configuration
    /// Client API: send, receive, privacy groups
    pub client_listen_addr: SocketAddr,
    /// Node API: discovery and push, reachable by peers
    pub node_listen_addr: SocketAddr,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}
