use std::time::Duration;

use clap::Args;

use common::storage::StorageConfig;
use hush_daemon::state::{AppState, StateError};
use hush_daemon::{spawn_service, ServiceConfig};

const MIN_DISCOVERY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override client API port (default from config)
    #[arg(long)]
    pub client_port: Option<u16>,

    /// Override node API port (default from config)
    #[arg(long)]
    pub node_port: Option<u16>,

    /// Override the URL advertised to peers
    #[arg(long)]
    pub node_url: Option<url::Url>,

    /// Override the storage backend: memory, sled:<path> or sql:<path>
    #[arg(long)]
    pub storage: Option<StorageConfig>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut state = AppState::load(ctx.config_path.clone())?;
        let keys = state.load_keys()?;

        if let Some(port) = self.client_port {
            state.config.client_port = port;
        }
        if let Some(port) = self.node_port {
            state.config.node_port = port;
        }
        if let Some(url) = &self.node_url {
            state.config.node_url = Some(url.clone());
        }
        if let Some(storage) = &self.storage {
            state.config.storage = storage.clone();
        }

        let app = &state.config;
        let config = ServiceConfig {
            keys,
            storage: state.storage(),
            known_nodes_storage: state.known_nodes_storage(),
            node_url: app.advertised_url()?,
            other_nodes: app.other_nodes.clone(),
            always_send_to: app.always_send_to.clone(),
            discovery_interval: Duration::from_secs(app.discovery_interval_secs)
                .max(MIN_DISCOVERY_INTERVAL),
            push_queue_size: (app.push_queue_size > 0).then_some(app.push_queue_size),
            client_listen_addr: app.client_listen_addr(),
            node_listen_addr: app.node_listen_addr(),
            log_level: app.log_level()?,
            log_dir: self
                .log_dir
                .clone()
                .or_else(|| app.log_dir.clone().map(|dir| state.hush_dir.join(dir))),
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
