use clap::Args;
use url::Url;

use common::storage::StorageConfig;
use hush_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Client API port
    #[arg(long)]
    pub client_port: Option<u16>,

    /// Peer-facing node API port
    #[arg(long)]
    pub node_port: Option<u16>,

    /// URL other nodes reach this node at
    #[arg(long)]
    pub node_url: Option<Url>,

    /// Bootstrap peer (repeatable)
    #[arg(long = "other-node")]
    pub other_nodes: Vec<Url>,

    /// Storage backend: memory, sled:<path> or sql:<path>
    #[arg(long)]
    pub storage: Option<StorageConfig>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = StateError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig::default();
        if let Some(port) = self.client_port {
            config.client_port = port;
        }
        if let Some(port) = self.node_port {
            config.node_port = port;
        }
        if let Some(storage) = &self.storage {
            config.storage = storage.clone();
        }
        config.node_url = self.node_url.clone();
        config.other_nodes = self.other_nodes.clone();

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let keys = state.load_keys()?;

        let mut lines = vec![
            format!("Initialized hush directory at {}", state.hush_dir.display()),
            format!("  config:  {}", state.config_path.display()),
            format!("  keys:    {}", state.keys_path.display()),
            format!("  storage: {}", state.storage()),
        ];
        if let Some(key) = keys.first() {
            lines.push(format!("  default key: {}", key.public()));
        }
        Ok(lines.join("\n"))
    }
}
