use std::path::{Path, PathBuf};
use std::{fs, net::SocketAddr};

use common::prelude::{PublicKey, SecretKey, StorageConfig};
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "hush";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEYS_DIR_NAME: &str = "keys";
pub const DATA_DIR_NAME: &str = "data";
pub const LOGS_DIR_NAME: &str = "logs";
pub const DEFAULT_KEY_NAME: &str = "node";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Port for the client API (send, receive, privacy groups)
    #[serde(default = "default_client_port")]
    pub client_port: u16,
    /// Port for the peer-facing node API (discovery, push)
    #[serde(default = "default_node_port")]
    pub node_port: u16,
    /// URL other nodes reach us at. Defaults to `http://127.0.0.1:<node_port>/`
    #[serde(default)]
    pub node_url: Option<Url>,
    /// Bootstrap peers contacted by discovery
    #[serde(default)]
    pub other_nodes: Vec<Url>,
    /// Payload and privacy group storage. Relative paths resolve against the
    /// hush directory.
    #[serde(default = "default_storage")]
    pub storage: StorageConfig,
    /// Where the registry snapshot lives. Shares `storage` when unset.
    #[serde(default)]
    pub known_nodes_storage: Option<StorageConfig>,
    /// Appended to the recipients of every direct send
    #[serde(default)]
    pub always_send_to: Vec<PublicKey>,
    #[serde(default = "default_discovery_interval_secs")]
    pub discovery_interval_secs: u64,
    /// Maximum pending pushes; 0 means unbounded
    #[serde(default = "default_push_queue_size")]
    pub push_queue_size: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily rolling log files (stdout only if unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_client_port() -> u16 {
    8888
}

fn default_node_port() -> u16 {
    8080
}

fn default_storage() -> StorageConfig {
    StorageConfig::Sled {
        path: PathBuf::from(DATA_DIR_NAME).join("store"),
    }
}

fn default_discovery_interval_secs() -> u64 {
    30
}

fn default_push_queue_size() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_port: default_client_port(),
            node_port: default_node_port(),
            node_url: None,
            other_nodes: Vec::new(),
            storage: default_storage(),
            known_nodes_storage: None,
            always_send_to: Vec::new(),
            discovery_interval_secs: default_discovery_interval_secs(),
            push_queue_size: default_push_queue_size(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub fn client_listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.client_port))
    }

    pub fn node_listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.node_port))
    }

    /// The URL we advertise to peers
    pub fn advertised_url(&self) -> Result<Url, StateError> {
        match &self.node_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(&format!("http://127.0.0.1:{}/", self.node_port))
                .map_err(|e| StateError::InvalidConfig(e.to_string())),
        }
    }

    pub fn log_level(&self) -> Result<tracing::Level, StateError> {
        self.log_level
            .parse()
            .map_err(|_| StateError::InvalidConfig(format!("unknown log level: {}", self.log_level)))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the hush directory (~/.hush)
    pub hush_dir: PathBuf,
    /// Directory of PEM encoded private keys
    pub keys_path: PathBuf,
    /// Directory for on-disk storage backends
    pub data_path: PathBuf,
    pub logs_path: PathBuf,
    pub config_path: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Get the hush directory path (custom or default ~/.hush)
    pub fn hush_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new hush directory with one freshly generated key
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let hush_dir = Self::hush_dir(custom_path)?;

        if hush_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let state = Self::at(hush_dir, config.unwrap_or_default());
        fs::create_dir_all(&state.keys_path)?;
        fs::create_dir_all(&state.data_path)?;
        fs::create_dir_all(&state.logs_path)?;

        state.generate_key(DEFAULT_KEY_NAME)?;

        let config_toml = toml::to_string_pretty(&state.config)?;
        fs::write(&state.config_path, config_toml)?;

        Ok(state)
    }

    /// Load existing state from the hush directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let hush_dir = Self::hush_dir(custom_path)?;

        if !hush_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = hush_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        if !hush_dir.join(KEYS_DIR_NAME).is_dir() {
            return Err(StateError::MissingFile(format!("{}/", KEYS_DIR_NAME)));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self::at(hush_dir, config))
    }

    fn at(hush_dir: PathBuf, config: AppConfig) -> Self {
        Self {
            keys_path: hush_dir.join(KEYS_DIR_NAME),
            data_path: hush_dir.join(DATA_DIR_NAME),
            logs_path: hush_dir.join(LOGS_DIR_NAME),
            config_path: hush_dir.join(CONFIG_FILE_NAME),
            hush_dir,
            config,
        }
    }

    /// Write a new key as `keys/<name>.pem` and return it
    pub fn generate_key(&self, name: &str) -> Result<SecretKey, StateError> {
        let path = self.keys_path.join(format!("{}.pem", name));
        if path.exists() {
            return Err(StateError::KeyExists(name.to_string()));
        }
        let key = SecretKey::generate().map_err(|e| StateError::InvalidKey(e.to_string()))?;
        fs::write(&path, key.to_pem())?;
        Ok(key)
    }

    /// Load every `*.pem` key, ordered by file name. The node's default
    /// identity is `node.pem` when present, otherwise the first key.
    pub fn load_keys(&self) -> Result<Vec<SecretKey>, StateError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.keys_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "pem"))
            .collect();
        paths.sort_by(|a, b| {
            is_default_key(b)
                .cmp(&is_default_key(a))
                .then_with(|| a.cmp(b))
        });

        let keys = paths
            .iter()
            .map(|path| {
                let pem = fs::read_to_string(path)?;
                SecretKey::from_pem(&pem)
                    .map_err(|e| StateError::InvalidKey(format!("{}: {}", path.display(), e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if keys.is_empty() {
            return Err(StateError::MissingFile(format!(
                "{}/{}.pem",
                KEYS_DIR_NAME, DEFAULT_KEY_NAME
            )));
        }
        Ok(keys)
    }

    pub fn storage(&self) -> StorageConfig {
        self.config.storage.clone().rooted_at(&self.hush_dir)
    }

    pub fn known_nodes_storage(&self) -> StorageConfig {
        self.config
            .known_nodes_storage
            .clone()
            .unwrap_or_else(|| self.config.storage.clone())
            .rooted_at(&self.hush_dir)
    }
}

fn is_default_key(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|stem| stem == DEFAULT_KEY_NAME)
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("hush directory not initialized. Run 'hush init' first")]
    NotInitialized,

    #[error("hush directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("key already exists: {0}")]
    KeyExists(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hush");

        let state = AppState::init(Some(path.clone()), None).unwrap();
        assert!(state.config_path.exists());
        assert!(state.keys_path.join("node.pem").exists());

        let loaded = AppState::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.config, AppConfig::default());
        assert_eq!(loaded.load_keys().unwrap().len(), 1);

        assert!(matches!(
            AppState::init(Some(path), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            AppState::load(Some(dir.path().join("absent"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_default_key_comes_first() {
        let dir = TempDir::new().unwrap();
        let state = AppState::init(Some(dir.path().to_path_buf()), None).unwrap();
        let default = state.load_keys().unwrap()[0].public();

        state.generate_key("aaa").unwrap();
        state.generate_key("zzz").unwrap();
        let keys = state.load_keys().unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0].public(), default);

        assert!(matches!(
            state.generate_key("aaa"),
            Err(StateError::KeyExists(_))
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str(
            "node_port = 9000\nother_nodes = [\"http://10.0.0.2:8080/\"]\n\n[storage]\ntype = \"sql\"\npath = \"data/store.db\"\n",
        )
        .unwrap();
        assert_eq!(config.node_port, 9000);
        assert_eq!(config.client_port, 8888);
        assert_eq!(config.other_nodes.len(), 1);
        assert_eq!(
            config.advertised_url().unwrap().as_str(),
            "http://127.0.0.1:9000/"
        );
        assert_eq!(config.log_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn test_storage_paths_are_rooted() {
        let dir = TempDir::new().unwrap();
        let state = AppState::init(Some(dir.path().to_path_buf()), None).unwrap();
        assert_eq!(
            state.storage(),
            StorageConfig::Sled {
                path: dir.path().join("data").join("store")
            }
        );
        assert_eq!(state.known_nodes_storage(), state.storage());
    }
}
