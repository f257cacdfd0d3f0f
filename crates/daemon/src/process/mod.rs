pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

use crate::push_provider::{self, QueuedPushConfig, QueuedPushProvider};
use crate::{discovery, http_server};
use crate::{ServiceConfig, ServiceState};

/// Handle for gracefully shutting down the node.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until the service shuts down (via signal or explicit shutdown).
    pub async fn wait(self) {
        shutdown_and_join(self.graceful_waiter, self.handles).await;
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Initialize logging, panic handler, and build info reporting.
/// Returns guards that must be kept alive for the duration of the program.
fn init_logging(
    service_config: &ServiceConfig,
) -> Vec<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let mut guards = Vec::new();

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdout_guard);

    let stdout_env_filter = EnvFilter::builder()
        .with_default_directive(service_config.log_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(stdout_env_filter);

    if let Some(log_dir) = &service_config.log_dir {
        if let Err(e) = std::fs::create_dir_all(log_dir) {
            eprintln!(
                "Warning: Failed to create log directory {:?}: {}",
                log_dir, e
            );
        }

        let file_appender = tracing_appender::rolling::daily(log_dir, "hush.log");
        let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
        guards.push(file_guard);

        let file_env_filter = EnvFilter::builder()
            .with_default_directive(service_config.log_level.into())
            .from_env_lossy();

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(file_env_filter);

        tracing_subscriber::registry()
            .with(stdout_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry().with(stdout_layer).init();
    }

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

/// Wait for shutdown and join all handles with timeout.
async fn shutdown_and_join(
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
) {
    let _ = graceful_waiter.await;

    if timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(handles))
        .await
        .is_err()
    {
        tracing::error!(
            "Failed to shut down within {} seconds",
            FINAL_SHUTDOWN_TIMEOUT.as_secs()
        );
        std::process::exit(4);
    }
}

/// Create state and spawn the servers and background tasks.
///
/// The returned `ShutdownHandle` must be kept alive; dropping it does not
/// stop the service.
pub async fn start_service(service_config: &ServiceConfig) -> (ServiceState, ShutdownHandle) {
    let (graceful_waiter, shutdown_tx, shutdown_rx) = match utils::graceful_shutdown_blocker() {
        Ok(blocker) => blocker,
        Err(e) => {
            tracing::error!("failed to install signal handlers: {}", e);
            std::process::exit(3);
        }
    };

    let (push, jobs) = QueuedPushProvider::new(QueuedPushConfig {
        max_queue_size: service_config.push_queue_size,
    });
    let state =
        match ServiceState::from_config(service_config, Arc::new(push), shutdown_rx.clone()).await
        {
            Ok(state) => state,
            Err(e) => {
                tracing::error!("error creating server state: {}", e);
                std::process::exit(3);
            }
        };

    let client = reqwest::Client::new();
    let mut handles = Vec::new();

    // Push worker
    let worker_client = client.clone();
    let worker_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        push_provider::run_worker(worker_client, jobs.into_async(), worker_rx).await;
    }));

    // Discovery loop
    let discovery_state = state.clone();
    let discovery_rx = shutdown_rx.clone();
    let interval = service_config.discovery_interval;
    handles.push(tokio::spawn(async move {
        discovery::run_discovery(discovery_state, client, interval, discovery_rx).await;
    }));

    // Client API server
    let api_state = state.clone();
    let api_config = http_server::Config::new(service_config.client_listen_addr)
        .with_log_level(service_config.log_level);
    let api_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        if let Err(e) = http_server::run_api(api_config, api_state, api_rx).await {
            tracing::error!("client API server error: {}", e);
        }
    }));

    // Node API server
    let node_state = state.clone();
    let node_config = http_server::Config::new(service_config.node_listen_addr)
        .with_log_level(service_config.log_level);
    let node_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        if let Err(e) = http_server::run_node(node_config, node_state, node_rx).await {
            tracing::error!("node API server error: {}", e);
        }
    }));

    tracing::info!(
        client_addr = %service_config.client_listen_addr,
        node_addr = %service_config.node_listen_addr,
        node_url = %service_config.node_url,
        "Running: client API + node API + discovery + push worker"
    );

    let handle = ShutdownHandle {
        graceful_waiter,
        handles,
        shutdown_tx,
    };

    (state, handle)
}

/// Runs the node until a shutdown signal is received. Use for CLI binary usage.
pub async fn spawn_service(service_config: &ServiceConfig) {
    let _guards = init_logging(service_config);
    let (state, handle) = start_service(service_config).await;
    handle.wait().await;

    if let Err(e) = state.persist_registry().await {
        tracing::warn!("failed to persist registry snapshot on shutdown: {}", e);
    }
}
