//! Queue-based implementation of PushProvider for the daemon
//!
//! Pushes are queued on a flume channel and delivered over HTTP by a
//! background worker, so a send never waits on a slow or dead peer.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::watch;

use common::node::{PushJob, PushProvider};

use crate::http_server::api::client::ApiRequest;
use crate::http_server::node::{PushPrivacyGroupRequest, PushRequest};

/// Upper bound for one push, so a peer that never answers cannot stall the
/// worker.
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the queued push provider
#[derive(Debug, Clone)]
pub struct QueuedPushConfig {
    /// Maximum number of queued jobs. None means unbounded.
    pub max_queue_size: Option<usize>,
}

impl Default for QueuedPushConfig {
    fn default() -> Self {
        Self {
            max_queue_size: Some(1000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueuedPushProvider {
    tx: flume::Sender<PushJob>,
}

impl QueuedPushProvider {
    /// Returns the provider and the receiver to hand to [`run_worker`].
    pub fn new(config: QueuedPushConfig) -> (Self, JobReceiver) {
        let (tx, rx) = match config.max_queue_size {
            Some(size) => {
                tracing::info!("Creating bounded push queue with size {}", size);
                flume::bounded(size)
            }
            None => {
                tracing::info!("Creating unbounded push queue");
                flume::unbounded()
            }
        };

        (Self { tx }, JobReceiver { rx })
    }
}

#[async_trait]
impl PushProvider for QueuedPushProvider {
    async fn dispatch(&self, job: PushJob) -> Result<()> {
        tracing::debug!(url = %job.url(), "queueing push");
        self.tx.try_send(job).map_err(|e| match e {
            flume::TrySendError::Full(_) => {
                anyhow::anyhow!("push queue is full - worker may be overloaded")
            }
            flume::TrySendError::Disconnected(_) => {
                anyhow::anyhow!("push worker has been stopped")
            }
        })
    }
}

/// Job receiver for the background worker
#[derive(Debug)]
pub struct JobReceiver {
    rx: flume::Receiver<PushJob>,
}

impl JobReceiver {
    pub fn into_async(self) -> flume::r#async::RecvStream<'static, PushJob> {
        self.rx.into_stream()
    }
}

/// Deliver queued pushes until the queue closes or shutdown is signalled.
pub async fn run_worker(
    client: Client,
    mut job_stream: flume::r#async::RecvStream<'static, PushJob>,
    mut shutdown_rx: watch::Receiver<()>,
) {
    tracing::info!("Starting push worker");

    loop {
        tokio::select! {
            Some(job) = job_stream.next() => {
                let url = job.url().clone();
                if let Err(e) = deliver(&client, job).await {
                    tracing::warn!(url = %url, "push failed: {}", e);
                }
            }

            _ = shutdown_rx.changed() => {
                tracing::info!("Shutdown signalled, stopping push worker");
                break;
            }

            else => {
                tracing::info!("Push queue closed, stopping push worker");
                break;
            }
        }
    }
}

/// POST one job to the target node's API.
pub async fn deliver(client: &Client, job: PushJob) -> Result<()> {
    deliver_within(client, job, PUSH_TIMEOUT).await
}

async fn deliver_within(client: &Client, job: PushJob, timeout: Duration) -> Result<()> {
    let request = match job {
        PushJob::Payload { url, key, envelope } => {
            PushRequest { key, envelope }.build_request(&url, client)?
        }
        PushJob::PrivacyGroup { url, group } => {
            PushPrivacyGroupRequest(group).build_request(&url, client)?
        }
    };
    request
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
