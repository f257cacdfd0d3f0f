use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::crypto::StorageKey;
use crate::enclave::{PrivacyGroupPayload, SealedEnvelope};

/// Outbound work toward a peer node.
#[derive(Debug, Clone)]
pub enum PushJob {
    /// Store a sealed payload at a recipient's node
    Payload {
        url: Url,
        key: StorageKey,
        envelope: SealedEnvelope,
    },
    /// Share privacy group metadata with a member's node
    PrivacyGroup {
        url: Url,
        group: PrivacyGroupPayload,
    },
}

impl PushJob {
    pub fn url(&self) -> &Url {
        match self {
            PushJob::Payload { url, .. } => url,
            PushJob::PrivacyGroup { url, .. } => url,
        }
    }
}

/// Decides WHEN and WHERE pushes run.
///
/// The node only hands jobs over; delivery is best effort. A daemon queues
/// jobs for a background HTTP worker, tests can deliver them in process.
#[async_trait]
pub trait PushProvider: Send + Sync + std::fmt::Debug {
    async fn dispatch(&self, job: PushJob) -> Result<()>;
}

/// Discards every job. For nodes that run without peers.
#[derive(Debug, Default, Clone)]
pub struct NoopPushProvider;

#[async_trait]
impl PushProvider for NoopPushProvider {
    async fn dispatch(&self, job: PushJob) -> Result<()> {
        tracing::trace!(url = %job.url(), "dropping push job");
        Ok(())
    }
}
