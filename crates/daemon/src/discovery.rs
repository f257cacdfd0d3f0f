//! Periodic party info exchange with every known node.
//!
//! Each round posts our registry snapshot to every peer URL and merges the
//! snapshot each one answers with. Unreachable peers are only logged; they
//! are retried on the next round.

use std::time::Duration;

use futures::future::join_all;
use reqwest::Client;
use tokio::sync::watch;
use url::Url;

use common::network::PartyInfo;

use crate::http_server::api::client::{ApiError, ApiRequest};
use crate::http_server::node::PartyInfoRequest;
use crate::ServiceState;

const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one discovery round
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub contacted: usize,
    pub answered: usize,
    /// Whether any answer taught us something new
    pub changed: bool,
}

/// Run discovery rounds every `interval` until shutdown is signalled.
pub async fn run_discovery(
    state: ServiceState,
    client: Client,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) {
    tracing::info!(interval_secs = interval.as_secs(), "Starting discovery loop");
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = exchange_round(&state, &client).await;
                tracing::debug!(
                    contacted = report.contacted,
                    answered = report.answered,
                    changed = report.changed,
                    "discovery round complete"
                );
            }
            _ = shutdown_rx.changed() => {
                tracing::info!("Shutdown signalled, stopping discovery loop");
                break;
            }
        }
    }
}

/// One exchange with every known peer, followed by a registry snapshot save.
pub async fn exchange_round(state: &ServiceState, client: &Client) -> RoundReport {
    let registry = state.node().registry();
    let snapshot = registry.snapshot();
    let peers = registry.peer_urls();

    let answers = join_all(
        peers
            .iter()
            .map(|url| exchange(client, url, snapshot.clone())),
    )
    .await;

    let mut report = RoundReport {
        contacted: peers.len(),
        ..Default::default()
    };
    for (url, answer) in peers.iter().zip(answers) {
        match answer {
            Ok(info) => {
                report.answered += 1;
                report.changed |= registry.merge_party_info(&info);
            }
            Err(e) => tracing::debug!(url = %url, "party info exchange failed: {}", e),
        }
    }

    if let Err(e) = state.persist_registry().await {
        tracing::warn!("failed to persist registry snapshot: {}", e);
    }
    report
}

async fn exchange(client: &Client, url: &Url, snapshot: PartyInfo) -> Result<PartyInfo, ApiError> {
    let response = PartyInfoRequest(snapshot)
        .build_request(url, client)?
        .timeout(EXCHANGE_TIMEOUT)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(ApiError::from_response(response).await);
    }
    Ok(response.json().await?)
}
