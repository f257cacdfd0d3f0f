use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const REQUEST_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Watch SIGINT and SIGTERM and turn the first one into a shutdown signal.
///
/// SIGTERM waits out a grace period first so in-flight pushes can finish.
/// The returned task also completes when shutdown is triggered through the
/// sender, so programmatic shutdown joins cleanly.
pub fn graceful_shutdown_blocker(
) -> std::io::Result<(JoinHandle<()>, watch::Sender<()>, watch::Receiver<()>)> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let (tx, rx) = watch::channel(());
    let signal_tx = tx.clone();
    let mut triggered = rx.clone();

    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("SIGINT received, shutting down");
            }
            _ = sigterm.recv() => {
                tracing::info!(
                    grace_secs = REQUEST_GRACE_PERIOD.as_secs(),
                    "SIGTERM received, shutting down after grace period"
                );
                tokio::time::sleep(REQUEST_GRACE_PERIOD).await;
            }
            _ = triggered.changed() => {
                tracing::info!("shutdown requested");
                return;
            }
        }
        let _ = signal_tx.send(());
    });

    Ok((handle, tx, rx))
}

/// Registers a panic hook that logs panics using the `tracing` crate
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                panic.column = loc.column(),
            );
        }
        None => tracing::error!(message = %panic),
    }));
}

pub fn report_build_info() {
    let build = common::prelude::build_info();

    tracing::info!(
        build_profile = build.build_profile,
        features = build.build_features,
        version = build.version,
        built_at = build.build_timestamp,
        "hush node starting up"
    );
}
