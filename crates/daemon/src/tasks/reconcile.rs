use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::sessions::SessionManager;

pub const RECONCILE_INTERVAL: Duration = Duration::from_secs(1);

/// Nudge every live session once a second.
///
/// The sync protocol has no push notification: a session announces its state
/// when it opens and whenever it is told to reconcile, so without this loop
/// a document written after a session opened would sit unannounced until the
/// remote reconnects.
pub async fn run(sessions: Arc<SessionManager>, mut shutdown_rx: watch::Receiver<()>) {
    let mut ticker = tokio::time::interval(RECONCILE_INTERVAL);
    // the first tick completes immediately; nothing to reconcile yet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => sessions.force_reconcile_all(),
            _ = shutdown_rx.changed() => {
                tracing::debug!("reconcile loop shutting down");
                return;
            }
        }
    }
}
