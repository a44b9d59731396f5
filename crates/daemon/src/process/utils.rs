use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long a SIGTERM'd process keeps serving before the shutdown signal is
/// sent, so a load balancer has time to drain it. SIGINT skips the drain.
const SIGTERM_DRAIN_PERIOD: Duration = Duration::from_secs(10);

/// Spawns a task that turns SIGINT/SIGTERM into a message on a watch channel.
///
/// The sender is handed back too, so shutdown can also be triggered without
/// a signal.
pub fn graceful_shutdown_blocker() -> (JoinHandle<()>, watch::Sender<()>, watch::Receiver<()>) {
    let mut sigint = signal(SignalKind::interrupt()).unwrap();
    let mut sigterm = signal(SignalKind::terminate()).unwrap();

    let (tx, rx) = watch::channel(());
    let signal_tx = tx.clone();

    let handle = tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("keyboard interrupt: stopping server");
            }
            _ = sigterm.recv() => {
                tracing::info!(
                    drain_secs = SIGTERM_DRAIN_PERIOD.as_secs(),
                    "termination requested: draining before shutdown"
                );
                tokio::time::sleep(SIGTERM_DRAIN_PERIOD).await;
            }
        }

        let _ = signal_tx.send(());
    });

    (handle, tx, rx)
}

/// Route panics through `tracing` so they land in the same sinks as
/// everything else.
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| {
        let location = panic
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()));
        tracing::error!(message = %panic, panic.location = location.as_deref());
    }));
}

pub fn report_build_info() {
    let build = common::prelude::build_info();

    tracing::info!(
        version = build.version,
        profile = build.build_profile,
        features = build.build_features,
        rust = build.rust_version,
        "service starting up"
    );
}
