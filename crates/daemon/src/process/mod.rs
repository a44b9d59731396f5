pub mod utils;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::http_server;
use crate::http_server::rooms::RoomsExtension;
use crate::http_server::status::StatusExtension;
use crate::http_server::ServerExtension;
use crate::identity::ensure_identity;
use crate::tasks;
use crate::{ServiceConfig, ServiceState};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle for gracefully shutting down the daemon service.
pub struct ShutdownHandle {
    graceful_waiter: tokio::task::JoinHandle<()>,
    handles: Vec<tokio::task::JoinHandle<()>>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until the service shuts down (via signal or explicit shutdown),
    /// then join every task it spawned.
    pub async fn wait(self) {
        let _ = self.graceful_waiter.await;

        if timeout(FINAL_SHUTDOWN_TIMEOUT, join_all(self.handles))
            .await
            .is_err()
        {
            tracing::error!(
                "tasks still running {}s after shutdown signal",
                FINAL_SHUTDOWN_TIMEOUT.as_secs()
            );
            std::process::exit(4);
        }
    }

    /// Trigger shutdown programmatically (e.g. from a test harness).
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Install the tracing subscriber: a compact stdout layer, plus a daily
/// rolling file layer when `log_dir` is set. The returned writer guards must
/// be kept alive for the duration of the program.
fn init_logging(
    service_config: &ServiceConfig,
) -> Vec<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::fmt::format::FmtSpan;

    let env_filter = || {
        EnvFilter::builder()
            .with_default_directive(service_config.log_level.into())
            .from_env_lossy()
    };

    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(env_filter());
    let mut guards = vec![stdout_guard];

    match &service_config.log_dir {
        Some(log_dir) => {
            if let Err(e) = std::fs::create_dir_all(log_dir) {
                eprintln!("Warning: failed to create log directory {:?}: {}", log_dir, e);
            }

            let file_appender = tracing_appender::rolling::daily(log_dir, "burrow.log");
            let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
            guards.push(file_guard);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter());

            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(file_layer)
                .init();
        }
        None => tracing_subscriber::registry().with(stdout_layer).init(),
    }

    utils::register_panic_logger();
    utils::report_build_info();

    guards
}

/// Create state and spawn background tasks, returning the state handle.
///
/// Use this when you need access to `ServiceState` (e.g. to inspect sessions
/// from tests). The returned `ShutdownHandle` must be kept alive; dropping it
/// does not stop the service.
pub async fn start_service(service_config: &ServiceConfig) -> (ServiceState, ShutdownHandle) {
    let (graceful_waiter, shutdown_tx, shutdown_rx) = utils::graceful_shutdown_blocker();

    let state = match ServiceState::from_config(service_config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("error creating server state: {}", e);
            std::process::exit(3);
        }
    };

    // The server cannot answer /id, and sessions cannot resolve rooms,
    // without a peer identity in storage.
    let tag = match ensure_identity(state.peer()).await {
        Ok(tag) => tag,
        Err(e) => {
            tracing::error!("error bootstrapping server identity: {}", e);
            std::process::exit(3);
        }
    };
    tracing::info!(identity = %tag, "server identity");

    let extensions: Vec<Arc<dyn ServerExtension>> = vec![
        Arc::new(RoomsExtension::new(state.sessions().clone())),
        Arc::new(StatusExtension::new()),
    ];
    for extension in &extensions {
        if let Err(e) = extension.register(state.peer().clone()).await {
            tracing::error!("error registering server extension: {}", e);
            std::process::exit(3);
        }
    }

    let mut handles = Vec::new();

    // Spawn HTTP server
    let port = service_config.port;
    let listen_addr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
        .expect("Failed to parse listen address");
    let http_config = http_server::Config::new(listen_addr);
    let http_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        if let Err(e) = http_server::run(http_config, extensions, http_rx).await {
            tracing::error!("HTTP server error: {}", e);
        }
    }));

    // Spawn reconcile loop
    let sessions = state.sessions().clone();
    let reconcile_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        tasks::reconcile::run(sessions, reconcile_rx).await;
    }));

    // Spawn state inspector
    let peer = state.peer().clone();
    let inspect_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        tasks::inspector::run(peer, inspect_rx).await;
    }));

    tracing::info!("Running: HTTP on port {} + reconciler + inspector", port);

    let handle = ShutdownHandle {
        graceful_waiter,
        handles,
        shutdown_tx,
    };

    (state.clone(), handle)
}

/// Spawns the daemon service: HTTP server + reconcile loop + inspector.
/// Blocks until shutdown signal is received. Use for CLI binary usage.
pub async fn spawn_service(service_config: &ServiceConfig) {
    let _guards = init_logging(service_config);
    let (_, handle) = start_service(service_config).await;
    handle.wait().await;
}
