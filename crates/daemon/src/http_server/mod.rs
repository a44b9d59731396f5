use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use http::header::{ACCEPT, ORIGIN};
use http::{Method, Request};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod api;
mod config;
mod extension;
mod handlers;
pub mod rooms;
pub mod status;

pub use config::Config;
pub use extension::{ExtensionError, ServerExtension};

/// Build the request pipeline. The router carries no routes of its own:
/// every request falls through to the extension list and is offered to each
/// extension in order.
pub fn router(extensions: Vec<Arc<dyn ServerExtension>>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(Arc::new(extensions))
}

async fn dispatch(
    State(extensions): State<Arc<Vec<Arc<dyn ServerExtension>>>>,
    mut request: Request<Body>,
) -> Response {
    // extensions may take the request, so the 404 headers are kept aside
    let headers = request.headers().clone();

    for extension in extensions.iter() {
        match extension.handle(&mut request).await {
            Ok(Some(response)) => return response,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!("extension failed to handle request: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
                    .into_response();
            }
        }
    }

    handlers::not_found_response(&headers)
}

/// Run the HTTP server over the given extensions until shutdown.
pub async fn run(
    config: Config,
    extensions: Vec<Arc<dyn ServerExtension>>,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(config.log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    // every endpoint is a GET, including the websocket handshake
    let cors = CorsLayer::new()
        .allow_methods(vec![Method::GET])
        .allow_headers(vec![ACCEPT, ORIGIN])
        .allow_origin(Any)
        .allow_credentials(false);

    let router = router(extensions).layer(cors).layer(trace_layer);

    tracing::info!(addr = ?config.listen_addr, "server listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("http server io failure: {0}")]
    Io(#[from] std::io::Error),
}
