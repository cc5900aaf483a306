//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID propagation
//! 2. Request/response logging
//! 3. Timeout enforcement
//! 4. Handler execution
//!
//! # Graceful Shutdown
//!
//! On SIGTERM or CTRL+C the server stops accepting connections and lets
//! in-flight requests finish. Stopping the broker is left to the caller so
//! that it happens after the last request has been answered.

use std::{future::Future, net::SocketAddr, time::Duration};

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::{handlers, AppState};

/// Header carrying the request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::{sync::Arc, time::Duration};
///
/// use spool_api::{create_router, AppState};
/// use spool_broker::{Broker, BrokerConfig};
/// use spool_core::RealClock;
///
/// # async fn example() -> anyhow::Result<()> {
/// let broker = Broker::open(BrokerConfig::default(), Arc::new(RealClock::new())).await?;
/// let app = create_router(AppState::new(Arc::new(broker)), Duration::from_secs(35));
/// // Serve the app...
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/health", get(handlers::health_check));

    let event_routes = Router::new()
        .route("/api/events", post(handlers::enqueue_event))
        .route("/api/events/consume", get(handlers::consume_events))
        .route("/api/events/acknowledge", post(handlers::acknowledge_events))
        .route("/api/events/{receipt_id}/nack", post(handlers::nack_event));

    let admin_routes = Router::new()
        .route("/api/status", get(handlers::status))
        .route("/api/metrics", get(handlers::metrics))
        .route("/api/dlq", get(handlers::list_dead_letters))
        .route("/api/dlq/{receipt_id}/reprocess", post(handlers::reprocess_dead_letter));

    Router::new()
        .merge(health_routes)
        .merge(event_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware propagating the caller's request ID, or a fresh one, to the
/// response.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    response
}

/// Serves `app` on `listener` until `shutdown` resolves, then waits for
/// in-flight requests.
///
/// # Errors
///
/// Returns `std::io::Error` if the listener fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Starts the HTTP server and runs it until a shutdown signal arrives.
///
/// # Errors
///
/// Returns `std::io::Error` if:
/// - Port is already in use
/// - Network interface unavailable
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
    request_timeout: Duration,
) -> Result<(), std::io::Error> {
    let app = create_router(state, request_timeout);

    info!(%addr, "starting HTTP server");
    let listener = TcpListener::bind(addr).await?;

    serve(listener, app, shutdown_signal()).await
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install CTRL+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("received SIGTERM, starting graceful shutdown");
        },
    }
}
