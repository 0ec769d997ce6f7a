use crate::api::state::ApiState;
use crate::api::{health, risk, tasks};
use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use log::{error, info};
use std::net::SocketAddr;
use tokio::sync::broadcast;

/// Read API served by `vigil-api`.
///
/// # Routes
/// - `GET /user/{user_id}/risk`: latest verdict for one user
/// - `GET /summary`: every user plus totals and safety score
/// - `POST /tasks`: enqueue a task for the worker
/// - `GET /metrics`: Prometheus metrics
/// - `GET /health`: store reachability
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/user/{user_id}/risk", get(risk::user_risk))
        .route("/summary", get(risk::summary))
        .route("/tasks", post(tasks::enqueue_task))
        .merge(ops_routes())
        .with_state(state)
}

/// Side listener of the worker process: Prometheus scrape and health.
pub fn worker_router(state: ApiState) -> Router {
    ops_routes().with_state(state)
}

fn ops_routes() -> Router<ApiState> {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health::health_check))
}

/// Handler for Prometheus metrics endpoint.
pub async fn metrics_handler(State(state): State<ApiState>) -> String {
    if let Some(handle) = &state.prometheus_handle {
        handle.render()
    } else {
        "Prometheus metrics not available (recorder not initialized)".to_string()
    }
}

/// Binds `0.0.0.0:port` and serves `app` until `shutdown` fires.
///
/// Binding happens before this returns, so a taken port surfaces as an error
/// to the caller instead of inside a background task.
pub async fn serve(
    app: Router,
    port: u16,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP listener bound to {}", listener.local_addr()?);

    Ok(tokio::spawn(async move {
        let result = axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await;
        match result {
            Ok(()) => info!("HTTP server stopped gracefully"),
            Err(e) => error!("HTTP server error: {e:?}"),
        }
    }))
}
