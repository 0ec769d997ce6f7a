use crate::api::state::ApiState;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Probe {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    Up,
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    status: Probe,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Only reported when the router was given a queue.
#[derive(Debug, Serialize)]
pub struct QueueHealth {
    status: Probe,
    #[serde(skip_serializing_if = "Option::is_none")]
    backlog: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    status: Overall,
    feature_store: StoreHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    queue: Option<QueueHealth>,
}

/// `up` when the feature store answers PING and the queue (if any) can report
/// its length; `degraded` otherwise. Always 200 so scrapers can read the body.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthReport> {
    let feature_store = match state.store.ping().await {
        Ok(()) => StoreHealth {
            status: Probe::Up,
            error: None,
        },
        Err(e) => StoreHealth {
            status: Probe::Down,
            error: Some(e.to_string()),
        },
    };

    let queue = match &state.queue {
        None => None,
        Some(queue) => Some(match queue.len().await {
            Ok(backlog) => QueueHealth {
                status: Probe::Up,
                backlog: Some(backlog),
                error: None,
            },
            Err(e) => QueueHealth {
                status: Probe::Down,
                backlog: None,
                error: Some(e.to_string()),
            },
        }),
    };

    let all_up = feature_store.status == Probe::Up
        && queue.as_ref().is_none_or(|q| q.status == Probe::Up);
    let status = if all_up { Overall::Up } else { Overall::Degraded };

    Json(HealthReport {
        status,
        feature_store,
        queue,
    })
}
