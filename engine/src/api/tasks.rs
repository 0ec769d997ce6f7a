use crate::api::risk::ApiError;
use crate::api::state::ApiState;
use crate::metrics::record_api_hit;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use common::model::TaskEvent;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub user_id: String,
    pub content: String,
    pub message_id: Option<String>,
    pub timestamp: Option<String>,
}

/// Pushes one task onto the worker queue.
pub async fn enqueue_task(
    State(state): State<ApiState>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<TaskEvent>), ApiError> {
    record_api_hit("enqueue");
    let queue = state
        .queue
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("task queue not configured".to_string()))?;

    if request.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id must not be empty".to_string()));
    }

    let event = TaskEvent::new(
        request
            .message_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        request.user_id,
        request.content,
        request.timestamp.unwrap_or_else(|| Utc::now().to_rfc3339()),
    );
    queue.push(&event.encode()).await?;
    log::info!("[Ingest] Queued msg {} from {}", event.message_id, event.user_id);
    Ok((StatusCode::ACCEPTED, Json(event)))
}
