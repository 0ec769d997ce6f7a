use crate::api::state::ApiState;
use crate::metrics::record_api_hit;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::model::feature::flag_str;
use common::model::FeatureRecord;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Error body mirrors the `{"detail": ...}` shape clients already parse.
#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    BadRequest(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail.to_string()),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Unavailable(detail) => (StatusCode::SERVICE_UNAVAILABLE, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<errors::Error> for ApiError {
    fn from(e: errors::Error) -> Self {
        log::error!("Backend unavailable: {e}");
        ApiError::Unavailable(e.to_string())
    }
}

/// Stored hash fields of one user, e.g. `{"risky": "True", "reason": "..."}`.
pub async fn user_risk(
    State(state): State<ApiState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    record_api_hit("user_risk");
    let record = state
        .store
        .get(&user_id)
        .await?
        .ok_or(ApiError::NotFound("User unknown"))?;
    Ok(Json(json!({
        "risky": flag_str(record.risky),
        "reason": record.reason,
    })))
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub records: Vec<SummaryRow>,
    pub total: usize,
    pub threats: usize,
    /// Percentage of users whose latest verdict is safe; absent with no data.
    pub safety_score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SummaryRow {
    pub user_id: String,
    pub risky: String,
    pub reason: String,
}

impl Summary {
    pub fn from_records(mut records: Vec<FeatureRecord>) -> Self {
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        let total = records.len();
        let threats = records.iter().filter(|r| r.risky).count();
        let safety_score = (total > 0).then(|| {
            let score = (total - threats) as f64 / total as f64 * 100.0;
            (score * 10.0).round() / 10.0
        });
        let records = records
            .into_iter()
            .map(|r| SummaryRow {
                risky: flag_str(r.risky).to_string(),
                user_id: r.user_id,
                reason: r.reason,
            })
            .collect();
        Self {
            records,
            total,
            threats,
            safety_score,
        }
    }
}

/// Dashboard feed: every user record plus totals.
pub async fn summary(State(state): State<ApiState>) -> Result<Json<Summary>, ApiError> {
    record_api_hit("summary");
    let records = state.store.list().await?;
    Ok(Json(Summary::from_records(records)))
}
