//! HTTP request handlers for the web server.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::ScrapeError;

use super::AppState;

/// Query parameters for `/track`.
#[derive(Debug, Deserialize)]
pub struct TrackParams {
    pub num: Option<String>,
}

/// Error payload shared by all failure responses.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_json(message: impl Into<String>) -> Json<ErrorBody> {
    Json(ErrorBody {
        error: message.into(),
    })
}

/// Health check endpoint for container orchestration; independent of the
/// scrape pipeline.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Scrape tracking data for `?num=<tracking number>`.
///
/// Status mapping is uniform: 400 for validation failures, 404 when retries
/// exhaust without data, 500 for anything unexpected.
pub async fn track(
    State(state): State<AppState>,
    Query(params): Query<TrackParams>,
) -> impl IntoResponse {
    let Some(num) = params
        .num
        .as_deref()
        .map(str::trim)
        .filter(|num| !num.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            error_json("tracking number is required"),
        )
            .into_response();
    };

    match state.scraper.track(num).await {
        Ok(report) => Json(report).into_response(),
        Err(e @ ScrapeError::Validation(_)) => {
            (StatusCode::BAD_REQUEST, error_json(e.to_string())).into_response()
        }
        Err(e @ ScrapeError::Exhausted { .. }) => {
            warn!(tracking_number = num, "scrape exhausted: {e}");
            (
                StatusCode::NOT_FOUND,
                error_json("Tracking information not found."),
            )
                .into_response()
        }
        Err(e) => {
            error!(tracking_number = num, "unexpected scrape failure: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_json("internal error"),
            )
                .into_response()
        }
    }
}
