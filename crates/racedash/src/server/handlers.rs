//! Request handlers.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AppState;
use crate::schema;

/// Message returned for every rejected upload.
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid race data format";

/// Body of a successful upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAccepted {
    /// Always `true`.
    pub success: bool,
}

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Generic, client-safe description.
    pub error: String,
}

/// Whether the request declares a JSON body (`application/json` or
/// `application/*+json`, parameters ignored).
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };

    let mime = value.split(';').next().unwrap_or_default().trim();
    let Some((kind, subtype)) = mime.split_once('/') else {
        return false;
    };
    kind.eq_ignore_ascii_case("application")
        && (subtype.eq_ignore_ascii_case("json")
            || subtype.to_ascii_lowercase().ends_with("+json"))
}

fn invalid_format() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: INVALID_FORMAT_MESSAGE.to_string(),
        }),
    )
        .into_response()
}

/// `POST /api/upload`
///
/// Validates the body and replaces the stored document. Non-JSON content
/// types, unreadable bodies, malformed JSON and schema mismatches all produce
/// the same 400 response, and none of them touch the store.
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    if !is_json_content_type(&headers) {
        debug!("Rejected upload without a JSON content type");
        return invalid_format();
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Failed to read upload body: {}", rejection);
            return invalid_format();
        }
    };

    match schema::validate_slice(&body) {
        Ok(document) => {
            state.store().put(document).await;
            Json(UploadAccepted { success: true }).into_response()
        }
        Err(err) => {
            debug!("Rejected upload: {}", err.detail());
            invalid_format()
        }
    }
}

/// `GET /api/races`
///
/// Returns the stored document, or `200` with an empty body when nothing has
/// been uploaded yet.
pub async fn races(State(state): State<AppState>) -> Response {
    match state.store().current().await {
        Some(record) => Json(&record.data).into_response(),
        None => StatusCode::OK.into_response(),
    }
}

/// `GET /health`
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
