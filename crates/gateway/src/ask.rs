//! `POST /ask`: one conversational turn for the caller's session.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use promptwright_orchestrator::OrchestratorError;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::SharedState;
use crate::cookie::{read_session_id, session_cookie};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An orchestrator failure rendered as `{"error": ...}` with the matching status.
#[derive(Debug)]
pub struct AskError(pub OrchestratorError);

impl From<OrchestratorError> for AskError {
    fn from(e: OrchestratorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AskError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.public_message().to_string(),
            }),
        )
            .into_response()
    }
}

/// `application/json` or any `application/*+json`, parameters ignored.
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Pull a usable prompt out of the request body.
///
/// A body that is not a JSON object is an internal error; an object without a
/// non-empty string `prompt` is the caller's fault.
fn extract_prompt(headers: &HeaderMap, body: &[u8]) -> Result<String, OrchestratorError> {
    if !is_json_content_type(headers) {
        warn!(content_type = ?headers.get(header::CONTENT_TYPE), "Non-JSON /ask body");
        return Err(OrchestratorError::Internal("request body is not JSON".into()));
    }

    let payload: Value = serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Unparseable /ask body");
        OrchestratorError::Internal(format!("invalid request body: {e}"))
    })?;

    let Some(fields) = payload.as_object() else {
        warn!("Non-object /ask body");
        return Err(OrchestratorError::Internal("request body is not a JSON object".into()));
    };

    match fields.get("prompt").and_then(Value::as_str) {
        Some(prompt) if !prompt.is_empty() => Ok(prompt.to_string()),
        _ => Err(OrchestratorError::InvalidInput),
    }
}

pub async fn ask_handler(State(state): State<SharedState>, headers: HeaderMap, body: Bytes) -> Response {
    let prompt = match extract_prompt(&headers, &body) {
        Ok(prompt) => prompt,
        Err(e) => return AskError(e).into_response(),
    };

    let requested = read_session_id(&headers, &state.cookie_name);
    let lease = match state.sessions.get_or_create(requested.as_ref()).await {
        Ok(lease) => lease,
        Err(e) => {
            error!(error = %e, "Session store failure");
            return AskError(OrchestratorError::Internal(e.to_string())).into_response();
        }
    };

    let outcome = {
        // Held for the whole turn: same-session requests run one at a time.
        let mut session = lease.handle.lock().await;
        state.orchestrator.handle_turn(&mut session, &prompt).await
    };

    let mut response = match outcome {
        Ok(outcome) => {
            info!(session = %lease.id, "Turn completed");
            Json(outcome).into_response()
        }
        Err(e) => {
            if e.is_client_error() {
                warn!(session = %lease.id, error = %e, "Rejected prompt");
            } else {
                error!(session = %lease.id, error = %e, "Turn failed");
            }
            AskError(e).into_response()
        }
    };

    if lease.created {
        if let Some(cookie) = session_cookie(&state.cookie_name, &lease.id) {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
    }

    response
}
