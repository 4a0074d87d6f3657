//! Code execution and snapshot handlers.
//!
//! `/exec` takes a form and answers in plain text. `/exec2` and `/class/save`
//! take a JSON body whatever the declared content type, since the classroom
//! editor posts it as `text/plain`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Form, Json,
};
use cubicle_executor::ExecutionResult;
use serde::{Deserialize, Serialize};

use crate::{error::GatewayError, state::AppState};

/// Response header carrying the program's exit status on `/exec`.
pub const EXIT_CODE_HEADER: HeaderName = HeaderName::from_static("x-exit-code");

/// Body of `/exec`, `/exec2` and `/class/save`.
#[derive(Debug, Deserialize)]
pub struct CodeBody {
    pub code: String,
}

/// `/exec2` response.
#[derive(Debug, Serialize)]
pub struct ExecReply {
    /// Trimmed standard output.
    pub result: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub truncated: bool,
    pub duration_ms: u128,
}

impl From<ExecutionResult> for ExecReply {
    fn from(result: ExecutionResult) -> Self {
        Self {
            success: result.success(),
            duration_ms: result.duration.as_millis(),
            result: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
            truncated: result.truncated,
        }
    }
}

/// `/class/save` response.
#[derive(Debug, Serialize)]
pub struct SaveReply {
    pub result: &'static str,
    pub name: String,
}

/// Parse a `{"code": ...}` body.
///
/// # Errors
/// Returns [`GatewayError::InvalidRequest`] if the bytes are not such an object.
pub fn parse_code_body(bytes: &[u8]) -> Result<CodeBody, GatewayError> {
    serde_json::from_slice(bytes).map_err(|e| {
        GatewayError::InvalidRequest(format!("expected a JSON object with a \"code\" string: {e}"))
    })
}

/// Plain-text rendering: stdout, then stderr if the program failed.
#[must_use]
pub fn console_text(result: &ExecutionResult) -> String {
    if result.success() || result.stderr.is_empty() {
        return result.stdout.clone();
    }
    if result.stdout.is_empty() {
        return result.stderr.clone();
    }
    format!("{}\n{}", result.stdout, result.stderr)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `POST /exec`: run the `code` form field and answer with its console output.
///
/// # Errors
/// Returns [`GatewayError::Executor`] if the code could not be run to
/// completion (too large, timed out, interpreter missing).
pub async fn exec_text(
    State(state): State<AppState>,
    Form(body): Form<CodeBody>,
) -> Result<Response, GatewayError> {
    let result = state.runner.execute(&body.code).await?;
    let exit = result
        .exit_code
        .map_or_else(|| HeaderValue::from_static("signal"), HeaderValue::from);
    Ok(([(EXIT_CODE_HEADER, exit)], console_text(&result)).into_response())
}

/// `POST /exec2`: run `{"code": ...}` and answer with an [`ExecReply`].
///
/// # Errors
/// Returns [`GatewayError::InvalidRequest`] for a malformed body, otherwise
/// the same as [`exec_text`].
pub async fn exec_json(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ExecReply>, GatewayError> {
    let body = parse_code_body(&body)?;
    let result = state.runner.execute(&body.code).await?;
    Ok(Json(ExecReply::from(result)))
}

/// `POST /class/save`: keep a copy of `{"code": ...}` in the snapshot directory.
///
/// # Errors
/// Returns [`GatewayError::InvalidRequest`] for a malformed body, or
/// [`GatewayError::Executor`] if the snapshot is too large or cannot be written.
pub async fn save_snapshot(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SaveReply>, GatewayError> {
    let body = parse_code_body(&body)?;
    let saved = state.snapshots.save(&body.code).await?;
    Ok(Json(SaveReply {
        result: "ok",
        name: saved.name,
    }))
}

/// `GET /class`: names of saved snapshots, oldest first.
///
/// # Errors
/// Returns [`GatewayError::Executor`] if the directory cannot be read.
pub async fn list_snapshots(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, GatewayError> {
    Ok(Json(state.snapshots.list().await?))
}

/// `GET /class/{name}`: the saved source text.
///
/// # Errors
/// Returns [`GatewayError::Executor`] for an invalid or unknown name.
pub async fn load_snapshot(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<String, GatewayError> {
    Ok(state.snapshots.load(&name).await?)
}
