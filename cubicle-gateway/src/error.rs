//! Error types for the gateway crate.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cubicle_executor::ExecutorError;
use cubicle_store::StoreError;
use serde_json::json;

/// Errors that can occur during gateway request handling or startup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// An error propagated from the store layer.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An error propagated from the executor layer.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// The session store failed to load or save.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A page template failed to render.
    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),

    /// The request body is malformed or contains invalid values.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A configuration variable has an unusable value.
    #[error("invalid configuration {key}: {reason}")]
    InvalidConfig { key: &'static str, reason: String },
}

impl GatewayError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Store(err) => match err {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
                StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StoreError::DuplicateUser(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            GatewayError::Executor(err) => match err {
                ExecutorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                ExecutorError::SourceTooLarge { .. } | ExecutorError::SnapshotTooLarge { .. } => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                ExecutorError::SnapshotNotFound(_) => StatusCode::NOT_FOUND,
                ExecutorError::InvalidSnapshotName(_) => StatusCode::BAD_REQUEST,
                ExecutorError::InterpreterNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Session(_)
            | GatewayError::Render(_)
            | GatewayError::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Database and I/O details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_owned()
        } else {
            self.to_string()
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cubicle_core::{CoreError, PostId, UserId};

    use super::*;

    #[test]
    fn gateway_error_status_codes_map_correctly() {
        let cases = [
            (GatewayError::Store(StoreError::NotFound(PostId::new(1))), StatusCode::NOT_FOUND),
            (
                GatewayError::Store(StoreError::Forbidden {
                    post: PostId::new(1),
                    user: UserId::new(2),
                }),
                StatusCode::FORBIDDEN,
            ),
            (
                GatewayError::Store(StoreError::Validation(CoreError::TitleRequired)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                GatewayError::Executor(ExecutorError::Timeout {
                    after: Duration::from_secs(1),
                }),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                GatewayError::Executor(ExecutorError::SourceTooLarge { len: 10, max: 5 }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (GatewayError::InvalidRequest("missing field".to_owned()), StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            let shown = err.to_string();
            assert_eq!(err.into_response().status(), expected, "wrong status for {shown}");
        }
    }

    #[test]
    fn gateway_error_executor_variant_returns_500() {
        let exec_err = ExecutorError::SpawnFailed("fork failed".to_owned());
        let resp = GatewayError::Executor(exec_err).into_response();
        assert_eq!(
            resp.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "spawn failures must map to 500"
        );
    }

    #[test]
    fn gateway_error_display_includes_message() {
        let err = GatewayError::InvalidRequest("bad body".to_owned());
        assert!(err.to_string().contains("bad body"), "Display must include the message");
    }

    #[test]
    fn forbidden_message_names_no_ids() {
        let err = GatewayError::Store(StoreError::Forbidden {
            post: PostId::new(41),
            user: UserId::new(73),
        });
        let shown = err.to_string();
        assert!(!shown.contains("41") && !shown.contains("73"), "ids leaked: {shown}");
    }

    #[test]
    fn not_found_message_names_the_post() {
        let err = GatewayError::Store(StoreError::NotFound(PostId::new(12)));
        assert_eq!(err.to_string(), "Post id 12 doesn't exist.");
    }
}
