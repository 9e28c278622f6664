//! Error vocabulary for the webhook front door (spec.md §7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use trustflow_types::ErrorCode;

#[derive(Debug, Error)]
pub enum WebError {
    /// `X-Hub-Signature-256` didn't match (spec.md §7 `SignatureMismatch`):
    /// returns 401, nothing enqueued, nothing logged that could leak the
    /// secret.
    #[error("signature mismatch")]
    SignatureMismatch,
    /// The body could not be read at all.
    #[error("unreadable request body")]
    UnreadableBody,
    /// The payload didn't parse as the minimal envelope C7 needs.
    #[error("malformed event envelope: {0}")]
    MalformedEnvelope(String),
    /// The `ExistsByProviderId` collaborator call failed (fail-closed by
    /// default per spec.md §9; see `exists_fail_open`).
    #[error("existence check failed: {0}")]
    ExistsCheck(String),
}

impl ErrorCode for WebError {
    fn code(&self) -> &'static str {
        match self {
            Self::SignatureMismatch => "WEB_SIGNATURE_MISMATCH",
            Self::UnreadableBody => "WEB_UNREADABLE_BODY",
            Self::MalformedEnvelope(_) => "WEB_MALFORMED_ENVELOPE",
            Self::ExistsCheck(_) => "WEB_EXISTS_CHECK",
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::SignatureMismatch => StatusCode::UNAUTHORIZED,
            Self::UnreadableBody | Self::MalformedEnvelope(_) => StatusCode::BAD_REQUEST,
            Self::ExistsCheck(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let code = self.code();
        let message = self.to_string();
        (
            status,
            Json(serde_json::json!({ "error": { "code": code, "message": message } })),
        )
            .into_response()
    }
}
