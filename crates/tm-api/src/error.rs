use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{borrow::Cow, future::Future};
use thiserror::Error;
use tracing::error;

use tm_common::db::{AssignmentStoreError, CandidateFetchError, HistoryStoreError};
use tm_common::workflow::TransitionError;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Runs `fut` with the request id bound to the task, so any error response
/// produced inside can echo it back.
pub async fn with_request_id<Fut, T>(request_id: Option<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    match request_id {
        Some(id) => REQUEST_ID.scope(id, fut).await,
        None => fut.await,
    }
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(String::clone).ok()
}

const MAX_PUBLIC_MESSAGE_LEN: usize = 240;

fn redact_token(token: &str) -> Cow<'_, str> {
    if token.contains("://") {
        return Cow::Borrowed("[redacted-url]");
    }
    if let Some((base, _query)) = token.split_once('?') {
        return if base.is_empty() {
            Cow::Borrowed("[redacted-query]")
        } else {
            Cow::Owned(format!("{base}?[redacted]"))
        };
    }
    if token.starts_with('/') || token.contains('\\') {
        return Cow::Borrowed("[redacted-path]");
    }
    Cow::Borrowed(token)
}

/// Strips control characters, filesystem paths and URLs out of a message
/// before it leaves the service, and caps its length.
fn sanitize_message(message: &str) -> String {
    let flat: String = message
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let mut cleaned = flat
        .split_whitespace()
        .map(redact_token)
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.len() > MAX_PUBLIC_MESSAGE_LEN {
        cleaned.truncate(MAX_PUBLIC_MESSAGE_LEN);
        cleaned.push('…');
    }
    if cleaned.trim().is_empty() {
        cleaned = "unexpected error".into();
    }
    cleaned
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("too many requests: {0}")]
    TooManyRequests(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable code and the HTTP status it travels with.
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::TooManyRequests(_) => (StatusCode::TOO_MANY_REQUESTS, "too_many_requests"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// What the client sees. Guard failures carry their (sanitized) detail;
    /// credential and infrastructure failures stay generic.
    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => sanitize_message(msg),
            ApiError::Unauthorized(_) => "unauthorized".into(),
            ApiError::TooManyRequests(_) => "too many requests".into(),
            ApiError::ServiceUnavailable(_) => "service unavailable".into(),
            ApiError::Database(_) | ApiError::Internal(_) => "internal server error".into(),
        }
    }
}

/// Wire shape of every error body.
#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.classify();
        let request_id = current_request_id();

        error!(
            code,
            status = %status,
            request_id = request_id.as_deref().unwrap_or(""),
            error = %self,
            "api_error"
        );

        let body = ErrorResponse {
            code,
            message: self.public_message(),
            request_id,
        };
        (status, Json(body)).into_response()
    }
}

impl From<AssignmentStoreError> for ApiError {
    fn from(value: AssignmentStoreError) -> Self {
        match value {
            AssignmentStoreError::Transition(err @ TransitionError::Forbidden { .. }) => {
                ApiError::Forbidden(err.to_string())
            }
            AssignmentStoreError::Transition(err @ TransitionError::WrongState { .. }) => {
                ApiError::Conflict(err.to_string())
            }
            AssignmentStoreError::Conflict(msg) => ApiError::Conflict(msg),
            AssignmentStoreError::NotFound(msg) => ApiError::NotFound(msg),
            AssignmentStoreError::Invalid(msg) => ApiError::BadRequest(msg),
            AssignmentStoreError::Forbidden(msg) => ApiError::Forbidden(msg),
            err @ AssignmentStoreError::UnknownActor(_) => ApiError::Unauthorized(err.to_string()),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<CandidateFetchError> for ApiError {
    fn from(value: CandidateFetchError) -> Self {
        match value {
            CandidateFetchError::NotFound(msg) => ApiError::NotFound(msg),
            CandidateFetchError::Invalid(msg) => ApiError::BadRequest(msg),
            other => ApiError::Database(other.to_string()),
        }
    }
}

impl From<HistoryStoreError> for ApiError {
    fn from(value: HistoryStoreError) -> Self {
        match value {
            HistoryStoreError::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use http_body_util::BodyExt;
    use serde_json::Value;
    use tm_common::EmployeeRole;
    use tm_common::workflow::{AssignmentAction, plan_transition};

    #[tokio::test]
    async fn includes_request_id_in_response_body_when_present() {
        let err = ApiError::Internal("boom".into());
        let response = with_request_id(Some("req-123".into()), async { err.into_response() }).await;

        let (parts, body) = response.into_parts();
        assert_eq!(parts.status, StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = body.collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["request_id"], "req-123");
        assert_eq!(json["code"], "internal_error");
        assert_eq!(json["message"], "internal server error");
    }

    #[test]
    fn role_guard_failures_map_to_forbidden() {
        let transition = plan_transition(None, AssignmentAction::Request, EmployeeRole::Developer)
            .expect_err("developers cannot open requests");
        let api: ApiError = AssignmentStoreError::Transition(transition).into();

        assert_eq!(api.classify(), (StatusCode::FORBIDDEN, "forbidden"));
    }

    #[test]
    fn settled_assignment_transitions_map_to_conflict() {
        let transition = plan_transition(
            Some(tm_common::AssignmentStatus::Rejected),
            AssignmentAction::Approve,
            EmployeeRole::Tfs,
        )
        .expect_err("rejected assignments stay rejected");
        let api: ApiError = AssignmentStoreError::Transition(transition).into();

        assert_eq!(api.classify(), (StatusCode::CONFLICT, "conflict"));
    }

    #[test]
    fn sanitizer_strips_paths_and_urls() {
        let input = "query failed at /var/lib/data against https://db.internal:5432?sslmode=on";
        let cleaned = sanitize_message(input);

        assert!(!cleaned.contains("/var/lib"));
        assert!(!cleaned.contains("db.internal"));
    }
}
