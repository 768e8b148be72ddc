use axum::{Json, extract::State};
use serde_json::json;
use std::sync::atomic::Ordering;
use tokio::time::{Duration, timeout};

use crate::SharedState;
use crate::error::ApiError;

const READINESS_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn livez() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness gate: reports not-ready during shutdown and verifies that the
/// database answers a trivial query within a short deadline.
pub async fn readyz(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.readiness.load(Ordering::SeqCst) {
        return Err(ApiError::ServiceUnavailable("shutting_down".into()));
    }

    let client = match timeout(READINESS_TIMEOUT, state.pool.get()).await {
        Ok(Ok(client)) => client,
        Ok(Err(err)) => {
            return Err(ApiError::ServiceUnavailable(format!(
                "failed to check out pool connection: {err}"
            )));
        }
        Err(_) => return Err(ApiError::ServiceUnavailable("db_pool_timeout".into())),
    };

    match timeout(READINESS_TIMEOUT, client.simple_query("SELECT 1")).await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => {
            return Err(ApiError::ServiceUnavailable(format!(
                "health check failed: {err}"
            )));
        }
        Err(_) => return Err(ApiError::ServiceUnavailable("db_ping_timeout".into())),
    }

    Ok(Json(json!({
        "status": "ok",
        "database": "ok",
        "application": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}
