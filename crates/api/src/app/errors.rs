use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use stockroom_infra::harness::HarnessError;
use stockroom_infra::StockError;

pub fn stock_error_to_response(err: StockError) -> Response {
    match err {
        StockError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", err.to_string()),
        StockError::InvalidRequest(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_request", msg),
        StockError::Conflict(ref sku) => (
            StatusCode::CONFLICT,
            axum::Json(json!({
                "success": false,
                "sku": sku.as_str(),
                "message": err.to_string(),
            })),
        )
            .into_response(),
        StockError::UnloggedCommit { .. } => {
            error!(error = %err, "commit applied without audit entry");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "unlogged_commit", err.to_string())
        }
        StockError::Store(ref e) => {
            error!(error = %e, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
        StockError::AuditLog(ref e) => {
            error!(error = %e, "audit log failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "audit_log_error", err.to_string())
        }
    }
}

pub fn harness_error_to_response(err: HarnessError) -> Response {
    match err {
        HarnessError::FinalState(e) => stock_error_to_response(e),
        HarnessError::Pool(e) => {
            error!(error = %e, "load simulation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "simulation_failed", e.to_string())
        }
    }
}

/// A blocking task panicked or was cancelled.
pub fn join_error_to_response(err: tokio::task::JoinError) -> Response {
    error!(error = %err, "blocking task failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
