use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use tracing::info;

use stockroom_core::{Sku, WarehouseId};
use stockroom_infra::StockError;

use crate::app::services::{AppServices, Engine};
use crate::app::{dto, errors};

/// Upper bound on `requests` for one load simulation.
pub const MAX_SIMULATION_REQUESTS: usize = 10_000;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_items))
        .route("/items/:sku", get(get_item))
        .route("/warehouse/:warehouse_id", get(list_items_in_warehouse))
        .route("/update-stock", put(update_stock))
        .route("/simulate-load", post(simulate_load))
        .route("/logs", get(recent_logs))
        .route("/logs/warehouse/:warehouse_id", get(warehouse_logs))
        .route("/seed", post(seed))
}

/// Run an engine call on the blocking pool; store backends may block.
async fn with_engine<T, F>(services: &AppServices, f: F) -> Result<T, Response>
where
    F: FnOnce(&Engine) -> Result<T, StockError> + Send + 'static,
    T: Send + 'static,
{
    let engine = services.engine();
    match tokio::task::spawn_blocking(move || f(&engine)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(errors::stock_error_to_response(e)),
        Err(e) => Err(errors::join_error_to_response(e)),
    }
}

fn parse_sku(raw: &str) -> Result<Sku, Response> {
    Sku::new(raw).map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_sku", e.to_string()))
}

fn parse_warehouse(raw: &str) -> Result<WarehouseId, Response> {
    WarehouseId::new(raw)
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_warehouse_id", e.to_string()))
}

fn bad_query(rejection: QueryRejection) -> Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text())
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match with_engine(&services, |engine| engine.items()).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(sku): Path<String>,
) -> Response {
    let sku = match parse_sku(&sku) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match with_engine(&services, move |engine| engine.item(&sku)).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn list_items_in_warehouse(
    Extension(services): Extension<Arc<AppServices>>,
    Path(warehouse_id): Path<String>,
) -> Response {
    let warehouse_id = match parse_warehouse(&warehouse_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match with_engine(&services, move |engine| engine.items_in_warehouse(&warehouse_id)).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn update_stock(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::UpdateStockRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text());
        }
    };
    let sku = match parse_sku(&body.sku) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let delta = body.quantity_change;

    match with_engine(&services, move |engine| engine.update_stock(&sku, delta)).await {
        Ok(update) => (StatusCode::OK, Json(dto::UpdateStockResponse::from(update))).into_response(),
        Err(resp) => resp,
    }
}

pub async fn simulate_load(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::SimulateLoadQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return bad_query(rejection),
    };
    if query.requests > MAX_SIMULATION_REQUESTS {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_query",
            format!("requests must be at most {MAX_SIMULATION_REQUESTS}"),
        );
    }
    let sku = match parse_sku(&query.sku) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let harness = services.harness();
    let requests = query.requests;
    let summary = match tokio::task::spawn_blocking(move || harness.simulate(&sku, requests)).await {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => return errors::harness_error_to_response(e),
        Err(e) => return errors::join_error_to_response(e),
    };

    info!(
        run_id = %summary.run_id,
        success = summary.success_count,
        conflicts = summary.conflict_count,
        "simulate-load served"
    );
    (StatusCode::OK, Json(summary)).into_response()
}

pub async fn recent_logs(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::RecentLogsQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return bad_query(rejection),
    };

    match with_engine(&services, move |engine| engine.recent_logs(query.limit)).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn warehouse_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Path(warehouse_id): Path<String>,
    query: Result<Query<dto::LogWindowQuery>, QueryRejection>,
) -> Response {
    let warehouse_id = match parse_warehouse(&warehouse_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Query(window) = match query {
        Ok(q) => q,
        Err(rejection) => return bad_query(rejection),
    };

    match with_engine(&services, move |engine| {
        engine.query_logs(&warehouse_id, window.start, window.end)
    })
    .await
    {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(resp) => resp,
    }
}

pub async fn seed(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match with_engine(&services, |engine| engine.seed_if_empty()).await {
        Ok(inserted) => (StatusCode::OK, Json(dto::SeedResponse::new(inserted))).into_response(),
        Err(resp) => resp,
    }
}
