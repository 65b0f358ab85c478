use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::{internal_error, ErrorResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service is running
    pub healthy: bool,
    /// Number of registered buses
    pub bus_count: i64,
    /// Number of registered stops
    pub stop_count: i64,
    /// Number of distinct places with departure listings
    pub place_count: i64,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "health"
)]
pub async fn health_check(
    State(pool): State<SqlitePool>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<ErrorResponse>)> {
    let bus_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM buses")
        .fetch_one(&pool)
        .await
        .map_err(internal_error)?;
    let stop_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stops")
        .fetch_one(&pool)
        .await
        .map_err(internal_error)?;
    let place_count: i64 =
        sqlx::query_scalar("SELECT COUNT(DISTINCT place_name) FROM place_departures")
            .fetch_one(&pool)
            .await
            .map_err(internal_error)?;

    Ok(Json(HealthResponse {
        healthy: true,
        bus_count,
        stop_count,
        place_count,
    }))
}

pub fn router(pool: SqlitePool) -> Router {
    Router::new().route("/", get(health_check)).with_state(pool)
}
