use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::{bad_request, conflict, internal_error, not_found, ErrorResponse};
use crate::models::{normalize_name, Stop};

#[derive(Debug, Serialize, ToSchema)]
pub struct StopListResponse {
    pub stops: Vec<Stop>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStopRequest {
    pub stop_name: String,
}

/// List all stops
#[utoipa::path(
    get,
    path = "/api/stops",
    responses(
        (status = 200, description = "List of all stops", body = StopListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn list_stops(
    State(pool): State<SqlitePool>,
) -> Result<Json<StopListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let stops: Vec<Stop> = sqlx::query_as(
        r#"
        SELECT stop_id, stop_name
        FROM stops
        ORDER BY stop_name
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(StopListResponse { stops }))
}

/// Register a new stop
///
/// The name is trimmed and lowercased before insertion; uniqueness is
/// enforced on the normalized form.
#[utoipa::path(
    post,
    path = "/api/stops",
    request_body = CreateStopRequest,
    responses(
        (status = 201, description = "Stop created", body = Stop),
        (status = 400, description = "Empty stop name", body = ErrorResponse),
        (status = 409, description = "Stop name already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn create_stop(
    State(pool): State<SqlitePool>,
    Json(request): Json<CreateStopRequest>,
) -> Result<(StatusCode, Json<Stop>), (StatusCode, Json<ErrorResponse>)> {
    let stop_name = normalize_name(&request.stop_name);
    if stop_name.is_empty() {
        return Err(bad_request("Stop name cannot be empty"));
    }

    let result: Result<Stop, sqlx::Error> = sqlx::query_as(
        r#"
        INSERT INTO stops (stop_name)
        VALUES (?)
        RETURNING stop_id, stop_name
        "#,
    )
    .bind(&stop_name)
    .fetch_one(&pool)
    .await;

    match result {
        Ok(stop) => Ok((StatusCode::CREATED, Json(stop))),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(conflict("A stop with this name already exists"))
        }
        Err(e) => Err(internal_error(e)),
    }
}

/// Rename a stop
#[utoipa::path(
    put,
    path = "/api/stops/{stop_id}",
    params(
        ("stop_id" = i64, Path, description = "Stop ID")
    ),
    request_body = CreateStopRequest,
    responses(
        (status = 200, description = "Updated stop", body = Stop),
        (status = 400, description = "Empty stop name", body = ErrorResponse),
        (status = 404, description = "Stop not found", body = ErrorResponse),
        (status = 409, description = "Stop name already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn update_stop(
    State(pool): State<SqlitePool>,
    Path(stop_id): Path<i64>,
    Json(request): Json<CreateStopRequest>,
) -> Result<Json<Stop>, (StatusCode, Json<ErrorResponse>)> {
    let stop_name = normalize_name(&request.stop_name);
    if stop_name.is_empty() {
        return Err(bad_request("Stop name cannot be empty"));
    }

    let result: Result<Option<Stop>, sqlx::Error> = sqlx::query_as(
        r#"
        UPDATE stops
        SET stop_name = ?
        WHERE stop_id = ?
        RETURNING stop_id, stop_name
        "#,
    )
    .bind(&stop_name)
    .bind(stop_id)
    .fetch_optional(&pool)
    .await;

    match result {
        Ok(Some(stop)) => Ok(Json(stop)),
        Ok(None) => Err(not_found("Stop not found")),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(conflict("A stop with this name already exists"))
        }
        Err(e) => Err(internal_error(e)),
    }
}

/// Delete a stop
#[utoipa::path(
    delete,
    path = "/api/stops/{stop_id}",
    params(
        ("stop_id" = i64, Path, description = "Stop ID")
    ),
    responses(
        (status = 204, description = "Stop deleted"),
        (status = 404, description = "Stop not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "stops"
)]
pub async fn delete_stop(
    State(pool): State<SqlitePool>,
    Path(stop_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let result = sqlx::query("DELETE FROM stops WHERE stop_id = ?")
        .bind(stop_id)
        .execute(&pool)
        .await
        .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("Stop not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/", get(list_stops).post(create_stop))
        .route("/{stop_id}", axum::routing::put(update_stop).delete(delete_stop))
        .with_state(pool)
}
