use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::api::{bad_request, internal_error, not_found, ErrorResponse};
use crate::models::{is_valid_trip_time, Bus, BusTiming};

#[derive(Debug, Serialize, ToSchema)]
pub struct BusListResponse {
    pub buses: Vec<Bus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBusRequest {
    pub bus_no: String,
    pub bus_type: String,
    pub start_bus: String,
    pub end_bus: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimingListResponse {
    pub timings: Vec<BusTiming>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTimingsRequest {
    /// One or more "HH:MM" trip times to register for the bus
    pub trip_times: Vec<String>,
}

/// List all registered buses
#[utoipa::path(
    get,
    path = "/api/buses",
    responses(
        (status = 200, description = "List of all buses", body = BusListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn list_buses(
    State(pool): State<SqlitePool>,
) -> Result<Json<BusListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let buses: Vec<Bus> = sqlx::query_as(
        r#"
        SELECT bus_id, bus_no, bus_type, start_bus, end_bus
        FROM buses
        ORDER BY bus_no
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(BusListResponse { buses }))
}

/// Register a new bus
#[utoipa::path(
    post,
    path = "/api/buses",
    request_body = CreateBusRequest,
    responses(
        (status = 201, description = "Bus created", body = Bus),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn create_bus(
    State(pool): State<SqlitePool>,
    Json(request): Json<CreateBusRequest>,
) -> Result<(StatusCode, Json<Bus>), (StatusCode, Json<ErrorResponse>)> {
    let bus: Bus = sqlx::query_as(
        r#"
        INSERT INTO buses (bus_no, bus_type, start_bus, end_bus)
        VALUES (?, ?, ?, ?)
        RETURNING bus_id, bus_no, bus_type, start_bus, end_bus
        "#,
    )
    .bind(&request.bus_no)
    .bind(&request.bus_type)
    .bind(&request.start_bus)
    .bind(&request.end_bus)
    .fetch_one(&pool)
    .await
    .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(bus)))
}

/// Get a single bus by ID
#[utoipa::path(
    get,
    path = "/api/buses/{bus_id}",
    params(
        ("bus_id" = i64, Path, description = "Bus ID")
    ),
    responses(
        (status = 200, description = "Bus details", body = Bus),
        (status = 404, description = "Bus not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn get_bus(
    State(pool): State<SqlitePool>,
    Path(bus_id): Path<i64>,
) -> Result<Json<Bus>, (StatusCode, Json<ErrorResponse>)> {
    let bus: Option<Bus> = sqlx::query_as(
        r#"
        SELECT bus_id, bus_no, bus_type, start_bus, end_bus
        FROM buses
        WHERE bus_id = ?
        "#,
    )
    .bind(bus_id)
    .fetch_optional(&pool)
    .await
    .map_err(internal_error)?;

    match bus {
        Some(bus) => Ok(Json(bus)),
        None => Err(not_found("Bus not found")),
    }
}

/// Update a bus
#[utoipa::path(
    put,
    path = "/api/buses/{bus_id}",
    params(
        ("bus_id" = i64, Path, description = "Bus ID")
    ),
    request_body = CreateBusRequest,
    responses(
        (status = 200, description = "Updated bus", body = Bus),
        (status = 404, description = "Bus not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn update_bus(
    State(pool): State<SqlitePool>,
    Path(bus_id): Path<i64>,
    Json(request): Json<CreateBusRequest>,
) -> Result<Json<Bus>, (StatusCode, Json<ErrorResponse>)> {
    let bus: Option<Bus> = sqlx::query_as(
        r#"
        UPDATE buses
        SET bus_no = ?, bus_type = ?, start_bus = ?, end_bus = ?
        WHERE bus_id = ?
        RETURNING bus_id, bus_no, bus_type, start_bus, end_bus
        "#,
    )
    .bind(&request.bus_no)
    .bind(&request.bus_type)
    .bind(&request.start_bus)
    .bind(&request.end_bus)
    .bind(bus_id)
    .fetch_optional(&pool)
    .await
    .map_err(internal_error)?;

    match bus {
        Some(bus) => Ok(Json(bus)),
        None => Err(not_found("Bus not found")),
    }
}

/// Delete a bus and all of its timings
#[utoipa::path(
    delete,
    path = "/api/buses/{bus_id}",
    params(
        ("bus_id" = i64, Path, description = "Bus ID")
    ),
    responses(
        (status = 204, description = "Bus deleted"),
        (status = 404, description = "Bus not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn delete_bus(
    State(pool): State<SqlitePool>,
    Path(bus_id): Path<i64>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let mut tx = pool.begin().await.map_err(internal_error)?;

    sqlx::query("DELETE FROM bus_timings WHERE bus_id = ?")
        .bind(bus_id)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    let result = sqlx::query("DELETE FROM buses WHERE bus_id = ?")
        .bind(bus_id)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err(not_found("Bus not found"));
    }

    tx.commit().await.map_err(internal_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// List the trip times registered for a bus
#[utoipa::path(
    get,
    path = "/api/buses/{bus_id}/timings",
    params(
        ("bus_id" = i64, Path, description = "Bus ID")
    ),
    responses(
        (status = 200, description = "Trip times for the bus", body = TimingListResponse),
        (status = 404, description = "Bus not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn list_bus_timings(
    State(pool): State<SqlitePool>,
    Path(bus_id): Path<i64>,
) -> Result<Json<TimingListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let exists: Option<(i64,)> = sqlx::query_as("SELECT bus_id FROM buses WHERE bus_id = ?")
        .bind(bus_id)
        .fetch_optional(&pool)
        .await
        .map_err(internal_error)?;

    if exists.is_none() {
        return Err(not_found("Bus not found"));
    }

    let timings: Vec<BusTiming> = sqlx::query_as(
        r#"
        SELECT timing_id, bus_id, trip_time
        FROM bus_timings
        WHERE bus_id = ?
        ORDER BY trip_time
        "#,
    )
    .bind(bus_id)
    .fetch_all(&pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(TimingListResponse { timings }))
}

/// Register one or more trip times for a bus
#[utoipa::path(
    post,
    path = "/api/buses/{bus_id}/timings",
    params(
        ("bus_id" = i64, Path, description = "Bus ID")
    ),
    request_body = CreateTimingsRequest,
    responses(
        (status = 201, description = "Timings created", body = TimingListResponse),
        (status = 400, description = "Malformed trip time", body = ErrorResponse),
        (status = 404, description = "Bus not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "buses"
)]
pub async fn create_bus_timings(
    State(pool): State<SqlitePool>,
    Path(bus_id): Path<i64>,
    Json(request): Json<CreateTimingsRequest>,
) -> Result<(StatusCode, Json<TimingListResponse>), (StatusCode, Json<ErrorResponse>)> {
    if request.trip_times.is_empty() {
        return Err(bad_request("At least one trip time is required"));
    }
    for trip_time in &request.trip_times {
        if !is_valid_trip_time(trip_time) {
            return Err(bad_request(
                "Trip times must be zero-padded 24-hour HH:MM strings",
            ));
        }
    }

    let exists: Option<(i64,)> = sqlx::query_as("SELECT bus_id FROM buses WHERE bus_id = ?")
        .bind(bus_id)
        .fetch_optional(&pool)
        .await
        .map_err(internal_error)?;

    if exists.is_none() {
        return Err(not_found("Bus not found"));
    }

    let mut tx = pool.begin().await.map_err(internal_error)?;
    let mut timings = Vec::with_capacity(request.trip_times.len());

    for trip_time in &request.trip_times {
        let timing: BusTiming = sqlx::query_as(
            r#"
            INSERT INTO bus_timings (bus_id, trip_time)
            VALUES (?, ?)
            RETURNING timing_id, bus_id, trip_time
            "#,
        )
        .bind(bus_id)
        .bind(trip_time)
        .fetch_one(&mut *tx)
        .await
        .map_err(internal_error)?;

        timings.push(timing);
    }

    tx.commit().await.map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(TimingListResponse { timings })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn create(pool: &SqlitePool) -> Bus {
        let (_, bus) = create_bus(
            State(pool.clone()),
            Json(CreateBusRequest {
                bus_no: "12A".to_string(),
                bus_type: "AC".to_string(),
                start_bus: "Central".to_string(),
                end_bus: "Airport".to_string(),
            }),
        )
        .await
        .unwrap();
        bus.0
    }

    #[tokio::test]
    async fn create_assigns_an_id_and_get_round_trips() {
        let pool = test_pool().await;
        let bus = create(&pool).await;

        let fetched = get_bus(State(pool), Path(bus.bus_id)).await.unwrap();
        assert_eq!(fetched.bus_no, "12A");
        assert_eq!(fetched.start_bus, "Central");
    }

    #[tokio::test]
    async fn deleting_a_bus_removes_its_timings() {
        let pool = test_pool().await;
        let bus = create(&pool).await;

        create_bus_timings(
            State(pool.clone()),
            Path(bus.bus_id),
            Json(CreateTimingsRequest {
                trip_times: vec!["08:00".to_string(), "20:00".to_string()],
            }),
        )
        .await
        .unwrap();

        let status = delete_bus(State(pool.clone()), Path(bus.bus_id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bus_timings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn timings_for_an_unknown_bus_are_not_found() {
        let pool = test_pool().await;

        let result = create_bus_timings(
            State(pool),
            Path(999),
            Json(CreateTimingsRequest {
                trip_times: vec!["08:00".to_string()],
            }),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_trip_time_is_rejected_before_touching_the_bus() {
        let pool = test_pool().await;
        let bus = create(&pool).await;

        let result = create_bus_timings(
            State(pool),
            Path(bus.bus_id),
            Json(CreateTimingsRequest {
                trip_times: vec!["8:00".to_string()],
            }),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn updating_a_missing_bus_is_not_found() {
        let pool = test_pool().await;

        let result = update_bus(
            State(pool),
            Path(7),
            Json(CreateBusRequest {
                bus_no: "9".to_string(),
                bus_type: "Mini".to_string(),
                start_bus: "Harbor".to_string(),
                end_bus: "Museum".to_string(),
            }),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
