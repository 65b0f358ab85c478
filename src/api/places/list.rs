use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::api::{bad_request, internal_error, not_found, ErrorResponse};
use crate::models::{clean_bus_no, is_valid_trip_time, normalize_name, PlaceDeparture};
use crate::sync;

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceListResponse {
    pub places: Vec<String>,
}

#[derive(Debug, FromRow)]
pub struct PlaceDepartureRow {
    pub bus_no: String,
    pub bus_type: String,
    pub departure_time: String,
}

/// A bus departing from the requested place, with every listed time
#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceBuses {
    pub bus_type: String,
    pub timings: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlaceDeparturesResponse {
    pub place: String,
    pub buses: BTreeMap<String, PlaceBuses>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePlaceDepartureRequest {
    pub place_name: String,
    pub bus_no: String,
    pub bus_type: String,
    pub departure_time: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum SyncResponse {
    Synced { synced_count: u64 },
    Empty { message: String },
}

/// Group (bus_no, time)-sorted rows into the per-bus departure mapping.
pub fn group_departures(rows: Vec<PlaceDepartureRow>) -> BTreeMap<String, PlaceBuses> {
    let mut buses: BTreeMap<String, PlaceBuses> = BTreeMap::new();

    for PlaceDepartureRow {
        bus_no,
        bus_type,
        departure_time,
    } in rows
    {
        buses
            .entry(bus_no)
            .or_insert_with(|| PlaceBuses {
                bus_type,
                timings: Vec::new(),
            })
            .timings
            .push(departure_time);
    }

    buses
}

/// List every place that has departures
#[utoipa::path(
    get,
    path = "/api/places",
    responses(
        (status = 200, description = "Distinct place names, sorted", body = PlaceListResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "places"
)]
pub async fn list_places(
    State(pool): State<SqlitePool>,
) -> Result<Json<PlaceListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let places: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT place_name
        FROM place_departures
        ORDER BY place_name
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(PlaceListResponse { places }))
}

/// Get every bus departing from a place
///
/// The place is matched case-insensitively against the stored (lowercased)
/// names. Unlike the route lookup there is no upcoming filter; all listed
/// times are returned, sorted per bus.
#[utoipa::path(
    get,
    path = "/api/places/{place}/departures",
    params(
        ("place" = String, Path, description = "Place name (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Departures grouped by bus number", body = PlaceDeparturesResponse),
        (status = 404, description = "No departures for this place", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "places"
)]
pub async fn get_place_departures(
    State(pool): State<SqlitePool>,
    Path(place): Path<String>,
) -> Result<Json<PlaceDeparturesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let rows: Vec<PlaceDepartureRow> = sqlx::query_as(
        r#"
        SELECT bus_no, bus_type, departure_time
        FROM place_departures
        WHERE place_name = ?
        ORDER BY bus_no, departure_time
        "#,
    )
    .bind(normalize_name(&place))
    .fetch_all(&pool)
    .await
    .map_err(internal_error)?;

    if rows.is_empty() {
        return Err(not_found("No departures found for this place"));
    }

    Ok(Json(PlaceDeparturesResponse {
        place,
        buses: group_departures(rows),
    }))
}

/// Add a departure listing for a place directly
///
/// Writes to the denormalized table only; the bus registry is untouched and
/// a later sync will overwrite rows added this way.
#[utoipa::path(
    post,
    path = "/api/places/departures",
    request_body = CreatePlaceDepartureRequest,
    responses(
        (status = 201, description = "Departure created", body = PlaceDeparture),
        (status = 400, description = "Invalid place name or departure time", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "places"
)]
pub async fn create_place_departure(
    State(pool): State<SqlitePool>,
    Json(request): Json<CreatePlaceDepartureRequest>,
) -> Result<(StatusCode, Json<PlaceDeparture>), (StatusCode, Json<ErrorResponse>)> {
    let place_name = normalize_name(&request.place_name);
    if place_name.is_empty() {
        return Err(bad_request("Place name cannot be empty"));
    }
    if !is_valid_trip_time(&request.departure_time) {
        return Err(bad_request(
            "Departure time must be a zero-padded 24-hour HH:MM string",
        ));
    }

    let departure: PlaceDeparture = sqlx::query_as(
        r#"
        INSERT INTO place_departures (place_name, bus_no, bus_type, departure_time)
        VALUES (?, ?, ?, ?)
        RETURNING departure_id, place_name, bus_no, bus_type, departure_time
        "#,
    )
    .bind(&place_name)
    .bind(clean_bus_no(&request.bus_no))
    .bind(normalize_name(&request.bus_type))
    .bind(&request.departure_time)
    .fetch_one(&pool)
    .await
    .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(departure)))
}

/// Rebuild place departures from the bus registry
///
/// Replaces every row with the buses/bus_timings join. Note that an empty
/// registry still wipes the table and answers "No data to sync".
#[utoipa::path(
    post,
    path = "/api/places/sync",
    responses(
        (status = 200, description = "Number of rows synced, or a no-data message", body = SyncResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "places"
)]
pub async fn sync_place_departures(
    State(pool): State<SqlitePool>,
) -> Result<Json<SyncResponse>, (StatusCode, Json<ErrorResponse>)> {
    let synced_count = sync::rebuild_place_departures(&pool)
        .await
        .map_err(internal_error)?;

    if synced_count == 0 {
        return Ok(Json(SyncResponse::Empty {
            message: "No data to sync".to_string(),
        }));
    }

    Ok(Json(SyncResponse::Synced { synced_count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    fn row(bus_no: &str, bus_type: &str, departure_time: &str) -> PlaceDepartureRow {
        PlaceDepartureRow {
            bus_no: bus_no.to_string(),
            bus_type: bus_type.to_string(),
            departure_time: departure_time.to_string(),
        }
    }

    #[test]
    fn grouping_collects_timings_per_bus() {
        let rows = vec![
            row("12A", "ac", "08:00"),
            row("12A", "ac", "09:30"),
            row("7", "mini", "10:00"),
        ];

        let buses = group_departures(rows);

        assert_eq!(buses.len(), 2);
        assert_eq!(buses["12A"].bus_type, "ac");
        assert_eq!(buses["12A"].timings, vec!["08:00", "09:30"]);
        assert_eq!(buses["7"].timings, vec!["10:00"]);
    }

    #[test]
    fn grouping_keeps_row_order_within_a_bus() {
        let rows = vec![row("3", "ac", "06:15"), row("3", "ac", "07:45")];
        let buses = group_departures(rows);
        assert_eq!(buses["3"].timings, vec!["06:15", "07:45"]);
    }

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn insert_departure(
        pool: &SqlitePool,
        place: &str,
        bus_no: &str,
        bus_type: &str,
        time: &str,
    ) {
        sqlx::query(
            "INSERT INTO place_departures (place_name, bus_no, bus_type, departure_time) VALUES (?, ?, ?, ?)",
        )
        .bind(place)
        .bind(bus_no)
        .bind(bus_type)
        .bind(time)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn place_lookup_groups_all_departures() {
        let pool = test_pool().await;
        insert_departure(&pool, "central", "12A", "ac", "08:00").await;
        insert_departure(&pool, "central", "12A", "ac", "09:30").await;

        let rows: Vec<PlaceDepartureRow> = sqlx::query_as(
            "SELECT bus_no, bus_type, departure_time FROM place_departures WHERE place_name = ? ORDER BY bus_no, departure_time",
        )
        .bind(normalize_name("Central"))
        .fetch_all(&pool)
        .await
        .unwrap();

        let buses = group_departures(rows);
        assert_eq!(buses.len(), 1);
        assert_eq!(buses["12A"].bus_type, "ac");
        assert_eq!(buses["12A"].timings, vec!["08:00", "09:30"]);
    }

    #[tokio::test]
    async fn distinct_places_come_back_sorted() {
        let pool = test_pool().await;
        insert_departure(&pool, "harbor", "7", "mini", "10:00").await;
        insert_departure(&pool, "central", "12A", "ac", "08:00").await;
        insert_departure(&pool, "central", "7", "mini", "11:00").await;

        let places: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT place_name FROM place_departures ORDER BY place_name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(places, vec!["central", "harbor"]);
    }

    #[tokio::test]
    async fn unknown_place_is_not_found_rather_than_empty() {
        let pool = test_pool().await;
        insert_departure(&pool, "central", "12A", "ac", "08:00").await;

        let result =
            get_place_departures(State(pool), Path("atlantis".to_string())).await;

        let err = result.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn place_lookup_echoes_the_requested_casing() {
        let pool = test_pool().await;
        insert_departure(&pool, "central", "12A", "ac", "08:00").await;
        insert_departure(&pool, "central", "12A", "ac", "09:30").await;

        let response = get_place_departures(State(pool), Path("Central".to_string()))
            .await
            .unwrap();

        assert_eq!(response.place, "Central");
        assert_eq!(response.buses["12A"].bus_type, "ac");
        assert_eq!(response.buses["12A"].timings, vec!["08:00", "09:30"]);
    }

    #[tokio::test]
    async fn create_normalizes_before_insert() {
        let pool = test_pool().await;

        let (status, departure) = create_place_departure(
            State(pool),
            Json(CreatePlaceDepartureRequest {
                place_name: "  Central  ".to_string(),
                bus_no: " 12A ".to_string(),
                bus_type: "AC".to_string(),
                departure_time: "08:00".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(departure.place_name, "central");
        assert_eq!(departure.bus_no, "12A");
        assert_eq!(departure.bus_type, "ac");
    }

    #[tokio::test]
    async fn create_rejects_malformed_departure_time() {
        let pool = test_pool().await;

        let result = create_place_departure(
            State(pool),
            Json(CreatePlaceDepartureRequest {
                place_name: "central".to_string(),
                bus_no: "12A".to_string(),
                bus_type: "ac".to_string(),
                departure_time: "8:00".to_string(),
            }),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sync_endpoint_reports_no_data_on_empty_registry() {
        let pool = test_pool().await;

        let response = sync_place_departures(State(pool)).await.unwrap();

        match response.0 {
            SyncResponse::Empty { message } => assert_eq!(message, "No data to sync"),
            SyncResponse::Synced { .. } => panic!("expected the no-data message"),
        }
    }

    #[test]
    fn sync_response_serializes_both_shapes() {
        let synced = serde_json::to_value(SyncResponse::Synced { synced_count: 4 }).unwrap();
        assert_eq!(synced, serde_json::json!({ "synced_count": 4 }));

        let empty = serde_json::to_value(SyncResponse::Empty {
            message: "No data to sync".to_string(),
        })
        .unwrap();
        assert_eq!(empty, serde_json::json!({ "message": "No data to sync" }));
    }
}
