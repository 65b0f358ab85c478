use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

use crate::api::{internal_error, not_found, ErrorResponse};
use crate::models::{normalize_name, now_hhmm};

#[derive(Debug, FromRow)]
pub struct RouteTimingRow {
    pub bus_no: String,
    pub bus_type: String,
    pub trip_time: String,
}

/// One bus serving the requested route, with its upcoming trip times
#[derive(Debug, Serialize, ToSchema)]
pub struct RouteGroup {
    pub bus_no: String,
    pub bus_type: String,
    pub timings: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteTimingsResponse {
    pub routes: Vec<RouteGroup>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct RouteTimingsQuery {
    /// Start stop name (matched case-insensitively)
    pub source: String,
    /// End stop name (matched case-insensitively)
    pub destination: String,
    /// Optional bus number filter (case-insensitive)
    pub bus_no: Option<String>,
    /// Optional bus type filter (case-insensitive)
    pub bus_type: Option<String>,
}

/// Fetch the joined, filtered, time-sorted trip rows for a route.
///
/// `after` is an "HH:MM" cutoff; only trips lexically greater qualify, which
/// matches time-of-day order within a single day but does not wrap past
/// midnight (a 00:10 trip is never upcoming relative to 23:50).
pub async fn fetch_route_rows(
    pool: &SqlitePool,
    source: &str,
    destination: &str,
    bus_no: Option<&str>,
    bus_type: Option<&str>,
    after: &str,
) -> Result<Vec<RouteTimingRow>, sqlx::Error> {
    let source = normalize_name(source);
    let destination = normalize_name(destination);

    match (bus_no, bus_type) {
        (Some(bus_no), Some(bus_type)) => {
            sqlx::query_as(
                r#"
                SELECT b.bus_no, b.bus_type, t.trip_time
                FROM buses b
                INNER JOIN bus_timings t ON t.bus_id = b.bus_id
                WHERE LOWER(TRIM(b.start_bus)) = ?
                  AND LOWER(TRIM(b.end_bus)) = ?
                  AND t.trip_time > ?
                  AND LOWER(TRIM(b.bus_no)) = ?
                  AND LOWER(TRIM(b.bus_type)) = ?
                ORDER BY t.trip_time
                "#,
            )
            .bind(&source)
            .bind(&destination)
            .bind(after)
            .bind(normalize_name(bus_no))
            .bind(normalize_name(bus_type))
            .fetch_all(pool)
            .await
        }
        (Some(bus_no), None) => {
            sqlx::query_as(
                r#"
                SELECT b.bus_no, b.bus_type, t.trip_time
                FROM buses b
                INNER JOIN bus_timings t ON t.bus_id = b.bus_id
                WHERE LOWER(TRIM(b.start_bus)) = ?
                  AND LOWER(TRIM(b.end_bus)) = ?
                  AND t.trip_time > ?
                  AND LOWER(TRIM(b.bus_no)) = ?
                ORDER BY t.trip_time
                "#,
            )
            .bind(&source)
            .bind(&destination)
            .bind(after)
            .bind(normalize_name(bus_no))
            .fetch_all(pool)
            .await
        }
        (None, Some(bus_type)) => {
            sqlx::query_as(
                r#"
                SELECT b.bus_no, b.bus_type, t.trip_time
                FROM buses b
                INNER JOIN bus_timings t ON t.bus_id = b.bus_id
                WHERE LOWER(TRIM(b.start_bus)) = ?
                  AND LOWER(TRIM(b.end_bus)) = ?
                  AND t.trip_time > ?
                  AND LOWER(TRIM(b.bus_type)) = ?
                ORDER BY t.trip_time
                "#,
            )
            .bind(&source)
            .bind(&destination)
            .bind(after)
            .bind(normalize_name(bus_type))
            .fetch_all(pool)
            .await
        }
        (None, None) => {
            sqlx::query_as(
                r#"
                SELECT b.bus_no, b.bus_type, t.trip_time
                FROM buses b
                INNER JOIN bus_timings t ON t.bus_id = b.bus_id
                WHERE LOWER(TRIM(b.start_bus)) = ?
                  AND LOWER(TRIM(b.end_bus)) = ?
                  AND t.trip_time > ?
                ORDER BY t.trip_time
                "#,
            )
            .bind(&source)
            .bind(&destination)
            .bind(after)
            .fetch_all(pool)
            .await
        }
    }
}

/// Group time-sorted rows by bus number.
///
/// Groups appear in the order their bus number is first seen in the sorted
/// row stream, and each group's timing list keeps that sorted order. Every
/// group holds at least one timing since a group is only opened by a row.
pub fn group_by_bus(rows: Vec<RouteTimingRow>) -> Vec<RouteGroup> {
    let mut groups: Vec<RouteGroup> = Vec::new();
    let mut index_by_bus: HashMap<String, usize> = HashMap::new();

    for row in rows {
        match index_by_bus.get(&row.bus_no) {
            Some(&i) => groups[i].timings.push(row.trip_time),
            None => {
                index_by_bus.insert(row.bus_no.clone(), groups.len());
                groups.push(RouteGroup {
                    bus_no: row.bus_no,
                    bus_type: row.bus_type,
                    timings: vec![row.trip_time],
                });
            }
        }
    }

    groups
}

/// Find upcoming buses between two stops
///
/// Returns trips departing after the current local time, grouped by bus
/// number. Trips earlier in the day are excluded; the schedule does not
/// wrap past midnight.
#[utoipa::path(
    get,
    path = "/api/routes/timings",
    params(RouteTimingsQuery),
    responses(
        (status = 200, description = "Upcoming trips grouped by bus number", body = RouteTimingsResponse),
        (status = 404, description = "No upcoming buses for this route", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn route_timings(
    State(pool): State<SqlitePool>,
    Query(query): Query<RouteTimingsQuery>,
) -> Result<Json<RouteTimingsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let rows = fetch_route_rows(
        &pool,
        &query.source,
        &query.destination,
        query.bus_no.as_deref(),
        query.bus_type.as_deref(),
        &now_hhmm(),
    )
    .await
    .map_err(internal_error)?;

    if rows.is_empty() {
        return Err(not_found("No upcoming buses found for this route"));
    }

    Ok(Json(RouteTimingsResponse {
        routes: group_by_bus(rows),
    }))
}
