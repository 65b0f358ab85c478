//! Rebuilds the denormalized `place_departures` table from the bus registry.

use sqlx::{FromRow, SqlitePool};
use tracing::info;

use crate::models::{clean_bus_no, normalize_name};

#[derive(Debug, FromRow)]
struct SourceRow {
    start_bus: String,
    bus_no: String,
    bus_type: String,
    trip_time: String,
}

/// Replace every `place_departures` row with the current contents of the
/// `buses`/`bus_timings` join, using each bus's start stop as the place name.
///
/// The wipe and reinsert share one transaction, so concurrent readers never
/// observe a half-rebuilt table. A bus with no timings contributes no rows.
/// When the join is empty the wipe still commits: syncing an empty registry
/// empties the table and reports zero. Departures inserted directly since
/// the last sync are discarded.
pub async fn rebuild_place_departures(pool: &SqlitePool) -> Result<u64, SyncError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| SyncError::DatabaseError(e.to_string()))?;

    let rows: Vec<SourceRow> = sqlx::query_as(
        r#"
        SELECT b.start_bus, b.bus_no, b.bus_type, t.trip_time
        FROM buses b
        INNER JOIN bus_timings t ON t.bus_id = b.bus_id
        ORDER BY b.bus_no, t.trip_time
        "#,
    )
    .fetch_all(&mut *tx)
    .await
    .map_err(|e| SyncError::DatabaseError(e.to_string()))?;

    sqlx::query("DELETE FROM place_departures")
        .execute(&mut *tx)
        .await
        .map_err(|e| SyncError::DatabaseError(e.to_string()))?;

    for row in &rows {
        sqlx::query(
            r#"
            INSERT INTO place_departures (place_name, bus_no, bus_type, departure_time)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(normalize_name(&row.start_bus))
        .bind(clean_bus_no(&row.bus_no))
        .bind(normalize_name(&row.bus_type))
        .bind(&row.trip_time)
        .execute(&mut *tx)
        .await
        .map_err(|e| SyncError::DatabaseError(e.to_string()))?;
    }

    tx.commit()
        .await
        .map_err(|e| SyncError::DatabaseError(e.to_string()))?;

    let inserted = rows.len() as u64;
    info!(rows = inserted, "Rebuilt place_departures from bus registry");
    Ok(inserted)
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}
