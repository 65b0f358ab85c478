pub mod list;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/", get(list::list_places))
        .route("/departures", post(list::create_place_departure))
        .route("/sync", post(list::sync_place_departures))
        .route("/{place}/departures", get(list::get_place_departures))
        .with_state(pool)
}
