pub mod list;

use axum::{routing::get, Router};
use sqlx::SqlitePool;

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/", get(list::list_buses).post(list::create_bus))
        .route(
            "/{bus_id}",
            get(list::get_bus)
                .put(list::update_bus)
                .delete(list::delete_bus),
        )
        .route(
            "/{bus_id}/timings",
            get(list::list_bus_timings).post(list::create_bus_timings),
        )
        .with_state(pool)
}
