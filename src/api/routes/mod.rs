pub mod list;

use axum::Router;
use sqlx::SqlitePool;

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .route("/timings", axum::routing::get(list::route_timings))
        .with_state(pool)
}
