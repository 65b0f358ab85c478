pub mod buses;
pub mod error;
pub mod health;
pub mod places;
pub mod routes;
pub mod stops;

pub use error::{bad_request, conflict, internal_error, not_found, ErrorResponse};

use axum::Router;
use sqlx::SqlitePool;

pub fn router(pool: SqlitePool) -> Router {
    Router::new()
        .nest("/buses", buses::router(pool.clone()))
        .nest("/stops", stops::router(pool.clone()))
        .nest("/routes", routes::router(pool.clone()))
        .nest("/places", places::router(pool.clone()))
        .nest("/health", health::router(pool))
}
