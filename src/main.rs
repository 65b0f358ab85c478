pub mod api;
mod config;
mod models;
mod sync;

use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[cfg(feature = "dev-tools")]
use axum_sql_viewer::SqlViewerLayer;
#[cfg(feature = "dev-tools")]
use tracing_web_console::TracingLayer;

use config::Config;

#[derive(OpenApi)]
#[openapi(
    info(title = "CityBus Advisor API", version = "0.1.0"),
    paths(
        api::buses::list::list_buses,
        api::buses::list::create_bus,
        api::buses::list::get_bus,
        api::buses::list::update_bus,
        api::buses::list::delete_bus,
        api::buses::list::list_bus_timings,
        api::buses::list::create_bus_timings,
        api::stops::list_stops,
        api::stops::create_stop,
        api::stops::update_stop,
        api::stops::delete_stop,
        api::routes::list::route_timings,
        api::places::list::list_places,
        api::places::list::get_place_departures,
        api::places::list::create_place_departure,
        api::places::list::sync_place_departures,
        api::health::health_check,
    ),
    components(schemas(
        api::ErrorResponse,
        api::buses::list::BusListResponse,
        api::buses::list::CreateBusRequest,
        api::buses::list::TimingListResponse,
        api::buses::list::CreateTimingsRequest,
        api::stops::StopListResponse,
        api::stops::CreateStopRequest,
        api::routes::list::RouteGroup,
        api::routes::list::RouteTimingsResponse,
        api::places::list::PlaceListResponse,
        api::places::list::PlaceBuses,
        api::places::list::PlaceDeparturesResponse,
        api::places::list::CreatePlaceDepartureRequest,
        api::places::list::SyncResponse,
        api::health::HealthResponse,
        models::Bus,
        models::BusTiming,
        models::Stop,
        models::PlaceDeparture,
    )),
    tags(
        (name = "buses", description = "Bus registry and trip timings"),
        (name = "stops", description = "Named bus stops"),
        (name = "routes", description = "Time-aware route lookup"),
        (name = "places", description = "Place-based departure listings and sync"),
        (name = "health", description = "Service health check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // Initialize SQLite database
    let db_file = std::path::Path::new(&config.database_path);
    if let Some(parent) = db_file.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Could not create database directory: {}", e);
            }
        }
    }
    tracing::info!(
        "Database path: {}, exists: {}",
        db_file.display(),
        db_file.exists()
    );
    let db_url = format!("sqlite:{}?mode=rwc", db_file.display());
    let pool = SqlitePool::connect(&db_url)
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(&pool).await.expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    // Build the app
    #[allow(unused_mut)] // mut needed when dev-tools feature is enabled
    let mut app = Router::new()
        .route("/", get(root))
        .nest("/api", api::router(pool.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Add dev tools only when feature is enabled
    #[cfg(feature = "dev-tools")]
    {
        let tracing_layer = TracingLayer::new("/tracing");
        app = app
            .merge(SqlViewerLayer::sqlite("/sql-viewer", pool.clone()).into_router())
            .merge(tracing_layer.into_router());
        tracing::warn!("Dev tools enabled: SQL Viewer and Tracing Console are accessible");
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listen address");

    tracing::info!("Server running on http://{}", config.bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "CityBus Advisor API"
}
