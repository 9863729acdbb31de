use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tile_match::config::{Settings, StoreBackend};
use tile_match::core::{MatchReader, MatchResolver, SessionManager, SwipeRecorder, TileSetCatalog};
use tile_match::routes::{self, AppState};
use tile_match::services::{
    AppwriteCollections, AppwriteStore, CacheManager, DecisionStore, InMemoryStore, PostgresStore,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path parameter errors
pub fn handle_path_error(err: error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

fn startup_error(message: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, message.to_string())
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

async fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn DecisionStore>> {
    match settings.store.backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database = settings
                .database
                .as_ref()
                .ok_or_else(|| startup_error("store.backend = postgres requires a [database] section"))?;

            let store = PostgresStore::from_settings(
                &database.url,
                database.max_connections,
                database.min_connections,
                database.acquire_timeout_secs,
                database.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                startup_error(e)
            })?;

            info!(
                "PostgreSQL store initialized (max: {} connections)",
                database.max_connections.unwrap_or(10)
            );
            Ok(Arc::new(store))
        }
        StoreBackend::Appwrite => {
            let appwrite = settings
                .appwrite
                .as_ref()
                .ok_or_else(|| startup_error("store.backend = appwrite requires an [appwrite] section"))?;
            let collection = settings
                .collection
                .as_ref()
                .ok_or_else(|| startup_error("store.backend = appwrite requires a [collection] section"))?;

            let store = AppwriteStore::new(
                appwrite.endpoint.clone(),
                appwrite.api_key.clone(),
                appwrite.project_id.clone(),
                appwrite.database_id.clone(),
                AppwriteCollections {
                    tile_sets: collection.tile_sets.clone(),
                    tiles: collection.tiles.clone(),
                    sessions: collection.sessions.clone(),
                    swipe_results: collection.swipe_results.clone(),
                    matches: collection.matches.clone(),
                },
            )
            .map_err(startup_error)?;

            info!("Appwrite store initialized");
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        startup_error(e)
    })?;

    init_tracing(&settings.logging.level, &settings.logging.format);

    info!("Starting Tile Match service...");

    let store = build_store(&settings).await?;

    // Redis is optional; without it the in-process tier still serves
    let cache = match CacheManager::new(
        settings.cache.redis_url.as_deref(),
        settings.cache.l1_cache_size,
        settings.cache.ttl_secs,
    )
    .await
    {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to connect to Redis ({}), using in-process cache only", e);
            CacheManager::local(settings.cache.l1_cache_size, settings.cache.ttl_secs)
        }
    };
    info!(
        "Cache manager initialized (L1: {} entries, TTL: {}s, shared: {})",
        settings.cache.l1_cache_size,
        settings.cache.ttl_secs,
        cache.has_shared_tier()
    );

    let resolver = MatchResolver::new(store.clone())
        .with_min_participants(settings.matching.min_participants);

    info!("Match resolver initialized (quorum: {})", resolver.min_participants());

    let app_state = AppState {
        cache: Arc::new(cache),
        catalog: TileSetCatalog::new(store.clone())
            .with_access_code_length(settings.matching.access_code_length),
        sessions: SessionManager::new(store.clone(), resolver),
        swipes: SwipeRecorder::new(store.clone()),
        reader: MatchReader::new(store.clone()),
        store,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
