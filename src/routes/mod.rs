// Route exports
pub mod matches;
pub mod sessions;
pub mod tile_sets;

use actix_web::{http::StatusCode, web, HttpResponse};
use std::sync::Arc;
use validator::ValidationErrors;
use crate::core::{MatchReader, SessionManager, SwipeRecorder, TileSetCatalog, VoteError};
use crate::models::ErrorResponse;
use crate::services::{CacheManager, DecisionStore, StoreError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DecisionStore>,
    pub cache: Arc<CacheManager>,
    pub catalog: TileSetCatalog,
    pub sessions: SessionManager,
    pub swipes: SwipeRecorder,
    pub reader: MatchReader,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(tile_sets::configure)
            .configure(sessions::configure),
    );
}

fn error_body(status: StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

pub(crate) fn validation_failed(errors: ValidationErrors) -> HttpResponse {
    error_body(StatusCode::BAD_REQUEST, "Validation failed", errors.to_string())
}

/// Map a failed voting operation to its HTTP response
pub(crate) fn vote_error_response(err: &VoteError) -> HttpResponse {
    let (status, error) = match err {
        VoteError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "Invalid input"),
        VoteError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
        VoteError::SessionClosed(_) => (StatusCode::CONFLICT, "Session closed"),
        VoteError::TileSetClosed(_) => (StatusCode::CONFLICT, "Tile set closed"),
        VoteError::DecisionAlreadyRecorded { .. } => (StatusCode::CONFLICT, "Decision already recorded"),
        VoteError::TileNotInSet { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "Tile not in set"),
        VoteError::Store(StoreError::Backend(_)) => (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable"),
        VoteError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Store error"),
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::info!("Request rejected: {}", err);
    }

    error_body(status, error, err.to_string())
}
