use actix_web::{web, HttpResponse, Responder};
use crate::models::{HealthResponse, MatchDetail, MatchListResponse};
use crate::routes::{vote_error_response, AppState};
use crate::services::{CacheKey, CacheManager};

/// Configure health and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/tile-sets/{id}/matches", web::get().to(list_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = match state.store.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Store health check failed: {}", e);
            false
        }
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Cache key of the current match list generation, starting one if needed
async fn match_list_key(cache: &CacheManager, tile_set_id: &str) -> String {
    let generation_key = CacheKey::match_generation(tile_set_id);
    let generation = match cache.get::<String>(&generation_key).await {
        Ok(generation) => generation,
        Err(_) => {
            let generation = uuid::Uuid::new_v4().simple().to_string();
            if let Err(e) = cache.set(&generation_key, &generation).await {
                tracing::warn!("Failed to cache match list generation for {}: {}", tile_set_id, e);
            }
            generation
        }
    };
    CacheKey::matches(tile_set_id, &generation)
}

/// Drop the current match list generation of a tile set
///
/// Lists cached under an older generation, including ones written late by
/// reads that were already in flight, are never served again.
pub(crate) async fn invalidate_match_list(cache: &CacheManager, tile_set_id: &str) {
    if let Err(e) = cache.delete(&CacheKey::match_generation(tile_set_id)).await {
        tracing::warn!("Failed to invalidate cache: {}", e);
    }
}

/// List a tile set's matches with their tiles
///
/// GET /api/v1/tile-sets/{id}/matches
///
/// Served from cache when possible; every session completion in the tile
/// set invalidates it.
async fn list_matches(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let tile_set_id = path.into_inner();
    let cache_key = match_list_key(&state.cache, &tile_set_id).await;

    if let Ok(matches) = state.cache.get::<Vec<MatchDetail>>(&cache_key).await {
        tracing::debug!("Serving {} cached matches for {}", matches.len(), tile_set_id);
        return HttpResponse::Ok().json(MatchListResponse {
            count: matches.len(),
            tile_set_id,
            matches,
        });
    }

    let matches = match state.reader.list_match_details(&tile_set_id).await {
        Ok(matches) => matches,
        Err(e) => return vote_error_response(&e),
    };

    if let Err(e) = state.cache.set(&cache_key, &matches).await {
        tracing::warn!("Failed to cache matches for {}: {}", tile_set_id, e);
    }

    HttpResponse::Ok().json(MatchListResponse {
        count: matches.len(),
        tile_set_id,
        matches,
    })
}
