use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::models::{CreateTileSetRequest, TileSetResponse};
use crate::routes::{validation_failed, vote_error_response, AppState};

/// Configure tile set routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/tile-sets", web::post().to(create_tile_set))
        .route("/tile-sets/code/{code}", web::get().to(find_by_access_code))
        .route("/tile-sets/{id}/tiles", web::get().to(list_tiles));
}

/// Create a tile set
///
/// POST /api/v1/tile-sets
///
/// Request body:
/// ```json
/// {
///   "title": "string",
///   "creatorId": "string",
///   "category": "Movies",
///   "tiles": [{ "title": "string", "tags": ["Indoor"] }]
/// }
/// ```
async fn create_tile_set(
    state: web::Data<AppState>,
    req: web::Json<CreateTileSetRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for create_tile_set request: {:?}", errors);
        return validation_failed(errors);
    }

    match state.catalog.create_tile_set(req.into_inner()).await {
        Ok((tile_set, tiles)) => HttpResponse::Created().json(TileSetResponse { tile_set, tiles }),
        Err(e) => vote_error_response(&e),
    }
}

/// Look up a tile set and its tiles by access code
///
/// GET /api/v1/tile-sets/code/{code}
async fn find_by_access_code(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let tile_set = match state.catalog.find_by_access_code(&path).await {
        Ok(tile_set) => tile_set,
        Err(e) => return vote_error_response(&e),
    };

    match state.catalog.list_tiles(&tile_set.id).await {
        Ok(tiles) => HttpResponse::Ok().json(TileSetResponse { tile_set, tiles }),
        Err(e) => vote_error_response(&e),
    }
}

/// GET /api/v1/tile-sets/{id}/tiles
async fn list_tiles(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.catalog.list_tiles(&path).await {
        Ok(tiles) => HttpResponse::Ok().json(tiles),
        Err(e) => vote_error_response(&e),
    }
}
