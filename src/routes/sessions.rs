use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::core::{generate_participant_id, Resolution, VoteError};
use crate::models::{
    CompleteSessionResponse, OpenSessionRequest, OpenSessionResponse, RecordSwipeRequest, Session, TileSet,
};
use crate::routes::matches::invalidate_match_list;
use crate::routes::{validation_failed, vote_error_response, AppState};

/// Configure session routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/sessions", web::post().to(open_session))
        .route("/sessions/{id}/swipes", web::post().to(record_swipe))
        .route("/sessions/{id}/complete", web::post().to(complete_session));
}

/// Open a voting session
///
/// POST /api/v1/sessions
///
/// Request body, either by access code or by tile set id:
/// ```json
/// { "accessCode": "AB12CD34", "participantId": "string", "participantName": "string" }
/// { "tileSetId": "string", "participantId": "string" }
/// ```
async fn open_session(state: web::Data<AppState>, req: web::Json<OpenSessionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let req = req.into_inner();
    let participant_name = req.participant_name.as_deref();

    let opened = match (req.access_code.as_deref(), req.tile_set_id.as_deref()) {
        (Some(code), _) => {
            state
                .sessions
                .join_by_access_code(code, req.participant_id.as_deref(), participant_name)
                .await
        }
        (None, Some(tile_set_id)) => {
            let participant_id = req.participant_id.clone().unwrap_or_else(generate_participant_id);
            open_by_tile_set_id(&state, tile_set_id, &participant_id, participant_name).await
        }
        (None, None) => Err(VoteError::InvalidInput(
            "either accessCode or tileSetId is required".to_string(),
        )),
    };

    match opened {
        Ok((tile_set, session)) => HttpResponse::Created().json(OpenSessionResponse { session, tile_set }),
        Err(e) => vote_error_response(&e),
    }
}

async fn open_by_tile_set_id(
    state: &AppState,
    tile_set_id: &str,
    participant_id: &str,
    participant_name: Option<&str>,
) -> Result<(TileSet, Session), VoteError> {
    let session = state
        .sessions
        .open_session(tile_set_id, participant_id, participant_name)
        .await?;
    let tile_set = state
        .store
        .find_tile_set(tile_set_id)
        .await?
        .ok_or_else(|| VoteError::NotFound(format!("tile set {}", tile_set_id)))?;
    Ok((tile_set, session))
}

/// Record one swipe
///
/// POST /api/v1/sessions/{id}/swipes
///
/// Request body:
/// ```json
/// { "tileId": "string", "decision": "Yes|No" }
/// ```
async fn record_swipe(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: web::Json<RecordSwipeRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    match state.swipes.record_swipe(&path, &req.tile_id, req.decision).await {
        Ok(swipe) => HttpResponse::Ok().json(swipe),
        Err(e) => vote_error_response(&e),
    }
}

/// Complete a session and resolve matches
///
/// POST /api/v1/sessions/{id}/complete
///
/// Resolution failures do not fail the request; they are reported in the
/// `resolution` and `resolutionError` fields.
async fn complete_session(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let completion = match state.sessions.complete_session(&path).await {
        Ok(completion) => completion,
        Err(e) => return vote_error_response(&e),
    };

    // A failed run may still have persisted matches
    invalidate_match_list(&state.cache, &completion.session.tile_set_id).await;

    let (resolution, new_matches, resolution_error) = match completion.resolution {
        Resolution::Resolved(created) => ("resolved".to_string(), created, None),
        Resolution::Failed { created, reason } => ("failed".to_string(), created, Some(reason)),
    };

    HttpResponse::Ok().json(CompleteSessionResponse {
        session: completion.session,
        new_matches,
        resolution,
        resolution_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Decision, MatchListResponse, NewMatch, SwipeResult, TileSetResponse};
    use crate::routes::tests_support::test_state;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::json;

    #[actix_web::test]
    async fn test_full_voting_round() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/tile-sets")
            .set_json(json!({
                "title": "Weekend",
                "creatorId": "creator",
                "category": "Activities",
                "tiles": [{ "title": "Hike" }, { "title": "Movie" }]
            }))
            .to_request();
        let created: TileSetResponse = test::call_and_read_body_json(&app, req).await;
        let hike = created.tiles[0].id.clone();
        let movie = created.tiles[1].id.clone();

        for movie_vote in ["No", "Yes"] {
            let req = test::TestRequest::post()
                .uri("/api/v1/sessions")
                .set_json(json!({ "accessCode": created.tile_set.access_code }))
                .to_request();
            let opened: OpenSessionResponse = test::call_and_read_body_json(&app, req).await;
            let session_id = opened.session.id;

            for (tile, decision) in [(&hike, "Yes"), (&movie, movie_vote)] {
                let req = test::TestRequest::post()
                    .uri(&format!("/api/v1/sessions/{}/swipes", session_id))
                    .set_json(json!({ "tileId": tile, "decision": decision }))
                    .to_request();
                let swipe: SwipeResult = test::call_and_read_body_json(&app, req).await;
                assert_eq!(&swipe.tile_id, tile);
            }

            let req = test::TestRequest::post()
                .uri(&format!("/api/v1/sessions/{}/complete", session_id))
                .to_request();
            let done: CompleteSessionResponse = test::call_and_read_body_json(&app, req).await;
            assert!(done.session.is_complete);
            assert_eq!(done.resolution, "resolved");
        }

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/tile-sets/{}/matches", created.tile_set.id))
            .to_request();
        let listed: MatchListResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed.count, 1);
        assert_eq!(listed.matches[0].matched.tile_id, hike);
        assert_eq!(listed.matches[0].matched.participant_count, 2);
    }

    #[actix_web::test]
    async fn test_completion_without_new_matches_refreshes_match_list() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let (tile_set, tiles) = state
            .catalog
            .create_tile_set(serde_json::from_value(json!({
                "title": "Dinner",
                "creatorId": "creator",
                "category": "Restaurants",
                "tiles": [{ "title": "Tacos" }]
            })).unwrap())
            .await
            .unwrap();
        let matches_uri = format!("/api/v1/tile-sets/{}/matches", tile_set.id);

        let req = test::TestRequest::get().uri(&matches_uri).to_request();
        let cached: MatchListResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cached.count, 0);

        // Persisted by an earlier run that failed before reporting it
        state
            .store
            .insert_match_if_absent(NewMatch {
                tile_set_id: tile_set.id.clone(),
                tile_id: tiles[0].id.clone(),
                match_date: chrono::Utc::now(),
                participant_count: 2,
            })
            .await
            .unwrap();

        let session = state.sessions.open_session(&tile_set.id, "p1", None).await.unwrap();
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/complete", session.id))
            .to_request();
        let done: CompleteSessionResponse = test::call_and_read_body_json(&app, req).await;
        assert!(done.new_matches.is_empty());

        let req = test::TestRequest::get().uri(&matches_uri).to_request();
        let refreshed: MatchListResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(refreshed.count, 1);
    }

    #[actix_web::test]
    async fn test_swipe_conflicts() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let (tile_set, tiles) = state
            .catalog
            .create_tile_set(serde_json::from_value(json!({
                "title": "Dinner",
                "creatorId": "creator",
                "category": "Restaurants",
                "tiles": [{ "title": "Tacos" }]
            })).unwrap())
            .await
            .unwrap();
        let session = state.sessions.open_session(&tile_set.id, "p1", None).await.unwrap();
        state.swipes.record_swipe(&session.id, &tiles[0].id, Decision::Yes).await.unwrap();

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/swipes", session.id))
            .set_json(json!({ "tileId": tiles[0].id, "decision": "No" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/sessions/{}/swipes", session.id))
            .set_json(json!({ "tileId": "other", "decision": "Yes" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_open_requires_code_or_tile_set() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/sessions")
            .set_json(json!({ "participantId": "p1" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
