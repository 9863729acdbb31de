use serde::{Deserialize, Serialize};
use crate::models::domain::{Match, MatchDetail, Session, Tile, TileSet};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Tile set with its tiles in display order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSetResponse {
    pub tile_set: TileSet,
    pub tiles: Vec<Tile>,
}

/// Response for opening a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionResponse {
    pub session: Session,
    pub tile_set: TileSet,
}

/// Response for completing a session
///
/// `newMatches` only lists matches created by this completion; clients use
/// it to decide whether to show a reveal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionResponse {
    pub session: Session,
    pub new_matches: Vec<Match>,
    pub resolution: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_error: Option<String>,
}

/// Response listing a tile set's matches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchListResponse {
    pub tile_set_id: String,
    pub matches: Vec<MatchDetail>,
    pub count: usize,
}
