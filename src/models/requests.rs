use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::{Decision, TileSetCategory, TileTag};

/// Request to create a tile set together with its tiles
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTileSetRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1))]
    #[serde(alias = "creator_id")]
    pub creator_id: String,
    pub category: TileSetCategory,
    #[serde(default)]
    pub expires_date: Option<chrono::DateTime<chrono::Utc>>,
    #[validate(nested)]
    #[serde(default)]
    pub tiles: Vec<CreateTileRequest>,
}

/// One tile inside a create request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTileRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(url)]
    #[serde(default)]
    pub image_url: Option<String>,
    #[validate(url)]
    #[serde(default)]
    pub external_link: Option<String>,
    #[serde(default)]
    pub tags: Vec<TileTag>,
    #[serde(default)]
    pub order: Option<i32>,
}

/// Request to start voting, either by access code or by tile set id
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenSessionRequest {
    #[serde(default, alias = "access_code")]
    pub access_code: Option<String>,
    #[serde(default, alias = "tile_set_id")]
    pub tile_set_id: Option<String>,
    #[validate(length(min = 1))]
    #[serde(default, alias = "participant_id")]
    pub participant_id: Option<String>,
    #[validate(length(max = 80))]
    #[serde(default, alias = "participant_name")]
    pub participant_name: Option<String>,
}

/// Request to record one swipe
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordSwipeRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "tile_id")]
    pub tile_id: String,
    pub decision: Decision,
}
