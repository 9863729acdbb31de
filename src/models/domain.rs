use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category a tile set is filed under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileSetCategory {
    Movies,
    Activities,
    Restaurants,
    #[serde(rename = "Date Night")]
    DateNight,
    Travel,
    Books,
    Other,
}

impl TileSetCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileSetCategory::Movies => "Movies",
            TileSetCategory::Activities => "Activities",
            TileSetCategory::Restaurants => "Restaurants",
            TileSetCategory::DateNight => "Date Night",
            TileSetCategory::Travel => "Travel",
            TileSetCategory::Books => "Books",
            TileSetCategory::Other => "Other",
        }
    }
}

impl FromStr for TileSetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Movies" => Ok(TileSetCategory::Movies),
            "Activities" => Ok(TileSetCategory::Activities),
            "Restaurants" => Ok(TileSetCategory::Restaurants),
            "Date Night" => Ok(TileSetCategory::DateNight),
            "Travel" => Ok(TileSetCategory::Travel),
            "Books" => Ok(TileSetCategory::Books),
            "Other" => Ok(TileSetCategory::Other),
            other => Err(format!("unknown tile set category: {}", other)),
        }
    }
}

/// Descriptive tag attached to a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileTag {
    Indoor,
    Outdoor,
    Free,
    Paid,
    Quick,
    #[serde(rename = "All Day")]
    AllDay,
    Popular,
    New,
}

impl TileTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileTag::Indoor => "Indoor",
            TileTag::Outdoor => "Outdoor",
            TileTag::Free => "Free",
            TileTag::Paid => "Paid",
            TileTag::Quick => "Quick",
            TileTag::AllDay => "All Day",
            TileTag::Popular => "Popular",
            TileTag::New => "New",
        }
    }
}

impl FromStr for TileTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Indoor" => Ok(TileTag::Indoor),
            "Outdoor" => Ok(TileTag::Outdoor),
            "Free" => Ok(TileTag::Free),
            "Paid" => Ok(TileTag::Paid),
            "Quick" => Ok(TileTag::Quick),
            "All Day" => Ok(TileTag::AllDay),
            "Popular" => Ok(TileTag::Popular),
            "New" => Ok(TileTag::New),
            other => Err(format!("unknown tile tag: {}", other)),
        }
    }
}

/// A participant's verdict on one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Yes,
    No,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Yes => "Yes",
            Decision::No => "No",
        }
    }

    pub fn is_yes(&self) -> bool {
        matches!(self, Decision::Yes)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(Decision::Yes),
            "No" => Ok(Decision::No),
            other => Err(format!("unknown decision: {}", other)),
        }
    }
}

/// Shareable collection of tiles reachable through an access code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSet {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub creator_id: String,
    pub access_code: String,
    pub category: TileSetCategory,
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub expires_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl TileSet {
    /// Whether new participants may still join at `now`
    ///
    /// The expiry instant itself still admits joins.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_date.map_or(true, |expires| now <= expires)
    }
}

/// One option within a tile set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: String,
    pub tile_set_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub external_link: Option<String>,
    #[serde(default)]
    pub tags: Vec<TileTag>,
    #[serde(default)]
    pub order: i32,
}

/// One participant's pass through a tile set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub tile_set_id: String,
    pub participant_id: String,
    #[serde(default)]
    pub participant_name: Option<String>,
    pub started_date: DateTime<Utc>,
    #[serde(default)]
    pub completed_date: Option<DateTime<Utc>>,
    pub is_complete: bool,
}

/// A recorded decision on one tile within one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeResult {
    pub id: String,
    pub session_id: String,
    pub tile_id: String,
    pub decision: Decision,
    pub timestamp: DateTime<Utc>,
}

/// A tile every completed session approved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub tile_set_id: String,
    pub tile_id: String,
    pub match_date: DateTime<Utc>,
    pub participant_count: u32,
    pub is_notified: bool,
}

/// Match paired with its tile for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetail {
    #[serde(rename = "match")]
    pub matched: Match,
    pub tile: Option<Tile>,
}

/// Fields for a tile set about to be inserted
#[derive(Debug, Clone)]
pub struct NewTileSet {
    pub title: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub access_code: String,
    pub category: TileSetCategory,
    pub created_date: DateTime<Utc>,
    pub expires_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewTile {
    pub tile_set_id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub external_link: Option<String>,
    pub tags: Vec<TileTag>,
    pub order: i32,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub tile_set_id: String,
    pub participant_id: String,
    pub participant_name: Option<String>,
    pub started_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSwipe {
    pub session_id: String,
    pub tile_id: String,
    pub decision: Decision,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMatch {
    pub tile_set_id: String,
    pub tile_id: String,
    pub match_date: DateTime<Utc>,
    pub participant_count: u32,
}

/// Result of an insert keyed on a natural uniqueness constraint
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T> {
    /// This call wrote the record
    Created(T),
    /// A record with the same key was already stored
    Existing(T),
}

impl<T> InsertOutcome<T> {
    pub fn is_created(&self) -> bool {
        matches!(self, InsertOutcome::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            InsertOutcome::Created(record) | InsertOutcome::Existing(record) => record,
        }
    }
}
