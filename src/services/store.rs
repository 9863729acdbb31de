use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use crate::models::{
    InsertOutcome, Match, NewMatch, NewSession, NewSwipe, NewTile, NewTileSet, Session,
    SwipeResult, Tile, TileSet,
};

/// Errors reported by a decision store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Typed access to the records the voting engine reads and writes
///
/// Backends must make `insert_swipe_if_absent` atomic per (session, tile) and
/// `insert_match_if_absent` atomic per (tile set, tile): concurrent callers
/// racing on the same key observe exactly one `Created`.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn find_tile_set(&self, id: &str) -> Result<Option<TileSet>, StoreError>;

    async fn find_tile_set_by_code(&self, access_code: &str) -> Result<Option<TileSet>, StoreError>;

    async fn insert_tile_set(&self, tile_set: NewTileSet) -> Result<TileSet, StoreError>;

    async fn find_tile(&self, id: &str) -> Result<Option<Tile>, StoreError>;

    /// Tiles of a tile set ordered by display order, then id
    async fn find_tiles(&self, tile_set_id: &str) -> Result<Vec<Tile>, StoreError>;

    async fn insert_tile(&self, tile: NewTile) -> Result<Tile, StoreError>;

    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError>;

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Sessions of a tile set ordered by start date
    async fn find_sessions(&self, tile_set_id: &str) -> Result<Vec<Session>, StoreError>;

    /// Stamp a session complete; `StoreError::NotFound` if it does not exist
    async fn mark_session_complete(
        &self,
        id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<Session, StoreError>;

    async fn insert_swipe_if_absent(
        &self,
        swipe: NewSwipe,
    ) -> Result<InsertOutcome<SwipeResult>, StoreError>;

    /// Every swipe recorded by any session of the tile set
    async fn find_swipes_for_tile_set(&self, tile_set_id: &str) -> Result<Vec<SwipeResult>, StoreError>;

    async fn insert_match_if_absent(
        &self,
        new_match: NewMatch,
    ) -> Result<InsertOutcome<Match>, StoreError>;

    /// Matches of a tile set ordered by match date, then id
    async fn find_matches(&self, tile_set_id: &str) -> Result<Vec<Match>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}

/// Deterministic document id for a (session, tile) swipe
pub fn swipe_key(session_id: &str, tile_id: &str) -> String {
    natural_key("swipe", session_id, tile_id)
}

/// Deterministic document id for a (tile set, tile) match
pub fn match_key(tile_set_id: &str, tile_id: &str) -> String {
    natural_key("match", tile_set_id, tile_id)
}

fn natural_key(kind: &str, left: &str, right: &str) -> String {
    let name = format!("{}:{}:{}", kind, left, right);
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes())
        .simple()
        .to_string()
}

/// Order tiles the way every backend reports them
pub(crate) fn sort_tiles(tiles: &mut [Tile]) {
    tiles.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
}

/// Order matches oldest first
pub(crate) fn sort_matches(matches: &mut [Match]) {
    matches.sort_by(|a, b| a.match_date.cmp(&b.match_date).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_keys_are_stable_and_distinct() {
        assert_eq!(match_key("ts1", "t1"), match_key("ts1", "t1"));
        assert_ne!(match_key("ts1", "t1"), match_key("ts1", "t2"));
        assert_ne!(match_key("ts1", "t1"), swipe_key("ts1", "t1"));
        // Appwrite document ids are capped at 36 characters
        assert_eq!(match_key("ts1", "t1").len(), 32);
    }
}
