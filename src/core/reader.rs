use std::collections::HashMap;
use std::sync::Arc;
use crate::core::errors::VoteError;
use crate::models::{Match, MatchDetail};
use crate::services::DecisionStore;

/// Read-only view over a tile set's matches
#[derive(Clone)]
pub struct MatchReader {
    store: Arc<dyn DecisionStore>,
}

impl MatchReader {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self { store }
    }

    /// All matches of a tile set, oldest first
    pub async fn list_matches(&self, tile_set_id: &str) -> Result<Vec<Match>, VoteError> {
        let mut matches = self.store.find_matches(tile_set_id).await?;
        // Backends already order by date; re-sort so ties are stable across them
        matches.sort_by(|a, b| a.match_date.cmp(&b.match_date).then_with(|| a.id.cmp(&b.id)));
        Ok(matches)
    }

    /// Matches paired with their tiles, oldest first
    pub async fn list_match_details(&self, tile_set_id: &str) -> Result<Vec<MatchDetail>, VoteError> {
        let matches = self.list_matches(tile_set_id).await?;
        if matches.is_empty() {
            return Ok(Vec::new());
        }

        let mut tiles: HashMap<String, _> = self
            .store
            .find_tiles(tile_set_id)
            .await?
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();

        Ok(matches
            .into_iter()
            .map(|m| MatchDetail {
                tile: tiles.remove(&m.tile_id),
                matched: m,
            })
            .collect())
    }
}
