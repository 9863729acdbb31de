use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use crate::core::errors::VoteError;
use crate::core::unanimity::{unanimous_tiles, MIN_PARTICIPANTS};
use crate::models::{InsertOutcome, Match, NewMatch};
use crate::services::{DecisionStore, StoreError};

/// A resolver run that failed, with whatever it created before failing
#[derive(Debug, Error)]
#[error("{source} ({} matches created)", .created.len())]
pub struct ResolveError {
    pub created: Vec<Match>,
    #[source]
    pub source: VoteError,
}

impl From<VoteError> for ResolveError {
    fn from(source: VoteError) -> Self {
        Self {
            created: Vec::new(),
            source,
        }
    }
}

impl From<StoreError> for ResolveError {
    fn from(err: StoreError) -> Self {
        VoteError::from(err).into()
    }
}

/// Turns unanimous agreement within a tile set into persisted matches
///
/// # Resolution steps
/// 1. Load the tile set's sessions and keep the completed ones
/// 2. Load every swipe recorded under the tile set
/// 3. Find tiles all completed sessions approved
/// 4. Create a match for each tile that does not have one yet
///
/// Creation goes through the store's insert-if-absent, so concurrent runs
/// for the same tile set collapse into one match per tile. Existing matches
/// are never revisited: a match granted to an earlier, smaller group stays.
///
/// A failed insert does not stop the run. The remaining tiles are still
/// attempted and the error carries every match that was created.
#[derive(Clone)]
pub struct MatchResolver {
    store: Arc<dyn DecisionStore>,
    min_participants: usize,
}

impl MatchResolver {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self {
            store,
            min_participants: MIN_PARTICIPANTS,
        }
    }

    /// Require more completed sessions than the minimum of two
    pub fn with_min_participants(mut self, min_participants: usize) -> Self {
        self.min_participants = min_participants.max(MIN_PARTICIPANTS);
        self
    }

    pub fn min_participants(&self) -> usize {
        self.min_participants
    }

    /// Recompute matches for a tile set
    ///
    /// Returns only the matches created by this call, ordered by tile id.
    pub async fn resolve(&self, tile_set_id: &str) -> Result<Vec<Match>, ResolveError> {
        let sessions = self.store.find_sessions(tile_set_id).await?;
        let completed = sessions.iter().filter(|s| s.is_complete).count();

        if completed < self.min_participants {
            tracing::debug!(
                "Tile set {} has {} completed sessions, below quorum of {}",
                tile_set_id,
                completed,
                self.min_participants
            );
            return Ok(Vec::new());
        }

        let swipes = self.store.find_swipes_for_tile_set(tile_set_id).await?;
        let unanimous = unanimous_tiles(&sessions, &swipes, self.min_participants);

        if unanimous.is_empty() {
            tracing::debug!(
                "No unanimous tiles in {} ({} completed sessions, {} swipes)",
                tile_set_id,
                completed,
                swipes.len()
            );
            return Ok(Vec::new());
        }

        let already_matched: HashSet<String> = self
            .store
            .find_matches(tile_set_id)
            .await?
            .into_iter()
            .map(|m| m.tile_id)
            .collect();

        let mut created = Vec::new();
        let mut first_error = None;
        for tile in unanimous {
            if already_matched.contains(&tile.tile_id) {
                continue;
            }

            match self.create_match(tile_set_id, &tile.tile_id, tile.participant_count).await {
                Ok(Some(m)) => created.push(m),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "Failed to create match for tile {} in tile set {}: {}",
                        tile.tile_id,
                        tile_set_id,
                        e
                    );
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            None => Ok(created),
            Some(source) => Err(ResolveError { created, source }),
        }
    }

    /// Insert one match; `None` when another run created it first
    async fn create_match(
        &self,
        tile_set_id: &str,
        tile_id: &str,
        participant_count: usize,
    ) -> Result<Option<Match>, VoteError> {
        let participant_count = u32::try_from(participant_count).map_err(|_| {
            VoteError::InvalidInput(format!("participant count {} out of range", participant_count))
        })?;

        let outcome = self
            .store
            .insert_match_if_absent(NewMatch {
                tile_set_id: tile_set_id.to_string(),
                tile_id: tile_id.to_string(),
                match_date: Utc::now(),
                participant_count,
            })
            .await?;

        match outcome {
            InsertOutcome::Created(m) => {
                tracing::info!(
                    "Match created for tile {} in tile set {} ({} participants)",
                    m.tile_id,
                    tile_set_id,
                    m.participant_count
                );
                Ok(Some(m))
            }
            InsertOutcome::Existing(m) => {
                // Another resolver run got there first
                tracing::debug!("Match {} for tile {} already exists", m.id, m.tile_id);
                Ok(None)
            }
        }
    }
}
