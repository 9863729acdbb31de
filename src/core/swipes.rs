use chrono::Utc;
use std::sync::Arc;
use crate::core::errors::VoteError;
use crate::models::{Decision, InsertOutcome, NewSwipe, SwipeResult};
use crate::services::DecisionStore;

/// Records one decision per (session, tile)
#[derive(Clone)]
pub struct SwipeRecorder {
    store: Arc<dyn DecisionStore>,
}

impl SwipeRecorder {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self { store }
    }

    /// Record a decision on a tile
    ///
    /// Re-submitting the decision already stored for the pair returns the
    /// stored record, so a participant can safely retry. A different
    /// decision for a recorded pair is rejected and the first one stays.
    pub async fn record_swipe(
        &self,
        session_id: &str,
        tile_id: &str,
        decision: Decision,
    ) -> Result<SwipeResult, VoteError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or_else(|| VoteError::NotFound(format!("session {}", session_id)))?;

        if session.is_complete {
            return Err(VoteError::SessionClosed(session.id));
        }

        let tile = self
            .store
            .find_tile(tile_id)
            .await?
            .ok_or_else(|| VoteError::NotFound(format!("tile {}", tile_id)))?;

        if tile.tile_set_id != session.tile_set_id {
            return Err(VoteError::TileNotInSet {
                tile_id: tile.id,
                tile_set_id: session.tile_set_id,
            });
        }

        let outcome = self
            .store
            .insert_swipe_if_absent(NewSwipe {
                session_id: session.id.clone(),
                tile_id: tile.id.clone(),
                decision,
                timestamp: Utc::now(),
            })
            .await?;

        match outcome {
            InsertOutcome::Created(swipe) => {
                tracing::debug!(
                    "Recorded {} on tile {} for session {}",
                    swipe.decision,
                    swipe.tile_id,
                    swipe.session_id
                );
                Ok(swipe)
            }
            InsertOutcome::Existing(swipe) if swipe.decision == decision => {
                tracing::debug!(
                    "Duplicate swipe on tile {} for session {} ignored",
                    swipe.tile_id,
                    swipe.session_id
                );
                Ok(swipe)
            }
            InsertOutcome::Existing(swipe) => Err(VoteError::DecisionAlreadyRecorded {
                session_id: swipe.session_id,
                tile_id: swipe.tile_id,
                recorded: swipe.decision,
            }),
        }
    }
}
