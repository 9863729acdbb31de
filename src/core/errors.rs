use thiserror::Error;
use crate::models::Decision;
use crate::services::StoreError;

/// Errors surfaced by voting operations
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session {0} is already complete")]
    SessionClosed(String),

    #[error("Tile set {0} is not accepting participants")]
    TileSetClosed(String),

    #[error("Tile {tile_id} does not belong to tile set {tile_set_id}")]
    TileNotInSet { tile_id: String, tile_set_id: String },

    #[error("Session {session_id} already recorded {recorded} for tile {tile_id}")]
    DecisionAlreadyRecorded {
        session_id: String,
        tile_id: String,
        recorded: Decision,
    },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for VoteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => VoteError::NotFound(what),
            other => VoteError::Store(other),
        }
    }
}
