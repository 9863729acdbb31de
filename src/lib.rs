//! Tile Match - unanimous-agreement matching for group tile voting
//!
//! Participants join a tile set by access code, swipe Yes/No on each tile and
//! complete their session. Whenever a session completes, every tile that all
//! completed sessions approved becomes a match, created at most once per
//! tile no matter how many completions race.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{MatchReader, MatchResolver, SessionManager, SwipeRecorder, TileSetCatalog, VoteError};
pub use models::{Decision, Match, Session, SwipeResult, Tile, TileSet};
pub use services::{DecisionStore, InMemoryStore, StoreError};
