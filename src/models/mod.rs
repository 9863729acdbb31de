// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Decision, InsertOutcome, Match, MatchDetail, NewMatch, NewSession, NewSwipe, NewTile,
    NewTileSet, Session, SwipeResult, Tile, TileSet, TileSetCategory, TileTag,
};
pub use requests::{CreateTileRequest, CreateTileSetRequest, OpenSessionRequest, RecordSwipeRequest};
pub use responses::{
    CompleteSessionResponse, ErrorResponse, HealthResponse, MatchListResponse,
    OpenSessionResponse, TileSetResponse,
};
