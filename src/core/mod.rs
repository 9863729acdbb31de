// Core voting exports
pub mod access;
pub mod catalog;
pub mod errors;
pub mod reader;
pub mod resolver;
pub mod sessions;
pub mod swipes;
pub mod unanimity;

pub use access::{generate_access_code, generate_participant_id, normalize_access_code};
pub use catalog::TileSetCatalog;
pub use errors::VoteError;
pub use reader::MatchReader;
pub use resolver::{MatchResolver, ResolveError};
pub use sessions::{Resolution, SessionCompletion, SessionManager};
pub use swipes::SwipeRecorder;
pub use unanimity::{fold_latest_decisions, unanimous_tiles, UnanimousTile, MIN_PARTICIPANTS};
