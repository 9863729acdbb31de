use chrono::Utc;
use std::sync::Arc;
use crate::core::access::{generate_participant_id, normalize_access_code};
use crate::core::errors::VoteError;
use crate::core::resolver::MatchResolver;
use crate::models::{Match, NewSession, Session, TileSet};
use crate::services::DecisionStore;

/// What happened to match resolution after a session completed
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Matches created by this completion (possibly none)
    Resolved(Vec<Match>),
    /// Resolution failed part way; the session is still complete and a
    /// later completion will recompute from the stored swipes
    Failed { created: Vec<Match>, reason: String },
}

impl Resolution {
    /// Matches created by this completion, including those created before
    /// a failure
    pub fn new_matches(&self) -> &[Match] {
        match self {
            Resolution::Resolved(matches) => matches,
            Resolution::Failed { created, .. } => created,
        }
    }
}

/// Result of completing a session
#[derive(Debug, Clone)]
pub struct SessionCompletion {
    pub session: Session,
    pub resolution: Resolution,
}

/// Opens and completes voting sessions
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn DecisionStore>,
    resolver: MatchResolver,
}

impl SessionManager {
    pub fn new(store: Arc<dyn DecisionStore>, resolver: MatchResolver) -> Self {
        Self { store, resolver }
    }

    /// Start a new session for a participant
    ///
    /// Every call creates a fresh session, even for a participant id that
    /// already has one in this tile set.
    pub async fn open_session(
        &self,
        tile_set_id: &str,
        participant_id: &str,
        participant_name: Option<&str>,
    ) -> Result<Session, VoteError> {
        let participant_id = participant_id.trim();
        if participant_id.is_empty() {
            return Err(VoteError::InvalidInput("participant id must not be blank".to_string()));
        }

        if self.store.find_tile_set(tile_set_id).await?.is_none() {
            return Err(VoteError::NotFound(format!("tile set {}", tile_set_id)));
        }

        let participant_name = participant_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let session = self
            .store
            .insert_session(NewSession {
                tile_set_id: tile_set_id.to_string(),
                participant_id: participant_id.to_string(),
                participant_name,
                started_date: Utc::now(),
            })
            .await?;

        tracing::info!(
            "Opened session {} for participant {} in tile set {}",
            session.id,
            session.participant_id,
            tile_set_id
        );

        Ok(session)
    }

    /// Join a tile set by its shareable access code
    ///
    /// Inactive or expired tile sets are rejected. A participant id is
    /// generated when the caller has none.
    pub async fn join_by_access_code(
        &self,
        access_code: &str,
        participant_id: Option<&str>,
        participant_name: Option<&str>,
    ) -> Result<(TileSet, Session), VoteError> {
        let code = normalize_access_code(access_code);
        let tile_set = self
            .store
            .find_tile_set_by_code(&code)
            .await?
            .ok_or_else(|| VoteError::NotFound(format!("tile set with access code {}", code)))?;

        if !tile_set.is_open_at(Utc::now()) {
            tracing::info!("Rejected join for closed tile set {}", tile_set.id);
            return Err(VoteError::TileSetClosed(tile_set.id));
        }

        let participant_id = match participant_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => generate_participant_id(),
        };

        let session = self
            .open_session(&tile_set.id, &participant_id, participant_name)
            .await?;

        Ok((tile_set, session))
    }

    /// Mark a session complete and resolve matches for its tile set
    ///
    /// Completing twice overwrites the completion time. A resolver failure
    /// is reported in the returned [`Resolution`], never as an error.
    pub async fn complete_session(&self, session_id: &str) -> Result<SessionCompletion, VoteError> {
        let session = self
            .store
            .mark_session_complete(session_id, Utc::now())
            .await?;

        tracing::info!(
            "Session {} completed in tile set {}",
            session.id,
            session.tile_set_id
        );

        let resolution = match self.resolver.resolve(&session.tile_set_id).await {
            Ok(matches) => Resolution::Resolved(matches),
            Err(e) => {
                tracing::warn!(
                    "Match resolution failed for tile set {} after session {}: {}",
                    session.tile_set_id,
                    session.id,
                    e
                );
                Resolution::Failed {
                    reason: e.source.to_string(),
                    created: e.created,
                }
            }
        };

        Ok(SessionCompletion { session, resolution })
    }
}
