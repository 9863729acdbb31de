use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use crate::models::{
    InsertOutcome, Match, NewMatch, NewSession, NewSwipe, NewTile, NewTileSet, Session,
    SwipeResult, Tile, TileSet,
};
use crate::services::store::{sort_matches, sort_tiles, DecisionStore, StoreError};

#[derive(Default)]
struct Tables {
    tile_sets: HashMap<String, TileSet>,
    tiles: HashMap<String, Tile>,
    sessions: HashMap<String, Session>,
    swipes: HashMap<String, SwipeResult>,
    matches: HashMap<String, Match>,
}

/// Process-local decision store
///
/// All tables sit behind one lock, so every insert-if-absent is atomic.
/// Used for tests and for running the service without external storage.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Backend("Mutex poisoned".to_string()))
    }

    /// Store a swipe without the (session, tile) uniqueness check
    ///
    /// Mirrors data written by clients that predate the uniqueness
    /// constraint, so readers can be exercised against duplicates.
    pub fn insert_swipe_unchecked(&self, swipe: NewSwipe) -> Result<SwipeResult, StoreError> {
        let record = SwipeResult {
            id: new_id(),
            session_id: swipe.session_id,
            tile_id: swipe.tile_id,
            decision: swipe.decision,
            timestamp: swipe.timestamp,
        };
        self.lock()?.swipes.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl DecisionStore for InMemoryStore {
    async fn find_tile_set(&self, id: &str) -> Result<Option<TileSet>, StoreError> {
        Ok(self.lock()?.tile_sets.get(id).cloned())
    }

    async fn find_tile_set_by_code(&self, access_code: &str) -> Result<Option<TileSet>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .tile_sets
            .values()
            .find(|ts| ts.access_code == access_code)
            .cloned())
    }

    async fn insert_tile_set(&self, tile_set: NewTileSet) -> Result<TileSet, StoreError> {
        let mut tables = self.lock()?;
        if tables
            .tile_sets
            .values()
            .any(|ts| ts.access_code == tile_set.access_code)
        {
            return Err(StoreError::InvalidRecord(format!(
                "access code {} already in use",
                tile_set.access_code
            )));
        }

        let record = TileSet {
            id: new_id(),
            title: tile_set.title,
            description: tile_set.description,
            creator_id: tile_set.creator_id,
            access_code: tile_set.access_code,
            category: tile_set.category,
            created_date: tile_set.created_date,
            expires_date: tile_set.expires_date,
            is_active: tile_set.is_active,
        };
        tables.tile_sets.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_tile(&self, id: &str) -> Result<Option<Tile>, StoreError> {
        Ok(self.lock()?.tiles.get(id).cloned())
    }

    async fn find_tiles(&self, tile_set_id: &str) -> Result<Vec<Tile>, StoreError> {
        let mut tiles: Vec<Tile> = self
            .lock()?
            .tiles
            .values()
            .filter(|t| t.tile_set_id == tile_set_id)
            .cloned()
            .collect();
        sort_tiles(&mut tiles);
        Ok(tiles)
    }

    async fn insert_tile(&self, tile: NewTile) -> Result<Tile, StoreError> {
        let mut tables = self.lock()?;
        if !tables.tile_sets.contains_key(&tile.tile_set_id) {
            return Err(StoreError::NotFound(format!("tile set {}", tile.tile_set_id)));
        }

        let record = Tile {
            id: new_id(),
            tile_set_id: tile.tile_set_id,
            title: tile.title,
            description: tile.description,
            image_url: tile.image_url,
            external_link: tile.external_link,
            tags: tile.tags,
            order: tile.order,
        };
        tables.tiles.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let record = Session {
            id: new_id(),
            tile_set_id: session.tile_set_id,
            participant_id: session.participant_id,
            participant_name: session.participant_name,
            started_date: session.started_date,
            completed_date: None,
            is_complete: false,
        };
        self.lock()?.sessions.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.lock()?.sessions.get(id).cloned())
    }

    async fn find_sessions(&self, tile_set_id: &str) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self
            .lock()?
            .sessions
            .values()
            .filter(|s| s.tile_set_id == tile_set_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            a.started_date
                .cmp(&b.started_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(sessions)
    }

    async fn mark_session_complete(
        &self,
        id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let mut tables = self.lock()?;
        let session = tables
            .sessions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("session {}", id)))?;
        session.completed_date = Some(completed_at);
        session.is_complete = true;
        Ok(session.clone())
    }

    async fn insert_swipe_if_absent(
        &self,
        swipe: NewSwipe,
    ) -> Result<InsertOutcome<SwipeResult>, StoreError> {
        let mut tables = self.lock()?;
        // Legacy duplicates resolve to the latest record, as the resolver folds them
        if let Some(existing) = tables
            .swipes
            .values()
            .filter(|s| s.session_id == swipe.session_id && s.tile_id == swipe.tile_id)
            .max_by(|a, b| (a.timestamp, a.id.as_str()).cmp(&(b.timestamp, b.id.as_str())))
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        let record = SwipeResult {
            id: new_id(),
            session_id: swipe.session_id,
            tile_id: swipe.tile_id,
            decision: swipe.decision,
            timestamp: swipe.timestamp,
        };
        tables.swipes.insert(record.id.clone(), record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn find_swipes_for_tile_set(&self, tile_set_id: &str) -> Result<Vec<SwipeResult>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .swipes
            .values()
            .filter(|swipe| {
                tables
                    .sessions
                    .get(&swipe.session_id)
                    .map_or(false, |s| s.tile_set_id == tile_set_id)
            })
            .cloned()
            .collect())
    }

    async fn insert_match_if_absent(
        &self,
        new_match: NewMatch,
    ) -> Result<InsertOutcome<Match>, StoreError> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables
            .matches
            .values()
            .find(|m| m.tile_set_id == new_match.tile_set_id && m.tile_id == new_match.tile_id)
        {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        let record = Match {
            id: new_id(),
            tile_set_id: new_match.tile_set_id,
            tile_id: new_match.tile_id,
            match_date: new_match.match_date,
            participant_count: new_match.participant_count,
            is_notified: false,
        };
        tables.matches.insert(record.id.clone(), record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn find_matches(&self, tile_set_id: &str) -> Result<Vec<Match>, StoreError> {
        let mut matches: Vec<Match> = self
            .lock()?
            .matches
            .values()
            .filter(|m| m.tile_set_id == tile_set_id)
            .cloned()
            .collect();
        sort_matches(&mut matches);
        Ok(matches)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.lock().map(|_| true)
    }
}
