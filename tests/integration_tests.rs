// Integration tests for the voting lifecycle

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tile_match::core::{
    MatchReader, MatchResolver, Resolution, SessionManager, SwipeRecorder, TileSetCatalog, VoteError,
};
use tile_match::models::{
    CreateTileRequest, CreateTileSetRequest, Decision, InsertOutcome, Match, NewMatch, NewSession,
    NewSwipe, NewTile, NewTileSet, Session, SwipeResult, Tile, TileSet, TileSetCategory,
};
use tile_match::services::{DecisionStore, InMemoryStore, StoreError};

struct Harness {
    store: Arc<InMemoryStore>,
    catalog: TileSetCatalog,
    sessions: SessionManager,
    swipes: SwipeRecorder,
    reader: MatchReader,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let shared: Arc<dyn DecisionStore> = Arc::new(store.clone());
        Self::over(store, shared)
    }

    /// Components wired to `shared`, which must front `store`'s tables
    fn over(store: InMemoryStore, shared: Arc<dyn DecisionStore>) -> Self {
        let store = Arc::new(store);
        Self {
            catalog: TileSetCatalog::new(shared.clone()),
            sessions: SessionManager::new(shared.clone(), MatchResolver::new(shared.clone())),
            swipes: SwipeRecorder::new(shared.clone()),
            reader: MatchReader::new(shared),
            store,
        }
    }

    async fn tile_set(&self, titles: &[&str]) -> (TileSet, Vec<Tile>) {
        let request = CreateTileSetRequest {
            title: "Weekend".to_string(),
            description: None,
            creator_id: "creator".to_string(),
            category: TileSetCategory::Activities,
            expires_date: None,
            tiles: titles
                .iter()
                .map(|title| CreateTileRequest {
                    title: title.to_string(),
                    description: None,
                    image_url: None,
                    external_link: None,
                    tags: vec![],
                    order: None,
                })
                .collect(),
        };
        self.catalog.create_tile_set(request).await.unwrap()
    }

    /// Join, vote on every tile given and complete
    async fn vote(&self, tile_set: &TileSet, votes: &[(&Tile, Decision)]) -> Resolution {
        let (_, session) = self
            .sessions
            .join_by_access_code(&tile_set.access_code, None, None)
            .await
            .unwrap();
        for (tile, decision) in votes {
            self.swipes.record_swipe(&session.id, &tile.id, *decision).await.unwrap();
        }
        self.sessions.complete_session(&session.id).await.unwrap().resolution
    }
}

#[tokio::test]
async fn test_scenario_only_agreed_tile_matches() {
    let h = Harness::new();
    let (ts, tiles) = h.tile_set(&["Hike", "Movie"]).await;
    let (hike, movie) = (&tiles[0], &tiles[1]);

    let first = h.vote(&ts, &[(hike, Decision::Yes), (movie, Decision::No)]).await;
    assert!(first.new_matches().is_empty());

    let second = h.vote(&ts, &[(hike, Decision::Yes), (movie, Decision::Yes)]).await;
    assert_eq!(second.new_matches().len(), 1);
    assert_eq!(second.new_matches()[0].tile_id, hike.id);
    assert_eq!(second.new_matches()[0].participant_count, 2);

    let matches = h.reader.list_matches(&ts.id).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].tile_id, hike.id);
}

#[tokio::test]
async fn test_scenario_existing_match_survives_later_veto() {
    let h = Harness::new();
    let (ts, tiles) = h.tile_set(&["Hike", "Movie"]).await;
    let (hike, movie) = (&tiles[0], &tiles[1]);

    h.vote(&ts, &[(hike, Decision::Yes), (movie, Decision::No)]).await;
    h.vote(&ts, &[(hike, Decision::Yes), (movie, Decision::Yes)]).await;
    let third = h.vote(&ts, &[(hike, Decision::No), (movie, Decision::Yes)]).await;

    assert!(third.new_matches().is_empty());
    let matches = h.reader.list_matches(&ts.id).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].tile_id, hike.id);
    assert_eq!(matches[0].participant_count, 2);
}

#[tokio::test]
async fn test_scenario_single_session_lists_nothing() {
    let h = Harness::new();
    let (ts, tiles) = h.tile_set(&["Hike"]).await;

    h.vote(&ts, &[(&tiles[0], Decision::Yes)]).await;

    assert!(h.reader.list_matches(&ts.id).await.unwrap().is_empty());
    assert!(h.reader.list_match_details(&ts.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resolution_is_idempotent_and_monotonic() {
    let h = Harness::new();
    let (ts, tiles) = h.tile_set(&["A", "B"]).await;
    let resolver = MatchResolver::new(h.store.clone());

    h.vote(&ts, &[(&tiles[0], Decision::Yes), (&tiles[1], Decision::Yes)]).await;
    h.vote(&ts, &[(&tiles[0], Decision::Yes), (&tiles[1], Decision::Yes)]).await;
    let before = h.reader.list_matches(&ts.id).await.unwrap();
    assert_eq!(before.len(), 2);

    assert!(resolver.resolve(&ts.id).await.unwrap().is_empty());
    h.vote(&ts, &[(&tiles[0], Decision::No), (&tiles[1], Decision::No)]).await;

    let after = h.reader.list_matches(&ts.id).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_abstaining_session_blocks_match() {
    let h = Harness::new();
    let (ts, tiles) = h.tile_set(&["A", "B"]).await;

    h.vote(&ts, &[(&tiles[0], Decision::Yes), (&tiles[1], Decision::Yes)]).await;
    let second = h.vote(&ts, &[(&tiles[0], Decision::Yes)]).await;

    let matched: Vec<&str> = second.new_matches().iter().map(|m| m.tile_id.as_str()).collect();
    assert_eq!(matched, vec![tiles[0].id.as_str()]);
}

#[tokio::test]
async fn test_open_session_does_not_count_until_complete() {
    let h = Harness::new();
    let (ts, tiles) = h.tile_set(&["A"]).await;

    h.vote(&ts, &[(&tiles[0], Decision::Yes)]).await;
    let (_, pending) = h.sessions.join_by_access_code(&ts.access_code, Some("late"), None).await.unwrap();
    h.swipes.record_swipe(&pending.id, &tiles[0].id, Decision::No).await.unwrap();
    let second = h.vote(&ts, &[(&tiles[0], Decision::Yes)]).await;

    assert_eq!(second.new_matches().len(), 1);
    assert_eq!(second.new_matches()[0].participant_count, 2);

    let retry = h
        .swipes
        .record_swipe(&pending.id, &tiles[0].id, Decision::No)
        .await
        .unwrap();
    assert_eq!(retry.decision, Decision::No);

    // Completed sessions take no further swipes
    h.sessions.complete_session(&pending.id).await.unwrap();
    let closed = h.swipes.record_swipe(&pending.id, &tiles[0].id, Decision::Yes).await.unwrap_err();
    assert!(matches!(closed, VoteError::SessionClosed(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_resolvers_create_one_match() {
    let h = Harness::new();
    let (ts, tiles) = h.tile_set(&["Hike"]).await;

    for _ in 0..3 {
        let (_, session) = h.sessions.join_by_access_code(&ts.access_code, None, None).await.unwrap();
        h.swipes.record_swipe(&session.id, &tiles[0].id, Decision::Yes).await.unwrap();
        h.store.mark_session_complete(&session.id, Utc::now()).await.unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let resolver = MatchResolver::new(h.store.clone());
        let tile_set_id = ts.id.clone();
        handles.push(tokio::spawn(async move { resolver.resolve(&tile_set_id).await }));
    }

    let mut created = 0;
    for handle in handles {
        created += handle.await.unwrap().unwrap().len();
    }

    assert_eq!(created, 1);
    assert_eq!(h.store.find_matches(&ts.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_legacy_duplicate_swipes_fold_latest_wins() {
    let h = Harness::new();
    let (ts, tiles) = h.tile_set(&["A"]).await;
    let t0 = Utc::now() - Duration::minutes(10);

    let mut session_ids = Vec::new();
    for _ in 0..2 {
        let (_, session) = h.sessions.join_by_access_code(&ts.access_code, None, None).await.unwrap();
        session_ids.push(session.id);
    }

    let legacy = |session_id: &str, decision: Decision, at: DateTime<Utc>| NewSwipe {
        session_id: session_id.to_string(),
        tile_id: tiles[0].id.clone(),
        decision,
        timestamp: at,
    };
    h.store.insert_swipe_unchecked(legacy(&session_ids[0], Decision::Yes, t0)).unwrap();
    h.store
        .insert_swipe_unchecked(legacy(&session_ids[0], Decision::No, t0 + Duration::minutes(1)))
        .unwrap();
    h.store.insert_swipe_unchecked(legacy(&session_ids[1], Decision::Yes, t0)).unwrap();

    h.sessions.complete_session(&session_ids[0]).await.unwrap();
    let done = h.sessions.complete_session(&session_ids[1]).await.unwrap();

    assert!(done.resolution.new_matches().is_empty());
    assert!(h.reader.list_matches(&ts.id).await.unwrap().is_empty());
}

/// In-memory store with injectable failures
struct FailingStore {
    inner: InMemoryStore,
    fail_swipe_listing: bool,
    /// 1-based number of the match insert that fails
    fail_match_insert: Option<usize>,
    match_inserts: AtomicUsize,
}

impl FailingStore {
    fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            fail_swipe_listing: false,
            fail_match_insert: None,
            match_inserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DecisionStore for FailingStore {
    async fn find_tile_set(&self, id: &str) -> Result<Option<TileSet>, StoreError> {
        self.inner.find_tile_set(id).await
    }

    async fn find_tile_set_by_code(&self, access_code: &str) -> Result<Option<TileSet>, StoreError> {
        self.inner.find_tile_set_by_code(access_code).await
    }

    async fn insert_tile_set(&self, tile_set: NewTileSet) -> Result<TileSet, StoreError> {
        self.inner.insert_tile_set(tile_set).await
    }

    async fn find_tile(&self, id: &str) -> Result<Option<Tile>, StoreError> {
        self.inner.find_tile(id).await
    }

    async fn find_tiles(&self, tile_set_id: &str) -> Result<Vec<Tile>, StoreError> {
        self.inner.find_tiles(tile_set_id).await
    }

    async fn insert_tile(&self, tile: NewTile) -> Result<Tile, StoreError> {
        self.inner.insert_tile(tile).await
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        self.inner.insert_session(session).await
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.inner.find_session(id).await
    }

    async fn find_sessions(&self, tile_set_id: &str) -> Result<Vec<Session>, StoreError> {
        self.inner.find_sessions(tile_set_id).await
    }

    async fn mark_session_complete(
        &self,
        id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        self.inner.mark_session_complete(id, completed_at).await
    }

    async fn insert_swipe_if_absent(
        &self,
        swipe: NewSwipe,
    ) -> Result<InsertOutcome<SwipeResult>, StoreError> {
        self.inner.insert_swipe_if_absent(swipe).await
    }

    async fn find_swipes_for_tile_set(&self, tile_set_id: &str) -> Result<Vec<SwipeResult>, StoreError> {
        if self.fail_swipe_listing {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.find_swipes_for_tile_set(tile_set_id).await
    }

    async fn insert_match_if_absent(
        &self,
        new_match: NewMatch,
    ) -> Result<InsertOutcome<Match>, StoreError> {
        let attempt = self.match_inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_match_insert == Some(attempt) {
            return Err(StoreError::Backend("insert refused".to_string()));
        }
        self.inner.insert_match_if_absent(new_match).await
    }

    async fn find_matches(&self, tile_set_id: &str) -> Result<Vec<Match>, StoreError> {
        self.inner.find_matches(tile_set_id).await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.inner.health_check().await
    }
}

#[tokio::test]
async fn test_resolver_failure_still_completes_session() {
    let inner = InMemoryStore::new();
    let ts = inner
        .insert_tile_set(NewTileSet {
            title: "Trips".to_string(),
            description: None,
            creator_id: "creator".to_string(),
            access_code: "TRIPS001".to_string(),
            category: TileSetCategory::Travel,
            created_date: Utc::now(),
            expires_date: None,
            is_active: true,
        })
        .await
        .unwrap();

    let store: Arc<dyn DecisionStore> = Arc::new(FailingStore {
        fail_swipe_listing: true,
        ..FailingStore::new(inner.clone())
    });
    let sessions = SessionManager::new(store.clone(), MatchResolver::new(store));

    let mut last = None;
    for participant in ["p1", "p2"] {
        let session = sessions.open_session(&ts.id, participant, None).await.unwrap();
        last = Some(sessions.complete_session(&session.id).await.unwrap());
    }

    let completion = last.unwrap();
    assert!(completion.session.is_complete);
    assert!(matches!(
        completion.resolution,
        Resolution::Failed { ref created, ref reason } if created.is_empty() && reason.contains("connection reset")
    ));

    let stored = inner.find_session(&completion.session.id).await.unwrap().unwrap();
    assert!(stored.is_complete);
}

#[tokio::test]
async fn test_failed_match_insert_keeps_earlier_matches_reported() {
    let inner = InMemoryStore::new();
    let shared: Arc<dyn DecisionStore> = Arc::new(FailingStore {
        fail_match_insert: Some(2),
        ..FailingStore::new(inner.clone())
    });
    let h = Harness::over(inner, shared.clone());
    let (ts, tiles) = h.tile_set(&["A", "B"]).await;

    h.vote(&ts, &[(&tiles[0], Decision::Yes), (&tiles[1], Decision::Yes)]).await;
    let partial = h.vote(&ts, &[(&tiles[0], Decision::Yes), (&tiles[1], Decision::Yes)]).await;

    let reported = match partial {
        Resolution::Failed { created, reason } => {
            assert!(reason.contains("insert refused"));
            created
        }
        other => panic!("expected a failed resolution, got {:?}", other),
    };
    assert_eq!(reported.len(), 1);
    assert_eq!(h.reader.list_matches(&ts.id).await.unwrap(), reported);

    let rerun = MatchResolver::new(shared).resolve(&ts.id).await.unwrap();
    assert_eq!(rerun.len(), 1);

    let mut tile_ids: Vec<String> = reported
        .iter()
        .chain(rerun.iter())
        .map(|m| m.tile_id.clone())
        .collect();
    tile_ids.sort();
    let mut expected = vec![tiles[0].id.clone(), tiles[1].id.clone()];
    expected.sort();
    assert_eq!(tile_ids, expected);
}

#[test]
fn test_join_closed_tile_set_blocking() {
    let h = Harness::new();
    tokio_test::block_on(async {
        let ts = h
            .store
            .insert_tile_set(NewTileSet {
                title: "Old".to_string(),
                description: None,
                creator_id: "creator".to_string(),
                access_code: "OLDCODE1".to_string(),
                category: TileSetCategory::Other,
                created_date: Utc::now() - Duration::days(3),
                expires_date: Some(Utc::now() - Duration::days(1)),
                is_active: true,
            })
            .await
            .unwrap();

        let err = h.sessions.join_by_access_code("oldcode1", None, None).await.unwrap_err();
        assert!(matches!(err, VoteError::TileSetClosed(ref id) if *id == ts.id));
    });
}
