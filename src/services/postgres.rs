use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;
use crate::models::{
    Decision, InsertOutcome, Match, NewMatch, NewSession, NewSwipe, NewTile, NewTileSet, Session,
    SwipeResult, Tile, TileSet, TileTag,
};
use crate::services::store::{DecisionStore, StoreError};

/// Errors that can occur while connecting to PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("row not found".to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::InvalidRecord(err.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

const TILE_SET_COLUMNS: &str =
    "id, title, description, creator_id, access_code, category, created_date, expires_date, is_active";
const TILE_COLUMNS: &str =
    "id, tile_set_id, title, description, image_url, external_link, tags, display_order";
const SESSION_COLUMNS: &str =
    "id, tile_set_id, participant_id, participant_name, started_date, completed_date, is_complete";
const SWIPE_COLUMNS: &str = "id, session_id, tile_id, decision, timestamp";
const MATCH_COLUMNS: &str =
    "id, tile_set_id, tile_id, match_date, participant_count, is_notified";

/// PostgreSQL-backed decision store
///
/// Uniqueness of swipes per (session, tile) and matches per (tile set, tile)
/// is enforced by table constraints; inserts use `ON CONFLICT DO NOTHING`
/// and fall back to reading the row that won.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn parse_tile_set(row: &PgRow) -> Result<TileSet, StoreError> {
    let category: String = row.try_get("category")?;
    Ok(TileSet {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        creator_id: row.try_get("creator_id")?,
        access_code: row.try_get("access_code")?,
        category: category.parse().map_err(StoreError::InvalidRecord)?,
        created_date: row.try_get("created_date")?,
        expires_date: row.try_get("expires_date")?,
        is_active: row.try_get("is_active")?,
    })
}

fn parse_tile(row: &PgRow) -> Result<Tile, StoreError> {
    let tags: Vec<String> = row.try_get("tags")?;
    let tags = tags
        .iter()
        .map(|t| t.parse::<TileTag>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(StoreError::InvalidRecord)?;

    Ok(Tile {
        id: row.try_get("id")?,
        tile_set_id: row.try_get("tile_set_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        image_url: row.try_get("image_url")?,
        external_link: row.try_get("external_link")?,
        tags,
        order: row.try_get("display_order")?,
    })
}

fn parse_session(row: &PgRow) -> Result<Session, StoreError> {
    Ok(Session {
        id: row.try_get("id")?,
        tile_set_id: row.try_get("tile_set_id")?,
        participant_id: row.try_get("participant_id")?,
        participant_name: row.try_get("participant_name")?,
        started_date: row.try_get("started_date")?,
        completed_date: row.try_get("completed_date")?,
        is_complete: row.try_get("is_complete")?,
    })
}

fn parse_swipe(row: &PgRow) -> Result<SwipeResult, StoreError> {
    let decision: String = row.try_get("decision")?;
    Ok(SwipeResult {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        tile_id: row.try_get("tile_id")?,
        decision: decision.parse::<Decision>().map_err(StoreError::InvalidRecord)?,
        timestamp: row.try_get("timestamp")?,
    })
}

fn parse_match(row: &PgRow) -> Result<Match, StoreError> {
    let participant_count: i32 = row.try_get("participant_count")?;
    Ok(Match {
        id: row.try_get("id")?,
        tile_set_id: row.try_get("tile_set_id")?,
        tile_id: row.try_get("tile_id")?,
        match_date: row.try_get("match_date")?,
        participant_count: u32::try_from(participant_count).map_err(|_| {
            StoreError::InvalidRecord(format!("negative participant_count {}", participant_count))
        })?,
        is_notified: row.try_get("is_notified")?,
    })
}

#[async_trait]
impl DecisionStore for PostgresStore {
    async fn find_tile_set(&self, id: &str) -> Result<Option<TileSet>, StoreError> {
        let query = format!("SELECT {} FROM tile_sets WHERE id = $1", TILE_SET_COLUMNS);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(parse_tile_set).transpose()
    }

    async fn find_tile_set_by_code(&self, access_code: &str) -> Result<Option<TileSet>, StoreError> {
        let query = format!("SELECT {} FROM tile_sets WHERE access_code = $1", TILE_SET_COLUMNS);
        let row = sqlx::query(&query)
            .bind(access_code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_tile_set).transpose()
    }

    async fn insert_tile_set(&self, tile_set: NewTileSet) -> Result<TileSet, StoreError> {
        let query = format!(
            r#"
            INSERT INTO tile_sets ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            TILE_SET_COLUMNS, TILE_SET_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(new_id())
            .bind(&tile_set.title)
            .bind(&tile_set.description)
            .bind(&tile_set.creator_id)
            .bind(&tile_set.access_code)
            .bind(tile_set.category.as_str())
            .bind(tile_set.created_date)
            .bind(tile_set.expires_date)
            .bind(tile_set.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::InvalidRecord(
                    format!("access code {} already in use", tile_set.access_code),
                ),
                other => other.into(),
            })?;

        parse_tile_set(&row)
    }

    async fn find_tile(&self, id: &str) -> Result<Option<Tile>, StoreError> {
        let query = format!("SELECT {} FROM tiles WHERE id = $1", TILE_COLUMNS);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(parse_tile).transpose()
    }

    async fn find_tiles(&self, tile_set_id: &str) -> Result<Vec<Tile>, StoreError> {
        let query = format!(
            "SELECT {} FROM tiles WHERE tile_set_id = $1 ORDER BY display_order ASC, id ASC",
            TILE_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(tile_set_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_tile).collect()
    }

    async fn insert_tile(&self, tile: NewTile) -> Result<Tile, StoreError> {
        let query = format!(
            r#"
            INSERT INTO tiles ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            TILE_COLUMNS, TILE_COLUMNS
        );
        let tags: Vec<String> = tile.tags.iter().map(|t| t.as_str().to_string()).collect();

        let row = sqlx::query(&query)
            .bind(new_id())
            .bind(&tile.tile_set_id)
            .bind(&tile.title)
            .bind(&tile.description)
            .bind(&tile.image_url)
            .bind(&tile.external_link)
            .bind(&tags)
            .bind(tile.order)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    StoreError::NotFound(format!("tile set {}", tile.tile_set_id))
                }
                other => other.into(),
            })?;

        parse_tile(&row)
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let query = format!(
            r#"
            INSERT INTO sessions (id, tile_set_id, participant_id, participant_name, started_date, is_complete)
            VALUES ($1, $2, $3, $4, $5, FALSE)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(new_id())
            .bind(&session.tile_set_id)
            .bind(&session.participant_id)
            .bind(&session.participant_name)
            .bind(session.started_date)
            .fetch_one(&self.pool)
            .await?;

        let session = parse_session(&row)?;
        tracing::debug!("Inserted session {} for participant {}", session.id, session.participant_id);

        Ok(session)
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let query = format!("SELECT {} FROM sessions WHERE id = $1", SESSION_COLUMNS);
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(parse_session).transpose()
    }

    async fn find_sessions(&self, tile_set_id: &str) -> Result<Vec<Session>, StoreError> {
        let query = format!(
            "SELECT {} FROM sessions WHERE tile_set_id = $1 ORDER BY started_date ASC, id ASC",
            SESSION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(tile_set_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_session).collect()
    }

    async fn mark_session_complete(
        &self,
        id: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<Session, StoreError> {
        let query = format!(
            r#"
            UPDATE sessions
            SET completed_date = $2, is_complete = TRUE
            WHERE id = $1
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(completed_at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("session {}", id)))?;

        parse_session(&row)
    }

    async fn insert_swipe_if_absent(
        &self,
        swipe: NewSwipe,
    ) -> Result<InsertOutcome<SwipeResult>, StoreError> {
        let insert = format!(
            r#"
            INSERT INTO swipe_results ({})
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (session_id, tile_id) DO NOTHING
            RETURNING {}
            "#,
            SWIPE_COLUMNS, SWIPE_COLUMNS
        );

        let inserted = sqlx::query(&insert)
            .bind(new_id())
            .bind(&swipe.session_id)
            .bind(&swipe.tile_id)
            .bind(swipe.decision.as_str())
            .bind(swipe.timestamp)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Created(parse_swipe(&row)?));
        }

        let select = format!(
            "SELECT {} FROM swipe_results WHERE session_id = $1 AND tile_id = $2",
            SWIPE_COLUMNS
        );
        let row = sqlx::query(&select)
            .bind(&swipe.session_id)
            .bind(&swipe.tile_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("conflicting swipe not readable: {}", e)))?;

        Ok(InsertOutcome::Existing(parse_swipe(&row)?))
    }

    async fn find_swipes_for_tile_set(&self, tile_set_id: &str) -> Result<Vec<SwipeResult>, StoreError> {
        let query = r#"
            SELECT sr.id, sr.session_id, sr.tile_id, sr.decision, sr.timestamp
            FROM swipe_results sr
            JOIN sessions s ON s.id = sr.session_id
            WHERE s.tile_set_id = $1
        "#;

        let rows = sqlx::query(query)
            .bind(tile_set_id)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Tile set {} has {} swipe results", tile_set_id, rows.len());

        rows.iter().map(parse_swipe).collect()
    }

    async fn insert_match_if_absent(
        &self,
        new_match: NewMatch,
    ) -> Result<InsertOutcome<Match>, StoreError> {
        let participant_count = i32::try_from(new_match.participant_count).map_err(|_| {
            StoreError::InvalidRecord(format!(
                "participant_count {} out of range",
                new_match.participant_count
            ))
        })?;

        let insert = format!(
            r#"
            INSERT INTO matches ({})
            VALUES ($1, $2, $3, $4, $5, FALSE)
            ON CONFLICT (tile_set_id, tile_id) DO NOTHING
            RETURNING {}
            "#,
            MATCH_COLUMNS, MATCH_COLUMNS
        );

        let inserted = sqlx::query(&insert)
            .bind(new_id())
            .bind(&new_match.tile_set_id)
            .bind(&new_match.tile_id)
            .bind(new_match.match_date)
            .bind(participant_count)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok(InsertOutcome::Created(parse_match(&row)?));
        }

        let select = format!(
            "SELECT {} FROM matches WHERE tile_set_id = $1 AND tile_id = $2",
            MATCH_COLUMNS
        );
        let row = sqlx::query(&select)
            .bind(&new_match.tile_set_id)
            .bind(&new_match.tile_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("conflicting match not readable: {}", e)))?;

        Ok(InsertOutcome::Existing(parse_match(&row)?))
    }

    async fn find_matches(&self, tile_set_id: &str) -> Result<Vec<Match>, StoreError> {
        let query = format!(
            "SELECT {} FROM matches WHERE tile_set_id = $1 ORDER BY match_date ASC, id ASC",
            MATCH_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(tile_set_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_match).collect()
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
