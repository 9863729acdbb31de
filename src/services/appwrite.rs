use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use crate::models::{
    InsertOutcome, Match, NewMatch, NewSession, NewSwipe, NewTile, NewTileSet, Session,
    SwipeResult, Tile, TileSet,
};
use crate::services::store::{
    match_key, sort_matches, sort_tiles, swipe_key, DecisionStore, StoreError,
};

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid API key or project")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl From<AppwriteError> for StoreError {
    fn from(err: AppwriteError) -> Self {
        match err {
            AppwriteError::InvalidResponse(msg) => StoreError::InvalidRecord(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub tile_sets: String,
    pub tiles: String,
    pub sessions: String,
    pub swipe_results: String,
    pub matches: String,
}

/// Outcome of a document create call
enum Created {
    Document(Value),
    Conflict,
}

/// Decision store backed by Appwrite database collections
///
/// Records are stored as documents with camelCase attributes. Swipe and
/// match documents use ids derived from their natural key, so Appwrite's
/// document-id uniqueness rejects a second create with 409 Conflict.
pub struct AppwriteStore {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
    page_size: usize,
}

impl AppwriteStore {
    /// Create a new Appwrite store
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
            page_size: 100,
        })
    }

    /// Override the number of documents fetched per list request
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
    }

    async fn check_status(
        response: reqwest::Response,
        action: &str,
    ) -> Result<reqwest::Response, AppwriteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppwriteError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read body".to_string());
        tracing::error!("Appwrite {} failed: {} - {}", action, status, body);
        Err(AppwriteError::ApiError(format!("Failed to {}: {}", action, status)))
    }

    /// Fetch one document by id, `None` on 404
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, AppwriteError> {
        let url = format!("{}/{}", self.documents_url(collection), urlencoding::encode(id));

        tracing::debug!("Fetching document {} from {}", id, collection);

        let response = self.request(reqwest::Method::GET, &url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check_status(response, "fetch document").await?;
        Ok(Some(response.json().await?))
    }

    /// List every document matching `queries`, following offset pagination
    async fn list_documents(
        &self,
        collection: &str,
        queries: &[Value],
    ) -> Result<Vec<Value>, AppwriteError> {
        let url = self.documents_url(collection);
        let mut documents = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut page_queries: Vec<Value> = queries.to_vec();
            page_queries.push(json!({ "method": "limit", "values": [self.page_size] }));
            page_queries.push(json!({ "method": "offset", "values": [offset] }));

            let params = page_queries
                .iter()
                .enumerate()
                .map(|(i, q)| format!("queries[{}]={}", i, urlencoding::encode(&q.to_string())))
                .collect::<Vec<_>>()
                .join("&");
            let full_url = format!("{}?{}", url, params);

            let response = self.request(reqwest::Method::GET, &full_url).send().await?;
            let response = Self::check_status(response, "list documents").await?;
            let json: Value = response.json().await?;

            let page = json
                .get("documents")
                .and_then(|d| d.as_array())
                .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

            let fetched = page.len();
            documents.extend(page.iter().cloned());

            let total = json.get("total").and_then(|t| t.as_u64()).unwrap_or(0) as usize;
            offset += fetched;
            if fetched < self.page_size || offset >= total {
                break;
            }
        }

        tracing::debug!("Listed {} documents from {}", documents.len(), collection);

        Ok(documents)
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> Result<Created, AppwriteError> {
        let payload = json!({ "documentId": id, "data": data });

        let response = self
            .request(reqwest::Method::POST, &self.documents_url(collection))
            .json(&payload)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Ok(Created::Conflict);
        }

        let response = Self::check_status(response, "create document").await?;
        Ok(Created::Document(response.json().await?))
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        data: Value,
    ) -> Result<Option<Value>, AppwriteError> {
        let url = format!("{}/{}", self.documents_url(collection), urlencoding::encode(id));
        let response = self
            .request(reqwest::Method::PATCH, &url)
            .json(&json!({ "data": data }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check_status(response, "update document").await?;
        Ok(Some(response.json().await?))
    }

    /// Create a document keyed on a natural id, reading the stored one on conflict
    async fn create_if_absent<T>(
        &self,
        collection: &str,
        record: &T,
        id: &str,
    ) -> Result<InsertOutcome<T>, StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.create_document(collection, id, attributes(record)?).await? {
            Created::Document(doc) => Ok(InsertOutcome::Created(from_document(doc)?)),
            Created::Conflict => {
                tracing::debug!("Document {} already exists in {}", id, collection);
                let doc = self.get_document(collection, id).await?.ok_or_else(|| {
                    StoreError::Backend(format!("conflicting document {} not readable", id))
                })?;
                Ok(InsertOutcome::Existing(from_document(doc)?))
            }
        }
    }

    async fn create_new<T>(&self, collection: &str, record: &T, id: &str) -> Result<T, StoreError>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.create_document(collection, id, attributes(record)?).await? {
            Created::Document(doc) => from_document(doc),
            Created::Conflict => Err(StoreError::InvalidRecord(format!(
                "document {} conflicts with an existing record in {}",
                id, collection
            ))),
        }
    }
}

fn equal(attribute: &str, values: &[&str]) -> Value {
    json!({ "method": "equal", "attribute": attribute, "values": values })
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Serialize a record into document attributes (everything but the id)
fn attributes<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    let mut value = serde_json::to_value(record)
        .map_err(|e| StoreError::InvalidRecord(format!("Failed to serialize record: {}", e)))?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("id");
    }
    Ok(value)
}

/// Parse an Appwrite document into a typed record
fn from_document<T: DeserializeOwned>(mut doc: Value) -> Result<T, StoreError> {
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| StoreError::InvalidRecord("document is not an object".to_string()))?;
    let id = obj
        .get("$id")
        .cloned()
        .ok_or_else(|| StoreError::InvalidRecord("document without $id".to_string()))?;
    obj.insert("id".to_string(), id);

    serde_json::from_value(doc)
        .map_err(|e| StoreError::InvalidRecord(format!("Failed to parse document: {}", e)))
}

fn from_documents<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>, StoreError> {
    docs.into_iter().map(from_document).collect()
}

#[async_trait]
impl DecisionStore for AppwriteStore {
    async fn find_tile_set(&self, id: &str) -> Result<Option<TileSet>, StoreError> {
        self.get_document(&self.collections.tile_sets, id)
            .await?
            .map(from_document)
            .transpose()
    }

    async fn find_tile_set_by_code(&self, access_code: &str) -> Result<Option<TileSet>, StoreError> {
        let docs = self
            .list_documents(&self.collections.tile_sets, &[equal("accessCode", &[access_code])])
            .await?;
        docs.into_iter().next().map(from_document).transpose()
    }

    async fn insert_tile_set(&self, tile_set: NewTileSet) -> Result<TileSet, StoreError> {
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
        self.create_new(&self.collections.tile_sets, &record, &record.id).await
    }

    async fn find_tile(&self, id: &str) -> Result<Option<Tile>, StoreError> {
        self.get_document(&self.collections.tiles, id)
            .await?
            .map(from_document)
            .transpose()
    }

    async fn find_tiles(&self, tile_set_id: &str) -> Result<Vec<Tile>, StoreError> {
        let docs = self
            .list_documents(&self.collections.tiles, &[equal("tileSetId", &[tile_set_id])])
            .await?;
        let mut tiles: Vec<Tile> = from_documents(docs)?;
        sort_tiles(&mut tiles);
        Ok(tiles)
    }

    async fn insert_tile(&self, tile: NewTile) -> Result<Tile, StoreError> {
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
        self.create_new(&self.collections.tiles, &record, &record.id).await
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
        self.create_new(&self.collections.sessions, &record, &record.id).await
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.get_document(&self.collections.sessions, id)
            .await?
            .map(from_document)
            .transpose()
    }

    async fn find_sessions(&self, tile_set_id: &str) -> Result<Vec<Session>, StoreError> {
        let docs = self
            .list_documents(&self.collections.sessions, &[equal("tileSetId", &[tile_set_id])])
            .await?;
        let mut sessions: Vec<Session> = from_documents(docs)?;
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
        let data = json!({ "completedDate": completed_at, "isComplete": true });
        let doc = self
            .update_document(&self.collections.sessions, id, data)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("session {}", id)))?;
        from_document(doc)
    }

    async fn insert_swipe_if_absent(
        &self,
        swipe: NewSwipe,
    ) -> Result<InsertOutcome<SwipeResult>, StoreError> {
        let record = SwipeResult {
            id: swipe_key(&swipe.session_id, &swipe.tile_id),
            session_id: swipe.session_id,
            tile_id: swipe.tile_id,
            decision: swipe.decision,
            timestamp: swipe.timestamp,
        };
        self.create_if_absent(&self.collections.swipe_results, &record, &record.id)
            .await
    }

    async fn find_swipes_for_tile_set(&self, tile_set_id: &str) -> Result<Vec<SwipeResult>, StoreError> {
        let sessions = self.find_sessions(tile_set_id).await?;
        let session_ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();

        let mut swipes = Vec::new();
        // Appwrite caps the number of values in one equal() query
        for chunk in session_ids.chunks(100) {
            let docs = self
                .list_documents(&self.collections.swipe_results, &[equal("sessionId", chunk)])
                .await?;
            swipes.extend(from_documents::<SwipeResult>(docs)?);
        }

        tracing::debug!("Tile set {} has {} swipe results", tile_set_id, swipes.len());

        Ok(swipes)
    }

    async fn insert_match_if_absent(
        &self,
        new_match: NewMatch,
    ) -> Result<InsertOutcome<Match>, StoreError> {
        let record = Match {
            id: match_key(&new_match.tile_set_id, &new_match.tile_id),
            tile_set_id: new_match.tile_set_id,
            tile_id: new_match.tile_id,
            match_date: new_match.match_date,
            participant_count: new_match.participant_count,
            is_notified: false,
        };
        self.create_if_absent(&self.collections.matches, &record, &record.id)
            .await
    }

    async fn find_matches(&self, tile_set_id: &str) -> Result<Vec<Match>, StoreError> {
        let docs = self
            .list_documents(&self.collections.matches, &[equal("tileSetId", &[tile_set_id])])
            .await?;
        let mut matches: Vec<Match> = from_documents(docs)?;
        sort_matches(&mut matches);
        Ok(matches)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let url = format!(
            "{}/databases/{}",
            self.base_url.trim_end_matches('/'),
            self.database_id
        );
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(AppwriteError::from)?;
        Ok(response.status().is_success())
    }
}
