use chrono::Utc;
use std::sync::Arc;
use crate::core::access::{generate_access_code, normalize_access_code, ACCESS_CODE_LENGTH};
use crate::core::errors::VoteError;
use crate::models::{CreateTileSetRequest, NewTile, NewTileSet, Tile, TileSet};
use crate::services::{DecisionStore, StoreError};

const ACCESS_CODE_ATTEMPTS: usize = 5;

/// Creates tile sets and looks them up for participants
#[derive(Clone)]
pub struct TileSetCatalog {
    store: Arc<dyn DecisionStore>,
    access_code_length: usize,
}

impl TileSetCatalog {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self {
            store,
            access_code_length: ACCESS_CODE_LENGTH,
        }
    }

    pub fn with_access_code_length(mut self, length: usize) -> Self {
        self.access_code_length = length.max(4);
        self
    }

    /// Create an active tile set and its tiles
    ///
    /// Tiles without an explicit order take their position in the request.
    pub async fn create_tile_set(
        &self,
        request: CreateTileSetRequest,
    ) -> Result<(TileSet, Vec<Tile>), VoteError> {
        if request.title.trim().is_empty() {
            return Err(VoteError::InvalidInput("title must not be blank".to_string()));
        }
        if request.creator_id.trim().is_empty() {
            return Err(VoteError::InvalidInput("creator id must not be blank".to_string()));
        }

        let tile_set = self.insert_with_fresh_code(&request).await?;

        let mut tiles = Vec::with_capacity(request.tiles.len());
        for (position, tile) in request.tiles.into_iter().enumerate() {
            let order = match tile.order {
                Some(order) => order,
                None => i32::try_from(position).map_err(|_| {
                    VoteError::InvalidInput("too many tiles in one tile set".to_string())
                })?,
            };
            let created = self
                .store
                .insert_tile(NewTile {
                    tile_set_id: tile_set.id.clone(),
                    title: tile.title.trim().to_string(),
                    description: tile.description,
                    image_url: tile.image_url,
                    external_link: tile.external_link,
                    tags: tile.tags,
                    order,
                })
                .await?;
            tiles.push(created);
        }

        tracing::info!(
            "Created tile set {} ({}) with {} tiles",
            tile_set.id,
            tile_set.access_code,
            tiles.len()
        );

        tiles.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok((tile_set, tiles))
    }

    async fn insert_with_fresh_code(&self, request: &CreateTileSetRequest) -> Result<TileSet, VoteError> {
        for attempt in 1..=ACCESS_CODE_ATTEMPTS {
            let access_code = generate_access_code(self.access_code_length);
            if self.store.find_tile_set_by_code(&access_code).await?.is_some() {
                tracing::debug!("Access code collision on attempt {}", attempt);
                continue;
            }

            let inserted = self
                .store
                .insert_tile_set(NewTileSet {
                    title: request.title.trim().to_string(),
                    description: request.description.clone(),
                    creator_id: request.creator_id.trim().to_string(),
                    access_code,
                    category: request.category,
                    created_date: Utc::now(),
                    expires_date: request.expires_date,
                    is_active: true,
                })
                .await;

            match inserted {
                Ok(tile_set) => return Ok(tile_set),
                // Lost a race for the same code
                Err(StoreError::InvalidRecord(msg)) if msg.contains("access code") => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(VoteError::Store(StoreError::Backend(format!(
            "no free access code after {} attempts",
            ACCESS_CODE_ATTEMPTS
        ))))
    }

    pub async fn find_by_access_code(&self, access_code: &str) -> Result<TileSet, VoteError> {
        let code = normalize_access_code(access_code);
        self.store
            .find_tile_set_by_code(&code)
            .await?
            .ok_or_else(|| VoteError::NotFound(format!("tile set with access code {}", code)))
    }

    /// Tiles of a tile set in display order
    pub async fn list_tiles(&self, tile_set_id: &str) -> Result<Vec<Tile>, VoteError> {
        if self.store.find_tile_set(tile_set_id).await?.is_none() {
            return Err(VoteError::NotFound(format!("tile set {}", tile_set_id)));
        }
        Ok(self.store.find_tiles(tile_set_id).await?)
    }
}
