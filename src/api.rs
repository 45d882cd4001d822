use async_trait::async_trait;

use crate::error::ApiError;
use crate::model::{FavoriteIds, FavoriteStatus, Track, TrackId};

/// Favorites endpoints of the REST API
#[async_trait]
pub trait FavoritesApi: Send + Sync {
    /// `GET /track-favorites/{trackId}`
    async fn favorite_status(&self, track_id: &TrackId) -> Result<FavoriteStatus, ApiError>;

    /// `GET /track-favorites`
    async fn favorite_ids(&self) -> Result<FavoriteIds, ApiError>;

    /// `POST /track-favorites`
    async fn add_favorite(&self, track_id: &TrackId) -> Result<(), ApiError>;

    /// `DELETE /track-favorites/{trackId}`
    async fn remove_favorite(&self, track_id: &TrackId) -> Result<(), ApiError>;
}

/// Track retrieval endpoints
#[async_trait]
pub trait TrackApi: Send + Sync {
    /// `GET /tracks/{trackId}`
    async fn track(&self, track_id: &TrackId) -> Result<Track, ApiError>;

    /// `GET /tracks?ids=a,b,c`, one batched call for all ids
    async fn tracks_by_ids(&self, track_ids: &[TrackId]) -> Result<Vec<Track>, ApiError>;
}
