use std::sync::Arc;

use crate::api::{FavoritesApi, TrackApi};
use crate::error::ApiError;
use crate::model::{FavoriteStatus, ToggleFavorite, TrackId, UserFavorites};
use crate::query::{QueryCache, QueryKey, QueryOptions};

/// Keys a successful toggle of `track_id` invalidates
pub fn toggle_invalidation_keys(track_id: &TrackId) -> [QueryKey; 3] {
    [
        QueryKey::TrackFavoriteStatus(track_id.clone()),
        QueryKey::UserFavorites,
        QueryKey::Track(track_id.clone()),
    ]
}

/// Cached favorites queries and the toggle mutation
pub struct Favorites {
    favorites: Arc<dyn FavoritesApi>,
    tracks: Arc<dyn TrackApi>,
    cache: Arc<QueryCache>,
    options: QueryOptions,
}

impl Favorites {
    pub fn new(
        favorites: Arc<dyn FavoritesApi>,
        tracks: Arc<dyn TrackApi>,
        cache: Arc<QueryCache>,
        options: QueryOptions,
    ) -> Self {
        Self {
            favorites,
            tracks,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Favorite tracks of the current user, hydrated into full track records
    pub async fn user_favorites(&self) -> Result<UserFavorites, ApiError> {
        self.cache
            .fetch(QueryKey::UserFavorites, &self.options, || self.load_user_favorites())
            .await
    }

    /// Favorite status of one track. Returns `Ok(None)` without a request when
    /// `track_id` is empty.
    pub async fn favorite_status(&self, track_id: &TrackId) -> Result<Option<FavoriteStatus>, ApiError> {
        if track_id.is_empty() {
            return Ok(None);
        }
        let key = QueryKey::TrackFavoriteStatus(track_id.clone());
        self.cache
            .fetch(key, &self.options, || self.favorites.favorite_status(track_id))
            .await
            .map(Some)
    }

    /// Flip the favorite state of a track.
    ///
    /// `toggle.is_favorite` is the state the caller believes is current. Nothing
    /// is updated locally before the server confirms; on success the status,
    /// the user's favorites and the track record are invalidated together.
    pub async fn toggle_favorite(&self, toggle: &ToggleFavorite) -> Result<[QueryKey; 3], ApiError> {
        let track_id = &toggle.track_id;
        if toggle.is_favorite {
            self.favorites.remove_favorite(track_id).await?;
        } else {
            self.favorites.add_favorite(track_id).await?;
        }

        let keys = toggle_invalidation_keys(track_id);
        self.cache.invalidate(&keys);
        Ok(keys)
    }

    async fn load_user_favorites(&self) -> Result<UserFavorites, ApiError> {
        let ids = self.favorites.favorite_ids().await?;
        if ids.track_ids.is_empty() {
            return Ok(UserFavorites::default());
        }

        let favorite_tracks = self.tracks.tracks_by_ids(&ids.track_ids).await?;
        tracing::debug!(
            requested = ids.track_ids.len(),
            hydrated = favorite_tracks.len(),
            "hydrated favorite tracks"
        );
        Ok(UserFavorites {
            favorite_tracks,
            total_favorites: ids.total_favorites,
        })
    }
}
