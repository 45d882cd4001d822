use std::sync::Arc;

use crate::api::TrackApi;
use crate::error::ApiError;
use crate::model::{Track, TrackId};
use crate::query::{QueryCache, QueryKey, QueryOptions};

/// Cached single-track lookups
pub struct Tracks {
    api: Arc<dyn TrackApi>,
    cache: Arc<QueryCache>,
    options: QueryOptions,
}

impl Tracks {
    pub fn new(api: Arc<dyn TrackApi>, cache: Arc<QueryCache>, options: QueryOptions) -> Self {
        Self { api, cache, options }
    }

    pub async fn track(&self, track_id: &TrackId) -> Result<Track, ApiError> {
        self.cache
            .fetch(QueryKey::Track(track_id.clone()), &self.options, || self.api.track(track_id))
            .await
    }
}
