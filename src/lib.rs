mod constant;
mod token;
mod model;
mod error;
mod config;
mod auth;
mod api;
mod client;
mod query;
mod favorites;
mod tracks;
mod nav;
mod storage;
pub mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;

pub mod require {
    pub use crate::config::{AppConfig, Configs, EnvConfig, Environment};
    pub use crate::client::{ApiResponse, Client, Interceptors};
    pub use crate::auth::{MemorySession, SessionProvider};
    pub use crate::nav::{HistoryNavigator, Navigator, Route};
    pub use crate::App;
}

pub mod prelude {
    pub use super::require::*;
    pub use crate::api::{FavoritesApi, TrackApi};
    pub use crate::auth::{auth_config, configure, AuthConfig};
    #[cfg(feature = "env-file")]
    pub use crate::auth::EnvSession;
    pub use crate::client::interceptor::{
        BearerToken, ErrorLog, MeasureLatency, RequestStage, ResponseStage, StartTimer,
    };
    pub use crate::client::{RequestContext, RequestTiming, ResponseMeta};
    pub use crate::config::get_config_folder_path;
    pub use crate::error::{ApiError, ErrorKind};
    pub use crate::favorites::{toggle_invalidation_keys, Favorites};
    pub use crate::model::*;
    pub use crate::query::{QueryCache, QueryKey, QueryOptions, QueryState, RetryPolicy};
    pub use crate::storage::object_url;
    pub use crate::token::SessionToken;
    pub use crate::tracks::Tracks;
    pub use crate::ui::*;
}

use prelude::*;

/// Everything the front-end needs, wired once at startup
pub struct App {
    configs: Configs,
    client: Arc<Client>,
    cache: Arc<QueryCache>,
    favorites: Arc<Favorites>,
    tracks: Arc<Tracks>,
    session: Arc<dyn SessionProvider>,
    navigator: Arc<dyn Navigator>,
}

impl App {
    pub fn bootstrap(
        configs: Configs,
        session: Arc<dyn SessionProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        configure(&configs.env);

        let interceptors = Interceptors::standard(
            session.clone(),
            navigator.clone(),
            configs.app.slow_request_threshold(),
        );
        let client = Arc::new(Client::new(&configs, interceptors).context("create API client")?);
        let cache = Arc::new(QueryCache::new(configs.app.cache_capacity));
        let options = QueryOptions::from(&configs.app);

        let favorites = Arc::new(Favorites::new(
            client.clone(),
            client.clone(),
            cache.clone(),
            options,
        ));
        let tracks = Arc::new(Tracks::new(client.clone(), cache.clone(), options));

        tracing::info!(
            environment = %configs.environment,
            api = %configs.env.api_base_url,
            "client bootstrapped"
        );

        Ok(Self {
            configs,
            client,
            cache,
            favorites,
            tracks,
            session,
            navigator,
        })
    }

    pub fn configs(&self) -> &Configs {
        &self.configs
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn favorites(&self) -> &Arc<Favorites> {
        &self.favorites
    }

    pub fn tracks(&self) -> &Arc<Tracks> {
        &self.tracks
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn favorite_button(&self, track_id: impl Into<TrackId>, size: ButtonSize, compact: bool) -> FavoriteButton {
        FavoriteButton::new(
            FavoriteButtonProps {
                track_id: track_id.into(),
                size,
                compact,
            },
            self.favorites.clone(),
            self.session.clone(),
            self.navigator.clone(),
        )
    }

    pub fn profile_menu(&self) -> ProfileMenu {
        ProfileMenu::new(self.session.clone(), self.navigator.clone(), self.cache.clone())
    }

    /// A player loaded with an audio object from the storage bucket
    pub fn audio_player(&self, storage_key: &str, duration: Option<Duration>) -> anyhow::Result<AudioPlayer> {
        let mut player = AudioPlayer::new();
        player.load(object_url(&self.configs.env, storage_key)?, duration);
        Ok(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_wires_shared_client() -> anyhow::Result<()> {
        let configs = Configs::from_host("localhost");
        let app = App::bootstrap(
            configs,
            Arc::new(MemorySession::anonymous()),
            Arc::new(HistoryNavigator::default()),
        )?;

        assert_eq!(app.client().base_url(), "https://api.dev.cypher.app/dev");
        assert!(auth_config().is_some());

        let button = app.favorite_button("t-1", ButtonSize::Large, false);
        assert_eq!(button.props().track_id.as_str(), "t-1");
        assert_eq!(app.profile_menu().items().await, vec![MenuItem::SignIn, MenuItem::SignUp]);

        let player = app.audio_player("beats/t-1.mp3", None)?;
        assert_eq!(player.state(), PlaybackState::Ready);
        assert_eq!(
            player.source().map(|url| url.as_str()),
            Some("https://cypher-audio-dev.s3.us-east-1.amazonaws.com/beats/t-1.mp3")
        );
        Ok(())
    }
}
