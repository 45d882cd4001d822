use std::time::Duration;

pub const DEFAULT_CONFIG_FOLDER: &str = ".config/cypher";
#[cfg(feature = "file")]
pub const APP_CONFIG_FILE: &str = "app.toml";

pub const REQUEST_TIMEOUT_MS: u64 = 15_000;
pub const SLOW_REQUEST_THRESHOLD_MS: u64 = 1_000;

/// How long favorites data is served from the query cache before a refetch
pub const FAVORITES_STALE_TIME: Duration = Duration::from_secs(60);

pub const QUERY_RETRIES: u32 = 3;
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);
pub const QUERY_CACHE_CAPACITY: usize = 256;

pub const TRACK_FAVORITES_PATH: &str = "track-favorites";
pub const TRACKS_PATH: &str = "tracks";

#[cfg(feature = "env-file")]
pub const SESSION_TOKEN_ENV: &str = "CYPHER_SESSION_TOKEN";
