use crate::constant::*;

#[cfg(feature = "file")]
use anyhow::Context as _;
use anyhow::Result;
use config_parser2::*;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

static PRODUCTION_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(www\.)?cypher\.app\.?$").expect("valid production host pattern"));

static DEVELOPMENT_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(localhost|127\.0\.0\.1|dev\.cypher\.app)\.?$")
        .expect("valid development host pattern")
});

static PRODUCTION: Lazy<EnvConfig> = Lazy::new(|| EnvConfig {
    identity_pool_id: "us-east-1:5c3e2a4b-8f1d-4c6e-9a7b-2d0f1e3c4b5a".to_string(),
    user_pool_id: "us-east-1_CyPhErPrD".to_string(),
    user_pool_web_client_id: "4q2v1k9h7c3m5n8p0r6s2t4u1w".to_string(),
    api_base_url: "https://api.cypher.app/prod".to_string(),
    storage_bucket: "cypher-audio-prod".to_string(),
    region: "us-east-1".to_string(),
});

static DEVELOPMENT: Lazy<EnvConfig> = Lazy::new(|| EnvConfig {
    identity_pool_id: "us-east-1:0a9b8c7d-6e5f-4a3b-2c1d-0e9f8a7b6c5d".to_string(),
    user_pool_id: "us-east-1_CyPhErDeV".to_string(),
    user_pool_web_client_id: "7j3k5l1m9n2b4v6c8x0z1a3s5d".to_string(),
    api_base_url: "https://api.dev.cypher.app/dev".to_string(),
    storage_bucket: "cypher-audio-dev".to_string(),
    region: "us-east-1".to_string(),
});

/// Deployment environment the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    /// Resolve the environment from the host name the application is served from.
    ///
    /// Any host that is not a known production host resolves to `Development`.
    pub fn from_host(host: &str) -> Self {
        let host = host.trim();
        if PRODUCTION_HOST.is_match(host) {
            return Environment::Production;
        }
        if !DEVELOPMENT_HOST.is_match(host) {
            tracing::warn!(host, "unrecognized host, falling back to the development environment");
        }
        Environment::Development
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static configuration bundle of one environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub identity_pool_id: String,
    pub user_pool_id: String,
    pub user_pool_web_client_id: String,
    pub api_base_url: String,
    pub storage_bucket: String,
    pub region: String,
}

impl EnvConfig {
    pub fn for_environment(environment: Environment) -> &'static EnvConfig {
        match environment {
            Environment::Production => &PRODUCTION,
            Environment::Development => &DEVELOPMENT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Configs {
    pub environment: Environment,
    pub env: EnvConfig,
    pub app: AppConfig,
}

impl Configs {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            env: EnvConfig::for_environment(environment).clone(),
            app: AppConfig::default(),
        }
    }

    /// Resolve the environment once from a host name, e.g. at process start
    pub fn from_host(host: &str) -> Self {
        Self::for_environment(Environment::from_host(host))
    }

    pub fn new<P: AsRef<Path>>(config_folder: P, environment: Environment) -> Result<Self> {
        Ok(Self {
            app: AppConfig::new(config_folder)?,
            ..Self::for_environment(environment)
        })
    }

    /// Load tunables from the default configuration folder
    pub fn load(environment: Environment) -> Result<Self> {
        Self::new(get_config_folder_path()?, environment)
    }

    /// Override the API base URL, e.g. to point at a local mock server
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.env.api_base_url = url.into();
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ConfigParse)]
/// Application tunables
pub struct AppConfig {
    pub request_timeout_ms: u64,
    pub slow_request_threshold_ms: u64,
    pub stale_time_secs: u64,
    pub query_retries: u32,
    pub cache_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: REQUEST_TIMEOUT_MS,
            slow_request_threshold_ms: SLOW_REQUEST_THRESHOLD_MS,
            stale_time_secs: FAVORITES_STALE_TIME.as_secs(),
            query_retries: QUERY_RETRIES,
            cache_capacity: QUERY_CACHE_CAPACITY,
        }
    }
}

impl AppConfig {
    #[cfg(feature = "file")]
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let folder = path.as_ref();
        let mut config = Self::default();
        if !config.merge_from_folder(folder)? {
            config.save_to_folder(folder)?;
        }
        Ok(config)
    }

    #[cfg(not(feature = "file"))]
    pub fn new(_: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::default())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_threshold_ms)
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    /// Overlay the keys found in `<folder>/app.toml` onto `self`. Keys the
    /// file does not mention keep their current value. `Ok(false)` means
    /// there is no such file.
    #[cfg(feature = "file")]
    fn merge_from_folder(&mut self, folder: &Path) -> Result<bool> {
        let file = folder.join(APP_CONFIG_FILE);
        let content = match std::fs::read_to_string(&file) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(error) => return Err(error).with_context(|| format!("read {}", file.display())),
        };

        let table = toml::from_str::<toml::Value>(&content)
            .with_context(|| format!("parse {}", file.display()))?;
        self.parse(table)?;
        tracing::debug!(file = %file.display(), "loaded application config");
        Ok(true)
    }

    /// Save `self` as `<folder>/app.toml`, creating the folder if needed
    #[cfg(feature = "file")]
    fn save_to_folder(&self, folder: &Path) -> Result<()> {
        let file = folder.join(APP_CONFIG_FILE);
        std::fs::create_dir_all(folder).with_context(|| format!("create {}", folder.display()))?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&file, content).with_context(|| format!("write {}", file.display()))?;
        tracing::info!(file = %file.display(), "wrote default application config");
        Ok(())
    }
}

/// gets the application's configuration folder path
pub fn get_config_folder_path() -> Result<PathBuf> {
    match dirs_next::home_dir() {
        Some(home) => Ok(home.join(DEFAULT_CONFIG_FOLDER)),
        None => Err(anyhow::anyhow!("cannot find the home folder")),
    }
}
