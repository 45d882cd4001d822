use anyhow::{Context as _, Result};
use reqwest::Url;

use crate::config::EnvConfig;

/// Public URL of an object in the environment's audio bucket
pub fn object_url(env: &EnvConfig, key: &str) -> Result<Url> {
    let key = key.trim_start_matches('/');
    anyhow::ensure!(!key.is_empty(), "empty storage key");

    let mut url = Url::parse(&format!(
        "https://{}.s3.{}.amazonaws.com/",
        env.storage_bucket, env.region
    ))
    .with_context(|| format!("invalid storage bucket {:?}", env.storage_bucket))?;

    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("storage URL cannot have a path"))?
        .pop_if_empty()
        .extend(key.split('/'));
    Ok(url)
}
