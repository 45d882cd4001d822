use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::api::{FavoritesApi, TrackApi};
use crate::config::Configs;
use crate::constant::*;
use crate::error::ApiError;
use crate::model::{AddFavoriteBody, FavoriteIds, FavoriteStatus, Track, TrackId};

pub mod interceptor;

pub use interceptor::{Interceptors, RequestContext, RequestTiming, ResponseMeta};

/// A decoded response together with what the response stages recorded about it
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: StatusCode,
    pub duration: Option<Duration>,
}

/// The application's API client.
///
/// One instance is built at startup and shared by every caller.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    interceptors: Interceptors,
}

impl Client {
    /// Construct a new client
    pub fn new(configs: &Configs, interceptors: Interceptors) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(configs.app.request_timeout())
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            http,
            base_url: configs.env.api_base_url.to_owned(),
            interceptors,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request through the interceptor pipeline and decode the JSON response.
    ///
    /// An empty response body decodes as JSON `null`.
    pub async fn request<T>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let mut ctx = RequestContext::new(method.clone(), segments.join("/"));

        let mut request = match self.build_request(method, segments, query, body) {
            Ok(request) => request,
            Err(err) => {
                self.interceptors.error(&err, &mut ctx);
                return Err(err);
            }
        };

        self.interceptors.request(&mut request, &mut ctx).await;

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                let err = if err.is_builder() {
                    ApiError::Request(err.to_string())
                } else {
                    ApiError::Network(err)
                };
                self.interceptors.error(&err, &mut ctx);
                return Err(err);
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                let err = ApiError::Network(err);
                self.interceptors.error(&err, &mut ctx);
                return Err(err);
            }
        };

        if !status.is_success() {
            let err = ApiError::Status { status, body: text };
            self.interceptors.error(&err, &mut ctx);
            return Err(err);
        }

        let mut meta = ResponseMeta {
            status,
            duration: None,
        };
        self.interceptors.response(&mut meta, &mut ctx);

        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        let data = match serde_json::from_str(text) {
            Ok(data) => data,
            Err(err) => {
                let err = ApiError::Decode(err);
                self.interceptors.error(&err, &mut ctx);
                return Err(err);
            }
        };

        Ok(ApiResponse {
            data,
            status: meta.status,
            duration: meta.duration,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<ApiResponse<T>, ApiError> {
        self.request(Method::GET, segments, &[], None).await
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| ApiError::Request(format!("invalid base URL {:?}: {err}", self.base_url)))?;

        url.path_segments_mut()
            .map_err(|_| ApiError::Request(format!("base URL {:?} cannot have a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    fn build_request(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Request, ApiError> {
        let url = self.endpoint(segments, query)?;
        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        builder
            .build()
            .map_err(|err| ApiError::Request(err.to_string()))
    }
}

#[async_trait]
impl FavoritesApi for Client {
    async fn favorite_status(&self, track_id: &TrackId) -> Result<FavoriteStatus, ApiError> {
        Ok(self
            .get::<FavoriteStatus>(&[TRACK_FAVORITES_PATH, track_id.as_str()])
            .await?
            .data)
    }

    async fn favorite_ids(&self) -> Result<FavoriteIds, ApiError> {
        Ok(self.get::<FavoriteIds>(&[TRACK_FAVORITES_PATH]).await?.data)
    }

    async fn add_favorite(&self, track_id: &TrackId) -> Result<(), ApiError> {
        let body = serde_json::to_value(AddFavoriteBody { track_id })
            .map_err(|err| ApiError::Request(err.to_string()))?;
        self.request::<serde_json::Value>(Method::POST, &[TRACK_FAVORITES_PATH], &[], Some(body))
            .await?;
        tracing::info!(%track_id, "track added to favorites");
        Ok(())
    }

    async fn remove_favorite(&self, track_id: &TrackId) -> Result<(), ApiError> {
        self.request::<serde_json::Value>(
            Method::DELETE,
            &[TRACK_FAVORITES_PATH, track_id.as_str()],
            &[],
            None,
        )
        .await?;
        tracing::info!(%track_id, "track removed from favorites");
        Ok(())
    }
}

#[async_trait]
impl TrackApi for Client {
    async fn track(&self, track_id: &TrackId) -> Result<Track, ApiError> {
        Ok(self.get::<Track>(&[TRACKS_PATH, track_id.as_str()]).await?.data)
    }

    async fn tracks_by_ids(&self, track_ids: &[TrackId]) -> Result<Vec<Track>, ApiError> {
        let ids = track_ids
            .iter()
            .map(TrackId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        Ok(self
            .request::<Vec<Track>>(Method::GET, &[TRACKS_PATH], &[("ids", ids)], None)
            .await?
            .data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    fn client(base_url: &str) -> Client {
        let configs = Configs::for_environment(Environment::Development).with_api_base_url(base_url);
        Client::new(&configs, Interceptors::new()).unwrap()
    }

    #[test]
    fn endpoints_are_joined_and_encoded() {
        let client = client("https://api.dev.cypher.app/dev/");
        let url = client
            .endpoint(&[TRACK_FAVORITES_PATH, "beat 1/2"], &[])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.dev.cypher.app/dev/track-favorites/beat%201%2F2");

        let url = client
            .endpoint(&[TRACKS_PATH], &[("ids", "a,b".to_string())])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.dev.cypher.app/dev/tracks?ids=a%2Cb");
    }

    #[test]
    fn invalid_base_url_is_a_request_error() {
        let client = client("not a url");
        let err = client.endpoint(&[TRACKS_PATH], &[]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Request);
    }
}
