use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};

use crate::auth::SessionProvider;
use crate::error::ApiError;
use crate::nav::Navigator;

/// Wall-clock timing of one in-flight request
#[derive(Debug, Clone, Copy)]
pub struct RequestTiming {
    pub start: Instant,
    pub started_at: DateTime<Utc>,
    pub duration: Option<Duration>,
}

impl RequestTiming {
    pub fn start() -> Self {
        Self::started(Instant::now())
    }

    pub fn started(start: Instant) -> Self {
        Self {
            start,
            started_at: Utc::now(),
            duration: None,
        }
    }
}

/// State shared by the stages of a single request/response pair
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub endpoint: String,
    pub timing: Option<RequestTiming>,
}

impl RequestContext {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            timing: None,
        }
    }
}

/// What the response stages see of a successful response
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub duration: Option<Duration>,
}

/// Runs before a request is dispatched. Must not fail the request.
#[async_trait]
pub trait RequestStage: Send + Sync {
    async fn on_request(&self, request: &mut reqwest::Request, ctx: &mut RequestContext);
}

/// Observes responses and errors. Stages only log and annotate; they never
/// swallow or replace an error.
pub trait ResponseStage: Send + Sync {
    fn on_response(&self, _meta: &mut ResponseMeta, _ctx: &mut RequestContext) {}

    fn on_error(&self, _error: &ApiError, _ctx: &mut RequestContext) {}
}

/// Ordered request and response stages of a [`Client`](super::Client)
#[derive(Clone, Default)]
pub struct Interceptors {
    request: Vec<Arc<dyn RequestStage>>,
    response: Vec<Arc<dyn ResponseStage>>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bearer token, timer, latency measurement and error logging, in that order
    pub fn standard(
        session: Arc<dyn SessionProvider>,
        navigator: Arc<dyn Navigator>,
        slow_threshold: Duration,
    ) -> Self {
        Self::new()
            .with_request_stage(BearerToken::new(session))
            .with_request_stage(StartTimer)
            .with_response_stage(MeasureLatency::new(slow_threshold))
            .with_response_stage(ErrorLog::new(navigator))
    }

    pub fn with_request_stage(mut self, stage: impl RequestStage + 'static) -> Self {
        self.request.push(Arc::new(stage));
        self
    }

    pub fn with_response_stage(mut self, stage: impl ResponseStage + 'static) -> Self {
        self.response.push(Arc::new(stage));
        self
    }

    pub async fn request(&self, request: &mut reqwest::Request, ctx: &mut RequestContext) {
        for stage in &self.request {
            stage.on_request(request, ctx).await;
        }
    }

    pub fn response(&self, meta: &mut ResponseMeta, ctx: &mut RequestContext) {
        for stage in &self.response {
            stage.on_response(meta, ctx);
        }
    }

    pub fn error(&self, error: &ApiError, ctx: &mut RequestContext) {
        for stage in &self.response {
            stage.on_error(error, ctx);
        }
    }
}

/// Attaches the current session token as a bearer `Authorization` header
pub struct BearerToken {
    session: Arc<dyn SessionProvider>,
}

impl BearerToken {
    pub fn new(session: Arc<dyn SessionProvider>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl RequestStage for BearerToken {
    async fn on_request(&self, request: &mut reqwest::Request, ctx: &mut RequestContext) {
        match self.session.current_session_token().await {
            Ok(Some(token)) => match HeaderValue::from_str(&token.bearer()) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    request.headers_mut().insert(AUTHORIZATION, value);
                }
                Err(err) => {
                    tracing::warn!(endpoint = %ctx.endpoint, "session token is not a valid header value: {err}");
                }
            },
            Ok(None) => {
                tracing::trace!(endpoint = %ctx.endpoint, "no session, sending request anonymously");
            }
            Err(err) => {
                tracing::warn!(endpoint = %ctx.endpoint, "failed to get session token, sending request anonymously: {err:#}");
            }
        }
    }
}

/// Records the dispatch time of the request
pub struct StartTimer;

#[async_trait]
impl RequestStage for StartTimer {
    async fn on_request(&self, _request: &mut reqwest::Request, ctx: &mut RequestContext) {
        ctx.timing = Some(RequestTiming::start());
    }
}

/// Annotates responses with their duration and warns about slow requests
pub struct MeasureLatency {
    threshold: Duration,
}

impl MeasureLatency {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }
}

impl ResponseStage for MeasureLatency {
    fn on_response(&self, meta: &mut ResponseMeta, ctx: &mut RequestContext) {
        let Some(timing) = ctx.timing.as_mut() else {
            return;
        };
        let elapsed = timing.start.elapsed();
        timing.duration = Some(elapsed);
        meta.duration = Some(elapsed);

        if elapsed > self.threshold {
            tracing::warn!(
                method = %ctx.method,
                endpoint = %ctx.endpoint,
                duration_ms = elapsed.as_millis() as u64,
                "slow API request"
            );
        } else {
            tracing::debug!(
                method = %ctx.method,
                endpoint = %ctx.endpoint,
                duration_ms = elapsed.as_millis() as u64,
                "API request completed"
            );
        }
    }
}

/// Logs every failed request by kind and flags expired sessions
pub struct ErrorLog {
    navigator: Arc<dyn Navigator>,
}

impl ErrorLog {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }
}

impl ResponseStage for ErrorLog {
    fn on_error(&self, error: &ApiError, ctx: &mut RequestContext) {
        match error {
            ApiError::Status { status, body } => {
                tracing::error!(
                    method = %ctx.method,
                    endpoint = %ctx.endpoint,
                    status = status.as_u16(),
                    body = %body,
                    "API request failed"
                );
            }
            ApiError::Network(err) => {
                tracing::error!(method = %ctx.method, endpoint = %ctx.endpoint, "no response received: {err}");
            }
            ApiError::Request(message) => {
                tracing::error!(method = %ctx.method, endpoint = %ctx.endpoint, "failed to build request: {message}");
            }
            ApiError::Decode(err) => {
                tracing::error!(method = %ctx.method, endpoint = %ctx.endpoint, "failed to decode response: {err}");
            }
        }

        // Redirecting to sign-in is left to the caller
        if error.is_unauthorized() && !self.navigator.current().is_auth_screen() {
            tracing::warn!(endpoint = %ctx.endpoint, "session expired, the user needs to sign in again");
        }
    }
}
