use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use ttl_cache::TtlCache;

use crate::config::AppConfig;
use crate::constant::*;
use crate::error::ApiError;
use crate::model::TrackId;

/// Address of a cached query result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Favorite status of one track
    TrackFavoriteStatus(TrackId),
    /// Hydrated favorites of the current user
    UserFavorites,
    /// A single track record
    Track(TrackId),
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::TrackFavoriteStatus(id) => write!(f, "track-favorite-status:{id}"),
            QueryKey::UserFavorites => f.write_str("user-favorites"),
            QueryKey::Track(id) => write!(f, "track:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        retries: 0,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// Exponential backoff: `base_delay * 2^attempt`, capped at `max_delay`
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: QUERY_RETRIES,
            base_delay: RETRY_BASE_DELAY,
            max_delay: RETRY_MAX_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// How long a fetched result is served without refetching
    pub stale_time: Duration,
    pub retry: RetryPolicy,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: FAVORITES_STALE_TIME,
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&AppConfig> for QueryOptions {
    fn from(app: &AppConfig) -> Self {
        Self {
            stale_time: app.stale_time(),
            retry: RetryPolicy {
                retries: app.query_retries,
                ..RetryPolicy::default()
            },
        }
    }
}

/// What a view renders for a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> QueryState<T> {
    pub fn from_result(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(value) => QueryState::Ready(value),
            Err(err) => QueryState::Failed(err.to_string()),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            QueryState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

/// Marks the state of one key when a fetch starts. A fetch only stores its
/// result if the key's generation is unchanged when it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Generation {
    epoch: u64,
    key: u64,
}

struct Store {
    entries: TtlCache<QueryKey, Entry>,
    generations: HashMap<QueryKey, u64>,
    /// bumped by `clear`
    epoch: u64,
}

impl Store {
    fn generation(&self, key: &QueryKey) -> Generation {
        Generation {
            epoch: self.epoch,
            key: self.generations.get(key).copied().unwrap_or(0),
        }
    }

    fn bump(&mut self, key: &QueryKey) {
        *self.generations.entry(key.clone()).or_default() += 1;
    }
}

/// Key-addressed store of query results.
///
/// Results are never patched in place: a mutation invalidates the affected
/// keys and the next read refetches. A fetch that was in flight while its key
/// got invalidated returns its result to the caller but does not cache it.
pub struct QueryCache {
    store: Mutex<Store>,
    in_flight: Mutex<HashMap<QueryKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            store: Mutex::new(Store {
                entries: TtlCache::new(capacity),
                generations: HashMap::new(),
                epoch: 0,
            }),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh cached value of `key`, if any
    pub fn get<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + 'static,
    {
        let entry: Entry = self.store.lock().entries.get(key).cloned()?;
        (*entry).downcast_ref::<T>().cloned()
    }

    pub fn set<T>(&self, key: QueryKey, value: T, stale_time: Duration)
    where
        T: Send + Sync + 'static,
    {
        self.store.lock().entries.insert(key, Arc::new(value), stale_time);
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.store.lock().entries.contains_key(key)
    }

    /// Remove all `keys` under one lock, so readers see either none or all of
    /// them invalidated. Returns how many keys held a value.
    pub fn invalidate(&self, keys: &[QueryKey]) -> usize {
        let mut store = self.store.lock();
        let mut removed = 0;
        for key in keys {
            if store.entries.remove(key).is_some() {
                removed += 1;
            }
            store.bump(key);
        }
        drop(store);

        tracing::debug!(
            keys = %keys.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
            removed,
            "invalidated queries"
        );
        removed
    }

    pub fn clear(&self) {
        let mut store = self.store.lock();
        store.entries.clear();
        store.epoch += 1;
        drop(store);
        tracing::debug!("query cache cleared");
    }

    /// Serve `key` from the cache, or run `fetcher` and cache its result.
    ///
    /// Concurrent fetches of one key share a single request: later callers
    /// wait for the first and read its cached result. Retryable errors are
    /// retried per `options.retry`; the last error is returned unchanged.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.get::<T>(&key) {
            tracing::trace!(%key, "query served from cache");
            return Ok(value);
        }

        let gate = self
            .in_flight
            .lock()
            .entry(key.clone())
            .or_default()
            .clone();

        let result = {
            let _turn = gate.lock().await;
            match self.get::<T>(&key) {
                Some(value) => {
                    tracing::trace!(%key, "query served by a concurrent fetch");
                    Ok(value)
                }
                None => self.fetch_uncached(&key, options, fetcher).await,
            }
        };

        let mut in_flight = self.in_flight.lock();
        // one reference in the map, one here: nobody else is waiting
        if Arc::strong_count(&gate) <= 2 {
            in_flight.remove(&key);
        }
        result
    }

    async fn fetch_uncached<T, F, Fut>(
        &self,
        key: &QueryKey,
        options: &QueryOptions,
        mut fetcher: F,
    ) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let generation = self.store.lock().generation(key);

        let mut attempt = 0;
        let value = loop {
            match fetcher().await {
                Ok(value) => break value,
                Err(err) if attempt < options.retry.retries && err.is_retryable() => {
                    let delay = options.retry.delay(attempt);
                    attempt += 1;
                    tracing::debug!(%key, attempt, ?delay, "query failed, retrying: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        };

        let mut store = self.store.lock();
        if store.generation(key) == generation {
            store
                .entries
                .insert(key.clone(), Arc::new(value.clone()), options.stale_time);
        } else {
            drop(store);
            tracing::debug!(%key, "query invalidated while in flight, result not cached");
        }
        Ok(value)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QUERY_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use reqwest::StatusCode;

    use super::*;

    fn server_error() -> ApiError {
        ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        }
    }

    fn quick_retries(retries: u32) -> QueryOptions {
        QueryOptions {
            stale_time: Duration::from_secs(60),
            retry: RetryPolicy {
                retries,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(10), Duration::from_secs(30));
    }

    #[test]
    fn invalidate_removes_only_the_given_keys() {
        let cache = QueryCache::default();
        let a = QueryKey::Track(TrackId::from("a"));
        let b = QueryKey::Track(TrackId::from("b"));
        cache.set(a.clone(), 1u32, Duration::from_secs(60));
        cache.set(b.clone(), 2u32, Duration::from_secs(60));

        assert_eq!(cache.invalidate(&[a.clone(), QueryKey::UserFavorites]), 1);
        assert!(!cache.contains(&a));
        assert_eq!(cache.get::<u32>(&b), Some(2));
    }

    #[test]
    fn wrong_type_reads_as_miss() {
        let cache = QueryCache::default();
        cache.set(QueryKey::UserFavorites, 7u32, Duration::from_secs(60));
        assert_eq!(cache.get::<String>(&QueryKey::UserFavorites), None);
    }

    #[tokio::test]
    async fn fresh_results_are_not_refetched() -> Result<(), ApiError> {
        let cache = QueryCache::default();
        let calls = AtomicU32::new(0);
        let options = quick_retries(0);

        for _ in 0..3 {
            let value = cache
                .fetch(QueryKey::UserFavorites, &options, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ApiError>(42u32)
                })
                .await?;
            assert_eq!(value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn expired_results_are_refetched() -> Result<(), ApiError> {
        let cache = QueryCache::default();
        let calls = AtomicU32::new(0);
        let options = QueryOptions {
            stale_time: Duration::from_millis(10),
            ..quick_retries(0)
        };
        let fetch = || async {
            Ok::<_, ApiError>(calls.fetch_add(1, Ordering::SeqCst))
        };

        assert_eq!(cache.fetch(QueryKey::UserFavorites, &options, fetch).await?, 0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.fetch(QueryKey::UserFavorites, &options, fetch).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_fetches_share_one_request() -> Result<(), ApiError> {
        let cache = QueryCache::default();
        let calls = AtomicU32::new(0);
        let options = quick_retries(0);
        let fetcher = || async {
            tokio::task::yield_now().await;
            Ok::<_, ApiError>(calls.fetch_add(1, Ordering::SeqCst))
        };

        let (first, second) = tokio::join!(
            cache.fetch(QueryKey::UserFavorites, &options, fetcher),
            cache.fetch(QueryKey::UserFavorites, &options, fetcher),
        );

        assert_eq!((first?, second?), (0, 0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.in_flight.lock().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn result_invalidated_in_flight_is_not_cached() -> Result<(), ApiError> {
        let cache = QueryCache::default();
        let key = QueryKey::Track(TrackId::from("t"));

        let value = cache
            .fetch(key.clone(), &quick_retries(0), || async {
                cache.invalidate(&[QueryKey::Track(TrackId::from("t"))]);
                Ok::<_, ApiError>(1u32)
            })
            .await?;
        assert_eq!(value, 1);
        assert!(!cache.contains(&key));

        let value = cache
            .fetch(key.clone(), &quick_retries(0), || async {
                cache.clear();
                Ok::<_, ApiError>(2u32)
            })
            .await?;
        assert_eq!(value, 2);
        assert!(!cache.contains(&key));

        cache.fetch(key.clone(), &quick_retries(0), || async { Ok::<_, ApiError>(3u32) }).await?;
        assert_eq!(cache.get::<u32>(&key), Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn transient_failures_are_retried() -> Result<(), ApiError> {
        let cache = QueryCache::default();
        let calls = AtomicU32::new(0);

        let value = cache
            .fetch(QueryKey::UserFavorites, &quick_retries(3), || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(server_error())
                } else {
                    Ok("ok".to_string())
                }
            })
            .await?;

        assert_eq!(value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn client_errors_fail_without_retry_or_caching() {
        let cache = QueryCache::default();
        let calls = AtomicU32::new(0);

        let result = cache
            .fetch(QueryKey::UserFavorites, &quick_retries(3), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(ApiError::Status {
                    status: StatusCode::NOT_FOUND,
                    body: String::new(),
                })
            })
            .await;

        assert_eq!(result.unwrap_err().status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!cache.contains(&QueryKey::UserFavorites));
    }
}
