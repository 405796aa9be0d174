use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tether_config::QueryConfig;
use tether_core::ApiError;

use crate::cache::QueryCache;
use crate::key::QueryKey;
use crate::policy::QueryPolicy;

/// Keyed query cache driving fetches through the retry policy
///
/// Cheap to clone; clones share one cache. Concurrent fetches of the same
/// key are not merged.
#[derive(Clone, Default)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    policy: QueryPolicy,
    cache: QueryCache,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

impl QueryClient {
    pub fn new(policy: QueryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                policy,
                cache: QueryCache::default(),
            }),
        }
    }

    pub fn from_config(config: &QueryConfig) -> Self {
        Self::new(QueryPolicy::from(config))
    }

    pub fn policy(&self) -> &QueryPolicy {
        &self.inner.policy
    }

    /// Return fresh cached data or run `fetcher` until it succeeds or the
    /// policy gives up
    ///
    /// A successful result replaces the cache entry. On failure the last
    /// error is returned and the cache is left untouched.
    pub async fn fetch<T, E, F, Fut>(&self, key: impl Into<QueryKey>, fetcher: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Error + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = key.into();

        if let Some(value) = self.inner.cache.fresh::<T>(&key, self.inner.policy.stale_time) {
            tracing::trace!(%key, "query served from cache");
            return Ok(value);
        }

        let value = self.fetch_with_retry(&key, fetcher).await?;
        self.inner.cache.insert(key, value.clone());

        Ok(value)
    }

    async fn fetch_with_retry<T, E, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<T, E>
    where
        E: Error + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let policy = &self.inner.policy;
        let mut failure_count = 0;

        loop {
            let error = match fetcher().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !policy.should_retry(failure_count, &error) {
                tracing::debug!(%key, attempts = failure_count + 1, %error, "query failed");
                return Err(error);
            }

            let delay = policy.retry_delay(failure_count);
            failure_count += 1;

            tracing::debug!(
                %key,
                failure_count,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                %error,
                "retrying query"
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Cached data for `key`, stale or not
    pub fn cached<T>(&self, key: impl Into<QueryKey>) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner.cache.any(&key.into())
    }

    /// Store data as if it had just been fetched
    pub fn set<T>(&self, key: impl Into<QueryKey>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.inner.cache.insert(key.into(), value);
    }

    /// Mark every query under `prefix` stale so the next fetch goes out
    pub fn invalidate(&self, prefix: impl Into<QueryKey>) -> usize {
        let prefix = prefix.into();
        let count = self.inner.cache.invalidate(&prefix);
        tracing::debug!(%prefix, count, "invalidated queries");
        count
    }

    /// Drop every query under `prefix`
    pub fn remove(&self, prefix: impl Into<QueryKey>) -> usize {
        self.inner.cache.remove(&prefix.into())
    }

    pub fn clear(&self) {
        self.inner.cache.clear();
    }

    /// Application regained focus
    ///
    /// Invalidates every query when `refetch_on_focus` is set and does
    /// nothing otherwise. Returns how many queries were invalidated.
    pub fn focus_regained(&self) -> usize {
        if !self.inner.policy.refetch_on_focus {
            return 0;
        }

        self.invalidate(QueryKey::default())
    }

    /// Run a mutation once
    ///
    /// Mutations are never retried. A failure carrying an [`ApiError`] is
    /// logged with its full problem document.
    pub async fn mutate<T, E, F, Fut>(&self, op: F) -> Result<T, E>
    where
        E: Error + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let result = op().await;

        if let Err(error) = &result {
            log_mutation_error(error);
        }

        result
    }
}

fn log_mutation_error(error: &(dyn Error + 'static)) {
    if let Some(api) = error.downcast_ref::<ApiError>() {
        tracing::error!(error = %api.to_json(), "mutation failed");
    } else {
        tracing::debug!(%error, "mutation failed");
    }
}
