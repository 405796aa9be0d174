use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::key::QueryKey;

/// Cached value for one query key
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    fetched_at: Instant,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.fetched_at.elapsed() < stale_time
    }
}

/// Type-erased store of query results
///
/// A lookup with a different type than was stored behaves like a miss.
#[derive(Default)]
pub(crate) struct QueryCache {
    entries: DashMap<QueryKey, Entry>,
}

impl QueryCache {
    /// Value for `key` if it is younger than `stale_time` and not invalidated
    pub fn fresh<T>(&self, key: &QueryKey, stale_time: Duration) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entry = self.entries.get(key)?;
        if !entry.is_fresh(stale_time) {
            return None;
        }

        entry.value.downcast_ref::<T>().cloned()
    }

    /// Value for `key` regardless of age
    pub fn any<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.entries.get(key)?.value.downcast_ref::<T>().cloned()
    }

    pub fn insert<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.entries.insert(
            key,
            Entry {
                value: Arc::new(value),
                fetched_at: Instant::now(),
                invalidated: false,
            },
        );
    }

    /// Mark every entry under `prefix` stale, returning how many matched
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut count = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().starts_with(prefix) {
                entry.invalidated = true;
                count += 1;
            }
        }
        count
    }

    /// Drop every entry under `prefix`, returning how many were removed
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
