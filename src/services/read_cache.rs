use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    fetched_at: Instant,
}

/// Cache-and-revalidate store for admin reads, keyed by the full request URL.
#[derive(Clone)]
pub struct ReadCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    dedupe: Duration,
}

impl ReadCache {
    pub fn new(dedupe: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            dedupe,
        }
    }

    /// Fresh entries are served as is. Stale entries are served immediately
    /// while a background fetch replaces them. Misses are fetched and stored.
    pub async fn read<F, Fut>(&self, key: &str, fetch: F) -> Result<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let cached = self.entries.read().await.get(key).cloned();
        match cached {
            Some(entry) if entry.fetched_at.elapsed() < self.dedupe => Ok(entry.value),
            Some(entry) => {
                let entries = self.entries.clone();
                let key = key.to_string();
                let pending = fetch();
                tokio::spawn(async move {
                    match pending.await {
                        Ok(value) => store(&entries, key, value).await,
                        Err(e) => tracing::warn!(key = %key, error = %e, "Background revalidation failed"),
                    }
                });
                Ok(entry.value)
            }
            None => {
                let value = fetch().await?;
                store(&self.entries, key.to_string(), value.clone()).await;
                Ok(value)
            }
        }
    }

    /// Re-fetches every cached key starting with `prefix` and replaces it.
    /// Keys whose re-fetch fails are dropped so the next read goes upstream.
    pub async fn revalidate_prefix<F, Fut>(&self, prefix: &str, fetch: F)
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        for key in self.keys_with_prefix(prefix).await {
            match fetch(key.clone()).await {
                Ok(value) => store(&self.entries, key, value).await,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Revalidation failed, evicting");
                    self.entries.write().await.remove(&key);
                }
            }
        }
    }

    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

async fn store(entries: &RwLock<HashMap<String, CacheEntry>>, key: String, value: Value) {
    entries.write().await.insert(
        key,
        CacheEntry {
            value,
            fetched_at: Instant::now(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: Value,
    ) -> impl Future<Output = Result<Value>> + Send + 'static {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(value) }
    }

    #[tokio::test]
    async fn fresh_entries_are_not_refetched() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .read("http://api/Quiz?page=1", || counting_fetch(&calls, json!({"totalCount": 1})))
            .await
            .unwrap();
        let second = cache
            .read("http://api/Quiz?page=1", || counting_fetch(&calls, json!({"totalCount": 2})))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_entries_are_served_then_replaced() {
        let cache = ReadCache::new(Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .read("k", || counting_fetch(&calls, json!(1)))
            .await
            .unwrap();
        let served = cache
            .read("k", || counting_fetch(&calls, json!(2)))
            .await
            .unwrap();
        assert_eq!(served, json!(1));

        for _ in 0..50 {
            if cache.entries.read().await.get("k").map(|e| e.value.clone()) == Some(json!(2)) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.entries.read().await["k"].value, json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn miss_errors_are_not_cached() {
        let cache = ReadCache::new(Duration::from_secs(60));
        let res = cache
            .read("k", || async { Err(Error::Internal("down".to_string())) })
            .await;
        assert!(res.is_err());
        assert!(cache.keys_with_prefix("k").await.is_empty());
    }

    #[tokio::test]
    async fn revalidate_prefix_touches_only_matching_keys() {
        let cache = ReadCache::new(Duration::from_secs(60));
        for key in ["http://api/Quiz?page=1", "http://api/Quiz?page=2", "http://api/Question/quiz/x"] {
            cache.read(key, || async { Ok(json!("old")) }).await.unwrap();
        }

        cache
            .revalidate_prefix("http://api/Quiz", |key| async move {
                if key.ends_with("page=2") {
                    Err(Error::Internal("gone".to_string()))
                } else {
                    Ok(json!("new"))
                }
            })
            .await;

        let entries = cache.entries.read().await;
        assert_eq!(entries["http://api/Quiz?page=1"].value, json!("new"));
        assert!(!entries.contains_key("http://api/Quiz?page=2"));
        assert_eq!(entries["http://api/Question/quiz/x"].value, json!("old"));
    }
}
