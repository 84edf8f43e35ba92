use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use tracing::{error, warn};

use crate::config::QueryConfig;
use crate::das::models::CompressedNft;
use crate::das::{DasClient, DasError};
use crate::retry::RetryPolicy;

/// Where owner asset lists come from. Implemented by [`DasClient`].
pub trait AssetSource: Send + Sync {
    fn is_configured(&self) -> bool;

    fn assets_by_owner(
        &self,
        owner: &str,
    ) -> impl Future<Output = Result<Vec<CompressedNft>, DasError>> + Send;
}

impl AssetSource for DasClient {
    fn is_configured(&self) -> bool {
        DasClient::is_configured(self)
    }

    fn assets_by_owner(
        &self,
        owner: &str,
    ) -> impl Future<Output = Result<Vec<CompressedNft>, DasError>> + Send {
        self.get_assets_by_owner(owner)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetsSnapshot {
    pub assets: Vec<CompressedNft>,
    pub fetched_at: DateTime<Utc>,
}

impl AssetsSnapshot {
    fn now(assets: Vec<CompressedNft>) -> Self {
        Self {
            assets,
            fetched_at: Utc::now(),
        }
    }

    pub fn is_stale(&self, stale_time: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        age.to_std().is_ok_and(|age| age >= stale_time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
}

impl From<DasError> for QueryError {
    fn from(err: DasError) -> Self {
        let message = err.to_string();
        Self {
            message: if message.is_empty() {
                "Failed to fetch compressed NFTs".to_string()
            } else {
                message
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
    /// No owner supplied; nothing was fetched.
    Disabled,
    Success(Arc<AssetsSnapshot>),
    /// `placeholder` is the last good result for the owner, if still retained.
    Error {
        error: QueryError,
        placeholder: Option<Arc<AssetsSnapshot>>,
    },
}

impl QueryState {
    pub fn data(&self) -> Option<&[CompressedNft]> {
        match self {
            QueryState::Success(snapshot) => Some(&snapshot.assets),
            QueryState::Error {
                placeholder: Some(snapshot),
                ..
            } => Some(&snapshot.assets),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&QueryError> {
        match self {
            QueryState::Error { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Owner-scoped cNFT lookups with freshness, retention and retry.
pub struct OwnerAssetsQuery<S> {
    source: S,
    cache: Cache<String, Arc<AssetsSnapshot>>,
    stale_time: Duration,
    retry: RetryPolicy,
}

impl<S: AssetSource> OwnerAssetsQuery<S> {
    pub fn new(source: S, config: &QueryConfig) -> Self {
        assert!(config.max_capacity >= 1, "Query cache capacity must be positive");
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.retention())
            .build();

        Self {
            source,
            cache,
            stale_time: config.stale_time(),
            retry: config.retry,
        }
    }

    /// Fresh cached data is returned as-is; anything else triggers a fetch.
    pub async fn fetch(&self, owner: Option<&str>) -> QueryState {
        let Some(owner) = owner.map(str::trim).filter(|o| !o.is_empty()) else {
            return QueryState::Disabled;
        };

        let cached = self.cache.get(owner).await;
        if let Some(snapshot) = &cached {
            if !snapshot.is_stale(self.stale_time, Utc::now()) {
                return QueryState::Success(Arc::clone(snapshot));
            }
        }

        match self.refetch(owner).await {
            Ok(snapshot) => QueryState::Success(snapshot),
            Err(error) => QueryState::Error {
                error,
                placeholder: cached,
            },
        }
    }

    /// Bypasses freshness. On failure the previous entry stays cached.
    pub async fn refetch(&self, owner: &str) -> Result<Arc<AssetsSnapshot>, QueryError> {
        if !self.source.is_configured() {
            warn!("Helius API key not configured, returning no cNFTs");
            let snapshot = Arc::new(AssetsSnapshot::now(Vec::new()));
            self.cache.insert(owner.to_string(), Arc::clone(&snapshot)).await;
            return Ok(snapshot);
        }

        let assets = self
            .retry
            .run("cNFT fetch", || self.source.assets_by_owner(owner))
            .await
            .map_err(|err| {
                error!("Failed to fetch cNFTs: {err}");
                QueryError::from(err)
            })?;

        let snapshot = Arc::new(AssetsSnapshot::now(assets));
        self.cache.insert(owner.to_string(), Arc::clone(&snapshot)).await;
        Ok(snapshot)
    }

    /// Last retained result for `owner`, stale or not.
    pub async fn cached(&self, owner: &str) -> Option<Arc<AssetsSnapshot>> {
        self.cache.get(owner).await
    }

    pub async fn invalidate(&self, owner: &str) {
        self.cache.invalidate(owner).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedSource {
        configured: bool,
        calls: AtomicU32,
        script: Mutex<VecDeque<Result<Vec<CompressedNft>, String>>>,
    }

    impl ScriptedSource {
        fn new(configured: bool, script: Vec<Result<Vec<CompressedNft>, String>>) -> Self {
            Self {
                configured,
                calls: AtomicU32::new(0),
                script: Mutex::new(script.into()),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AssetSource for ScriptedSource {
        fn is_configured(&self) -> bool {
            self.configured
        }

        fn assets_by_owner(
            &self,
            _owner: &str,
        ) -> impl Future<Output = Result<Vec<CompressedNft>, DasError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()));
            async move {
                next.map_err(|message| DasError::Api {
                    code: None,
                    message,
                })
            }
        }
    }

    fn nft(id: &str) -> CompressedNft {
        CompressedNft {
            id: id.to_string(),
            mint: id.to_string(),
            name: "Plot".to_string(),
            symbol: String::new(),
            description: None,
            image: "/placeholder-nft.png".to_string(),
            attributes: None,
            tree: "Tree1".to_string(),
            leaf_id: 0,
            owner: "Owner1".to_string(),
        }
    }

    fn fast_config(stale_time_ms: u64) -> QueryConfig {
        QueryConfig {
            stale_time_ms,
            retry: RetryPolicy {
                max_retries: 2,
                base_delay_ms: 1,
                max_delay_ms: 2,
            },
            ..QueryConfig::default()
        }
    }

    #[tokio::test]
    async fn missing_owner_disables_the_query() {
        let query = OwnerAssetsQuery::new(ScriptedSource::new(true, vec![]), &fast_config(30_000));
        assert_eq!(query.fetch(None).await, QueryState::Disabled);
        assert_eq!(query.fetch(Some("  ")).await, QueryState::Disabled);
        assert_eq!(query.source.calls(), 0);
    }

    #[tokio::test]
    async fn unconfigured_source_short_circuits_to_empty() {
        let query = OwnerAssetsQuery::new(ScriptedSource::new(false, vec![]), &fast_config(30_000));
        let state = query.fetch(Some("Owner1")).await;
        assert_eq!(state.data(), Some(&[][..]));
        assert_eq!(query.source.calls(), 0);
    }

    #[tokio::test]
    async fn fresh_results_are_served_from_cache() {
        let source = ScriptedSource::new(true, vec![Ok(vec![nft("A")])]);
        let query = OwnerAssetsQuery::new(source, &fast_config(30_000));

        let first = query.fetch(Some("Owner1")).await;
        let second = query.fetch(Some("Owner1")).await;
        assert_eq!(first, second);
        assert_eq!(second.data().unwrap()[0].id, "A");
        assert_eq!(query.source.calls(), 1);
    }

    #[tokio::test]
    async fn cache_is_scoped_by_owner() {
        let source = ScriptedSource::new(true, vec![Ok(vec![nft("A")]), Ok(vec![nft("B")])]);
        let query = OwnerAssetsQuery::new(source, &fast_config(30_000));

        let a = query.fetch(Some("Owner1")).await;
        let b = query.fetch(Some("Owner2")).await;
        assert_eq!(a.data().unwrap()[0].id, "A");
        assert_eq!(b.data().unwrap()[0].id, "B");
        assert_eq!(query.source.calls(), 2);
    }

    #[tokio::test]
    async fn stale_results_are_refetched() {
        let source = ScriptedSource::new(true, vec![Ok(vec![nft("A")]), Ok(vec![nft("B")])]);
        let query = OwnerAssetsQuery::new(source, &fast_config(0));

        query.fetch(Some("Owner1")).await;
        let second = query.fetch(Some("Owner1")).await;
        assert_eq!(second.data().unwrap()[0].id, "B");
        assert_eq!(query.source.calls(), 2);
    }

    #[tokio::test]
    async fn recovers_within_retry_budget() {
        let source = ScriptedSource::new(
            true,
            vec![Err("timeout".into()), Err("timeout".into()), Ok(vec![nft("A")])],
        );
        let query = OwnerAssetsQuery::new(source, &fast_config(30_000));

        let state = query.fetch(Some("Owner1")).await;
        assert_eq!(state.data().unwrap().len(), 1);
        assert_eq!(query.source.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts_with_last_message() {
        let source = ScriptedSource::new(
            true,
            vec![
                Err("first".into()),
                Err("second".into()),
                Err("third".into()),
                Ok(vec![nft("never")]),
            ],
        );
        let query = OwnerAssetsQuery::new(source, &fast_config(30_000));

        let state = query.fetch(Some("Owner1")).await;
        assert_eq!(state.error().unwrap().message, "third");
        assert!(state.data().is_none());
        assert_eq!(query.source.calls(), 3);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_previous_data_as_placeholder() {
        let source = ScriptedSource::new(
            true,
            vec![Ok(vec![nft("A")]), Err("e1".into()), Err("e2".into()), Err("e3".into())],
        );
        let query = OwnerAssetsQuery::new(source, &fast_config(0));

        query.fetch(Some("Owner1")).await;
        let state = query.fetch(Some("Owner1")).await;
        assert_eq!(state.error().unwrap().message, "e3");
        assert_eq!(state.data().unwrap()[0].id, "A");
        assert!(query.cached("Owner1").await.is_some());
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_fetch() {
        let source = ScriptedSource::new(true, vec![Ok(vec![nft("A")]), Ok(vec![])]);
        let query = OwnerAssetsQuery::new(source, &fast_config(30_000));

        query.fetch(Some("Owner1")).await;
        query.invalidate("Owner1").await;
        let state = query.fetch(Some("Owner1")).await;
        assert_eq!(state.data(), Some(&[][..]));
        assert_eq!(query.source.calls(), 2);
    }

    #[test]
    fn staleness_is_measured_from_fetch_time() {
        let snapshot = AssetsSnapshot::now(Vec::new());
        let window = Duration::from_secs(30);
        assert!(!snapshot.is_stale(window, snapshot.fetched_at));
        assert!(!snapshot.is_stale(window, snapshot.fetched_at + chrono::Duration::seconds(29)));
        assert!(snapshot.is_stale(window, snapshot.fetched_at + chrono::Duration::seconds(30)));
    }
}
