//! Refresh scheduler: priming, then the steady-state loop.
//!
//! ```text
//! start()
//!   └─ prime      sync remotes (caller's drift policy) → index all → publish
//!        │        sync, index or store failure: start() returns Err
//!        │        encode failure: logged, nothing published, still ready
//!        ▼
//!   RefreshHandle (ready)
//!        │
//!        └─ run   loop { sleep(interval); cycle() }
//!                 cycle: resync changed remotes (Force) → index all → publish
//!                 failures are logged and counted, the loop keeps going
//! ```
//!
//! Every cycle rebuilds all repositories from disk and replaces the published
//! snapshot with one `set`. Readers see the previous snapshot until that
//! `set` lands.

use crate::config::ServerConfig;
use crate::index::{self, IndexError, RepoSource};
use crate::mirror::{DriftPolicy, Mirrors, SyncError};
use crate::snapshot::{self, PublishReport};
use crate::store::{CacheStore, StoreError};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Pause between steady-state cycles.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("sync of {origin} failed: {source}")]
    Sync {
        origin: String,
        #[source]
        source: SyncError,
    },
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("indexing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("snapshot publication failed: {0}")]
    Store(#[from] StoreError),
}

/// Counters shared between the refresh loop and whoever holds the handle.
#[derive(Debug, Default)]
pub struct RefreshStats {
    cycles: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
    resynced: AtomicU64,
    sync_failures: AtomicU64,
}

impl RefreshStats {
    /// Steady-state cycles started. Priming is not a cycle.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Snapshots written, priming included.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Cycles that ended without publishing.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Remote repositories re-synced because they had changed.
    pub fn resynced(&self) -> u64 {
        self.resynced.load(Ordering::Relaxed)
    }

    /// Change checks or re-syncs that failed; the stale mirror was indexed.
    pub fn sync_failures(&self) -> u64 {
        self.sync_failures.load(Ordering::Relaxed)
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Display for RefreshStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles, {} published, {} failed",
            self.cycles(),
            self.published(),
            self.failed()
        )?;
        if self.resynced() > 0 || self.sync_failures() > 0 {
            write!(
                f,
                " ({} resynced, {} sync errors)",
                self.resynced(),
                self.sync_failures()
            )?;
        }
        Ok(())
    }
}

/// Owns everything a refresh needs: where content lives and where it goes.
pub struct Refresher {
    mirrors: Mirrors,
    remotes: Vec<String>,
    sources: Vec<RepoSource>,
    store: Arc<dyn CacheStore>,
    interval: Duration,
    background: bool,
    stats: Arc<RefreshStats>,
}

impl Refresher {
    pub fn new(config: &ServerConfig, store: Arc<dyn CacheStore>) -> Self {
        let mirrors = Mirrors::new(&config.mirrors_dir);
        let sources = config.sources(&mirrors);
        Self {
            remotes: config.remote_repos.iter().map(|r| r.url.clone()).collect(),
            sources,
            mirrors,
            store,
            interval: REFRESH_INTERVAL,
            background: config.background_refresh,
            stats: Arc::new(RefreshStats::default()),
        }
    }

    /// Override the steady-state interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn stats(&self) -> Arc<RefreshStats> {
        Arc::clone(&self.stats)
    }

    /// Sync every remote with `policy`, index everything, publish.
    pub async fn prime(&self, policy: &DriftPolicy) -> Result<PublishReport, RefreshError> {
        for origin in &self.remotes {
            let outcome = self
                .mirrors
                .sync(origin, policy)
                .await
                .map_err(|source| RefreshError::Sync {
                    origin: origin.clone(),
                    source,
                })?;
            tracing::info!(origin = %origin, %outcome, "mirror synced");
        }
        self.index_and_publish().await
    }

    /// One steady-state pass.
    ///
    /// Remotes whose mirror is dirty or behind upstream are re-synced with
    /// [`DriftPolicy::Force`]. A sync problem only means the stale mirror gets
    /// indexed; indexing or publication problems fail the cycle.
    pub async fn cycle(&self) -> Result<PublishReport, RefreshError> {
        for origin in &self.remotes {
            let changed = match self.changed(origin).await {
                Ok(changed) => changed,
                Err(e) => {
                    tracing::warn!(origin = %origin, error = %e, "change check failed, forcing sync");
                    true
                }
            };
            if !changed {
                tracing::debug!(origin = %origin, "mirror up to date");
                continue;
            }
            match self.mirrors.sync(origin, &DriftPolicy::Force).await {
                Ok(outcome) => {
                    RefreshStats::bump(&self.stats.resynced);
                    tracing::info!(origin = %origin, %outcome, "mirror re-synced");
                }
                Err(e) => {
                    RefreshStats::bump(&self.stats.sync_failures);
                    tracing::warn!(origin = %origin, error = %e, "sync failed, indexing stale mirror");
                }
            }
        }
        self.index_and_publish().await
    }

    async fn changed(&self, origin: &str) -> Result<bool, SyncError> {
        if self.mirrors.has_changes(origin).await? {
            return Ok(true);
        }
        self.mirrors.is_behind(origin).await
    }

    async fn index_and_publish(&self) -> Result<PublishReport, RefreshError> {
        let sources = self.sources.clone();
        let repos = tokio::task::spawn_blocking(move || index::index_all(&sources)).await??;
        let encoded = snapshot::encode(&repos)?;
        let report = snapshot::publish(self.store.as_ref(), &repos, encoded).await?;
        RefreshStats::bump(&self.stats.published);
        Ok(report)
    }

    /// Steady-state loop. Never returns.
    pub async fn run(self: Arc<Self>) {
        loop {
            tokio::time::sleep(self.interval).await;
            RefreshStats::bump(&self.stats.cycles);
            match self.cycle().await {
                Ok(report) => tracing::info!(%report, "refresh cycle complete"),
                Err(e) => {
                    RefreshStats::bump(&self.stats.failed);
                    tracing::error!(error = %e, "refresh cycle failed, keeping previous snapshot");
                }
            }
            tracing::debug!(stats = %self.stats, "refresh stats");
        }
    }

    /// Prime, then spawn the steady-state loop when background refresh is
    /// enabled. Returning `Ok` is the readiness signal.
    pub async fn start(self, policy: DriftPolicy) -> Result<RefreshHandle, RefreshError> {
        let primed = priming_outcome(self.prime(&policy).await)?;
        if let Some(report) = &primed {
            tracing::info!(%report, "priming complete");
        }

        let stats = self.stats();
        let task = if self.background {
            tracing::info!(interval = ?self.interval, "background refresh enabled");
            Some(tokio::spawn(Arc::new(self).run()))
        } else {
            None
        };

        Ok(RefreshHandle {
            primed,
            stats,
            task,
        })
    }
}

/// Decide whether a priming failure stops startup.
///
/// An unencodable snapshot is logged and skipped; everything else is fatal.
fn priming_outcome(
    result: Result<PublishReport, RefreshError>,
) -> Result<Option<PublishReport>, RefreshError> {
    match result {
        Ok(report) => Ok(Some(report)),
        Err(RefreshError::Encode(e)) => {
            tracing::error!(error = %e, "snapshot encoding failed during priming, nothing published");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Proof that priming finished, plus access to the running loop.
#[derive(Debug)]
pub struct RefreshHandle {
    primed: Option<PublishReport>,
    stats: Arc<RefreshStats>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// What priming published, if encoding the snapshot succeeded.
    pub fn primed(&self) -> Option<&PublishReport> {
        self.primed.as_ref()
    }

    pub fn stats(&self) -> &RefreshStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocalRepo;
    use crate::store::{MemoryStore, SNAPSHOT_KEY};
    use crate::test_helpers::multilingual_repo;
    use std::fs;
    use std::path::Path;

    fn local_config(path: &Path, background: bool) -> ServerConfig {
        ServerConfig {
            background_refresh: background,
            local_repos: vec![LocalRepo {
                id: "docs".into(),
                path: path.to_string_lossy().to_string(),
                root_path: "articles".into(),
                fallback_lang: String::new(),
            }],
            ..ServerConfig::default()
        }
    }

    // =========================================================================
    // Priming
    // =========================================================================

    #[tokio::test]
    async fn prime_publishes_snapshot() {
        let tmp = multilingual_repo();
        let store = Arc::new(MemoryStore::new(None));
        let refresher = Refresher::new(&local_config(tmp.path(), false), store.clone());

        let report = refresher.prime(&DriftPolicy::Keep).await.unwrap();

        assert_eq!(report.repos, 1);
        assert_eq!(report.articles, 4);
        let bytes = store.get(SNAPSHOT_KEY).await.unwrap().unwrap();
        let repos = snapshot::decode(&bytes).unwrap();
        assert_eq!(repos[0].id, "docs");
        assert_eq!(repos[0].languages, vec!["en", "it"]);
        assert_eq!(refresher.stats().published(), 1);
    }

    #[tokio::test]
    async fn prime_fails_without_articles() {
        let tmp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("articles")).unwrap();
        let store = Arc::new(MemoryStore::new(None));
        let refresher = Refresher::new(&local_config(tmp.path(), false), store.clone());

        let result = refresher.prime(&DriftPolicy::Keep).await;

        assert!(matches!(
            result,
            Err(RefreshError::Index(IndexError::NoArticles(_)))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn prime_fails_when_remote_cannot_be_cloned() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = ServerConfig {
            mirrors_dir: tmp.path().join("mirrors").to_string_lossy().to_string(),
            remote_repos: vec![crate::config::RemoteRepo {
                id: "gone".into(),
                url: tmp.path().join("missing-origin").to_string_lossy().to_string(),
                root_path: "articles".into(),
                fallback_lang: String::new(),
            }],
            ..ServerConfig::default()
        };
        let store = Arc::new(MemoryStore::new(None));
        let refresher = Refresher::new(&config, store.clone());

        let result = refresher.prime(&DriftPolicy::Force).await;

        assert!(matches!(result, Err(RefreshError::Sync { .. })));
        assert!(store.is_empty());
    }

    // =========================================================================
    // Cycles
    // =========================================================================

    #[tokio::test]
    async fn unchanged_content_republishes_identical_bytes() {
        let tmp = multilingual_repo();
        let store = Arc::new(MemoryStore::new(None));
        let refresher = Refresher::new(&local_config(tmp.path(), false), store.clone());

        let first = refresher.prime(&DriftPolicy::Keep).await.unwrap();
        let second = refresher.cycle().await.unwrap();

        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.bytes, second.bytes);
    }

    #[tokio::test]
    async fn cycle_picks_up_new_content() {
        let tmp = multilingual_repo();
        let store = Arc::new(MemoryStore::new(None));
        let refresher = Refresher::new(&local_config(tmp.path(), false), store.clone());
        let first = refresher.prime(&DriftPolicy::Keep).await.unwrap();

        crate::test_helpers::write_article(
            &tmp.path().join("articles/it"),
            "intro.md",
            "Title: Introduzione",
            "Ciao",
        );
        let second = refresher.cycle().await.unwrap();

        assert_eq!(second.articles, first.articles + 1);
        assert_ne!(first.fingerprint, second.fingerprint);
    }

    #[tokio::test]
    async fn failed_cycle_keeps_previous_snapshot() {
        let tmp = multilingual_repo();
        let store = Arc::new(MemoryStore::new(None));
        let refresher = Refresher::new(&local_config(tmp.path(), false), store.clone());
        refresher.prime(&DriftPolicy::Keep).await.unwrap();
        let before = store.get(SNAPSHOT_KEY).await.unwrap();

        fs::write(tmp.path().join("articles/en/broken.md"), "Title: no body").unwrap();
        let result = refresher.cycle().await;

        assert!(matches!(result, Err(RefreshError::Index(IndexError::Parse(_)))));
        assert_eq!(store.get(SNAPSHOT_KEY).await.unwrap(), before);
    }

    // =========================================================================
    // start / steady-state loop
    // =========================================================================

    #[tokio::test]
    async fn start_without_background_has_no_loop() {
        let tmp = multilingual_repo();
        let store = Arc::new(MemoryStore::new(None));
        let handle = Refresher::new(&local_config(tmp.path(), false), store)
            .start(DriftPolicy::Keep)
            .await
            .unwrap();

        assert!(!handle.is_running());
        assert_eq!(handle.primed().map(|r| r.repos), Some(1));
        assert_eq!(handle.stats().published(), 1);
    }

    #[tokio::test]
    async fn background_loop_counts_failures_and_continues() {
        let tmp = multilingual_repo();
        let store = Arc::new(MemoryStore::new(None));
        let handle = Refresher::new(&local_config(tmp.path(), true), store.clone())
            .with_interval(Duration::from_millis(20))
            .start(DriftPolicy::Keep)
            .await
            .unwrap();
        assert!(handle.is_running());
        let primed = store.get(SNAPSHOT_KEY).await.unwrap();

        fs::write(tmp.path().join("articles/en/broken.md"), "no separator").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(handle.stats().failed() >= 1);
        assert!(handle.is_running());
        assert_eq!(store.get(SNAPSHOT_KEY).await.unwrap(), primed);

        fs::remove_file(tmp.path().join("articles/en/broken.md")).unwrap();
        let published = handle.stats().published();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.stats().published() > published);
    }

    #[test]
    fn priming_skips_encode_failures_only() {
        let report = PublishReport {
            repos: 1,
            articles: 2,
            bytes: 3,
            fingerprint: "abc".into(),
        };
        assert_eq!(priming_outcome(Ok(report.clone())).unwrap(), Some(report));

        let encode = serde_json::from_str::<u8>("not json").unwrap_err();
        assert!(matches!(
            priming_outcome(Err(RefreshError::Encode(encode))),
            Ok(None)
        ));

        let missing = IndexError::NoArticles("docs".into());
        assert!(matches!(
            priming_outcome(Err(RefreshError::Index(missing))),
            Err(RefreshError::Index(_))
        ));
    }

    #[test]
    fn stats_display() {
        let stats = RefreshStats::default();
        RefreshStats::bump(&stats.cycles);
        RefreshStats::bump(&stats.cycles);
        RefreshStats::bump(&stats.published);
        RefreshStats::bump(&stats.failed);
        assert_eq!(stats.to_string(), "2 cycles, 1 published, 1 failed");

        RefreshStats::bump(&stats.resynced);
        assert_eq!(
            stats.to_string(),
            "2 cycles, 1 published, 1 failed (1 resynced, 0 sync errors)"
        );
    }
}
