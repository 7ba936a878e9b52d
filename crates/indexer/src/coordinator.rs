use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Durable per-repository indexing state, persisted by an external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryIndexRecord {
    pub repo_full_name: String,
    pub last_indexed_at_unix_ms: u64,
    pub last_commit_sha: String,
}

/// Persistence collaborator for [`RepositoryIndexRecord`]s.
#[async_trait]
pub trait RepositoryIndexStore: Send + Sync {
    async fn get_repository_index(&self, repo: &str) -> Result<Option<RepositoryIndexRecord>>;
    async fn upsert_repository_index(&self, record: RepositoryIndexRecord) -> Result<()>;
}

/// In-memory store; the default for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryIndexStore {
    records: Mutex<HashMap<String, RepositoryIndexRecord>>,
}

impl MemoryIndexStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryIndexStore for MemoryIndexStore {
    async fn get_repository_index(&self, repo: &str) -> Result<Option<RepositoryIndexRecord>> {
        Ok(self.records.lock().await.get(repo).cloned())
    }

    async fn upsert_repository_index(&self, record: RepositoryIndexRecord) -> Result<()> {
        self.records
            .lock()
            .await
            .insert(record.repo_full_name.clone(), record);
        Ok(())
    }
}

/// Supplies the current head commit for a repository.
#[async_trait]
pub trait CommitProvider: Send + Sync {
    async fn head_commit(&self, repo: &str) -> Result<String>;
}

/// The unit of background work: one full indexing run for a repository at a
/// commit. Implementations typically wrap `RepoIndexer::index_repo` plus
/// whatever persistence the deployment wants for the output.
#[async_trait]
pub trait IndexRunner: Send + Sync {
    async fn run(&self, repo_key: &str, commit_ref: &str) -> Result<()>;
}

/// Adapter so closures can serve as runners.
pub struct RunnerFn<F>(pub F);

#[async_trait]
impl<F, Fut> IndexRunner for RunnerFn<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn run(&self, repo_key: &str, commit_ref: &str) -> Result<()> {
        (self.0)(repo_key.to_string(), commit_ref.to_string()).await
    }
}

/// Outcome of a `start` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new background run was launched
    Started,
    /// A run for this repository is already in flight
    AlreadyRunning,
    /// The requested commit is already indexed
    UpToDate,
}

/// Options for a `start` request
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Bypass both the in-flight and the stale-commit short-circuits
    pub force: bool,
}

/// Deduplicating coordinator for background indexing runs.
///
/// One instance owns the in-flight map; there is no module-level global.
/// Inject the coordinator wherever background indexing is triggered. The map
/// deduplicates, it does not throttle: concurrent runs for *different*
/// repositories proceed independently.
///
/// Runs are fire-and-forget: failures inside a run are logged, bookkeeping
/// (in-flight removal + record upsert) happens regardless of outcome, and
/// nothing propagates to the caller that triggered the run.
pub struct IndexCoordinator {
    runner: Arc<dyn IndexRunner>,
    store: Arc<dyn RepositoryIndexStore>,
    active: Arc<Mutex<HashMap<String, usize>>>,
}

impl IndexCoordinator {
    #[must_use]
    pub fn new(runner: Arc<dyn IndexRunner>, store: Arc<dyn RepositoryIndexStore>) -> Self {
        Self {
            runner,
            store,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Request a background indexing run for `repo_key` at `commit_ref`.
    ///
    /// Short-circuits (idempotent no-ops, not errors):
    /// - a run for `repo_key` is already in flight and `force` is false;
    /// - the persisted record already carries `commit_ref` and `force` is
    ///   false.
    pub async fn start(
        &self,
        repo_key: &str,
        commit_ref: &str,
        options: StartOptions,
    ) -> StartOutcome {
        {
            // Hold the lock across the staleness probe so two concurrent
            // start() calls cannot both pass the checks and both launch.
            let mut active = self.active.lock().await;

            if !options.force {
                if active.contains_key(repo_key) {
                    log::debug!("Indexing of {repo_key} already in flight; skipping");
                    return StartOutcome::AlreadyRunning;
                }

                match self.store.get_repository_index(repo_key).await {
                    Ok(Some(record)) if record.last_commit_sha == commit_ref => {
                        log::debug!("{repo_key} already indexed at {commit_ref}; skipping");
                        return StartOutcome::UpToDate;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // Treat an unreadable record as absent; worst case is
                        // an extra run, never a missed one.
                        log::warn!("Could not read index record for {repo_key}: {e}");
                    }
                }
            }

            *active.entry(repo_key.to_string()).or_insert(0) += 1;
        }

        let runner = self.runner.clone();
        let store = self.store.clone();
        let active = self.active.clone();
        let repo = repo_key.to_string();
        let commit = commit_ref.to_string();

        tokio::spawn(async move {
            if let Err(e) = runner.run(&repo, &commit).await {
                log::error!("Background indexing of {repo} failed: {e}");
            }

            // Bookkeeping happens whether the run succeeded or failed.
            {
                let mut active = active.lock().await;
                if let Some(count) = active.get_mut(&repo) {
                    *count -= 1;
                    if *count == 0 {
                        active.remove(&repo);
                    }
                }
            }

            let record = RepositoryIndexRecord {
                repo_full_name: repo.clone(),
                last_indexed_at_unix_ms: unix_ms_now(),
                last_commit_sha: commit,
            };
            if let Err(e) = store.upsert_repository_index(record).await {
                log::error!("Failed to record indexing run for {repo}: {e}");
            }
        });

        StartOutcome::Started
    }

    /// Resolve the repository's head commit, then delegate to [`start`].
    ///
    /// [`start`]: IndexCoordinator::start
    pub async fn start_for_head(
        &self,
        repo_key: &str,
        commits: &dyn CommitProvider,
        options: StartOptions,
    ) -> Result<StartOutcome> {
        let head = commits.head_commit(repo_key).await.map_err(|e| {
            IndexerError::Other(format!("head commit lookup for {repo_key} failed: {e}"))
        })?;
        Ok(self.start(repo_key, &head, options).await)
    }

    /// Is a run currently in flight for this repository?
    pub async fn is_indexing(&self, repo_key: &str) -> bool {
        self.active.lock().await.contains_key(repo_key)
    }

    /// True iff no run is in flight and a persisted record exists.
    pub async fn is_complete(&self, repo_key: &str) -> bool {
        if self.is_indexing(repo_key).await {
            return false;
        }
        matches!(
            self.store.get_repository_index(repo_key).await,
            Ok(Some(_))
        )
    }

    /// Repository keys with runs currently in flight.
    pub async fn list_active(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.active.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct CountingRunner {
        runs: AtomicUsize,
        release: Arc<Notify>,
        fail: bool,
    }

    impl CountingRunner {
        fn new(fail: bool) -> (Arc<Self>, Arc<Notify>) {
            let release = Arc::new(Notify::new());
            let runner = Arc::new(Self {
                runs: AtomicUsize::new(0),
                release: release.clone(),
                fail,
            });
            (runner, release)
        }
    }

    #[async_trait]
    impl IndexRunner for CountingRunner {
        async fn run(&self, _repo_key: &str, _commit_ref: &str) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            if self.fail {
                Err(IndexerError::Other("synthetic failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// Release the runner (repeatedly, to sidestep lost notifications) and
    /// wait for the repository to leave the in-flight map.
    async fn release_and_wait(coordinator: &IndexCoordinator, release: &Notify, repo: &str) {
        for _ in 0..500 {
            if !coordinator.is_indexing(repo).await {
                return;
            }
            release.notify_one();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        panic!("coordinator never went idle for {repo}");
    }

    #[tokio::test]
    async fn concurrent_starts_dedupe_to_one_run() {
        let (runner, release) = CountingRunner::new(false);
        let store = Arc::new(MemoryIndexStore::new());
        let coordinator = Arc::new(IndexCoordinator::new(runner.clone(), store));

        let a = coordinator.clone();
        let b = coordinator.clone();
        let (first, second) = tokio::join!(
            a.start("acme/widgets", "abc123", StartOptions::default()),
            b.start("acme/widgets", "abc123", StartOptions::default()),
        );

        let outcomes = [first, second];
        assert!(outcomes.contains(&StartOutcome::Started));
        assert!(outcomes.contains(&StartOutcome::AlreadyRunning));

        release_and_wait(&coordinator, &release, "acme/widgets").await;
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_commit_short_circuits() {
        let (runner, release) = CountingRunner::new(false);
        let store = Arc::new(MemoryIndexStore::new());
        let coordinator = IndexCoordinator::new(runner.clone(), store);

        assert_eq!(
            coordinator
                .start("acme/widgets", "abc123", StartOptions::default())
                .await,
            StartOutcome::Started
        );
        release_and_wait(&coordinator, &release, "acme/widgets").await;

        // Same commit again: skipped without touching the runner.
        assert_eq!(
            coordinator
                .start("acme/widgets", "abc123", StartOptions::default())
                .await,
            StartOutcome::UpToDate
        );
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);

        // New commit: runs again.
        assert_eq!(
            coordinator
                .start("acme/widgets", "def456", StartOptions::default())
                .await,
            StartOutcome::Started
        );
        release_and_wait(&coordinator, &release, "acme/widgets").await;
        assert_eq!(runner.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn force_bypasses_both_short_circuits() {
        let (runner, release) = CountingRunner::new(false);
        let store = Arc::new(MemoryIndexStore::new());
        let coordinator = IndexCoordinator::new(runner.clone(), store);

        coordinator
            .start("acme/widgets", "abc123", StartOptions::default())
            .await;
        release_and_wait(&coordinator, &release, "acme/widgets").await;

        assert_eq!(
            coordinator
                .start("acme/widgets", "abc123", StartOptions { force: true })
                .await,
            StartOutcome::Started
        );
        release_and_wait(&coordinator, &release, "acme/widgets").await;
        assert_eq!(runner.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn bookkeeping_happens_even_when_the_run_fails() {
        let (runner, release) = CountingRunner::new(true);
        let store = Arc::new(MemoryIndexStore::new());
        let coordinator = IndexCoordinator::new(runner, store.clone());

        coordinator
            .start("acme/widgets", "abc123", StartOptions::default())
            .await;
        assert!(coordinator.is_indexing("acme/widgets").await);
        assert!(!coordinator.is_complete("acme/widgets").await);

        release_and_wait(&coordinator, &release, "acme/widgets").await;

        let record = store
            .get_repository_index("acme/widgets")
            .await
            .unwrap()
            .expect("record upserted despite failure");
        assert_eq!(record.last_commit_sha, "abc123");
        assert!(record.last_indexed_at_unix_ms > 0);
        assert!(coordinator.is_complete("acme/widgets").await);
    }

    #[tokio::test]
    async fn list_active_reflects_in_flight_runs() {
        let (runner, release) = CountingRunner::new(false);
        let store = Arc::new(MemoryIndexStore::new());
        let coordinator = IndexCoordinator::new(runner, store);

        coordinator
            .start("acme/widgets", "abc123", StartOptions::default())
            .await;
        coordinator
            .start("acme/gadgets", "fff999", StartOptions::default())
            .await;

        let active = coordinator.list_active().await;
        assert_eq!(active, vec!["acme/gadgets", "acme/widgets"]);

        release_and_wait(&coordinator, &release, "acme/widgets").await;
        release_and_wait(&coordinator, &release, "acme/gadgets").await;
        assert!(coordinator.list_active().await.is_empty());
    }

    struct StaticCommits;

    #[async_trait]
    impl CommitProvider for StaticCommits {
        async fn head_commit(&self, _repo: &str) -> Result<String> {
            Ok("head789".to_string())
        }
    }

    #[tokio::test]
    async fn start_for_head_uses_the_provider() {
        let (runner, release) = CountingRunner::new(false);
        let store = Arc::new(MemoryIndexStore::new());
        let coordinator = IndexCoordinator::new(runner, store.clone());

        let outcome = coordinator
            .start_for_head("acme/widgets", &StaticCommits, StartOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome, StartOutcome::Started);

        release_and_wait(&coordinator, &release, "acme/widgets").await;
        let record = store
            .get_repository_index("acme/widgets")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.last_commit_sha, "head789");
    }
}
