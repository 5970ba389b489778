//! Periodic write-behind flush.
//!
//! Each cycle snapshots the pending list length, commits that prefix to the
//! relational store in one bulk insert and then trims exactly the committed
//! prefix. Users appended while a cycle runs stay queued for the next one.
//!
//! Cycles never overlap: a local mutex covers triggers inside one process
//! and a lease in the key-value store covers every process sharing it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use uuid::Uuid;

use usercache_core::cache::{KeyValueStore, FLUSH_LEASE_KEY, USERS_DEAD_KEY, USERS_PENDING_KEY};
use usercache_core::flush::{snapshot_range, FlushBatch};
use usercache_core::storage::UserRepository;

use super::deadline::bounded;
use super::error::{Result, ServiceError};
use super::read_cache::ReadCache;

/// Lease lifetime in multiples of the store timeout. A cycle makes a handful
/// of bounded calls, so this leaves room for all of them.
const LEASE_TIMEOUTS: u32 = 10;

/// What a single flush cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FlushOutcome {
    /// The pending list was empty.
    Empty,
    /// Another cycle was already running, here or in another process.
    Skipped,
    /// The batch was committed and trimmed from the pending list.
    #[serde(rename_all = "camelCase")]
    Committed {
        /// Queue entries removed by the trim.
        batch: u64,
        /// Rows the store actually inserted (redelivered rows are ignored).
        inserted: u64,
        /// Entries moved to the dead-letter list because they could not be decoded.
        malformed: u64,
    },
}

/// Drains the pending list into the relational store on a fixed period.
pub struct FlushScheduler {
    store: Arc<dyn KeyValueStore>,
    repository: Arc<dyn UserRepository>,
    read_cache: Arc<ReadCache>,
    period: Duration,
    timeout: Duration,
    lease_ttl: Duration,
    flush_on_shutdown: bool,
    running: Mutex<()>,
}

impl FlushScheduler {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        repository: Arc<dyn UserRepository>,
        read_cache: Arc<ReadCache>,
        period: Duration,
        timeout: Duration,
        flush_on_shutdown: bool,
    ) -> Self {
        Self {
            store,
            repository,
            read_cache,
            period,
            timeout,
            lease_ttl: timeout * LEASE_TIMEOUTS,
            flush_on_shutdown,
            running: Mutex::new(()),
        }
    }

    /// Overrides how long a cycle may hold the cross-process lease.
    pub fn with_lease_ttl(mut self, lease_ttl: Duration) -> Self {
        self.lease_ttl = lease_ttl;
        self
    }

    /// Runs one flush cycle now, unless one is already in progress.
    pub async fn flush_once(&self) -> Result<FlushOutcome> {
        let Ok(_guard) = self.running.try_lock() else {
            tracing::debug!("Flush already in progress, skipping trigger");
            return Ok(FlushOutcome::Skipped);
        };
        self.run_cycle().await
    }

    /// Takes the lease, runs the cycle and releases the lease.
    async fn run_cycle(&self) -> Result<FlushOutcome> {
        let token = Uuid::new_v4().to_string();
        // Measured from before the request, since the TTL starts server-side.
        let leased_at = Instant::now();
        let acquired = bounded(
            "acquire flush lease",
            self.timeout,
            self.store
                .set_nx_px(FLUSH_LEASE_KEY, token.as_bytes(), self.lease_ttl),
            ServiceError::Queue,
        )
        .await?;
        if !acquired {
            tracing::debug!("Flush lease held by another instance, skipping cycle");
            return Ok(FlushOutcome::Skipped);
        }

        let result = self.run_leased_cycle(leased_at).await;

        match bounded(
            "release flush lease",
            self.timeout,
            self.store.delete_if_equals(FLUSH_LEASE_KEY, token.as_bytes()),
            ServiceError::Queue,
        )
        .await
        {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Flush lease expired before release"),
            Err(err) => tracing::warn!(error = %err, "Failed to release flush lease"),
        }

        result
    }

    async fn run_leased_cycle(&self, leased_at: Instant) -> Result<FlushOutcome> {
        let len = bounded(
            "read pending length",
            self.timeout,
            self.store.llen(USERS_PENDING_KEY),
            ServiceError::Queue,
        )
        .await?;
        if len == 0 {
            tracing::trace!("No pending users to flush");
            return Ok(FlushOutcome::Empty);
        }

        let (start, stop) = snapshot_range(len);
        let entries = bounded(
            "read pending batch",
            self.timeout,
            self.store.lrange(USERS_PENDING_KEY, start, stop),
            ServiceError::Queue,
        )
        .await?;

        let batch = FlushBatch::from_entries(&entries);

        let inserted = if batch.rows().is_empty() {
            0
        } else {
            bounded(
                "bulk insert users",
                self.timeout,
                self.repository.insert_batch(batch.rows()),
                ServiceError::Store,
            )
            .await?
        };

        // Committed rows must become visible even if the trim below fails:
        // a redelivered batch inserts nothing and would not invalidate again.
        if inserted > 0 {
            if let Err(err) = self.read_cache.invalidate().await {
                tracing::warn!(error = %err, "Failed to invalidate users snapshot after flush");
            }
        }

        for entry in batch.malformed() {
            tracing::warn!(
                index = entry.index,
                error = %entry.error,
                "Moving undecodable pending entry to dead-letter list"
            );
            bounded(
                "park undecodable entry",
                self.timeout,
                self.store.rpush(USERS_DEAD_KEY, &entry.payload),
                ServiceError::Queue,
            )
            .await?;
        }

        // Another instance may take over once the lease lapses, so only trim
        // while the lease is certain to outlive the trim call.
        let held = leased_at.elapsed();
        if held + self.timeout > self.lease_ttl {
            return Err(ServiceError::LeaseExpired { held });
        }

        let (start, stop) = batch.trim_range();
        bounded(
            "trim pending batch",
            self.timeout,
            self.store.ltrim(USERS_PENDING_KEY, start, stop),
            ServiceError::Queue,
        )
        .await?;

        tracing::info!(
            batch = batch.covered(),
            inserted,
            malformed = batch.malformed().len(),
            "Flushed pending users"
        );

        Ok(FlushOutcome::Committed {
            batch: batch.covered(),
            inserted,
            malformed: batch.malformed().len() as u64,
        })
    }

    /// Runs a cycle on behalf of the periodic loop, logging the result.
    async fn tick(&self) {
        match self.flush_once().await {
            Ok(outcome) => tracing::trace!(?outcome, "Flush cycle finished"),
            Err(err) => tracing::error!(error = %err, "Flush cycle failed, batch left queued"),
        }
    }

    /// Spawns the periodic loop. The first cycle runs one full period after
    /// this call.
    ///
    /// Dropping the returned handle without calling [`FlushHandle::stop`]
    /// also ends the loop, but skips the final drain.
    pub fn start(self: Arc<Self>) -> FlushHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(period_secs = self.period.as_secs(), "Flush scheduler started");

            let drain = loop {
                tokio::select! {
                    _ = interval.tick() => self.tick().await,
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break false;
                        }
                        if *shutdown_rx.borrow() {
                            break self.flush_on_shutdown;
                        }
                    }
                }
            };

            if drain {
                // Wait for any manual cycle instead of skipping the drain.
                let _guard = self.running.lock().await;
                match self.run_cycle().await {
                    Ok(outcome) => tracing::info!(?outcome, "Final flush finished"),
                    Err(err) => tracing::error!(error = %err, "Final flush failed"),
                }
            }

            tracing::info!("Flush scheduler stopped");
        });

        FlushHandle { shutdown, task }
    }
}

/// Handle to a running flush loop.
pub struct FlushHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FlushHandle {
    /// Signals the loop to stop and waits for it, including the final drain.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "Flush scheduler task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use usercache_core::cache::{deserialize_user, USERS_ALL_KEY};
    use usercache_core::users::User;

    use crate::service::testing::{InsertGate, MockRepository, MockStore};
    use crate::service::write_buffer::WriteBuffer;

    struct Fixture {
        store: Arc<MockStore>,
        repo: Arc<MockRepository>,
        buffer: WriteBuffer,
        read_cache: Arc<ReadCache>,
        scheduler: Arc<FlushScheduler>,
    }

    fn fixture_on(
        store: MockStore,
        repo: MockRepository,
        timeout: Duration,
        period: Duration,
    ) -> Fixture {
        let store = Arc::new(store);
        let repo = Arc::new(repo);
        let read_cache = Arc::new(ReadCache::new(
            repo.clone(),
            store.clone(),
            Duration::from_secs(3600),
            timeout,
        ));
        let scheduler = Arc::new(FlushScheduler::new(
            store.clone(),
            repo.clone(),
            read_cache.clone(),
            period,
            timeout,
            true,
        ));
        Fixture {
            buffer: WriteBuffer::new(store.clone(), timeout),
            store,
            repo,
            read_cache,
            scheduler,
        }
    }

    fn fixture_with(repo: MockRepository, timeout: Duration, period: Duration) -> Fixture {
        fixture_on(MockStore::new(), repo, timeout, period)
    }

    fn fixture(repo: MockRepository) -> Fixture {
        fixture_with(repo, Duration::from_secs(5), Duration::from_secs(3600))
    }

    async fn committed_names(repo: &MockRepository) -> Vec<String> {
        repo.find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect()
    }

    async fn enqueue_all(buffer: &WriteBuffer, names: &[&str]) {
        for name in names {
            buffer.enqueue(name).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_empty_queue_is_a_noop() {
        let f = fixture(MockRepository::new());

        let outcome = f.scheduler.flush_once().await.unwrap();

        assert_eq!(outcome, FlushOutcome::Empty);
        assert_eq!(f.repo.insert_count(), 0);
    }

    #[tokio::test]
    async fn test_flush_commits_pending_users_in_order() {
        let f = fixture(MockRepository::new());
        enqueue_all(&f.buffer, &["Ada", "Grace", "Linus"]).await;

        let outcome = f.scheduler.flush_once().await.unwrap();

        assert_eq!(
            outcome,
            FlushOutcome::Committed {
                batch: 3,
                inserted: 3,
                malformed: 0
            }
        );
        assert_eq!(f.buffer.pending_len().await.unwrap(), 0);
        let names: Vec<String> = f
            .repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Ada", "Grace", "Linus"]);
    }

    #[tokio::test]
    async fn test_append_during_commit_survives_trim() {
        let gate = Arc::new(InsertGate::default());
        let f = fixture(MockRepository::new().with_gate(gate.clone()));
        enqueue_all(&f.buffer, &["a", "b", "c"]).await;

        let scheduler = f.scheduler.clone();
        let cycle = tokio::spawn(async move { scheduler.flush_once().await });

        gate.entered.notified().await;
        let late = f.buffer.enqueue("d").await.unwrap();
        gate.release.notify_one();

        let outcome = cycle.await.unwrap().unwrap();
        assert!(matches!(outcome, FlushOutcome::Committed { batch: 3, .. }));

        assert_eq!(f.buffer.pending_len().await.unwrap(), 1);
        let remaining = f.store.lrange(USERS_PENDING_KEY, 0, -1).await.unwrap();
        assert_eq!(deserialize_user(&remaining[0]).unwrap(), late);
        assert_eq!(f.repo.find_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_trigger_during_active_cycle_is_skipped() {
        let gate = Arc::new(InsertGate::default());
        let f = fixture(MockRepository::new().with_gate(gate.clone()));
        enqueue_all(&f.buffer, &["a"]).await;

        let scheduler = f.scheduler.clone();
        let cycle = tokio::spawn(async move { scheduler.flush_once().await });
        gate.entered.notified().await;

        let second = f.scheduler.flush_once().await.unwrap();
        assert_eq!(second, FlushOutcome::Skipped);

        gate.release.notify_one();
        let first = cycle.await.unwrap().unwrap();
        assert!(matches!(first, FlushOutcome::Committed { .. }));
        assert_eq!(f.repo.insert_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_queue_intact() {
        let f = fixture(MockRepository::new());
        enqueue_all(&f.buffer, &["a", "b"]).await;
        f.repo.fail_inserts.store(true, Ordering::SeqCst);

        let result = f.scheduler.flush_once().await;

        assert!(matches!(result, Err(ServiceError::Store(_))));
        assert_eq!(f.buffer.pending_len().await.unwrap(), 2);

        f.repo.fail_inserts.store(false, Ordering::SeqCst);
        f.scheduler.flush_once().await.unwrap();
        assert_eq!(f.buffer.pending_len().await.unwrap(), 0);
        assert_eq!(f.repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_slow_commit_times_out_without_trim() {
        let f = fixture_with(
            MockRepository::new().with_insert_delay(Duration::from_millis(500)),
            Duration::from_millis(50),
            Duration::from_secs(3600),
        );
        enqueue_all(&f.buffer, &["a", "b", "c"]).await;

        let result = f.scheduler.flush_once().await;

        assert!(matches!(
            result,
            Err(ServiceError::Timeout {
                operation: "bulk insert users",
                ..
            })
        ));
        assert_eq!(f.buffer.pending_len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_malformed_entries_are_trimmed() {
        let f = fixture(MockRepository::new());
        f.buffer.enqueue("Ada").await.unwrap();
        f.store.rpush(USERS_PENDING_KEY, b"garbage").await.unwrap();
        f.buffer.enqueue("Grace").await.unwrap();

        let outcome = f.scheduler.flush_once().await.unwrap();

        assert_eq!(
            outcome,
            FlushOutcome::Committed {
                batch: 3,
                inserted: 2,
                malformed: 1
            }
        );
        assert_eq!(f.buffer.pending_len().await.unwrap(), 0);
        assert_eq!(
            f.store.lrange(USERS_DEAD_KEY, 0, -1).await.unwrap(),
            vec![b"garbage".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_only_malformed_entries_skip_the_insert() {
        let f = fixture(MockRepository::new());
        f.store.rpush(USERS_PENDING_KEY, b"garbage").await.unwrap();

        let outcome = f.scheduler.flush_once().await.unwrap();

        assert!(matches!(
            outcome,
            FlushOutcome::Committed { inserted: 0, malformed: 1, .. }
        ));
        assert_eq!(f.repo.insert_count(), 0);
        assert_eq!(f.buffer.pending_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_flush_invalidates_users_snapshot() {
        let f = fixture(MockRepository::new());
        assert!(f.read_cache.get_all().await.unwrap().is_empty());
        assert!(f.store.get(USERS_ALL_KEY).await.unwrap().is_some());

        enqueue_all(&f.buffer, &["Ada"]).await;
        f.scheduler.flush_once().await.unwrap();

        assert!(f.store.get(USERS_ALL_KEY).await.unwrap().is_none());
        assert_eq!(f.read_cache.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_periodic_loop_flushes() {
        let f = fixture_with(
            MockRepository::new(),
            Duration::from_secs(5),
            Duration::from_millis(50),
        );
        enqueue_all(&f.buffer, &["a", "b"]).await;

        let handle = f.scheduler.clone().start();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(f.buffer.pending_len().await.unwrap(), 0);
        assert_eq!(f.repo.find_all().await.unwrap().len(), 2);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_loop_survives_failed_cycle() {
        let f = fixture_with(
            MockRepository::new(),
            Duration::from_secs(5),
            Duration::from_millis(50),
        );
        f.repo.fail_inserts.store(true, Ordering::SeqCst);
        enqueue_all(&f.buffer, &["a"]).await;

        let handle = f.scheduler.clone().start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(f.buffer.pending_len().await.unwrap(), 1);

        f.repo.fail_inserts.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(f.buffer.pending_len().await.unwrap(), 0);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_drains_queue() {
        let f = fixture(MockRepository::new());
        let handle = f.scheduler.clone().start();
        enqueue_all(&f.buffer, &["a", "b", "c"]).await;

        handle.stop().await;

        assert_eq!(f.buffer.pending_len().await.unwrap(), 0);
        assert_eq!(f.repo.find_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_first_cycle_waits_one_period() {
        let f = fixture(MockRepository::new());
        enqueue_all(&f.buffer, &["a"]).await;

        let handle = f.scheduler.clone().start();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(f.repo.insert_count(), 0);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_dead_letter_failure_leaves_batch_queued() {
        let f = fixture(MockRepository::new());
        f.store.rpush(USERS_PENDING_KEY, b"garbage").await.unwrap();
        f.store.fail_appends.store(true, Ordering::SeqCst);

        let result = f.scheduler.flush_once().await;

        assert!(matches!(result, Err(ServiceError::Queue(_))));
        assert_eq!(f.buffer.pending_len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_trim_failure_still_invalidates_snapshot() {
        let f = fixture(MockRepository::new());
        assert!(f.read_cache.get_all().await.unwrap().is_empty());
        enqueue_all(&f.buffer, &["Ada"]).await;
        f.store.fail_trims.store(true, Ordering::SeqCst);

        let result = f.scheduler.flush_once().await;

        assert!(matches!(result, Err(ServiceError::Queue(_))));
        assert_eq!(f.buffer.pending_len().await.unwrap(), 1);
        assert!(f.store.get(USERS_ALL_KEY).await.unwrap().is_none());
        assert_eq!(f.read_cache.get_all().await.unwrap().len(), 1);

        // The redelivered batch inserts nothing but is still trimmed.
        f.store.fail_trims.store(false, Ordering::SeqCst);
        let outcome = f.scheduler.flush_once().await.unwrap();
        assert!(matches!(outcome, FlushOutcome::Committed { inserted: 0, .. }));
        assert_eq!(f.buffer.pending_len().await.unwrap(), 0);
        assert_eq!(f.repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_schedulers_sharing_a_store_never_overlap() {
        let gate = Arc::new(InsertGate::default());
        let a = fixture(MockRepository::new().with_gate(gate.clone()));
        let b = fixture_on(
            a.store.sharing(),
            MockRepository::new(),
            Duration::from_secs(5),
            Duration::from_secs(3600),
        );
        enqueue_all(&a.buffer, &["a", "b", "c"]).await;

        let scheduler = a.scheduler.clone();
        let cycle = tokio::spawn(async move { scheduler.flush_once().await });
        gate.entered.notified().await;

        assert_eq!(b.scheduler.flush_once().await.unwrap(), FlushOutcome::Skipped);
        enqueue_all(&b.buffer, &["d", "e", "f"]).await;

        gate.release.notify_one();
        let outcome = cycle.await.unwrap().unwrap();
        assert!(matches!(outcome, FlushOutcome::Committed { batch: 3, .. }));
        assert_eq!(a.buffer.pending_len().await.unwrap(), 3);

        let outcome = b.scheduler.flush_once().await.unwrap();
        assert!(matches!(outcome, FlushOutcome::Committed { batch: 3, .. }));
        assert_eq!(a.buffer.pending_len().await.unwrap(), 0);

        assert_eq!(committed_names(&a.repo).await, vec!["a", "b", "c"]);
        assert_eq!(committed_names(&b.repo).await, vec!["d", "e", "f"]);
    }

    #[tokio::test]
    async fn test_lease_is_released_after_each_cycle() {
        let f = fixture(MockRepository::new());
        enqueue_all(&f.buffer, &["a"]).await;
        f.scheduler.flush_once().await.unwrap();

        enqueue_all(&f.buffer, &["b"]).await;
        f.repo.fail_inserts.store(true, Ordering::SeqCst);
        assert!(f.scheduler.flush_once().await.is_err());

        assert!(f
            .store
            .set_nx_px(FLUSH_LEASE_KEY, b"other", Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_lease_held_elsewhere_skips_cycle() {
        let f = fixture(MockRepository::new());
        enqueue_all(&f.buffer, &["a"]).await;
        f.store
            .set_nx_px(FLUSH_LEASE_KEY, b"other", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(f.scheduler.flush_once().await.unwrap(), FlushOutcome::Skipped);
        assert_eq!(f.repo.insert_count(), 0);

        // Our cycle must not release a lease it does not own.
        assert!(f
            .store
            .delete_if_equals(FLUSH_LEASE_KEY, b"other")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_cycle_outliving_its_lease_does_not_trim() {
        let store = MockStore::new().with_list_read_delay(Duration::from_millis(70));
        let repo = MockRepository::new().with_insert_delay(Duration::from_millis(70));
        let mut f = fixture_on(
            store,
            repo,
            Duration::from_millis(100),
            Duration::from_secs(3600),
        );
        f.scheduler = Arc::new(
            FlushScheduler::new(
                f.store.clone(),
                f.repo.clone(),
                f.read_cache.clone(),
                Duration::from_secs(3600),
                Duration::from_millis(100),
                true,
            )
            .with_lease_ttl(Duration::from_millis(200)),
        );
        enqueue_all(&f.buffer, &["a", "b", "c"]).await;

        let result = f.scheduler.flush_once().await;

        assert!(matches!(result, Err(ServiceError::LeaseExpired { .. })));
        assert_eq!(f.buffer.pending_len().await.unwrap(), 3);
        let queued: Vec<User> = f
            .store
            .lrange(USERS_PENDING_KEY, 0, -1)
            .await
            .unwrap()
            .iter()
            .map(|bytes| deserialize_user(bytes).unwrap())
            .collect();
        assert_eq!(queued.len(), 3);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(FlushOutcome::Committed {
            batch: 3,
            inserted: 2,
            malformed: 1,
        })
        .unwrap();

        assert_eq!(json["status"], "committed");
        assert_eq!(json["inserted"], 2);
        assert_eq!(
            serde_json::to_value(FlushOutcome::Empty).unwrap()["status"],
            "empty"
        );
    }
}
