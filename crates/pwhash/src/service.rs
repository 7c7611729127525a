//! Injectable hashing service.
//!
//! [`HashService`] owns every piece of shared state (ID allocator, result
//! store, running average, dispatcher, shutdown coordinator) behind an
//! [`Arc`], so a host can clone it into each request handler and tests can
//! build isolated instances.
//!
//! ## Operations
//!
//! - [`submit`](HashService::submit): allocate an ID, schedule the deferred
//!   hash, return the ID immediately.
//! - [`fetch`](HashService::fetch) / [`fetch_raw`](HashService::fetch_raw):
//!   read a finished digest; pending, unknown and malformed IDs all read as
//!   `None`.
//! - [`stats`](HashService::stats): completed count and average latency.
//! - [`trigger_shutdown`](HashService::trigger_shutdown): stop the listener
//!   after the processing delay.

use crate::{
    Digest, Dispatcher, RequestId, RequestIdAllocator, Result, ResultStore, RunningAverage,
    ShutdownCoordinator, SleepProvider, Stats, TokioSleep,
};
use core::time::Duration;
use std::sync::Arc;

/// Default wait before a request is hashed or a shutdown takes effect.
pub const DEFAULT_PROCESSING_DELAY: Duration = Duration::from_secs(5);

/// Tunables for a [`HashService`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashConfig {
    /// Delay applied to every hash request and to the shutdown trigger.
    pub processing_delay: Duration,
    /// The first accepted request receives `initial_request_id + 1`.
    pub initial_request_id: u64,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            processing_delay: DEFAULT_PROCESSING_DELAY,
            initial_request_id: 0,
        }
    }
}

struct Inner<S> {
    ids: RequestIdAllocator,
    store: Arc<ResultStore>,
    stats: Arc<RunningAverage>,
    dispatcher: Dispatcher<S>,
    shutdown: ShutdownCoordinator<S>,
}

/// Cloneable handle to the password hashing core.
pub struct HashService<S = TokioSleep> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for HashService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for HashService<TokioSleep> {
    fn default() -> Self {
        Self::new(HashConfig::default())
    }
}

impl<S> HashService<S>
where
    S: SleepProvider + 'static,
{
    pub fn new(config: HashConfig) -> Self {
        let store = Arc::new(ResultStore::new());
        let stats = Arc::new(RunningAverage::new());
        Self::with_parts(config, store, stats)
    }

    /// Builds a service around existing state, e.g. a pre-seeded
    /// [`RunningAverage`].
    pub fn with_parts(
        config: HashConfig,
        store: Arc<ResultStore>,
        stats: Arc<RunningAverage>,
    ) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&stats),
            config.processing_delay,
        );
        Self {
            inner: Arc::new(Inner {
                ids: RequestIdAllocator::new(config.initial_request_id),
                store,
                stats,
                dispatcher,
                shutdown: ShutdownCoordinator::new(config.processing_delay),
            }),
        }
    }

    /// Accepts a hash request and returns its ID without waiting for the
    /// digest.
    ///
    /// Must be called from within a Tokio runtime.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(id)))]
    pub fn submit(&self, password: impl Into<String>) -> RequestId {
        let id = self.inner.ids.next();

        #[cfg(feature = "tracing")]
        {
            tracing::Span::current().record("id", id.to_raw());
            tracing::info!(%id, "accepted hash request");
        }

        self.inner.dispatcher.dispatch(id, password.into());
        id
    }

    /// Returns the digest for `id` once its deferred task has stored it.
    pub fn fetch(&self, id: RequestId) -> Option<Digest> {
        self.inner.store.get(id)
    }

    /// Like [`fetch`](Self::fetch), but parses the ID first.
    ///
    /// A malformed ID reads the same as an unknown one.
    pub fn fetch_raw(&self, raw: &str) -> Option<Digest> {
        match raw.parse::<RequestId>() {
            Ok(id) => self.fetch(id),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("{_e}");
                None
            }
        }
    }

    /// Completed request count and average processing time.
    pub fn stats(&self) -> Stats {
        self.inner.stats.snapshot()
    }

    /// Schedules the listener to stop after the processing delay.
    ///
    /// Returns `false` if a shutdown was already scheduled or signalled.
    pub fn trigger_shutdown(&self) -> bool {
        self.inner.shutdown.trigger()
    }

    /// Stops the listener without waiting for the processing delay.
    pub fn shutdown_now(&self) {
        self.inner.shutdown.shutdown_now();
    }

    /// Resolves once the listener should stop accepting connections.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        self.inner.shutdown.cancelled()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_shutting_down()
    }

    /// Number of accepted requests whose digest is not stored yet.
    pub fn in_flight(&self) -> usize {
        self.inner.dispatcher.in_flight()
    }

    /// Waits for accepted requests to finish, up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DrainTimeout`] if work is still pending when
    /// the deadline passes.
    pub async fn drain(&self, timeout: Duration) -> Result<()> {
        self.inner.dispatcher.drain(timeout).await
    }

    pub fn processing_delay(&self) -> Duration {
        self.inner.dispatcher.delay()
    }

    /// Raw value of the most recently allocated ID.
    pub fn last_request_id(&self) -> u64 {
        self.inner.ids.last()
    }

    pub fn stored_results(&self) -> usize {
        self.inner.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NoSleep, hash_password};
    use futures::future::join_all;
    use std::collections::HashSet;

    fn paused_service(initial_request_id: u64) -> HashService {
        HashService::new(HashConfig {
            processing_delay: Duration::from_secs(5),
            initial_request_id,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn submit_returns_next_id_immediately() {
        let service = paused_service(4);
        let start = tokio::time::Instant::now();
        let id = service.submit("angryMonkey");

        assert_eq!(id, RequestId::new(5));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(service.fetch(id), None);
        assert_eq!(service.stats(), Stats { total: 0, average: 0 });
        assert_eq!(service.in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn digest_visible_after_delay_and_stable() {
        let service = paused_service(0);
        let id = service.submit("angryMonkey");

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        assert_eq!(service.fetch(id), None);

        service.drain(Duration::from_secs(10)).await.unwrap();
        let expected = hash_password("angryMonkey");
        for _ in 0..5 {
            assert_eq!(service.fetch(id).as_ref(), Some(&expected));
            assert_eq!(service.fetch_raw("1").as_ref(), Some(&expected));
        }
        assert_eq!(service.stats().total, 1);
        assert_eq!(service.stored_results(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_and_unknown_ids_read_as_absent() {
        let service = paused_service(0);
        service.submit("x");
        service.drain(Duration::from_secs(10)).await.unwrap();

        for raw in ["", "abc", "-1", "+1", "1.0", "99999999999999999999", "2"] {
            assert_eq!(service.fetch_raw(raw), None, "{raw:?}");
        }
        assert!(service.fetch_raw("1").is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_submissions_get_distinct_consecutive_ids() {
        const CLIENTS: u64 = 64;
        const PER_CLIENT: u64 = 50;

        let service = HashService::<NoSleep>::new(HashConfig {
            processing_delay: Duration::ZERO,
            initial_request_id: 0,
        });

        let tasks = (0..CLIENTS).map(|client| {
            let service = service.clone();
            tokio::spawn(async move {
                (0..PER_CLIENT)
                    .map(|i| (service.submit(format!("{client}-{i}")), format!("{client}-{i}")))
                    .collect::<Vec<_>>()
            })
        });
        let submitted: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .flat_map(|r| r.unwrap())
            .collect();

        let ids: HashSet<_> = submitted.iter().map(|(id, _)| id.to_raw()).collect();
        assert_eq!(ids.len() as u64, CLIENTS * PER_CLIENT);
        assert_eq!(ids, (1..=CLIENTS * PER_CLIENT).collect::<HashSet<u64>>());

        service.drain(Duration::from_secs(30)).await.unwrap();
        assert_eq!(service.stats().total, CLIENTS * PER_CLIENT);
        for (id, password) in &submitted {
            assert_eq!(service.fetch(*id), Some(hash_password(password)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_does_not_cancel_pending_hashes() {
        let service = paused_service(0);
        let id = service.submit("still hashed");
        assert!(service.trigger_shutdown());
        assert!(!service.trigger_shutdown());

        service.shutdown_signal().await;
        assert!(service.is_shutting_down());

        service.drain(Duration::from_secs(10)).await.unwrap();
        assert_eq!(service.fetch(id), Some(hash_password("still hashed")));
    }

    #[tokio::test]
    async fn seeded_stats_fold_in_completions() {
        let stats = Arc::new(RunningAverage::with_seed(4, 99));
        let service = HashService::<NoSleep>::with_parts(
            HashConfig::default(),
            Arc::new(ResultStore::new()),
            Arc::clone(&stats),
        );
        assert_eq!(service.stats(), Stats { total: 4, average: 24 });

        stats.record_completion(35);
        assert_eq!(service.stats(), Stats { total: 5, average: 26 });
        stats.record_completion(41);
        assert_eq!(service.stats(), Stats { total: 6, average: 29 });
    }
}
