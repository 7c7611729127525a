//! Fire-and-forget scheduling of deferred hashing work.
//!
//! Every accepted request becomes one Tokio task. The task waits out the
//! processing delay, hashes the password, publishes the digest to the
//! [`ResultStore`], and folds the time spent hashing and storing into the
//! [`RunningAverage`]. The delay itself is not part of the measured duration.
//!
//! Tasks are independent: there is no bound on how many may be in flight, no
//! ordering between them, and no way to cancel one. The task handle is
//! dropped immediately; completion is only observable through the store and
//! the statistics.
//!
//! The dispatcher keeps an in-flight gauge so a host can wait for accepted
//! work to finish before exiting (see [`Dispatcher::drain`]).

use crate::{
    Error, RequestId, Result, ResultStore, RunningAverage, SleepProvider, TokioSleep,
    hash_password,
};
use core::{marker::PhantomData, time::Duration};
use portable_atomic::{AtomicUsize, Ordering};
use std::{sync::Arc, time::Instant};

/// How often [`Dispatcher::drain`] re-checks the in-flight gauge.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Spawns one deferred hashing task per accepted request.
pub struct Dispatcher<S = TokioSleep> {
    store: Arc<ResultStore>,
    stats: Arc<RunningAverage>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    _sleep: PhantomData<fn() -> S>,
}

impl<S> Clone for Dispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
            delay: self.delay,
            in_flight: Arc::clone(&self.in_flight),
            _sleep: PhantomData,
        }
    }
}

impl<S> Dispatcher<S>
where
    S: SleepProvider + 'static,
{
    pub fn new(store: Arc<ResultStore>, stats: Arc<RunningAverage>, delay: Duration) -> Self {
        Self {
            store,
            stats,
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            _sleep: PhantomData,
        }
    }

    /// Schedules the deferred work for `id` and returns without waiting.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, id: RequestId, password: String) {
        let guard = InFlightGuard::enter(&self.in_flight);
        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let delay = self.delay;

        let fut = async move {
            let _guard = guard;
            S::sleep_for(delay).await;

            #[cfg(feature = "tracing")]
            tracing::debug!(%id, "woke up, hashing request");

            let start = Instant::now();
            store.put(id, hash_password(&password));
            let elapsed = start.elapsed();

            let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
            let _average = stats.record_completion(micros);

            #[cfg(feature = "tracing")]
            tracing::debug!(%id, micros, average = _average, "request completed");
        };

        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            fut.instrument(tracing::debug_span!("hash_request", %id))
        };

        tokio::spawn(fut);
    }

    /// Processing delay applied before each task starts hashing.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of tasks scheduled but not yet completed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Waits until every scheduled task has completed.
    ///
    /// Tasks dispatched while draining are waited for as well.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DrainTimeout`] if tasks are still running when
    /// `timeout` expires. The tasks themselves are left untouched.
    pub async fn drain(&self, timeout: Duration) -> Result<()> {
        let drained = tokio::time::timeout(timeout, async {
            while self.in_flight() > 0 {
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        })
        .await;

        drained.map_err(|_| Error::DrainTimeout {
            remaining: self.in_flight(),
        })
    }
}

/// Keeps the in-flight gauge accurate even if a task is dropped mid-flight
/// (e.g. when the runtime shuts down).
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}
