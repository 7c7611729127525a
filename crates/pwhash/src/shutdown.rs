use crate::{SleepProvider, TokioSleep};
use core::{marker::PhantomData, time::Duration};
use portable_atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// Schedules a single delayed stop of the hosting listener.
///
/// [`trigger`](Self::trigger) spawns one deferred task that, after the
/// processing delay, cancels a shared [`CancellationToken`]. The host awaits
/// [`cancelled`](Self::cancelled) as its graceful-shutdown signal. In-flight
/// hashing tasks are neither cancelled nor awaited by the coordinator.
pub struct ShutdownCoordinator<S = TokioSleep> {
    token: CancellationToken,
    delay: Duration,
    triggered: AtomicBool,
    _sleep: PhantomData<fn() -> S>,
}

impl<S> ShutdownCoordinator<S>
where
    S: SleepProvider + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            delay,
            triggered: AtomicBool::new(false),
            _sleep: PhantomData,
        }
    }

    /// Schedules the delayed shutdown.
    ///
    /// Only the first call schedules anything; later calls return `false`.
    /// Must be called from within a Tokio runtime.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::AcqRel) {
            #[cfg(feature = "tracing")]
            tracing::debug!("shutdown already scheduled");
            return false;
        }

        let token = self.token.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            S::sleep_for(delay).await;
            #[cfg(feature = "tracing")]
            tracing::info!("shutdown delay elapsed, stopping listener");
            token.cancel();
        });
        true
    }

    /// Signals shutdown immediately, e.g. on SIGINT/SIGTERM.
    pub fn shutdown_now(&self) {
        self.triggered.store(true, Ordering::Release);
        self.token.cancel();
    }

    /// Whether a shutdown has been scheduled or signalled.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Whether the listener has been told to stop.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the listener should stop accepting connections.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        let token = self.token.clone();
        async move { token.cancelled().await }
    }
}
