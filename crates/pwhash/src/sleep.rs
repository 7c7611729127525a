use core::{future::Ready, time::Duration};

/// A trait that abstracts over how deferred work waits out its processing
/// delay.
///
/// The dispatcher and shutdown coordinator are generic over this so tests and
/// benches can skip the delay without touching the runtime clock.
pub trait SleepProvider {
    /// We require `Send` so that the future can be moved into spawned tasks.
    type Sleep: Future<Output = ()> + Send;

    fn sleep_for(dur: Duration) -> Self::Sleep;
}

/// An implementation of [`SleepProvider`] using Tokio's timer.
///
/// This is the default provider. It honours `tokio::time::pause`, so paused
/// test runtimes can advance through the delay instantly.
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    type Sleep = tokio::time::Sleep;

    fn sleep_for(dur: Duration) -> Self::Sleep {
        tokio::time::sleep(dur)
    }
}

/// An implementation of [`SleepProvider`] that resolves immediately.
pub struct NoSleep;
impl SleepProvider for NoSleep {
    type Sleep = Ready<()>;

    fn sleep_for(_dur: Duration) -> Self::Sleep {
        core::future::ready(())
    }
}
