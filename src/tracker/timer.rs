//! Cancellable one-shot timers on the tokio runtime.

use std::{future::Future, time::Duration};

use tokio::{runtime::Handle, sync::oneshot};

/// A scheduled action. Dropping the handle before the delay elapses cancels
/// the action; once the delay has elapsed the action runs to completion even
/// if the handle is dropped meanwhile.
#[derive(Debug)]
pub struct TimerHandle {
    _disarm: oneshot::Sender<()>,
}

/// The runtime captured at construction, else the one the caller is running
/// in. `None` off any tokio runtime.
pub fn runtime_handle(captured: Option<&Handle>) -> Option<Handle> {
    captured.cloned().or_else(|| Handle::try_current().ok())
}

pub fn schedule<F>(runtime: &Handle, delay: Duration, action: F) -> TimerHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let (disarm, disarmed) = oneshot::channel::<()>();
    runtime.spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => action.await,
            _ = disarmed => {}
        }
    });
    TimerHandle { _disarm: disarm }
}

/// Holds at most one pending action; arming again replaces it.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    runtime: Option<Handle>,
    pending: Option<TimerHandle>,
}

impl Debouncer {
    /// Timers run on `runtime` when given, otherwise on whatever runtime
    /// `arm` is called from.
    pub fn new(delay: Duration, runtime: Option<Handle>) -> Self {
        Self {
            delay,
            runtime,
            pending: None,
        }
    }

    /// Replace the pending action. Returns false, leaving nothing pending,
    /// when there is no runtime to run it on.
    pub fn arm<F>(&mut self, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        match runtime_handle(self.runtime.as_ref()) {
            Some(runtime) => {
                self.pending = Some(schedule(&runtime, self.delay, action));
                true
            }
            None => false,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    fn counter_action(counter: &Arc<AtomicUsize>, value: usize) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.store(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let hits = Arc::new(AtomicUsize::new(0));
        let _handle = schedule(
            &Handle::current(),
            Duration::from_millis(500),
            counter_action(&hits, 1),
        );

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_cancels() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = schedule(
            &Handle::current(),
            Duration::from_millis(500),
            counter_action(&hits, 1),
        );
        drop(handle);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_keeps_only_last_action() {
        let last = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(500), None);

        for value in 1..=5 {
            assert!(debouncer.arm(counter_action(&last, value)));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(last.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert_eq!(last.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn debouncer_cancel_discards_pending() {
        let last = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(500), None);
        debouncer.arm(counter_action(&last, 9));
        debouncer.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(last.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn debouncer_without_runtime_declines() {
        let last = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(500), None);
        assert!(!debouncer.arm(counter_action(&last, 1)));
        assert!(runtime_handle(None).is_none());
    }
}
