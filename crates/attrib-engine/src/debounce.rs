// debounce.rs: Single-slot debounce timer.
//
// At most one evaluation is pending per coalescer. Scheduling aborts the
// pending task and installs a new one under the same lock, so a burst of
// events always ends with exactly one evaluation of the last event.
// Earlier events in the burst are dropped, not merged.
//
// Must be used from inside a tokio runtime.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct DebounceCoalescer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceCoalescer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` after the default delay unless rescheduled first.
    pub fn schedule<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_in(self.delay, action)
    }

    /// Replace the pending action with `action`, due after `delay`.
    pub fn schedule_in<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.lock();
        if let Some(previous) = pending.take() {
            if !previous.is_finished() {
                tracing::trace!("replacing pending evaluation");
            }
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
    }

    /// Drop the pending action, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("debounce lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }
}

impl Drop for DebounceCoalescer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().ok().and_then(Option::take) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Box<dyn FnOnce() + Send>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = fired.clone();
        let make = move |n: u32| {
            let sink = sink.clone();
            Box::new(move || sink.lock().unwrap().push(n)) as Box<dyn FnOnce() + Send>
        };
        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once_with_last_action() {
        let coalescer = DebounceCoalescer::new(Duration::from_millis(200));
        let (fired, make) = recorder();

        coalescer.schedule(make(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        coalescer.schedule(make(2));
        tokio::time::sleep(Duration::from_millis(50)).await;
        coalescer.schedule(make(3));
        assert!(coalescer.has_pending());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*fired.lock().unwrap(), vec![3]);
        assert!(!coalescer.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_before_the_quiet_period() {
        let coalescer = DebounceCoalescer::new(Duration::from_millis(200));
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        coalescer.schedule(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(199)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn separated_events_each_fire() {
        let coalescer = DebounceCoalescer::new(Duration::from_millis(100));
        let (fired, make) = recorder();

        coalescer.schedule(make(1));
        tokio::time::sleep(Duration::from_millis(150)).await;
        coalescer.schedule(make(2));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*fired.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_action() {
        let coalescer = DebounceCoalescer::new(Duration::from_millis(100));
        let (fired, make) = recorder();

        coalescer.schedule(make(1));
        assert!(coalescer.cancel());
        assert!(!coalescer.cancel());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_in_overrides_default_delay() {
        let coalescer = DebounceCoalescer::new(Duration::from_secs(10));
        let (fired, make) = recorder();
        coalescer.schedule_in(Duration::from_millis(20), make(7));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(*fired.lock().unwrap(), vec![7]);
    }
}
