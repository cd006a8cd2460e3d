//! Shared model loading progress monitor.
//!
//! One [`ProgressMonitor`] is created at startup and handed, as an `Arc`, to
//! the engine launcher (writer) and to the streaming use cases (readers).

use crate::ports::progress::ProgressSubscriber;
use medreason_domain::{ProgressSnapshot, ProgressState, scan_progress_line};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Thread-safe progress state with subscriber fan-out.
///
/// Every mutation produces one snapshot that is delivered to all current
/// subscribers before the next mutation's snapshot. Subscribers must not
/// mutate the monitor from inside `on_progress`.
pub struct ProgressMonitor {
    state: Mutex<ProgressState>,
    subscribers: Mutex<Vec<Arc<dyn ProgressSubscriber>>>,
    /// Held while mutating and delivering, so snapshots arrive in order.
    delivery: Mutex<()>,
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressMonitor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProgressState::new()),
            subscribers: Mutex::new(Vec::new()),
            delivery: Mutex::new(()),
        }
    }

    /// Upsert progress for one artifact and notify subscribers.
    pub fn update_progress(&self, artifact_name: &str, completed: u64, total: u64) {
        self.mutate(|state| state.update(artifact_name, completed, total, now_ms()));
    }

    /// Clear all records and notify subscribers.
    pub fn reset(&self) {
        self.mutate(|state| state.reset(now_ms()));
    }

    /// Force every record to 100%, clear the loading flag and notify.
    pub fn mark_loading_complete(&self) {
        self.mutate(|state| state.complete(now_ms()));
    }

    /// Feed one engine log line; returns true when it carried progress.
    pub fn scan_line(&self, line: &str) -> bool {
        match scan_progress_line(line) {
            Some(p) => {
                self.update_progress(&p.artifact_name, p.completed, p.total);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        lock(&self.state).snapshot()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).is_loading()
    }

    /// Add a subscriber. Subscribing the same instance twice has no effect.
    pub fn subscribe(&self, subscriber: Arc<dyn ProgressSubscriber>) {
        let mut subs = lock(&self.subscribers);
        if !subs.iter().any(|s| same_subscriber(s, &subscriber)) {
            subs.push(subscriber);
        }
    }

    pub fn unsubscribe(&self, subscriber: &Arc<dyn ProgressSubscriber>) {
        lock(&self.subscribers).retain(|s| !same_subscriber(s, subscriber));
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }

    fn mutate(&self, f: impl FnOnce(&mut ProgressState)) {
        let _delivery = lock(&self.delivery);
        let snapshot = {
            let mut state = lock(&self.state);
            f(&mut state);
            state.snapshot()
        };
        let subscribers = lock(&self.subscribers).clone();
        notify(&subscribers, &snapshot);
    }
}

fn same_subscriber(a: &Arc<dyn ProgressSubscriber>, b: &Arc<dyn ProgressSubscriber>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn notify(subscribers: &[Arc<dyn ProgressSubscriber>], snapshot: &ProgressSnapshot) {
    for subscriber in subscribers {
        match catch_unwind(AssertUnwindSafe(|| subscriber.on_progress(snapshot))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Error in progress subscriber: {}", e),
            Err(_) => error!("Progress subscriber panicked"),
        }
    }
}

/// Unsubscribes when dropped.
pub struct SubscriptionGuard {
    monitor: Arc<ProgressMonitor>,
    subscriber: Arc<dyn ProgressSubscriber>,
}

impl SubscriptionGuard {
    pub fn new(monitor: Arc<ProgressMonitor>, subscriber: Arc<dyn ProgressSubscriber>) -> Self {
        monitor.subscribe(subscriber.clone());
        Self {
            monitor,
            subscriber,
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.monitor.unsubscribe(&self.subscriber);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::progress::{ChannelSubscriber, SubscriberError};

    struct Recorder {
        seen: Mutex<Vec<ProgressSnapshot>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl ProgressSubscriber for Recorder {
        fn on_progress(&self, snapshot: &ProgressSnapshot) -> Result<(), SubscriberError> {
            self.seen.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    struct Failing;

    impl ProgressSubscriber for Failing {
        fn on_progress(&self, _: &ProgressSnapshot) -> Result<(), SubscriberError> {
            Err(SubscriberError("boom".into()))
        }
    }

    struct Panicking;

    impl ProgressSubscriber for Panicking {
        fn on_progress(&self, _: &ProgressSnapshot) -> Result<(), SubscriberError> {
            panic!("subscriber bug");
        }
    }

    #[test]
    fn test_reset_state() {
        let monitor = ProgressMonitor::new();
        monitor.update_progress("x", 10, 100);
        monitor.reset();
        let snap = monitor.snapshot();
        assert_eq!(snap.overall_percentage, 0.0);
        assert!(!snap.is_loading);
    }

    #[test]
    fn test_snapshot_timestamps_advance() {
        let monitor = ProgressMonitor::new();
        monitor.update_progress("x", 10, 100);
        let first = monitor.snapshot().timestamp_ms;
        assert!(first > 0);

        std::thread::sleep(std::time::Duration::from_millis(5));
        monitor.update_progress("x", 20, 100);
        assert!(monitor.snapshot().timestamp_ms > first);
    }

    #[test]
    fn test_single_artifact_reaches_full() {
        let monitor = ProgressMonitor::new();
        monitor.update_progress("x", 50, 100);
        assert!(monitor.is_loading());
        monitor.update_progress("x", 100, 100);
        assert_eq!(monitor.snapshot().overall_percentage, 100.0);
    }

    #[test]
    fn test_subscribers_notified_in_order() {
        let monitor = ProgressMonitor::new();
        let recorder = Recorder::new();
        monitor.subscribe(recorder.clone());

        monitor.update_progress("a", 10, 100);
        monitor.update_progress("a", 60, 100);
        monitor.mark_loading_complete();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].overall_percentage, 10.0);
        assert_eq!(seen[1].overall_percentage, 60.0);
        assert!(!seen[2].is_loading);
        assert_eq!(seen[2].overall_percentage, 100.0);
    }

    #[test]
    fn test_subscribe_is_deduplicated() {
        let monitor = ProgressMonitor::new();
        let recorder = Recorder::new();
        let as_dyn: Arc<dyn ProgressSubscriber> = recorder.clone();
        monitor.subscribe(as_dyn.clone());
        monitor.subscribe(as_dyn.clone());
        assert_eq!(monitor.subscriber_count(), 1);

        monitor.update_progress("a", 1, 2);
        assert_eq!(recorder.count(), 1);

        monitor.unsubscribe(&as_dyn);
        monitor.update_progress("a", 2, 2);
        assert_eq!(recorder.count(), 1);
        assert_eq!(monitor.subscriber_count(), 0);
    }

    #[test]
    fn test_failing_subscribers_do_not_block_delivery() {
        let monitor = ProgressMonitor::new();
        let recorder = Recorder::new();
        monitor.subscribe(Arc::new(Failing));
        monitor.subscribe(Arc::new(Panicking));
        monitor.subscribe(recorder.clone());

        monitor.update_progress("a", 5, 10);
        monitor.reset();
        assert_eq!(recorder.count(), 2);
    }

    #[test]
    fn test_scan_line_updates() {
        let monitor = ProgressMonitor::new();
        assert!(monitor.scan_line("vocab.json: 30%|███"));
        assert!(!monitor.scan_line("INFO: loading weights"));
        let snap = monitor.snapshot();
        assert_eq!(snap.files["vocab.json"].completed, 30);
    }

    #[test]
    fn test_guard_unsubscribes_on_drop() {
        let monitor = Arc::new(ProgressMonitor::new());
        let (subscriber, mut rx) = ChannelSubscriber::new();
        {
            let _guard = SubscriptionGuard::new(monitor.clone(), Arc::new(subscriber));
            assert_eq!(monitor.subscriber_count(), 1);
            monitor.update_progress("a", 1, 4);
            assert_eq!(rx.try_recv().unwrap().overall_percentage, 25.0);
        }
        assert_eq!(monitor.subscriber_count(), 0);
    }
}
