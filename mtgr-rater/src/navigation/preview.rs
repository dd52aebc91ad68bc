//! Debounced hover preview
//!
//! [`PreviewOverride`] holds a transient value that only takes effect after
//! the commit delay. Setting a new value restarts the delay; retracting
//! cancels any pending commit and clears the value at once. A value may also
//! be computed while the delay runs, in which case the commit waits for both.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

type CommitHook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Override value with commit delay and cancel-on-retract
///
/// Must be used from within a tokio runtime: each `set` spawns the timer
/// task that performs the commit.
pub struct PreviewOverride<T> {
    delay: Duration,
    tx: Arc<watch::Sender<Option<T>>>,
    pending: Option<JoinHandle<()>>,
    on_commit: Option<CommitHook<T>>,
}

impl<T> PreviewOverride<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            delay,
            tx: Arc::new(tx),
            pending: None,
            on_commit: None,
        }
    }

    /// Called with the value each time a commit lands
    pub fn on_commit(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_commit = Some(Arc::new(hook));
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `value` to take effect after the delay
    pub fn set(&mut self, value: T) {
        self.set_with(async move { value });
    }

    /// Schedule the output of `value` to take effect once it is ready and
    /// the delay has passed
    pub fn set_with<F>(&mut self, value: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        self.cancel_pending();

        let tx = Arc::clone(&self.tx);
        let hook = self.on_commit.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            let timer = async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            };
            let ((), value) = tokio::join!(timer, value);
            if let Some(hook) = &hook {
                hook(&value);
            }
            tx.send_replace(Some(value));
        }));
    }

    /// Cancel a pending commit and clear the committed value
    ///
    /// Returns true if there was anything to cancel or clear.
    pub fn retract(&mut self) -> bool {
        let cancelled = self.cancel_pending();
        let cleared = self.tx.send_replace(None).is_some();
        cancelled || cleared
    }

    /// Committed value, if any
    pub fn current(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// A commit is scheduled but has not landed yet
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Observe committed values
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }

    fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                debug!("Cancelled pending preview");
                true
            }
            _ => false,
        }
    }
}

impl<T> Drop for PreviewOverride<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_commit_after_delay() {
        let mut preview = PreviewOverride::new(Duration::from_millis(200));
        preview.set(3usize);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(preview.current(), None);
        assert!(preview.is_pending());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(preview.current(), Some(3));
        assert!(!preview.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retract_cancels_pending_commit() {
        let mut preview = PreviewOverride::new(Duration::from_millis(200));
        preview.set(1usize);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(preview.retract());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(preview.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_restarts_delay() {
        let commits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&commits);
        let mut preview = PreviewOverride::new(Duration::from_millis(200))
            .on_commit(move |_: &usize| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        preview.set(1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        preview.set(2);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(preview.current(), None);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(preview.current(), Some(2));
        assert_eq!(commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_computed_value_commits_when_both_are_ready() {
        let mut preview = PreviewOverride::new(Duration::from_millis(100));
        preview.set_with(async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            "resolved"
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(preview.current(), None);
        assert!(preview.is_pending());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(preview.current(), Some("resolved"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retract_clears_committed_value() {
        let mut preview = PreviewOverride::new(Duration::from_millis(10));
        let mut rx = preview.subscribe();
        preview.set("hover".to_string());

        rx.changed().await.unwrap();
        assert_eq!(preview.current().as_deref(), Some("hover"));

        assert!(preview.retract());
        assert_eq!(preview.current(), None);
        assert!(!preview.retract());
    }
}
