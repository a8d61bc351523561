//! The disposable scope a form is built under.
//!
//! Everything a form starts while it is alive (value-change listeners,
//! debounced async validation, business-state checks) belongs to the
//! [`Lifecycle`] it was built with. The owning screen calls
//! [`Lifecycle::dispose`] on teardown; after that no validator runs for any
//! control bound to the scope, queued async work is aborted and listeners are
//! dropped.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::errors::FormError;
use super::lock;

#[derive(Clone, Default)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

#[derive(Default)]
struct LifecycleInner {
    disposed: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    error_sink: Mutex<Option<UnboundedSender<FormError>>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope that forwards failures it cannot classify to `sink`, usually
    /// the owning screen's generic error handler
    pub fn with_error_sink(sink: UnboundedSender<FormError>) -> Self {
        let lifecycle = Self::new();
        *lock(&lifecycle.inner.error_sink) = Some(sink);
        lifecycle
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Run `task` on the current tokio runtime, owned by this scope.
    ///
    /// Returns false when nothing was spawned, either because the scope is
    /// already disposed or because there is no runtime to spawn on.
    pub fn spawn<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_disposed() {
            return false;
        }
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No tokio runtime available; background form task skipped");
                return false;
            }
        };

        let task = handle.spawn(task);
        let mut tasks = lock(&self.inner.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
        true
    }

    /// Number of spawned tasks that have not finished yet
    pub fn active_tasks(&self) -> usize {
        lock(&self.inner.tasks)
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    /// Escalate a failure the engine could not interpret.
    ///
    /// Always logged; also forwarded to the error sink when there is one.
    pub fn report(&self, err: FormError) {
        error!("Unhandled form failure: {}", err);
        if let Some(sink) = lock(&self.inner.error_sink).as_ref() {
            if sink.send(err).is_err() {
                warn!("Form error sink is closed; failure was only logged");
            }
        }
    }

    /// Tear the scope down. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let tasks: Vec<JoinHandle<()>> = lock(&self.inner.tasks).drain(..).collect();
        info!("Disposing form lifecycle ({} background tasks)", tasks.len());
        for task in tasks {
            task.abort();
        }
        lock(&self.inner.error_sink).take();
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn test_spawn_without_runtime_is_skipped() {
        let lifecycle = Lifecycle::new();
        assert!(!lifecycle.spawn(async {}));
        assert_eq!(lifecycle.active_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_aborts_pending_tasks() {
        let lifecycle = Lifecycle::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = ran.clone();
        assert!(lifecycle.spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(lifecycle.active_tasks(), 1);

        lifecycle.dispose();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(lifecycle.is_disposed());
        assert!(!lifecycle.spawn(async {}));
    }

    #[tokio::test]
    async fn test_report_forwards_to_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let lifecycle = Lifecycle::with_error_sink(tx);

        lifecycle.report(FormError::UnregisteredType("Widget".to_string()));

        let received = rx.recv().await.expect("error forwarded");
        assert!(matches!(received, FormError::UnregisteredType(name) if name == "Widget"));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let lifecycle = Lifecycle::new();
        let clone = lifecycle.clone();
        lifecycle.dispose();
        clone.dispose();
        assert!(clone.is_disposed());
    }
}
