use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Failures kept for inspection; older entries are dropped.
const MAX_RECORDED_FAILURES: usize = 32;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailure {
    pub job: String,
    pub error: String,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
struct JobsInner {
    handles: Mutex<Vec<JoinHandle<()>>>,
    failures: Mutex<Vec<JobFailure>>,
}

/// Detached tasks that run after a request has been answered.
///
/// A failing job is logged and recorded here; it never reaches the caller
/// that enqueued it.
#[derive(Clone, Default)]
pub struct BackgroundJobs {
    inner: Arc<JobsInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BackgroundJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` on the tokio runtime.
    pub fn spawn<F>(&self, name: impl Into<String>, job: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            match job.await {
                Ok(()) => debug!(job = %name, "background job finished"),
                Err(err) => {
                    warn!(job = %name, error = %format!("{err:#}"), "background job failed");
                    let mut failures = lock(&inner.failures);
                    if failures.len() == MAX_RECORDED_FAILURES {
                        failures.remove(0);
                    }
                    failures.push(JobFailure {
                        job: name,
                        error: format!("{err:#}"),
                        at: Utc::now(),
                    });
                }
            }
        });

        let mut handles = lock(&self.inner.handles);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of jobs not yet finished.
    pub fn pending(&self) -> usize {
        lock(&self.inner.handles)
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Wait until every job, including ones spawned while waiting, is done.
    pub async fn wait_idle(&self) {
        loop {
            let batch: Vec<JoinHandle<()>> = std::mem::take(&mut *lock(&self.inner.handles));
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(err) = handle.await {
                    warn!(error = %err, "background job panicked or was cancelled");
                }
            }
        }
    }

    pub fn failures(&self) -> Vec<JobFailure> {
        lock(&self.inner.failures).clone()
    }
}
