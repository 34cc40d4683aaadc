//! Background fault reporting.
//!
//! Any task spawned by the servers or the client that is not explicitly
//! awaited goes through [`spawn_reported`], so a panicking or cancelled
//! background task is always reported somewhere instead of vanishing.
//!
//! The reporter is an explicit value injected once at process start and
//! passed down to the components that spawn tasks. There is no ambient
//! global hook.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::error;

/// A background task failure.
#[derive(Debug, Clone)]
pub struct FaultEvent {
    /// Short label identifying the task that failed.
    pub task: &'static str,
    /// Human-readable failure description.
    pub detail: String,
}

impl fmt::Display for FaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "background task '{}' failed: {}", self.task, self.detail)
    }
}

/// Callback invoked for every unobserved background failure.
#[derive(Clone)]
pub struct FaultReporter(Arc<dyn Fn(FaultEvent) + Send + Sync>);

impl fmt::Debug for FaultReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FaultReporter")
    }
}

impl FaultReporter {
    /// Create a reporter from a callback.
    pub fn new(f: impl Fn(FaultEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Report a fault.
    pub fn report(&self, event: FaultEvent) {
        (self.0)(event);
    }
}

impl Default for FaultReporter {
    /// The default reporter logs at error level.
    fn default() -> Self {
        Self::new(|event| error!(task = event.task, detail = %event.detail, "Unobserved background failure"))
    }
}

/// Spawn a background task whose failure is routed through the reporter.
///
/// The task's own `Err` results and panics both produce a [`FaultEvent`];
/// the caller may drop the returned handle without losing the failure.
pub fn spawn_reported<F>(reporter: &FaultReporter, task: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = crate::Result<()>> + Send + 'static,
{
    let reporter = reporter.clone();
    tokio::spawn(async move {
        let outcome = tokio::spawn(future).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => reporter.report(FaultEvent {
                task,
                detail: e.to_string(),
            }),
            Err(join_err) => reporter.report(FaultEvent {
                task,
                detail: join_err.to_string(),
            }),
        }
    })
}
