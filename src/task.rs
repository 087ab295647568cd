//! Long-running operations off the interactive thread.
//!
//! A job runs on its own thread and reports exactly one [`TaskOutcome`]
//! over a channel. Only one job is expected in flight at a time, so the
//! channel is the only synchronisation.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

use crate::error::ProfileError;

/// Terminal result of a task: success flag plus a message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub success: bool,
    pub message: String,
}

impl TaskOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub struct TaskHandle {
    rx: Receiver<TaskOutcome>,
    thread: JoinHandle<()>,
}

impl TaskHandle {
    /// Block until the job reports
    pub fn wait(self) -> TaskOutcome {
        let outcome = self
            .rx
            .recv()
            .unwrap_or_else(|_| TaskOutcome::failed("Task ended without reporting a result"));
        let _ = self.thread.join();
        outcome
    }
}

/// Run `job` on a worker thread. `Ok(message)` becomes a successful
/// outcome, an error or a panic a failed one.
pub fn spawn<F>(label: &str, job: F) -> std::io::Result<TaskHandle>
where
    F: FnOnce() -> Result<String, ProfileError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let label = label.to_string();

    let thread = thread::Builder::new()
        .name(format!("pzprof-{label}"))
        .spawn(move || {
            debug!(task = %label, "started");
            let outcome = match catch_unwind(AssertUnwindSafe(job)) {
                Ok(Ok(message)) => TaskOutcome::ok(message),
                Ok(Err(e)) => {
                    error!(task = %label, error = %e, "failed");
                    TaskOutcome::failed(e.to_string())
                }
                Err(_) => TaskOutcome::failed(format!("{label} panicked")),
            };
            let _ = tx.send(outcome);
        })?;

    Ok(TaskHandle { rx, thread })
}
