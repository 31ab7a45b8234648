//! Scoped scheduled tasks.
//!
//! A [`ScopedTask`] owns a spawned task. Dropping or replacing the handle
//! cancels the task, so storing a new handle in the same slot atomically
//! supersedes whatever was scheduled before.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Owned handle to a spawned task; the task is aborted on drop.
#[derive(Debug)]
pub struct ScopedTask {
    handle: JoinHandle<()>,
}

impl ScopedTask {
    /// Spawn `future` on the current runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    /// Run `callback` once `delay` has elapsed.
    pub fn after<C>(delay: Duration, callback: C) -> Self
    where
        C: FnOnce() + Send + 'static,
    {
        Self::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        })
    }

    /// Cancel the task if it has not run yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// True once the task has completed or been cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
