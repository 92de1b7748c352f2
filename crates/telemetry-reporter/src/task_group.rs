// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded group of background report tasks.
//!
//! Spawning never waits: a task either gets one of the group's permits right
//! away or is refused. Every task sees the group's cancellation token, and
//! [`TaskGroup::wait`] drains the group and reports the first task that failed
//! for a reason other than cancellation.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::error;

use crate::error::ReporterError;

pub(crate) struct TaskGroup {
    runtime: Handle,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    token: CancellationToken,
    first_error: Arc<Mutex<Option<ReporterError>>>,
}

impl TaskGroup {
    /// Creates a group bound to a child of `parent`, running at most `limit` tasks at once.
    pub(crate) fn new(runtime: Handle, parent: &CancellationToken, limit: usize) -> Self {
        Self {
            runtime,
            permits: Arc::new(Semaphore::new(limit)),
            tracker: TaskTracker::new(),
            token: parent.child_token(),
            first_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawns the task built by `make_task` if a permit is free. Returns `false`
    /// when the group is at its limit, in which case `make_task` is not called.
    pub(crate) fn try_spawn<F, Fut>(&self, make_task: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            return false;
        };

        let task = make_task(self.token.clone());
        let first_error = Arc::clone(&self.first_error);
        self.tracker.spawn_on(
            async move {
                let _permit = permit;
                if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                    let reason = panic_message(panic.as_ref());
                    error!("Telemetry report task panicked: {reason}");
                    record_error(&first_error, ReporterError::TaskFailed(reason));
                }
            },
            &self.runtime,
        );
        true
    }

    /// Number of tasks that have not finished yet.
    pub(crate) fn len(&self) -> usize {
        self.tracker.len()
    }

    #[cfg(test)]
    pub(crate) fn is_drained(&self) -> bool {
        self.tracker.is_closed() && self.tracker.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Interrupts every running task.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for every spawned task to finish and returns the first failure.
    pub(crate) async fn wait(&self) -> Result<(), ReporterError> {
        self.tracker.close();
        self.tracker.wait().await;

        let first_error = match self.first_error.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn record_error(slot: &Mutex<Option<ReporterError>>, err: ReporterError) {
    let mut guard = match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if guard.is_none() {
        *guard = Some(err);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
