use crate::apply::{execute, ExecutionReport};
use crate::config::RenameConfiguration;
use crate::planner::{build_plan_with, RenamePlan};
use crate::progress::{CancelToken, ProgressEvent};
use anyhow::{anyhow, Result};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::debug;

const EVENT_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Building,
    Running,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a plan build or rename run is already in progress")]
    Busy,
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    cancel: CancelToken,
}

#[derive(Debug, Clone)]
pub struct RenameSession {
    inner: Arc<Mutex<SessionInner>>,
}

impl Default for RenameSession {
    fn default() -> Self {
        Self::new()
    }
}

/// A task started by a session. Progress arrives on `events` in processing
/// order and the channel closes when the task ends. The channel is bounded, so
/// a worker never runs more than `EVENT_BUFFER` files ahead of its reader.
#[derive(Debug)]
pub struct TaskHandle<T> {
    pub events: Receiver<ProgressEvent>,
    cancel: CancelToken,
    handle: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn wait(self) -> Result<T> {
        let TaskHandle { events, handle, .. } = self;
        // a blocked send must not outlive the reader
        drop(events);
        handle
            .join()
            .map_err(|_| anyhow!("rename worker thread panicked"))
    }
}

impl RenameSession {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Idle,
                cancel: CancelToken::new(),
            })),
        }
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn is_processing(&self) -> bool {
        self.state() != SessionState::Idle
    }

    pub fn cancel(&self) {
        let inner = self.lock();
        if inner.state != SessionState::Idle {
            debug!(state = ?inner.state, "cancel requested");
            inner.cancel.cancel();
        }
    }

    pub fn build_plan(
        &self,
        config: RenameConfiguration,
    ) -> Result<TaskHandle<Result<RenamePlan>>, SessionError> {
        let cancel = self.try_begin(SessionState::Building)?;
        Ok(self.spawn(cancel, move |cancel, tx| {
            build_plan_with(&config, cancel, |event| {
                let _ = tx.send(event);
            })
        }))
    }

    pub fn execute(&self, plan: RenamePlan) -> Result<TaskHandle<ExecutionReport>, SessionError> {
        let cancel = self.try_begin(SessionState::Running)?;
        Ok(self.spawn(cancel, move |cancel, tx| {
            execute(plan, cancel, |event| {
                let _ = tx.send(event);
            })
        }))
    }

    fn spawn<T, F>(&self, cancel: CancelToken, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancelToken, &SyncSender<ProgressEvent>) -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(EVENT_BUFFER);
        let worker_cancel = cancel.clone();
        let idle_on_exit = IdleOnDrop {
            inner: Arc::clone(&self.inner),
        };
        let handle = std::thread::spawn(move || {
            let _idle_on_exit = idle_on_exit;
            task(&worker_cancel, &tx)
        });

        TaskHandle {
            events: rx,
            cancel,
            handle,
        }
    }

    pub(crate) fn try_begin(&self, next: SessionState) -> Result<CancelToken, SessionError> {
        let mut inner = self.lock();
        if inner.state != SessionState::Idle {
            return Err(SessionError::Busy);
        }
        inner.state = next;
        inner.cancel = CancelToken::new();
        Ok(inner.cancel.clone())
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        lock_inner(&self.inner)
    }
}

fn lock_inner(inner: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// returns the session to Idle even when the worker panics
struct IdleOnDrop {
    inner: Arc<Mutex<SessionInner>>,
}

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        lock_inner(&self.inner).state = SessionState::Idle;
    }
}
