//! Collection collaborators.
//!
//! The chain never collects anything itself. It builds a
//! [`CollectionRequest`], starts a [`CollectionTask`] (or, in loop mode, a
//! [`LoopManager`]) and later awaits the returned [`TaskHandle`].

use crate::cache::ObjectCache;
use crate::cancellation::CancellationToken;
use crate::core::{CollectionMethod, EnumerationDomain};
use crate::errors::ReconError;
use crate::looping::LoopHandshake;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Everything a collection cycle needs from the run.
#[derive(Debug, Clone)]
pub struct CollectionRequest {
    /// Run the request belongs to.
    pub run_id: Uuid,
    /// Domains to enumerate.
    pub domains: Vec<EnumerationDomain>,
    /// Methods to collect.
    pub methods: CollectionMethod,
    /// Identity used for session collection.
    pub current_user_name: String,
    /// Cache shared with the rest of the run.
    pub cache: Arc<ObjectCache>,
    /// Cooperative cancellation for the run.
    pub cancellation: Arc<CancellationToken>,
    /// Cycle number, starting at 1 for the base collection.
    pub cycle: u32,
}

impl CollectionRequest {
    /// Returns a copy for a later loop cycle with the given methods.
    #[must_use]
    pub fn for_cycle(&self, cycle: u32, methods: CollectionMethod) -> Self {
        Self {
            cycle,
            methods,
            ..self.clone()
        }
    }
}

/// Awaitable handle to a running collection or loop.
#[derive(Debug)]
pub struct TaskHandle {
    inner: JoinHandle<Result<(), ReconError>>,
}

impl TaskHandle {
    /// Spawns `future` on the tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), ReconError>> + Send + 'static,
    {
        Self {
            inner: tokio::spawn(future),
        }
    }

    /// Wraps an existing join handle.
    #[must_use]
    pub fn from_join_handle(inner: JoinHandle<Result<(), ReconError>>) -> Self {
        Self { inner }
    }

    /// Returns true once the task has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Aborts the task. A later [`TaskHandle::wait`] reports it as cancelled
    /// unless it had already finished.
    pub fn abort(&self) {
        self.inner.abort();
    }

    /// Waits for the task and returns its result.
    ///
    /// An aborted task maps to [`ReconError::Cancelled`], a panicked one to
    /// [`ReconError::Collection`].
    pub async fn wait(self) -> Result<(), ReconError> {
        match self.inner.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                Err(ReconError::Cancelled("collection task was aborted".to_string()))
            }
            Err(e) => Err(ReconError::collection(format!("collection task panicked: {e}"))),
        }
    }
}

/// Starts the base collection of a run.
pub trait CollectionTask: Send + Sync {
    /// Starts collecting without waiting for completion.
    fn start(&self, request: CollectionRequest) -> TaskHandle;
}

/// Everything a loop manager needs to drive repeated cycles.
#[derive(Debug)]
pub struct LoopRequest {
    /// Template for loop cycles, carrying the loop-safe methods.
    pub base: CollectionRequest,
    /// The in-flight base collection, awaited as the first cycle.
    pub first_cycle: Option<TaskHandle>,
    /// Pause between cycles.
    pub interval: Duration,
    /// No cycle starts after this instant.
    pub deadline: Instant,
    /// Handshake to complete once the first cycle is done.
    pub handshake: Arc<LoopHandshake>,
}

/// Drives repeated collection cycles until the loop ends.
pub trait LoopManager: Send + Sync {
    /// Starts the loop without waiting for completion.
    fn start(&self, request: LoopRequest) -> TaskHandle;
}
