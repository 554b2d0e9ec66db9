//! Scripted collection collaborators for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

use crate::collection::{CollectionRequest, CollectionTask, TaskHandle};
use crate::core::CollectionMethod;
use crate::errors::ReconError;
use crate::looping::CycleRunner;

/// A collection task that records requests and returns a fixed outcome.
#[derive(Debug, Default)]
pub struct ScriptedCollectionTask {
    failure: Option<String>,
    delay: Duration,
    cache_entry: Option<(String, String)>,
    requests: Mutex<Vec<CollectionRequest>>,
}

impl ScriptedCollectionTask {
    /// A task that succeeds immediately.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// A task that fails with a collection error.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Makes the task take `delay` before finishing.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes the task record a SID to domain mapping in the run cache.
    #[must_use]
    pub fn with_cache_entry(mut self, sid: impl Into<String>, domain: impl Into<String>) -> Self {
        self.cache_entry = Some((sid.into(), domain.into()));
        self
    }

    /// Returns the number of times the task was started.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the recorded requests.
    #[must_use]
    pub fn requests(&self) -> Vec<CollectionRequest> {
        self.requests.lock().clone()
    }
}

impl CollectionTask for ScriptedCollectionTask {
    fn start(&self, request: CollectionRequest) -> TaskHandle {
        self.requests.lock().push(request.clone());
        let failure = self.failure.clone();
        let delay = self.delay;
        let cache_entry = self.cache_entry.clone();

        TaskHandle::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Some((sid, domain)) = cache_entry {
                request.cache.add_sid_to_domain(&sid, domain);
            }
            match failure {
                Some(message) => Err(ReconError::collection(message)),
                None => Ok(()),
            }
        })
    }
}

/// A cycle runner that records every cycle and sleeps for a fixed time.
#[derive(Debug, Default)]
pub struct CountingCycleRunner {
    cycle_duration: Duration,
    runs: Mutex<Vec<(u32, CollectionMethod)>>,
}

impl CountingCycleRunner {
    /// Creates a runner whose cycles take `cycle_duration`.
    #[must_use]
    pub fn new(cycle_duration: Duration) -> Self {
        Self {
            cycle_duration,
            runs: Mutex::new(Vec::new()),
        }
    }

    /// Cycle numbers run so far.
    #[must_use]
    pub fn cycles(&self) -> Vec<u32> {
        self.runs.lock().iter().map(|(cycle, _)| *cycle).collect()
    }

    /// Methods used by each cycle.
    #[must_use]
    pub fn methods(&self) -> Vec<CollectionMethod> {
        self.runs.lock().iter().map(|(_, methods)| *methods).collect()
    }
}

#[async_trait]
impl CycleRunner for CountingCycleRunner {
    async fn run_cycle(&self, request: CollectionRequest) -> Result<(), ReconError> {
        self.runs.lock().push((request.cycle, request.methods));
        tokio::time::sleep(self.cycle_duration).await;
        Ok(())
    }
}
