//! Built-in loop manager.

use crate::collection::{CollectionRequest, LoopManager, LoopRequest, TaskHandle};
use crate::errors::ReconError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, trace};

/// Runs a single collection cycle.
#[async_trait]
pub trait CycleRunner: Send + Sync {
    /// Collects once with the request's methods.
    async fn run_cycle(&self, request: CollectionRequest) -> Result<(), ReconError>;
}

/// Repeats cycles at a fixed interval until cancelled or past the deadline.
///
/// The first cycle is the base collection already started by the chain.
/// Cancellation is only observed between cycles.
#[derive(Clone)]
pub struct CycleLoopManager {
    runner: Arc<dyn CycleRunner>,
}

impl CycleLoopManager {
    /// Creates a manager over the given runner.
    #[must_use]
    pub fn new(runner: Arc<dyn CycleRunner>) -> Self {
        Self { runner }
    }
}

impl fmt::Debug for CycleLoopManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CycleLoopManager").finish_non_exhaustive()
    }
}

impl LoopManager for CycleLoopManager {
    fn start(&self, request: LoopRequest) -> TaskHandle {
        let runner = self.runner.clone();
        TaskHandle::spawn(run_loop(runner, request))
    }
}

async fn run_loop(runner: Arc<dyn CycleRunner>, request: LoopRequest) -> Result<(), ReconError> {
    let LoopRequest {
        base,
        first_cycle,
        interval,
        deadline,
        handshake,
    } = request;

    handshake.begin_loop();
    match first_cycle {
        Some(handle) => handle.wait().await?,
        None => runner.run_cycle(base.clone()).await?,
    }
    handshake.mark_initial_completed();

    let token = handshake.token().clone();
    let mut cycle = base.cycle;
    loop {
        if handshake.observe_cancellation() || Instant::now() >= deadline {
            break;
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = token.cancelled() => break,
        }
        if Instant::now() >= deadline {
            break;
        }

        cycle += 1;
        info!(cycle, methods = %base.methods, "Starting loop cycle");
        runner.run_cycle(base.for_cycle(cycle, base.methods)).await?;
        trace!(cycle, "Loop cycle finished");
    }

    info!(cycles = cycle, "Looping finished");
    Ok(())
}
