//! Ordered execution of links with fault short-circuiting.

use super::links::{Link, Links};
use crate::config::RunOptions;
use crate::context::{RunContext, RunFault};
use crate::core::LinkStatus;
use crate::errors::ReconError;
use crate::observability::emit_run_summary;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info_span, trace, Instrument};
use uuid::Uuid;

/// Outcome of one link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// The link.
    pub link: Link,
    /// What happened.
    pub status: LinkStatus,
    /// Time spent in the link in milliseconds.
    pub duration_ms: f64,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run ID.
    pub run_id: Uuid,
    /// One record per link, in chain order.
    pub links: Vec<LinkRecord>,
    /// Whether the run faulted.
    pub is_faulted: bool,
    /// The first fault, if any.
    pub fault: Option<RunFault>,
    /// Number of domains enumerated.
    pub domains_enumerated: usize,
    /// Whether cancellation was requested during the run.
    pub cancelled: bool,
    /// Total run time in milliseconds.
    pub duration_ms: f64,
}

impl RunReport {
    /// Returns the status recorded for a link.
    #[must_use]
    pub fn status_of(&self, link: Link) -> Option<LinkStatus> {
        self.links.iter().find(|r| r.link == link).map(|r| r.status)
    }

    /// Returns the links that ran, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<Link> {
        self.links
            .iter()
            .filter(|r| r.status.ran())
            .map(|r| r.link)
            .collect()
    }
}

/// A statically ordered list of links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChain {
    links: Vec<Link>,
}

impl LinkChain {
    /// The standard collection run, with or without looping.
    #[must_use]
    pub fn collection_run(loop_enabled: bool) -> Self {
        let mut links = vec![
            Link::Initialize,
            Link::TestConnection,
            Link::SetSessionUserName,
            Link::InitCache,
            Link::GetDomainsForEnumeration,
            Link::StartBaseCollectionTask,
        ];
        if loop_enabled {
            links.extend([Link::StartLoopTimer, Link::StartLoop, Link::AwaitLoopCompletion]);
        } else {
            links.push(Link::AwaitBaseRunCompletion);
        }
        links.extend([Link::DisposeTimer, Link::SaveCacheFile, Link::Finish]);
        Self { links }
    }

    /// The standard chain for a context's loop flag.
    #[must_use]
    pub fn for_context(ctx: &RunContext) -> Self {
        Self::collection_run(ctx.flags.loop_enabled)
    }

    /// A custom chain.
    #[must_use]
    pub fn from_links(links: Vec<Link>) -> Self {
        Self { links }
    }

    /// Returns the links in order.
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Runs every link in order.
    ///
    /// Once the context is faulted only cleanup links run. A failed
    /// collection is returned as an error after the cleanup links have run.
    pub async fn run(&self, links: &Links, ctx: &mut RunContext) -> Result<RunReport, ReconError> {
        let start = Instant::now();
        let mut records = Vec::with_capacity(self.links.len());
        let mut collection_error = None;

        for &link in &self.links {
            if ctx.is_faulted() && !link.is_cleanup() {
                trace!(link = %link, "Run faulted, skipping link");
                records.push(LinkRecord {
                    link,
                    status: LinkStatus::Skipped,
                    duration_ms: 0.0,
                });
                continue;
            }

            let span = info_span!("link", run_id = %ctx.identity.run_id, link = %link);
            let was_faulted = ctx.is_faulted();
            let link_start = Instant::now();

            trace!(parent: &span, "Entering link");
            let result = links.execute(link, ctx).instrument(span.clone()).await;
            trace!(parent: &span, "Leaving link");

            let status = if result.is_err() || (!was_faulted && ctx.is_faulted()) {
                LinkStatus::Faulted
            } else {
                LinkStatus::Completed
            };
            records.push(LinkRecord {
                link,
                status,
                duration_ms: link_start.elapsed().as_secs_f64() * 1000.0,
            });

            if let Err(e) = result {
                collection_error.get_or_insert(e);
            }
        }

        if let Some(e) = collection_error {
            return Err(e);
        }

        let report = RunReport {
            run_id: ctx.identity.run_id,
            links: records,
            is_faulted: ctx.is_faulted(),
            fault: ctx.fault.clone(),
            domains_enumerated: ctx.domains.len(),
            cancelled: ctx.cancellation.is_cancelled(),
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        emit_run_summary(&report);
        Ok(report)
    }
}

/// Runs the standard chain for `options` against `links`.
pub async fn run_collection(links: &Links, options: RunOptions) -> Result<RunReport, ReconError> {
    let mut ctx = RunContext::new(options);
    LinkChain::for_context(&ctx).run(links, &mut ctx).await
}
