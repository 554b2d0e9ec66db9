//! The links of a collection run.
//!
//! Each link borrows the run context, mutates it and returns. Faults are
//! recorded on the context rather than returned, so the chain can keep
//! running the cleanup links. Only the collection await links return an
//! error.

use crate::cache::CacheGateway;
use crate::collection::{CollectionTask, LoopManager, LoopRequest};
use crate::config::random_file_name;
use crate::context::RunContext;
use crate::directory::DirectoryAccess;
use crate::discovery::{DiscoveryMode, TrustDiscovery};
use crate::errors::{FaultKind, ReconError};
use crate::looping::LoopTimer;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Loop duration used when looping is requested without one.
pub const DEFAULT_LOOP_DURATION: Duration = Duration::from_secs(2 * 60 * 60);

/// Pause between loop cycles used when none is configured.
pub const DEFAULT_LOOP_INTERVAL: Duration = Duration::from_secs(30);

/// A step of a collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Link {
    /// Validate options, resolve the domain, apply loop defaults, probe output.
    Initialize,
    /// Probe the directory and reset loop bookkeeping.
    TestConnection,
    /// Pick the identity used for session collection.
    SetSessionUserName,
    /// Load the object cache.
    InitCache,
    /// Build the list of domains to enumerate.
    GetDomainsForEnumeration,
    /// Start the base collection without awaiting it.
    StartBaseCollectionTask,
    /// Arm the loop duration timer.
    StartLoopTimer,
    /// Hand collection over to the loop manager.
    StartLoop,
    /// Await the loop.
    AwaitLoopCompletion,
    /// Await the base collection.
    AwaitBaseRunCompletion,
    /// Release the loop timer.
    DisposeTimer,
    /// Persist the object cache.
    SaveCacheFile,
    /// Report completion.
    Finish,
}

impl Link {
    /// Returns the link's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialize => "Initialize",
            Self::TestConnection => "TestConnection",
            Self::SetSessionUserName => "SetSessionUserName",
            Self::InitCache => "InitCache",
            Self::GetDomainsForEnumeration => "GetDomainsForEnumeration",
            Self::StartBaseCollectionTask => "StartBaseCollectionTask",
            Self::StartLoopTimer => "StartLoopTimer",
            Self::StartLoop => "StartLoop",
            Self::AwaitLoopCompletion => "AwaitLoopCompletion",
            Self::AwaitBaseRunCompletion => "AwaitBaseRunCompletion",
            Self::DisposeTimer => "DisposeTimer",
            Self::SaveCacheFile => "SaveCacheFile",
            Self::Finish => "Finish",
        }
    }

    /// Returns true for links that still run after a fault.
    #[must_use]
    pub const fn is_cleanup(self) -> bool {
        matches!(self, Self::DisposeTimer | Self::SaveCacheFile | Self::Finish)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source of the process identity, as `DOMAIN\user` or a bare user name.
pub type IdentitySource = fn() -> Option<String>;

/// Collaborators the links run against.
#[derive(Clone)]
pub struct Links {
    directory: Arc<dyn DirectoryAccess>,
    discovery: TrustDiscovery,
    collector: Arc<dyn CollectionTask>,
    loop_manager: Arc<dyn LoopManager>,
    identity_source: IdentitySource,
}

impl fmt::Debug for Links {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links").finish_non_exhaustive()
    }
}

impl Links {
    /// Creates the links over the given collaborators.
    #[must_use]
    pub fn new(
        directory: Arc<dyn DirectoryAccess>,
        collector: Arc<dyn CollectionTask>,
        loop_manager: Arc<dyn LoopManager>,
    ) -> Self {
        Self {
            discovery: TrustDiscovery::new(directory.clone()),
            directory,
            collector,
            loop_manager,
            identity_source: process_user_name,
        }
    }

    /// Replaces the process identity lookup.
    #[must_use]
    pub fn with_identity_source(mut self, source: IdentitySource) -> Self {
        self.identity_source = source;
        self
    }

    /// Runs one link against the context.
    pub async fn execute(&self, link: Link, ctx: &mut RunContext) -> Result<(), ReconError> {
        match link {
            Link::Initialize => self.initialize(ctx).await,
            Link::TestConnection => self.test_connection(ctx).await,
            Link::SetSessionUserName => self.set_session_user_name(ctx),
            Link::InitCache => init_cache(ctx).await,
            Link::GetDomainsForEnumeration => self.get_domains_for_enumeration(ctx).await,
            Link::StartBaseCollectionTask => self.start_base_collection_task(ctx),
            Link::StartLoopTimer => start_loop_timer(ctx),
            Link::StartLoop => self.start_loop(ctx),
            Link::AwaitLoopCompletion => return await_collection(ctx, "loop").await,
            Link::AwaitBaseRunCompletion => return await_collection(ctx, "base collection").await,
            Link::DisposeTimer => dispose_timer(ctx),
            Link::SaveCacheFile => save_cache_file(ctx).await,
            Link::Finish => finish(ctx),
        }
        Ok(())
    }

    async fn initialize(&self, ctx: &mut RunContext) {
        if !ctx.options.has_consistent_credentials() {
            ctx.fault(
                FaultKind::Configuration,
                "You must specify both an LDAP username and an LDAP password if using these options",
            );
            return;
        }

        if ctx.domain_name.is_none() {
            match self.directory.resolve_current_domain().await {
                Ok(domain) => {
                    info!(domain = %domain.name, "Resolved current domain");
                    ctx.domain_name = Some(domain.name);
                }
                Err(e) => {
                    ctx.fault(
                        FaultKind::Resolution,
                        format!("Unable to resolve a domain to use, manually specify one or check spelling ({e})"),
                    );
                    return;
                }
            }
        }

        if ctx.flags.loop_enabled {
            if ctx.loop_duration.is_zero() {
                ctx.loop_duration = DEFAULT_LOOP_DURATION;
            }
            if ctx.loop_interval.is_zero() {
                ctx.loop_interval = DEFAULT_LOOP_INTERVAL;
            }
            let representable = chrono::Duration::from_std(ctx.loop_duration)
                .ok()
                .and_then(|d| Utc::now().checked_add_signed(d))
                .is_some();
            if !representable {
                ctx.fault(
                    FaultKind::Configuration,
                    format!("Loop duration of {}s is out of range", ctx.loop_duration.as_secs()),
                );
                return;
            }
            info!(
                duration_secs = ctx.loop_duration.as_secs(),
                interval_secs = ctx.loop_interval.as_secs(),
                "Looping enabled"
            );
        }

        if !ctx.flags.no_output {
            let probe = ctx.options.output_directory.join(random_file_name());
            let result = async {
                tokio::fs::write(&probe, b"").await?;
                tokio::fs::remove_file(&probe).await
            }
            .await;
            if let Err(e) = result {
                ctx.fault(
                    FaultKind::Configuration,
                    format!(
                        "Unable to write to the output directory {}: {e}",
                        ctx.options.output_directory.display()
                    ),
                );
            }
        }
    }

    async fn test_connection(&self, ctx: &mut RunContext) {
        let domain_name = ctx.domain_name.clone().unwrap_or_default();
        let status = self.directory.test_connectivity(&domain_name).await;
        if !status.ok {
            ctx.fault(
                FaultKind::Connectivity,
                format!("Unable to connect to LDAP, verify your credentials: {}", status.message),
            );
            return;
        }
        debug!(domain = %domain_name, "Directory reachable");

        ctx.handshake.reset();
        ctx.timer = None;
        ctx.loop_end = Utc::now();
    }

    fn set_session_user_name(&self, ctx: &mut RunContext) {
        if let Some(name) = ctx
            .options
            .override_user_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
        {
            ctx.current_user_name = name.to_string();
            return;
        }

        match (self.identity_source)() {
            Some(identity) => ctx.current_user_name = strip_domain(&identity).to_string(),
            None => warn!("Unable to determine the current user name, session collection may be incomplete"),
        }
        trace!(user = %ctx.current_user_name, "Session user name set");
    }

    async fn get_domains_for_enumeration(&self, ctx: &mut RunContext) {
        let mode = DiscoveryMode::from_flags(&ctx.flags);
        info!(mode = %mode, "Building domain list");

        match self.discovery.discover(mode, ctx.domain_name.as_deref()).await {
            Ok(domains) => {
                for domain in &domains {
                    trace!(name = %domain.name(), sid = %domain.domain_sid(), "Enumeration target");
                }
                info!(count = domains.len(), "Domains for enumeration");
                ctx.domains = domains;
            }
            Err(e) => ctx.fault(e.kind(), e.to_string()),
        }
    }

    fn start_base_collection_task(&self, ctx: &mut RunContext) {
        info!(
            methods = %ctx.resolved_collection_methods,
            domains = ctx.domains.len(),
            "Starting base collection"
        );
        ctx.collection_task = Some(self.collector.start(ctx.collection_request()));
    }

    fn start_loop(&self, ctx: &mut RunContext) {
        if !ctx.flags.loop_enabled || ctx.cancellation.is_cancelled() {
            info!("Skipping looping");
            return;
        }

        ctx.resolved_collection_methods = ctx.resolved_collection_methods.loop_methods();
        info!(
            methods = ?ctx.resolved_collection_methods.individual_flags(),
            "Loop collection methods"
        );

        let remaining = (ctx.loop_end - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let request = LoopRequest {
            base: ctx.collection_request(),
            first_cycle: ctx.collection_task.take(),
            interval: ctx.loop_interval,
            deadline: tokio::time::Instant::now() + remaining,
            handshake: ctx.handshake.clone(),
        };
        ctx.collection_task = Some(self.loop_manager.start(request));
    }
}

async fn init_cache(ctx: &mut RunContext) {
    let path = ctx.options.cache_path(ctx.domain_name.as_deref());
    let gateway = CacheGateway::new(&path);
    ctx.cache = Arc::new(gateway.load().await);
    ctx.cache_path = Some(path);
}

fn start_loop_timer(ctx: &mut RunContext) {
    if !ctx.flags.loop_enabled {
        return;
    }
    if ctx.cancellation.is_cancelled() {
        info!("Cancellation already requested, not arming the loop timer");
        return;
    }

    let Some(end) = chrono::Duration::from_std(ctx.loop_duration)
        .ok()
        .and_then(|d| ctx.loop_end.checked_add_signed(d))
    else {
        ctx.fault(FaultKind::Configuration, "Loop duration is out of range");
        return;
    };
    ctx.loop_end = end;
    info!(loop_end = %ctx.loop_end, "Loop timer armed");
    ctx.timer = Some(LoopTimer::arm(ctx.loop_duration, ctx.handshake.clone()));
}

async fn await_collection(ctx: &mut RunContext, what: &str) -> Result<(), ReconError> {
    let Some(task) = ctx.collection_task.take() else {
        debug!(what, "No collection task to await");
        return Ok(());
    };

    match task.wait().await {
        Ok(()) => {
            info!(what, "Collection finished");
            Ok(())
        }
        Err(e) => {
            ctx.fault(e.kind(), format!("The {what} failed: {e}"));
            Err(e)
        }
    }
}

fn dispose_timer(ctx: &mut RunContext) {
    if let Some(mut timer) = ctx.timer.take() {
        timer.dispose();
        trace!("Loop timer disposed");
    }
}

async fn stop_unawaited_collection(ctx: &mut RunContext) {
    let Some(task) = ctx.collection_task.take() else {
        return;
    };
    warn!("Collection still running at cleanup, aborting it");
    task.abort();
    if let Err(e) = task.wait().await {
        debug!(error = %e, "Unawaited collection stopped");
    }
}

async fn save_cache_file(ctx: &mut RunContext) {
    stop_unawaited_collection(ctx).await;
    if ctx.flags.mem_cache {
        debug!("Memory-only cache, not saving");
        return;
    }
    let Some(path) = ctx.cache_path.clone() else {
        debug!("Cache was never initialized, not saving");
        return;
    };

    if let Err(e) = CacheGateway::new(path).save(&ctx.cache).await {
        error!(error = %e, "Error saving cache");
    }
}

fn finish(ctx: &mut RunContext) {
    let elapsed = Utc::now() - ctx.identity.started_at;
    if ctx.is_faulted() {
        error!(
            run_id = %ctx.identity.run_id,
            elapsed_ms = elapsed.num_milliseconds(),
            "Enumeration finished with faults"
        );
    } else {
        info!(
            run_id = %ctx.identity.run_id,
            elapsed_ms = elapsed.num_milliseconds(),
            domains = ctx.domains.len(),
            "Enumeration completed"
        );
    }
}

/// Reads the current process identity from the environment.
#[must_use]
pub fn process_user_name() -> Option<String> {
    let user = std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .ok()
        .filter(|u| !u.is_empty())?;
    match std::env::var("USERDOMAIN") {
        Ok(domain) if !domain.is_empty() => Some(format!("{domain}\\{user}")),
        _ => Some(user),
    }
}

/// Strips a `DOMAIN\` qualifier from an account name.
#[must_use]
pub fn strip_domain(name: &str) -> &str {
    name.rsplit_once('\\').map_or(name, |(_, user)| user)
}
