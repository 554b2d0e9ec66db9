//! Tests for the context module.

#[cfg(test)]
mod tests {
    use crate::cancellation::CancellationToken;
    use crate::config::RunOptions;
    use crate::context::{RunContext, RunFlags, RunIdentity};
    use crate::core::{CollectionMethod, CollectionMethodOption, EnumerationDomain};
    use crate::errors::FaultKind;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_run_identity_creation() {
        let a = RunIdentity::new();
        let b = RunIdentity::new();
        assert_ne!(a.run_id, b.run_id);
        assert!(a.to_dict().contains_key("run_id"));
    }

    #[test]
    fn test_flags_from_options() {
        let options = RunOptions::new().with_recurse_domains().with_mem_cache();
        let flags = RunFlags::from_options(&options);
        assert!(flags.recurse_domains);
        assert!(flags.mem_cache);
        assert!(!flags.search_forest);
        assert!(!flags.is_faulted);
    }

    #[test]
    fn test_context_from_options() {
        let options = RunOptions::new()
            .with_domain("lab.local")
            .with_collection_methods(vec![CollectionMethodOption::Session])
            .with_loop(Duration::from_secs(600), Duration::from_secs(10));
        let ctx = RunContext::new(options);

        assert_eq!(ctx.domain_name.as_deref(), Some("lab.local"));
        assert_eq!(ctx.resolved_collection_methods, CollectionMethod::SESSION);
        assert!(ctx.flags.loop_enabled);
        assert_eq!(ctx.loop_duration, Duration::from_secs(600));
        assert_eq!(ctx.loop_interval, Duration::from_secs(10));
        assert!(ctx.timer.is_none());
        assert!(ctx.collection_task.is_none());
        assert!(!ctx.is_faulted());
    }

    #[test]
    fn test_blank_domain_is_unset() {
        let ctx = RunContext::new(RunOptions::new().with_domain("   "));
        assert!(ctx.domain_name.is_none());
    }

    #[test]
    fn test_fault_keeps_first_reason() {
        let mut ctx = RunContext::new(RunOptions::new());
        ctx.fault(FaultKind::Configuration, "bad credentials");
        ctx.fault(FaultKind::Connectivity, "unreachable");

        assert!(ctx.is_faulted());
        let fault = ctx.fault.clone().unwrap();
        assert_eq!(fault.kind, FaultKind::Configuration);
        assert_eq!(fault.message, "bad credentials");
    }

    #[test]
    fn test_with_cancellation_rebinds_handshake() {
        let token = Arc::new(CancellationToken::cancelled_with("caller"));
        let ctx = RunContext::new(RunOptions::new()).with_cancellation(token.clone());
        assert!(Arc::ptr_eq(ctx.handshake.token(), &token));
        assert!(ctx.snapshot().cancelled);
    }

    #[test]
    fn test_collection_request_carries_run_state() {
        let mut ctx = RunContext::new(RunOptions::new());
        ctx.domains = vec![EnumerationDomain::new("LAB.LOCAL", "S-1")];
        ctx.current_user_name = "svc_recon".to_string();

        let request = ctx.collection_request();
        assert_eq!(request.run_id, ctx.identity.run_id);
        assert_eq!(request.domains, ctx.domains);
        assert_eq!(request.current_user_name, "svc_recon");
        assert_eq!(request.cycle, 1);
        assert!(Arc::ptr_eq(&request.cache, &ctx.cache));
    }

    #[test]
    fn test_snapshot_equality_tracks_mutation() {
        let mut ctx = RunContext::new(RunOptions::new());
        let before = ctx.snapshot();
        assert_eq!(before, ctx.snapshot());

        ctx.current_user_name = "bob".to_string();
        assert_ne!(before, ctx.snapshot());
        assert!(ctx.snapshot().to_json().unwrap().contains("\"current_user_name\":\"bob\""));
    }
}
