//! Wide run summaries: one structured event describing a whole run.

use crate::pipeline::RunReport;
use tracing::info;

/// Builds the summary payload of a run.
#[must_use]
pub fn run_payload(report: &RunReport) -> serde_json::Value {
    let links: Vec<serde_json::Value> = report
        .links
        .iter()
        .map(|record| {
            serde_json::json!({
                "link": record.link.name(),
                "status": record.status.to_string(),
                "duration_ms": record.duration_ms,
            })
        })
        .collect();

    let mut payload = serde_json::json!({
        "run_id": report.run_id.to_string(),
        "is_faulted": report.is_faulted,
        "cancelled": report.cancelled,
        "domains_enumerated": report.domains_enumerated,
        "duration_ms": report.duration_ms,
        "links": links,
    });

    if let Some(fault) = &report.fault {
        payload["fault"] = serde_json::json!({
            "kind": fault.kind.to_string(),
            "message": fault.message,
        });
    }

    payload
}

/// Logs the summary payload of a run at info level.
pub fn emit_run_summary(report: &RunReport) {
    info!(
        run_id = %report.run_id,
        summary = %run_payload(report),
        "run.wide"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunFault;
    use crate::core::LinkStatus;
    use crate::errors::FaultKind;
    use crate::pipeline::{Link, LinkRecord};
    use uuid::Uuid;

    #[test]
    fn test_payload_includes_links_and_fault() {
        let report = RunReport {
            run_id: Uuid::new_v4(),
            links: vec![
                LinkRecord {
                    link: Link::Initialize,
                    status: LinkStatus::Faulted,
                    duration_ms: 1.5,
                },
                LinkRecord {
                    link: Link::TestConnection,
                    status: LinkStatus::Skipped,
                    duration_ms: 0.0,
                },
            ],
            is_faulted: true,
            fault: Some(RunFault {
                kind: FaultKind::Configuration,
                message: "bad credentials".to_string(),
            }),
            domains_enumerated: 0,
            cancelled: false,
            duration_ms: 2.0,
        };

        let payload = run_payload(&report);
        assert_eq!(payload["links"][0]["link"], "Initialize");
        assert_eq!(payload["links"][1]["status"], "skipped");
        assert_eq!(payload["fault"]["kind"], "configuration");
        assert_eq!(payload["is_faulted"], true);
    }

    #[test]
    fn test_payload_without_fault() {
        let report = RunReport {
            run_id: Uuid::new_v4(),
            links: Vec::new(),
            is_faulted: false,
            fault: None,
            domains_enumerated: 3,
            cancelled: true,
            duration_ms: 0.0,
        };
        let payload = run_payload(&report);
        assert!(payload.get("fault").is_none());
        assert_eq!(payload["domains_enumerated"], 3);
    }
}
