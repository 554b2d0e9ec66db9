//! Test assertions for run reports.

use crate::core::LinkStatus;
use crate::pipeline::{Link, RunReport};

/// Asserts that exactly `expected` ran, in order.
pub fn assert_links_ran(report: &RunReport, expected: &[Link]) {
    let executed = report.executed();
    assert_eq!(
        executed, expected,
        "Expected links {expected:?} to run, got {executed:?}"
    );
}

/// Asserts the status recorded for a link.
pub fn assert_link_status(report: &RunReport, link: Link, expected: LinkStatus) {
    let actual = report.status_of(link);
    assert_eq!(
        actual,
        Some(expected),
        "Expected {link} to be {expected}, got {actual:?}"
    );
}

/// Asserts that after `link` only cleanup links ran.
pub fn assert_only_cleanup_after(report: &RunReport, link: Link) {
    let position = report
        .links
        .iter()
        .position(|r| r.link == link)
        .unwrap_or_else(|| panic!("{link} is not part of the run"));

    for record in &report.links[position + 1..] {
        if record.status.ran() {
            assert!(
                record.link.is_cleanup(),
                "{} ran after {link} although it is not a cleanup link",
                record.link
            );
        }
    }
}

/// Asserts that the run faulted.
pub fn assert_run_faulted(report: &RunReport) {
    assert!(
        report.is_faulted,
        "Expected the run to fault, links: {:?}",
        report.links
    );
}
