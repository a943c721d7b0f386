//! ---
//! lgate_section: "01-license-gate"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Prometheus counters and structured events for gate outcomes."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use tracing::info;

use crate::core::{LicenseStatus, RemediationOutcome};

static LICENSE_CHECKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "license_checks_total",
        "Total number of license verifications by resulting status",
        &["status"]
    )
    .expect("metric registration to succeed")
});

static LICENSE_REMEDIATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "license_remediations_total",
        "Total number of remediation prompts by outcome",
        &["outcome"]
    )
    .expect("metric registration to succeed")
});

static LICENSE_BLOCKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "license_blocks_total",
        "Total number of verification cycles that ended blocked"
    )
    .expect("metric registration to succeed")
});

/// Record the status produced by a verification.
pub fn record_license_check(status: &LicenseStatus) {
    LICENSE_CHECKS_TOTAL
        .with_label_values(&[status.label()])
        .inc();
    match status {
        LicenseStatus::Valid => info!(status = status.label(), "license accepted"),
        LicenseStatus::CheckFailed(reason) => info!(
            status = status.label(),
            kind = %reason.kind,
            detail = %reason.detail,
            "license check inconclusive"
        ),
        _ => info!(status = status.label(), "license rejected"),
    }
}

/// Record how a remediation prompt ended.
pub fn record_remediation(outcome: &RemediationOutcome) {
    LICENSE_REMEDIATIONS_TOTAL
        .with_label_values(&[outcome.label()])
        .inc();
    info!(outcome = outcome.label(), "license remediation finished");
}

/// Record a verification cycle that ended in `Block`.
pub fn record_block(reason: &str) {
    LICENSE_BLOCKS_TOTAL.inc();
    info!(reason = reason, "license gate blocked execution");
}

/// Number of checks recorded with the given status label.
#[must_use]
pub fn checks_with_status(label: &str) -> u64 {
    LICENSE_CHECKS_TOTAL.with_label_values(&[label]).get()
}

/// Number of remediation prompts recorded with the given outcome label.
#[must_use]
pub fn remediations_with_outcome(label: &str) -> u64 {
    LICENSE_REMEDIATIONS_TOTAL.with_label_values(&[label]).get()
}

/// Number of blocked cycles recorded.
#[must_use]
pub fn blocks_total() -> u64 {
    LICENSE_BLOCKS_TOTAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let before = checks_with_status("expired");
        record_license_check(&LicenseStatus::Expired);
        assert!(checks_with_status("expired") > before);

        let before = remediations_with_outcome("user_declined");
        record_remediation(&RemediationOutcome::UserDeclined);
        assert!(remediations_with_outcome("user_declined") > before);

        let before = blocks_total();
        record_block("test");
        assert!(blocks_total() > before);
    }
}
