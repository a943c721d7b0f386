//! ---
//! lgate_section: "01-license-gate"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "License verification lifecycle and entitlement checks."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::authority::{AuthorityError, Entitlement, LicenseAuthority};
use crate::logging::{record_license_check, record_remediation};

/// Failure taxonomy shared by checks and remediation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network or service failure.
    AuthorityUnavailable,
    /// Malformed or absent response.
    AuthorityIndeterminate,
    /// Remediation UI could not be shown.
    PromptUnavailable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::AuthorityUnavailable => write!(f, "authority-unavailable"),
            FailureKind::AuthorityIndeterminate => write!(f, "authority-indeterminate"),
            FailureKind::PromptUnavailable => write!(f, "prompt-unavailable"),
        }
    }
}

/// Why a check or remediation request could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    /// Taxonomy bucket.
    pub kind: FailureKind,
    /// Human readable detail, as reported by the authority where available.
    pub detail: String,
}

impl CheckFailure {
    /// Build a failure from its parts.
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl From<AuthorityError> for CheckFailure {
    fn from(err: AuthorityError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

/// Result of a single verification request.
///
/// `CheckFailed` keeps "could not tell" apart from "not entitled" even though
/// [`decide`] currently blocks on both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LicenseStatus {
    /// The process is entitled to run.
    Valid,
    /// The authority denied entitlement.
    Invalid,
    /// The license validity window has passed.
    Expired,
    /// Entitlement could not be determined.
    CheckFailed(CheckFailure),
}

impl LicenseStatus {
    /// Returns true only for [`LicenseStatus::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, LicenseStatus::Valid)
    }

    /// Short label used for metrics and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            LicenseStatus::Valid => "valid",
            LicenseStatus::Invalid => "invalid",
            LicenseStatus::Expired => "expired",
            LicenseStatus::CheckFailed(_) => "check_failed",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LicenseStatus::CheckFailed(reason) => write!(f, "check failed ({reason})"),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Result of asking the authority to open its activation flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RemediationOutcome {
    /// The user accepted and the activation flow was opened.
    UserAccepted,
    /// The user declined the prompt.
    UserDeclined,
    /// The prompt or the activation flow could not be shown.
    PromptFailed(CheckFailure),
}

impl RemediationOutcome {
    /// Short label used for metrics and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RemediationOutcome::UserAccepted => "user_accepted",
            RemediationOutcome::UserDeclined => "user_declined",
            RemediationOutcome::PromptFailed(_) => "prompt_failed",
        }
    }
}

/// Terminal instruction handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Continue normal execution.
    Proceed,
    /// Halt further execution; the mechanism is up to the host.
    Block,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Proceed => write!(f, "proceed"),
            Action::Block => write!(f, "block"),
        }
    }
}

/// Gate policy: only `Valid` proceeds, everything else fails closed.
#[must_use]
pub fn decide(status: &LicenseStatus) -> Action {
    match status {
        LicenseStatus::Valid => Action::Proceed,
        LicenseStatus::Invalid | LicenseStatus::Expired | LicenseStatus::CheckFailed(_) => {
            Action::Block
        }
    }
}

/// Owns the entitlement decision for the running process.
#[derive(Clone)]
pub struct LicenseGate {
    authority: Arc<dyn LicenseAuthority>,
}

impl fmt::Debug for LicenseGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseGate").finish_non_exhaustive()
    }
}

impl LicenseGate {
    /// Construct a gate around an authority.
    pub fn new<A>(authority: A) -> Self
    where
        A: LicenseAuthority + 'static,
    {
        Self {
            authority: Arc::new(authority),
        }
    }

    /// Construct a gate around an already shared authority.
    #[must_use]
    pub fn from_shared(authority: Arc<dyn LicenseAuthority>) -> Self {
        Self { authority }
    }

    /// Ask the authority once, classify the answer and count it. Never panics.
    pub fn verify(&self) -> LicenseStatus {
        let status = self.classify();
        record_license_check(&status);
        status
    }

    /// Ask the authority once and classify the answer without counting it.
    ///
    /// For callers that may discard the answer, such as a timed-out worker;
    /// they must count the status they finally report.
    pub fn classify(&self) -> LicenseStatus {
        debug!("querying license authority");
        let answer = catch_unwind(AssertUnwindSafe(|| self.authority.is_licensed()));
        match answer {
            Ok(Ok(Entitlement::Licensed)) => LicenseStatus::Valid,
            Ok(Ok(Entitlement::Unlicensed)) => LicenseStatus::Invalid,
            Ok(Ok(Entitlement::Expired)) => LicenseStatus::Expired,
            Ok(Ok(Entitlement::Unknown)) => LicenseStatus::CheckFailed(CheckFailure::new(
                FailureKind::AuthorityIndeterminate,
                "authority returned no verdict",
            )),
            Ok(Err(err)) => {
                warn!(error = %err, kind = %err.kind(), "license authority call failed");
                LicenseStatus::CheckFailed(err.into())
            }
            Err(payload) => {
                let detail = panic_detail(payload.as_ref());
                warn!(error = %detail, "license authority panicked during check");
                LicenseStatus::CheckFailed(CheckFailure::new(
                    FailureKind::AuthorityUnavailable,
                    format!("authority panicked: {detail}"),
                ))
            }
        }
    }

    /// Ask the authority to present its activation or renewal flow. Never panics.
    pub fn request_remediation(&self, message: &str) -> RemediationOutcome {
        let answer = catch_unwind(AssertUnwindSafe(|| self.authority.request_license(message)));
        let outcome = match answer {
            Ok(Ok(())) => {
                info!("license registration flow opened");
                RemediationOutcome::UserAccepted
            }
            Ok(Err(err)) => {
                warn!(error = %err, "failed to open registration flow");
                RemediationOutcome::PromptFailed(CheckFailure::new(
                    FailureKind::PromptUnavailable,
                    err.to_string(),
                ))
            }
            Err(payload) => {
                let detail = panic_detail(payload.as_ref());
                warn!(error = %detail, "license authority panicked while opening registration");
                RemediationOutcome::PromptFailed(CheckFailure::new(
                    FailureKind::PromptUnavailable,
                    format!("authority panicked: {detail}"),
                ))
            }
        };
        record_remediation(&outcome);
        outcome
    }
}

/// Best-effort rendering of a panic payload.
pub(crate) fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::MockLicenseAuthority;

    fn all_statuses() -> Vec<LicenseStatus> {
        vec![
            LicenseStatus::Valid,
            LicenseStatus::Invalid,
            LicenseStatus::Expired,
            LicenseStatus::CheckFailed(CheckFailure::new(
                FailureKind::AuthorityUnavailable,
                "network error",
            )),
            LicenseStatus::CheckFailed(CheckFailure::new(
                FailureKind::AuthorityIndeterminate,
                "null",
            )),
        ]
    }

    #[test]
    fn only_valid_proceeds() {
        for status in all_statuses() {
            let expected = if status.is_valid() {
                Action::Proceed
            } else {
                Action::Block
            };
            assert_eq!(decide(&status), expected, "status {status}");
        }
    }

    #[test]
    fn decide_is_idempotent() {
        for status in all_statuses() {
            assert_eq!(decide(&status), decide(&status));
        }
    }

    #[test]
    fn entitlements_map_to_statuses() {
        let cases = [
            (MockLicenseAuthority::licensed(), LicenseStatus::Valid),
            (MockLicenseAuthority::unlicensed(), LicenseStatus::Invalid),
            (MockLicenseAuthority::expired(), LicenseStatus::Expired),
        ];
        for (mock, expected) in cases {
            assert_eq!(LicenseGate::new(mock).verify(), expected);
        }
    }

    #[test]
    fn unknown_entitlement_is_not_invalid() {
        let gate = LicenseGate::new(MockLicenseAuthority::new(Ok(Entitlement::Unknown)));
        match gate.verify() {
            LicenseStatus::CheckFailed(reason) => {
                assert_eq!(reason.kind, FailureKind::AuthorityIndeterminate)
            }
            other => panic!("unexpected status {other}"),
        }
    }

    #[test]
    fn authority_errors_become_check_failed() {
        let errors = [
            AuthorityError::Unavailable("network error".into()),
            AuthorityError::Indeterminate("empty body".into()),
            AuthorityError::PromptUnavailable("odd".into()),
        ];
        for err in errors {
            let gate = LicenseGate::new(MockLicenseAuthority::failing(err.clone()));
            assert_eq!(
                gate.verify(),
                LicenseStatus::CheckFailed(CheckFailure::new(err.kind(), err.to_string()))
            );
        }
    }

    #[test]
    fn panicking_authority_is_contained() {
        let gate = LicenseGate::new(MockLicenseAuthority::licensed().panicking_on_check());
        match gate.verify() {
            LicenseStatus::CheckFailed(reason) => {
                assert_eq!(reason.kind, FailureKind::AuthorityUnavailable);
                assert!(reason.detail.contains("panicked"));
            }
            other => panic!("unexpected status {other}"),
        }
    }

    #[test]
    fn remediation_failures_become_prompt_failed() {
        let gate = LicenseGate::new(
            MockLicenseAuthority::unlicensed()
                .with_request_result(Err(AuthorityError::Unavailable("no browser".into()))),
        );
        assert_eq!(
            gate.request_remediation("renew"),
            RemediationOutcome::PromptFailed(CheckFailure::new(
                FailureKind::PromptUnavailable,
                "no browser"
            ))
        );

        let gate = LicenseGate::new(MockLicenseAuthority::unlicensed().panicking_on_request());
        assert!(matches!(
            gate.request_remediation("renew"),
            RemediationOutcome::PromptFailed(_)
        ));
    }

    #[test]
    fn remediation_success_is_accepted() {
        let gate = LicenseGate::new(MockLicenseAuthority::expired());
        assert_eq!(
            gate.request_remediation("renew"),
            RemediationOutcome::UserAccepted
        );
    }

    #[test]
    fn status_serialises_with_tag() {
        let status = LicenseStatus::CheckFailed(CheckFailure::new(
            FailureKind::AuthorityUnavailable,
            "network error",
        ));
        let json = serde_json::to_value(&status).expect("serialise status");
        assert_eq!(json["status"], "check_failed");
        assert_eq!(json["kind"], "authority_unavailable");
        assert_eq!(json["detail"], "network error");
    }
}
