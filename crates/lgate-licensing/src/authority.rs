//! ---
//! lgate_section: "01-license-gate"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "License authority capability and its scripted test double."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::core::FailureKind;

/// Answer returned by a license authority for the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entitlement {
    /// The process holds a current license.
    Licensed,
    /// No license, or license material that does not grant entitlement.
    Unlicensed,
    /// A license exists but its validity window has passed.
    Expired,
    /// The authority answered without a usable verdict.
    Unknown,
}

impl fmt::Display for Entitlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entitlement::Licensed => write!(f, "licensed"),
            Entitlement::Unlicensed => write!(f, "unlicensed"),
            Entitlement::Expired => write!(f, "expired"),
            Entitlement::Unknown => write!(f, "unknown"),
        }
    }
}

/// Failures raised by a license authority implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthorityError {
    /// Network or service failure while reaching the authority.
    #[error("{0}")]
    Unavailable(String),
    /// The authority returned a malformed or absent response.
    #[error("{0}")]
    Indeterminate(String),
    /// The activation/renewal flow could not be shown.
    #[error("{0}")]
    PromptUnavailable(String),
}

impl AuthorityError {
    /// Taxonomy bucket the error belongs to.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthorityError::Unavailable(_) => FailureKind::AuthorityUnavailable,
            AuthorityError::Indeterminate(_) => FailureKind::AuthorityIndeterminate,
            AuthorityError::PromptUnavailable(_) => FailureKind::PromptUnavailable,
        }
    }
}

/// Narrow capability onto whatever holds the ground truth on entitlement.
///
/// Implementations may block (network I/O, file reads); callers are expected
/// to invoke them from a worker context.
pub trait LicenseAuthority: Send + Sync {
    /// Ask whether the running process is entitled to run.
    fn is_licensed(&self) -> Result<Entitlement, AuthorityError>;

    /// Present the authority's activation or renewal flow with `message`.
    fn request_license(&self, message: &str) -> Result<(), AuthorityError>;
}

/// Mock authority returning predetermined responses, useful for tests and examples.
#[derive(Debug)]
pub struct MockLicenseAuthority {
    check: Result<Entitlement, AuthorityError>,
    request: Result<(), AuthorityError>,
    panic_on_check: bool,
    panic_on_request: bool,
    delay: Option<Duration>,
    check_calls: AtomicUsize,
    request_calls: AtomicUsize,
    last_message: Mutex<Option<String>>,
}

impl MockLicenseAuthority {
    /// Construct a mock answering `is_licensed` with `check`.
    #[must_use]
    pub fn new(check: Result<Entitlement, AuthorityError>) -> Self {
        Self {
            check,
            request: Ok(()),
            panic_on_check: false,
            panic_on_request: false,
            delay: None,
            check_calls: AtomicUsize::new(0),
            request_calls: AtomicUsize::new(0),
            last_message: Mutex::new(None),
        }
    }

    /// Mock reporting a current license.
    #[must_use]
    pub fn licensed() -> Self {
        Self::new(Ok(Entitlement::Licensed))
    }

    /// Mock reporting no license.
    #[must_use]
    pub fn unlicensed() -> Self {
        Self::new(Ok(Entitlement::Unlicensed))
    }

    /// Mock reporting an expired license.
    #[must_use]
    pub fn expired() -> Self {
        Self::new(Ok(Entitlement::Expired))
    }

    /// Mock whose check fails with `error`.
    #[must_use]
    pub fn failing(error: AuthorityError) -> Self {
        Self::new(Err(error))
    }

    /// Override the result of `request_license`.
    #[must_use]
    pub fn with_request_result(mut self, result: Result<(), AuthorityError>) -> Self {
        self.request = result;
        self
    }

    /// Make `is_licensed` panic instead of answering.
    #[must_use]
    pub fn panicking_on_check(mut self) -> Self {
        self.panic_on_check = true;
        self
    }

    /// Make `request_license` panic instead of answering.
    #[must_use]
    pub fn panicking_on_request(mut self) -> Self {
        self.panic_on_request = true;
        self
    }

    /// Sleep for `delay` before answering `is_licensed`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `is_licensed` invocations so far.
    #[must_use]
    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    /// Number of `request_license` invocations so far.
    #[must_use]
    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    /// Message passed to the most recent `request_license` call.
    #[must_use]
    pub fn last_message(&self) -> Option<String> {
        self.last_message.lock().clone()
    }
}

impl LicenseAuthority for MockLicenseAuthority {
    fn is_licensed(&self) -> Result<Entitlement, AuthorityError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.panic_on_check {
            panic!("mock authority failure during license check");
        }
        self.check.clone()
    }

    fn request_license(&self, message: &str) -> Result<(), AuthorityError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_message.lock() = Some(message.to_owned());
        if self.panic_on_request {
            panic!("mock authority failure while opening registration");
        }
        self.request.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_follow_taxonomy() {
        assert_eq!(
            AuthorityError::Unavailable("down".into()).kind(),
            FailureKind::AuthorityUnavailable
        );
        assert_eq!(
            AuthorityError::Indeterminate("null".into()).kind(),
            FailureKind::AuthorityIndeterminate
        );
        assert_eq!(
            AuthorityError::PromptUnavailable("headless".into()).kind(),
            FailureKind::PromptUnavailable
        );
    }

    #[test]
    fn mock_records_calls_and_message() {
        let mock = MockLicenseAuthority::unlicensed();
        assert_eq!(mock.is_licensed(), Ok(Entitlement::Unlicensed));
        assert!(mock.request_license("renew please").is_ok());
        assert_eq!(mock.check_calls(), 1);
        assert_eq!(mock.request_calls(), 1);
        assert_eq!(mock.last_message().as_deref(), Some("renew please"));
    }
}
