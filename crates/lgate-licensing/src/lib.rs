//! ---
//! lgate_section: "01-license-gate"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "License verification lifecycle and entitlement checks."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! LGATE licensing crate: the fail-closed license gate, the narrow authority
//! capability it consumes, a signed-license-file authority, and the
//! associated telemetry.

pub mod authority;
pub mod certificates;
pub mod core;
pub mod file_authority;
pub mod logging;
pub mod prompt;

pub use authority::{AuthorityError, Entitlement, LicenseAuthority, MockLicenseAuthority};
pub use crate::core::{
    decide, Action, CheckFailure, FailureKind, LicenseGate, LicenseStatus, RemediationOutcome,
};
pub use file_authority::FileLicenseAuthority;
pub use prompt::PromptSpec;
