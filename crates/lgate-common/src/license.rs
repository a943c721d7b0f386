//! ---
//! lgate_section: "04-configuration"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Wiring between configuration and the license gate."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use anyhow::Result;
use tracing::{debug, warn};

use crate::config::AppConfig;

pub use lgate_licensing::{
    decide, Action, AuthorityError, Entitlement, FileLicenseAuthority, LicenseAuthority,
    LicenseGate, LicenseStatus, MockLicenseAuthority, PromptSpec, RemediationOutcome,
};

/// Build the signed-file authority described by `config`.
pub fn authority_from_config(config: &AppConfig) -> Result<FileLicenseAuthority> {
    let license = &config.license;
    let mut authority = FileLicenseAuthority::new()
        .with_env_var(license.env_var.clone())
        .with_product(config.product.clone());
    if let Some(path) = &license.path {
        debug!(license_path = %path.display(), "license file configured");
        authority = authority.with_path(path.clone());
    }
    match license.public_key_bytes()? {
        Some(key) => authority = authority.with_public_key(key),
        None => warn!("no license verification key configured; checks will be inconclusive"),
    }
    if let Some(url) = &license.activation_url {
        authority = authority.with_activation_url(url.clone());
    }
    Ok(authority)
}

/// Build a [`LicenseGate`] around the configured authority.
pub fn gate_from_config(config: &AppConfig) -> Result<LicenseGate> {
    Ok(LicenseGate::new(authority_from_config(config)?))
}
