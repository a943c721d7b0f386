//! ---
//! lgate_section: "01-license-gate"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Authority backed by a signed license file or environment variable."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::authority::{AuthorityError, Entitlement, LicenseAuthority};
use crate::certificates::{verify_certificate, LicenseCertificate};

/// Default environment variable consulted for license material.
pub const DEFAULT_LICENSE_ENV: &str = "LGATE_LICENSE";

/// Authority backed by a signed license file or environment variable.
#[derive(Debug, Clone)]
pub struct FileLicenseAuthority {
    path: Option<PathBuf>,
    env_var: String,
    public_key: Option<[u8; 32]>,
    product: Option<String>,
    activation_url: Option<String>,
}

impl Default for FileLicenseAuthority {
    fn default() -> Self {
        Self {
            path: None,
            env_var: DEFAULT_LICENSE_ENV.to_owned(),
            public_key: None,
            product: None,
            activation_url: None,
        }
    }
}

impl FileLicenseAuthority {
    /// Authority with no material source and no verification key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read license material from `path` when it exists.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Fall back to this environment variable when no file is present.
    #[must_use]
    pub fn with_env_var(mut self, env_var: impl Into<String>) -> Self {
        self.env_var = env_var.into();
        self
    }

    /// Key used to verify license signatures.
    #[must_use]
    pub fn with_public_key(mut self, public_key: [u8; 32]) -> Self {
        self.public_key = Some(public_key);
        self
    }

    /// Only accept licenses issued for `product`.
    #[must_use]
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    /// Where users activate or renew their license.
    #[must_use]
    pub fn with_activation_url(mut self, url: impl Into<String>) -> Self {
        self.activation_url = Some(url.into());
        self
    }

    fn load_material(&self) -> Result<Option<String>, AuthorityError> {
        if let Some(path) = &self.path {
            if path.exists() {
                debug!(license_path = %path.display(), "loading license file");
                let raw = fs::read_to_string(path).map_err(|err| {
                    AuthorityError::Unavailable(format!(
                        "unable to read license file {}: {err}",
                        path.display()
                    ))
                })?;
                return Ok(Some(raw.trim().to_owned()));
            }
        }

        match std::env::var(&self.env_var) {
            Ok(value) if !value.trim().is_empty() => {
                debug!(env = %self.env_var, "loaded license material from environment");
                Ok(Some(value.trim().to_owned()))
            }
            _ => Ok(None),
        }
    }
}

impl LicenseAuthority for FileLicenseAuthority {
    fn is_licensed(&self) -> Result<Entitlement, AuthorityError> {
        let Some(material) = self.load_material()? else {
            info!("no license material found");
            return Ok(Entitlement::Unlicensed);
        };
        let public_key = self.public_key.ok_or_else(|| {
            AuthorityError::Indeterminate("no license verification key configured".to_owned())
        })?;

        let certificate = match LicenseCertificate::decode(&material) {
            Ok(certificate) => certificate,
            Err(err) => {
                warn!(error = %err, "license material is malformed");
                return Ok(Entitlement::Unlicensed);
            }
        };
        if let Err(err) = verify_certificate(&certificate, &public_key) {
            warn!(error = %err, "license signature rejected");
            return Ok(Entitlement::Unlicensed);
        }

        let payload = &certificate.payload;
        if let Some(product) = &self.product {
            if &payload.product != product {
                warn!(
                    expected = %product,
                    actual = %payload.product,
                    "license issued for a different product"
                );
                return Ok(Entitlement::Unlicensed);
            }
        }

        let expires_at = payload
            .expires_at()
            .map_err(|err| AuthorityError::Indeterminate(err.to_string()))?;
        payload
            .issued_at()
            .map_err(|err| AuthorityError::Indeterminate(err.to_string()))?;

        if expires_at < Utc::now() {
            info!(key_id = %payload.key_id, expires_at = %expires_at, "license expired");
            return Ok(Entitlement::Expired);
        }

        info!(
            key_id = %payload.key_id,
            owner = %payload.owner,
            expires_at = %expires_at,
            "license validated"
        );
        Ok(Entitlement::Licensed)
    }

    fn request_license(&self, message: &str) -> Result<(), AuthorityError> {
        let url = self.activation_url.as_deref().ok_or_else(|| {
            AuthorityError::PromptUnavailable("no activation url configured".to_owned())
        })?;
        info!(activation_url = %url, "directing user to license activation");
        eprintln!("{message}");
        eprintln!("Activate or renew at: {url}");
        Ok(())
    }
}
