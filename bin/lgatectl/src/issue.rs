//! ---
//! lgate_section: "05-cli"
//! lgate_subsection: "command"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Issue signed license files for development and support."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, SecondsFormat, Utc};
use clap::Args;
use lgate_licensing::certificates::{
    decode_signing_key, encode_public_key, issue_certificate, LicensePayload,
};
use tracing::info;

#[derive(Debug, Args)]
pub struct IssueCommand {
    #[arg(
        long,
        value_name = "FILE",
        help = "File holding the base64 Ed25519 secret seed"
    )]
    signing_key: PathBuf,
    #[arg(long, help = "License holder")]
    owner: String,
    #[arg(long, default_value = "localize-plus", help = "Product the license unlocks")]
    product: String,
    #[arg(long, help = "License key identifier")]
    key_id: String,
    #[arg(long, default_value_t = 365, help = "Validity in days from now")]
    days: i64,
    #[arg(long, value_name = "FILE", help = "Write the license here instead of stdout")]
    output: Option<PathBuf>,
    #[arg(long, help = "Also print the matching public key to stderr")]
    print_public_key: bool,
}

impl IssueCommand {
    pub fn execute(self) -> Result<()> {
        let seed = fs::read_to_string(&self.signing_key).with_context(|| {
            format!("unable to read signing key {}", self.signing_key.display())
        })?;
        let signing_key = decode_signing_key(&seed)?;
        let payload = self.payload()?;
        let license = issue_certificate(&payload, &signing_key)?;

        match &self.output {
            Some(path) => {
                fs::write(path, format!("{license}\n"))
                    .with_context(|| format!("failed to write license to {}", path.display()))?;
                info!(
                    license_path = %path.display(),
                    key_id = %payload.key_id,
                    expires_at = %payload.expires_at,
                    "license issued"
                );
            }
            None => println!("{license}"),
        }
        if self.print_public_key {
            eprintln!("public_key = \"{}\"", encode_public_key(&signing_key));
        }
        Ok(())
    }

    fn payload(&self) -> Result<LicensePayload> {
        if self.days <= 0 {
            return Err(anyhow!("--days must be positive, got {}", self.days));
        }
        let now = Utc::now();
        Ok(LicensePayload {
            key_id: self.key_id.clone(),
            owner: self.owner.clone(),
            product: self.product.clone(),
            expires_at: (now + Duration::days(self.days)).to_rfc3339_opts(SecondsFormat::Secs, true),
            issued_at: Some(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};
    use ed25519_dalek::SigningKey;
    use lgate_licensing::certificates::{verify_certificate, LicenseCertificate};

    const SEED: [u8; 32] = [5u8; 32];

    fn command(dir: &tempfile::TempDir, days: i64) -> IssueCommand {
        let key_path = dir.path().join("signing.key");
        fs::write(&key_path, general_purpose::STANDARD.encode(SEED)).unwrap();
        IssueCommand {
            signing_key: key_path,
            owner: "Support".into(),
            product: "localize-plus".into(),
            key_id: "DEV-1".into(),
            days,
            output: Some(dir.path().join("license.lic")),
            print_public_key: false,
        }
    }

    #[test]
    fn issued_license_verifies_against_public_key() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = command(&dir, 30);
        let output = cmd.output.clone().unwrap();
        cmd.execute().unwrap();

        let raw = fs::read_to_string(output).unwrap();
        let certificate = LicenseCertificate::decode(raw.trim()).unwrap();
        let key = SigningKey::from_bytes(&SEED);
        verify_certificate(&certificate, &key.verifying_key().to_bytes()).unwrap();
        assert_eq!(certificate.payload.key_id, "DEV-1");
        assert_eq!(certificate.payload.product, "localize-plus");
        assert!(certificate.payload.expires_at().unwrap() > Utc::now());
    }

    #[test]
    fn rejects_non_positive_validity() {
        let dir = tempfile::tempdir().unwrap();
        let err = command(&dir, 0).execute().unwrap_err();
        assert!(err.to_string().contains("--days must be positive"));
    }

    #[test]
    fn missing_signing_key_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut cmd = command(&dir, 30);
        cmd.signing_key = dir.path().join("absent.key");
        let err = cmd.execute().unwrap_err();
        assert!(err.to_string().contains("unable to read signing key"));
    }
}
