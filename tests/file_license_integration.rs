//! ---
//! lgate_section: "06-testing"
//! lgate_subsection: "integration-tests"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Configured signed-file authority driven through the startup cycle."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, SecondsFormat, Utc};
use ed25519_dalek::SigningKey;
use lgate_common::config::AppConfig;
use lgate_common::license::gate_from_config;
use lgate_licensing::certificates::{issue_certificate, LicensePayload};
use lgate_licensing::{Action, LicenseStatus, RemediationOutcome};
use lgate_rt::{CycleReport, MockLifecycle, MockPresenter, StartupCheck};
use tempfile::tempdir;

fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&[21u8; 32])
}

fn write_license(path: &Path, key: &SigningKey, product: &str, expires_in: Duration) {
    let payload = LicensePayload {
        key_id: "INT-1".into(),
        owner: "Integration".into(),
        product: product.into(),
        expires_at: (Utc::now() + expires_in).to_rfc3339_opts(SecondsFormat::Secs, true),
        issued_at: None,
    };
    fs::write(path, issue_certificate(&payload, key).unwrap()).unwrap();
}

fn config(license_path: &Path, extra: &str) -> AppConfig {
    let public_key = general_purpose::STANDARD.encode(signing_key().verifying_key().to_bytes());
    format!(
        "product = \"localize-plus\"\n\
         display_name = \"Android Localize Plus\"\n\n\
         [license]\n\
         path = {license_path:?}\n\
         env_var = \"LGATE_IT_UNSET_LICENSE\"\n\
         public_key = \"{public_key}\"\n\
         {extra}"
    )
    .parse()
    .unwrap()
}

async fn run(config: &AppConfig, presenter: Arc<MockPresenter>) -> CycleReport {
    let gate = gate_from_config(config).unwrap();
    StartupCheck::new(gate, presenter, Arc::new(MockLifecycle::default()))
        .with_timeout(config.gate.timeout)
        .with_prompt(config.prompt())
        .with_product(config.product.clone())
        .run()
        .await
}

#[tokio::test]
async fn signed_license_on_disk_proceeds() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("license.lic");
    write_license(&path, &signing_key(), "localize-plus", Duration::days(10));

    let report = run(&config(&path, ""), Arc::new(MockPresenter::declining())).await;
    assert_eq!(report.status, LicenseStatus::Valid);
    assert_eq!(report.action, Action::Proceed);
}

#[tokio::test]
async fn expired_license_blocks_with_expired_status() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("license.lic");
    write_license(&path, &signing_key(), "localize-plus", Duration::days(-1));

    let report = run(&config(&path, ""), Arc::new(MockPresenter::declining())).await;
    assert_eq!(report.status, LicenseStatus::Expired);
    assert_eq!(report.action, Action::Block);
    assert_eq!(report.remediation, Some(RemediationOutcome::UserDeclined));
}

#[tokio::test]
async fn license_from_foreign_key_is_invalid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("license.lic");
    write_license(
        &path,
        &SigningKey::from_bytes(&[99u8; 32]),
        "localize-plus",
        Duration::days(10),
    );

    let report = run(&config(&path, ""), Arc::new(MockPresenter::declining())).await;
    assert_eq!(report.status, LicenseStatus::Invalid);
    assert_eq!(report.action, Action::Block);
}

#[tokio::test]
async fn license_for_other_product_is_invalid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("license.lic");
    write_license(&path, &signing_key(), "other-plugin", Duration::days(10));

    let report = run(&config(&path, ""), Arc::new(MockPresenter::declining())).await;
    assert_eq!(report.status, LicenseStatus::Invalid);
}

#[tokio::test]
async fn configured_prompt_wording_reaches_presenter() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.lic");
    let config = config(
        &path,
        "\n[gate]\ntimeout = 3\n\n[gate.prompt]\ntitle = \"Activate Localize Plus\"\n",
    );
    let presenter = Arc::new(MockPresenter::declining());

    let report = run(&config, presenter.clone()).await;
    assert_eq!(report.status, LicenseStatus::Invalid);
    let shown = presenter.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Activate Localize Plus");
    assert_eq!(shown[0].decline_label, "Exit Plugin");
}

#[tokio::test]
async fn accepted_prompt_without_activation_url_is_prompt_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.lic");
    let report = run(&config(&path, ""), Arc::new(MockPresenter::accepting())).await;

    match report.remediation {
        Some(RemediationOutcome::PromptFailed(failure)) => {
            assert!(failure.detail.contains("activation"), "{}", failure.detail)
        }
        other => panic!("unexpected remediation {other:?}"),
    }
    assert_eq!(report.action, Action::Block);
}

#[tokio::test]
async fn accepted_prompt_with_activation_url_is_accepted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.lic");
    let config = config(
        &path,
        "activation_url = \"https://licensing.invalid/activate\"\n",
    );
    let report = run(&config, Arc::new(MockPresenter::accepting())).await;

    assert_eq!(report.remediation, Some(RemediationOutcome::UserAccepted));
    assert_eq!(report.action, Action::Block);
}
