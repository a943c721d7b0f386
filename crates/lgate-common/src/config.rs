//! ---
//! lgate_section: "04-configuration"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Configuration loading and validation."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use lgate_licensing::certificates::decode_public_key;
use lgate_licensing::file_authority::DEFAULT_LICENSE_ENV;
use lgate_licensing::PromptSpec;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::{debug, warn};

use crate::logging::LogFormat;

fn default_product() -> String {
    "localize-plus".to_owned()
}

fn default_display_name() -> String {
    "Android Localize Plus".to_owned()
}

fn default_env_license_var() -> String {
    DEFAULT_LICENSE_ENV.to_owned()
}

fn default_check_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_file_logging() -> bool {
    true
}

/// Primary configuration object for a gated application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Product identifier licenses must be issued for.
    #[serde(default = "default_product")]
    pub product: String,
    /// Human readable product name used in prompts.
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default)]
    pub license: LicenseConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "LGATE_CONFIG";

    /// Load exactly `path`. An explicit path wins over `LGATE_CONFIG`.
    pub fn load_explicit(path: impl AsRef<Path>) -> Result<LoadedAppConfig> {
        let path = path.as_ref().to_path_buf();
        let config = Self::from_path(&path)?;
        Ok(LoadedAppConfig {
            config,
            source: Some(path),
        })
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Some(path) = Self::env_override() {
            let config = Self::from_path(&path)?;
            return Ok(LoadedAppConfig {
                config,
                source: Some(path),
            });
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Like [`AppConfig::load_with_source`], but falls back to defaults when no file exists.
    pub fn load_or_default<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if Self::env_override().is_some()
            || candidates.iter().any(|candidate| candidate.as_ref().exists())
        {
            return Self::load_with_source(candidates);
        }
        warn!("no configuration file found; using built-in defaults");
        let config = Self::default();
        config.validate()?;
        Ok(LoadedAppConfig {
            config,
            source: None,
        })
    }

    fn env_override() -> Option<PathBuf> {
        std::env::var(Self::ENV_CONFIG_PATH)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Prompt wording with configured overrides applied.
    pub fn prompt(&self) -> PromptSpec {
        self.gate.prompt.resolve(&self.display_name)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.product.trim().is_empty() {
            return Err(anyhow!("product must not be empty"));
        }
        self.license.validate()?;
        self.gate.validate()?;
        let prompt = self.prompt();
        for (field, value) in [
            ("title", &prompt.title),
            ("message", &prompt.message),
            ("accept_label", &prompt.accept_label),
            ("decline_label", &prompt.decline_label),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("gate.prompt.{field} must not be empty"));
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            product: default_product(),
            display_name: default_display_name(),
            license: LicenseConfig::default(),
            gate: GateConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_env_license_var")]
    pub env_var: String,
    /// Base64 Ed25519 key licenses are verified against.
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub activation_url: Option<String>,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            path: None,
            env_var: default_env_license_var(),
            public_key: None,
            activation_url: None,
        }
    }
}

impl LicenseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.env_var.trim().is_empty() {
            return Err(anyhow!("license.env_var must not be empty"));
        }
        if let Some(key) = &self.public_key {
            decode_public_key(key).context("license.public_key is invalid")?;
        }
        Ok(())
    }

    /// Decoded verification key, if one is configured.
    pub fn public_key_bytes(&self) -> Result<Option<[u8; 32]>> {
        self.public_key
            .as_deref()
            .map(decode_public_key)
            .transpose()
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Upper bound on a single license authority call.
    #[serde(default = "default_check_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
    #[serde(default)]
    pub prompt: PromptConfig,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            timeout: default_check_timeout(),
            prompt: PromptConfig::default(),
        }
    }
}

impl GateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(anyhow!("gate.timeout must be at least one second"));
        }
        Ok(())
    }
}

/// Optional overrides for the remediation prompt wording.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub accept_label: Option<String>,
    #[serde(default)]
    pub decline_label: Option<String>,
    #[serde(default)]
    pub remediation_message: Option<String>,
}

impl PromptConfig {
    /// Apply overrides on top of the default wording for `display_name`.
    pub fn resolve(&self, display_name: &str) -> PromptSpec {
        let defaults = PromptSpec::for_product(display_name);
        PromptSpec {
            title: self.title.clone().unwrap_or(defaults.title),
            message: self.message.clone().unwrap_or(defaults.message),
            accept_label: self.accept_label.clone().unwrap_or(defaults.accept_label),
            decline_label: self.decline_label.clone().unwrap_or(defaults.decline_label),
            remediation_message: self
                .remediation_message
                .clone()
                .unwrap_or(defaults.remediation_message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Also write a daily rolling JSON file under `directory`.
    #[serde(default = "default_file_logging")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            file: default_file_logging(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().expect("empty config parses");
        assert_eq!(config.product, "localize-plus");
        assert_eq!(config.gate.timeout, Duration::from_secs(30));
        assert_eq!(config.license.env_var, "LGATE_LICENSE");
        assert_eq!(config.prompt().accept_label, "Open Registration");
    }

    #[test]
    fn overrides_are_applied() {
        let config: AppConfig = r#"
            product = "my-localize"
            display_name = "My Android Localize"

            [license]
            path = "/etc/lgate/license.lic"
            activation_url = "https://licenses.invalid/activate"

            [gate]
            timeout = 5

            [gate.prompt]
            decline_label = "Quit"

            [logging]
            format = "pretty"
        "#
        .parse()
        .expect("config parses");
        assert_eq!(config.gate.timeout, Duration::from_secs(5));
        assert_eq!(
            config.license.path.as_deref(),
            Some(Path::new("/etc/lgate/license.lic"))
        );
        let prompt = config.prompt();
        assert_eq!(prompt.decline_label, "Quit");
        assert_eq!(prompt.accept_label, "Open Registration");
        assert!(prompt.message.contains("My Android Localize"));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = "[gate]\ntimeout = 0\n"
            .parse::<AppConfig>()
            .expect_err("zero timeout must fail");
        assert!(err.to_string().contains("gate.timeout"));
    }

    #[test]
    fn blank_labels_are_rejected() {
        let err = "[gate.prompt]\naccept_label = \"  \"\n"
            .parse::<AppConfig>()
            .expect_err("blank label must fail");
        assert!(err.to_string().contains("accept_label"));
    }

    #[test]
    fn malformed_public_key_is_rejected() {
        let err = "[license]\npublic_key = \"AAAA\"\n"
            .parse::<AppConfig>()
            .expect_err("short key must fail");
        assert!(err.to_string().contains("public_key"));
    }

    #[test]
    fn explicit_path_is_loaded_and_validated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("lgate.toml");
        std::fs::write(&good, "product = \"explicit\"\n").expect("write config");
        let loaded = AppConfig::load_explicit(&good).expect("explicit config loads");
        assert_eq!(loaded.config.product, "explicit");
        assert_eq!(loaded.source.as_deref(), Some(good.as_path()));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[gate]\ntimeout = 0\n").expect("write config");
        assert!(AppConfig::load_explicit(&bad).is_err());
        assert!(AppConfig::load_explicit(dir.path().join("absent.toml")).is_err());
    }
}
