//! ---
//! lgate_section: "04-configuration"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Shared configuration and bootstrap utilities."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
//! Shared primitives for applications embedding the license gate.
//! This crate exposes configuration loading, tracing bootstrap, and the
//! wiring from configuration to a ready-to-use [`license::LicenseGate`].

pub mod config;
pub mod license;
pub mod logging;

pub use config::{AppConfig, GateConfig, LicenseConfig, LoggingConfig, PromptConfig};
pub use license::{authority_from_config, gate_from_config};
pub use logging::{init_tracing, LogFormat};
