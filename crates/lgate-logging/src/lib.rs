//! ---
//! lgate_section: "03-logging"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Structured lifecycle logging."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Baseline subscriber and lifecycle events for license verification cycles.

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

/// Initialize a baseline tracing subscriber suitable for tools and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context attached to lifecycle events.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Product whose license is being checked.
    pub product: Option<&'a str>,
    /// Cycle state the event was emitted from.
    pub state: Option<&'a str>,
    /// Resulting license status label.
    pub status: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a product identifier.
    pub fn with_product(mut self, product: &'a str) -> Self {
        self.product = Some(product);
        self
    }

    /// Attach the cycle state.
    pub fn with_state(mut self, state: &'a str) -> Self {
        self.state = Some(state);
        self
    }

    /// Attach a license status label.
    pub fn with_status(mut self, status: &'a str) -> Self {
        self.status = Some(status);
        self
    }
}

/// High-level outcome used when emitting lifecycle log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEventOutcome {
    /// The operation completed successfully.
    Success,
    /// The operation failed or was aborted.
    Fault,
}

impl SystemEventOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            SystemEventOutcome::Success => "success",
            SystemEventOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event with a success/fault outcome.
pub fn log_system_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: SystemEventOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // `tracing::event!` needs a constant level.
    match outcome {
        SystemEventOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            product = ctx.product.unwrap_or(""),
            state = ctx.state.unwrap_or(""),
            status = ctx.status.unwrap_or(""),
            message = %message
        ),
        SystemEventOutcome::Fault => tracing::event!(
            Level::WARN,
            event,
            outcome = outcome.as_str(),
            product = ctx.product.unwrap_or(""),
            state = ctx.state.unwrap_or(""),
            status = ctx.status.unwrap_or(""),
            message = %message
        ),
    }
}
