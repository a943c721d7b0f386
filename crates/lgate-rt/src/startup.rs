//! ---
//! lgate_section: "02-runtime"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "One-shot startup license verification cycle."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use lgate_licensing::logging::{record_block, record_license_check, record_remediation};
use lgate_licensing::{
    decide, Action, CheckFailure, FailureKind, LicenseGate, LicenseStatus, PromptSpec,
    RemediationOutcome,
};
use lgate_logging::{log_system_event, LogContext, SystemEventOutcome};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::presentation::{
    BlockingPoolDispatcher, HostLifecycle, PresentError, Presenter, UiDispatcher,
};

/// Default upper bound on a single authority call.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Run one authority query on the blocking pool, bounded by `timeout`.
///
/// A timed-out worker is abandoned, not cancelled; its late answer is
/// discarded and never counted. The returned status is counted exactly once.
pub async fn verify_with_timeout(gate: &LicenseGate, timeout: Duration) -> LicenseStatus {
    let worker_gate = gate.clone();
    let worker = tokio::task::spawn_blocking(move || worker_gate.classify());
    let status = match tokio::time::timeout(timeout, worker).await {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => {
            warn!(error = %err, "license verification worker failed");
            LicenseStatus::CheckFailed(CheckFailure::new(
                FailureKind::AuthorityUnavailable,
                format!("verification worker failed: {err}"),
            ))
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "license authority timed out");
            LicenseStatus::CheckFailed(CheckFailure::new(
                FailureKind::AuthorityUnavailable,
                format!("license authority timed out after {timeout:?}"),
            ))
        }
    };
    record_license_check(&status);
    status
}

/// States visited by one verification cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Start,
    Checking,
    AwaitingUserChoice,
    RemediationRequested,
    Proceed,
    Blocked,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CycleState::Start => "start",
            CycleState::Checking => "checking",
            CycleState::AwaitingUserChoice => "awaiting_user_choice",
            CycleState::RemediationRequested => "remediation_requested",
            CycleState::Proceed => "proceed",
            CycleState::Blocked => "blocked",
        };
        f.write_str(label)
    }
}

/// Terminal result of one verification cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub status: LicenseStatus,
    pub remediation: Option<RemediationOutcome>,
    pub action: Action,
    pub trace: Vec<CycleState>,
}

impl CycleReport {
    /// Final state of the cycle.
    pub fn terminal_state(&self) -> CycleState {
        match self.action {
            Action::Proceed => CycleState::Proceed,
            Action::Block => CycleState::Blocked,
        }
    }
}

/// Drives a single startup verification cycle.
///
/// The authority call runs on the blocking pool under a timeout, the prompt
/// and the activation flow run through the host's [`UiDispatcher`], and the
/// host lifecycle receives exactly one terminal notification. `run` consumes
/// the check, so a value can never drive a second cycle.
pub struct StartupCheck {
    gate: LicenseGate,
    presenter: Arc<dyn Presenter>,
    lifecycle: Arc<dyn HostLifecycle>,
    dispatcher: Arc<dyn UiDispatcher>,
    prompt: PromptSpec,
    timeout: Duration,
    product: String,
}

impl fmt::Debug for StartupCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupCheck")
            .field("gate", &self.gate)
            .field("prompt", &self.prompt)
            .field("timeout", &self.timeout)
            .field("product", &self.product)
            .finish_non_exhaustive()
    }
}

impl StartupCheck {
    pub fn new(
        gate: LicenseGate,
        presenter: Arc<dyn Presenter>,
        lifecycle: Arc<dyn HostLifecycle>,
    ) -> Self {
        Self {
            gate,
            presenter,
            lifecycle,
            dispatcher: Arc::new(BlockingPoolDispatcher),
            prompt: PromptSpec::for_product("this product"),
            timeout: DEFAULT_CHECK_TIMEOUT,
            product: String::new(),
        }
    }

    /// Route prompts through the host's presentation queue.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn UiDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Bound the authority call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Wording shown when the license is not valid.
    pub fn with_prompt(mut self, prompt: PromptSpec) -> Self {
        self.prompt = prompt;
        self
    }

    /// Product identifier attached to lifecycle events.
    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    /// Run the cycle to its terminal action.
    #[instrument(skip(self), fields(product = %self.product))]
    pub async fn run(self) -> CycleReport {
        info!("starting license verification");
        let mut trace = vec![CycleState::Start, CycleState::Checking];

        let status = verify_with_timeout(&self.gate, self.timeout).await;
        let action = decide(&status);

        let remediation = match action {
            Action::Proceed => None,
            Action::Block => {
                trace.push(CycleState::AwaitingUserChoice);
                Some(self.remediate(&mut trace).await)
            }
        };

        let mut report = CycleReport {
            status,
            remediation,
            action,
            trace,
        };
        report.trace.push(report.terminal_state());
        self.finish(&report);
        report
    }

    async fn remediate(&self, trace: &mut Vec<CycleState>) -> RemediationOutcome {
        let presenter = self.presenter.clone();
        let prompt = self.prompt.clone();
        let choice = self
            .on_presentation_thread(move || presenter.ask_yes_no(&prompt))
            .await
            .and_then(|answer| answer.map_err(|err| err.to_string()));

        match choice {
            Ok(true) => {
                debug!("user chose to open registration");
                trace.push(CycleState::RemediationRequested);
                let gate = self.gate.clone();
                let message = self.prompt.remediation_message.clone();
                self.on_presentation_thread(move || gate.request_remediation(&message))
                    .await
                    .unwrap_or_else(|detail| {
                        // The gate never ran, so nothing has counted this outcome yet.
                        warn!(error = %detail, "license activation could not be dispatched");
                        let outcome = RemediationOutcome::PromptFailed(CheckFailure::new(
                            FailureKind::PromptUnavailable,
                            detail,
                        ));
                        record_remediation(&outcome);
                        outcome
                    })
            }
            Ok(false) => {
                debug!("user declined registration");
                let outcome = RemediationOutcome::UserDeclined;
                record_remediation(&outcome);
                outcome
            }
            Err(detail) => {
                warn!(error = %detail, "license prompt could not be shown");
                let outcome = RemediationOutcome::PromptFailed(CheckFailure::new(
                    FailureKind::PromptUnavailable,
                    detail,
                ));
                record_remediation(&outcome);
                outcome
            }
        }
    }

    /// Run `job` through the dispatcher and wait for its result.
    async fn on_presentation_thread<T, F>(&self, job: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.dispatcher.invoke_later(Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(job))
                .map_err(|_| "presentation job panicked".to_owned());
            let _ = tx.send(result);
        }));
        match rx.await {
            Ok(result) => result,
            Err(_) => Err(PresentError::Unavailable("presentation job was dropped".to_owned())
                .to_string()),
        }
    }

    fn finish(&self, report: &CycleReport) {
        let ctx = LogContext::new()
            .with_product(&self.product)
            .with_status(report.status.label());
        match report.action {
            Action::Proceed => {
                log_system_event(
                    Some(&ctx.with_state("proceed")),
                    "license.cycle.proceed",
                    "license verified; continuing startup",
                    SystemEventOutcome::Success,
                );
                self.lifecycle.proceed(report);
            }
            Action::Block => {
                record_block(report.status.label());
                log_system_event(
                    Some(&ctx.with_state("blocked")),
                    "license.cycle.blocked",
                    "disabled due to invalid or expired license",
                    SystemEventOutcome::Fault,
                );
                self.lifecycle.halt(report);
            }
        }
    }
}
