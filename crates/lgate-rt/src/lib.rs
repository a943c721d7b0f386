//! ---
//! lgate_section: "02-runtime"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Runtime helpers driving the startup license check."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
//! Startup verification cycle for hosts embedding the license gate.

pub mod presentation;
pub mod startup;

pub use presentation::{
    BlockingPoolDispatcher, HostLifecycle, MockLifecycle, MockPresenter, PresentError, Presenter,
    QueueDispatcher, UiDispatcher, UiJob, UiQueue,
};
pub use startup::{verify_with_timeout, CycleReport, CycleState, StartupCheck, DEFAULT_CHECK_TIMEOUT};
