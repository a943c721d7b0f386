//! ---
//! lgate_section: "02-runtime"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Host capabilities consumed by the verification cycle."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::sync::mpsc;

use lgate_licensing::{Action, PromptSpec};
use parking_lot::Mutex;
use thiserror::Error;

use crate::startup::CycleReport;

/// Failure to show the yes/no prompt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PresentError {
    /// The host has no way to show the prompt right now.
    #[error("prompt unavailable: {0}")]
    Unavailable(String),
}

/// Host primitive that asks a blocking yes/no question.
pub trait Presenter: Send + Sync {
    /// Show `prompt`; `Ok(true)` means the accept button was chosen.
    fn ask_yes_no(&self, prompt: &PromptSpec) -> Result<bool, PresentError>;
}

/// A unit of work destined for the host's presentation thread.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Host queue onto the thread that owns user-facing presentation.
pub trait UiDispatcher: Send + Sync {
    /// Run `job` on the presentation thread at some later point.
    fn invoke_later(&self, job: UiJob);
}

/// Receives the single terminal action of a verification cycle.
pub trait HostLifecycle: Send + Sync {
    /// The license is valid; continue normally.
    fn proceed(&self, report: &CycleReport);

    /// Halt further execution. How is up to the host.
    fn halt(&self, report: &CycleReport);
}

/// Dispatcher running presentation jobs on the tokio blocking pool.
///
/// Suitable for headless hosts without a dedicated UI thread. Must be used
/// from within a tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingPoolDispatcher;

impl UiDispatcher for BlockingPoolDispatcher {
    fn invoke_later(&self, job: UiJob) {
        tokio::task::spawn_blocking(job);
    }
}

/// Dispatcher that forwards jobs to a [`UiQueue`] drained by the host thread.
#[derive(Debug, Clone)]
pub struct QueueDispatcher {
    sender: mpsc::Sender<UiJob>,
}

impl UiDispatcher for QueueDispatcher {
    fn invoke_later(&self, job: UiJob) {
        if self.sender.send(job).is_err() {
            tracing::warn!("presentation queue closed; dropping job");
        }
    }
}

/// Presentation-thread job queue, in the manner of an event-loop `invokeLater`.
pub struct UiQueue {
    receiver: mpsc::Receiver<UiJob>,
}

impl std::fmt::Debug for UiQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiQueue").finish_non_exhaustive()
    }
}

impl UiQueue {
    /// Create a queue and the dispatcher feeding it.
    #[must_use]
    pub fn channel() -> (QueueDispatcher, UiQueue) {
        let (sender, receiver) = mpsc::channel();
        (QueueDispatcher { sender }, UiQueue { receiver })
    }

    /// Run jobs on the calling thread until every dispatcher is dropped.
    ///
    /// Returns the number of jobs executed.
    pub fn run_until_closed(self) -> usize {
        let mut executed = 0;
        while let Ok(job) = self.receiver.recv() {
            job();
            executed += 1;
        }
        executed
    }
}

/// Presenter answering every prompt the same way, recording what it was shown.
#[derive(Debug)]
pub struct MockPresenter {
    answer: Result<bool, PresentError>,
    shown: Mutex<Vec<PromptSpec>>,
}

impl MockPresenter {
    /// Presenter answering with `answer`.
    #[must_use]
    pub fn new(answer: Result<bool, PresentError>) -> Self {
        Self {
            answer,
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Presenter choosing the accept button.
    #[must_use]
    pub fn accepting() -> Self {
        Self::new(Ok(true))
    }

    /// Presenter choosing the decline button.
    #[must_use]
    pub fn declining() -> Self {
        Self::new(Ok(false))
    }

    /// Prompts shown so far.
    #[must_use]
    pub fn shown(&self) -> Vec<PromptSpec> {
        self.shown.lock().clone()
    }
}

impl Presenter for MockPresenter {
    fn ask_yes_no(&self, prompt: &PromptSpec) -> Result<bool, PresentError> {
        self.shown.lock().push(prompt.clone());
        self.answer.clone()
    }
}

/// Lifecycle that records the terminal actions it receives.
#[derive(Debug, Default)]
pub struct MockLifecycle {
    actions: Mutex<Vec<Action>>,
}

impl MockLifecycle {
    /// Terminal actions received so far.
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }
}

impl HostLifecycle for MockLifecycle {
    fn proceed(&self, report: &CycleReport) {
        self.actions.lock().push(report.action);
    }

    fn halt(&self, report: &CycleReport) {
        self.actions.lock().push(report.action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn queue_runs_jobs_on_draining_thread() {
        let (dispatcher, queue) = UiQueue::channel();
        let drain_thread = std::thread::current().id();
        let counter = Arc::new(AtomicUsize::new(0));
        let producer = {
            let counter = counter.clone();
            std::thread::spawn(move || {
                for _ in 0..3 {
                    let counter = counter.clone();
                    dispatcher.invoke_later(Box::new(move || {
                        assert_eq!(std::thread::current().id(), drain_thread);
                        counter.fetch_add(1, Ordering::SeqCst);
                    }));
                }
            })
        };
        assert_eq!(queue.run_until_closed(), 3);
        producer.join().expect("producer thread");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn mock_presenter_records_prompts() {
        let presenter = MockPresenter::declining();
        let prompt = PromptSpec::for_product("Android Localize Plus");
        assert_eq!(presenter.ask_yes_no(&prompt), Ok(false));
        assert_eq!(presenter.shown(), vec![prompt]);
    }
}
