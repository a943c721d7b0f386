//! ---
//! lgate_section: "05-cli"
//! lgate_subsection: "command"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Startup check and status commands for the console host."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use lgate_common::config::AppConfig;
use lgate_common::license::gate_from_config;
use lgate_licensing::{Action, PromptSpec};
use lgate_rt::{
    verify_with_timeout, CycleReport, HostLifecycle, PresentError, Presenter, StartupCheck,
    UiQueue,
};
use tokio::runtime::{Builder, Runtime};
use tracing::{info, warn};

/// Exit code reported when the gate blocks the host.
const BLOCKED_EXIT_CODE: u8 = 2;

#[derive(Debug, Args)]
pub struct CheckCommand {
    #[arg(
        long,
        conflicts_with = "assume_no",
        help = "Answer the registration prompt with yes"
    )]
    assume_yes: bool,
    #[arg(long, help = "Answer the registration prompt with no")]
    assume_no: bool,
    #[arg(
        long,
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Override the configured authority timeout"
    )]
    timeout: Option<u64>,
    #[arg(long, help = "Print the cycle report as JSON")]
    json: bool,
}

impl CheckCommand {
    pub fn execute(self, config: AppConfig) -> Result<ExitCode> {
        let gate = gate_from_config(&config)?;
        let presenter: Arc<dyn Presenter> = if self.assume_yes {
            Arc::new(FixedAnswer(true))
        } else if self.assume_no {
            Arc::new(FixedAnswer(false))
        } else {
            Arc::new(ConsolePresenter)
        };
        let timeout = self
            .timeout
            .map(Duration::from_secs)
            .unwrap_or(config.gate.timeout);

        let runtime = build_runtime()?;
        let (dispatcher, queue) = UiQueue::channel();
        let check = StartupCheck::new(gate, presenter, Arc::new(ConsoleLifecycle))
            .with_dispatcher(Arc::new(dispatcher))
            .with_timeout(timeout)
            .with_prompt(config.prompt())
            .with_product(config.product.clone());

        let handle = runtime.spawn(check.run());
        // The main thread owns the console; it serves prompts until the cycle drops its dispatcher.
        let served = queue.run_until_closed();
        let report = runtime
            .block_on(handle)
            .context("startup check task failed")?;
        // An abandoned authority worker must not keep the process alive.
        runtime.shutdown_background();
        info!(
            presentation_jobs = served,
            action = %report.action,
            "startup check finished"
        );

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(ExitCode::from(exit_status(report.action)))
    }
}

#[derive(Debug, Args)]
pub struct VerifyCommand {
    #[arg(long, help = "Print the status as JSON")]
    json: bool,
}

impl VerifyCommand {
    pub fn execute(self, config: AppConfig) -> Result<ExitCode> {
        let gate = gate_from_config(&config)?;
        let runtime = build_runtime()?;
        let status = runtime.block_on(verify_with_timeout(&gate, config.gate.timeout));
        runtime.shutdown_background();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            println!("License status for {}: {status}", config.product);
        }
        Ok(if status.is_valid() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(BLOCKED_EXIT_CODE)
        })
    }
}

fn build_runtime() -> Result<Runtime> {
    Builder::new_multi_thread()
        .enable_all()
        .thread_name("lgate-worker")
        .build()
        .context("failed to start async runtime")
}

fn exit_status(action: Action) -> u8 {
    match action {
        Action::Proceed => 0,
        Action::Block => BLOCKED_EXIT_CODE,
    }
}

fn print_report(report: &CycleReport) {
    println!("License status: {}", report.status);
    if let Some(outcome) = &report.remediation {
        println!("Registration: {}", outcome.label());
    }
    println!("Action: {}", report.action);
}

/// Presenter asking on the terminal. Prompts go to stderr so stdout stays parseable.
#[derive(Debug, Default, Clone, Copy)]
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn ask_yes_no(&self, prompt: &PromptSpec) -> Result<bool, PresentError> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        ask_on(&mut input, &mut output, prompt)
    }
}

/// Read a yes/no answer for `prompt`. An empty answer declines.
fn ask_on<R, W>(input: &mut R, output: &mut W, prompt: &PromptSpec) -> Result<bool, PresentError>
where
    R: BufRead,
    W: Write,
{
    let io_err = |err: io::Error| PresentError::Unavailable(err.to_string());
    writeln!(output, "\n=== {} ===\n{}", prompt.title, prompt.message).map_err(io_err)?;
    loop {
        write!(
            output,
            "[1] {}  [2] {} (default 2): ",
            prompt.accept_label, prompt.decline_label
        )
        .map_err(io_err)?;
        output.flush().map_err(io_err)?;

        let mut line = String::new();
        let read = input.read_line(&mut line).map_err(io_err)?;
        if read == 0 {
            return Err(PresentError::Unavailable("input stream closed".to_owned()));
        }
        match line.trim().to_lowercase().as_str() {
            "1" | "y" | "yes" => return Ok(true),
            "" | "2" | "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please enter 1 or 2.").map_err(io_err)?,
        }
    }
}

/// Presenter for unattended runs.
#[derive(Debug, Clone, Copy)]
struct FixedAnswer(bool);

impl Presenter for FixedAnswer {
    fn ask_yes_no(&self, prompt: &PromptSpec) -> Result<bool, PresentError> {
        info!(title = %prompt.title, answer = self.0, "answering license prompt non-interactively");
        Ok(self.0)
    }
}

/// Lifecycle for the console host: a halt is reported, the exit code does the rest.
#[derive(Debug, Default, Clone, Copy)]
struct ConsoleLifecycle;

impl HostLifecycle for ConsoleLifecycle {
    fn proceed(&self, report: &CycleReport) {
        info!(status = %report.status, "license valid; host may continue");
    }

    fn halt(&self, report: &CycleReport) {
        warn!(status = %report.status, "host halted by license gate");
        eprintln!("Plugin disabled due to invalid or expired license.");
    }
}
