//! Compose engine detection and lifecycle invocation.
//!
//! The stack is always torn down before it is brought up so a fresh state
//! replaces whatever was running, rather than layering on top of a possibly
//! stale stack. Port overrides travel as explicit environment on the spawned
//! engine processes only; the deployctl process environment is never mutated,
//! so nothing can leak into the operator's session.

use crate::mode::OrchestrationRequest;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::info;

/// Lifecycle verb that removes the running stack. Idempotent: nothing
/// running is not an error.
pub const VERB_DOWN: &[&str] = &["down"];
/// Lifecycle verb that brings the stack up detached.
pub const VERB_UP_DETACHED: &[&str] = &["up", "-d"];

/// Compose operation errors
#[derive(Error, Debug)]
pub enum ComposeError {
    /// No compose runtime is available
    #[error(
        "No compose runtime available. Install the docker compose plugin or docker-compose."
    )]
    NoRuntimeAvailable,

    /// A lifecycle verb returned non-zero; the engine's diagnostics pass
    /// through verbatim
    #[error("compose {verb} failed:\n{diagnostics}")]
    LifecycleFailed { verb: String, diagnostics: String },

    /// The engine process could not be spawned at all
    #[error("failed to execute: {command}")]
    CommandFailed { command: String },
}

pub type ComposeResult<T> = Result<T, ComposeError>;

/// Compose runtimes supported, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeRuntime {
    /// `docker compose` plugin
    Plugin,
    /// Standalone legacy `docker-compose` binary
    Legacy,
}

impl ComposeRuntime {
    pub fn program(&self) -> &'static str {
        match self {
            ComposeRuntime::Plugin => "docker",
            ComposeRuntime::Legacy => "docker-compose",
        }
    }

    /// Arguments that precede every compose invocation for this runtime
    pub fn base_args(&self) -> &'static [&'static str] {
        match self {
            ComposeRuntime::Plugin => &["compose"],
            ComposeRuntime::Legacy => &[],
        }
    }
}

/// Detect an available compose runtime, preferring the plugin.
pub fn detect_compose() -> ComposeResult<ComposeRuntime> {
    if Command::new("docker")
        .args(["compose", "version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
    {
        return Ok(ComposeRuntime::Plugin);
    }

    if Command::new("docker-compose")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
    {
        return Ok(ComposeRuntime::Legacy);
    }

    Err(ComposeError::NoRuntimeAvailable)
}

/// The ordered lifecycle verbs `apply` drives: tear down, then bring up.
pub fn lifecycle_plan() -> [&'static [&'static str]; 2] {
    [VERB_DOWN, VERB_UP_DETACHED]
}

/// Build the engine invocation for one lifecycle verb.
///
/// The request's override variables are set on this command only, never on
/// the calling process.
pub fn lifecycle_command(
    runtime: &ComposeRuntime,
    request: &OrchestrationRequest,
    verb: &[&str],
) -> Command {
    let mut cmd = Command::new(runtime.program());
    cmd.args(runtime.base_args());
    for file in &request.compose_files {
        cmd.args(["-f", file]);
    }
    cmd.args(verb);
    cmd.envs(&request.env);
    cmd
}

/// Tear the stack down, then bring it up detached, with the same
/// configuration files and override environment for both verbs.
pub fn apply(runtime: &ComposeRuntime, request: &OrchestrationRequest) -> ComposeResult<()> {
    for verb in lifecycle_plan() {
        run_verb(runtime, request, verb)?;
    }
    Ok(())
}

/// Tear the stack down without bringing it back up.
pub fn tear_down(runtime: &ComposeRuntime, request: &OrchestrationRequest) -> ComposeResult<()> {
    run_verb(runtime, request, VERB_DOWN)
}

fn run_verb(
    runtime: &ComposeRuntime,
    request: &OrchestrationRequest,
    verb: &[&str],
) -> ComposeResult<()> {
    let mut cmd = lifecycle_command(runtime, request, verb);
    let description = format!(
        "{} {}",
        runtime.program(),
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    );
    info!("running: {}", description);

    let output = cmd.output().map_err(|_| ComposeError::CommandFailed {
        command: description,
    })?;

    if !output.status.success() {
        let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
        if diagnostics.trim().is_empty() {
            diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
        }
        return Err(ComposeError::LifecycleFailed {
            verb: verb.join(" "),
            diagnostics,
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        print!("{}", stdout);
    }
    Ok(())
}
