//! Synchronous execution of benchmark steps.

use std::path::Path;
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::command::CommandLine;
use crate::env::LaunchEnv;
use crate::errors::{LaunchError, Result};

/// Captured output beyond this many bytes keeps only the tail.
pub const MAX_CAPTURE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Inference,
    Bleu,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inference => "inference",
            Self::Bleu => "bleu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Child shares the launcher's stdout/stderr.
    #[default]
    Inherit,
    Capture,
}

/// One child process to run.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub step: Step,
    pub command: &'a CommandLine,
    pub env: &'a LaunchEnv,
    pub workdir: Option<&'a Path>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// `code` is `None` when the child was killed by a signal.
    Exited { code: Option<i32>, success: bool },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    pub command: CommandLine,
    #[serde(flatten)]
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl StepOutcome {
    pub fn exited(step: Step, command: CommandLine, code: Option<i32>, success: bool) -> Self {
        Self {
            step,
            command,
            status: StepStatus::Exited { code, success },
            stdout: None,
            stderr: None,
        }
    }

    pub fn skipped(step: Step, command: CommandLine, reason: impl Into<String>) -> Self {
        Self {
            step,
            command,
            status: StepStatus::Skipped {
                reason: reason.into(),
            },
            stdout: None,
            stderr: None,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.status, StepStatus::Exited { success: true, .. })
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            StepStatus::Exited { code, .. } => code,
            StepStatus::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepOutcome>,
}

impl RunReport {
    pub fn step(&self, step: Step) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == step)
    }

    /// True when every step ran and exited successfully.
    pub fn all_succeeded(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(StepOutcome::success)
    }
}

/// Seam between the launcher and process spawning.
pub trait Executor {
    fn execute(&mut self, invocation: Invocation<'_>) -> Result<StepOutcome>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemExecutor {
    output: OutputMode,
}

impl SystemExecutor {
    pub fn new(output: OutputMode) -> Self {
        Self { output }
    }
}

impl Executor for SystemExecutor {
    fn execute(&mut self, invocation: Invocation<'_>) -> Result<StepOutcome> {
        let line = invocation.command;
        let mut cmd = Command::new(&line.program);
        cmd.args(&line.args).stdin(Stdio::inherit());
        for (key, value) in invocation.env.iter() {
            cmd.env(key, value);
        }
        if let Some(dir) = invocation.workdir {
            cmd.current_dir(dir);
        }

        let spawn_err = |source| LaunchError::Spawn {
            program: line.program.clone(),
            source,
        };

        tracing::info!(step = invocation.step.as_str(), "starting {}", line);
        let outcome = match self.output {
            OutputMode::Inherit => {
                let status = cmd
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit())
                    .status()
                    .map_err(spawn_err)?;
                StepOutcome::exited(invocation.step, line.clone(), status.code(), status.success())
            }
            OutputMode::Capture => {
                let output = cmd.output().map_err(spawn_err)?;
                let mut outcome = StepOutcome::exited(
                    invocation.step,
                    line.clone(),
                    output.status.code(),
                    output.status.success(),
                );
                outcome.stdout = Some(capture_tail(&output.stdout));
                outcome.stderr = Some(capture_tail(&output.stderr));
                outcome
            }
        };

        if outcome.success() {
            tracing::info!(step = invocation.step.as_str(), "step finished");
        } else {
            tracing::warn!(
                step = invocation.step.as_str(),
                code = ?outcome.exit_code(),
                "step exited unsuccessfully"
            );
        }
        Ok(outcome)
    }
}

fn capture_tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_CAPTURE_BYTES {
        return text.into_owned();
    }
    let mut start = text.len() - MAX_CAPTURE_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBuilder;

    #[test]
    fn capture_keeps_tail() {
        let mut big = vec![b'a'; MAX_CAPTURE_BYTES];
        big.extend_from_slice(b"BLEU = 27.9");
        let tail = capture_tail(&big);
        assert_eq!(tail.len(), MAX_CAPTURE_BYTES);
        assert!(tail.ends_with("BLEU = 27.9"));
        assert_eq!(capture_tail(b"short"), "short");
    }

    #[test]
    fn report_requires_every_step_to_succeed() {
        let cmd = CommandBuilder::new("python").build();
        let mut report = RunReport::default();
        assert!(!report.all_succeeded());

        report
            .steps
            .push(StepOutcome::exited(Step::Inference, cmd.clone(), Some(0), true));
        assert!(report.all_succeeded());

        report
            .steps
            .push(StepOutcome::skipped(Step::Bleu, cmd, "inference failed"));
        assert!(!report.all_succeeded());
        assert_eq!(report.step(Step::Bleu).unwrap().exit_code(), None);
    }

    #[test]
    fn outcome_serializes_flat_status() {
        let cmd = CommandBuilder::new("python").arg("compute_bleu.py").build();
        let json =
            serde_json::to_value(StepOutcome::exited(Step::Bleu, cmd, Some(1), false)).unwrap();
        assert_eq!(json["step"], "bleu");
        assert_eq!(json["status"], "exited");
        assert_eq!(json["code"], 1);
        assert_eq!(json["success"], false);
        assert!(json.get("stdout").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_applies_env_and_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = CommandBuilder::new("sh")
            .arg("-c")
            .arg("printf '%s|' \"$LTBENCH_PROBE\"; pwd")
            .build();
        let mut env = LaunchEnv::new();
        env.set("LTBENCH_PROBE", "42");

        let outcome = SystemExecutor::new(OutputMode::Capture)
            .execute(Invocation {
                step: Step::Inference,
                command: &cmd,
                env: &env,
                workdir: Some(dir.path()),
            })
            .unwrap();

        assert!(outcome.success());
        let stdout = outcome.stdout.unwrap();
        let (probe, cwd) = stdout.trim().split_once('|').unwrap();
        assert_eq!(probe, "42");
        assert_eq!(
            std::fs::canonicalize(cwd).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
        assert!(std::env::var("LTBENCH_PROBE").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_reports_failure_code() {
        let cmd = CommandBuilder::new("sh").arg("-c").arg("exit 3").build();
        let outcome = SystemExecutor::new(OutputMode::Capture)
            .execute(Invocation {
                step: Step::Bleu,
                command: &cmd,
                env: &LaunchEnv::new(),
                workdir: None,
            })
            .unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.exit_code(), Some(3));
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let cmd = CommandBuilder::new("ltbench-definitely-missing-binary").build();
        let err = SystemExecutor::default()
            .execute(Invocation {
                step: Step::Inference,
                command: &cmd,
                env: &LaunchEnv::new(),
                workdir: None,
            })
            .unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }
}
