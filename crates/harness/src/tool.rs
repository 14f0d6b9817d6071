//! Provisioning tool abstraction for testability.
//!
//! The [`ProvisioningTool`] trait abstracts the external infrastructure-as-code
//! binary, allowing production code to use [`TerraformCli`] while tests use
//! `MockTool` (unit tests) or their own scripted implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ RetryingInvoker  │  retry + deadline
//! └────────┬─────────┘
//!          │
//!          ▼
//!  ┌──────────────────┐
//!  │ProvisioningTool  │ (trait)
//!  └──────────────────┘
//!        │        │
//!        ▼        ▼
//!  ┌────────────┐ ┌──────┐
//!  │TerraformCli│ │ Mock │
//!  └─────┬──────┘ └──────┘
//!        │
//!        ▼
//!   terraform binary
//! ```
//!
//! Implementations never retry and never enforce a deadline; both are the
//! invoker's job. A failure carries the raw tool output so the retry policy
//! can classify it.

use std::fmt;
use std::future::Future;
use std::path::Path;

use terracycle_core::types::ParameterSet;

use crate::output::OutputSet;
use crate::process::{CommandError, run_command};

/// A single lifecycle operation of the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolOperation {
    Init,
    Apply,
    Destroy,
    Output,
}

impl ToolOperation {
    /// Fixed name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Apply => "apply",
            Self::Destroy => "destroy",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for ToolOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    /// Operation that failed
    pub operation: ToolOperation,
    /// Raw stderr/stdout of the tool, or a description of why it could not run
    pub message: String,
    /// Process exit code, if the process ran to completion
    pub exit_code: Option<i32>,
}

impl ToolFailure {
    pub fn new(operation: ToolOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
            exit_code: None,
        }
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "{} exited with {code}: {}", self.operation, self.message),
            None => write!(f, "{}: {}", self.operation, self.message),
        }
    }
}

impl std::error::Error for ToolFailure {}

/// Trait abstracting the provisioning tool's lifecycle operations.
///
/// The trait is `Send + Sync + 'static` so one instance can be shared across
/// concurrently running cycles behind an `Arc`.
pub trait ProvisioningTool: Send + Sync + 'static {
    /// Prepares the working directory (provider and module download).
    fn init(&self, dir: &Path) -> impl Future<Output = Result<(), ToolFailure>> + Send;

    /// Creates or updates the infrastructure described by `dir`.
    fn apply(
        &self,
        dir: &Path,
        params: &ParameterSet,
    ) -> impl Future<Output = Result<(), ToolFailure>> + Send;

    /// Tears down everything `apply` created for the same parameters.
    fn destroy(
        &self,
        dir: &Path,
        params: &ParameterSet,
    ) -> impl Future<Output = Result<(), ToolFailure>> + Send;

    /// Reads the outputs recorded by the last successful apply.
    fn outputs(&self, dir: &Path) -> impl Future<Output = Result<OutputSet, ToolFailure>> + Send;
}

/// Environment passed to every terraform invocation.
const TERRAFORM_ENV: &[(&str, &str)] = &[("TF_IN_AUTOMATION", "1"), ("TF_INPUT", "0")];

/// Production tool driving the `terraform` binary (or a compatible one such as `tofu`).
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: String,
}

impl TerraformCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Builds the argument list for a tool invocation.
    ///
    /// Every parameter becomes a separate `-var name=literal` pair, so no shell
    /// quoting is involved.
    pub fn build_args(operation: ToolOperation, params: Option<&ParameterSet>) -> Vec<String> {
        let mut args: Vec<String> = match operation {
            ToolOperation::Init => vec!["init", "-input=false", "-no-color"],
            ToolOperation::Apply => vec!["apply", "-input=false", "-auto-approve", "-no-color"],
            ToolOperation::Destroy => {
                vec!["destroy", "-input=false", "-auto-approve", "-no-color"]
            }
            ToolOperation::Output => vec!["output", "-json", "-no-color"],
        }
        .into_iter()
        .map(str::to_owned)
        .collect();

        if let Some(params) = params {
            for (name, value) in params.iter() {
                args.push("-var".to_owned());
                args.push(format!("{name}={}", value.to_cli_literal()));
            }
        }
        args
    }

    async fn run(
        &self,
        operation: ToolOperation,
        dir: &Path,
        params: Option<&ParameterSet>,
    ) -> Result<String, ToolFailure> {
        let is_dir = tokio::fs::metadata(dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(ToolFailure::new(
                operation,
                format!("working directory does not exist: {}", dir.display()),
            ));
        }

        let args = Self::build_args(operation, params);
        let output = run_command(&self.binary, &args, TERRAFORM_ENV, Some(dir), None)
            .await
            .map_err(|e| match e {
                CommandError::Spawn(reason) => {
                    ToolFailure::new(operation, format!("failed to start {}: {reason}", self.binary))
                }
                other => ToolFailure::new(operation, other.to_string()),
            })?;

        if output.success() {
            Ok(output.stdout)
        } else {
            Err(ToolFailure::new(operation, output.failure_message()).with_exit_code(output.exit_code))
        }
    }
}

impl ProvisioningTool for TerraformCli {
    async fn init(&self, dir: &Path) -> Result<(), ToolFailure> {
        self.run(ToolOperation::Init, dir, None).await.map(|_| ())
    }

    async fn apply(&self, dir: &Path, params: &ParameterSet) -> Result<(), ToolFailure> {
        self.run(ToolOperation::Apply, dir, Some(params))
            .await
            .map(|_| ())
    }

    async fn destroy(&self, dir: &Path, params: &ParameterSet) -> Result<(), ToolFailure> {
        self.run(ToolOperation::Destroy, dir, Some(params))
            .await
            .map(|_| ())
    }

    async fn outputs(&self, dir: &Path) -> Result<OutputSet, ToolFailure> {
        let stdout = self.run(ToolOperation::Output, dir, None).await?;
        OutputSet::from_terraform_json(&stdout).map_err(|e| {
            ToolFailure::new(
                ToolOperation::Output,
                format!("failed to parse output json: {e}"),
            )
        })
    }
}

/// 테스트용 Mock 도구
///
/// apply 결과를 순서대로 소비하고 각 연산의 호출 횟수를 기록합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockTool {
    /// apply 호출마다 하나씩 꺼내 쓰는 결과 (비면 성공)
    pub apply_results: std::sync::Mutex<std::collections::VecDeque<Result<(), String>>>,
    /// init 실패 메시지
    pub init_error: Option<String>,
    /// destroy 실패 메시지
    pub destroy_error: Option<String>,
    /// apply 한 번에 걸리는 시간
    pub apply_delay: Option<std::time::Duration>,
    /// apply 성공 후 반환할 출력값
    pub outputs: OutputSet,
    pub init_calls: std::sync::atomic::AtomicU32,
    pub apply_calls: std::sync::atomic::AtomicU32,
    pub destroy_calls: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl MockTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// apply 결과를 순서대로 설정합니다.
    pub fn with_apply_results(self, results: Vec<Result<(), &str>>) -> Self {
        *self.apply_results.lock().unwrap() = results
            .into_iter()
            .map(|r| r.map_err(str::to_owned))
            .collect();
        self
    }

    pub fn with_outputs(mut self, outputs: OutputSet) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_init_error(mut self, message: &str) -> Self {
        self.init_error = Some(message.to_owned());
        self
    }

    pub fn with_destroy_error(mut self, message: &str) -> Self {
        self.destroy_error = Some(message.to_owned());
        self
    }

    pub fn with_apply_delay(mut self, delay: std::time::Duration) -> Self {
        self.apply_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> (u32, u32, u32) {
        use std::sync::atomic::Ordering;
        (
            self.init_calls.load(Ordering::SeqCst),
            self.apply_calls.load(Ordering::SeqCst),
            self.destroy_calls.load(Ordering::SeqCst),
        )
    }
}

#[cfg(test)]
impl ProvisioningTool for MockTool {
    async fn init(&self, _dir: &Path) -> Result<(), ToolFailure> {
        self.init_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.init_error {
            Some(msg) => Err(ToolFailure::new(ToolOperation::Init, msg.clone())),
            None => Ok(()),
        }
    }

    async fn apply(&self, _dir: &Path, _params: &ParameterSet) -> Result<(), ToolFailure> {
        self.apply_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(delay) = self.apply_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.apply_results.lock().unwrap().pop_front();
        match next {
            Some(Err(msg)) => Err(ToolFailure::new(ToolOperation::Apply, msg).with_exit_code(Some(1))),
            Some(Ok(())) | None => Ok(()),
        }
    }

    async fn destroy(&self, _dir: &Path, _params: &ParameterSet) -> Result<(), ToolFailure> {
        self.destroy_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.destroy_error {
            Some(msg) => Err(ToolFailure::new(ToolOperation::Destroy, msg.clone())),
            None => Ok(()),
        }
    }

    async fn outputs(&self, _dir: &Path) -> Result<OutputSet, ToolFailure> {
        Ok(self.outputs.clone())
    }
}
