//! 외부 프로세스 실행 헬퍼
//!
//! 도구와 계정 조회가 공통으로 사용합니다. 표준 입력은 닫고 표준 출력/에러를
//! 모두 캡처합니다. 자식 프로세스는 `kill_on_drop`으로 생성되므로 호출 측이
//! 바깥에서 `tokio::time::timeout`을 걸어 future를 drop해도 프로세스가 종료됩니다.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

/// 종료된 프로세스의 결과
#[derive(Debug, Clone)]
pub(crate) struct CommandOutput {
    /// 종료 코드 (시그널로 종료되면 `None`)
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// 실패 분류에 사용할 메시지
    ///
    /// 도구는 에러를 stderr에 쓰지만 일부는 stdout에만 남기므로 둘을 합칩니다.
    pub fn failure_message(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        match (stderr.is_empty(), stdout.is_empty()) {
            (false, true) => stderr.to_owned(),
            (true, false) => stdout.to_owned(),
            (true, true) => format!("process exited with code {:?}", self.exit_code),
            (false, false) => format!("{stderr}\n{stdout}"),
        }
    }
}

/// 프로세스 실행 실패
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CommandError {
    /// 실행 파일을 시작하지 못함
    Spawn(String),
    /// 대기 중 I/O 실패
    Wait(String),
    /// 제한 시간 초과로 종료됨
    TimedOut(Duration),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn(reason) => write!(f, "failed to spawn: {reason}"),
            Self::Wait(reason) => write!(f, "failed to wait for process: {reason}"),
            Self::TimedOut(limit) => write!(f, "timed out after {}s", limit.as_secs()),
        }
    }
}

/// 프로그램을 실행하고 종료될 때까지 기다립니다.
pub(crate) async fn run_command(
    program: &str,
    args: &[String],
    envs: &[(&str, &str)],
    current_dir: Option<&Path>,
    limit: Option<Duration>,
) -> Result<CommandOutput, CommandError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = current_dir {
        command.current_dir(dir);
    }

    debug!(program, args = ?args, "spawning process");

    let child = command
        .spawn()
        .map_err(|e| CommandError::Spawn(format!("{program}: {e}")))?;

    let output = match limit {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| CommandError::TimedOut(limit))?,
        None => child.wait_with_output().await,
    }
    .map_err(|e| CommandError::Wait(e.to_string()))?;

    Ok(CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
