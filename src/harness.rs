//! Runs each request in a fresh worker process under a hard wall-clock deadline.
//!
//! Symbolic rewriting has no safe suspension points, so a runaway computation is stopped
//! by killing its process. One child per call; nothing is pooled.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::raw;
use crate::task::{
    SolveResult, TaskDescriptor, Verdict, VerifyResult, NO_RESULT, TIMEOUT, WORKER_ERR,
};
use crate::verify::VerifyConfig;
use crate::worker::{WorkerRequest, WorkerResponse};

#[derive(Debug, Error)]
enum HarnessError {
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to start worker: {0}")]
    Spawn(io::Error),
    #[error("worker i/o: {0}")]
    Io(#[from] io::Error),
}

/// Observable result of one worker lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    Completed(WorkerResponse),
    TimedOut,
    /// The worker exited without printing a response.
    NoResult,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub async fn run(&self, request: &WorkerRequest) -> WorkerOutcome {
        match self.run_inner(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "worker failed");
                WorkerOutcome::Failed(e.to_string())
            }
        }
    }

    async fn run_inner(&self, request: &WorkerRequest) -> Result<WorkerOutcome, HarnessError> {
        let payload = serde_json::to_vec(request)?;
        let started = Instant::now();
        let mut child = Command::new(&self.config.worker_bin)
            .args(&self.config.worker_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(HarnessError::Spawn)?;
        let pid = child.id();

        let remaining = self.config.solve_timeout.saturating_sub(started.elapsed());
        match tokio::time::timeout(remaining, exchange(&mut child, payload)).await {
            Ok(result) => {
                let (status, stdout) = result?;
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match parse_response(&stdout) {
                    Some(response) => {
                        debug!(?pid, elapsed_ms, "worker finished");
                        Ok(WorkerOutcome::Completed(response))
                    }
                    None => {
                        warn!(?pid, elapsed_ms, %status, "worker exited without a result");
                        Ok(WorkerOutcome::NoResult)
                    }
                }
            }
            Err(_) => {
                // best effort: do not wait past the grace period for the kill to land
                let _ = child.start_kill();
                if tokio::time::timeout(self.config.kill_grace, child.wait())
                    .await
                    .is_err()
                {
                    warn!(?pid, "worker still alive after kill grace period");
                }
                warn!(
                    ?pid,
                    timeout_ms = self.config.solve_timeout.as_millis() as u64,
                    "worker timed out"
                );
                Ok(WorkerOutcome::TimedOut)
            }
        }
    }

    /// Solve `task` in a worker. Harness failures become `ok = false` with `TIMEOUT`,
    /// `NO_RESULT` or `WORKER_ERR:<detail>`.
    pub async fn solve(&self, task: &TaskDescriptor) -> SolveResult {
        let request = WorkerRequest::Solve { task: task.clone() };
        match self.run(&request).await {
            WorkerOutcome::Completed(WorkerResponse::Solve(result)) => result,
            WorkerOutcome::Completed(WorkerResponse::Error(detail)) | WorkerOutcome::Failed(detail) => {
                SolveResult::failure(format!("{WORKER_ERR}:{detail}"), raw!())
            }
            WorkerOutcome::Completed(other) => SolveResult::failure(
                format!("{WORKER_ERR}:unexpected response {other:?}"),
                raw!(),
            ),
            WorkerOutcome::TimedOut => SolveResult::failure(TIMEOUT, raw!()),
            WorkerOutcome::NoResult => SolveResult::failure(NO_RESULT, raw!()),
        }
    }

    /// Verify in a worker. A timeout or a silent exit cannot decide anything, so those
    /// are `UNKNOWN`; only a broken harness is `ok = false`.
    pub async fn verify(&self, plan: &TaskDescriptor, answer: &str, settings: &VerifyConfig) -> VerifyResult {
        let request = WorkerRequest::Verify {
            plan: plan.clone(),
            answer: answer.to_string(),
            settings: settings.clone(),
        };
        match self.run(&request).await {
            WorkerOutcome::Completed(WorkerResponse::Verify(result)) => result,
            WorkerOutcome::Completed(WorkerResponse::Error(detail)) | WorkerOutcome::Failed(detail) => {
                VerifyResult::infrastructure(format!("{WORKER_ERR}:{detail}"), raw!())
            }
            WorkerOutcome::Completed(other) => VerifyResult::infrastructure(
                format!("{WORKER_ERR}:unexpected response {other:?}"),
                raw!(),
            ),
            WorkerOutcome::TimedOut => VerifyResult::decided(Verdict::Unknown, TIMEOUT, raw!()),
            WorkerOutcome::NoResult => VerifyResult::decided(Verdict::Unknown, NO_RESULT, raw!()),
        }
    }
}

/// Feed the request, collect stdout until EOF, reap the child.
async fn exchange(child: &mut Child, payload: Vec<u8>) -> io::Result<(ExitStatus, Vec<u8>)> {
    if let Some(mut stdin) = child.stdin.take() {
        // a worker that exits early closes the pipe; that is reported as NO_RESULT below
        let _ = stdin.write_all(&payload).await;
        let _ = stdin.shutdown().await;
    }
    let mut stdout = Vec::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_end(&mut stdout).await?;
    }
    let status = child.wait().await?;
    Ok((status, stdout))
}

/// The last non-empty line that decodes as a response.
fn parse_response(stdout: &[u8]) -> Option<WorkerResponse> {
    let text = String::from_utf8_lossy(stdout);
    let line = text.lines().rev().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(line).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_last_line_counts() {
        let out = b"noise\n{\"op\":\"error\",\"result\":\"x\"}\n\n";
        assert_eq!(
            parse_response(out),
            Some(WorkerResponse::Error("x".to_string()))
        );
        assert_eq!(parse_response(b"{\"op\":\"error\"\n"), None);
        assert_eq!(parse_response(b""), None);
    }
}
