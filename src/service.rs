use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::config::Config;
use crate::harness::Harness;
use crate::raw;
use crate::symbols::SymbolTable;
use crate::task::{SolveResult, TaskDescriptor, Verdict, VerifyRequest, VerifyResult};
use crate::verify::{Verifier, EMPTY_ANSWER};

/// The two request/response operations, shared by the HTTP and CLI front ends.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Config,
    harness: Harness,
    verifier: Arc<Verifier>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let table = Arc::new(SymbolTable::standard());
        Self {
            harness: Harness::new(config.harness.clone()),
            verifier: Arc::new(Verifier::new(table, config.verify.clone())),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Always runs in a fresh worker process.
    pub async fn solve_task(&self, task: TaskDescriptor) -> SolveResult {
        let started = Instant::now();
        let result = self.harness.solve(&task).await;
        info!(
            task_type = %task.task_type,
            ok = result.ok,
            error = %result.error,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "solve_task"
        );
        result
    }

    pub async fn verify(&self, request: VerifyRequest) -> VerifyResult {
        let started = Instant::now();
        let VerifyRequest { plan, answer } = request;
        let result = if answer.trim().is_empty() {
            VerifyResult::decided(Verdict::Unknown, EMPTY_ANSWER, raw!())
        } else if self.config.isolate_verify {
            self.harness.verify(&plan, &answer, &self.config.verify).await
        } else {
            let verifier = self.verifier.clone();
            let task = plan.clone();
            match tokio::task::spawn_blocking(move || verifier.verify(&task, &answer)).await {
                Ok(result) => result,
                Err(e) => VerifyResult::infrastructure(
                    format!("Panic:{e}"),
                    raw!("category" => "Panic", "trace" => e.to_string()),
                ),
            }
        };
        info!(
            task_type = %plan.task_type,
            verdict = %result.verdict,
            reason = %result.reason,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "verify"
        );
        result
    }
}
