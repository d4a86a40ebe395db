//! The child side of the isolation boundary: read one request from stdin, compute it,
//! write one JSON line to stdout.

use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dispatch::{panic_message, Dispatcher};
use crate::symbols::SymbolTable;
use crate::task::{SolveResult, TaskDescriptor, VerifyResult};
use crate::verify::{VerifyConfig, Verifier};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkerRequest {
    Solve {
        task: TaskDescriptor,
    },
    Verify {
        plan: TaskDescriptor,
        answer: String,
        settings: VerifyConfig,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "result", rename_all = "snake_case")]
pub enum WorkerResponse {
    Solve(SolveResult),
    Verify(VerifyResult),
    /// The worker could not run the request at all.
    Error(String),
}

/// Compute the response for one request. Panics are contained here.
pub fn handle(request: WorkerRequest) -> WorkerResponse {
    let table = Arc::new(SymbolTable::standard());
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || match request {
        WorkerRequest::Solve { task } => WorkerResponse::Solve(Dispatcher::new(table).solve(&task)),
        WorkerRequest::Verify {
            plan,
            answer,
            settings,
        } => WorkerResponse::Verify(Verifier::new(table, settings).verify(&plan, &answer)),
    }));
    outcome.unwrap_or_else(|payload| WorkerResponse::Error(panic_message(payload.as_ref())))
}

/// Decode a request from raw input and compute it.
pub fn handle_bytes(input: &[u8]) -> WorkerResponse {
    match serde_json::from_slice::<WorkerRequest>(input) {
        Ok(request) => handle(request),
        Err(e) => WorkerResponse::Error(format!("bad request: {e}")),
    }
}

/// Body of `symcheck worker`.
pub fn run_stdio() -> io::Result<()> {
    let mut input = Vec::new();
    io::stdin().lock().read_to_end(&mut input)?;
    debug!(bytes = input.len(), pid = std::process::id(), "worker received request");
    let response = handle_bytes(&input);
    let mut line = serde_json::to_vec(&response).map_err(io::Error::other)?;
    line.push(b'\n');
    let mut out = io::stdout().lock();
    out.write_all(&line)?;
    out.flush()
}
