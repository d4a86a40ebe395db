//! symcheck - solver service, isolated worker and one-shot CLI.
//!
//! Usage:
//!   symcheck [serve]   start the HTTP service
//!   symcheck worker    compute one request from stdin (spawned by the service)
//!   symcheck solve     solve one task descriptor read as JSON from stdin
//!   symcheck verify    verify one `{plan, answer}` request read as JSON from stdin

use std::io::Read;
use std::sync::Arc;

use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::Serialize;
use symcheck::{api, config::Config, service::Engine, worker};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    init_logging();
    let command = std::env::args().nth(1).unwrap_or_else(|| "serve".to_string());
    match command.as_str() {
        // stdout is the response channel; no runtime needed
        "worker" => worker::run_stdio().context("worker i/o failed"),
        "serve" | "solve" | "verify" => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async_main(&command))
        }
        other => bail!("unknown command `{other}` (expected serve, worker, solve or verify)"),
    }
}

async fn async_main(command: &str) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let engine = Arc::new(Engine::new(config));
    match command {
        "solve" => print_json(&engine.solve_task(read_stdin_json()?).await),
        "verify" => print_json(&engine.verify(read_stdin_json()?).await),
        _ => api::serve(engine).await,
    }
}

/// Logs go to stderr so stdout stays reserved for responses.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "symcheck=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_stdin_json<T: DeserializeOwned>() -> anyhow::Result<T> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    serde_json::from_str(&input).context("stdin is not a valid request")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
