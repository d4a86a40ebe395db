//! Configuration management for symcheck.
//!
//! Configuration is read from environment variables:
//! - `SYMCHECK_HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `SYMCHECK_PORT` - Optional. Server port. Defaults to `8001`.
//! - `SYMCHECK_SOLVE_TIMEOUT_MS` - Optional. Worker deadline. Defaults to `2000`.
//! - `SYMCHECK_KILL_GRACE_MS` - Optional. Wait after killing a late worker. Defaults to `1000`.
//! - `SYMCHECK_WORKER_BIN` - Optional. Worker executable. Defaults to the running binary.
//! - `SYMCHECK_VERIFY_TOLERANCE` - Optional. Sampling tolerance. Defaults to `1e-6`.
//! - `SYMCHECK_SAMPLE_POINTS` - Optional. Comma-separated sample points.
//!   Defaults to `0.1,0.2,0.5,1.0,2.0`.
//! - `SYMCHECK_ISOLATE_VERIFY` - Optional. Run verification in a worker. Defaults to `true`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::verify::VerifyConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// How worker processes are launched and bounded.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Executable started for every request
    pub worker_bin: PathBuf,

    /// Arguments passed to the executable
    pub worker_args: Vec<String>,

    /// Wall-clock deadline, measured from spawn
    pub solve_timeout: Duration,

    /// How long to wait for a killed worker before giving up on it
    pub kill_grace: Duration,
}

impl HarnessConfig {
    pub const DEFAULT_SOLVE_TIMEOUT: Duration = Duration::from_millis(2000);
    pub const DEFAULT_KILL_GRACE: Duration = Duration::from_millis(1000);

    /// The `worker` subcommand of `bin` with default deadlines.
    pub fn for_binary(bin: impl Into<PathBuf>) -> Self {
        Self {
            worker_bin: bin.into(),
            worker_args: vec!["worker".to_string()],
            solve_timeout: Self::DEFAULT_SOLVE_TIMEOUT,
            kill_grace: Self::DEFAULT_KILL_GRACE,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Worker process settings
    pub harness: HarnessConfig,

    /// Sampling policy for verification
    pub verify: VerifyConfig,

    /// Whether `/verify` runs in a worker process too
    pub isolate_verify: bool,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("SYMCHECK_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "SYMCHECK_PORT", 8001u16)?;

        let worker_bin = match lookup("SYMCHECK_WORKER_BIN") {
            Some(path) => PathBuf::from(path),
            None => std::env::current_exe()
                .map_err(|_| ConfigError::MissingEnvVar("SYMCHECK_WORKER_BIN".to_string()))?,
        };
        let mut harness = HarnessConfig::for_binary(worker_bin);
        harness.solve_timeout = Duration::from_millis(parse_or(
            &lookup,
            "SYMCHECK_SOLVE_TIMEOUT_MS",
            HarnessConfig::DEFAULT_SOLVE_TIMEOUT.as_millis() as u64,
        )?);
        harness.kill_grace = Duration::from_millis(parse_or(
            &lookup,
            "SYMCHECK_KILL_GRACE_MS",
            HarnessConfig::DEFAULT_KILL_GRACE.as_millis() as u64,
        )?);
        if harness.solve_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "SYMCHECK_SOLVE_TIMEOUT_MS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let mut verify = VerifyConfig::default();
        verify.tolerance = parse_or(&lookup, "SYMCHECK_VERIFY_TOLERANCE", verify.tolerance)?;
        if !(verify.tolerance.is_finite() && verify.tolerance > 0.0) {
            return Err(ConfigError::InvalidValue(
                "SYMCHECK_VERIFY_TOLERANCE".to_string(),
                "must be a positive number".to_string(),
            ));
        }
        if let Some(points) = lookup("SYMCHECK_SAMPLE_POINTS") {
            verify.sample_points = parse_points(&points)?;
        }

        let isolate_verify = match lookup("SYMCHECK_ISOLATE_VERIFY") {
            Some(v) => parse_bool("SYMCHECK_ISOLATE_VERIFY", &v)?,
            None => true,
        };

        Ok(Self {
            host,
            port,
            harness,
            verify,
            isolate_verify,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        None => Ok(default),
    }
}

fn parse_points(raw: &str) -> Result<Vec<f64>, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidValue("SYMCHECK_SAMPLE_POINTS".to_string(), msg);
    let points = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid(format!("`{s}` is not a finite number")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if points.is_empty() {
        return Err(invalid("no sample points".to_string()));
    }
    Ok(points)
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("`{other}` is not a boolean"),
        )),
    }
}
