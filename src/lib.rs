//! Sandboxed symbolic solving and answer verification for calculus tasks.
//!
//! A small computer algebra kernel (parser, simplifier, differentiator, rule-based
//! integrator) sits under a task dispatcher, a verifier, and a harness that runs each
//! request in its own killable worker process.

pub mod api;
pub mod calculus;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod expr;
pub mod extract;
pub mod format;
pub mod harness;
pub mod normalizer;
pub mod numeric;
pub mod parser;
pub mod polynomial;
pub mod service;
pub mod simplify;
pub mod symbols;
pub mod task;
pub mod verify;
pub mod worker;

pub use calculus::{
    AttemptStatus, IntegrandKind, IntegrandReport, IntegrationAttempt, IntegrationResult,
    NonElementaryKind, ReasonCode, Strategy, differentiate, evaluate_integral, integrate,
};
pub use config::{Config, ConfigError, HarnessConfig};
pub use dispatch::{Dispatcher, SolveContext, SolveStrategy};
pub use domain::{solve_domain, DomainOutcome, RealSet};
pub use error::{CasError, Result};
pub use expr::{Expr, Rational, add, div, mul, neg, one, pow, rational, sub, zero};
pub use extract::{candidate_token, clean_latex, extract_answer};
pub use format::{pretty, pretty_integration_result};
pub use harness::{Harness, WorkerOutcome};
pub use normalizer::Normalizer;
pub use numeric::evaluate;
pub use parser::parse_expr;
pub use polynomial::Poly;
pub use service::Engine;
pub use simplify::{normalize, simplify, simplify_fully, simplify_with_limit, substitute};
pub use symbols::SymbolTable;
pub use task::{SolveResult, TaskDescriptor, TaskType, Verdict, VerifyRequest, VerifyResult};
pub use verify::{VerifyConfig, Verifier};
pub use worker::{WorkerRequest, WorkerResponse};
