//! Compares a candidate answer against a freshly computed reference.
//!
//! Two tiers: the simplified difference is first checked for an exact zero, then sampled
//! numerically at fixed points. Sampling is a second opinion for differences the
//! simplifier cannot close; it is probabilistic, not a proof.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::calculus::{differentiate, evaluate_integral, IntegrationResult};
use crate::dispatch::panic_message;
use crate::error::{CasError, Result};
use crate::expr::Expr;
use crate::extract::candidate_token;
use crate::format::pretty;
use crate::normalizer::Normalizer;
use crate::numeric::{evaluate, sample_bindings};
use crate::raw;
use crate::simplify::simplify_fully;
use crate::symbols::SymbolTable;
use crate::task::{TaskDescriptor, TaskType, Verdict, VerifyResult, PARSE_NOT_INTEGRAL};

pub const EMPTY_ANSWER: &str = "empty answer";
pub const SYMBOLIC_ZERO: &str = "SYMBOLIC_ZERO";
pub const NUM_SAMPLING: &str = "NUM_SAMPLING";
pub const NUM_SAMPLING_MISMATCH: &str = "NUM_SAMPLING_MISMATCH";
pub const DOMAIN_VERIFY: &str = "DOMAIN_VERIFY_V0";
pub const NOT_IMPLEMENTED: &str = "VERIFY_NOT_IMPLEMENTED_V0";

pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_SAMPLE_POINTS: [f64; 5] = [0.1, 0.2, 0.5, 1.0, 2.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Largest accepted absolute difference at a sample point.
    pub tolerance: f64,
    /// Values of the task variable the difference is sampled at.
    pub sample_points: Vec<f64>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            sample_points: DEFAULT_SAMPLE_POINTS.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Verifier {
    normalizer: Normalizer,
    config: VerifyConfig,
}

impl Verifier {
    pub fn new(table: Arc<SymbolTable>, config: VerifyConfig) -> Self {
        Self {
            normalizer: Normalizer::new(table),
            config,
        }
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// Judge `answer` against the reference for `plan`.
    ///
    /// `ok = false` is only returned when the engine itself fails (unparseable input,
    /// evaluation error, panic); not being able to decide is `ok = true, UNKNOWN`.
    pub fn verify(&self, plan: &TaskDescriptor, answer: &str) -> VerifyResult {
        let answer = answer.trim();
        if answer.is_empty() {
            return VerifyResult::decided(Verdict::Unknown, EMPTY_ANSWER, raw!());
        }
        let result = match panic::catch_unwind(AssertUnwindSafe(|| self.verify_answer(plan, answer))) {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => VerifyResult::infrastructure(
                err.token(),
                raw!("category" => err.category(), "trace" => err.detail()),
            ),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                VerifyResult::infrastructure(
                    format!("Panic:{message}"),
                    raw!("category" => "Panic", "trace" => message),
                )
            }
        };
        debug!(task_type = %plan.task_type, verdict = %result.verdict, reason = %result.reason, "verified");
        result
    }

    fn verify_answer(&self, plan: &TaskDescriptor, answer: &str) -> Result<VerifyResult> {
        match &plan.task_type {
            TaskType::Derivative => self.verify_derivative(plan, answer),
            t if t.is_integral() => self.verify_integral(plan, answer),
            TaskType::Domain => Ok(VerifyResult::decided(Verdict::Unknown, DOMAIN_VERIFY, raw!())),
            _ => Ok(VerifyResult::decided(Verdict::Unknown, NOT_IMPLEMENTED, raw!())),
        }
    }

    fn verify_derivative(&self, plan: &TaskDescriptor, answer: &str) -> Result<VerifyResult> {
        let var = self.normalizer.table().default_var();
        let expr = self.normalizer.normalize(&plan.expr_sympy)?;
        let reference = simplify_fully(differentiate(var, &expr));
        let candidate = self.parse_candidate(answer)?;
        let diff = simplify_fully(Expr::Sub(reference.clone().boxed(), candidate.clone().boxed()));
        self.judge(&diff, var, &reference, &candidate)
    }

    /// Definite integrals compare values; indefinite ones compare the candidate's
    /// derivative with the integrand, so any constant of integration is accepted.
    fn verify_integral(&self, plan: &TaskDescriptor, answer: &str) -> Result<VerifyResult> {
        let expr = self.normalizer.normalize(&plan.expr_sympy)?;
        let Expr::Integral {
            integrand,
            var,
            bounds,
        } = &expr
        else {
            return Ok(VerifyResult::decided(Verdict::Unknown, PARSE_NOT_INTEGRAL, raw!()));
        };

        match bounds.as_deref() {
            Some(b) => {
                let reference = match evaluate_integral(integrand, var, Some(b)) {
                    Ok(IntegrationResult::Integrated { result, .. }) => result,
                    // quadrature on the integral node itself
                    Ok(IntegrationResult::NotIntegrable(_)) => expr.clone(),
                    Err(err @ CasError::Unsupported(_)) => {
                        return Ok(VerifyResult::decided(Verdict::Unknown, err.token(), raw!()));
                    }
                    Err(err) => return Err(err),
                };
                let candidate = self.parse_candidate(answer)?;
                let diff = simplify_fully(Expr::Sub(reference.clone().boxed(), candidate.clone().boxed()));
                self.judge(&diff, var, &reference, &candidate)
            }
            None => {
                let candidate = self.parse_candidate(strip_integration_constant(answer))?;
                let derivative = simplify_fully(differentiate(var, &candidate));
                let diff = simplify_fully(Expr::Sub(derivative.boxed(), (**integrand).clone().boxed()));
                self.judge(&diff, var, integrand, &candidate)
            }
        }
    }

    /// Parse the answer as written; if that fails, extract and clean a final-answer
    /// token from it and parse that instead.
    fn parse_candidate(&self, answer: &str) -> Result<Expr> {
        match self.normalizer.normalize(answer) {
            Ok(expr) => Ok(expr),
            Err(first) => {
                let token = candidate_token(answer);
                if token == answer {
                    return Err(first);
                }
                self.normalizer.normalize(&token)
            }
        }
    }

    fn judge(&self, diff: &Expr, var: &str, reference: &Expr, candidate: &Expr) -> Result<VerifyResult> {
        let mut raw = raw!("reference" => pretty(reference), "candidate" => pretty(candidate));
        if diff.is_zero() {
            return Ok(VerifyResult::decided(Verdict::Pass, SYMBOLIC_ZERO, raw));
        }

        let mut samples = Vec::with_capacity(self.config.sample_points.len());
        for &point in &self.config.sample_points {
            let bindings = sample_bindings(self.normalizer.table(), var, point);
            samples.push(evaluate(diff, &bindings)?);
        }
        let all_finite = samples.iter().all(|v| v.is_finite());
        let max_abs = samples.iter().fold(0.0_f64, |m, v| m.max(v.abs()));

        raw.insert("difference".into(), json!(pretty(diff)));
        raw.insert("samples".into(), Value::Array(samples.iter().map(|v| finite_or_null(*v)).collect()));
        raw.insert(
            "max_abs".into(),
            if all_finite { finite_or_null(max_abs) } else { Value::Null },
        );
        if all_finite && max_abs < self.config.tolerance {
            Ok(VerifyResult::decided(Verdict::Pass, NUM_SAMPLING, raw))
        } else {
            Ok(VerifyResult::decided(Verdict::Fail, NUM_SAMPLING_MISMATCH, raw))
        }
    }
}

fn finite_or_null(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn strip_integration_constant(answer: &str) -> &str {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\s*\+\s*C\s*$").ok());
    match re.as_ref().and_then(|re| re.find(answer)) {
        Some(m) if m.start() > 0 => &answer[..m.start()],
        _ => answer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> Verifier {
        Verifier::new(Arc::new(SymbolTable::standard()), VerifyConfig::default())
    }

    fn derivative_of(expr: &str) -> TaskDescriptor {
        TaskDescriptor::new("derivative", expr)
    }

    #[test]
    fn exact_derivative_passes_symbolically() {
        let r = verifier().verify(&derivative_of("x**2"), "2*x");
        assert!(r.ok);
        assert_eq!(r.verdict, Verdict::Pass);
        assert_eq!(r.reason, SYMBOLIC_ZERO);
    }

    #[test]
    fn wrong_derivative_fails_with_max_difference() {
        let r = verifier().verify(&derivative_of("x**2"), "2*x+1");
        assert!(r.ok);
        assert_eq!(r.verdict, Verdict::Fail);
        assert_eq!(r.reason, NUM_SAMPLING_MISMATCH);
        assert_eq!(r.raw["max_abs"], json!(1.0));
    }

    #[test]
    fn equivalent_forms_pass_by_sampling_or_exactly() {
        let r = verifier().verify(&derivative_of("sin(x)^2"), "sin(2*x)");
        assert!(r.ok);
        assert_eq!(r.verdict, Verdict::Pass, "{r:?}");
    }

    #[test]
    fn empty_answers_are_not_parsed() {
        let r = verifier().verify(&derivative_of("x**2"), "   ");
        assert!(r.ok);
        assert_eq!(r.verdict, Verdict::Unknown);
        assert_eq!(r.reason, EMPTY_ANSWER);
        assert!(r.raw.is_empty());
    }

    #[test]
    fn unparseable_answers_are_infrastructure_failures() {
        let r = verifier().verify(&derivative_of("x**2"), "2*x +* )");
        assert!(!r.ok);
        assert_eq!(r.verdict, Verdict::Unknown);
        assert!(r.reason.starts_with("ParseError:"));
        assert_eq!(r.raw["category"], json!("ParseError"));
    }

    #[test]
    fn unverifiable_types_are_unknown() {
        let r = verifier().verify(&TaskDescriptor::new("domain", "1/x"), "x != 0");
        assert_eq!((r.ok, r.verdict, r.reason.as_str()), (true, Verdict::Unknown, DOMAIN_VERIFY));
        let r = verifier().verify(&TaskDescriptor::new("limit", "sin(x)/x"), "1");
        assert_eq!((r.ok, r.verdict, r.reason.as_str()), (true, Verdict::Unknown, NOT_IMPLEMENTED));
    }

    #[test]
    fn definite_integrals_compare_values() {
        let plan = TaskDescriptor::new("integral_definite", "Integral(2 - sin(x), (x, 0, pi/2))");
        let r = verifier().verify(&plan, "...因此答案为 π - 1。");
        assert_eq!(r.verdict, Verdict::Pass, "{r:?}");
        let r = verifier().verify(&plan, "pi");
        assert_eq!(r.verdict, Verdict::Fail);
    }

    #[test]
    fn indefinite_integrals_accept_any_constant() {
        let plan = TaskDescriptor::new("integral_indefinite", "Integral(cos(x), x)");
        assert_eq!(verifier().verify(&plan, "sin(x) + C").verdict, Verdict::Pass);
        assert_eq!(verifier().verify(&plan, "sin(x) + 3").verdict, Verdict::Pass);
        assert_eq!(verifier().verify(&plan, "cos(x)").verdict, Verdict::Fail);
    }

    #[test]
    fn integration_constant_is_stripped() {
        assert_eq!(strip_integration_constant("x^2 + C"), "x^2");
        assert_eq!(strip_integration_constant("x^2+C "), "x^2");
        assert_eq!(strip_integration_constant("C"), "C");
    }
}
