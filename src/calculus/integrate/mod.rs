mod common;
mod exponential;
mod logarithmic;
mod polynomial;
mod rational;
mod substitution;
mod trig;

use crate::calculus::differentiate;
use crate::error::{CasError, Result};
use crate::expr::{Expr, Rational};
use crate::polynomial::{rational_function, Poly};
use crate::simplify::{normalize, simplify, simplify_fully, substitute};
use num_traits::Zero;

pub use exponential::is_exp;
pub use logarithmic::is_log;
pub use polynomial::is_polynomial;
pub use rational::is_rational;
pub use trig::is_trig;

use common::{coeff_of_var, is_zero_expr, product_factors, rebuild_product};

const TRANSFORM_SIZE_LIMIT: usize = 160;
/// Nesting bound for rules that hand a rewritten integrand back to the integrator.
const MAX_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrandKind {
    Polynomial,
    Rational,
    Trig,
    Exponential,
    Logarithmic,
    Product,
    Sum,
    NonElementary(NonElementaryKind),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonElementaryKind {
    ExpOfPolynomial,
    TrigOverArgument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonCode {
    NonElementary(NonElementaryKind),
    UnknownStructure,
}

/// Which form of the integrand an attempt worked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The integrand as written.
    Direct,
    /// After `simplify_fully`, which distributes products over sums.
    Expanded,
    /// After `normalize`, which merges powers and cancels polynomial factors.
    Normalized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    Succeeded,
    NotApplicable,
    Failed(ReasonCode),
    HitLimit { size: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationAttempt {
    pub strategy: Strategy,
    pub status: AttemptStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrandReport {
    pub kind: IntegrandKind,
    pub reason: Option<ReasonCode>,
    pub attempts: Vec<IntegrationAttempt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationResult {
    Integrated {
        result: Expr,
        report: IntegrandReport,
    },
    NotIntegrable(IntegrandReport),
}

impl IntegrationResult {
    pub fn report(&self) -> &IntegrandReport {
        match self {
            IntegrationResult::Integrated { report, .. } => report,
            IntegrationResult::NotIntegrable(report) => report,
        }
    }
}

/// Antiderivative of `expr` with respect to `var`, without a constant of integration.
pub fn integrate(var: &str, expr: &Expr) -> IntegrationResult {
    let kind = classify_integrand(expr, var);
    if let IntegrandKind::NonElementary(non_elem) = &kind {
        return IntegrationResult::NotIntegrable(IntegrandReport {
            reason: Some(ReasonCode::NonElementary(non_elem.clone())),
            kind,
            attempts: Vec::new(),
        });
    }

    let mut attempts = Vec::new();
    let mut previous: Vec<Expr> = Vec::new();
    for strategy in [Strategy::Direct, Strategy::Expanded, Strategy::Normalized] {
        let candidate = match strategy {
            Strategy::Direct => expr.clone(),
            Strategy::Expanded => simplify_fully(expr.clone()),
            Strategy::Normalized => normalize(expr.clone()),
        };
        let size = candidate.size();
        if size > TRANSFORM_SIZE_LIMIT {
            attempts.push(IntegrationAttempt {
                strategy,
                status: AttemptStatus::HitLimit {
                    size,
                    limit: TRANSFORM_SIZE_LIMIT,
                },
            });
            continue;
        }
        if previous.contains(&candidate) {
            attempts.push(IntegrationAttempt {
                strategy,
                status: AttemptStatus::NotApplicable,
            });
            continue;
        }
        if let Some(result) = integrate_at(&candidate, var, 0) {
            attempts.push(IntegrationAttempt {
                strategy,
                status: AttemptStatus::Succeeded,
            });
            return IntegrationResult::Integrated {
                result: simplify_fully(result),
                report: IntegrandReport {
                    kind,
                    reason: None,
                    attempts,
                },
            };
        }
        attempts.push(IntegrationAttempt {
            strategy,
            status: AttemptStatus::Failed(ReasonCode::UnknownStructure),
        });
        previous.push(candidate);
    }

    IntegrationResult::NotIntegrable(IntegrandReport {
        kind,
        reason: Some(ReasonCode::UnknownStructure),
        attempts,
    })
}

/// Evaluate an integral node: the antiderivative when `bounds` is `None`, otherwise
/// `F(upper) - F(lower)` simplified.
///
/// Infinite bounds are rejected as `CasError::Unsupported`; a rule-set miss is returned
/// as `IntegrationResult::NotIntegrable` so callers can report the attempts.
pub fn evaluate_integral(
    integrand: &Expr,
    var: &str,
    bounds: Option<&(Expr, Expr)>,
) -> Result<IntegrationResult> {
    if let Some((lower, upper)) = bounds {
        if contains_infinity(lower) || contains_infinity(upper) {
            return Err(CasError::Unsupported("improper integral".into()));
        }
    }
    let antiderivative = integrate(var, integrand);
    let (result, report) = match antiderivative {
        IntegrationResult::Integrated { result, report } => (result, report),
        not_integrable => return Ok(not_integrable),
    };
    let value = match bounds {
        None => result,
        Some((lower, upper)) => simplify_fully(Expr::Sub(
            substitute(&result, var, upper).boxed(),
            substitute(&result, var, lower).boxed(),
        )),
    };
    Ok(IntegrationResult::Integrated {
        result: value,
        report,
    })
}

fn contains_infinity(expr: &Expr) -> bool {
    match expr {
        Expr::Infinity => true,
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
            contains_infinity(a) || contains_infinity(b)
        }
        Expr::Neg(inner) => contains_infinity(inner),
        Expr::Integral {
            integrand, bounds, ..
        } => {
            contains_infinity(integrand)
                || bounds
                    .as_ref()
                    .map(|b| contains_infinity(&b.0) || contains_infinity(&b.1))
                    .unwrap_or(false)
        }
        other => other.function_arg().map(contains_infinity).unwrap_or(false),
    }
}

fn integrate_at(expr: &Expr, var: &str, depth: usize) -> Option<Expr> {
    if depth > MAX_DEPTH {
        return None;
    }
    if !expr.contains_var(var) {
        return Some(Expr::Mul(expr.clone().boxed(), Expr::var(var).boxed()));
    }
    match expr {
        Expr::Add(a, b) => {
            return Some(Expr::Add(
                integrate_at(a, var, depth)?.boxed(),
                integrate_at(b, var, depth)?.boxed(),
            ));
        }
        Expr::Sub(a, b) => {
            return Some(Expr::Sub(
                integrate_at(a, var, depth)?.boxed(),
                integrate_at(b, var, depth)?.boxed(),
            ));
        }
        Expr::Neg(inner) => {
            return integrate_at(inner, var, depth).map(|r| Expr::Neg(r.boxed()));
        }
        Expr::Div(num, den) if !den.contains_var(var) => {
            return integrate_at(num, var, depth).map(|r| Expr::Div(r.boxed(), den.clone()));
        }
        _ => {}
    }

    if let Some(result) = integrate_kernel(expr, var) {
        return Some(result);
    }

    // pull out factors that do not depend on `var`
    let (constant, dependent): (Vec<Expr>, Vec<Expr>) = product_factors(expr)
        .into_iter()
        .partition(|f| !f.contains_var(var));
    if constant.is_empty() {
        return integrate_product(expr, &dependent, var, depth);
    }
    let constant = simplify(rebuild_product(constant));
    if is_zero_expr(&constant) {
        return Some(Expr::Constant(Rational::zero()));
    }
    let rest = rebuild_product(dependent);
    integrate_at(&rest, var, depth).map(|r| Expr::Mul(constant.boxed(), r.boxed()))
}

fn integrate_kernel(expr: &Expr, var: &str) -> Option<Expr> {
    polynomial::integrate(expr, var)
        .or_else(|| polynomial::integrate_affine_power(expr, var))
        .or_else(|| rational::integrate(expr, var))
        .or_else(|| trig::integrate(expr, var))
        .or_else(|| trig::integrate_power_product(expr, var))
        .or_else(|| exponential::integrate(expr, var))
        .or_else(|| logarithmic::integrate(expr, var))
}

/// Rules for integrands with no constant factor left, cheapest first.
fn integrate_product(expr: &Expr, factors: &[Expr], var: &str, depth: usize) -> Option<Expr> {
    integrate_by_parts(factors, var, depth)
        .or_else(|| exponential::integrate_exp_trig(factors, var))
        .or_else(|| substitution::integrate(expr, var, depth))
        .or_else(|| integrate_log_by_parts(factors, var, depth))
}

/// `∫ p(x) g(x) dx = p G - ∫ p' G dx` for a polynomial `p` and `g` one of `exp`, `sin`,
/// `cos` of an affine argument. Terminates because `p'` has lower degree.
fn integrate_by_parts(factors: &[Expr], var: &str, depth: usize) -> Option<Expr> {
    if factors.len() < 2 {
        return None;
    }
    let (poly_factors, other): (Vec<Expr>, Vec<Expr>) = factors
        .iter()
        .cloned()
        .partition(|f| Poly::from_expr(f, var).is_some());
    if poly_factors.is_empty() || other.len() != 1 {
        return None;
    }
    let g = &other[0];
    if !matches!(g, Expr::Exp(_) | Expr::Sin(_) | Expr::Cos(_)) {
        return None;
    }
    coeff_of_var(g.function_arg()?, var)?;
    let p = Poly::from_expr(&rebuild_product(poly_factors), var)?;
    parts_recursive(&p, g, var, depth)
}

fn parts_recursive(p: &Poly, g: &Expr, var: &str, depth: usize) -> Option<Expr> {
    if p.is_zero() {
        return Some(Expr::Constant(Rational::zero()));
    }
    let big_g = simplify(integrate_at(g, var, depth)?);
    let head = Expr::Mul(p.to_expr(var).boxed(), big_g.clone().boxed());
    if p.degree() == Some(0) {
        return Some(head);
    }
    let tail = parts_recursive(&p.derivative(), &big_g, var, depth)?;
    Some(Expr::Sub(head.boxed(), tail.boxed()))
}

/// `∫ r(x) log(g(x)) dx = R log(g) - ∫ R g'/g dx` with `R = ∫ r`, for rational `r` and
/// `g`. Only taken when `R` has no logarithm itself, so the remaining integral is
/// rational.
fn integrate_log_by_parts(factors: &[Expr], var: &str, depth: usize) -> Option<Expr> {
    let idx = factors.iter().position(|f| matches!(f, Expr::Log(_)))?;
    let arg = factors[idx].function_arg()?;
    rational_function(arg, var)?;
    let rest = rebuild_product(
        factors
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, f)| f.clone())
            .collect(),
    );
    rational_function(&rest, var)?;

    let big_r = simplify_fully(integrate_at(&rest, var, depth + 1)?);
    if contains_log(&big_r) {
        return None;
    }
    let derivative = simplify_fully(differentiate(var, arg));
    let remaining = Expr::Div(
        Expr::Mul(big_r.clone().boxed(), derivative.boxed()).boxed(),
        arg.clone().boxed(),
    );
    let tail = integrate_at(&remaining, var, depth + 1)?;
    Some(Expr::Sub(
        Expr::Mul(big_r.boxed(), Expr::Log(arg.clone().boxed()).boxed()).boxed(),
        tail.boxed(),
    ))
}

fn contains_log(expr: &Expr) -> bool {
    match expr {
        Expr::Log(_) => true,
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
            contains_log(a) || contains_log(b)
        }
        Expr::Neg(inner) => contains_log(inner),
        other => other.function_arg().map(contains_log).unwrap_or(false),
    }
}

fn classify_integrand(expr: &Expr, var: &str) -> IntegrandKind {
    if let Some(non_elem) = detect_non_elementary(expr, var) {
        return IntegrandKind::NonElementary(non_elem);
    }
    if is_polynomial(expr, var) {
        return IntegrandKind::Polynomial;
    }
    if is_rational(expr, var) {
        return IntegrandKind::Rational;
    }
    if is_trig(expr) {
        return IntegrandKind::Trig;
    }
    if is_exp(expr) {
        return IntegrandKind::Exponential;
    }
    if is_log(expr) {
        return IntegrandKind::Logarithmic;
    }
    match expr {
        Expr::Add(_, _) | Expr::Sub(_, _) => IntegrandKind::Sum,
        Expr::Mul(_, _) | Expr::Div(_, _) => IntegrandKind::Product,
        _ => IntegrandKind::Unknown,
    }
}

/// Shapes with no elementary antiderivative: `exp(p(x))` for `deg p >= 2` and
/// `sin(x)/x`, `cos(x)/x`.
fn detect_non_elementary(expr: &Expr, var: &str) -> Option<NonElementaryKind> {
    match expr {
        Expr::Exp(arg) => {
            let degree = Poly::from_expr(arg, var)?.degree()?;
            (degree > 1).then_some(NonElementaryKind::ExpOfPolynomial)
        }
        Expr::Div(num, den) => match &**num {
            Expr::Sin(arg) | Expr::Cos(arg) if **arg == **den && arg.as_variable() == Some(var) => {
                Some(NonElementaryKind::TrigOverArgument)
            }
            _ => None,
        },
        Expr::Mul(a, b) if !a.contains_var(var) => detect_non_elementary(b, var),
        _ => None,
    }
}
