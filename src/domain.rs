//! Real domain of an expression in one variable.
//!
//! The exact routine handles expressions whose every constraint reduces to the sign of
//! a rational function with rational roots; everything else falls back to listing the
//! necessary conditions as text.

use std::fmt;

use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use crate::expr::{Expr, Rational};
use crate::format::pretty;
use crate::polynomial::{rational_function, Poly};
use crate::simplify::simplify_fully;

/// Answer used when the exact routine gives up.
pub const FALLBACK_ANSWER: &str = "R (需满足根号与分母约束)";

/// A necessary condition on the variable for the expression to be real-valued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    NonNegative(Expr),
    Positive(Expr),
    NonZero(Expr),
}

impl Constraint {
    fn expr(&self) -> &Expr {
        match self {
            Constraint::NonNegative(e) | Constraint::Positive(e) | Constraint::NonZero(e) => e,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::NonNegative(e) => write!(f, "{} >= 0", pretty(e)),
            Constraint::Positive(e) => write!(f, "{} > 0", pretty(e)),
            Constraint::NonZero(e) => write!(f, "{} != 0", pretty(e)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unbounded,
    Open(Rational),
    Closed(Rational),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lower: Endpoint,
    pub upper: Endpoint,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |r: &Rational| pretty(&Expr::Constant(r.clone()));
        if let (Endpoint::Closed(a), Endpoint::Closed(b)) = (&self.lower, &self.upper) {
            if a == b {
                return write!(f, "{{{}}}", show(a));
            }
        }
        match &self.lower {
            Endpoint::Unbounded => write!(f, "(-oo, ")?,
            Endpoint::Open(a) => write!(f, "({}, ", show(a))?,
            Endpoint::Closed(a) => write!(f, "[{}, ", show(a))?,
        }
        match &self.upper {
            Endpoint::Unbounded => write!(f, "oo)"),
            Endpoint::Open(b) => write!(f, "{})", show(b)),
            Endpoint::Closed(b) => write!(f, "{}]", show(b)),
        }
    }
}

/// A finite union of disjoint intervals, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealSet(pub Vec<Interval>);

impl RealSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_all_reals(&self) -> bool {
        self.0.len() == 1
            && self.0[0].lower == Endpoint::Unbounded
            && self.0[0].upper == Endpoint::Unbounded
    }
}

impl fmt::Display for RealSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "EmptySet");
        }
        if self.is_all_reals() {
            return write!(f, "R");
        }
        let parts: Vec<String> = self.0.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join(" U "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainOutcome {
    pub answer: String,
    pub conditions: Vec<Constraint>,
    pub fallback: bool,
}

/// Domain of `expr` as a function of `var`, with the textual fallback.
pub fn solve_domain(expr: &Expr, var: &str) -> DomainOutcome {
    let conditions = collect_constraints(expr);
    match continuous_domain(expr, var, &conditions) {
        Some(set) => DomainOutcome {
            answer: set.to_string(),
            conditions,
            fallback: false,
        },
        None => DomainOutcome {
            answer: FALLBACK_ANSWER.to_string(),
            conditions,
            fallback: true,
        },
    }
}

/// Every necessary condition implied by denominators, negative and even-root powers,
/// logarithms, `asin`/`acos` and `tan`. Duplicates are dropped.
pub fn collect_constraints(expr: &Expr) -> Vec<Constraint> {
    let mut out = Vec::new();
    collect(expr, &mut out);
    let mut unique: Vec<Constraint> = Vec::new();
    for c in out {
        if !unique.contains(&c) {
            unique.push(c);
        }
    }
    unique
}

fn collect(expr: &Expr, out: &mut Vec<Constraint>) {
    match expr {
        Expr::Variable(_) | Expr::Constant(_) | Expr::Pi | Expr::Infinity => {}
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) => {
            collect(a, out);
            collect(b, out);
        }
        Expr::Div(a, b) => {
            collect(a, out);
            collect(b, out);
            push_if_variable(out, Constraint::NonZero((**b).clone()));
        }
        Expr::Pow(base, exp) => {
            collect(base, out);
            collect(exp, out);
            match simplify_fully((**exp).clone()) {
                Expr::Constant(r) => {
                    if r.is_negative() {
                        push_if_variable(out, Constraint::NonZero((**base).clone()));
                    }
                    if !r.is_integer() && r.denom().is_even() {
                        push_if_variable(out, Constraint::NonNegative((**base).clone()));
                    }
                }
                _ => push_if_variable(out, Constraint::Positive((**base).clone())),
            }
        }
        Expr::Neg(a) => collect(a, out),
        Expr::Log(a) => {
            collect(a, out);
            push_if_variable(out, Constraint::Positive((**a).clone()));
        }
        Expr::Asin(a) | Expr::Acos(a) => {
            collect(a, out);
            let one_minus_sq = Expr::Sub(
                Expr::integer(1).boxed(),
                Expr::Pow(a.clone(), Expr::integer(2).boxed()).boxed(),
            );
            push_if_variable(out, Constraint::NonNegative(one_minus_sq));
        }
        Expr::Tan(a) => {
            collect(a, out);
            push_if_variable(out, Constraint::NonZero(Expr::Cos(a.clone())));
        }
        Expr::Sin(a) | Expr::Cos(a) | Expr::Atan(a) | Expr::Exp(a) | Expr::Abs(a) => {
            collect(a, out)
        }
        Expr::Integral { bounds, .. } => {
            if let Some(b) = bounds {
                collect(&b.0, out);
                collect(&b.1, out);
            }
        }
    }
}

fn push_if_variable(out: &mut Vec<Constraint>, constraint: Constraint) {
    if !constraint.expr().free_symbols().is_empty() {
        out.push(constraint);
    }
}

/// A constraint reduced to `N/D` with polynomial `N`, `D`.
struct SignCondition {
    kind: fn(&Rational) -> bool,
    numer: Poly,
    denom: Poly,
}

impl SignCondition {
    fn holds(&self, t: &Rational) -> bool {
        let d = self.denom.evaluate(t);
        if d.is_zero() {
            return false;
        }
        (self.kind)(&(self.numer.evaluate(t) / d))
    }
}

/// Exact domain via a sign chart. `None` when some constraint is not a rational
/// function of `var` alone, has an irrational root, or the expression holds an integral.
pub fn continuous_domain(expr: &Expr, var: &str, conditions: &[Constraint]) -> Option<RealSet> {
    if contains_integral(expr) {
        return None;
    }
    if expr.free_symbols().iter().any(|s| s != var) {
        return None;
    }

    let mut sign_conditions = Vec::new();
    for constraint in conditions {
        let (numer, denom) = rational_function(&simplify_fully(constraint.expr().clone()), var)?;
        let kind: fn(&Rational) -> bool = match constraint {
            Constraint::NonNegative(_) => |v| !v.is_negative(),
            Constraint::Positive(_) => |v| v.is_positive(),
            Constraint::NonZero(_) => |v| !v.is_zero(),
        };
        sign_conditions.push(SignCondition { kind, numer, denom });
    }

    let mut roots: Vec<Rational> = Vec::new();
    for cond in &sign_conditions {
        for poly in [&cond.numer, &cond.denom] {
            if poly.is_zero() {
                continue;
            }
            roots.extend(poly.rational_roots()?);
        }
    }
    roots.sort();
    roots.dedup();

    let admits = |t: &Rational| sign_conditions.iter().all(|c| c.holds(t));
    Some(RealSet(sign_chart(&roots, admits)))
}

/// Walk the alternating open-interval / root pieces and merge admitted runs.
fn sign_chart(roots: &[Rational], admits: impl Fn(&Rational) -> bool) -> Vec<Interval> {
    let one = Rational::one();
    let two = Rational::from_integer(2.into());
    let mut pieces: Vec<(bool, Endpoint, Endpoint)> = Vec::new();
    if roots.is_empty() {
        pieces.push((admits(&Rational::zero()), Endpoint::Unbounded, Endpoint::Unbounded));
    } else {
        let first = &roots[0];
        pieces.push((admits(&(first - &one)), Endpoint::Unbounded, Endpoint::Open(first.clone())));
        for (i, root) in roots.iter().enumerate() {
            pieces.push((admits(root), Endpoint::Closed(root.clone()), Endpoint::Closed(root.clone())));
            let (included, upper) = match roots.get(i + 1) {
                Some(next) => (admits(&((root + next) / &two)), Endpoint::Open(next.clone())),
                None => (admits(&(root + &one)), Endpoint::Unbounded),
            };
            pieces.push((included, Endpoint::Open(root.clone()), upper));
        }
    }

    let mut result = Vec::new();
    let mut start: Option<Endpoint> = None;
    let mut last_upper = Endpoint::Unbounded;
    for (included, lower, upper) in pieces {
        if included {
            if start.is_none() {
                start = Some(lower);
            }
            last_upper = upper;
        } else if let Some(lower) = start.take() {
            result.push(Interval {
                lower,
                upper: last_upper.clone(),
            });
        }
    }
    if let Some(lower) = start {
        result.push(Interval {
            lower,
            upper: last_upper,
        });
    }
    result
}

fn contains_integral(expr: &Expr) -> bool {
    match expr {
        Expr::Integral { .. } => true,
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
            contains_integral(a) || contains_integral(b)
        }
        Expr::Neg(a) => contains_integral(a),
        other => other.function_arg().map(contains_integral).unwrap_or(false),
    }
}
