//! Change of variables: `f(g(x)) * g'(x)` integrates as `F(g(x))`.

use std::collections::HashSet;

use crate::calculus::differentiate;
use crate::expr::Expr;
use crate::polynomial::rational_function;
use crate::simplify::{normalize, simplify_fully, substitute};

use super::common::{product_factors, rebuild_product};
use super::integrate_at;

/// Subexpressions tried as the new variable, largest first.
const CANDIDATE_LIMIT: usize = 12;
const SIZE_LIMIT: usize = 160;

pub(super) fn integrate(expr: &Expr, var: &str, depth: usize) -> Option<Expr> {
    let factors = product_factors(expr);
    if let Some(result) = log_derivative(&factors, var) {
        return Some(result);
    }
    let u = fresh_name(expr);
    for (idx, factor) in factors.iter().enumerate() {
        let Some(inner) = inner_argument(factor) else {
            continue;
        };
        if inner.as_variable() == Some(var) || !inner.contains_var(var) {
            continue;
        }
        let derivative = simplify_fully(differentiate(var, inner));
        let rest = rebuild_product(
            factors
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .map(|(_, f)| f.clone())
                .collect(),
        );
        let Some(multiplier) = constant_ratio(&rest, &derivative, var) else {
            continue;
        };
        let outer = match factor {
            Expr::Pow(_, exp) => Expr::Pow(Expr::var(&u).boxed(), exp.clone()),
            other => other.with_function_arg(Expr::var(&u)),
        };
        if let Some(result) = integrate_at(&outer, &u, depth + 1) {
            return Some(Expr::Mul(
                multiplier.boxed(),
                substitute(&result, &u, inner).boxed(),
            ));
        }
    }
    function_of_inner(expr, var, &u, depth)
}

/// `c * g'(x) / g(x)` integrates to `c * log|g(x)|`.
fn log_derivative(factors: &[Expr], var: &str) -> Option<Expr> {
    let mut denominators = factors.iter().filter_map(|f| match f {
        Expr::Div(one, den) if one.is_one() && den.contains_var(var) => Some(&**den),
        _ => None,
    });
    let den = denominators.next()?;
    if denominators.next().is_some() {
        return None;
    }
    let numerator = rebuild_product(
        factors
            .iter()
            .filter(|f| !matches!(f, Expr::Div(one, d) if one.is_one() && **d == *den))
            .cloned()
            .collect(),
    );
    let derivative = simplify_fully(differentiate(var, den));
    if derivative.is_zero() {
        return None;
    }
    let c = constant_ratio(&numerator, &derivative, var)?;
    Some(Expr::Mul(
        c.boxed(),
        Expr::Log(Expr::Abs(den.clone().boxed()).boxed()).boxed(),
    ))
}

/// Rewrite the whole integrand in terms of one of its subexpressions `g`: divide by
/// `g'`, replace `g` with `u`, and require that no `var` is left.
fn function_of_inner(expr: &Expr, var: &str, u: &str, depth: usize) -> Option<Expr> {
    let mut candidates = Vec::new();
    collect_candidates(expr, var, &mut HashSet::new(), &mut candidates);
    candidates.retain(|c| c != expr);
    candidates.sort_by_key(|c| std::cmp::Reverse(c.size()));
    candidates.truncate(CANDIDATE_LIMIT);

    for candidate in candidates {
        let derivative = simplify_fully(differentiate(var, &candidate));
        if derivative.is_zero() {
            continue;
        }
        let quotient = Expr::Div(expr.clone().boxed(), derivative.boxed());
        for ratio in [simplify_fully(quotient.clone()), normalize(quotient)] {
            if ratio.size() > SIZE_LIMIT {
                continue;
            }
            let replaced = replace(&ratio, &candidate, &Expr::var(u));
            if replaced.contains_var(var) {
                continue;
            }
            if let Some(result) = integrate_at(&replaced, u, depth + 1) {
                return Some(substitute(&result, u, &candidate));
            }
        }
    }
    None
}

/// `a / b` when it does not depend on `var`.
fn constant_ratio(a: &Expr, b: &Expr, var: &str) -> Option<Expr> {
    if let (Some((na, da)), Some((nb, db))) = (rational_function(a, var), rational_function(b, var)) {
        let bottom = da * nb;
        if bottom.is_zero() {
            return None;
        }
        let (quotient, remainder) = (na * db).div_rem(&bottom);
        if !remainder.is_zero() || quotient.degree().unwrap_or(0) > 0 {
            return None;
        }
        return Some(Expr::Constant(quotient.coeff(0)));
    }
    let quotient = normalize(Expr::Div(a.clone().boxed(), b.clone().boxed()));
    (!quotient.contains_var(var)).then_some(quotient)
}

fn inner_argument(factor: &Expr) -> Option<&Expr> {
    match factor {
        Expr::Pow(base, exp) if matches!(**exp, Expr::Constant(_)) => Some(base),
        Expr::Abs(_) => None,
        other => other.function_arg(),
    }
}

fn collect_candidates(expr: &Expr, var: &str, seen: &mut HashSet<Expr>, out: &mut Vec<Expr>) {
    if !expr.contains_var(var) {
        return;
    }
    if expr.as_variable() != Some(var) && seen.insert(expr.clone()) {
        out.push(expr.clone());
    }
    match expr {
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
            collect_candidates(a, var, seen, out);
            collect_candidates(b, var, seen, out);
        }
        Expr::Neg(inner) => collect_candidates(inner, var, seen, out),
        other => {
            if let Some(arg) = other.function_arg() {
                collect_candidates(arg, var, seen, out);
            }
        }
    }
}

/// Structural replacement of every occurrence of `target`.
fn replace(expr: &Expr, target: &Expr, with: &Expr) -> Expr {
    if expr == target {
        return with.clone();
    }
    let go = |e: &Expr| replace(e, target, with).boxed();
    match expr {
        Expr::Add(a, b) => Expr::Add(go(a), go(b)),
        Expr::Sub(a, b) => Expr::Sub(go(a), go(b)),
        Expr::Mul(a, b) => Expr::Mul(go(a), go(b)),
        Expr::Div(a, b) => Expr::Div(go(a), go(b)),
        Expr::Pow(a, b) => Expr::Pow(go(a), go(b)),
        Expr::Neg(a) => Expr::Neg(go(a)),
        other => match other.function_arg() {
            Some(arg) => other.with_function_arg(replace(arg, target, with)),
            None => other.clone(),
        },
    }
}

fn fresh_name(expr: &Expr) -> String {
    let symbols = expr.free_symbols();
    ["u", "v", "w"]
        .into_iter()
        .map(str::to_string)
        .chain((1..).map(|i| format!("u{i}")))
        .find(|name| !symbols.contains(name))
        .unwrap_or_else(|| "u".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    fn p(s: &str) -> Expr {
        parse_expr(s).unwrap()
    }

    #[test]
    fn constant_ratio_of_polynomials_and_functions() {
        assert_eq!(constant_ratio(&p("x"), &p("2*x"), "x"), Some(Expr::constant(1, 2)));
        assert_eq!(constant_ratio(&p("x"), &p("x^2"), "x"), None);
        assert_eq!(
            constant_ratio(&p("6*x^2 + 3"), &p("2*x^2 + 1"), "x"),
            Some(Expr::integer(3))
        );
    }

    #[test]
    fn picks_a_name_not_already_free() {
        assert_eq!(fresh_name(&p("x + u")), "v");
        assert_eq!(fresh_name(&p("x")), "u");
    }

    #[test]
    fn chain_rule_shapes() {
        assert!(integrate(&p("x*exp(x^2)"), "x", 0).is_some());
        assert!(integrate(&p("cos(x)*sin(x)^4"), "x", 0).is_some());
        assert!(integrate(&p("2*x/(x^2 + 3)"), "x", 0).is_some());
        assert!(integrate(&p("x*exp(x)"), "x", 0).is_none());
    }
}
