//! Floating-point evaluation of expression trees.

use std::collections::BTreeMap;

use num_integer::Integer;
use num_traits::ToPrimitive;

use crate::error::{CasError, Result};
use crate::expr::Expr;
use crate::simplify::simplify;
use crate::symbols::SymbolTable;

/// Even number of Simpson panels used for definite integral nodes.
const SIMPSON_PANELS: usize = 256;

/// Values bound to free symbols during evaluation.
pub type Bindings = BTreeMap<String, f64>;

/// Bind every declared variable of `table` to its sample value, then `var` to `value`.
pub fn sample_bindings(table: &SymbolTable, var: &str, value: f64) -> Bindings {
    let mut bindings: Bindings = table
        .variables()
        .map(|s| (s.name.clone(), s.sample))
        .collect();
    bindings.insert(var.to_string(), value);
    bindings
}

/// Evaluate `expr` under `bindings`.
///
/// Domain violations (`log(-1)`, `1/0`) produce NaN or infinities rather than errors;
/// only structural problems (an unbound symbol, an indefinite integral) are `Err`.
pub fn evaluate(expr: &Expr, bindings: &Bindings) -> Result<f64> {
    let ev = |e: &Expr| evaluate(e, bindings);
    Ok(match expr {
        Expr::Variable(name) => *bindings
            .get(name)
            .ok_or_else(|| CasError::Eval(format!("unbound symbol `{name}`")))?,
        Expr::Constant(c) => c
            .to_f64()
            .ok_or_else(|| CasError::Eval(format!("constant {c} out of range")))?,
        Expr::Pi => std::f64::consts::PI,
        Expr::Infinity => f64::INFINITY,
        Expr::Add(a, b) => ev(a)? + ev(b)?,
        Expr::Sub(a, b) => ev(a)? - ev(b)?,
        Expr::Mul(a, b) => ev(a)? * ev(b)?,
        Expr::Div(a, b) => ev(a)? / ev(b)?,
        Expr::Pow(a, b) => power(ev(a)?, b, ev(b)?),
        Expr::Neg(a) => -ev(a)?,
        Expr::Sin(a) => ev(a)?.sin(),
        Expr::Cos(a) => ev(a)?.cos(),
        Expr::Tan(a) => ev(a)?.tan(),
        Expr::Asin(a) => ev(a)?.asin(),
        Expr::Acos(a) => ev(a)?.acos(),
        Expr::Atan(a) => ev(a)?.atan(),
        Expr::Exp(a) => ev(a)?.exp(),
        Expr::Log(a) => ev(a)?.ln(),
        Expr::Abs(a) => ev(a)?.abs(),
        Expr::Integral {
            integrand,
            var,
            bounds,
        } => match bounds {
            Some(b) => simpson(integrand, var, ev(&b.0)?, ev(&b.1)?, bindings)?,
            None => {
                return Err(CasError::Eval(
                    "an indefinite integral has no numeric value".into(),
                ));
            }
        },
    })
}

/// Real power. An odd-denominator rational exponent takes the real root of a negative base.
fn power(base: f64, exp_expr: &Expr, exp: f64) -> f64 {
    if base < 0.0 {
        if let Expr::Constant(r) = simplify(exp_expr.clone()) {
            if !r.is_integer() && r.denom().is_odd() {
                let magnitude = base.abs().powf(exp);
                return if r.numer().is_odd() { -magnitude } else { magnitude };
            }
        }
    }
    base.powf(exp)
}

fn simpson(integrand: &Expr, var: &str, lower: f64, upper: f64, bindings: &Bindings) -> Result<f64> {
    if !lower.is_finite() || !upper.is_finite() {
        return Err(CasError::Eval("improper integral".into()));
    }
    let h = (upper - lower) / SIMPSON_PANELS as f64;
    let mut scoped = bindings.clone();
    let mut f = |t: f64| -> Result<f64> {
        scoped.insert(var.to_string(), t);
        evaluate(integrand, &scoped)
    };
    let mut sum = f(lower)? + f(upper)?;
    for i in 1..SIMPSON_PANELS {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(lower + h * i as f64)?;
    }
    Ok(sum * h / 3.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use std::sync::Arc;

    fn eval_at(input: &str, x: f64) -> f64 {
        let table = Arc::new(SymbolTable::standard());
        let expr = Normalizer::new(table.clone()).normalize(input).unwrap();
        evaluate(&expr, &sample_bindings(&table, "x", x)).unwrap()
    }

    #[test]
    fn evaluates_elementary_functions() {
        assert!((eval_at("sin(x)^2 + cos(x)^2", 0.7) - 1.0).abs() < 1e-12);
        assert!((eval_at("exp(log(x))", 2.5) - 2.5).abs() < 1e-12);
        assert!((eval_at("pi - 1", 0.0) - (std::f64::consts::PI - 1.0)).abs() < 1e-12);
        assert!((eval_at("a*y", 0.0) - 1.3 * 0.7).abs() < 1e-12);
    }

    #[test]
    fn odd_roots_of_negative_numbers_are_real() {
        assert!((eval_at("x^(1/3)", -8.0) + 2.0).abs() < 1e-12);
        assert!(eval_at("x^(1/2)", -4.0).is_nan());
    }

    #[test]
    fn domain_violations_are_values_not_errors() {
        assert!(eval_at("1/x", 0.0).is_infinite());
        assert!(eval_at("log(x)", -1.0).is_nan());
    }

    #[test]
    fn definite_integrals_use_quadrature() {
        let v = eval_at("Integral(2 - sin(x), (x, 0, pi/2))", 0.0);
        assert!((v - (std::f64::consts::PI - 1.0)).abs() < 1e-9);
    }

    #[test]
    fn structural_problems_are_errors() {
        let table = SymbolTable::standard();
        let b = sample_bindings(&table, "x", 1.0);
        assert!(evaluate(&Expr::var("t"), &b).is_err());
        let indefinite = Expr::integral(Expr::var("x"), "x", None);
        assert!(matches!(evaluate(&indefinite, &b), Err(CasError::Eval(_))));
    }
}
