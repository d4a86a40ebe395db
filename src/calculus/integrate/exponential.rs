use crate::expr::{Expr, Rational};
use num_traits::{One, Signed};

use super::common::{coeff_of_var, over};

pub fn is_exp(expr: &Expr) -> bool {
    match expr {
        Expr::Exp(_) => true,
        Expr::Pow(base, _) => matches!(&**base, Expr::Constant(_)),
        _ => false,
    }
}

/// `exp(a*x + b)` and `c^(a*x + b)` for a positive constant base `c`.
pub fn integrate(expr: &Expr, var: &str) -> Option<Expr> {
    match expr {
        Expr::Exp(arg) => {
            let k = coeff_of_var(arg, var)?;
            Some(over(Expr::Exp(arg.clone()), k))
        }
        Expr::Pow(base, arg) if !base.contains_var(var) => {
            if let Expr::Constant(c) = &**base {
                if !c.is_positive() || c.is_one() {
                    return None;
                }
            }
            let k = coeff_of_var(arg, var)?;
            let scaled = Expr::Div(expr.clone().boxed(), Expr::Log(base.clone()).boxed());
            Some(over(scaled, k))
        }
        _ => None,
    }
}

/// `exp(a*x + b) * sin(c*x + d)` and the cosine analogue:
/// `e * (a*sin - c*cos) / (a^2 + c^2)` and `e * (a*cos + c*sin) / (a^2 + c^2)`.
pub fn integrate_exp_trig(factors: &[Expr], var: &str) -> Option<Expr> {
    let [first, second] = factors else {
        return None;
    };
    let (exp, trig) = match (first, second) {
        (Expr::Exp(_), other) => (first, other),
        (other, Expr::Exp(_)) => (second, other),
        _ => return None,
    };
    let a = coeff_of_var(exp.function_arg()?, var)?;
    let (trig_arg, is_sin) = match trig {
        Expr::Sin(arg) => (arg, true),
        Expr::Cos(arg) => (arg, false),
        _ => return None,
    };
    let c = coeff_of_var(trig_arg, var)?;
    let sin = Expr::Sin(trig_arg.clone());
    let cos = Expr::Cos(trig_arg.clone());
    let weighted = |k: Rational, e: Expr| Expr::Mul(Expr::Constant(k).boxed(), e.boxed());
    let bracket = if is_sin {
        Expr::Sub(weighted(a.clone(), sin).boxed(), weighted(c.clone(), cos).boxed())
    } else {
        Expr::Add(weighted(a.clone(), cos).boxed(), weighted(c.clone(), sin).boxed())
    };
    let scale = (a.clone() * a + c.clone() * c).recip();
    Some(weighted(scale, Expr::Mul(exp.clone().boxed(), bracket.boxed())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    #[test]
    fn exp_times_trig_needs_affine_arguments() {
        let factors = [parse_expr("exp(x)").unwrap(), parse_expr("sin(x)").unwrap()];
        assert!(integrate_exp_trig(&factors, "x").is_some());
        let factors = [parse_expr("cos(3*x)").unwrap(), parse_expr("exp(2*x + 1)").unwrap()];
        assert!(integrate_exp_trig(&factors, "x").is_some());
        let factors = [parse_expr("exp(x^2)").unwrap(), parse_expr("sin(x)").unwrap()];
        assert!(integrate_exp_trig(&factors, "x").is_none());
        let factors = [parse_expr("exp(x)").unwrap(), parse_expr("tan(x)").unwrap()];
        assert!(integrate_exp_trig(&factors, "x").is_none());
    }
}
