use crate::expr::{Expr, Rational};
use crate::polynomial::Poly;
use num_traits::One;

use super::common::{linear_parts, over};

pub fn is_polynomial(expr: &Expr, var: &str) -> bool {
    Poly::from_expr(expr, var).is_some()
}

/// Term-by-term antiderivative of a rational-coefficient polynomial.
pub fn integrate(expr: &Expr, var: &str) -> Option<Expr> {
    let poly = Poly::from_expr(expr, var)?;
    Some(poly.antiderivative().to_expr(var))
}

/// `(a*x + b)^n` for any constant `n`; `n = -1` gives `log|a*x + b| / a`.
pub fn integrate_affine_power(expr: &Expr, var: &str) -> Option<Expr> {
    let (base, n) = match expr {
        Expr::Pow(base, exp) => match &**exp {
            Expr::Constant(n) => ((**base).clone(), n.clone()),
            _ => return None,
        },
        Expr::Div(num, den) if num.is_one() => match &**den {
            Expr::Pow(base, exp) => match &**exp {
                Expr::Constant(n) => ((**base).clone(), -n.clone()),
                _ => return None,
            },
            other => (other.clone(), -Rational::one()),
        },
        _ => return None,
    };
    let (a, _) = linear_parts(&base, var)?;
    if n == -Rational::one() {
        return Some(over(Expr::Log(Expr::Abs(base.boxed()).boxed()), a));
    }
    let k = n + Rational::one();
    Some(over(
        Expr::Pow(base.boxed(), Expr::Constant(k.clone()).boxed()),
        a * k,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;
    use crate::simplify::simplify_fully;

    fn p(s: &str) -> Expr {
        simplify_fully(parse_expr(s).unwrap())
    }

    #[test]
    fn integrates_polynomials_termwise() {
        let got = integrate(&parse_expr("3*x^2 + 2*x + 1").unwrap(), "x").unwrap();
        assert_eq!(simplify_fully(got), p("x^3 + x^2 + x"));
        assert!(integrate(&parse_expr("sin(x)").unwrap(), "x").is_none());
    }

    #[test]
    fn integrates_affine_powers() {
        let got = integrate_affine_power(&parse_expr("(2*x + 1)^3").unwrap(), "x").unwrap();
        assert_eq!(simplify_fully(got), p("1/8*(2*x + 1)^4"));
        let got = integrate_affine_power(&parse_expr("1/x").unwrap(), "x").unwrap();
        assert_eq!(got, Expr::Log(Expr::Abs(Expr::var("x").boxed()).boxed()));
    }
}
