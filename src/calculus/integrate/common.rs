use crate::expr::{Expr, Rational};
use crate::polynomial::Poly;
use num_traits::{One, Zero};

/// Split an affine argument `a*var + b` into `(a, b)`; `a` must be nonzero.
pub fn linear_parts(expr: &Expr, var: &str) -> Option<(Rational, Rational)> {
    let poly = Poly::from_expr(expr, var)?;
    if poly.degree()? != 1 {
        return None;
    }
    Some((poly.coeff(1), poly.coeff(0)))
}

/// Coefficient `a` of an affine argument `a*var + b`.
pub fn coeff_of_var(expr: &Expr, var: &str) -> Option<Rational> {
    linear_parts(expr, var).map(|(a, _)| a)
}

/// `body / k`, skipping the division when `k == 1`.
pub fn over(body: Expr, k: Rational) -> Expr {
    if k.is_one() {
        body
    } else {
        Expr::Mul(Expr::Constant(k.recip()).boxed(), body.boxed())
    }
}

/// Flatten a product into its factors; quotients contribute `den^-1` factors.
pub fn product_factors(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Mul(a, b) => {
            let mut out = product_factors(a);
            out.extend(product_factors(b));
            out
        }
        Expr::Div(a, b) if !a.is_one() => {
            let mut out = product_factors(a);
            out.push(Expr::Div(
                Expr::Constant(Rational::one()).boxed(),
                b.clone(),
            ));
            out
        }
        other => vec![other.clone()],
    }
}

pub fn rebuild_product(factors: Vec<Expr>) -> Expr {
    factors
        .into_iter()
        .reduce(|a, b| Expr::Mul(a.boxed(), b.boxed()))
        .unwrap_or_else(|| Expr::Constant(Rational::one()))
}

pub fn is_zero_expr(expr: &Expr) -> bool {
    matches!(expr, Expr::Constant(c) if c.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    #[test]
    fn affine_arguments() {
        let e = parse_expr("3*x - 1").unwrap();
        assert_eq!(
            linear_parts(&e, "x"),
            Some((Rational::from_integer(3.into()), Rational::from_integer((-1).into())))
        );
        assert_eq!(coeff_of_var(&parse_expr("x^2").unwrap(), "x"), None);
        assert_eq!(coeff_of_var(&parse_expr("5").unwrap(), "x"), None);
    }

    #[test]
    fn quotients_split_into_factors() {
        let e = parse_expr("2*x/sin(x)").unwrap();
        assert_eq!(product_factors(&e).len(), 3);
    }
}
