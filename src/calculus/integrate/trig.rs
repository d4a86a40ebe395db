use crate::expr::{Expr, Rational};
use crate::polynomial::Poly;
use crate::simplify::substitute;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::common::{coeff_of_var, over, product_factors};

/// Largest exponent expanded by the power-product rule.
const MAX_TRIG_POWER: usize = 12;
/// Stand-in variable for `sin(u)` or `cos(u)` while a polynomial is integrated.
const PLACEHOLDER: &str = "$t";

pub fn is_trig(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Sin(_) | Expr::Cos(_) | Expr::Tan(_) | Expr::Asin(_) | Expr::Acos(_) | Expr::Atan(_)
    )
}

/// `sin`, `cos`, `tan` and `sec^2` of an affine argument.
pub fn integrate(expr: &Expr, var: &str) -> Option<Expr> {
    match expr {
        Expr::Sin(arg) => {
            let k = coeff_of_var(arg, var)?;
            Some(over(Expr::Neg(Expr::Cos(arg.clone()).boxed()), k))
        }
        Expr::Cos(arg) => {
            let k = coeff_of_var(arg, var)?;
            Some(over(Expr::Sin(arg.clone()), k))
        }
        Expr::Tan(arg) => {
            let k = coeff_of_var(arg, var)?;
            let log_cos = Expr::Log(Expr::Abs(Expr::Cos(arg.clone()).boxed()).boxed());
            Some(over(Expr::Neg(log_cos.boxed()), k))
        }
        Expr::Div(num, den) if num.is_one() => match &**den {
            Expr::Pow(base, exp) if **exp == Expr::integer(2) => {
                match &**base {
                    Expr::Cos(arg) => {
                        let k = coeff_of_var(arg, var)?;
                        Some(over(Expr::Tan(arg.clone()), k))
                    }
                    _ => None,
                }
            }
            _ => None,
        },
        _ => None,
    }
}

/// `sin(u)^m * cos(u)^n` for one affine argument `u = k*x + b`.
///
/// An odd exponent peels off one factor and integrates a polynomial in the other
/// function; two even exponents rewrite `sin^2` as `1 - cos^2` and reduce each cosine
/// power down to `u`.
pub fn integrate_power_product(expr: &Expr, var: &str) -> Option<Expr> {
    let (arg, m, n) = power_product(expr)?;
    if m + n < 2 || m > MAX_TRIG_POWER || n > MAX_TRIG_POWER {
        return None;
    }
    let k = coeff_of_var(&arg, var)?;
    let one_minus_square = Poly::one() - Poly::identity().pow(2);
    let body = if m % 2 == 1 {
        let p = one_minus_square.pow((m - 1) / 2) * Poly::identity().pow(n);
        Expr::Neg(in_terms_of(&p.antiderivative(), Expr::Cos(arg.clone().boxed())).boxed())
    } else if n % 2 == 1 {
        let p = one_minus_square.pow((n - 1) / 2) * Poly::identity().pow(m);
        in_terms_of(&p.antiderivative(), Expr::Sin(arg.clone().boxed()))
    } else {
        let p = one_minus_square.pow(m / 2) * Poly::identity().pow(n);
        even_cosine_powers(&p, &arg)
    };
    Some(over(body, k))
}

/// Common argument and the sine and cosine exponents of a pure product of powers.
fn power_product(expr: &Expr) -> Option<(Expr, usize, usize)> {
    let mut arg: Option<Expr> = None;
    let (mut m, mut n) = (0usize, 0usize);
    for factor in product_factors(expr) {
        let (base, exp) = match &factor {
            Expr::Pow(base, exp) => match &**exp {
                Expr::Constant(c) if c.is_integer() && c > &Rational::from_integer(0.into()) => {
                    ((**base).clone(), c.to_integer().to_usize()?)
                }
                _ => return None,
            },
            other => (other.clone(), 1),
        };
        let (inner, is_sin) = match base {
            Expr::Sin(inner) => (*inner, true),
            Expr::Cos(inner) => (*inner, false),
            _ => return None,
        };
        match &arg {
            Some(existing) if *existing != inner => return None,
            Some(_) => {}
            None => arg = Some(inner),
        }
        if is_sin {
            m += exp;
        } else {
            n += exp;
        }
    }
    Some((arg?, m, n))
}

fn in_terms_of(p: &Poly, replacement: Expr) -> Expr {
    substitute(&p.to_expr(PLACEHOLDER), PLACEHOLDER, &replacement)
}

/// `sum a_j * I_j` with `I_j = ∫ cos(u)^j du` for the even powers in `p`, using
/// `I_j = cos^(j-1) sin / j + (j-1)/j * I_(j-2)` and `I_0 = u`.
fn even_cosine_powers(p: &Poly, arg: &Expr) -> Expr {
    let degree = p.degree().unwrap_or(0);
    let cos = Expr::Cos(arg.clone().boxed());
    let sin = Expr::Sin(arg.clone().boxed());
    let mut reductions = vec![arg.clone()];
    for j in (2..=degree).step_by(2) {
        let j_rat = Rational::from_integer(BigInt::from(j as u64));
        let head = Expr::Mul(
            Expr::Pow(cos.clone().boxed(), Expr::integer(j as u64 - 1).boxed()).boxed(),
            sin.clone().boxed(),
        );
        let previous = reductions[reductions.len() - 1].clone();
        reductions.push(Expr::Add(
            Expr::Mul(Expr::Constant(j_rat.recip()).boxed(), head.boxed()).boxed(),
            Expr::Mul(
                Expr::Constant((j_rat.clone() - Rational::from_integer(1.into())) / j_rat).boxed(),
                previous.boxed(),
            )
            .boxed(),
        ));
    }
    reductions
        .into_iter()
        .enumerate()
        .map(|(i, integral)| (p.coeff(2 * i), integral))
        .filter(|(c, _)| c != &Rational::from_integer(0.into()))
        .map(|(c, integral)| Expr::Mul(Expr::Constant(c).boxed(), integral.boxed()))
        .reduce(|a, b| Expr::Add(a.boxed(), b.boxed()))
        .unwrap_or_else(|| Expr::integer(0))
}
