use crate::expr::{Expr, Rational};
use crate::polynomial::{rational_function, Poly};
use crate::simplify::simplify_pow;
use num_bigint::BigInt;
use num_traits::{One, Zero};

use super::common::linear_parts;

/// Denominators above this degree are left alone.
const MAX_PARTIAL_FRACTION_DEGREE: usize = 12;

/// Whether `expr` is a quotient of polynomials in `var` with a non-constant denominator.
pub fn is_rational(expr: &Expr, var: &str) -> bool {
    match expr {
        Expr::Div(num, den) => {
            Poly::from_expr(num, var).is_some()
                && Poly::from_expr(den, var)
                    .and_then(|d| d.degree())
                    .map(|d| d > 0)
                    .unwrap_or(false)
        }
        _ => false,
    }
}

/// Inverse trig kernels and affine quotients in closed form; any other quotient of
/// polynomials goes through partial fractions.
pub fn integrate(expr: &Expr, var: &str) -> Option<Expr> {
    if let Expr::Div(num, den) = expr {
        if num.is_one() {
            if let Some(kernel) = inverse_trig_kernel(den, var) {
                return Some(kernel);
            }
        }
        if let Some(result) = affine_over_affine(num, den, var) {
            return Some(result);
        }
    }
    let (num, den) = rational_function(expr, var)?;
    if den.degree()? == 0 {
        return None;
    }
    partial_fractions(&num, &den, var)
}

/// `(p*x + q) / (c*x + d) = p/c * x + (q*c - p*d)/c^2 * log|c*x + d|`.
fn affine_over_affine(num: &Expr, den: &Expr, var: &str) -> Option<Expr> {
    let num_poly = Poly::from_expr(num, var)?;
    if num_poly.degree().unwrap_or(0) > 1 {
        return None;
    }
    let (c, d) = linear_parts(den, var)?;
    let p = num_poly.coeff(1);
    let q = num_poly.coeff(0);
    let x = Expr::var(var);
    let slope = Expr::Constant(p.clone() / c.clone());
    let k: Rational = (q * c.clone() - p * d) / (c.clone() * c);
    Some(Expr::Add(
        Expr::Mul(slope.boxed(), x.boxed()).boxed(),
        Expr::Mul(
            Expr::Constant(k).boxed(),
            Expr::Log(Expr::Abs(den.clone().boxed()).boxed()).boxed(),
        )
        .boxed(),
    ))
}

/// Irreducible pieces of a monic denominator.
#[derive(Debug, Clone, PartialEq)]
enum Factor {
    /// `var - root`
    Linear(Rational),
    /// Monic quadratic with no real roots.
    Quadratic(Poly),
}

impl Factor {
    fn poly(&self) -> Poly {
        match self {
            Factor::Linear(root) => Poly::identity() - Poly::from_constant(root.clone()),
            Factor::Quadratic(q) => q.clone(),
        }
    }
}

/// `numerator / factor^power`, where the numerator has lower degree than the factor.
#[derive(Debug, Clone, PartialEq)]
struct PartialFraction {
    factor: Factor,
    power: usize,
    numerator: Poly,
}

fn partial_fractions(num: &Poly, den: &Poly, var: &str) -> Option<Expr> {
    let common = Poly::gcd(num, den);
    let num = num.div_exact(&common)?;
    let den = den.div_exact(&common)?;
    let degree = den.degree()?;
    if degree > MAX_PARTIAL_FRACTION_DEGREE {
        return None;
    }
    let num = num.scale(&den.leading_coeff().recip());
    let den = den.monic();
    if degree == 0 {
        return Some(num.antiderivative().to_expr(var));
    }

    let (quotient, remainder) = num.div_rem(&den);
    let factors = factor_denominator(&den)?;
    let fractions = decompose(&remainder, &den, &factors)?;

    let mut pieces = Vec::new();
    if !quotient.is_zero() {
        pieces.push(quotient.antiderivative().to_expr(var));
    }
    for fraction in &fractions {
        pieces.extend(integrate_fraction(fraction, var));
    }
    Some(
        pieces
            .into_iter()
            .reduce(|a, b| Expr::Add(a.boxed(), b.boxed()))
            .unwrap_or_else(|| Expr::Constant(Rational::zero())),
    )
}

/// Rational roots with multiplicity, plus at most one irreducible quadratic that may
/// appear squared. Anything else (irrational real roots, two distinct quadratics) is
/// out of reach and yields `None`.
fn factor_denominator(den: &Poly) -> Option<Vec<(Factor, usize)>> {
    let square_free = den.div_exact(&Poly::gcd(den, &den.derivative()))?;
    let roots = square_free.rational_roots()?;

    let mut rest = den.clone();
    let mut factors = Vec::new();
    for root in roots {
        let linear = Factor::Linear(root);
        let divisor = linear.poly();
        let mut multiplicity = 0;
        while let Some(q) = rest.div_exact(&divisor) {
            rest = q;
            multiplicity += 1;
        }
        factors.push((linear, multiplicity));
    }

    match rest.degree()? {
        0 => {}
        2 => factors.push((Factor::Quadratic(rest), 1)),
        4 => {
            let q = Poly::gcd(&rest, &rest.derivative());
            if q.degree() != Some(2) || q.pow(2) != rest {
                return None;
            }
            factors.push((Factor::Quadratic(q), 2));
        }
        _ => return None,
    }
    Some(factors)
}

/// Solve `remainder = sum A_k * den / factor^j` for the unknown numerators.
fn decompose(
    remainder: &Poly,
    den: &Poly,
    factors: &[(Factor, usize)],
) -> Option<Vec<PartialFraction>> {
    let n = den.degree()?;
    let mut columns: Vec<Poly> = Vec::with_capacity(n);
    let mut shapes: Vec<(Factor, usize)> = Vec::new();
    for (factor, multiplicity) in factors {
        for power in 1..=*multiplicity {
            let cofactor = den.div_exact(&factor.poly().pow(power))?;
            if let Factor::Quadratic(_) = factor {
                columns.push(cofactor.clone() * Poly::identity());
            }
            columns.push(cofactor);
            shapes.push((factor.clone(), power));
        }
    }
    if columns.len() != n {
        return None;
    }

    let rows = (0..n)
        .map(|row| {
            let mut line: Vec<Rational> = columns.iter().map(|c| c.coeff(row)).collect();
            line.push(remainder.coeff(row));
            line
        })
        .collect();
    let mut solution = solve_linear(rows)?.into_iter();

    let mut fractions = Vec::with_capacity(shapes.len());
    for (factor, power) in shapes {
        let numerator = match factor {
            Factor::Linear(_) => Poly::from_constant(solution.next()?),
            Factor::Quadratic(_) => {
                let b = solution.next()?;
                let c = solution.next()?;
                Poly::identity().scale(&b) + Poly::from_constant(c)
            }
        };
        if !numerator.is_zero() {
            fractions.push(PartialFraction {
                factor,
                power,
                numerator,
            });
        }
    }
    Some(fractions)
}

/// Gauss-Jordan elimination on an augmented `n x (n + 1)` system.
fn solve_linear(mut rows: Vec<Vec<Rational>>) -> Option<Vec<Rational>> {
    let n = rows.len();
    for col in 0..n {
        let pivot = (col..n).find(|&r| !rows[r][col].is_zero())?;
        rows.swap(col, pivot);
        let inv = rows[col][col].recip();
        for value in rows[col].iter_mut() {
            *value = &*value * &inv;
        }
        for r in 0..n {
            if r == col || rows[r][col].is_zero() {
                continue;
            }
            let factor = rows[r][col].clone();
            for c in col..=n {
                let delta = &rows[col][c] * &factor;
                rows[r][c] -= delta;
            }
        }
    }
    Some(rows.into_iter().map(|row| row[n].clone()).collect())
}

fn integrate_fraction(fraction: &PartialFraction, var: &str) -> Vec<Expr> {
    let base = fraction.factor.poly().to_expr(var);
    match &fraction.factor {
        Factor::Linear(_) => {
            let a = fraction.numerator.coeff(0);
            if fraction.power == 1 {
                return vec![scaled(a, Expr::Log(Expr::Abs(base.boxed()).boxed()))];
            }
            let k = Rational::from_integer(BigInt::from(fraction.power as u64 - 1));
            vec![scaled(
                -a / k.clone(),
                Expr::Pow(base.boxed(), Expr::Constant(-k).boxed()),
            )]
        }
        Factor::Quadratic(q) => {
            // with t = x + p/2 and q = t^2 + d, d > 0
            let b = fraction.numerator.coeff(1);
            let c = fraction.numerator.coeff(0);
            let half_p = q.coeff(1) / Rational::from_integer(BigInt::from(2));
            let d = q.coeff(0) - half_p.clone() * half_p.clone();
            let k = c - b.clone() * half_p.clone();
            let half_b = b / Rational::from_integer(BigInt::from(2));
            let t = (Poly::identity() + Poly::from_constant(half_p)).to_expr(var);
            let root_d = simplify_pow(Expr::Constant(d.clone()), Expr::constant(1, 2));
            let arctan = Expr::Div(
                Expr::Atan(Expr::Div(t.clone().boxed(), root_d.clone().boxed()).boxed()).boxed(),
                root_d.boxed(),
            );

            let mut out = Vec::new();
            if fraction.power == 1 {
                if !half_b.is_zero() {
                    out.push(scaled(half_b, Expr::Log(base.boxed())));
                }
                if !k.is_zero() {
                    out.push(scaled(k, arctan));
                }
            } else {
                let two_d = d * Rational::from_integer(BigInt::from(2));
                if !half_b.is_zero() {
                    out.push(scaled(-half_b, Expr::Pow(base.clone().boxed(), Expr::integer(-1).boxed())));
                }
                if !k.is_zero() {
                    let linear = Expr::Div(t.boxed(), base.boxed());
                    let inner = Expr::Add(linear.boxed(), arctan.boxed());
                    out.push(scaled(k / two_d, inner));
                }
            }
            out
        }
    }
}

fn scaled(c: Rational, body: Expr) -> Expr {
    if c.is_one() {
        body
    } else {
        Expr::Mul(Expr::Constant(c).boxed(), body.boxed())
    }
}

fn inverse_trig_kernel(den: &Expr, var: &str) -> Option<Expr> {
    let x = Expr::var(var);
    let x_sq = Poly::identity().pow(2);
    match den {
        Expr::Pow(base, exp) if **exp == Expr::constant(1, 2) => {
            let base = Poly::from_expr(base, var)?;
            if base == Poly::one() - x_sq {
                return Some(Expr::Asin(x.boxed()));
            }
            None
        }
        other => {
            let poly = Poly::from_expr(other, var)?;
            if poly == x_sq + Poly::one() {
                return Some(Expr::Atan(x.boxed()));
            }
            None
        }
    }
}
