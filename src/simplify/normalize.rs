//! Product normal form: every product or quotient is flattened to
//! `coeff * base_1^e_1 * ... * base_n^e_n` with one exponent per distinct base, and
//! polynomial factors shared by numerator and denominator are cancelled.

use std::collections::{BTreeMap, BTreeSet};

use crate::expr::{Expr, Rational};
use crate::polynomial::Poly;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::rules::{simplify_add, simplify_fully, simplify_mul, simplify_neg, simplify_pow, simplify_sub};

/// Inputs larger than this are only simplified.
const SIZE_LIMIT: usize = 160;
/// Integer powers of rational constants are folded only up to this exponent.
const FOLD_EXPONENT_LIMIT: u32 = 64;

/// `simplify_fully`, then merge powers and cancel common polynomial factors.
pub fn normalize(expr: Expr) -> Expr {
    let simplified = simplify_fully(expr);
    if simplified.size() > SIZE_LIMIT {
        return simplified;
    }
    simplify_fully(rewrite(simplified))
}

fn rewrite(expr: Expr) -> Expr {
    match expr {
        Expr::Add(a, b) => simplify_add(rewrite(*a), rewrite(*b)),
        Expr::Sub(a, b) => simplify_sub(rewrite(*a), rewrite(*b)),
        Expr::Mul(_, _) | Expr::Div(_, _) => {
            let mut form = ProductForm::default();
            form.absorb(expr, Rational::one());
            form.cancel_polynomials();
            form.into_expr()
        }
        Expr::Pow(base, exp) => simplify_pow(rewrite(*base), rewrite(*exp)),
        Expr::Neg(inner) => simplify_neg(rewrite(*inner)),
        integral @ Expr::Integral { .. } => integral,
        other => match other.function_arg() {
            Some(arg) => other.with_function_arg(rewrite(arg.clone())),
            None => other,
        },
    }
}

/// `coeff * prod(base^exp)`; exponents are never zero.
struct ProductForm {
    coeff: Rational,
    powers: BTreeMap<Expr, Rational>,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            coeff: Rational::one(),
            powers: BTreeMap::new(),
        }
    }
}

impl ProductForm {
    fn absorb(&mut self, factor: Expr, exp: Rational) {
        match factor {
            Expr::Mul(a, b) => {
                self.absorb(*a, exp.clone());
                self.absorb(*b, exp);
            }
            Expr::Div(a, b) => {
                self.absorb(*a, exp.clone());
                self.absorb(*b, -exp);
            }
            Expr::Neg(inner) if exp.is_integer() => {
                if exp.to_integer().is_odd() {
                    self.coeff = -self.coeff.clone();
                }
                self.absorb(*inner, exp);
            }
            Expr::Constant(c) if exp.is_integer() => match fold_power(&c, &exp) {
                Some(value) => self.coeff *= value,
                None => self.insert(Expr::Constant(c), exp),
            },
            // (u^a)^n = u^(a*n) only for integer n
            Expr::Pow(base, inner) if exp.is_integer() => match *inner {
                Expr::Constant(e) => self.absorb(*base, e * exp),
                other => self.insert(Expr::Pow(base, other.boxed()), exp),
            },
            other => self.insert(rewrite(other), exp),
        }
    }

    fn insert(&mut self, base: Expr, exp: Rational) {
        if base.is_one() {
            return;
        }
        let total = self.powers.remove(&base).unwrap_or_else(Rational::zero) + exp;
        if !total.is_zero() {
            self.powers.insert(base, total);
        }
    }

    /// Replace the polynomial bases in each variable by `N/gcd` over `D/gcd`.
    fn cancel_polynomials(&mut self) {
        let symbols: BTreeSet<String> = self
            .powers
            .keys()
            .flat_map(|base| base.free_symbols())
            .collect();
        for var in symbols {
            self.cancel_in(&var);
        }
    }

    fn cancel_in(&mut self, var: &str) {
        let mut numerator = Poly::one();
        let mut denominator = Poly::one();
        let mut used = Vec::new();
        for (base, exp) in &self.powers {
            if !exp.is_integer() || !base.contains_var(var) {
                continue;
            }
            let (Some(poly), Some(power)) = (Poly::from_expr(base, var), exp.to_integer().abs().to_usize())
            else {
                continue;
            };
            if exp.is_positive() {
                numerator = numerator * poly.pow(power);
            } else {
                denominator = denominator * poly.pow(power);
            }
            used.push(base.clone());
        }
        let common = Poly::gcd(&numerator, &denominator);
        if common.degree().unwrap_or(0) == 0 {
            return;
        }
        let (Some(numerator), Some(denominator)) =
            (numerator.div_exact(&common), denominator.div_exact(&common))
        else {
            return;
        };
        for base in used {
            self.powers.remove(&base);
        }
        self.coeff *= numerator.leading_coeff() / denominator.leading_coeff();
        self.insert(numerator.monic().to_expr(var), Rational::one());
        self.insert(denominator.monic().to_expr(var), -Rational::one());
    }

    fn into_expr(self) -> Expr {
        if self.coeff.is_zero() {
            return Expr::Constant(Rational::zero());
        }
        let mut numerator = Expr::Constant(self.coeff);
        let mut denominator: Option<Expr> = None;
        for (base, exp) in self.powers {
            if exp.is_negative() {
                let factor = simplify_pow(base, Expr::Constant(-exp));
                denominator = Some(match denominator {
                    Some(acc) => simplify_mul(acc, factor),
                    None => factor,
                });
            } else {
                numerator = simplify_mul(numerator, simplify_pow(base, Expr::Constant(exp)));
            }
        }
        match denominator {
            Some(den) => Expr::Div(numerator.boxed(), den.boxed()),
            None => numerator,
        }
    }
}

fn fold_power(base: &Rational, exp: &Rational) -> Option<Rational> {
    let k = exp.to_integer();
    let power = k.abs().to_u32().filter(|p| *p <= FOLD_EXPONENT_LIMIT)?;
    if base.is_zero() && k.is_negative() {
        return None;
    }
    let raised = Rational::new(base.numer().pow(power), base.denom().pow(power));
    Some(if k.is_negative() { raised.recip() } else { raised })
}
