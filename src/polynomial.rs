//! Univariate polynomials with rational coefficients.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::expr::{Expr, Rational};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Largest absolute coefficient (after clearing denominators) for which the rational
/// root search is attempted; beyond it the divisor enumeration gets too expensive.
const ROOT_SEARCH_COEFF_LIMIT: u64 = 1_000_000;

/// Sparse polynomial in one variable: exponent -> nonzero coefficient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Poly {
    coeffs: BTreeMap<usize, Rational>,
}

impl Poly {
    pub fn zero() -> Self {
        Poly {
            coeffs: BTreeMap::new(),
        }
    }

    pub fn one() -> Self {
        Poly::from_constant(Rational::one())
    }

    pub fn from_constant(c: Rational) -> Self {
        let mut coeffs = BTreeMap::new();
        if !c.is_zero() {
            coeffs.insert(0, c);
        }
        Poly { coeffs }
    }

    /// `x`, the identity polynomial.
    pub fn identity() -> Self {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(1, Rational::one());
        Poly { coeffs }
    }

    pub fn degree(&self) -> Option<usize> {
        self.coeffs.keys().next_back().cloned()
    }

    pub fn leading_coeff(&self) -> Rational {
        self.degree()
            .and_then(|d| self.coeffs.get(&d).cloned())
            .unwrap_or_else(Rational::zero)
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.coeffs.len() == 1 && self.coeffs.get(&0).map(|c| c.is_one()).unwrap_or(false)
    }

    pub fn coeff(&self, power: usize) -> Rational {
        self.coeffs
            .get(&power)
            .cloned()
            .unwrap_or_else(Rational::zero)
    }

    pub fn pow(&self, exp: usize) -> Self {
        let mut result = Poly::one();
        let mut base = self.clone();
        let mut n = exp;
        while n > 0 {
            if n % 2 == 1 {
                result = result * base.clone();
            }
            base = base.clone() * base;
            n /= 2;
        }
        result
    }

    pub fn scale(&self, k: &Rational) -> Self {
        if k.is_zero() {
            return Poly::zero();
        }
        Poly {
            coeffs: self
                .coeffs
                .iter()
                .map(|(exp, c)| (*exp, c * k))
                .collect(),
        }
    }

    /// Convert `expr` to a polynomial in `var`. Fails for anything that is not a
    /// polynomial with rational coefficients (other symbols, functions, fractional or
    /// negative powers of the variable, non-constant divisors).
    pub fn from_expr(expr: &Expr, var: &str) -> Option<Self> {
        match expr {
            Expr::Variable(v) if v == var => Some(Poly::identity()),
            Expr::Constant(c) => Some(Poly::from_constant(c.clone())),
            Expr::Add(a, b) => Some(Self::from_expr(a, var)? + Self::from_expr(b, var)?),
            Expr::Sub(a, b) => Some(Self::from_expr(a, var)? - Self::from_expr(b, var)?),
            Expr::Mul(a, b) => Some(Self::from_expr(a, var)? * Self::from_expr(b, var)?),
            Expr::Div(a, b) => {
                let denom = Self::from_expr(b, var)?;
                if denom.degree()? != 0 {
                    return None;
                }
                let c = denom.coeff(0);
                Some(Self::from_expr(a, var)?.scale(&c.recip()))
            }
            Expr::Neg(inner) => Some(-Self::from_expr(inner, var)?),
            Expr::Pow(base, exp) => {
                let power = match &**exp {
                    Expr::Constant(k) if k.is_integer() && !k.is_negative() => {
                        k.to_integer().to_usize()?
                    }
                    _ => return None,
                };
                Some(Self::from_expr(base, var)?.pow(power))
            }
            _ => None,
        }
    }

    /// Termwise antiderivative with zero constant term.
    pub fn antiderivative(&self) -> Self {
        let coeffs = self
            .coeffs
            .iter()
            .map(|(exp, coeff)| {
                let k = Rational::from_integer(BigInt::from(*exp as u64 + 1));
                (exp + 1, coeff / k)
            })
            .collect();
        Poly { coeffs }
    }

    pub fn derivative(&self) -> Self {
        let mut coeffs = BTreeMap::new();
        for (exp, coeff) in &self.coeffs {
            if *exp == 0 {
                continue;
            }
            let factor = Rational::from_integer(BigInt::from(*exp as u64));
            coeffs.insert(exp - 1, coeff * factor);
        }
        Poly { coeffs }
    }

    pub fn monic(&self) -> Self {
        let lc = self.leading_coeff();
        if lc.is_zero() {
            return self.clone();
        }
        self.scale(&lc.recip())
    }

    pub fn evaluate(&self, x: &Rational) -> Rational {
        // Horner from the top degree down
        let Some(top) = self.degree() else {
            return Rational::zero();
        };
        let mut acc = Rational::zero();
        for exp in (0..=top).rev() {
            acc = acc * x + self.coeff(exp);
        }
        acc
    }

    pub fn div_rem(&self, divisor: &Self) -> (Self, Self) {
        let Some(divisor_degree) = divisor.degree() else {
            return (Poly::zero(), self.clone());
        };
        let divisor_lc = divisor.leading_coeff();
        let mut remainder = self.clone();
        let mut quotient = Poly::zero();

        while let Some(r_deg) = remainder.degree() {
            if r_deg < divisor_degree {
                break;
            }
            let mut term = BTreeMap::new();
            term.insert(r_deg - divisor_degree, remainder.leading_coeff() / &divisor_lc);
            let term = Poly { coeffs: term };
            quotient = quotient + term.clone();
            remainder = remainder - term * divisor.clone();
        }

        (quotient, remainder)
    }

    pub fn div_exact(&self, divisor: &Self) -> Option<Self> {
        let (q, r) = self.div_rem(divisor);
        if r.is_zero() {
            Some(q)
        } else {
            None
        }
    }

    pub fn gcd(a: &Poly, b: &Poly) -> Poly {
        let mut r0 = a.clone();
        let mut r1 = b.clone();
        while !r1.is_zero() {
            let (_, r) = r0.div_rem(&r1);
            r0 = r1;
            r1 = r;
        }
        r0.monic()
    }

    pub fn to_expr(&self, var: &str) -> Expr {
        let mut terms: Vec<Expr> = self
            .coeffs
            .iter()
            .map(|(exp, coeff)| {
                if *exp == 0 {
                    return Expr::Constant(coeff.clone());
                }
                let power = if *exp == 1 {
                    Expr::var(var)
                } else {
                    Expr::Pow(Expr::var(var).boxed(), Expr::integer(*exp as u64).boxed())
                };
                if coeff.is_one() {
                    power
                } else {
                    Expr::Mul(Expr::Constant(coeff.clone()).boxed(), power.boxed())
                }
            })
            .collect();
        terms.sort();
        terms
            .into_iter()
            .reduce(|a, b| Expr::Add(a.boxed(), b.boxed()))
            .unwrap_or_else(|| Expr::Constant(Rational::zero()))
    }

    /// Split into (content, primitive part with integer coefficients and positive
    /// leading coefficient).
    pub fn content_and_primitive_part(&self) -> (Rational, Vec<(usize, BigInt)>) {
        if self.is_zero() {
            return (Rational::zero(), Vec::new());
        }
        let mut lcm = BigInt::one();
        for coeff in self.coeffs.values() {
            lcm = lcm.lcm(coeff.denom());
        }
        let scaled: Vec<(usize, BigInt)> = self
            .coeffs
            .iter()
            .map(|(exp, c)| (*exp, (c * Rational::from_integer(lcm.clone())).to_integer()))
            .collect();
        let mut gcd = BigInt::zero();
        for (_, n) in &scaled {
            gcd = gcd.gcd(n);
        }
        let sign = if self.leading_coeff().is_negative() {
            -BigInt::one()
        } else {
            BigInt::one()
        };
        let divisor = &gcd * &sign;
        let primitive = scaled.into_iter().map(|(e, n)| (e, n / &divisor)).collect();
        (Rational::new(divisor, lcm), primitive)
    }

    /// Every distinct rational root, ascending. Returns `None` when the polynomial has
    /// a real root that is not rational or its coefficients are too large to search.
    ///
    /// The zero polynomial has no finite root set and also yields `None`.
    pub fn rational_roots(&self) -> Option<Vec<Rational>> {
        if self.is_zero() {
            return None;
        }
        let mut roots = Vec::new();
        let mut rest = self.clone();

        // factor out x^k first so the constant term is nonzero
        if let Some(&low) = rest.coeffs.keys().next() {
            if low > 0 {
                roots.push(Rational::zero());
                rest = Poly {
                    coeffs: rest.coeffs.into_iter().map(|(e, c)| (e - low, c)).collect(),
                };
            }
        }

        let (_, primitive) = rest.content_and_primitive_part();
        let constant = primitive
            .iter()
            .find(|(e, _)| *e == 0)
            .map(|(_, c)| c.abs())
            .unwrap_or_else(BigInt::zero);
        let leading = primitive
            .last()
            .map(|(_, c)| c.abs())
            .unwrap_or_else(BigInt::one);
        if constant.to_u64()? > ROOT_SEARCH_COEFF_LIMIT || leading.to_u64()? > ROOT_SEARCH_COEFF_LIMIT {
            return None;
        }

        for p in divisors(constant.to_u64()?) {
            for q in divisors(leading.to_u64()?) {
                for sign in [1i64, -1] {
                    let candidate = Rational::new(BigInt::from(p) * sign, BigInt::from(q));
                    if roots.contains(&candidate) {
                        continue;
                    }
                    if rest.evaluate(&candidate).is_zero() {
                        roots.push(candidate);
                    }
                }
            }
        }

        // strip the found linear factors; whatever remains must have no real roots
        let mut remaining = rest;
        for root in &roots {
            if root.is_zero() && remaining.coeff(0) != Rational::zero() {
                continue;
            }
            let linear = Poly::identity() - Poly::from_constant(root.clone());
            while let Some(q) = remaining.div_exact(&linear) {
                remaining = q;
            }
        }
        if remaining.has_real_root() {
            return None;
        }

        roots.sort();
        Some(roots)
    }

    /// Whether the polynomial changes sign or vanishes anywhere on the real line,
    /// decided with a Sturm sequence.
    fn has_real_root(&self) -> bool {
        let degree = match self.degree() {
            Some(d) if d > 0 => d,
            _ => return false,
        };
        if degree % 2 == 1 {
            return true;
        }
        let mut seq = vec![self.clone(), self.derivative()];
        loop {
            let n = seq.len();
            let (_, r) = seq[n - 2].div_rem(&seq[n - 1]);
            if r.is_zero() {
                break;
            }
            seq.push(-r);
        }
        // repeated factors left over are treated as unresolved
        if seq.last().and_then(Poly::degree).unwrap_or(0) > 0 {
            return true;
        }
        let sign_at = |positive: bool| -> usize {
            let signs: Vec<bool> = seq
                .iter()
                .filter(|p| !p.is_zero())
                .map(|p| {
                    let lc_pos = p.leading_coeff().is_positive();
                    let odd = p.degree().unwrap_or(0) % 2 == 1;
                    if positive || !odd { lc_pos } else { !lc_pos }
                })
                .collect();
            signs.windows(2).filter(|w| w[0] != w[1]).count()
        };
        sign_at(false) != sign_at(true)
    }
}

/// Write `expr` as `N/D` with polynomial numerator and denominator in `var`.
pub fn rational_function(expr: &Expr, var: &str) -> Option<(Poly, Poly)> {
    if let Some(p) = Poly::from_expr(expr, var) {
        return Some((p, Poly::one()));
    }
    match expr {
        Expr::Add(a, b) | Expr::Sub(a, b) => {
            let (n1, d1) = rational_function(a, var)?;
            let (n2, d2) = rational_function(b, var)?;
            let right = n2 * d1.clone();
            let numer = if matches!(expr, Expr::Add(_, _)) {
                n1 * d2.clone() + right
            } else {
                n1 * d2.clone() - right
            };
            Some((numer, d1 * d2))
        }
        Expr::Mul(a, b) => {
            let (n1, d1) = rational_function(a, var)?;
            let (n2, d2) = rational_function(b, var)?;
            Some((n1 * n2, d1 * d2))
        }
        Expr::Div(a, b) => {
            let (n1, d1) = rational_function(a, var)?;
            let (n2, d2) = rational_function(b, var)?;
            if n2.is_zero() {
                return None;
            }
            Some((n1 * d2, d1 * n2))
        }
        Expr::Neg(inner) => {
            let (n, d) = rational_function(inner, var)?;
            Some((-n, d))
        }
        Expr::Pow(base, exp) => {
            let k = match &**exp {
                Expr::Constant(k) if k.is_integer() => k.to_integer(),
                _ => return None,
            };
            let (n, d) = rational_function(base, var)?;
            let power: usize = k.abs().to_usize()?;
            if k.is_negative() {
                Some((d.pow(power), n.pow(power)))
            } else {
                Some((n.pow(power), d.pow(power)))
            }
        }
        _ => None,
    }
}

fn divisors(n: u64) -> Vec<u64> {
    if n == 0 {
        return vec![1];
    }
    let mut out = Vec::new();
    let mut i = 1;
    while i * i <= n {
        if n % i == 0 {
            out.push(i);
            if i != n / i {
                out.push(n / i);
            }
        }
        i += 1;
    }
    out
}

impl std::ops::Add for Poly {
    type Output = Poly;
    fn add(self, rhs: Poly) -> Poly {
        let mut coeffs = self.coeffs;
        for (exp, coeff) in rhs.coeffs {
            match coeffs.entry(exp) {
                Entry::Vacant(entry) => {
                    entry.insert(coeff);
                }
                Entry::Occupied(mut entry) => {
                    let updated = entry.get() + coeff;
                    if updated.is_zero() {
                        entry.remove();
                    } else {
                        *entry.get_mut() = updated;
                    }
                }
            }
        }
        Poly { coeffs }
    }
}

impl std::ops::Sub for Poly {
    type Output = Poly;
    fn sub(self, rhs: Poly) -> Poly {
        self + (-rhs)
    }
}

impl std::ops::Mul for Poly {
    type Output = Poly;
    fn mul(self, rhs: Poly) -> Poly {
        let mut coeffs: BTreeMap<usize, Rational> = BTreeMap::new();
        for (exp_a, coeff_a) in &self.coeffs {
            for (exp_b, coeff_b) in &rhs.coeffs {
                let entry = coeffs.entry(exp_a + exp_b).or_insert_with(Rational::zero);
                *entry += coeff_a * coeff_b;
            }
        }
        coeffs.retain(|_, c| !c.is_zero());
        Poly { coeffs }
    }
}

impl std::ops::Neg for Poly {
    type Output = Poly;
    fn neg(self) -> Poly {
        Poly {
            coeffs: self.coeffs.into_iter().map(|(e, c)| (e, -c)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;

    fn poly(input: &str) -> Poly {
        Poly::from_expr(&parse_expr(input).expect("parse"), "x").expect("polynomial")
    }

    fn r(n: i64, d: i64) -> Rational {
        Rational::new(n.into(), d.into())
    }

    #[test]
    fn converts_and_evaluates() {
        let p = poly("(x + 1)^2 - 1");
        assert_eq!(p.degree(), Some(2));
        assert_eq!(p.evaluate(&r(2, 1)), r(8, 1));
        assert!(Poly::from_expr(&parse_expr("x^(1/2)").unwrap(), "x").is_none());
        assert!(Poly::from_expr(&parse_expr("1/x").unwrap(), "x").is_none());
        assert!(Poly::from_expr(&parse_expr("x*y").unwrap(), "x").is_none());
    }

    #[test]
    fn gcd_of_shared_factor() {
        let g = Poly::gcd(&poly("x^2 - 1"), &poly("x^2 + 2*x + 1"));
        assert_eq!(g, poly("x + 1"));
    }

    #[test]
    fn rational_roots_found() {
        assert_eq!(poly("x^2 - 1").rational_roots(), Some(vec![r(-1, 1), r(1, 1)]));
        assert_eq!(poly("2*x - 1").rational_roots(), Some(vec![r(1, 2)]));
        assert_eq!(poly("x^3 - x").rational_roots(), Some(vec![r(-1, 1), r(0, 1), r(1, 1)]));
        assert_eq!(poly("(x - 2)^2").rational_roots(), Some(vec![r(2, 1)]));
        assert_eq!(poly("x^2 + 1").rational_roots(), Some(vec![]));
        assert_eq!(poly("5").rational_roots(), Some(vec![]));
    }

    #[test]
    fn irrational_roots_are_rejected() {
        assert_eq!(poly("x^2 - 2").rational_roots(), None);
        assert_eq!(poly("(x - 1)*(x^2 - 3)").rational_roots(), None);
        assert_eq!(Poly::zero().rational_roots(), None);
    }
}
