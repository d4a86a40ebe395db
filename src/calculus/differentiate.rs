use crate::expr::{Expr, Rational, one};
use crate::simplify::{simplify, simplify_add, simplify_sub, substitute};
use num_traits::{One, Zero};

pub fn differentiate(var: &str, expr: &Expr) -> Expr {
    Differentiator { var }.derive(expr)
}

struct Differentiator<'a> {
    var: &'a str,
}

impl<'a> Differentiator<'a> {
    fn derive(&self, expr: &Expr) -> Expr {
        match expr {
            Expr::Variable(name) if name == self.var => Expr::Constant(Rational::one()),
            Expr::Variable(_) | Expr::Constant(_) | Expr::Pi | Expr::Infinity => {
                Expr::Constant(Rational::zero())
            }

            Expr::Add(a, b) => simplify_add(self.derive(a), self.derive(b)),
            Expr::Sub(a, b) => simplify_sub(self.derive(a), self.derive(b)),
            Expr::Mul(a, b) => self.product_rule(a, b),
            Expr::Div(a, b) => self.quotient_rule(a, b),
            Expr::Pow(a, b) => self.power_rule(a, b),
            Expr::Neg(a) => simplify(Expr::Neg(self.derive(a).boxed())),

            Expr::Sin(a) => self.chain_rule(a, |inner| Expr::Cos(inner.boxed())),
            Expr::Cos(a) => simplify(Expr::Neg(
                self.chain_rule(a, |inner| Expr::Sin(inner.boxed())).boxed(),
            )),
            Expr::Tan(a) => self.chain_rule(a, |inner| {
                Expr::Div(one().boxed(), square(Expr::Cos(inner.boxed())).boxed())
            }),
            Expr::Asin(a) => self.chain_rule(a, |inner| {
                Expr::Div(one().boxed(), sqrt(one_minus_square(inner)).boxed())
            }),
            Expr::Acos(a) => simplify(Expr::Neg(
                self.chain_rule(a, |inner| {
                    Expr::Div(one().boxed(), sqrt(one_minus_square(inner)).boxed())
                })
                .boxed(),
            )),
            Expr::Atan(a) => self.chain_rule(a, |inner| {
                Expr::Div(
                    one().boxed(),
                    Expr::Add(one().boxed(), square(inner).boxed()).boxed(),
                )
            }),

            Expr::Exp(a) => self.chain_rule(a, |inner| Expr::Exp(inner.boxed())),
            Expr::Log(a) => simplify(Expr::Div(self.derive(a).boxed(), a.clone().boxed())),
            // d|u| = u/|u| * u', undefined at u = 0
            Expr::Abs(a) => self.chain_rule(a, |inner| {
                Expr::Div(inner.clone().boxed(), Expr::Abs(inner.boxed()).boxed())
            }),

            Expr::Integral {
                integrand,
                var,
                bounds,
            } => self.integral_rule(integrand, var, bounds.as_deref()),
        }
    }

    fn product_rule(&self, a: &Expr, b: &Expr) -> Expr {
        let da = self.derive(a);
        let db = self.derive(b);
        simplify(Expr::Add(
            self.strip_one(Expr::Mul(da.boxed(), b.clone().boxed()))
                .boxed(),
            self.strip_one(Expr::Mul(a.clone().boxed(), db.boxed()))
                .boxed(),
        ))
    }

    fn quotient_rule(&self, a: &Expr, b: &Expr) -> Expr {
        if !b.contains_var(self.var) {
            return simplify(Expr::Div(self.derive(a).boxed(), b.clone().boxed()));
        }
        simplify(Expr::Div(
            Expr::Sub(
                Expr::Mul(self.derive(a).boxed(), b.clone().boxed()).boxed(),
                Expr::Mul(a.clone().boxed(), self.derive(b).boxed()).boxed(),
            )
            .boxed(),
            square(b.clone()).boxed(),
        ))
    }

    fn power_rule(&self, base: &Expr, exp: &Expr) -> Expr {
        if !exp.contains_var(self.var) {
            // n*u^(n-1)*u', for any exponent constant in `var`
            let reduced = match exp {
                Expr::Constant(n) => Expr::Constant(n - Rational::one()),
                other => Expr::Sub(other.clone().boxed(), one().boxed()),
            };
            let db = self.derive(base);
            return simplify(Expr::Mul(
                Expr::Mul(
                    exp.clone().boxed(),
                    Expr::Pow(base.clone().boxed(), reduced.boxed()).boxed(),
                )
                .boxed(),
                db.boxed(),
            ));
        }

        let f = Expr::Pow(base.clone().boxed(), exp.clone().boxed());
        let db = self.derive(exp);
        if !base.contains_var(self.var) {
            // b^v: b^v * log(b) * v'
            return simplify(Expr::Mul(
                Expr::Mul(f.boxed(), Expr::Log(base.clone().boxed()).boxed()).boxed(),
                db.boxed(),
            ));
        }
        let da = self.derive(base);
        simplify(Expr::Mul(
            f.boxed(),
            Expr::Add(
                Expr::Mul(db.boxed(), Expr::Log(base.clone().boxed()).boxed()).boxed(),
                Expr::Div(
                    Expr::Mul(exp.clone().boxed(), da.boxed()).boxed(),
                    base.clone().boxed(),
                )
                .boxed(),
            )
            .boxed(),
        ))
    }

    /// Leibniz rule. The bound variable shadows `self.var` inside the integrand.
    fn integral_rule(&self, integrand: &Expr, bound: &str, bounds: Option<&(Expr, Expr)>) -> Expr {
        match bounds {
            None if bound == self.var => integrand.clone(),
            None => Expr::integral(self.derive(integrand), bound, None),
            Some((lower, upper)) => {
                let at = |point: &Expr| substitute(integrand, bound, point);
                let boundary = Expr::Sub(
                    Expr::Mul(at(upper).boxed(), self.derive(upper).boxed()).boxed(),
                    Expr::Mul(at(lower).boxed(), self.derive(lower).boxed()).boxed(),
                );
                let inside = if bound != self.var && integrand.contains_var(self.var) {
                    Expr::integral(
                        self.derive(integrand),
                        bound,
                        Some((lower.clone(), upper.clone())),
                    )
                } else {
                    Expr::Constant(Rational::zero())
                };
                simplify(Expr::Add(boundary.boxed(), inside.boxed()))
            }
        }
    }

    fn chain_rule<F>(&self, arg: &Expr, outer: F) -> Expr
    where
        F: Fn(Expr) -> Expr,
    {
        let da = self.strip_one(self.derive(arg));
        simplify(Expr::Mul(da.boxed(), outer(arg.clone()).boxed()))
    }

    fn flatten_mul(&self, expr: &Expr) -> Vec<Expr> {
        match expr {
            Expr::Mul(a, b) => {
                let mut out = self.flatten_mul(a);
                out.extend(self.flatten_mul(b));
                out
            }
            other => vec![other.clone()],
        }
    }

    fn strip_one(&self, expr: Expr) -> Expr {
        if !self.contains_one(&expr) {
            return expr;
        }
        self.flatten_mul(&expr)
            .into_iter()
            .filter(|e| !e.is_one())
            .reduce(|a, b| Expr::Mul(a.boxed(), b.boxed()))
            .unwrap_or_else(one)
    }

    fn contains_one(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Mul(a, b) => self.contains_one(a) || self.contains_one(b),
            Expr::Constant(c) => c.is_one(),
            _ => false,
        }
    }
}

fn square(expr: Expr) -> Expr {
    Expr::Pow(expr.boxed(), Expr::integer(2).boxed())
}

fn sqrt(expr: Expr) -> Expr {
    Expr::Pow(expr.boxed(), Expr::constant(1, 2).boxed())
}

fn one_minus_square(expr: Expr) -> Expr {
    Expr::Sub(one().boxed(), square(expr).boxed())
}
