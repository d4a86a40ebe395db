//! Expression tree definitions and helpers.

use std::collections::BTreeSet;
use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

pub type Rational = BigRational;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Expr {
    Variable(String),
    Constant(Rational),
    Pi,
    Infinity,
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Sin(Box<Expr>),
    Cos(Box<Expr>),
    Tan(Box<Expr>),
    Asin(Box<Expr>),
    Acos(Box<Expr>),
    Atan(Box<Expr>),
    Exp(Box<Expr>),
    Log(Box<Expr>),
    Abs(Box<Expr>),
    /// An unevaluated integral. `bounds` is `None` for an antiderivative.
    Integral {
        integrand: Box<Expr>,
        var: String,
        bounds: Option<Box<(Expr, Expr)>>,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn constant(num: impl Into<BigInt>, den: impl Into<BigInt>) -> Self {
        Expr::Constant(Rational::new(num.into(), den.into()))
    }

    pub fn integer(value: impl Into<BigInt>) -> Self {
        Expr::Constant(Rational::from_integer(value.into()))
    }

    pub fn rational(value: Rational) -> Self {
        Expr::Constant(value)
    }

    /// Euler's number, represented as `exp(1)`.
    pub fn e() -> Self {
        Expr::Exp(one().boxed())
    }

    pub fn integral(integrand: Expr, var: impl Into<String>, bounds: Option<(Expr, Expr)>) -> Self {
        Expr::Integral {
            integrand: integrand.boxed(),
            var: var.into(),
            bounds: bounds.map(Box::new),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Expr::Constant(r) => Expr::Constant(-r),
            Expr::Neg(inner) => *inner,
            other => Expr::Neg(Box::new(other)),
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Constant(r) if r.is_zero())
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Constant(r) if r.is_one())
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Expr::Integral { .. })
    }

    pub fn as_variable(&self) -> Option<&str> {
        if let Expr::Variable(name) = self {
            Some(name)
        } else {
            None
        }
    }

    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Argument of a single-argument function node (`sin`, `log`, `abs`, ...).
    pub fn function_arg(&self) -> Option<&Expr> {
        match self {
            Expr::Sin(a)
            | Expr::Cos(a)
            | Expr::Tan(a)
            | Expr::Asin(a)
            | Expr::Acos(a)
            | Expr::Atan(a)
            | Expr::Exp(a)
            | Expr::Log(a)
            | Expr::Abs(a) => Some(a),
            _ => None,
        }
    }

    /// Rebuild a function node around a new argument; other nodes are returned unchanged.
    pub fn with_function_arg(&self, arg: Expr) -> Expr {
        match self {
            Expr::Sin(_) => Expr::Sin(arg.boxed()),
            Expr::Cos(_) => Expr::Cos(arg.boxed()),
            Expr::Tan(_) => Expr::Tan(arg.boxed()),
            Expr::Asin(_) => Expr::Asin(arg.boxed()),
            Expr::Acos(_) => Expr::Acos(arg.boxed()),
            Expr::Atan(_) => Expr::Atan(arg.boxed()),
            Expr::Exp(_) => Expr::Exp(arg.boxed()),
            Expr::Log(_) => Expr::Log(arg.boxed()),
            Expr::Abs(_) => Expr::Abs(arg.boxed()),
            other => other.clone(),
        }
    }

    /// Whether `var` occurs free. The integration variable of an integral node is bound.
    pub fn contains_var(&self, var: &str) -> bool {
        match self {
            Expr::Variable(v) => v == var,
            Expr::Constant(_) | Expr::Pi | Expr::Infinity => false,
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                a.contains_var(var) || b.contains_var(var)
            }
            Expr::Neg(inner) => inner.contains_var(var),
            Expr::Integral {
                integrand,
                var: bound,
                bounds,
            } => {
                let in_body = bound != var && integrand.contains_var(var);
                let in_bounds = bounds
                    .as_ref()
                    .map(|b| b.0.contains_var(var) || b.1.contains_var(var))
                    .unwrap_or(false);
                in_body || in_bounds
            }
            other => other
                .function_arg()
                .map(|a| a.contains_var(var))
                .unwrap_or(false),
        }
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_symbols(self, &mut out);
        out
    }

    pub fn size(&self) -> usize {
        match self {
            Expr::Variable(_) | Expr::Constant(_) | Expr::Pi | Expr::Infinity => 1,
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
                1 + a.size() + b.size()
            }
            Expr::Neg(inner) => 1 + inner.size(),
            Expr::Integral {
                integrand, bounds, ..
            } => {
                1 + integrand.size()
                    + bounds.as_ref().map(|b| b.0.size() + b.1.size()).unwrap_or(0)
            }
            other => 1 + other.function_arg().map(Expr::size).unwrap_or(0),
        }
    }
}

fn collect_symbols(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Variable(name) => {
            out.insert(name.clone());
        }
        Expr::Constant(_) | Expr::Pi | Expr::Infinity => {}
        Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) | Expr::Pow(a, b) => {
            collect_symbols(a, out);
            collect_symbols(b, out);
        }
        Expr::Neg(inner) => collect_symbols(inner, out),
        Expr::Integral {
            integrand,
            var,
            bounds,
        } => {
            let mut inner = BTreeSet::new();
            collect_symbols(integrand, &mut inner);
            inner.remove(var);
            out.extend(inner);
            if let Some(b) = bounds {
                collect_symbols(&b.0, out);
                collect_symbols(&b.1, out);
            }
        }
        other => {
            if let Some(arg) = other.function_arg() {
                collect_symbols(arg, out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::format::pretty(self))
    }
}

pub fn zero() -> Expr {
    Expr::Constant(Rational::zero())
}

pub fn one() -> Expr {
    Expr::Constant(Rational::one())
}

pub fn rational(num: i64, den: i64) -> Rational {
    Rational::new(num.into(), den.into())
}

pub fn pow(base: Expr, exp: Expr) -> Expr {
    Expr::Pow(base.boxed(), exp.boxed())
}

pub fn add(a: Expr, b: Expr) -> Expr {
    Expr::Add(a.boxed(), b.boxed())
}

pub fn sub(a: Expr, b: Expr) -> Expr {
    Expr::Sub(a.boxed(), b.boxed())
}

pub fn mul(a: Expr, b: Expr) -> Expr {
    Expr::Mul(a.boxed(), b.boxed())
}

pub fn div(a: Expr, b: Expr) -> Expr {
    Expr::Div(a.boxed(), b.boxed())
}

pub fn neg(a: Expr) -> Expr {
    Expr::Neg(a.boxed())
}
