//! Turns a formula string into an expression tree under the fixed symbol table.

use std::sync::Arc;

use crate::error::{CasError, Result};
use crate::expr::Expr;
use crate::parser::parse_expr;
use crate::symbols::{Binding, SymbolTable};

/// Names that only make sense as call syntax; seeing one bare means the call did not parse.
const RESERVED: &[&str] = &[
    "Integral", "sin", "cos", "tan", "cot", "sec", "csc", "asin", "arcsin", "acos", "arccos",
    "atan", "arctan", "exp", "log", "ln", "sqrt", "abs", "Abs",
];

#[derive(Debug, Clone)]
pub struct Normalizer {
    table: Arc<SymbolTable>,
}

impl Normalizer {
    pub fn new(table: Arc<SymbolTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    /// Parse `input` and resolve every name through the symbol table.
    ///
    /// Any failure is a `CasError::Parse`. An integral node is only produced when the
    /// input is already written as `Integral(...)`.
    pub fn normalize(&self, input: &str) -> Result<Expr> {
        let parsed = parse_expr(input.trim())?;
        self.resolve(parsed)
    }

    fn resolve(&self, expr: Expr) -> Result<Expr> {
        Ok(match expr {
            Expr::Variable(name) => {
                if RESERVED.contains(&name.as_str()) {
                    return Err(CasError::Parse(format!("`{name}` must be called with arguments")));
                }
                self.table.resolve(&name)
            }
            Expr::Add(a, b) => Expr::Add(self.resolve(*a)?.boxed(), self.resolve(*b)?.boxed()),
            Expr::Sub(a, b) => Expr::Sub(self.resolve(*a)?.boxed(), self.resolve(*b)?.boxed()),
            Expr::Mul(a, b) => Expr::Mul(self.resolve(*a)?.boxed(), self.resolve(*b)?.boxed()),
            Expr::Div(a, b) => Expr::Div(self.resolve(*a)?.boxed(), self.resolve(*b)?.boxed()),
            Expr::Pow(a, b) => Expr::Pow(self.resolve(*a)?.boxed(), self.resolve(*b)?.boxed()),
            Expr::Neg(a) => Expr::Neg(self.resolve(*a)?.boxed()),
            Expr::Integral {
                integrand,
                var,
                bounds,
            } => {
                if let Some(Binding::Constant(_)) = self.table.lookup(&var) {
                    return Err(CasError::Parse(format!(
                        "`{var}` is a constant and cannot be an integration variable"
                    )));
                }
                let bounds = match bounds {
                    Some(b) => {
                        let (lower, upper) = *b;
                        Some((self.resolve(lower)?, self.resolve(upper)?))
                    }
                    None => None,
                };
                Expr::integral(self.resolve(*integrand)?, var, bounds)
            }
            other => match other.function_arg() {
                Some(arg) => {
                    let resolved = self.resolve(arg.clone())?;
                    other.with_function_arg(resolved)
                }
                None => other,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{mul, pow, sub};

    fn normalizer() -> Normalizer {
        Normalizer::new(Arc::new(SymbolTable::standard()))
    }

    #[test]
    fn resolves_constants_through_the_table() {
        let n = normalizer();
        assert_eq!(n.normalize("pi - 1").unwrap(), sub(Expr::Pi, Expr::integer(1)));
        assert_eq!(n.normalize("π").unwrap(), Expr::Pi);
        assert_eq!(
            n.normalize("e**x").unwrap(),
            pow(Expr::e(), Expr::var("x"))
        );
        assert_eq!(
            n.normalize("a*x").unwrap(),
            mul(Expr::var("a"), Expr::var("x"))
        );
    }

    #[test]
    fn bare_function_names_are_rejected() {
        let n = normalizer();
        assert!(matches!(n.normalize("Integral(x)"), Err(CasError::Parse(_))));
        assert!(matches!(n.normalize("sin"), Err(CasError::Parse(_))));
    }

    #[test]
    fn constants_cannot_be_integration_variables() {
        let n = normalizer();
        assert!(matches!(
            n.normalize("Integral(x, pi)"),
            Err(CasError::Parse(_))
        ));
    }

    #[test]
    fn infinite_bounds_resolve() {
        let n = normalizer();
        let e = n.normalize("Integral(exp(-x), (x, 0, oo))").unwrap();
        match e {
            Expr::Integral { bounds: Some(b), .. } => assert_eq!(b.1, Expr::Infinity),
            other => panic!("expected integral, got {other:?}"),
        }
    }
}
