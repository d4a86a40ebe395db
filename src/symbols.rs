//! Fixed symbol table used for name resolution during parsing.
//!
//! The table is built once at process start and shared behind an `Arc`. It has no
//! mutation API: a request can read it but never change what `x` or `pi` mean for the
//! next one.

use std::collections::BTreeMap;

use crate::expr::Expr;

/// Declared assumptions on a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Assumptions {
    pub real: bool,
    pub nonzero: bool,
    pub positive: bool,
}

impl Assumptions {
    pub const REAL: Assumptions = Assumptions {
        real: true,
        nonzero: false,
        positive: false,
    };

    pub const REAL_NONZERO: Assumptions = Assumptions {
        real: true,
        nonzero: true,
        positive: false,
    };

    /// Whether a numeric value is consistent with these assumptions.
    pub fn admits(&self, value: f64) -> bool {
        if self.real && !value.is_finite() {
            return false;
        }
        if self.nonzero && value == 0.0 {
            return false;
        }
        if self.positive && value <= 0.0 {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub assumptions: Assumptions,
    /// Value bound to the symbol when an expression is sampled numerically.
    pub sample: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedConstant {
    Pi,
    E,
    Infinity,
}

impl NamedConstant {
    pub fn to_expr(self) -> Expr {
        match self {
            NamedConstant::Pi => Expr::Pi,
            NamedConstant::E => Expr::e(),
            NamedConstant::Infinity => Expr::Infinity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Variable(Symbol),
    Constant(NamedConstant),
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: BTreeMap<String, Binding>,
    default_var: String,
    companion_var: String,
}

impl SymbolTable {
    /// The table used by the solver: `x` real (default variable), `a` real and nonzero,
    /// `y` real (companion variable), constants `pi`, `E`/`e` and `oo`.
    pub fn standard() -> Self {
        let mut entries = BTreeMap::new();
        for symbol in [
            Symbol {
                name: "x".into(),
                assumptions: Assumptions::REAL,
                sample: 0.5,
            },
            Symbol {
                name: "a".into(),
                assumptions: Assumptions::REAL_NONZERO,
                sample: 1.3,
            },
            Symbol {
                name: "y".into(),
                assumptions: Assumptions::REAL,
                sample: 0.7,
            },
        ] {
            entries.insert(symbol.name.clone(), Binding::Variable(symbol));
        }
        entries.insert("pi".into(), Binding::Constant(NamedConstant::Pi));
        entries.insert("E".into(), Binding::Constant(NamedConstant::E));
        entries.insert("e".into(), Binding::Constant(NamedConstant::E));
        entries.insert("oo".into(), Binding::Constant(NamedConstant::Infinity));

        SymbolTable {
            entries,
            default_var: "x".into(),
            companion_var: "y".into(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.entries.get(name)
    }

    /// Resolve a bare name to an expression node. Undeclared names become free symbols.
    pub fn resolve(&self, name: &str) -> Expr {
        match self.entries.get(name) {
            Some(Binding::Constant(c)) => c.to_expr(),
            _ => Expr::Variable(name.to_string()),
        }
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        match self.entries.get(name) {
            Some(Binding::Variable(s)) => Some(s),
            _ => None,
        }
    }

    pub fn default_var(&self) -> &str {
        &self.default_var
    }

    pub fn companion_var(&self) -> &str {
        &self.companion_var
    }

    pub fn variables(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.values().filter_map(|b| match b {
            Binding::Variable(s) => Some(s),
            Binding::Constant(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_declares_expected_names() {
        let table = SymbolTable::standard();
        assert_eq!(table.default_var(), "x");
        assert_eq!(table.companion_var(), "y");
        assert_eq!(table.resolve("pi"), Expr::Pi);
        assert_eq!(table.resolve("e"), Expr::e());
        assert_eq!(table.resolve("E"), Expr::e());
        assert_eq!(table.resolve("oo"), Expr::Infinity);
        assert_eq!(table.resolve("t"), Expr::var("t"));
        let a = table.symbol("a").expect("a declared");
        assert!(a.assumptions.nonzero);
    }

    #[test]
    fn sample_values_respect_assumptions() {
        let table = SymbolTable::standard();
        for symbol in table.variables() {
            assert!(symbol.assumptions.admits(symbol.sample), "{}", symbol.name);
        }
        assert!(!Assumptions::REAL_NONZERO.admits(0.0));
    }
}
