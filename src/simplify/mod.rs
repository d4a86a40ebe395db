//! Rewriting passes over `Expr`: the rule-based simplifier, the product normal form
//! used by the integrator, and variable substitution.

mod normalize;
mod rules;
mod substitute;

pub use normalize::normalize;
pub use rules::{
    simplify, simplify_add, simplify_fully, simplify_mul, simplify_neg, simplify_pow,
    simplify_sub, simplify_with_limit,
};
pub use substitute::substitute;
