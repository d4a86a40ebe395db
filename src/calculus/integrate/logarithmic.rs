use crate::expr::Expr;

use super::common::{linear_parts, over};

pub fn is_log(expr: &Expr) -> bool {
    matches!(expr, Expr::Log(_))
}

/// `log(u)` with `u = a*x + b`: `(u*log(u) - u) / a`.
pub fn integrate(expr: &Expr, var: &str) -> Option<Expr> {
    match expr {
        Expr::Log(u) => {
            let (a, _) = linear_parts(u, var)?;
            let u_log = Expr::Mul(u.clone(), Expr::Log(u.clone()).boxed());
            Some(over(Expr::Sub(u_log.boxed(), u.clone()), a))
        }
        _ => None,
    }
}
