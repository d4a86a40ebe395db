use crate::expr::Expr;

/// Substitute variable `var` with `replacement` throughout `expr`.
///
/// An integral over `var` binds it: the integrand is left alone, only the bounds are
/// rewritten.
pub fn substitute(expr: &Expr, var: &str, replacement: &Expr) -> Expr {
    let go = |e: &Expr| substitute(e, var, replacement).boxed();
    match expr {
        Expr::Variable(name) if name == var => replacement.clone(),
        Expr::Add(a, b) => Expr::Add(go(a), go(b)),
        Expr::Sub(a, b) => Expr::Sub(go(a), go(b)),
        Expr::Mul(a, b) => Expr::Mul(go(a), go(b)),
        Expr::Div(a, b) => Expr::Div(go(a), go(b)),
        Expr::Pow(a, b) => Expr::Pow(go(a), go(b)),
        Expr::Neg(a) => Expr::Neg(go(a)),
        Expr::Integral {
            integrand,
            var: bound_var,
            bounds,
        } => {
            let integrand = if bound_var == var {
                (**integrand).clone()
            } else {
                substitute(integrand, var, replacement)
            };
            let bounds = bounds.as_ref().map(|b| {
                (
                    substitute(&b.0, var, replacement),
                    substitute(&b.1, var, replacement),
                )
            });
            Expr::integral(integrand, bound_var.clone(), bounds)
        }
        other => match other.function_arg() {
            Some(arg) => other.with_function_arg(substitute(arg, var, replacement)),
            None => other.clone(),
        },
    }
}
