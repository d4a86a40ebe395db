use serde_json::Value;

use super::{SolveContext, SolveStrategy};
use crate::calculus::{differentiate, evaluate_integral, IntegrationResult};
use crate::domain::solve_domain;
use crate::error::Result;
use crate::expr::Expr;
use crate::format::{describe_attempts, pretty};
use crate::raw;
use crate::simplify::simplify_fully;
use crate::task::{
    SolveResult, INTEGRATION_FAILED, LIMIT_UNSUPPORTED, PARSE_NOT_INTEGRAL, UNSUPPORTED_TASK,
};

pub struct DerivativeStrategy;

impl SolveStrategy for DerivativeStrategy {
    fn solve(&self, ctx: &SolveContext<'_>) -> Result<SolveResult> {
        let expr = ctx.expr()?;
        let value = pretty(&simplify_fully(differentiate(ctx.var(), &expr)));
        Ok(SolveResult::success(
            value.clone(),
            "对 x 求导并化简。",
            raw!("value" => value),
        ))
    }
}

/// First and second derivative in the default variable; every other symbol is held
/// constant.
pub struct PartialStrategy;

impl SolveStrategy for PartialStrategy {
    fn solve(&self, ctx: &SolveContext<'_>) -> Result<SolveResult> {
        let expr = ctx.expr()?;
        let first = simplify_fully(differentiate(ctx.var(), &expr));
        let second = simplify_fully(differentiate(ctx.var(), &first));
        let (dzdx, d2) = (pretty(&first), pretty(&second));
        Ok(SolveResult::success(
            format!("dz/dx={dzdx}, d2z/dx2={d2}"),
            "按偏导定义对 x 求导（y 视为常数）。",
            raw!("dzdx" => dzdx, "d2" => d2),
        ))
    }
}

/// Evaluates an expression already written as `Integral(...)`.
pub struct IntegralStrategy;

impl SolveStrategy for IntegralStrategy {
    fn solve(&self, ctx: &SolveContext<'_>) -> Result<SolveResult> {
        let expr = ctx.expr()?;
        let Expr::Integral {
            integrand,
            var,
            bounds,
        } = &expr
        else {
            return Ok(SolveResult::failure(
                PARSE_NOT_INTEGRAL,
                raw!("expr" => pretty(&expr)),
            ));
        };

        match evaluate_integral(integrand, var, bounds.as_deref())? {
            IntegrationResult::Integrated { result, report } => {
                let value = pretty(&result);
                Ok(SolveResult::success(
                    value.clone(),
                    "按积分基本法则计算并化简。",
                    raw!("value" => value, "attempts" => describe_attempts(&report.attempts)),
                ))
            }
            IntegrationResult::NotIntegrable(report) => {
                let mut raw = raw!(
                    "expr" => pretty(&expr),
                    "attempts" => describe_attempts(&report.attempts),
                    "kind" => format!("{:?}", report.kind),
                );
                if let Some(reason) = &report.reason {
                    raw.insert("reason".into(), Value::String(format!("{reason:?}")));
                }
                Ok(SolveResult::failure(INTEGRATION_FAILED, raw))
            }
        }
    }
}

pub struct DomainStrategy;

impl SolveStrategy for DomainStrategy {
    fn solve(&self, ctx: &SolveContext<'_>) -> Result<SolveResult> {
        let expr = ctx.expr()?;
        let outcome = solve_domain(&expr, ctx.var());
        let conds: Vec<String> = outcome.conditions.iter().map(|c| c.to_string()).collect();
        if outcome.fallback {
            return Ok(SolveResult::success(
                outcome.answer,
                "定义域需满足根号内≥0且分母≠0。",
                raw!("conds" => conds, "fallback" => true),
            ));
        }
        Ok(SolveResult::success(
            outcome.answer.clone(),
            "定义域为使表达式有意义的实数集合。",
            raw!("domain" => outcome.answer, "conds" => conds, "fallback" => false),
        ))
    }
}

/// Limits are not computed. The expression is echoed for diagnostics when it parses.
pub struct LimitStrategy;

impl SolveStrategy for LimitStrategy {
    fn solve(&self, ctx: &SolveContext<'_>) -> Result<SolveResult> {
        Ok(SolveResult::failure(
            LIMIT_UNSUPPORTED,
            raw!("expr" => echo_expr(ctx)),
        ))
    }
}

pub struct UnsupportedStrategy;

impl SolveStrategy for UnsupportedStrategy {
    fn solve(&self, ctx: &SolveContext<'_>) -> Result<SolveResult> {
        Ok(SolveResult::failure(
            UNSUPPORTED_TASK,
            raw!("task" => ctx.task.task_type.as_str(), "expr" => echo_expr(ctx)),
        ))
    }
}

fn echo_expr(ctx: &SolveContext<'_>) -> String {
    match ctx.expr() {
        Ok(expr) => pretty(&expr),
        Err(_) => ctx.task.expr_sympy.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::dispatch::Dispatcher;
    use crate::symbols::SymbolTable;
    use crate::task::{SolveResult, TaskDescriptor};

    fn solve(task: &str, expr: &str) -> SolveResult {
        Dispatcher::new(Arc::new(SymbolTable::standard())).solve(&TaskDescriptor::new(task, expr))
    }

    #[test]
    fn derivative_of_a_square() {
        let r = solve("derivative", "x**2");
        assert!(r.ok);
        assert_eq!(r.answer, "2*x");
        assert_eq!(r.raw["value"], json!("2*x"));
    }

    #[test]
    fn partial_holds_y_constant() {
        let r = solve("partial", "x^2*y");
        assert!(r.ok, "{r:?}");
        assert_eq!(r.raw["d2"], json!("2*y"));
        assert!(r.answer.starts_with("dz/dx="));
    }

    #[test]
    fn integrals_need_an_integral_node() {
        let r = solve("integral_definite", "x**2 + 1");
        assert!(!r.ok);
        assert_eq!(r.error, "PARSE_NOT_INTEGRAL");

        let r = solve("integral_definite", "Integral(2 - sin(x), (x, 0, pi/2))");
        assert!(r.ok, "{r:?}");
        assert_eq!(r.answer, "pi - 1");
    }

    #[test]
    fn improper_and_non_elementary_integrals_fail() {
        let r = solve("integral", "Integral(exp(-x), (x, 0, oo))");
        assert_eq!(r.error, "Unsupported:improper integral");
        let r = solve("integral_indefinite", "Integral(exp(x^2), x)");
        assert_eq!(r.error, "INTEGRATION_FAILED");
        assert!(r.raw.contains_key("attempts"));
    }

    #[test]
    fn limit_is_never_computed() {
        for expr in ["sin(x)/x", "1/x", "((("] {
            let r = solve("limit", expr);
            assert!(!r.ok);
            assert_eq!(r.error, "LIMIT_UNSUPPORTED_IN_V0");
        }
    }

    #[test]
    fn unknown_types_echo_their_name() {
        let r = solve("series", "x + 1");
        assert_eq!(r.error, "UNSUPPORTED_TASK");
        assert_eq!(r.raw["task"], json!("series"));
        assert_eq!(r.raw["expr"], json!("x + 1"));
    }

    #[test]
    fn domain_primary_and_fallback() {
        let r = solve("domain", "1/(x - 1)");
        assert!(r.ok);
        assert_eq!(r.answer, "(-oo, 1) U (1, oo)");
        let r = solve("domain", "sqrt(x^2 - 2)");
        assert!(r.ok);
        assert_eq!(r.answer, "R (需满足根号与分母约束)");
        assert_eq!(r.raw["fallback"], json!(true));
    }
}
