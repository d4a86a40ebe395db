use crate::calculus::integrate::{AttemptStatus, IntegrationAttempt, IntegrationResult};
use crate::format::expr::pretty;

/// Render an `IntegrationResult` into human-friendly lines.
pub fn pretty_integration_result(result: &IntegrationResult) -> Vec<String> {
    let mut lines = Vec::new();
    match result {
        IntegrationResult::Integrated { result, report } => {
            lines.push(format!("integrated: {}", pretty(result)));
            lines.push(format!("kind: {:?}", report.kind));
        }
        IntegrationResult::NotIntegrable(report) => {
            lines.push("not integrable".to_string());
            lines.push(format!("kind: {:?}", report.kind));
            if let Some(reason) = &report.reason {
                lines.push(format!("reason: {:?}", reason));
            }
        }
    }
    lines.extend(describe_attempts(&result.report().attempts));
    lines
}

/// One `<strategy>: <status>` line per attempt.
pub fn describe_attempts(attempts: &[IntegrationAttempt]) -> Vec<String> {
    attempts.iter().map(describe_attempt).collect()
}

fn describe_attempt(attempt: &IntegrationAttempt) -> String {
    match &attempt.status {
        AttemptStatus::Succeeded => format!("{:?}: ok", attempt.strategy),
        AttemptStatus::NotApplicable => format!("{:?}: n/a", attempt.strategy),
        AttemptStatus::Failed(reason) => format!("{:?}: failed {:?}", attempt.strategy, reason),
        AttemptStatus::HitLimit { size, limit } => {
            format!("{:?}: skipped size {} > limit {}", attempt.strategy, size, limit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculus::integrate;
    use crate::parser::parse_expr;

    #[test]
    fn lists_attempts_after_the_result() {
        let result = integrate("x", &parse_expr("cos(x)").unwrap());
        let lines = pretty_integration_result(&result);
        assert_eq!(lines[0], "integrated: sin(x)");
        assert_eq!(lines.last().map(String::as_str), Some("Direct: ok"));

        let result = integrate("x", &parse_expr("exp(x^2)").unwrap());
        let lines = pretty_integration_result(&result);
        assert_eq!(lines[0], "not integrable");
        assert!(lines.iter().any(|l| l.contains("ExpOfPolynomial")));
    }
}
