use std::sync::Arc;

use serde_json::json;
use symcheck::{evaluate, Dispatcher, Normalizer, SolveResult, SymbolTable, TaskDescriptor};

fn solve_json(request: serde_json::Value) -> SolveResult {
    let task: TaskDescriptor = serde_json::from_value(request).expect("valid descriptor");
    Dispatcher::new(Arc::new(SymbolTable::standard())).solve(&task)
}

#[test]
fn limit_is_rejected_for_any_expression() {
    for expr in ["sin(x)/x", "(1 + 1/x)^x", "Integral(x, x)", "x +"] {
        let r = solve_json(json!({"task_type": "limit", "expr_sympy": expr}));
        assert!(!r.ok, "{expr}");
        assert_eq!(r.error, "LIMIT_UNSUPPORTED_IN_V0", "{expr}");
    }
}

#[test]
fn definite_integral_requires_integral_shape() {
    let r = solve_json(json!({"task_type": "integral_definite", "expr_sympy": "x**2 + 3*x"}));
    assert!(!r.ok);
    assert_eq!(r.error, "PARSE_NOT_INTEGRAL");
    assert!(r.raw.contains_key("expr"));
}

#[test]
fn bounds_are_never_synthesized_from_notes() {
    let r = solve_json(json!({
        "task_type": "integral_definite",
        "expr_sympy": "2 - sin(x)",
        "expr_latex": "\\int_0^{\\pi/2} (2 - \\sin x) dx",
        "notes": "bounds 0 to pi/2"
    }));
    assert_eq!(r.error, "PARSE_NOT_INTEGRAL");
}

#[test]
fn integral_forms() {
    let r = solve_json(json!({
        "task_type": "integral",
        "expr_symbolic": "Integral(2 - sin(x), (x, 0, pi/2))"
    }));
    assert!(r.ok, "{r:?}");
    assert_eq!(r.answer, "pi - 1");
    assert_eq!(r.raw["value"], json!("pi - 1"));

    let r = solve_json(json!({"task_type": "integral_indefinite", "expr_sympy": "Integral(cos(x), x)"}));
    assert!(r.ok);
    assert_eq!(r.answer, "sin(x)");
}

fn answer_value(r: &SolveResult) -> f64 {
    let expr = Normalizer::new(Arc::new(SymbolTable::standard()))
        .normalize(&r.answer)
        .expect("answer reparses");
    evaluate(&expr, &Default::default()).expect("answer is a number")
}

#[test]
fn textbook_antiderivatives_solve() {
    for integrand in [
        "x*log(x)",
        "x*exp(x^2)",
        "1/(x^2-1)",
        "x/(1+x^2)",
        "sin(x)^2",
        "sin(x)*cos(x)",
        "exp(x)*sin(x)",
        "1/(x*(x+1))",
    ] {
        let r = solve_json(json!({
            "task_type": "integral_indefinite",
            "expr_sympy": format!("Integral({integrand}, x)")
        }));
        assert!(r.ok, "{integrand}: {r:?}");
    }
}

#[test]
fn definite_integrals_through_log_and_trig_powers() {
    let r = solve_json(json!({
        "task_type": "integral_definite",
        "expr_sympy": "Integral(2*x/(x^2+1), (x, 0, 1))"
    }));
    assert!(r.ok, "{r:?}");
    assert_eq!(r.answer, "log(2)");

    let r = solve_json(json!({
        "task_type": "integral_definite",
        "expr_sympy": "Integral(cos(x)^2, (x, 0, pi))"
    }));
    assert!(r.ok, "{r:?}");
    assert!((answer_value(&r) - std::f64::consts::FRAC_PI_2).abs() < 1e-12, "{}", r.answer);
}

#[test]
fn log_of_e_collapses_to_one() {
    let r = solve_json(json!({
        "task_type": "integral_definite",
        "expr_sympy": "Integral(1/x, (x, 1, E))"
    }));
    assert!(r.ok, "{r:?}");
    assert_eq!(r.answer, "1");
}

#[test]
fn empty_expression_token() {
    let r = solve_json(json!({"task_type": "derivative"}));
    assert!(!r.ok);
    assert_eq!(r.error, "EMPTY_EXPR_SYMPY");
}

#[test]
fn derivative_and_partial_answers() {
    let r = solve_json(json!({"task_type": "derivative", "expr_sympy": "x**2"}));
    assert_eq!((r.ok, r.answer.as_str()), (true, "2*x"));
    assert_eq!(r.analysis, "对 x 求导并化简。");

    let r = solve_json(json!({"task_type": "partial", "expr_sympy": "x**3 + y"}));
    assert!(r.ok);
    assert!(r.answer.starts_with("dz/dx="));
    assert!(r.raw.contains_key("dzdx") && r.raw.contains_key("d2"));
}

#[test]
fn domain_answers() {
    let cases = [
        ("sqrt(x - 2)", "[2, oo)"),
        ("1/x", "(-oo, 0) U (0, oo)"),
        ("log(4 - x^2)", "(-2, 2)"),
        ("exp(x)", "R"),
    ];
    for (expr, expected) in cases {
        let r = solve_json(json!({"task_type": "domain", "expr_sympy": expr}));
        assert!(r.ok, "{expr}");
        assert_eq!(r.answer, expected, "{expr}");
    }
}

#[test]
fn unsupported_task_echoes_input() {
    let r = solve_json(json!({"task_type": "taylor", "expr_sympy": "sin(x)"}));
    assert!(!r.ok);
    assert_eq!(r.error, "UNSUPPORTED_TASK");
    assert_eq!(r.raw["task"], json!("taylor"));
    assert_eq!(r.raw["expr"], json!("sin(x)"));
}

#[test]
fn results_serialize_with_every_field() {
    let r = solve_json(json!({"task_type": "limit", "expr_sympy": "1/x"}));
    let v = serde_json::to_value(&r).unwrap();
    for field in ["ok", "answer", "analysis", "error", "raw"] {
        assert!(v.get(field).is_some(), "{field}");
    }
}
