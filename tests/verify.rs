use std::sync::Arc;

use serde_json::json;
use symcheck::{
    candidate_token, clean_latex, Config, Engine, Normalizer, SymbolTable, TaskDescriptor, Verdict, VerifyConfig,
    Verifier, VerifyRequest,
};

fn verifier() -> Verifier {
    Verifier::new(Arc::new(SymbolTable::standard()), VerifyConfig::default())
}

#[test]
fn derivative_of_square_passes() {
    let r = verifier().verify(&TaskDescriptor::new("derivative", "x**2"), "2*x");
    assert!(r.ok);
    assert_eq!(r.verdict, Verdict::Pass);
}

#[test]
fn off_by_one_derivative_fails_with_diagnostics() {
    let r = verifier().verify(&TaskDescriptor::new("derivative", "x**2"), "2*x+1");
    assert!(r.ok);
    assert_eq!(r.verdict, Verdict::Fail);
    let max_abs = r.raw["max_abs"].as_f64().expect("finite max_abs");
    assert!(max_abs > 0.5);
    assert_eq!(r.raw["samples"].as_array().map(Vec::len), Some(5));
}

#[test]
fn empty_answer_is_unknown_without_parsing() {
    for answer in ["", "   ", "\n\t"] {
        let r = verifier().verify(&TaskDescriptor::new("derivative", "((("), answer);
        assert!(r.ok);
        assert_eq!(r.verdict, Verdict::Unknown);
        assert_eq!(r.reason, "empty answer");
        assert!(r.raw.is_empty(), "no parse diagnostics expected: {:?}", r.raw);
    }
}

#[test]
fn cannot_verify_is_never_infrastructure_failure() {
    for task in ["domain", "limit", "partial", "series"] {
        let r = verifier().verify(&TaskDescriptor::new(task, "1/x"), "anything");
        assert!(r.ok, "{task}");
        assert_eq!(r.verdict, Verdict::Unknown, "{task}");
    }
}

#[test]
fn broken_reference_is_infrastructure_failure() {
    let r = verifier().verify(&TaskDescriptor::new("derivative", "x +"), "1");
    assert!(!r.ok);
    assert_eq!(r.verdict, Verdict::Unknown);
    assert!(r.raw.contains_key("trace"));
}

#[test]
fn unknown_symbols_in_the_candidate_fail_evaluation() {
    let r = verifier().verify(&TaskDescriptor::new("derivative", "x**2"), "2*t");
    assert!(!r.ok);
    assert_eq!(r.raw["category"], json!("EvalError"));
}

fn deeply_nested_answer() -> String {
    format!("{}x{}", "(".repeat(100_000), ")".repeat(100_000))
}

#[test]
fn deeply_nested_answer_is_a_parse_error() {
    let r = verifier().verify(&TaskDescriptor::new("derivative", "x**2"), &deeply_nested_answer());
    assert!(!r.ok);
    assert_eq!(r.verdict, Verdict::Unknown);
    assert!(r.reason.starts_with("ParseError:"), "{}", r.reason);
    assert_eq!(r.raw["category"], json!("ParseError"));
}

#[tokio::test]
async fn in_process_verification_survives_deep_nesting() {
    let config = Config::from_lookup(|name| match name {
        "SYMCHECK_ISOLATE_VERIFY" => Some("false".to_string()),
        "SYMCHECK_WORKER_BIN" => Some("/nonexistent/symcheck".to_string()),
        _ => None,
    })
    .unwrap();
    let engine = Engine::new(config);
    let r = engine
        .verify(VerifyRequest {
            plan: TaskDescriptor::new("derivative", "x**2"),
            answer: deeply_nested_answer(),
        })
        .await;
    assert!(!r.ok);
    assert!(r.reason.starts_with("ParseError:"), "{}", r.reason);

    let r = engine
        .verify(VerifyRequest {
            plan: TaskDescriptor::new("derivative", "x**2"),
            answer: "2*x".to_string(),
        })
        .await;
    assert_eq!(r.verdict, Verdict::Pass);
}

#[test]
fn tighter_configuration_is_honoured() {
    let config = VerifyConfig {
        tolerance: 1e-3,
        sample_points: vec![1.0],
    };
    let v = Verifier::new(Arc::new(SymbolTable::standard()), config);
    let r = v.verify(&TaskDescriptor::new("derivative", "x**2"), "2*x + 0.0001");
    assert_eq!(r.verdict, Verdict::Pass);
    assert_eq!(r.reason, "NUM_SAMPLING");
}

#[test]
fn request_json_shape() {
    let request: VerifyRequest = serde_json::from_value(json!({
        "plan": {"task_type": "derivative", "expr_sympy": "sin(x)"},
        "answer": "cos(x)"
    }))
    .unwrap();
    let r = verifier().verify(&request.plan, &request.answer);
    let v = serde_json::to_value(&r).unwrap();
    assert_eq!(v["verdict"], json!("PASS"));
    assert_eq!(v["ok"], json!(true));
}

#[test]
fn latex_fraction_with_nested_root_passes() {
    let r = verifier().verify(
        &TaskDescriptor::new("derivative", "sqrt(x**2 + 1)"),
        "$\\frac{x}{\\sqrt{x^2+1}}$",
    );
    assert!(r.ok, "{r:?}");
    assert_eq!(r.verdict, Verdict::Pass, "{r:?}");
}

#[test]
fn extracted_pi_minus_one_reparses() {
    let token = candidate_token("由牛顿-莱布尼茨公式计算，因此答案为 π - 1。");
    let expr = Normalizer::new(Arc::new(SymbolTable::standard()))
        .normalize(&token)
        .expect("token parses");
    let value = symcheck::evaluate(&expr, &Default::default()).unwrap();
    assert!((value - (std::f64::consts::PI - 1.0)).abs() < 1e-12);
}

#[test]
fn cleaning_is_idempotent_on_assorted_inputs() {
    let inputs = [
        "$\\int_0^{\\frac{\\pi}{2}} (2 - \\sin x)\\,\\mathrm{d}x$",
        "\\left[ \\dfrac{1}{\\sqrt{x}} \\right]",
        "\\lim_{x \\to \\infty} \\tfrac{a}{b}",
        "\\\\\\frac{}{}",
        "π/π{}}{",
        "plain text 答案",
        "$$$$",
        "\\Bigg\\bigg\\Big\\big",
    ];
    for s in inputs {
        let once = clean_latex(s);
        assert_eq!(clean_latex(&once), once, "{s}");
    }
}
