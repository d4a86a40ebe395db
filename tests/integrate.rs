use symcheck::numeric::{evaluate, sample_bindings};
use symcheck::{
    evaluate_integral, integrate, parse_expr, pretty, AttemptStatus, CasError, Expr,
    IntegrandKind, IntegrationResult, NonElementaryKind, ReasonCode, Strategy, SymbolTable,
};

/// Check `F(b) - F(a)` against quadrature of `f` on two intervals inside (0, 1).
fn assert_antiderivative(input: &str) -> Expr {
    let f = parse_expr(input).expect("parse integrand");
    let antiderivative = match integrate("x", &f) {
        IntegrationResult::Integrated { result, .. } => result,
        other => panic!("expected integration of {input}, got {other:?}"),
    };
    let table = SymbolTable::standard();
    let at = |e: &Expr, x: f64| evaluate(e, &sample_bindings(&table, "x", x)).expect("evaluate");
    for (a, b) in [(0.2, 0.5), (0.4, 0.9)] {
        let exact = at(&antiderivative, b) - at(&antiderivative, a);
        let node = Expr::integral(f.clone(), "x", Some((Expr::rational(rat(a)), Expr::rational(rat(b)))));
        let numeric = at(&node, 0.0);
        assert!(
            (exact - numeric).abs() < 1e-8,
            "{input}: F = {antiderivative}, F(b)-F(a) = {exact}, quadrature = {numeric}"
        );
    }
    antiderivative
}

fn rat(v: f64) -> symcheck::Rational {
    symcheck::Rational::from_float(v).expect("finite")
}

#[test]
fn integrates_polynomial_and_rational() {
    assert_antiderivative("x^3");
    assert_antiderivative("3*x^2 - 2*x + 7");
    assert_antiderivative("(2*x+3)/(x+1)");
    assert_antiderivative("1/(x^2 + 1)");
    assert_antiderivative("1/sqrt(1 - x^2)");

    match integrate("x", &parse_expr("x^3").unwrap()) {
        IntegrationResult::Integrated { report, .. } => {
            assert_eq!(report.kind, IntegrandKind::Polynomial);
            assert!(report
                .attempts
                .iter()
                .any(|a| a.strategy == Strategy::Direct && a.status == AttemptStatus::Succeeded));
        }
        other => panic!("expected integration, got {other:?}"),
    }
}

#[test]
fn integrates_affine_trig_exp_log_and_one_over_x() {
    assert_antiderivative("sin(2*x + 3)");
    assert_antiderivative("cos(x/2)");
    assert_antiderivative("tan(x)");
    assert_antiderivative("1/cos(x)^2");
    assert_antiderivative("exp(3*x - 1)");
    assert_antiderivative("2^x");
    assert_antiderivative("log(x)");
    assert_antiderivative("1/x");
    assert_antiderivative("(3*x + 1)^4");
    assert_antiderivative("sqrt(x)");
}

#[test]
fn integrates_by_parts_and_with_constant_factors() {
    assert_antiderivative("x*exp(x)");
    assert_antiderivative("x^2*sin(x)");
    assert_antiderivative("5*x*cos(2*x)");
    assert_antiderivative("a*sin(x)");
}

/// `k*x + c` spelled the way a task would write it.
fn affine(k: i32, c: i32) -> String {
    let head = match k {
        1 => "x".to_string(),
        -1 => "-x".to_string(),
        k => format!("{k}*x"),
    };
    match c {
        0 => head,
        c if c > 0 => format!("{head}+{c}"),
        c => format!("{head}{c}"),
    }
}

#[test]
fn integrates_common_textbook_shapes() {
    for input in [
        "x*log(x)",
        "x*exp(x^2)",
        "1/(x^2-1)",
        "x/(1+x^2)",
        "sin(x)^2",
        "cos(x)^2",
        "sin(x)*cos(x)",
        "exp(x)*sin(x)",
        "1/(x*(x+1))",
        "2*x/(x^2+1)",
        "log(x^2+1)",
    ] {
        assert_antiderivative(input);
    }
}

#[test]
fn rational_family() {
    let numerators = [
        "1", "x", "x^2", "x^3", "x+1", "2*x-1", "x^2+2*x+1", "3*x^2-2*x+5", "x^3-2*x",
        "2*x^3+3*x^2+1",
    ];
    let denominators = [
        "x+1", "x-2", "2*x+1", "3*x-4", "x-3", "x^2+1", "x^2+4", "x^2+2*x+2", "2*x^2+3*x+5",
        "x^2-2*x+5", "(x+1)^2", "(x-2)^3", "(x^2+1)^2",
    ];
    for num in numerators {
        for den in denominators {
            assert_antiderivative(&format!("({num})/({den})"));
        }
    }
}

#[test]
fn exp_trig_family() {
    for a in [-2, -1, 1, 2] {
        for b in [1, 2, 3] {
            for shift in [0, 1] {
                let exp_arg = affine(a, shift);
                let trig_arg = affine(b, 0);
                assert_antiderivative(&format!("exp({exp_arg})*sin({trig_arg})"));
                assert_antiderivative(&format!("exp({exp_arg})*cos({trig_arg})"));
            }
        }
    }
}

#[test]
fn chain_rule_family() {
    for input in [
        "2*x*exp(x^2)",
        "(2*x+1)*exp(x^2+x)",
        "3*(2*x-1)*exp(x^2-x)",
        "(4*x+1)*exp(2*x^2+x)",
        "(6*x-2)*exp(3*x^2-2*x)",
        "5*(4*x+3)*exp(2*x^2+3*x)",
        "cos(x)*sin(x)^4",
        "x*cos(x^2)",
    ] {
        assert_antiderivative(input);
    }
}

#[test]
fn polynomial_times_log_family() {
    for deg in [1, 2, 3, 4] {
        for k in [1, 2] {
            for c in [1, 3] {
                assert_antiderivative(&format!("x^{deg}*log({})", affine(k, c)));
            }
        }
    }
}

#[test]
fn trig_power_family() {
    for power in [2, 3, 4, 5] {
        for k in [1, 2] {
            let arg = affine(k, 0);
            assert_antiderivative(&format!("sin({arg})^{power}"));
            assert_antiderivative(&format!("cos({arg})^{power}"));
        }
    }
    let pairs = [(1, 1), (1, 2), (1, 3), (3, 1), (3, 2), (2, 1), (2, 3), (5, 1), (1, 5), (2, 2)];
    for (m, n) in pairs {
        for k in [1, 2] {
            let arg = affine(k, 0);
            assert_antiderivative(&format!("sin({arg})^{m}*cos({arg})^{n}"));
        }
    }
}

#[test]
fn non_elementary_shapes_are_reported() {
    match integrate("x", &parse_expr("exp(x^2)").unwrap()) {
        IntegrationResult::NotIntegrable(report) => assert_eq!(
            report.reason,
            Some(ReasonCode::NonElementary(NonElementaryKind::ExpOfPolynomial))
        ),
        other => panic!("expected failure, got {other:?}"),
    }
    match integrate("x", &parse_expr("sin(x)/x").unwrap()) {
        IntegrationResult::NotIntegrable(report) => assert_eq!(
            report.kind,
            IntegrandKind::NonElementary(NonElementaryKind::TrigOverArgument)
        ),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn definite_integrals_evaluate_exactly() {
    let f = parse_expr("2 - sin(x)").unwrap();
    let bounds = (Expr::integer(0), Expr::Div(Expr::Pi.boxed(), Expr::integer(2).boxed()));
    match evaluate_integral(&f, "x", Some(&bounds)).unwrap() {
        IntegrationResult::Integrated { result, .. } => assert_eq!(pretty(&result), "pi - 1"),
        other => panic!("expected a value, got {other:?}"),
    }

    let improper = (Expr::integer(0), Expr::Infinity);
    assert!(matches!(
        evaluate_integral(&parse_expr("exp(-x)").unwrap(), "x", Some(&improper)),
        Err(CasError::Unsupported(_))
    ));
}
