#![cfg(unix)]

use std::time::{Duration, Instant};

use symcheck::{
    Config, Engine, Harness, HarnessConfig, TaskDescriptor, Verdict, VerifyConfig, VerifyRequest,
    WorkerOutcome, WorkerRequest, WorkerResponse,
};

fn real_worker() -> Harness {
    let mut config = HarnessConfig::for_binary(env!("CARGO_BIN_EXE_symcheck"));
    config.solve_timeout = Duration::from_secs(10);
    Harness::new(config)
}

fn shell_worker(script: &str, timeout: Duration) -> Harness {
    Harness::new(HarnessConfig {
        worker_bin: "/bin/sh".into(),
        worker_args: vec!["-c".into(), script.into()],
        solve_timeout: timeout,
        kill_grace: Duration::from_millis(500),
    })
}

#[tokio::test]
async fn real_worker_round_trip() {
    let r = real_worker()
        .solve(&TaskDescriptor::new("derivative", "x**2"))
        .await;
    assert!(r.ok, "{r:?}");
    assert_eq!(r.answer, "2*x");

    let r = real_worker()
        .solve(&TaskDescriptor::new("limit", "sin(x)/x"))
        .await;
    assert_eq!(r.error, "LIMIT_UNSUPPORTED_IN_V0");
}

#[tokio::test]
async fn deadline_kills_the_worker_and_reports_timeout() {
    let timeout = Duration::from_millis(300);
    let harness = shell_worker("exec sleep 30", timeout);
    let started = Instant::now();
    let r = harness.solve(&TaskDescriptor::new("derivative", "x")).await;
    let elapsed = started.elapsed();
    assert!(!r.ok);
    assert_eq!(r.error, "TIMEOUT");
    assert!(r.answer.is_empty());
    assert!(elapsed < timeout + Duration::from_secs(2), "took {elapsed:?}");

    // the service keeps working for the next request
    let r = real_worker()
        .solve(&TaskDescriptor::new("derivative", "x**3"))
        .await;
    assert!(r.ok, "{r:?}");
}

#[tokio::test]
async fn runaway_computation_in_a_real_worker_times_out() {
    let harness = Harness::new(HarnessConfig::for_binary(env!("CARGO_BIN_EXE_symcheck")));
    let deadline = harness.config().solve_timeout;
    assert_eq!(deadline, HarnessConfig::DEFAULT_SOLVE_TIMEOUT);

    let started = Instant::now();
    let r = harness
        .solve(&TaskDescriptor::new("derivative", "x*3^(900000000)"))
        .await;
    let elapsed = started.elapsed();
    assert!(!r.ok, "{r:?}");
    assert_eq!(r.error, "TIMEOUT");
    assert!(elapsed >= deadline, "returned before the deadline: {elapsed:?}");
    assert!(elapsed < deadline + Duration::from_secs(3), "took {elapsed:?}");

    let r = harness.solve(&TaskDescriptor::new("derivative", "x**2")).await;
    assert!(r.ok, "{r:?}");
    assert_eq!(r.answer, "2*x");
}

#[tokio::test]
async fn silent_exit_is_no_result() {
    let harness = shell_worker("cat > /dev/null; exit 3", Duration::from_secs(5));
    let r = harness.solve(&TaskDescriptor::new("derivative", "x")).await;
    assert_eq!((r.ok, r.error.as_str()), (false, "NO_RESULT"));

    let harness = shell_worker("echo not-json", Duration::from_secs(5));
    let r = harness.solve(&TaskDescriptor::new("derivative", "x")).await;
    assert_eq!(r.error, "NO_RESULT");
}

#[tokio::test]
async fn missing_binary_is_worker_error() {
    let harness = Harness::new(HarnessConfig::for_binary("/nonexistent/symcheck-worker"));
    let outcome = harness
        .run(&WorkerRequest::Solve {
            task: TaskDescriptor::new("derivative", "x"),
        })
        .await;
    assert!(matches!(outcome, WorkerOutcome::Failed(_)));
    let r = harness.solve(&TaskDescriptor::new("derivative", "x")).await;
    assert!(r.error.starts_with("WORKER_ERR:"), "{}", r.error);
}

#[tokio::test]
async fn verification_timeouts_are_unknown_not_failures() {
    let harness = shell_worker("exec sleep 30", Duration::from_millis(200));
    let r = harness
        .verify(
            &TaskDescriptor::new("derivative", "x**2"),
            "2*x",
            &VerifyConfig::default(),
        )
        .await;
    assert!(r.ok);
    assert_eq!(r.verdict, Verdict::Unknown);
    assert_eq!(r.reason, "TIMEOUT");
}

#[tokio::test]
async fn worker_verifies_in_isolation() {
    let harness = real_worker();
    let outcome = harness
        .run(&WorkerRequest::Verify {
            plan: TaskDescriptor::new("derivative", "x**2"),
            answer: "2*x + 1".into(),
            settings: VerifyConfig::default(),
        })
        .await;
    match outcome {
        WorkerOutcome::Completed(WorkerResponse::Verify(r)) => {
            assert_eq!(r.verdict, Verdict::Fail)
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn engine_runs_both_operations_through_workers() {
    let bin = env!("CARGO_BIN_EXE_symcheck");
    let config = Config::from_lookup(|name| match name {
        "SYMCHECK_WORKER_BIN" => Some(bin.to_string()),
        "SYMCHECK_SOLVE_TIMEOUT_MS" => Some("10000".to_string()),
        _ => None,
    })
    .unwrap();
    let engine = Engine::new(config);

    let r = engine
        .solve_task(TaskDescriptor::new(
            "integral_definite",
            "Integral(2 - sin(x), (x, 0, pi/2))",
        ))
        .await;
    assert_eq!(r.answer, "pi - 1");

    let r = engine
        .verify(VerifyRequest {
            plan: TaskDescriptor::new("derivative", "x**2"),
            answer: "2*x".into(),
        })
        .await;
    assert_eq!((r.ok, r.verdict), (true, Verdict::Pass));

    let r = engine
        .verify(VerifyRequest {
            plan: TaskDescriptor::new("derivative", "x**2"),
            answer: String::new(),
        })
        .await;
    assert_eq!(r.verdict, Verdict::Unknown);
    assert_eq!(r.reason, "empty answer");
}
