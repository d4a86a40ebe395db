//! Request and response types shared by the dispatcher, the verifier, the worker wire
//! format and the HTTP surface.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const EMPTY_EXPR: &str = "EMPTY_EXPR_SYMPY";
pub const LIMIT_UNSUPPORTED: &str = "LIMIT_UNSUPPORTED_IN_V0";
pub const PARSE_NOT_INTEGRAL: &str = "PARSE_NOT_INTEGRAL";
pub const UNSUPPORTED_TASK: &str = "UNSUPPORTED_TASK";
pub const INTEGRATION_FAILED: &str = "INTEGRATION_FAILED";
pub const TIMEOUT: &str = "TIMEOUT";
pub const NO_RESULT: &str = "NO_RESULT";
pub const WORKER_ERR: &str = "WORKER_ERR";

/// Diagnostic key/value pairs attached to every result.
pub type Raw = Map<String, Value>;

/// Kind of symbolic computation requested. Unrecognised names are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    Domain,
    Limit,
    IntegralDefinite,
    IntegralIndefinite,
    Integral,
    Derivative,
    Partial,
    Unknown(String),
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::Domain => "domain",
            TaskType::Limit => "limit",
            TaskType::IntegralDefinite => "integral_definite",
            TaskType::IntegralIndefinite => "integral_indefinite",
            TaskType::Integral => "integral",
            TaskType::Derivative => "derivative",
            TaskType::Partial => "partial",
            TaskType::Unknown(name) => name,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            TaskType::Integral | TaskType::IntegralDefinite | TaskType::IntegralIndefinite
        )
    }
}

impl From<String> for TaskType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "domain" => TaskType::Domain,
            "limit" => TaskType::Limit,
            "integral_definite" => TaskType::IntegralDefinite,
            "integral_indefinite" => TaskType::IntegralIndefinite,
            "integral" => TaskType::Integral,
            "derivative" => TaskType::Derivative,
            "partial" => TaskType::Partial,
            _ => TaskType::Unknown(name),
        }
    }
}

impl From<&str> for TaskType {
    fn from(name: &str) -> Self {
        TaskType::from(name.to_string())
    }
}

impl From<TaskType> for String {
    fn from(task: TaskType) -> Self {
        task.as_str().to_string()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calculus task. `expr_sympy` must already carry the full shape of the problem,
/// e.g. `Integral(f, (x, a, b))` for a definite integral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_type: TaskType,
    #[serde(default, alias = "expr_symbolic")]
    pub expr_sympy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr_latex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_analysis: Option<String>,
}

impl TaskDescriptor {
    pub fn new(task_type: impl Into<TaskType>, expr: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            expr_sympy: expr.into(),
            expr_latex: None,
            notes: None,
            candidate_answer: None,
            candidate_analysis: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    pub ok: bool,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub raw: Raw,
}

impl SolveResult {
    pub fn success(answer: impl Into<String>, analysis: impl Into<String>, raw: Raw) -> Self {
        Self {
            ok: true,
            answer: answer.into(),
            analysis: analysis.into(),
            error: String::new(),
            raw,
        }
    }

    pub fn failure(error: impl Into<String>, raw: Raw) -> Self {
        Self {
            ok: false,
            answer: String::new(),
            analysis: String::new(),
            error: error.into(),
            raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub plan: TaskDescriptor,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Unknown => "UNKNOWN",
        })
    }
}

/// `ok = false` only for infrastructure failures; "cannot verify" is `ok = true` with
/// `Verdict::Unknown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyResult {
    pub ok: bool,
    pub verdict: Verdict,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub raw: Raw,
}

impl VerifyResult {
    pub fn decided(verdict: Verdict, reason: impl Into<String>, raw: Raw) -> Self {
        Self {
            ok: true,
            verdict,
            reason: reason.into(),
            raw,
        }
    }

    pub fn infrastructure(reason: impl Into<String>, raw: Raw) -> Self {
        Self {
            ok: false,
            verdict: Verdict::Unknown,
            reason: reason.into(),
            raw,
        }
    }
}

/// Build a `Raw` map from literal pairs.
#[macro_export]
macro_rules! raw {
    () => { $crate::task::Raw::new() };
    ($($key:literal => $value:expr),+ $(,)?) => {{
        let mut map = $crate::task::Raw::new();
        $( map.insert($key.to_string(), ::serde_json::json!($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_types_round_trip_through_strings() {
        let t: TaskType = serde_json::from_value(json!("integral_definite")).unwrap();
        assert_eq!(t, TaskType::IntegralDefinite);
        let t: TaskType = serde_json::from_value(json!("series")).unwrap();
        assert_eq!(t, TaskType::Unknown("series".into()));
        assert_eq!(serde_json::to_value(&t).unwrap(), json!("series"));
    }

    #[test]
    fn descriptor_accepts_either_expression_field() {
        let d: TaskDescriptor =
            serde_json::from_value(json!({"task_type": "derivative", "expr_symbolic": "x**2"}))
                .unwrap();
        assert_eq!(d.expr_sympy, "x**2");
        let d: TaskDescriptor =
            serde_json::from_value(json!({"task_type": "limit", "expr_sympy": "1/x"})).unwrap();
        assert_eq!(d.task_type, TaskType::Limit);
        assert!(d.notes.is_none());
    }

    #[test]
    fn verdicts_serialize_uppercase() {
        let r = VerifyResult::decided(Verdict::Pass, "SYMBOLIC_ZERO", raw!());
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["verdict"], json!("PASS"));
        assert_eq!(v["ok"], json!(true));
    }
}
