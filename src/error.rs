use thiserror::Error;

pub type Result<T> = std::result::Result<T, CasError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CasError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("evaluation error: {0}")]
    Eval(String),
}

impl CasError {
    /// Short category name used in error tokens (`ParseError:<detail>`).
    pub fn category(&self) -> &'static str {
        match self {
            CasError::Parse(_) => "ParseError",
            CasError::Unsupported(_) => "Unsupported",
            CasError::Eval(_) => "EvalError",
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            CasError::Parse(d) | CasError::Unsupported(d) | CasError::Eval(d) => d,
        }
    }

    /// Render as `<Category>:<detail>`.
    pub fn token(&self) -> String {
        format!("{}:{}", self.category(), self.detail())
    }
}
