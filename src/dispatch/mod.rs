//! Routes a task descriptor to the strategy registered for its task type.

mod strategies;

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

use crate::error::{CasError, Result};
use crate::expr::Expr;
use crate::normalizer::Normalizer;
use crate::raw;
use crate::symbols::SymbolTable;
use crate::task::{SolveResult, TaskDescriptor, TaskType, EMPTY_EXPR};

pub use strategies::{
    DerivativeStrategy, DomainStrategy, IntegralStrategy, LimitStrategy, PartialStrategy,
    UnsupportedStrategy,
};

/// What a strategy sees of the request.
pub struct SolveContext<'a> {
    pub task: &'a TaskDescriptor,
    normalizer: &'a Normalizer,
}

impl<'a> SolveContext<'a> {
    pub fn table(&self) -> &SymbolTable {
        self.normalizer.table()
    }

    /// The variable derivatives, integrals and domains are taken in.
    pub fn var(&self) -> &str {
        self.table().default_var()
    }

    /// Normalize the task's expression. Strategies that do not need it never call this.
    pub fn expr(&self) -> Result<Expr> {
        self.normalizer.normalize(&self.task.expr_sympy)
    }
}

pub trait SolveStrategy: Send + Sync {
    fn solve(&self, ctx: &SolveContext<'_>) -> Result<SolveResult>;
}

pub struct Dispatcher {
    normalizer: Normalizer,
    strategies: HashMap<TaskType, Arc<dyn SolveStrategy>>,
    fallback: Arc<dyn SolveStrategy>,
}

impl Dispatcher {
    /// An empty registry; unregistered task types go to `UnsupportedStrategy`.
    pub fn empty(table: Arc<SymbolTable>) -> Self {
        Self {
            normalizer: Normalizer::new(table),
            strategies: HashMap::new(),
            fallback: Arc::new(UnsupportedStrategy),
        }
    }

    /// Registry with every built-in task type.
    pub fn new(table: Arc<SymbolTable>) -> Self {
        let mut dispatcher = Self::empty(table);
        let integral = Arc::new(IntegralStrategy);
        dispatcher.register(TaskType::Domain, Arc::new(DomainStrategy));
        dispatcher.register(TaskType::Limit, Arc::new(LimitStrategy));
        dispatcher.register(TaskType::Integral, integral.clone());
        dispatcher.register(TaskType::IntegralDefinite, integral.clone());
        dispatcher.register(TaskType::IntegralIndefinite, integral);
        dispatcher.register(TaskType::Derivative, Arc::new(DerivativeStrategy));
        dispatcher.register(TaskType::Partial, Arc::new(PartialStrategy));
        dispatcher
    }

    pub fn register(&mut self, task_type: TaskType, strategy: Arc<dyn SolveStrategy>) {
        self.strategies.insert(task_type, strategy);
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Solve one task. Never panics and never returns an error: every failure is folded
    /// into an `ok = false` result.
    pub fn solve(&self, task: &TaskDescriptor) -> SolveResult {
        if task.expr_sympy.trim().is_empty() {
            return SolveResult::failure(EMPTY_EXPR, raw!());
        }
        let strategy = self
            .strategies
            .get(&task.task_type)
            .unwrap_or(&self.fallback);
        let ctx = SolveContext {
            task,
            normalizer: &self.normalizer,
        };

        let result = match panic::catch_unwind(AssertUnwindSafe(|| strategy.solve(&ctx))) {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => error_result(&err),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                SolveResult::failure(format!("Panic:{message}"), raw!("trace" => message))
            }
        };
        debug!(task_type = %task.task_type, ok = result.ok, error = %result.error, "task dispatched");
        result
    }
}

pub fn error_result(err: &CasError) -> SolveResult {
    SolveResult::failure(
        err.token(),
        raw!("category" => err.category(), "trace" => err.detail()),
    )
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
