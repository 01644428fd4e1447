//! Script runtime management
//!
//! Wraps one QuickJS runtime and context. A runtime is created per preview
//! document and dropped when the next document replaces it.

use rquickjs::{Context, Ctx, Function, Runtime, Value};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Upper bound on queued promise jobs drained in one settle pass.
const MAX_JOBS_PER_SETTLE: usize = 100_000;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("QuickJS error: {0}")]
    Engine(#[from] rquickjs::Error),

    /// A JavaScript exception escaped to the top level.
    #[error("{0}")]
    Exception(String),

    #[error("script time budget of {0:?} exceeded")]
    Timeout(Duration),
}

/// Resource limits for one preview document.
#[derive(Debug, Clone, Copy)]
pub struct SandboxLimits {
    pub memory_limit_bytes: usize,
    pub max_stack_bytes: usize,
    /// Wall-clock budget for everything the document runs during a load.
    pub time_budget: Duration,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 16 * 1024 * 1024,
            max_stack_bytes: 512 * 1024,
            time_budget: Duration::from_millis(1000),
        }
    }
}

/// Script execution context
pub struct ScriptRuntime {
    runtime: Runtime,
    pub context: Context,
    budget: Duration,
    deadline: Instant,
}

impl ScriptRuntime {
    pub fn new(limits: SandboxLimits) -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        runtime.set_memory_limit(limits.memory_limit_bytes);
        runtime.set_max_stack_size(limits.max_stack_bytes);

        let deadline = Instant::now() + limits.time_budget;
        runtime.set_interrupt_handler(Some(Box::new(move || Instant::now() >= deadline)));

        let context = Context::full(&runtime)?;
        Ok(Self {
            runtime,
            context,
            budget: limits.time_budget,
            deadline,
        })
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Fails with `ScriptError::Timeout` once the time budget is spent.
    /// Everything run after that point is interrupted anyway.
    pub fn check_budget(&self) -> Result<(), ScriptError> {
        if Instant::now() >= self.deadline {
            return Err(ScriptError::Timeout(self.budget));
        }
        Ok(())
    }

    /// Evaluates a classic script. A thrown exception comes back as
    /// `ScriptError::Exception` with its string form.
    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| match ctx.eval::<(), _>(source) {
            Ok(()) => Ok(()),
            Err(rquickjs::Error::Exception) => Err(ScriptError::Exception(describe(&ctx, ctx.catch()))),
            Err(err) => Err(ScriptError::Engine(err)),
        })
    }

    /// Call a JavaScript function by name with no arguments.
    pub fn call_function(&self, name: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            let func: Function = ctx.globals().get(name)?;
            match func.call::<_, ()>(()) {
                Ok(()) => Ok(()),
                Err(rquickjs::Error::Exception) => {
                    Err(ScriptError::Exception(describe(&ctx, ctx.catch())))
                }
                Err(err) => Err(ScriptError::Engine(err)),
            }
        })
    }

    /// Call a JavaScript function by name with one string argument.
    pub fn call_function_with(&self, name: &str, arg: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            let func: Function = ctx.globals().get(name)?;
            match func.call::<_, ()>((arg.to_string(),)) {
                Ok(()) => Ok(()),
                Err(rquickjs::Error::Exception) => {
                    Err(ScriptError::Exception(describe(&ctx, ctx.catch())))
                }
                Err(err) => Err(ScriptError::Engine(err)),
            }
        })
    }

    /// Call a JavaScript function by name that returns a boolean.
    pub fn call_predicate(&self, name: &str) -> Result<bool, ScriptError> {
        self.context.with(|ctx| {
            let func: Function = ctx.globals().get(name)?;
            match func.call::<_, bool>(()) {
                Ok(value) => Ok(value),
                Err(rquickjs::Error::Exception) => {
                    Err(ScriptError::Exception(describe(&ctx, ctx.catch())))
                }
                Err(err) => Err(ScriptError::Engine(err)),
            }
        })
    }

    /// Runs queued promise jobs until the queue is empty. Returns the string
    /// form of every exception a job threw.
    pub fn run_pending_jobs(&self) -> Vec<String> {
        let mut failures = Vec::new();
        for _ in 0..MAX_JOBS_PER_SETTLE {
            if !self.runtime.is_job_pending() {
                break;
            }
            match self.runtime.execute_pending_job() {
                Ok(true) => {}
                Ok(false) => break,
                Err(_) => failures.push(self.context.with(|ctx| describe(&ctx, ctx.catch()))),
            }
        }
        failures
    }
}

/// String form of a thrown value, as `String(value)` would produce.
pub(crate) fn describe<'js>(ctx: &Ctx<'js>, value: Value<'js>) -> String {
    ctx.globals()
        .get::<_, Function>("String")
        .and_then(|string| string.call::<_, String>((value,)))
        .unwrap_or_else(|_| "uncaught exception".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_is_described() {
        let runtime = ScriptRuntime::new(SandboxLimits::default()).unwrap();
        let err = runtime.execute("null.field").unwrap_err();
        match err {
            ScriptError::Exception(message) => assert!(message.contains("TypeError")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_time_budget_interrupts_loops() {
        let limits = SandboxLimits {
            time_budget: Duration::from_millis(50),
            ..SandboxLimits::default()
        };
        let runtime = ScriptRuntime::new(limits).unwrap();
        assert!(runtime.execute("while (true) {}").is_err());
        assert!(matches!(runtime.check_budget(), Err(ScriptError::Timeout(_))));
    }

    #[test]
    fn test_jobs_run_to_completion() {
        let runtime = ScriptRuntime::new(SandboxLimits::default()).unwrap();
        runtime
            .execute("var done = false; Promise.resolve().then(function () { done = true; });")
            .unwrap();
        assert!(runtime.run_pending_jobs().is_empty());
        runtime.execute("if (!done) throw new Error('jobs did not run');").unwrap();
    }
}
