//! Script execution
//!
//! One [`ScriptExecutor`] lives for the whole viewer session and runs each
//! submitted script once, synchronously, in a fresh scope. Failures are
//! returned as [`ScriptError`] and never poison the executor.

use rhai::{Engine, EvalAltResult};
use thiserror::Error;

use crate::config::ScriptConfig;
use crate::script::api;
use crate::viewer::state::SharedState;

fn at(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at line {line}, column {column}"),
        (Some(line), None) => format!(" at line {line}"),
        _ => String::new(),
    }
}

/// Script failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// The script does not parse
    #[error("Script syntax error{}: {message}", at(.line, .column))]
    Syntax {
        /// Parser message
        message: String,
        /// 1-based line
        line: Option<usize>,
        /// 1-based column
        column: Option<usize>,
    },

    /// The script raised an error while running
    #[error("Script runtime error{}: {message}", at(.line, .column))]
    Runtime {
        /// Error message, including thrown values
        message: String,
        /// 1-based line
        line: Option<usize>,
        /// 1-based column
        column: Option<usize>,
    },
}

impl ScriptError {
    /// Convert an engine error, splitting off its position
    pub fn from_eval(mut error: EvalAltResult) -> Self {
        let position = error.take_position();
        let (line, column) = (position.line(), position.position());
        match error {
            EvalAltResult::ErrorParsing(kind, _) => Self::Syntax {
                message: kind.to_string(),
                line,
                column,
            },
            other => Self::Runtime {
                message: other.to_string(),
                line,
                column,
            },
        }
    }

    /// Message without position
    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message, .. } | Self::Runtime { message, .. } => message,
        }
    }

    /// Line the error was reported at
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Syntax { line, .. } | Self::Runtime { line, .. } => *line,
        }
    }
}

/// Executor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorState {
    /// Ready for the next script
    #[default]
    Idle,
    /// A script is running
    Executing,
    /// The last script completed
    Succeeded,
    /// The last script failed
    Failed,
}

/// Runs scripts against the session API
pub struct ScriptExecutor {
    engine: Engine,
    state: ExecutorState,
    executed: u64,
}

impl std::fmt::Debug for ScriptExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptExecutor")
            .field("state", &self.state)
            .field("executed", &self.executed)
            .finish_non_exhaustive()
    }
}

impl ScriptExecutor {
    /// Build an engine with the configured limits and the session API
    pub fn new(config: &ScriptConfig, session: &SharedState) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(config.max_operations);
        engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(config.max_array_size);

        api::register(&mut engine, session);

        Self {
            engine,
            state: ExecutorState::Idle,
            executed: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Number of scripts run so far
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Run `source` once in a fresh scope
    pub fn execute(&mut self, source: &str) -> Result<(), ScriptError> {
        self.state = ExecutorState::Executing;
        self.executed += 1;
        log::debug!("Executing script #{} ({} bytes)", self.executed, source.len());

        let mut scope = api::session_scope();
        match self.engine.run_with_scope(&mut scope, source) {
            Ok(()) => {
                self.state = ExecutorState::Succeeded;
                Ok(())
            }
            Err(error) => {
                let error = ScriptError::from_eval(*error);
                log::warn!("{}", error);
                self.state = ExecutorState::Failed;
                Err(error)
            }
        }
    }

    /// Return to `Idle` once the outcome has been handled
    pub fn settle(&mut self) {
        self.state = ExecutorState::Idle;
    }
}
