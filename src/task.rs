//! Orchestrator boundary: self-contained units of work.
//!
//! An external scheduler hands the engine an endpoint, an operation kind,
//! and a payload; it gets back a structured report with a tri-state status —
//! `ok` (nothing needed changing), `changed` (a commit was applied), or
//! `failed`. Errors never escape [`run_operation`]: every failure is folded
//! into the report with the taxonomy kind and the literal device text, so
//! callers can tell a syntax problem from a timeout from a corrupted
//! session.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::driver::{
    ChangeSet, CommandBatch, CommandResult, Session, SessionConfig, TransactionStatus,
};
use crate::error::{Error, Result};
use crate::transport::{SshConfig, SshShell, Transport};

/// Read-only batch used by fact gathering. Callers parse the text
/// themselves; the engine guarantees only stripped raw output per command.
pub const FACTS_COMMANDS: &[&str] = &["show version", "show interface brief"];

/// The unit-of-work kinds an orchestrator can request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum Operation {
    /// Run arbitrary operational-mode commands and return their output.
    ExecuteCommands(Vec<String>),

    /// Apply a set/delete statement list transactionally.
    ApplyChangeset(ChangeSet),

    /// Run the fact-gathering reference batch.
    GatherFacts,
}

/// Tri-state task result, driving the caller's run-again and
/// idempotency-verification logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// The operation succeeded without modifying the device.
    Ok,

    /// A configuration change was committed.
    Changed,

    /// The operation failed; `message` carries the diagnostics.
    Failed,
}

/// Structured result of one unit of work.
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    /// Overall status.
    pub status: TaskStatus,

    /// Ordered per-command text results.
    pub results: Vec<CommandResult>,

    /// Diagnostic message, present when failed.
    pub message: Option<String>,
}

impl TaskReport {
    fn ok(results: Vec<CommandResult>) -> Self {
        Self {
            status: TaskStatus::Ok,
            results,
            message: None,
        }
    }

    fn changed(results: Vec<CommandResult>) -> Self {
        Self {
            status: TaskStatus::Changed,
            results,
            message: None,
        }
    }

    fn failed(results: Vec<CommandResult>, message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Failed,
            results,
            message: Some(message.into()),
        }
    }

    fn from_error(err: Error) -> Self {
        let message = err.to_string();
        let results = match err {
            // Keep the partial result sequence the batch produced
            Error::Command(e) => e.results,
            _ => Vec::new(),
        };
        Self::failed(results, message)
    }
}

/// Execute one unit of work against one device endpoint.
///
/// Opens a fresh session, dispatches the operation, closes the session, and
/// folds any error into the report.
pub async fn run_operation(config: SshConfig, operation: Operation) -> TaskReport {
    run_operation_with(config, operation, SessionConfig::default()).await
}

/// [`run_operation`] with explicit session tuning.
pub async fn run_operation_with(
    config: SshConfig,
    operation: Operation,
    session_config: SessionConfig,
) -> TaskReport {
    let session = async {
        let shell = SshShell::connect(config).await?;
        Session::open_with(shell, session_config).await
    }
    .await;

    let mut session = match session {
        Ok(s) => s,
        Err(e) => return TaskReport::from_error(e),
    };

    let report = match dispatch(&mut session, operation).await {
        Ok(report) => report,
        Err(e) => TaskReport::from_error(e),
    };

    if session.is_usable() {
        if let Err(e) = session.close().await {
            debug!("session close failed: {}", e);
        }
    }

    report
}

/// Dispatch an operation on an open session. Usable with any transport,
/// which is how the engine tests drive it.
pub(crate) async fn dispatch<T: Transport>(
    session: &mut Session<T>,
    operation: Operation,
) -> Result<TaskReport> {
    match operation {
        Operation::ExecuteCommands(commands) => {
            let batch = CommandBatch::from(commands);
            let results = session.run(&batch).await?;
            Ok(TaskReport::ok(results))
        }

        Operation::GatherFacts => {
            let batch: CommandBatch = FACTS_COMMANDS.into();
            let results = session.run(&batch).await?;
            Ok(TaskReport::ok(results))
        }

        Operation::ApplyChangeset(changes) => {
            let outcome = session.apply(&changes).await?;
            Ok(match outcome.status {
                TransactionStatus::Unchanged => TaskReport::ok(outcome.results),
                TransactionStatus::Committed => TaskReport::changed(outcome.results),
                TransactionStatus::RolledBack => TaskReport::failed(
                    outcome.results,
                    outcome
                        .diagnostics
                        .unwrap_or_else(|| "commit rolled back".to_string()),
                ),
            })
        }
    }
}
