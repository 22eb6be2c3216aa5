//! Result types for command execution and transactions.

use serde::Serialize;

/// An ordered batch of commands. Order is significant and preserved in
/// execution and in the result sequence.
#[derive(Debug, Clone, Default)]
pub struct CommandBatch(Vec<String>);

impl CommandBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a command.
    pub fn push(&mut self, command: impl Into<String>) {
        self.0.push(command.into());
    }

    /// Number of commands in the batch.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the commands in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for CommandBatch {
    fn from(commands: Vec<String>) -> Self {
        Self(commands)
    }
}

impl<'a> From<&'a [&'a str]> for CommandBatch {
    fn from(commands: &'a [&'a str]) -> Self {
        Self(commands.iter().map(|c| c.to_string()).collect())
    }
}

impl FromIterator<String> for CommandBatch {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of one command within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    /// Command completed without a device error marker.
    Ok,

    /// The device reported an error marker in the output.
    Failed,

    /// The command was never sent — an earlier command in the batch failed.
    Skipped,
}

/// Response from one command: control-stripped output plus a success
/// indicator derived from device error markers. Results are positionally
/// aligned 1:1 with the input batch.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    /// The command that was (or would have been) executed.
    pub command: String,

    /// The command output, control sequences and echo removed.
    pub output: String,

    /// Per-command outcome.
    pub status: CommandStatus,

    /// The device error line that matched a failure marker, if any.
    pub failure: Option<String>,
}

impl CommandResult {
    pub(crate) fn ok(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            status: CommandStatus::Ok,
            failure: None,
        }
    }

    pub(crate) fn failed(
        command: impl Into<String>,
        output: impl Into<String>,
        failure: impl Into<String>,
    ) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            status: CommandStatus::Failed,
            failure: Some(failure.into()),
        }
    }

    pub(crate) fn skipped(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            output: String::new(),
            status: CommandStatus::Skipped,
            failure: None,
        }
    }

    /// Whether the command completed without a device error.
    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Ok
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }
}

impl std::fmt::Display for CommandResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.output)
    }
}

/// How a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Every statement already held on the device; nothing was sent.
    Unchanged,

    /// The delta was applied and committed.
    Committed,

    /// The device rejected a statement or the commit; the candidate was
    /// discarded and the device is unchanged.
    RolledBack,
}

/// Outcome of one transaction attempt. Never partially populated: either the
/// whole delta committed or the device was left unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionOutcome {
    /// Terminal status of the attempt.
    pub status: TransactionStatus,

    /// Per-statement results for the transaction delta, in order. Statements
    /// after a rejected one are present with `Skipped` status.
    pub results: Vec<CommandResult>,

    /// Literal device diagnostic text, present when rolled back.
    pub diagnostics: Option<String>,
}

impl TransactionOutcome {
    pub(crate) fn unchanged() -> Self {
        Self {
            status: TransactionStatus::Unchanged,
            results: Vec::new(),
            diagnostics: None,
        }
    }

    pub(crate) fn committed(results: Vec<CommandResult>) -> Self {
        Self {
            status: TransactionStatus::Committed,
            results,
            diagnostics: None,
        }
    }

    pub(crate) fn rolled_back(results: Vec<CommandResult>, diagnostics: impl Into<String>) -> Self {
        Self {
            status: TransactionStatus::RolledBack,
            results,
            diagnostics: Some(diagnostics.into()),
        }
    }

    /// Whether the device configuration was modified.
    pub fn changed(&self) -> bool {
        self.status == TransactionStatus::Committed
    }
}
