//! Configuration transactions against the candidate datastore.
//!
//! A transaction takes an ordered [`ChangeSet`] and either proves it is
//! already satisfied by the running configuration (no mode transition at
//! all), or stages the unsatisfied statements in candidate mode and commits
//! them. Any device-side rejection runs the discard path first, so the
//! device is never left with a partial change or a parked candidate.

use indexmap::IndexSet;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::result::{CommandResult, TransactionOutcome};
use super::session::Session;
use super::{CommitResponse, Mode};
use crate::channel::PromptKind;
use crate::error::{CommandError, Error, ModeTransitionError, Result};
use crate::transport::Transport;

/// Read-only query for the flat running configuration, one `set / ...` line
/// per leaf. Runs in operational mode.
pub const FLAT_CONFIG_QUERY: &str = "info flat from running /";

/// Whether a statement asserts or removes configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOp {
    Set,
    Delete,
}

/// One configuration statement: an operation plus a path relative to the
/// configuration root (without the leading `set /` / `delete /`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigStatement {
    pub op: ConfigOp,
    pub path: String,
}

impl ConfigStatement {
    /// A `set` statement, e.g. `interface ethernet-1/1 admin-state enable`.
    pub fn set(path: impl Into<String>) -> Self {
        Self {
            op: ConfigOp::Set,
            path: path.into(),
        }
    }

    /// A `delete` statement, e.g. `interface ethernet-1/1 subinterface 1`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            op: ConfigOp::Delete,
            path: path.into(),
        }
    }

    /// Parse a full CLI line (`set / ...` or `delete / ...`).
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("set /") {
            Some(Self::set(rest.trim()))
        } else if let Some(rest) = line.strip_prefix("delete /") {
            Some(Self::delete(rest.trim()))
        } else {
            None
        }
    }

    /// Render as the CLI command sent to the device.
    pub fn to_command(&self) -> String {
        match self.op {
            ConfigOp::Set => format!("set / {}", self.path),
            ConfigOp::Delete => format!("delete / {}", self.path),
        }
    }

    /// Whether the running configuration already reflects this statement.
    ///
    /// A `set` holds when its exact normalized line is present; a `delete`
    /// holds when nothing remains at or under its path.
    pub(crate) fn satisfied_by(&self, running: &RunningConfig) -> bool {
        match self.op {
            ConfigOp::Set => running.contains_exact(&normalize(&self.to_command())),
            ConfigOp::Delete => !running.contains_under(&normalize(&format!("set / {}", self.path))),
        }
    }
}

/// An ordered, immutable sequence of configuration statements describing the
/// desired state delta. Order is significant: device-side validation may be
/// order-sensitive, so statements are sent exactly as given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    statements: Vec<ConfigStatement>,
}

impl ChangeSet {
    pub fn new(statements: Vec<ConfigStatement>) -> Self {
        Self { statements }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigStatement> {
        self.statements.iter()
    }
}

impl From<Vec<ConfigStatement>> for ChangeSet {
    fn from(statements: Vec<ConfigStatement>) -> Self {
        Self::new(statements)
    }
}

impl FromIterator<ConfigStatement> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = ConfigStatement>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Snapshot of the flat running configuration: normalized `set / ...` lines
/// in device order.
#[derive(Debug)]
pub(crate) struct RunningConfig {
    lines: IndexSet<String>,
}

impl RunningConfig {
    /// Parse `info flat` output. Non-`set` lines (headers, blank lines) are
    /// ignored.
    pub(crate) fn parse(text: &str) -> Self {
        let lines = text
            .lines()
            .map(normalize)
            .filter(|l| l.starts_with("set "))
            .collect();
        Self { lines }
    }

    fn contains_exact(&self, line: &str) -> bool {
        self.lines.contains(line)
    }

    /// Any line at the given path or under it, on token boundaries —
    /// `ethernet-1/1` never matches `ethernet-1/10`.
    fn contains_under(&self, prefix: &str) -> bool {
        let extended = format!("{prefix} ");
        self.lines
            .iter()
            .any(|l| l == prefix || l.starts_with(&extended))
    }
}

/// Collapse runs of whitespace so formatting differences never defeat the
/// equivalence check.
fn normalize(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl<T: Transport> Session<T> {
    /// Fetch and parse the flat running configuration.
    pub(crate) async fn running_config(&mut self) -> Result<RunningConfig> {
        let (frame, _) = self
            .exec(FLAT_CONFIG_QUERY, &[PromptKind::Operational])
            .await?;

        if let Some(diagnostic) = self.detect_failure(&frame.output) {
            return Err(CommandError {
                index: 0,
                command: FLAT_CONFIG_QUERY.to_string(),
                diagnostic,
                output: frame.output,
                results: Vec::new(),
            }
            .into());
        }

        Ok(RunningConfig::parse(&frame.output))
    }

    /// Apply a change set as one transaction.
    ///
    /// Statements already reflected in the running configuration are
    /// filtered out first; if nothing remains the call returns `Unchanged`
    /// without any mode transition. Otherwise the remaining statements are
    /// staged in candidate mode in caller order and committed. Any
    /// device-side rejection — of a statement or of the commit itself —
    /// discards the candidate and returns `RolledBack` with the literal
    /// diagnostics; the device configuration is unchanged in that case.
    ///
    /// The session ends in operational mode on every path that returns
    /// `Ok`, and on error paths where recovery succeeded. There is no
    /// automatic retry: a timeout poisons the session and the caller is
    /// expected to reconnect and call `apply` again, which re-runs the
    /// idempotency check against actual device state.
    pub async fn apply(&mut self, changes: &ChangeSet) -> Result<TransactionOutcome> {
        self.ensure_usable()?;
        self.require_mode("apply", Mode::Operational)?;

        let running = self.running_config().await?;
        let pending: Vec<&ConfigStatement> = changes
            .iter()
            .filter(|s| !s.satisfied_by(&running))
            .collect();

        if pending.is_empty() {
            debug!(
                "change set ({} statements) already satisfied",
                changes.len()
            );
            return Ok(TransactionOutcome::unchanged());
        }
        debug!(
            "{} of {} statements unsatisfied, starting transaction",
            pending.len(),
            changes.len()
        );

        self.enter_candidate().await?;

        let mut results = Vec::with_capacity(pending.len());
        for (position, statement) in pending.iter().enumerate() {
            let command = statement.to_command();

            let (frame, _) = match self.exec(&command, &[PromptKind::Candidate]).await {
                Ok(v) => v,
                Err(e) => return Err(self.fail_transaction(e, "configuration statement").await),
            };

            if let Some(diagnostic) = self.detect_failure(&frame.output) {
                warn!("device rejected {:?}: {}", command, diagnostic);
                results.push(CommandResult::failed(&command, frame.output, &diagnostic));
                for skipped in &pending[position + 1..] {
                    results.push(CommandResult::skipped(skipped.to_command()));
                }
                self.abandon_candidate("rejected configuration statement")
                    .await?;
                return Ok(TransactionOutcome::rolled_back(results, diagnostic));
            }

            results.push(CommandResult::ok(&command, frame.output));
        }

        let mut response = match self.request_commit().await {
            Ok(r) => r,
            Err(e) => return Err(self.fail_transaction(e, "commit").await),
        };

        if response == CommitResponse::ConfirmPending {
            response = match self.confirm_commit().await {
                Ok(r) => r,
                Err(e) => return Err(self.fail_transaction(e, "commit confirmation").await),
            };
        }

        match response {
            CommitResponse::Applied => Ok(TransactionOutcome::committed(results)),
            CommitResponse::Rejected(diagnostic) => {
                warn!("commit rejected: {}", diagnostic);
                self.abandon_candidate("rejected commit").await?;
                Ok(TransactionOutcome::rolled_back(results, diagnostic))
            }
            CommitResponse::ConfirmPending => {
                // A second confirmation question is outside the protocol.
                let err = ModeTransitionError::UnexpectedPrompt {
                    expected: Mode::Operational,
                    prompt: "[y/n]".to_string(),
                }
                .into();
                Err(self.fail_transaction(err, "repeated confirmation").await)
            }
        }
    }

    /// Run the discard path before surfacing `err`, per the two-phase
    /// recovery policy. Timeouts skip the discard — the response was only
    /// partially observed, so the device state is unknown and sending more
    /// commands would be blind; the session is already poisoned.
    async fn fail_transaction(&mut self, err: Error, context: &str) -> Error {
        if matches!(err, Error::Timeout { .. }) || !self.is_usable() {
            self.poison();
            return err;
        }
        match self.abandon_candidate(context).await {
            Ok(()) => err,
            Err(corrupted) => corrupted,
        }
    }
}

#[cfg(test)]
mod apply_tests {
    use super::*;
    use crate::driver::result::{CommandStatus, TransactionStatus};
    use crate::driver::testkit::{
        device, reply, CAND_PROMPT, CAND_PROMPT_STAGED, OPER_PROMPT, OPER_PROMPT_CHANGED,
    };

    const ENABLE_ETH1: &str = "set / interface ethernet-1/1 admin-state enable";

    fn enable_eth1() -> ChangeSet {
        ChangeSet::from(vec![ConfigStatement::set(
            "interface ethernet-1/1 admin-state enable",
        )])
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_already_satisfied_is_a_noop() {
        // Scenario: the interface is already enabled. Only the read-only
        // query may hit the wire — zero mode-transition commands.
        let mock = device().expect(FLAT_CONFIG_QUERY, &[&reply(ENABLE_ETH1, OPER_PROMPT)]);
        let log = mock.sent_log();
        let mut session = Session::open(mock).await.unwrap();

        let outcome = session.apply(&enable_eth1()).await.unwrap();

        assert_eq!(outcome.status, TransactionStatus::Unchanged);
        assert!(outcome.results.is_empty());
        assert_eq!(session.mode(), Mode::Operational);
        assert_eq!(log.lock().unwrap().as_slice(), [FLAT_CONFIG_QUERY]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_commits_delta_then_second_call_is_noop() {
        // Scenario: interface disabled, the change set enables it.
        let mock = device()
            .expect(
                FLAT_CONFIG_QUERY,
                &[&reply(
                    "set / interface ethernet-1/1 admin-state disable",
                    OPER_PROMPT,
                )],
            )
            .expect("enter candidate", &[&reply("", CAND_PROMPT)])
            .expect(ENABLE_ETH1, &[&reply("", CAND_PROMPT_STAGED)])
            .expect(
                "commit now",
                &[&reply("All changes have been committed", OPER_PROMPT_CHANGED)],
            );
        let mut session = Session::open(mock).await.unwrap();

        let outcome = session.apply(&enable_eth1()).await.unwrap();
        assert_eq!(outcome.status, TransactionStatus::Committed);
        assert!(outcome.changed());
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].status, CommandStatus::Ok);
        assert_eq!(session.mode(), Mode::Operational);

        // The identical change set against the post-commit state is a no-op.
        let mock = device().expect(FLAT_CONFIG_QUERY, &[&reply(ENABLE_ETH1, OPER_PROMPT)]);
        let mut session = Session::open(mock).await.unwrap();
        let outcome = session.apply(&enable_eth1()).await.unwrap();
        assert_eq!(outcome.status, TransactionStatus::Unchanged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_rolls_back_on_rejected_statement() {
        // Scenario: rename vlan 10, then delete it; the device rejects the
        // delete. The engine must discard so the rename never commits.
        let changes = ChangeSet::from(vec![
            ConfigStatement::set("vlan 10 name \"A\""),
            ConfigStatement::delete("vlan 10"),
        ]);

        let mock = device()
            .expect(
                FLAT_CONFIG_QUERY,
                &[&reply("set / vlan 10 name \"B\"", OPER_PROMPT)],
            )
            .expect("enter candidate", &[&reply("", CAND_PROMPT)])
            .expect("set / vlan 10 name \"A\"", &[&reply("", CAND_PROMPT_STAGED)])
            .expect(
                "delete / vlan 10",
                &[&reply(
                    "Error: vlan 10 is still referenced by interface ethernet-1/1",
                    CAND_PROMPT_STAGED,
                )],
            )
            .expect("discard now", &[&reply("", CAND_PROMPT)])
            .expect("quit", &[&reply("", OPER_PROMPT)]);
        let log = mock.sent_log();
        let mut session = Session::open(mock).await.unwrap();

        let outcome = session.apply(&changes).await.unwrap();

        assert_eq!(outcome.status, TransactionStatus::RolledBack);
        assert!(outcome.diagnostics.as_deref().unwrap().contains("still referenced"));
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].status, CommandStatus::Ok);
        assert_eq!(outcome.results[1].status, CommandStatus::Failed);
        assert_eq!(session.mode(), Mode::Operational);
        assert!(session.is_usable());

        // The discard path ran before the outcome surfaced.
        let sent = log.lock().unwrap();
        assert!(sent.contains(&"discard now".to_string()));
        assert!(sent.contains(&"quit".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_skips_statements_after_rejection() {
        let changes = ChangeSet::from(vec![
            ConfigStatement::set("vlan 10 name \"A\""),
            ConfigStatement::delete("vlan 10"),
            ConfigStatement::set("vlan 20 name \"C\""),
        ]);

        let mock = device()
            .expect(
                FLAT_CONFIG_QUERY,
                &[&reply("set / vlan 10 name \"B\"", OPER_PROMPT)],
            )
            .expect("enter candidate", &[&reply("", CAND_PROMPT)])
            .expect("set / vlan 10 name \"A\"", &[&reply("", CAND_PROMPT_STAGED)])
            .expect(
                "delete / vlan 10",
                &[&reply("Error: vlan 10 is still referenced", CAND_PROMPT_STAGED)],
            )
            .expect("discard now", &[&reply("", CAND_PROMPT)])
            .expect("quit", &[&reply("", OPER_PROMPT)]);
        let mut session = Session::open(mock).await.unwrap();

        let outcome = session.apply(&changes).await.unwrap();
        assert_eq!(outcome.status, TransactionStatus::RolledBack);
        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.results[2].status, CommandStatus::Skipped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_answers_commit_confirmation() {
        let mock = device()
            .expect(FLAT_CONFIG_QUERY, &[&reply("", OPER_PROMPT)])
            .expect("enter candidate", &[&reply("", CAND_PROMPT)])
            .expect(ENABLE_ETH1, &[&reply("", CAND_PROMPT_STAGED)])
            .expect("commit now", &["Are you sure? [y/n]: "])
            .expect(
                "y",
                &[&reply("All changes have been committed", OPER_PROMPT_CHANGED)],
            );
        let mut session = Session::open(mock).await.unwrap();

        let outcome = session.apply(&enable_eth1()).await.unwrap();
        assert_eq!(outcome.status, TransactionStatus::Committed);
        assert_eq!(session.mode(), Mode::Operational);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_rolls_back_on_commit_rejection() {
        let mock = device()
            .expect(FLAT_CONFIG_QUERY, &[&reply("", OPER_PROMPT)])
            .expect("enter candidate", &[&reply("", CAND_PROMPT)])
            .expect(ENABLE_ETH1, &[&reply("", CAND_PROMPT_STAGED)])
            .expect(
                "commit now",
                &[&reply(
                    "Error: commit failed validation (interface has no subinterface)",
                    CAND_PROMPT_STAGED,
                )],
            )
            .expect("discard now", &[&reply("", CAND_PROMPT)])
            .expect("quit", &[&reply("", OPER_PROMPT)]);
        let mut session = Session::open(mock).await.unwrap();

        let outcome = session.apply(&enable_eth1()).await.unwrap();
        assert_eq!(outcome.status, TransactionStatus::RolledBack);
        assert!(outcome
            .diagnostics
            .as_deref()
            .unwrap()
            .contains("failed validation"));
        assert_eq!(session.mode(), Mode::Operational);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_surfaces_enter_candidate_failure() {
        let mock = device()
            .expect(FLAT_CONFIG_QUERY, &[&reply("", OPER_PROMPT)])
            .expect(
                "enter candidate",
                &[&reply("Error: candidate datastore is locked", OPER_PROMPT)],
            );
        let mut session = Session::open(mock).await.unwrap();

        let err = session.apply(&enable_eth1()).await.unwrap_err();
        assert!(matches!(err, Error::Mode(_)));
        assert_eq!(session.mode(), Mode::Operational);
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_timeout_poisons_without_discard() {
        // The device goes quiet mid-transaction; nothing more may be sent.
        let mock = device()
            .expect(FLAT_CONFIG_QUERY, &[&reply("", OPER_PROMPT)])
            .expect("enter candidate", &[&reply("", CAND_PROMPT)])
            .expect(ENABLE_ETH1, &[]);
        let log = mock.sent_log();
        let mut session = Session::open(mock).await.unwrap();

        let err = session.apply(&enable_eth1()).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(!session.is_usable());

        let sent = log.lock().unwrap();
        assert!(!sent.contains(&"discard now".to_string()));
    }
}
