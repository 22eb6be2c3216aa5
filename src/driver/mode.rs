//! Interactive mode tracking and transitions.
//!
//! The device is always in exactly one of three modes. Transitions are
//! driven by fixed CLI commands and verified against the prompt family the
//! device answers with — a transition whose expected prompt does not appear
//! fails without leaving partial state, and failures while changes are
//! staged run the discard path before surfacing.

use log::{debug, warn};

use super::session::Session;
use crate::channel::PromptKind;
use crate::error::{Error, ModeTransitionError, Result};
use crate::transport::Transport;

/// Mode-transition commands for the SR Linux CLI.
pub(crate) mod commands {
    pub const ENTER_CANDIDATE: &str = "enter candidate";
    pub const COMMIT_NOW: &str = "commit now";
    pub const DISCARD_NOW: &str = "discard now";
    pub const QUIT: &str = "quit";
    pub const CONFIRM_YES: &str = "y";
    pub const CONFIRM_NO: &str = "n";
}

/// The device's interactive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normal show/run mode. Initial and terminal state of every operation.
    Operational,

    /// Staged-configuration mode; statements accumulate uncommitted.
    Candidate,

    /// The device asked a yes/no question after a commit request and is
    /// waiting for the answer.
    CommitConfirmPending,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Operational => "operational",
            Mode::Candidate => "candidate",
            Mode::CommitConfirmPending => "commit-confirm-pending",
        };
        write!(f, "{}", name)
    }
}

/// How the device answered a commit request or a confirmation answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResponse {
    /// The commit applied; the session is back in operational mode.
    Applied,

    /// The device asked a `[y/n]` question; answer with
    /// [`confirm_commit`](Session::confirm_commit) or
    /// [`reject_commit`](Session::reject_commit).
    ConfirmPending,

    /// The device reported a validation error; the candidate still holds
    /// the staged changes and must be discarded or fixed.
    Rejected(String),
}

impl<T: Transport> Session<T> {
    /// Operational → Candidate.
    ///
    /// On mismatch the session remains operational — no partial state.
    pub async fn enter_candidate(&mut self) -> Result<()> {
        self.ensure_usable()?;
        self.require_mode("enter candidate", Mode::Operational)?;

        let (frame, kind) = self
            .exec(
                commands::ENTER_CANDIDATE,
                &[PromptKind::Candidate, PromptKind::Operational],
            )
            .await?;

        if kind != PromptKind::Candidate {
            return Err(ModeTransitionError::UnexpectedPrompt {
                expected: Mode::Candidate,
                prompt: frame.prompt,
            }
            .into());
        }

        self.set_mode(Mode::Candidate);
        debug!("entered candidate mode");
        Ok(())
    }

    /// Candidate → Operational without touching staged state.
    pub async fn leave_candidate(&mut self) -> Result<()> {
        self.require_mode("leave candidate", Mode::Candidate)?;

        let (frame, kind) = self
            .exec(
                commands::QUIT,
                &[PromptKind::Operational, PromptKind::Candidate],
            )
            .await?;

        if kind != PromptKind::Operational {
            return Err(ModeTransitionError::UnexpectedPrompt {
                expected: Mode::Operational,
                prompt: frame.prompt,
            }
            .into());
        }

        self.set_mode(Mode::Operational);
        debug!("left candidate mode");
        Ok(())
    }

    /// Request a commit of the staged candidate.
    ///
    /// The device either applies it (ending in operational mode — via `quit`
    /// when it leaves the session parked in candidate), rejects it with a
    /// validation error (session stays in candidate; the caller discards or
    /// amends), or asks for confirmation (session moves to
    /// commit-confirm-pending).
    pub async fn request_commit(&mut self) -> Result<CommitResponse> {
        self.ensure_usable()?;
        self.require_mode("commit", Mode::Candidate)?;

        let (frame, kind) = self
            .exec(
                commands::COMMIT_NOW,
                &[
                    PromptKind::Confirm,
                    PromptKind::Operational,
                    PromptKind::Candidate,
                ],
            )
            .await?;

        match kind {
            PromptKind::Confirm => {
                self.set_mode(Mode::CommitConfirmPending);
                debug!("commit requires confirmation");
                Ok(CommitResponse::ConfirmPending)
            }
            PromptKind::Operational => {
                self.set_mode(Mode::Operational);
                match self.detect_failure(&frame.output) {
                    // Rejected and the device dropped the candidate itself
                    Some(diag) => Ok(CommitResponse::Rejected(diag)),
                    None => {
                        debug!("commit applied");
                        Ok(CommitResponse::Applied)
                    }
                }
            }
            PromptKind::Candidate => {
                if let Some(diag) = self.detect_failure(&frame.output) {
                    warn!("commit rejected: {}", diag);
                    return Ok(CommitResponse::Rejected(diag));
                }
                // Applied but the device kept us in candidate mode
                self.leave_candidate().await?;
                debug!("commit applied");
                Ok(CommitResponse::Applied)
            }
        }
    }

    /// Answer a pending confirmation question with yes.
    pub async fn confirm_commit(&mut self) -> Result<CommitResponse> {
        self.resolve_commit(true).await
    }

    /// Answer a pending confirmation question with no, discarding the commit.
    pub async fn reject_commit(&mut self) -> Result<()> {
        self.resolve_commit(false).await.map(|_| ())
    }

    async fn resolve_commit(&mut self, accept: bool) -> Result<CommitResponse> {
        self.ensure_usable()?;
        self.require_mode("resolve commit", Mode::CommitConfirmPending)?;

        let answer = if accept {
            commands::CONFIRM_YES
        } else {
            commands::CONFIRM_NO
        };

        let (frame, kind) = self
            .exec(
                answer,
                &[
                    PromptKind::Operational,
                    PromptKind::Candidate,
                    PromptKind::Confirm,
                ],
            )
            .await?;

        match kind {
            PromptKind::Confirm => {
                // The device asked again; outside the protocol we speak.
                Ok(CommitResponse::ConfirmPending)
            }
            PromptKind::Operational => {
                self.set_mode(Mode::Operational);
                match self.detect_failure(&frame.output) {
                    Some(diag) => Ok(CommitResponse::Rejected(diag)),
                    None => Ok(CommitResponse::Applied),
                }
            }
            PromptKind::Candidate => {
                self.set_mode(Mode::Candidate);
                if let Some(diag) = self.detect_failure(&frame.output) {
                    return Ok(CommitResponse::Rejected(diag));
                }
                self.leave_candidate().await?;
                Ok(CommitResponse::Applied)
            }
        }
    }

    /// Drop all staged changes and return to operational mode.
    pub async fn discard_changes(&mut self) -> Result<()> {
        self.ensure_usable()?;
        self.require_mode("discard", Mode::Candidate)?;

        let (frame, kind) = self
            .exec(
                commands::DISCARD_NOW,
                &[PromptKind::Candidate, PromptKind::Operational],
            )
            .await?;

        if let Some(diag) = self.detect_failure(&frame.output) {
            return Err(ModeTransitionError::UnexpectedPrompt {
                expected: Mode::Operational,
                prompt: diag,
            }
            .into());
        }

        match kind {
            PromptKind::Operational => {
                self.set_mode(Mode::Operational);
                Ok(())
            }
            _ => self.leave_candidate().await,
        }
    }

    /// Best-effort recovery to operational mode after a failure.
    ///
    /// This is the second phase of the two-phase error handler: the caller
    /// has an original failure in hand and invokes this before surfacing it.
    /// If recovery itself fails, the session is poisoned and the distinct
    /// `SessionCorrupted` error (embedding both causes) replaces the
    /// original.
    pub(crate) async fn abandon_candidate(&mut self, context: &str) -> Result<()> {
        let recovery = match self.mode() {
            Mode::Operational => Ok(()),
            Mode::Candidate => self.discard_changes().await,
            Mode::CommitConfirmPending => self.reject_commit().await,
        };

        match recovery {
            Ok(()) => {
                debug!("candidate abandoned after {}", context);
                Ok(())
            }
            Err(e) => {
                self.poison();
                Err(Error::SessionCorrupted {
                    message: format!("discard after {context} failed: {e}"),
                })
            }
        }
    }
}
