//! The session core: one shell conversation with one device.

use std::ops::Range;
use std::time::Duration;

use log::{debug, trace};
use tokio::time::Instant;

use super::Mode;
use crate::channel::scrape::{self, Frame};
use crate::channel::{PatternBuffer, PromptKind};
use crate::error::{Error, ModeTransitionError, Result};
use crate::transport::Transport;

/// Default failure markers, matched case-insensitively as substrings of a
/// command's output. Matches the device's `Error: ...` diagnostics plus the
/// parser rejections that omit the prefix.
const FAILURE_MARKERS: &[&str] = &["error:", "invalid", "unknown command", "failed validation"];

/// Tuning knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for every prompt wait. A single command, mode transition,
    /// or commit must produce its prompt within this window.
    pub command_timeout: Duration,

    /// How many trailing bytes of accumulated output to search for prompts.
    pub search_depth: usize,

    /// Case-insensitive substrings that mark a command as failed.
    pub failure_markers: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            search_depth: 2000,
            failure_markers: FAILURE_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// One logical shell conversation bound to one device.
///
/// The interactive [`Mode`] is an explicit field, mutated only by the mode
/// transition methods and never inferred from call history. A session that
/// timed out or failed recovery refuses further use — the caller reconnects
/// and re-verifies device state instead of retrying blind.
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    buffer: PatternBuffer,
    mode: Mode,
    config: SessionConfig,
    poisoned: bool,
}

impl<T: Transport> Session<T> {
    /// Open a session over `transport` with default configuration.
    ///
    /// Waits for the initial operational prompt before returning.
    pub async fn open(transport: T) -> Result<Self> {
        Self::open_with(transport, SessionConfig::default()).await
    }

    /// Open a session with explicit configuration.
    pub async fn open_with(transport: T, config: SessionConfig) -> Result<Self> {
        let mut session = Self {
            transport,
            buffer: PatternBuffer::new(config.search_depth),
            mode: Mode::Operational,
            config,
            poisoned: false,
        };

        // Swallow the login banner up to the first prompt.
        session.await_prompt(&[PromptKind::Operational]).await?;
        session.buffer.clear();
        debug!("session open, operational prompt seen");

        Ok(session)
    }

    /// The device's current interactive mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the session can still be used.
    ///
    /// `false` after a timeout, a lost connection, or a failed recovery.
    pub fn is_usable(&self) -> bool {
        !self.poisoned && self.transport.is_open()
    }

    /// Close the session and tear down the connection.
    pub async fn close(mut self) -> Result<()> {
        self.transport.close().await
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            trace!("mode {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::SessionCorrupted {
                message: "session previously failed and refuses reuse; reconnect".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn require_mode(&self, operation: &'static str, required: Mode) -> Result<()> {
        if self.mode != required {
            return Err(ModeTransitionError::WrongMode {
                operation,
                required,
                actual: self.mode,
            }
            .into());
        }
        Ok(())
    }

    /// Accumulate output until one of `wanted` prompts terminates the
    /// buffer, or the command deadline elapses.
    ///
    /// This is the sole suspension point in the crate; every higher-level
    /// operation is built from it and therefore carries its deadline. On
    /// expiry the response may have been partially observed, so the session
    /// is poisoned before the timeout surfaces.
    pub(crate) async fn await_prompt(
        &mut self,
        wanted: &[PromptKind],
    ) -> Result<(PromptKind, Range<usize>)> {
        let deadline = Instant::now() + self.config.command_timeout;

        loop {
            for &kind in wanted {
                if let Some(range) = self.buffer.find_tail(kind.pattern()) {
                    return Ok((kind, range));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                self.poison();
                return Err(Error::Timeout {
                    after: self.config.command_timeout,
                    waiting_for: crate::channel::describe_wanted(wanted),
                });
            }

            match self.transport.read_some(deadline - now).await {
                Ok(Some(chunk)) => self.buffer.extend(&chunk),
                Ok(None) => {} // quiet; loop re-checks the deadline
                Err(e) => {
                    self.poison();
                    return Err(e);
                }
            }
        }
    }

    /// Send one command and frame its response against the expected prompts.
    pub(crate) async fn exec(
        &mut self,
        command: &str,
        wanted: &[PromptKind],
    ) -> Result<(Frame, PromptKind)> {
        self.ensure_usable()?;
        self.buffer.clear();

        trace!("send: {}", command);
        if let Err(e) = self.transport.send_line(command).await {
            self.poison();
            return Err(e);
        }

        let (kind, range) = self.await_prompt(wanted).await?;
        let frame = scrape::frame_response(self.buffer.as_slice(), range, command);
        self.buffer.clear();

        trace!("recv {} bytes, {}", frame.output.len(), kind.describe());
        Ok((frame, kind))
    }

    /// First output line matching a failure marker, if any.
    pub(crate) fn detect_failure(&self, output: &str) -> Option<String> {
        let lowered = output.to_lowercase();
        for marker in &self.config.failure_markers {
            if lowered.contains(marker.as_str()) {
                let line = output
                    .lines()
                    .find(|l| l.to_lowercase().contains(marker.as_str()))
                    .unwrap_or(output);
                return Some(line.trim().to_string());
            }
        }
        None
    }

}
