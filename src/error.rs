//! Error types for srlinx.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::driver::result::CommandResult;
use crate::driver::Mode;

/// Main error type for srlinx operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors (connection, authentication, lost link)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A deadline elapsed while waiting for expected output.
    ///
    /// The response may have been partially observed, so the device state is
    /// unknown afterwards; the session refuses further use and the caller is
    /// expected to reconnect and re-verify state before retrying.
    #[error("Timed out after {after:?} waiting for {waiting_for}")]
    Timeout {
        after: Duration,
        waiting_for: String,
    },

    /// Mode controller errors
    #[error("Mode error: {0}")]
    Mode(#[from] ModeTransitionError),

    /// Device reported an error marker for a specific command
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Recovery itself failed; the session must be discarded and reopened
    #[error("Session corrupted: {message}")]
    SessionCorrupted { message: String },
}

/// Transport layer errors (SSH connection, authentication, channel).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key changed since it was recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged {
        host: String,
        port: u16,
        line: usize,
    },

    /// Host not present in known_hosts under strict verification
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts file could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection establishment exceeded the configured timeout
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Mode controller errors (expected prompt missing, wrong mode for operation).
#[derive(Error, Debug)]
pub enum ModeTransitionError {
    /// The expected mode prompt did not appear after a transition command
    #[error("expected the {expected} prompt, device answered with {prompt:?}")]
    UnexpectedPrompt { expected: Mode, prompt: String },

    /// An operation was invoked while the session was in the wrong mode
    #[error("{operation} requires {required} mode, session is in {actual}")]
    WrongMode {
        operation: &'static str,
        required: Mode,
        actual: Mode,
    },
}

/// A device-reported error marker for a specific command in a batch.
///
/// Non-fatal to the session, fatal to the batch. The full result sequence
/// (successes before the failure, the failed entry, skipped entries after it)
/// rides along so callers keep the 1:1 alignment with their input.
#[derive(Error, Debug, Clone)]
#[error("command {command:?} (index {index}) reported a device error: {diagnostic}")]
pub struct CommandError {
    /// Zero-based position of the failing command in the batch.
    pub index: usize,

    /// The command that failed.
    pub command: String,

    /// The device error line that matched a failure marker.
    pub diagnostic: String,

    /// Full control-stripped output of the failing command.
    pub output: String,

    /// Per-command results for the whole batch, in input order.
    pub results: Vec<CommandResult>,
}

/// Result type alias using srlinx's Error.
pub type Result<T> = std::result::Result<T, Error>;
