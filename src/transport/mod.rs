//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management and the
//! [`Transport`] trait — the seam between the session engine and the wire.
//! The engine only ever sees a duplex byte stream: lines go out, chunks of
//! raw terminal output come back.

pub mod config;
mod ssh;

#[cfg(test)]
pub(crate) mod mock;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::{SshShell, SshTransport};

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// Duplex byte stream over one interactive shell session.
///
/// One implementation owns exactly one network connection; all exchanges are
/// strictly sequential request/response pairs driven by the session engine.
pub trait Transport: Send {
    /// Write one line to the device (a newline is appended).
    fn send_line(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `wait` for the next chunk of available bytes.
    ///
    /// Returns `Ok(None)` when the full wait elapsed with nothing to read —
    /// the caller owns the overall deadline and decides when quiet becomes a
    /// timeout error. Never returns a partial chunk on expiry.
    fn read_some(&mut self, wait: Duration) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Tear down the underlying connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the underlying connection is still usable.
    fn is_open(&self) -> bool;
}
