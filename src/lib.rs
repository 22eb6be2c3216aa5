//! # Srlinx
//!
//! Async SSH automation engine for Nokia SR Linux devices.
//!
//! Srlinx drives the SR Linux CLI over an interactive SSH shell: it scrapes
//! mode-aware prompts out of the raw byte stream, tracks the device's
//! interactive mode explicitly, and runs configuration changes through the
//! candidate/commit transaction model with an idempotency short-circuit —
//! a change set that already holds on the device never enters candidate mode.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Mode-aware prompt detection robust to ANSI control-sequence noise
//! - Transactional configuration: enter candidate, stage, commit or discard
//! - Idempotency check against the flat running configuration
//! - Read-only command batches with per-command, order-preserving results
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use srlinx::{ChangeSet, ConfigStatement, Session, SshConfig, SshShell};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), srlinx::Error> {
//!     let config = SshConfig::new("192.0.2.10", "admin").password("secret");
//!     let shell = SshShell::connect(config).await?;
//!     let mut session = Session::open(shell).await?;
//!
//!     let changes = ChangeSet::from(vec![ConfigStatement::set(
//!         "interface ethernet-1/1 admin-state enable",
//!     )]);
//!     let outcome = session.apply(&changes).await?;
//!     println!("{:?}", outcome.status);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod task;
pub mod transport;

// Re-export main types for convenience
pub use driver::{
    ChangeSet, CommandBatch, CommandResult, CommandStatus, ConfigOp, ConfigStatement, Mode,
    Session, SessionConfig, TransactionOutcome, TransactionStatus,
};
pub use error::Error;
pub use task::{Operation, TaskReport, TaskStatus, run_operation};
pub use transport::{AuthMethod, SshConfig, SshShell, Transport};
