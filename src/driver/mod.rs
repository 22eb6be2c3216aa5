//! Session engine for SR Linux devices.
//!
//! The driver layer owns one shell conversation per device: it tracks the
//! interactive mode explicitly, executes command batches with per-command
//! results, and runs configuration change sets as transactions against the
//! candidate datastore.

mod executor;
mod mode;
pub(crate) mod result;
mod session;
#[cfg(test)]
pub(crate) mod testkit;
mod transaction;

pub use mode::{CommitResponse, Mode};
pub use result::{
    CommandBatch, CommandResult, CommandStatus, TransactionOutcome, TransactionStatus,
};
pub use session::{Session, SessionConfig};
pub use transaction::{ChangeSet, ConfigOp, ConfigStatement, FLAT_CONFIG_QUERY};
