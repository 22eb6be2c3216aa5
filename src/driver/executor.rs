//! Read-only batch execution.

use log::debug;

use super::result::{CommandBatch, CommandResult};
use super::session::Session;
use super::Mode;
use crate::channel::PromptKind;
use crate::error::{CommandError, Result};
use crate::transport::Transport;

impl<T: Transport> Session<T> {
    /// Execute an ordered batch of operational-mode commands.
    ///
    /// Requires operational mode on entry and never leaves it — the batch is
    /// read-only as far as the mode machine is concerned. The result
    /// sequence is always 1:1 with the batch, in input order.
    ///
    /// Fail-fast: the first command whose output carries a device error
    /// marker stops the batch. Later commands are not sent and their results
    /// are marked `Skipped`; the returned [`CommandError`] carries the
    /// failing index and the full result sequence.
    pub async fn run(&mut self, batch: &CommandBatch) -> Result<Vec<CommandResult>> {
        self.ensure_usable()?;
        self.require_mode("run", Mode::Operational)?;

        let mut results = Vec::with_capacity(batch.len());
        let mut failed: Option<usize> = None;

        for (index, command) in batch.iter().enumerate() {
            if failed.is_some() {
                results.push(CommandResult::skipped(command));
                continue;
            }

            let (frame, _) = self.exec(command, &[PromptKind::Operational]).await?;

            match self.detect_failure(&frame.output) {
                Some(diagnostic) => {
                    debug!("command {:?} failed: {}", command, diagnostic);
                    results.push(CommandResult::failed(command, frame.output, diagnostic));
                    failed = Some(index);
                }
                None => results.push(CommandResult::ok(command, frame.output)),
            }
        }

        if let Some(index) = failed {
            let failing = &results[index];
            return Err(CommandError {
                index,
                command: failing.command.clone(),
                diagnostic: failing.failure.clone().unwrap_or_default(),
                output: failing.output.clone(),
                results,
            }
            .into());
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::result::CommandStatus;
    use crate::driver::testkit::{device, reply, OPER_PROMPT};
    use crate::error::Error;

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch() {
        let mut session = Session::open(device()).await.unwrap();
        let results = session.run(&CommandBatch::new()).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(session.mode(), Mode::Operational);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_align_with_batch_order() {
        let mock = device()
            .expect("show version", &[&reply("Hostname: leaf1", OPER_PROMPT)])
            .expect(
                "show interface brief",
                &[&reply("ethernet-1/1  up", OPER_PROMPT)],
            )
            .expect("show platform", &[&reply("Slot 1: imm", OPER_PROMPT)]);
        let mut session = Session::open(mock).await.unwrap();

        let batch: CommandBatch =
            ["show version", "show interface brief", "show platform"][..].into();
        let results = session.run(&batch).await.unwrap();

        assert_eq!(results.len(), 3);
        let commands: Vec<&str> = results.iter().map(|r| r.command.as_str()).collect();
        assert_eq!(
            commands,
            vec!["show version", "show interface brief", "show platform"]
        );
        assert!(results.iter().all(|r| r.is_success()));
        assert_eq!(results[1].output, "ethernet-1/1  up");
        assert_eq!(session.mode(), Mode::Operational);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_command_stops_batch() {
        // Three commands, the second fails. Fail-fast: the third is never
        // sent (the script would panic if it were), but the result sequence
        // still has three aligned entries.
        let mock = device()
            .expect("show version", &[&reply("Hostname: leaf1", OPER_PROMPT)])
            .expect(
                "show bogus",
                &[&reply("Error: unknown command 'bogus'", OPER_PROMPT)],
            );
        let mut session = Session::open(mock).await.unwrap();

        let batch: CommandBatch = ["show version", "show bogus", "show platform"][..].into();
        let err = session.run(&batch).await.unwrap_err();

        let Error::Command(err) = err else {
            panic!("expected CommandError, got {err:?}");
        };
        assert_eq!(err.index, 1);
        assert_eq!(err.command, "show bogus");
        assert!(err.diagnostic.contains("unknown command"));

        assert_eq!(err.results.len(), 3);
        assert_eq!(err.results[0].status, CommandStatus::Ok);
        assert_eq!(err.results[1].status, CommandStatus::Failed);
        assert_eq!(err.results[2].status, CommandStatus::Skipped);
        assert_eq!(err.results[2].output, "");

        // The session is still usable and still operational.
        assert!(session.is_usable());
        assert_eq!(session.mode(), Mode::Operational);
    }
}
