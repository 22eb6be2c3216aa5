//! Shared fixtures for engine tests: canonical SR Linux prompt strings and
//! a scripted device builder.

use crate::transport::mock::MockTransport;

/// Clean operational prompt.
pub(crate) const OPER_PROMPT: &str = "--{ running }--[  ]--\nA:leaf1# ";

/// Operational prompt right after a commit (modifier flag set).
pub(crate) const OPER_PROMPT_CHANGED: &str = "--{ + running }--[  ]--\nA:leaf1# ";

/// Candidate prompt with nothing staged.
pub(crate) const CAND_PROMPT: &str = "--{ candidate shared default }--[  ]--\nA:leaf1# ";

/// Candidate prompt with staged changes.
pub(crate) const CAND_PROMPT_STAGED: &str = "--{ +* candidate shared default }--[  ]--\nA:leaf1# ";

/// A mock device that has just printed its login banner and first prompt.
///
/// Also initializes logging so `RUST_LOG=trace cargo test` shows the
/// engine's send/receive trace.
pub(crate) fn device() -> MockTransport {
    let _ = env_logger::builder().is_test(true).try_init();
    MockTransport::new().banner(&["Welcome to the srlinux CLI\n", OPER_PROMPT])
}

/// Render a command response: output block followed by the prompt.
pub(crate) fn reply(output: &str, prompt: &str) -> String {
    if output.is_empty() {
        format!("\n{prompt}")
    } else {
        format!("{output}\n{prompt}")
    }
}
