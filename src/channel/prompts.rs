//! SR Linux prompt patterns, parameterized by the prompt family expected.
//!
//! The SR Linux CLI renders a two-line prompt: a context banner naming the
//! active datastore, then the `#`-terminated prompt line:
//!
//! ```text
//! --{ running }--[  ]--
//! A:leaf1#
//! ```
//!
//! In candidate mode the banner carries the `candidate` marker (plus `+`,
//! `*`, or `!` modifier flags once changes are staged):
//!
//! ```text
//! --{ +* candidate shared default }--[ interface ethernet-1/1 ]--
//! A:leaf1#
//! ```
//!
//! Confirmation questions are single-line `[y/n]` prompts.
//!
//! Every pattern is anchored at a line start (`(?m)^`) and at the end of the
//! accumulated buffer (`\z`). The end anchor is what makes prompt detection
//! safe against output that merely contains prompt-shaped text: a banner
//! line in the middle of a response can never match, only one the device
//! stopped at.

use std::sync::LazyLock;

use regex::bytes::Regex;

static OPERATIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^--\{(?:\s*[!+*]+)?\s*running\s*\}--\[[^\]]*\]--[ \t]*\n[A-Z]:[^\n#]*#[ \t]*\z")
        .expect("operational prompt pattern")
});

static CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^--\{(?:\s*[!+*]+)?\s*candidate[^}]*\}--\[[^\]]*\]--[ \t]*\n[A-Z]:[^\n#]*#[ \t]*\z")
        .expect("candidate prompt pattern")
});

static CONFIRM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)[\[(]y/n[\])]\s*[:?]?[ \t]*\z").expect("confirmation prompt pattern")
});

/// The family of prompt a read operation is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Operational-mode prompt (`running` context banner).
    Operational,

    /// Candidate-mode prompt (`candidate ...` context banner).
    Candidate,

    /// A `[y/n]` confirmation question.
    Confirm,
}

impl PromptKind {
    /// The compiled pattern for this prompt family.
    pub fn pattern(self) -> &'static Regex {
        match self {
            PromptKind::Operational => &OPERATIONAL,
            PromptKind::Candidate => &CANDIDATE,
            PromptKind::Confirm => &CONFIRM,
        }
    }

    /// Human-readable name, used in timeout diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            PromptKind::Operational => "operational prompt",
            PromptKind::Candidate => "candidate prompt",
            PromptKind::Confirm => "confirmation prompt",
        }
    }
}

/// Join prompt names for a "waited for X or Y" diagnostic.
pub(crate) fn describe_wanted(wanted: &[PromptKind]) -> String {
    wanted
        .iter()
        .map(|k| k.describe())
        .collect::<Vec<_>>()
        .join(" or ")
}
