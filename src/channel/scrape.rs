//! Response framing: everything between the command echo and the prompt.
//!
//! Given the accumulated buffer and the prompt match range, this module
//! extracts the command's output: the echoed command line is dropped,
//! interior context-banner lines (the device repaints them under some
//! terminal settings) are filtered out, and the prompt text itself is
//! returned separately.

use std::ops::Range;

use memchr::memchr;

/// One framed command response.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    /// Cleaned command output (echo, banners, and prompt removed).
    pub output: String,

    /// The prompt text that terminated the response.
    pub prompt: String,
}

/// Split `buf` into output and prompt around the prompt match.
pub(crate) fn frame_response(buf: &[u8], prompt: Range<usize>, command: &str) -> Frame {
    let prompt_text = String::from_utf8_lossy(&buf[prompt.clone()])
        .trim()
        .to_string();

    let body = String::from_utf8_lossy(&buf[..prompt.start]);
    let body = strip_echo(&body, command);

    let output = body
        .lines()
        .filter(|line| !is_context_banner(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .trim_end()
        .to_string();

    Frame {
        output,
        prompt: prompt_text,
    }
}

/// Drop the echoed command from the start of the body, if present.
fn strip_echo<'a>(body: &'a str, command: &str) -> &'a str {
    let body = body.trim_start_matches('\n');

    let (first, rest) = match memchr(b'\n', body.as_bytes()) {
        Some(i) => (&body[..i], &body[i + 1..]),
        None => (body, ""),
    };

    if first.trim_end() == command {
        rest
    } else {
        body
    }
}

/// Context banner lines look like `--{ running }--[  ]--`.
fn is_context_banner(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("--{") && trimmed.contains("}--")
}
