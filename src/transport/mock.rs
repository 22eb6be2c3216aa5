//! Scripted in-memory transport for driving the engine from recorded byte
//! fixtures. Test-only.
//!
//! A script is an ordered list of exchanges: the line the engine is expected
//! to send next, and the chunks the "device" replies with. The mock echoes
//! every sent line (real PTYs do), then serves the reply chunks one
//! `read_some` call at a time. An exhausted reply queue models a quiet
//! device: `read_some` sleeps out its wait and returns `None`, which the
//! session turns into a timeout.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use super::Transport;
use crate::error::{Result, TransportError};

/// Shared log of every line written to the mock, in order.
pub(crate) type SentLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug)]
pub(crate) struct Exchange {
    expect: String,
    reply: Vec<Bytes>,
}

#[derive(Debug)]
pub(crate) struct MockTransport {
    script: VecDeque<Exchange>,
    pending: VecDeque<Bytes>,
    sent: SentLog,
    open: bool,
    /// Suppress command echo in replies (to exercise echo-less framing).
    echo: bool,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            script: VecDeque::new(),
            pending: VecDeque::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            open: true,
            echo: true,
        }
    }

    /// Queue chunks served before any exchange (the login banner + prompt).
    pub(crate) fn banner(mut self, chunks: &[&str]) -> Self {
        for chunk in chunks {
            self.pending.push_back(Bytes::copy_from_slice(chunk.as_bytes()));
        }
        self
    }

    /// Append an exchange: when `line` is sent, reply with `chunks`.
    pub(crate) fn expect(mut self, line: &str, chunks: &[&str]) -> Self {
        self.script.push_back(Exchange {
            expect: line.to_string(),
            reply: chunks
                .iter()
                .map(|c| Bytes::copy_from_slice(c.as_bytes()))
                .collect(),
        });
        self
    }

    pub(crate) fn without_echo(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Handle to the log of written lines; keep a clone before moving the
    /// mock into a session.
    pub(crate) fn sent_log(&self) -> SentLog {
        self.sent.clone()
    }
}

impl Transport for MockTransport {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.sent.lock().unwrap().push(line.to_string());

        let exchange = match self.script.pop_front() {
            Some(e) => e,
            None => panic!("script exhausted, unexpected line sent: {line:?}"),
        };
        assert_eq!(
            exchange.expect, line,
            "script expected {:?}, engine sent {:?}",
            exchange.expect, line
        );

        if self.echo {
            self.pending
                .push_back(Bytes::copy_from_slice(format!("{line}\r\n").as_bytes()));
        }
        self.pending.extend(exchange.reply);
        Ok(())
    }

    async fn read_some(&mut self, wait: Duration) -> Result<Option<Bytes>> {
        if !self.open {
            return Err(TransportError::Disconnected.into());
        }
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(Some(chunk));
        }
        tokio::time::sleep(wait).await;
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
