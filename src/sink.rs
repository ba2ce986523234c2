//! Message output and command input seams.
//!
//! The engine publishes decoded messages through [`MessagePublisher`] and
//! the dispatcher pulls commands from a [`CommandSource`]; both default to
//! JSON lines on stdout/stdin so the process composes with pipes.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use crate::dispatch::InboundCommand;
use crate::types::MessageJson;

/// Destination for decoded inbound messages.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: &MessageJson);
}

/// Source of commands to dispatch, with an ack channel for the result.
#[async_trait]
pub trait CommandSource: Send {
    /// Next command, or `None` when the source is exhausted.
    async fn recv(&mut self) -> Option<InboundCommand>;

    /// Report whether dispatch of `command` succeeded.
    async fn ack(&mut self, command: &InboundCommand, success: bool);
}

/// Publishes each message as one JSON line on stdout.
#[derive(Debug, Default)]
pub struct StdoutPublisher;

#[async_trait]
impl MessagePublisher for StdoutPublisher {
    async fn publish(&self, message: &MessageJson) {
        match serde_json::to_string(message) {
            Ok(line) => println!("{}", line),
            Err(err) => warn!(error = %err, "failed to serialize message"),
        }
    }
}

/// Reads JSON-line commands from stdin. Malformed lines are logged and
/// skipped rather than ending the stream.
pub struct StdinCommandSource {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinCommandSource {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinCommandSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandSource for StdinCommandSource {
    async fn recv(&mut self) -> Option<InboundCommand> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str(line) {
                        Ok(command) => return Some(command),
                        Err(err) => warn!(error = %err, "skipping malformed command line"),
                    }
                }
                Ok(None) => return None,
                Err(err) => {
                    warn!(error = %err, "stdin read failed");
                    return None;
                }
            }
        }
    }

    async fn ack(&mut self, command: &InboundCommand, success: bool) {
        if !success {
            warn!(event_type = ?command.event_type, "command dispatch failed");
        }
    }
}
