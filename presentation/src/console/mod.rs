//! Line-oriented admin console
//!
//! Reads commands one line at a time, forwards them to the leader through
//! an [`AdminHandle`] and prints the formatted reply. Candidates answer
//! `not the leader` without touching the command channel.

use crate::cli::commands::OutputFormat;
use crate::output::console::ConsoleFormatter;
use crate::output::formatter::{JsonFormatter, ResponseFormatter};
use blacknight_application::{AdminCommand, AdminHandle};
use std::io::{BufRead, Write};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const LINE_BUFFER: usize = 16;

/// Interactive admin console
pub struct AdminConsole {
    handle: AdminHandle,
    formatter: Box<dyn ResponseFormatter>,
    prompt: bool,
}

impl AdminConsole {
    pub fn new(handle: AdminHandle, format: OutputFormat) -> Self {
        let formatter: Box<dyn ResponseFormatter> = match format {
            OutputFormat::Text => Box::new(ConsoleFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
        };
        Self {
            handle,
            formatter,
            prompt: format == OutputFormat::Text,
        }
    }

    /// Set whether to print a `> ` prompt before each line
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    /// Read stdin on a dedicated thread.
    ///
    /// Blocking terminal reads stay off the runtime; the thread ends with
    /// stdin or when the receiver is dropped.
    pub fn stdin_lines() -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
        rx
    }

    /// Serve lines until input ends or `shutdown` is cancelled
    pub async fn run<W: Write>(
        &self,
        mut lines: mpsc::Receiver<String>,
        mut out: W,
        shutdown: CancellationToken,
    ) -> std::io::Result<()> {
        loop {
            if self.prompt {
                write!(out, "> ")?;
                out.flush()?;
            }
            let line = tokio::select! {
                _ = shutdown.cancelled() => break,
                line = lines.recv() => line,
            };
            let Some(line) = line else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            writeln!(out, "{}", self.execute(&line).await)?;
        }
        Ok(())
    }

    /// Run one command line and render the reply
    pub async fn execute(&self, line: &str) -> String {
        let command = match line.parse::<AdminCommand>() {
            Ok(command) => command,
            Err(e) => return self.formatter.format_error(&e.to_string()),
        };
        match self.handle.send(command).await {
            Ok(response) => self.formatter.format(&response),
            Err(e) => self.formatter.format_error(&e.to_string()),
        }
    }
}
