//! Per-connection management session
//!
//! A session reads the VPN's management output line by line, dispatches each
//! line through the [`PatternTable`], and writes any answer back on the same
//! connection. Lines are handled strictly in order: the next line is not read
//! until the handler for the current one has finished, which includes waiting
//! for the user to answer a credential dialog.

use super::patterns::{Action, PatternTable};
use crate::dialog::{
    Credentials, DialogError, DialogOptions, PasswordOptions, Prompt, PromptProvider,
};
use regex::Captures;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

/// Tracing target for messages relayed from the VPN process
pub const OPENVPN_TARGET: &str = "openvpn";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Connection I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Received a line that is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
    #[error("Credential prompt failed: {0}")]
    Prompt(#[from] DialogError),
}

/// State kept for the lifetime of one connection
#[derive(Debug, Default)]
pub struct SessionContext {
    verification_failures: HashMap<String, u32>,
}

impl SessionContext {
    /// Count a rejected login for `label`, returning the total so far
    pub fn record_verification_failure(&mut self, label: &str) -> u32 {
        let count = self
            .verification_failures
            .entry(label.to_string())
            .or_insert(0);
        *count += 1;
        *count
    }

    pub fn verification_failures(&self, label: &str) -> u32 {
        self.verification_failures.get(label).copied().unwrap_or(0)
    }
}

/// Handles management connections
///
/// Cheap to clone; every clone shares the pattern table and prompt provider.
#[derive(Clone)]
pub struct SessionHandler {
    patterns: Arc<PatternTable>,
    provider: Arc<dyn PromptProvider>,
    prompt: DialogOptions,
}

impl SessionHandler {
    pub fn new(patterns: Arc<PatternTable>, provider: Arc<dyn PromptProvider>) -> Self {
        Self {
            patterns,
            provider,
            prompt: DialogOptions::default(),
        }
    }

    /// Appearance of the credential dialog
    pub fn with_prompt(mut self, prompt: DialogOptions) -> Self {
        self.prompt = prompt;
        self
    }

    /// Process lines from `reader` until end of stream
    ///
    /// End of stream is the normal way for a session to finish. An error
    /// ends this session only; nothing is written for the failing line.
    pub async fn run<R, W>(&self, mut reader: R, writer: &mut W) -> Result<(), SessionError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut context = SessionContext::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                debug!("Management connection closed");
                return Ok(());
            }

            let line = trim_line_ending(std::str::from_utf8(&buf)?);
            match self.patterns.find(line) {
                Some((action, captures)) => {
                    self.dispatch(action, &mut context, writer, &captures).await?;
                }
                None => info!("Ignored message: {}", line),
            }
        }
    }

    async fn dispatch<W>(
        &self,
        action: Action,
        context: &mut SessionContext,
        writer: &mut W,
        captures: &Captures<'_>,
    ) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        match action {
            Action::Authenticate => self.authenticate(writer, capture(captures, "label")).await,
            Action::VerificationFailed => {
                let label = capture(captures, "label");
                let failures = context.record_verification_failure(label);
                error!(label, failures, "password verification failed");
                Ok(())
            }
            Action::Relay => {
                relay(capture(captures, "level"), capture(captures, "message"));
                Ok(())
            }
        }
    }

    /// Ask the user for credentials and send them, or `exit` if cancelled
    async fn authenticate<W>(&self, writer: &mut W, label: &str) -> Result<(), SessionError>
    where
        W: AsyncWrite + Unpin,
    {
        info!("Credentials requested for '{}'", label);
        let options = PasswordOptions::with_username(self.prompt.clone());

        // The dialog can hand back an empty username without being cancelled
        let answer = loop {
            match self.provider.ask_password(&options).await? {
                Prompt::Answered(credentials) if credentials.username.is_empty() => {
                    debug!("Empty username for '{}', asking again", label);
                }
                answer => break answer,
            }
        };

        let response = match answer {
            Prompt::Answered(credentials) => credentials_response(label, &credentials),
            Prompt::Cancelled => {
                info!("Credential prompt for '{}' cancelled", label);
                "exit\n".to_string()
            }
        };

        writer.write_all(response.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}

fn capture<'l>(captures: &Captures<'l>, name: &str) -> &'l str {
    captures.name(name).map_or("", |m| m.as_str())
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Log a VPN message at the level the VPN reported it
fn relay(level: &str, message: &str) {
    match level {
        "ERROR" | "FATAL" => error!(target: OPENVPN_TARGET, "{}", message),
        _ => info!(target: OPENVPN_TARGET, "{}", message),
    }
}

/// The `username`/`password` command pair answering a credential request
fn credentials_response(label: &str, credentials: &Credentials) -> String {
    let password = credentials.password.replace('"', "\\\"");
    format!(
        "username \"{label}\" \"{}\"\npassword \"{label}\" \"{password}\"\n",
        credentials.username
    )
}
