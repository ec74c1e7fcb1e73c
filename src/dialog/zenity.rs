//! Dialogs backed by the `zenity` command
//!
//! zenity exits with status 0 and prints the answer when the user confirms,
//! and exits with status 1 when the dialog is cancelled or closed. Any other
//! status is treated as a failure.

use super::{
    Credentials, DialogArgs, DialogError, DialogOptions, PasswordOptions, Prompt, PromptProvider,
};
use async_trait::async_trait;
use std::process::Command;
use tracing::debug;

/// Exit status zenity uses for a cancelled dialog
const CANCELLED_STATUS: i32 = 1;

/// Separator zenity places between username and password
const USERNAME_SEPARATOR: char = '|';

pub struct ZenityProvider {
    /// Program followed by any leading arguments
    command: Vec<String>,
}

impl ZenityProvider {
    pub fn new() -> Self {
        Self::with_command(vec!["zenity".to_string()])
    }

    /// Use a different program (and leading arguments) in place of `zenity`
    pub fn with_command(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Check whether the configured program can be found on `PATH`
    pub fn is_available(&self) -> bool {
        let Some(program) = self.command.first() else {
            return false;
        };
        Command::new("which")
            .arg(program)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Run the dialog with `args` on the blocking pool
    ///
    /// Returns `None` when the user cancelled.
    async fn run(&self, args: Vec<String>) -> Result<Option<String>, DialogError> {
        let (program, leading) = self.command.split_first().ok_or(DialogError::NoCommand)?;
        let program = program.clone();
        let mut argv = leading.to_vec();
        argv.extend(args);

        debug!("Running dialog: {} {:?}", program, argv);
        tokio::task::spawn_blocking(move || run_blocking(&program, &argv)).await?
    }
}

impl Default for ZenityProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn run_blocking(program: &str, args: &[String]) -> Result<Option<String>, DialogError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| DialogError::Spawn {
            program: program.to_string(),
            source,
        })?;

    match output.status.code() {
        Some(0) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            Ok(Some(stdout.trim_end_matches('\n').to_string()))
        }
        Some(CANCELLED_STATUS) => Ok(None),
        code => Err(DialogError::UnexpectedExit {
            code,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }),
    }
}

/// Interpret the text printed by a password dialog
fn parse_credentials(output: &str, with_username: bool) -> Credentials {
    // zenity prints only the password here; it is not reported as a username
    if !with_username {
        return Credentials {
            username: String::new(),
            password: output.to_string(),
        };
    }

    match output.split_once(USERNAME_SEPARATOR) {
        Some((username, password)) => Credentials {
            username: username.to_string(),
            password: password.to_string(),
        },
        None => Credentials {
            username: output.to_string(),
            password: String::new(),
        },
    }
}

#[async_trait]
impl PromptProvider for ZenityProvider {
    async fn ask_password(
        &self,
        options: &PasswordOptions,
    ) -> Result<Prompt<Credentials>, DialogError> {
        let mut args = vec!["--password".to_string()];
        args.extend(options.to_args());

        Ok(match self.run(args).await? {
            Some(output) => {
                Prompt::Answered(parse_credentials(&output, options.collects_username()))
            }
            None => Prompt::Cancelled,
        })
    }

    async fn ask_text(&self, options: &DialogOptions) -> Result<Prompt<String>, DialogError> {
        let mut args = vec!["--entry".to_string()];
        args.extend(options.to_args());

        Ok(match self.run(args).await? {
            Some(answer) => Prompt::Answered(answer),
            None => Prompt::Cancelled,
        })
    }
}
