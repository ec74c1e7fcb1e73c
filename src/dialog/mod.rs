//! Interactive credential prompts
//!
//! A [`PromptProvider`] shows a modal dialog and reports either the user's
//! answer or that the dialog was cancelled. Cancellation is an ordinary
//! outcome, not an error; [`DialogError`] is reserved for prompts that could
//! not be shown or ended unexpectedly.
//!
//! The provider used in production is [`ZenityProvider`], which runs the
//! `zenity` command on tokio's blocking pool so a pending dialog never stalls
//! other connections.

mod options;
mod zenity;

pub use options::{DialogArgs, DialogOptions, FieldValue, OptionField, PasswordOptions};
pub use zenity::ZenityProvider;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogError {
    #[error("Failed to start dialog command {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No dialog command configured")]
    NoCommand,
    #[error("Dialog exited unexpectedly (status {code:?}): {stderr}")]
    UnexpectedExit { code: Option<i32>, stderr: String },
    #[error("Dialog worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Result of a prompt that the user may cancel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt<T> {
    Cancelled,
    Answered(T),
}

/// Username and password entered in a password dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Source of interactive answers
#[async_trait]
pub trait PromptProvider: Send + Sync {
    /// Ask for a password, and a username when `options` requests one
    async fn ask_password(
        &self,
        options: &PasswordOptions,
    ) -> Result<Prompt<Credentials>, DialogError>;

    /// Ask for a single line of free text
    async fn ask_text(&self, options: &DialogOptions) -> Result<Prompt<String>, DialogError>;
}
