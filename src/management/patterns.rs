//! Recognized management-interface messages
//!
//! | Line | Action |
//! |------|--------|
//! | `>PASSWORD:Need '<label>' username/password` | [`Action::Authenticate`] |
//! | `>PASSWORD:Verification Failed: '<label>'` | [`Action::VerificationFailed`] |
//! | `SUCCESS:`/`ERROR:`/`INFO:<message>` | [`Action::Relay`] |
//! | `>FATAL:`/`>ERROR:`/`>INFO:<message>` | [`Action::Relay`] |
//!
//! Patterns are tried in table order and the first match wins.

use regex::{Captures, Regex};

/// What to do with a matched line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Prompt for credentials and answer with `username`/`password` lines
    Authenticate,
    /// The VPN rejected the credentials we sent
    VerificationFailed,
    /// Forward the message to our log at the level the VPN gave it
    Relay,
}

/// A compiled matcher and the action for lines it matches
#[derive(Debug)]
pub struct MessagePattern {
    regex: Regex,
    action: Action,
}

impl MessagePattern {
    pub fn new(pattern: &str, action: Action) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            action,
        })
    }
}

/// Ordered, read-only list of message patterns
#[derive(Debug)]
pub struct PatternTable {
    patterns: Vec<MessagePattern>,
}

impl PatternTable {
    /// The management messages this program understands
    pub fn standard() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: vec![
                MessagePattern::new(
                    r"^>PASSWORD:Need '(?P<label>[^']*)' username/password",
                    Action::Authenticate,
                )?,
                MessagePattern::new(
                    r"^>PASSWORD:Verification Failed: '(?P<label>[^']*)'",
                    Action::VerificationFailed,
                )?,
                MessagePattern::new(
                    r"^(?P<level>SUCCESS|ERROR|INFO):(?P<message>.*)",
                    Action::Relay,
                )?,
                MessagePattern::new(
                    r"^>(?P<level>FATAL|ERROR|INFO):(?P<message>.*)",
                    Action::Relay,
                )?,
            ],
        })
    }

    pub fn from_patterns(patterns: Vec<MessagePattern>) -> Self {
        Self { patterns }
    }

    /// Find the first pattern matching `line`
    pub fn find<'l>(&self, line: &'l str) -> Option<(Action, Captures<'l>)> {
        self.patterns.iter().find_map(|pattern| {
            pattern
                .regex
                .captures(line)
                .map(|captures| (pattern.action, captures))
        })
    }
}
