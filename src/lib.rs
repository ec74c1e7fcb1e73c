//! OpenVPN askpass - desktop credential prompts for OpenVPN
//!
//! This crate listens on a Unix socket for OpenVPN's management interface
//! and answers its username/password requests with a graphical dialog, so
//! OpenVPN can run unattended while the user still types their credentials
//! interactively.
//!
//! # Architecture
//!
//! - `config`: Configuration file handling (TOML)
//! - `dialog`: Prompt providers (zenity)
//! - `management`: Management protocol patterns, sessions and the listener
//!
//! # Usage
//!
//! ```bash
//! openvpn-askpass --socket /run/user/1000/askpass.sock &
//! openvpn --config client.ovpn --management /run/user/1000/askpass.sock unix \
//!   --management-client --management-query-passwords
//! ```

pub mod config;
pub mod dialog;
pub mod management;

pub use config::Config;
pub use dialog::{PromptProvider, ZenityProvider};
pub use management::{PatternTable, Server, SessionHandler};
