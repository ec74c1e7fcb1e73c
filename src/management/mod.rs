//! OpenVPN management interface integration
//!
//! OpenVPN exposes a line-oriented management protocol. With
//! `--management-client` it connects out to a socket we listen on, and with
//! `--management-query-passwords` it asks that socket for credentials
//! instead of prompting on its own terminal.
//!
//! # Flow
//!
//! 1. [`Server`] accepts a connection from OpenVPN
//! 2. [`SessionHandler`] reads lines and matches them against the
//!    [`PatternTable`]
//! 3. Credential requests are answered through a
//!    [`PromptProvider`](crate::dialog::PromptProvider); other messages are
//!    logged

pub mod patterns;
pub mod server;
pub mod session;

pub use patterns::{Action, MessagePattern, PatternTable};
pub use server::{Server, ServerError};
pub use session::{OPENVPN_TARGET, SessionContext, SessionError, SessionHandler};
