//! The interactive terminal front-end.
//!
//! This module provides the pieces the `cyberinstruct` binary is assembled from:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`commands`]: Slash command parsing and help text
//!
//! Rendering lives in [`crate::render`] and the state machine in [`crate::session`].

mod commands;
mod config;

pub use crate::render::{Renderer, TerminalRenderer};
pub use commands::{ChatCommand, help_text, parse_command, topics_text};
pub use config::{ChatArgs, ChatConfig};
