//! A themed terminal front-end for a streaming security-instructor model.
//!
//! The crate is built leaf-first:
//!
//! - [`markup`] turns message text into styled [`Segment`]s;
//! - [`transcript`] holds the ordered messages of the active session;
//! - [`session`] switches topics and folds streamed reply chunks into the transcript.
//!
//! The remote model sits behind [`ModelService`]; [`MessagesService`] is the shipped
//! implementation over the streaming Messages API.

// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod markup;
pub mod persona;
pub mod render;
pub mod service;
pub mod session;
pub mod sse;
pub mod transcript;
pub mod types;

mod observability;

// Re-exports
pub use client::{API_KEY_ENV, MessagesChat, MessagesService};
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use render::{Renderer, TerminalRenderer};
pub use service::{ChatHandle, INTERRUPTION_NOTICE, ModelService, ReplyStream, SessionRequest};
pub use session::{Phase, SessionController, SessionStats};
pub use transcript::Transcript;
pub use types::*;
