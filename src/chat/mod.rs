//! The interactive chat loop.
//!
//! This module provides the streaming REPL built on top of the provider
//! clients:
//!
//! - [`config`]: CLI argument parsing and command-line overrides
//! - [`commands`]: classification of input lines
//! - [`interrupt`]: the Ctrl-C latch shared with the signal handler
//! - [`session`]: the transcript, the prompt loop and reply streaming

mod commands;
mod config;
mod interrupt;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{EXIT_COMMAND, UserInput, classify_input};
pub use config::{ChatArgs, ChatConfig};
pub use interrupt::Interrupt;
pub use session::{ChatSession, LineSource, PROMPT, SessionState, TurnOutcome};
