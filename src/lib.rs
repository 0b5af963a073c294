// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod config;
pub mod connection_string;
pub mod error;
pub mod providers;
pub mod render;
pub mod types;

mod observability;
mod sse;

// Re-exports
pub use client::{ChatStream, ClientOptions};
pub use client_logger::{ClientLogger, JsonLinesLogger};
pub use config::Configuration;
pub use connection_string::ConnectionString;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use providers::{AzureOpenAi, ChatCompletion, OpenAi, ProviderKind, ProviderSelection};
pub use sse::process_sse;
pub use types::*;
