pub mod client;
pub mod config;
pub mod error;
pub mod openai;

// Re-export core types
pub use client::LlmClient;
pub use config::{AuthConfig, ClientConfig};
pub use error::{LlmError, Result};
pub use openai::OpenAiClient;
