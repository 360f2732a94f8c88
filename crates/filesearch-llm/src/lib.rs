//! Language model client for model-backed query extraction.

pub mod client;
pub mod error;
pub mod settings;

pub use client::ChatCompletionClient;
pub use error::LlmError;
pub use settings::LlmSettings;
