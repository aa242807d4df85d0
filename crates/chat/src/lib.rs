//! Linkstash chat completion
//!
//! Talks to an LLM chat endpoint and parses its line-oriented streaming
//! response format into plain answer text. The gateway composes the prompt
//! from bookmark context; this crate only handles transport and decoding.

pub mod client;
pub mod stream;

use async_trait::async_trait;
use linkstash_common::errors::Result;

pub use client::ChatClient;
pub use stream::{collect_text, parse_stream, StreamEvent};

/// Chat completion collaborator used by the gateway
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Produce a single full answer for one user message. No retries; a
    /// failed completion is surfaced to the caller.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String>;
}

/// Provider that echoes a canned answer. Used by tests and offline
/// development; never touches the network.
pub struct StubChatProvider;

#[async_trait]
impl ChatProvider for StubChatProvider {
    async fn complete(&self, _system_prompt: &str, user_message: &str) -> Result<String> {
        Ok(format!("Stubbed answer to: {}", user_message))
    }
}
