//! OpenAI-compatible completion provider.

pub mod client;
pub mod sse;

pub use client::OpenAiCompatibleClient;
pub use sse::SseDecoder;
