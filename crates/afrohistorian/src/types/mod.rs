//! Core types for the chat service

pub mod chat;
pub mod chunk;
pub mod event;

pub use chat::{ChatMessage, ChatResponse, Source};
pub use chunk::{ChunkMetadata, DocumentChunk};
pub use event::ServerEvent;
