//! afrohistorian: retrieval-augmented chat about African history
//!
//! Source books are converted to text, split into semantic chunks, embedded with a
//! hosted sentence-transformers model and stored in a hosted Pinecone index. At
//! query time the nearest passages are folded into a fixed persona prompt and sent
//! to an OpenAI chat model, either in one call or as a token stream relayed over
//! WebSocket.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::{Answer, AnswerEngine, CancellationToken};
pub use types::{ChatMessage, ChatResponse, ChunkMetadata, DocumentChunk, ServerEvent};
