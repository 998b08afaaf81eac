//! Retrieval of context passages for a query

mod search;

pub use search::{RetrievalResult, RetrievalStatus, Retriever};
