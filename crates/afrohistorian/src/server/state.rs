//! Application state for the chat server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::AnswerEngine;
use crate::server::connections::ConnectionManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Retrieval + LLM pipeline
    engine: AnswerEngine,
    /// Live WebSocket connections
    connections: ConnectionManager,
}

impl AppState {
    /// Create state backed by the hosted services in `config`
    pub fn new(config: RagConfig) -> Result<Self> {
        let engine = AnswerEngine::from_config(&config)?;
        Ok(Self::with_engine(config, engine))
    }

    /// Create state around an existing engine
    pub fn with_engine(config: RagConfig, engine: AnswerEngine) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                engine,
                connections: ConnectionManager::new(),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn engine(&self) -> &AnswerEngine {
        &self.inner.engine
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.inner.connections
    }
}
