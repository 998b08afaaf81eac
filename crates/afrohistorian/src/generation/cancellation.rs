//! Cancellation signal shared between a socket and the answer it is streaming

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation flag; cancelling any clone cancels all of them
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolve once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns once the flag is set.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}
