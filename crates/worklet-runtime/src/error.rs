//! Error types for the processing thread.

use thiserror::Error;
use worklet_core::SliceError;
use worklet_registry::RegistryError;

/// Errors raised while handling a control message or managing the thread.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Registration or construction was refused.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The requested block geometry cannot be sliced.
    #[error(transparent)]
    Slice(#[from] SliceError),

    /// No module script matches the import url.
    #[error("no module script for '{url}' (resolved to '{resolved}')")]
    ImportFailed {
        /// Url as requested.
        url: String,
        /// Url after resolution against the origin.
        resolved: String,
    },

    /// The processing thread is no longer accepting messages.
    #[error("processing thread has shut down")]
    Disconnected,

    /// No fence reply arrived in time.
    #[error("timed out waiting for fence {token}")]
    FenceTimeout {
        /// Token that was posted.
        token: u64,
    },

    /// The OS refused to start the thread.
    #[error("failed to spawn processing thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// The processing thread panicked.
    #[error("processing thread panicked")]
    ThreadPanicked,
}
