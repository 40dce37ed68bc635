use sim_core::QueueError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("customer queue failed: {0}")]
    Queue(#[from] QueueError),

    #[error("failed to spawn {actor} thread: {source}")]
    Spawn {
        actor: String,
        #[source]
        source: std::io::Error,
    },

    #[error("actor panicked: {0}")]
    ActorPanicked(String),

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}
