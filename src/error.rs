//! Error taxonomy for the agent. Per-frame failures are folded into `FrameLabel::Error`
//! at the frame boundary; these variants surface only from setup and I/O paths.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model error: {0}")]
    Model(String),
    #[error("preprocessing error: {0}")]
    Preprocess(String),
    #[error("detector error: {0}")]
    Detector(String),
    #[error("video error: {0}")]
    Video(String),
}

