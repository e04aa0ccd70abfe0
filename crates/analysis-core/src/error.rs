use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Malformed candle at index {index}: {reason}")]
    MalformedCandle { index: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Orchestrator is stopped")]
    Stopped,
}
