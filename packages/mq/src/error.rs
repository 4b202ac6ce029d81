use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Internal(e.to_string())
    }
}
