use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("MQ error: {0}")]
    Mq(String),

    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("Storage error: {0}")]
    Storage(#[from] common::storage::StorageError),

    #[error("Backup error: {0}")]
    Backup(#[from] server::backup::BackupError),
}

impl From<mq::error::MqError> for WorkerError {
    fn from(e: mq::error::MqError) -> Self {
        WorkerError::Mq(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WorkerError>;
