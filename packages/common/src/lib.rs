pub mod backup_job;
pub mod config;
pub mod storage;

pub use backup_job::BackupJob;
