pub mod backup;

pub use backup::{consume_backup_jobs, consume_local_backup_jobs};
