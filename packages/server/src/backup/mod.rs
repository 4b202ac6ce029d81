//! Off-site backup of uploaded media.
//!
//! Every media file gets a [`file_backup`](crate::entity::file_backup) row in
//! the transaction that creates it. After commit a [`BackupJob`] is sent
//! through a [`BackupTrigger`]; the consumer (worker process or in-process
//! task) runs a [`BackupRunner`] that uploads pending files and stamps them
//! done. The table, not the channel, is the source of truth: a lost job only
//! delays the upload until the next sweep.

mod runner;
mod trigger;

pub use common::BackupJob;
pub use runner::{BackupError, BackupReport, BackupRunner, object_store_from_config, reconcile};
pub use trigger::{
    BackupTrigger, ChannelBackupTrigger, QueueBackupTrigger, TriggerError, fire_and_log,
};
