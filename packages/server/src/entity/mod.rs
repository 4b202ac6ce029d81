pub mod author;
pub mod author_reward;
pub mod contest;
pub mod file_backup;
pub mod judge;
pub mod media_file;
pub mod payment;
pub mod rating;
pub mod role;
pub mod role_permission;
pub mod submission;
pub mod submission_reward;
pub mod submission_set;
pub mod submission_set_member;
pub mod theme;
pub mod theme_results;
pub mod user;
