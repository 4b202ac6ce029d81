pub mod auth;
pub mod author;
pub mod backup;
pub mod contest;
pub mod judge;
pub mod media;
pub mod payment;
pub mod rating;
pub mod results;
pub mod submission;
pub mod submission_set;
pub mod theme;
