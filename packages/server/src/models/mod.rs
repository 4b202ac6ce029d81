pub mod auth;
pub mod author;
pub mod backup;
pub mod contest;
pub mod media;
pub mod payment;
pub mod rating;
pub mod results;
pub mod shared;
pub mod submission;
