//! Workflow operations shared by the HTTP handlers and the integration tests.
//!
//! Every time-gated operation takes `now` explicitly.

pub mod media;
pub mod payment;
pub mod rating;
pub mod results;
pub mod submission;

pub use media::MediaIntake;
