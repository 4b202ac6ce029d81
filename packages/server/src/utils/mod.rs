pub mod contest;
pub mod hash;
pub mod jwt;
