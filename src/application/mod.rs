//! Application services layer.

pub mod cache;
pub mod error;
pub mod repos;
