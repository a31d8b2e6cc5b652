//! HTTP key-value cache stored in PostgreSQL with soft-delete semantics.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
