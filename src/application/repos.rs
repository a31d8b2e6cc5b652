//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::cache::{CacheKey, CacheRecord, CacheValue};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Storage for cache records keyed by their unique `key`.
#[async_trait]
pub trait CacheRepo: Send + Sync {
    /// Insert the entry, or overwrite the existing row for `key` and mark it active again.
    async fn upsert(&self, key: &CacheKey, value: &CacheValue) -> Result<(), RepoError>;

    /// The record stored under `key`, unless it is missing or soft-deleted.
    async fn find_active(&self, key: &CacheKey) -> Result<Option<CacheRecord>, RepoError>;

    /// Mark the active record under `key` as deleted. Missing keys are not an error.
    async fn soft_delete(&self, key: &CacheKey) -> Result<(), RepoError>;

    async fn check_connection(&self) -> Result<(), RepoError>;
}
