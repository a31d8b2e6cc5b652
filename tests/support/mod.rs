//! In-memory `CacheRepo` shared by the router-level tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use kvcache::application::cache::CacheService;
use kvcache::application::repos::{CacheRepo, RepoError};
use kvcache::domain::cache::{CacheKey, CacheRecord, CacheValue, RecordState};
use kvcache::infra::http::HttpState;

#[derive(Default)]
pub struct MemoryCacheRepo {
    pub rows: Mutex<HashMap<String, CacheRecord>>,
    pub offline: AtomicBool,
}

impl MemoryCacheRepo {
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), RepoError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheRepo for MemoryCacheRepo {
    async fn upsert(&self, key: &CacheKey, value: &CacheValue) -> Result<(), RepoError> {
        self.ensure_online()?;
        let mut rows = self.rows.lock().await;
        let next_id = rows.len() as i32 + 1;
        let now = OffsetDateTime::now_utc();
        let row = rows
            .entry(key.as_str().to_string())
            .or_insert_with(|| CacheRecord {
                id: next_id,
                key: key.as_str().to_string(),
                value: String::new(),
                state: RecordState::Active,
                created_at: now,
                updated_at: now,
            });
        row.value = value.as_str().to_string();
        row.state = RecordState::Active;
        row.updated_at = now;
        Ok(())
    }

    async fn find_active(&self, key: &CacheKey) -> Result<Option<CacheRecord>, RepoError> {
        self.ensure_online()?;
        let rows = self.rows.lock().await;
        Ok(rows
            .get(key.as_str())
            .filter(|row| row.state == RecordState::Active)
            .cloned())
    }

    async fn soft_delete(&self, key: &CacheKey) -> Result<(), RepoError> {
        self.ensure_online()?;
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows
            .get_mut(key.as_str())
            .filter(|row| row.state == RecordState::Active)
        {
            row.state = RecordState::Deleted;
            row.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn check_connection(&self) -> Result<(), RepoError> {
        self.ensure_online()
    }
}

pub fn memory_state() -> (HttpState, Arc<MemoryCacheRepo>) {
    let repo = Arc::new(MemoryCacheRepo::default());
    let cache_repo: Arc<dyn CacheRepo> = repo.clone();
    let state = HttpState {
        cache: Arc::new(CacheService::new(cache_repo)),
    };
    (state, repo)
}
