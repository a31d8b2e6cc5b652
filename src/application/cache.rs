use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::application::repos::{CacheRepo, RepoError};
use crate::domain::cache::{
    CacheKey, ProjectedValue, ScalarInput, ValidationErrors, validate_entry,
};

const TARGET: &str = "kvcache::application::cache";

#[derive(Debug, Error)]
pub enum CacheServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Read-side view of an active record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntryView {
    pub key: String,
    pub value: ProjectedValue,
}

#[derive(Clone)]
pub struct CacheService {
    repo: Arc<dyn CacheRepo>,
}

impl CacheService {
    pub fn new(repo: Arc<dyn CacheRepo>) -> Self {
        Self { repo }
    }

    pub async fn write(
        &self,
        key: Option<ScalarInput>,
        value: Option<ScalarInput>,
    ) -> Result<CacheKey, CacheServiceError> {
        let (key, value) = validate_entry(key, value).inspect_err(|_| record_rejection())?;
        self.repo.upsert(&key, &value).await?;
        counter!("kvcache_write_total").increment(1);
        debug!(target: TARGET, key = %key, "cache entry written");
        Ok(key)
    }

    pub async fn read(&self, key: &str) -> Result<Option<CacheEntryView>, CacheServiceError> {
        let key = CacheKey::parse(key).inspect_err(|_| record_rejection())?;
        let Some(record) = self.repo.find_active(&key).await? else {
            counter!("kvcache_read_miss_total").increment(1);
            return Ok(None);
        };
        counter!("kvcache_read_hit_total").increment(1);

        Ok(Some(CacheEntryView {
            value: ProjectedValue::project(&record.value),
            key: record.key,
        }))
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheServiceError> {
        let key = CacheKey::parse(key).inspect_err(|_| record_rejection())?;
        self.repo.soft_delete(&key).await?;
        counter!("kvcache_delete_total").increment(1);
        debug!(target: TARGET, key = %key, "cache entry soft-deleted");
        Ok(())
    }

    pub async fn check_connection(&self) -> Result<(), RepoError> {
        self.repo.check_connection().await
    }
}

fn record_rejection() {
    counter!("kvcache_validation_failure_total").increment(1);
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use tokio::sync::Mutex;

    use super::*;
    use crate::domain::cache::{CacheRecord, CacheValue, Constraint, Field, RecordState};

    #[derive(Default)]
    struct MemoryRepo {
        rows: Mutex<HashMap<String, CacheRecord>>,
    }

    #[async_trait]
    impl CacheRepo for MemoryRepo {
        async fn upsert(&self, key: &CacheKey, value: &CacheValue) -> Result<(), RepoError> {
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
            let rows = self.rows.lock().await;
            Ok(rows
                .get(key.as_str())
                .filter(|row| row.state == RecordState::Active)
                .cloned())
        }

        async fn soft_delete(&self, key: &CacheKey) -> Result<(), RepoError> {
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
            Ok(())
        }
    }

    fn service() -> (CacheService, Arc<MemoryRepo>) {
        let repo = Arc::new(MemoryRepo::default());
        (CacheService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn write_then_read_returns_value() {
        let (service, _) = service();
        service
            .write(Some("greeting".into()), Some("hello".into()))
            .await
            .expect("write");

        let view = service.read("greeting").await.expect("read").expect("present");
        assert_eq!(view.key, "greeting");
        assert_eq!(view.value, ProjectedValue::Text("hello".into()));
    }

    #[tokio::test]
    async fn second_write_overwrites_in_place() {
        let (service, repo) = service();
        service
            .write(Some("k".into()), Some("first".into()))
            .await
            .unwrap();
        service
            .write(Some("k".into()), Some("second".into()))
            .await
            .unwrap();

        assert_eq!(repo.rows.lock().await.len(), 1);
        let view = service.read("k").await.unwrap().unwrap();
        assert_eq!(view.value, ProjectedValue::Text("second".into()));
    }

    #[tokio::test]
    async fn delete_hides_and_rewrite_revives() {
        let (service, repo) = service();
        service
            .write(Some("k".into()), Some("old".into()))
            .await
            .unwrap();
        service.delete("k").await.unwrap();
        assert!(service.read("k").await.unwrap().is_none());
        assert_eq!(
            repo.rows.lock().await.get("k").map(|row| row.state),
            Some(RecordState::Deleted)
        );

        service
            .write(Some("k".into()), Some("new".into()))
            .await
            .unwrap();
        let view = service.read("k").await.unwrap().unwrap();
        assert_eq!(view.value, ProjectedValue::Text("new".into()));
    }

    #[tokio::test]
    async fn delete_touches_only_active_rows() {
        let (service, repo) = service();
        service
            .write(Some("k".into()), Some("v".into()))
            .await
            .unwrap();
        let written = repo.rows.lock().await["k"].clone();

        service.delete("k").await.unwrap();
        let deleted = repo.rows.lock().await["k"].clone();
        assert!(deleted.state.is_deleted());
        assert!(deleted.updated_at >= written.updated_at);
        assert_eq!(deleted.created_at, written.created_at);

        service.delete("k").await.unwrap();
        assert_eq!(repo.rows.lock().await["k"], deleted);
    }

    #[tokio::test]
    async fn deleting_unknown_key_succeeds() {
        let (service, _) = service();
        service.delete("never-written").await.expect("no-op delete");
    }

    #[tokio::test]
    async fn numeric_key_is_stored_as_decimal_text() {
        let (service, repo) = service();
        let key = service
            .write(Some(42_u64.into()), Some(7_u64.into()))
            .await
            .unwrap();
        assert_eq!(key.as_str(), "42");
        assert_eq!(
            repo.rows.lock().await.get("42").map(|row| row.value.clone()),
            Some("7".to_string())
        );

        let view = service.read("42").await.unwrap().unwrap();
        assert_eq!(view.value, ProjectedValue::Number(7_u64.into()));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_store() {
        let (service, repo) = service();
        let err = service
            .write(Some("".into()), Some("x".into()))
            .await
            .unwrap_err();
        match err {
            CacheServiceError::Validation(errors) => {
                assert!(errors.cites(Field::Key, Constraint::TooShort));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(repo.rows.lock().await.is_empty());

        let long_key = "k".repeat(1000);
        assert!(matches!(
            service.read(&long_key).await,
            Err(CacheServiceError::Validation(_))
        ));
    }
}
