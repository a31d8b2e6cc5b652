use sqlx::error::DatabaseError;

use crate::application::repos::RepoError;

const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const QUERY_CANCELED: &str = "57014";
const INTEGRITY_CLASS: &str = "23";

const KEY_LENGTH_CONSTRAINT: &str = "cache_key_length";
const VALUE_LENGTH_CONSTRAINT: &str = "cache_value_length";

/// Classify a driver error by SQLSTATE, naming the `cache` column behind a
/// length check when Postgres reports one.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::Database(db) => map_database_error(&*db),
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

fn map_database_error(db: &dyn DatabaseError) -> RepoError {
    let code = db.code().unwrap_or_default();
    match code.as_ref() {
        UNIQUE_VIOLATION => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        CHECK_VIOLATION => match db.constraint() {
            Some(KEY_LENGTH_CONSTRAINT) => length_violation("key"),
            Some(VALUE_LENGTH_CONSTRAINT) => length_violation("value"),
            _ => RepoError::Integrity {
                message: db.message().to_string(),
            },
        },
        INVALID_TEXT_REPRESENTATION => RepoError::InvalidInput {
            message: db.message().to_string(),
        },
        QUERY_CANCELED => RepoError::Timeout,
        code if code.starts_with(INTEGRITY_CLASS) => RepoError::Integrity {
            message: db.message().to_string(),
        },
        _ => RepoError::from_persistence(db.message()),
    }
}

fn length_violation(column: &str) -> RepoError {
    RepoError::InvalidInput {
        message: format!("{column} length is outside the stored bounds"),
    }
}
