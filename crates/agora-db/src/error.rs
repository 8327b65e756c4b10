use rusqlite::ffi;
use thiserror::Error;

/// Failures a caller may want to tell apart. Returned inside
/// `anyhow::Error`; match with `err.downcast_ref::<DbError>()`.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} already exists: {detail}")]
    Duplicate { entity: &'static str, detail: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("corrupt timestamp '{value}'")]
    CorruptTimestamp { value: String },

    #[error("corrupt vote direction {value} on post {post_id}")]
    CorruptVote { post_id: i64, value: i64 },

    #[error("DB lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Classify UNIQUE / PRIMARY KEY violations as `Duplicate`; anything else
/// passes through unchanged.
pub(crate) fn map_unique(err: rusqlite::Error, entity: &'static str) -> anyhow::Error {
    match &err {
        rusqlite::Error::SqliteFailure(code, message)
            if code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            DbError::Duplicate {
                entity,
                detail: message.clone().unwrap_or_else(|| err.to_string()),
            }
            .into()
        }
        _ => err.into(),
    }
}
