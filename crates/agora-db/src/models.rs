//! Database row types. These map directly to SQLite rows and stay distinct
//! from the `agora-types` models so the schema can change independently;
//! timestamps stay as stored text until converted.

use agora_types::{Category, Comment, Post, User};
use rusqlite::Row;

use crate::error::DbError;
use crate::timestamp;

/// Column lists matching the `from_row` readers below. Queries alias the
/// tables as `u`, `c`, `p` and `m` respectively.
pub(crate) const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.last_seen";
pub(crate) const CATEGORY_COLUMNS: &str = "c.id, c.title";
pub(crate) const POST_COLUMNS: &str =
    "p.id, p.title, p.body, p.timestamp, p.user_id, p.category_id, p.vote_count";
pub(crate) const COMMENT_COLUMNS: &str = "m.id, m.body, m.timestamp, m.user_id, m.post_id";

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub last_seen: String,
}

pub struct CategoryRow {
    pub id: i64,
    pub title: String,
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub timestamp: String,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub vote_count: i64,
}

pub struct CommentRow {
    pub id: i64,
    pub body: String,
    pub timestamp: String,
    pub user_id: i64,
    pub post_id: i64,
}

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            last_seen: row.get(4)?,
        })
    }
}

impl CategoryRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
        })
    }
}

impl PostRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            body: row.get(2)?,
            timestamp: row.get(3)?,
            user_id: row.get(4)?,
            category_id: row.get(5)?,
            // Rows written outside this crate may carry NULL
            vote_count: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
        })
    }
}

impl CommentRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            body: row.get(1)?,
            timestamp: row.get(2)?,
            user_id: row.get(3)?,
            post_id: row.get(4)?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, DbError> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            last_seen: timestamp::from_sql(&row.last_seen)?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            title: row.title,
        }
    }
}

impl TryFrom<PostRow> for Post {
    type Error = DbError;

    fn try_from(row: PostRow) -> Result<Self, DbError> {
        Ok(Post {
            id: row.id,
            title: row.title,
            body: row.body,
            timestamp: timestamp::from_sql(&row.timestamp)?,
            user_id: row.user_id,
            category_id: row.category_id,
            vote_count: row.vote_count,
        })
    }
}

impl TryFrom<CommentRow> for Comment {
    type Error = DbError;

    fn try_from(row: CommentRow) -> Result<Self, DbError> {
        Ok(Comment {
            id: row.id,
            body: row.body,
            timestamp: timestamp::from_sql(&row.timestamp)?,
            user_id: row.user_id,
            post_id: row.post_id,
        })
    }
}
