use agora_types::{Comment, CommentView, NewComment};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use super::{OptionalExt, collect_rows};
use crate::Database;
use crate::error::DbError;
use crate::models::{COMMENT_COLUMNS, CommentRow};
use crate::timestamp;

impl Database {
    pub fn create_comment(&self, new: &NewComment) -> Result<Comment> {
        self.with_conn_mut(|conn| insert_comment(conn, new))
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    /// Comments on a post, newest first.
    pub fn post_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        self.with_conn(|conn| post_comments(conn, post_id))
    }

    /// Comments written by a user, newest first.
    pub fn user_comments(&self, user_id: i64) -> Result<Vec<Comment>> {
        self.with_conn(|conn| user_comments(conn, user_id))
    }

    pub fn post_comment_views(&self, post_id: i64, now: DateTime<Utc>) -> Result<Vec<CommentView>> {
        self.with_conn(|conn| post_comment_views(conn, post_id, now))
    }
}

pub fn insert_comment(conn: &Connection, new: &NewComment) -> Result<Comment> {
    let timestamp = timestamp::to_sql(&new.timestamp.unwrap_or_else(Utc::now));

    conn.execute(
        "INSERT INTO comment (body, timestamp, user_id, post_id) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![new.body, timestamp, new.user_id, new.post_id],
    )?;

    let id = conn.last_insert_rowid();
    debug!("Created comment {} on post {}", id, new.post_id);

    query_comment(conn, id)?.ok_or_else(|| DbError::NotFound { entity: "comment", id }.into())
}

pub fn query_comment(conn: &Connection, id: i64) -> Result<Option<Comment>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM comment m WHERE m.id = ?1", COMMENT_COLUMNS),
            [id],
            CommentRow::from_row,
        )
        .optional()?;

    match row {
        Some(row) => Ok(Some(Comment::try_from(row)?)),
        None => Ok(None),
    }
}

pub fn post_comments(conn: &Connection, post_id: i64) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM comment m WHERE m.post_id = ?1 ORDER BY m.timestamp DESC, m.id DESC",
        COMMENT_COLUMNS
    ))?;

    collect_rows(&mut stmt, [post_id], CommentRow::from_row)
}

pub fn user_comments(conn: &Connection, user_id: i64) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM comment m WHERE m.user_id = ?1 ORDER BY m.timestamp DESC, m.id DESC",
        COMMENT_COLUMNS
    ))?;

    collect_rows(&mut stmt, [user_id], CommentRow::from_row)
}

pub fn post_comment_views(
    conn: &Connection,
    post_id: i64,
    now: DateTime<Utc>,
) -> Result<Vec<CommentView>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, u.username FROM comment m
         LEFT JOIN user u ON u.id = m.user_id
         WHERE m.post_id = ?1
         ORDER BY m.timestamp DESC, m.id DESC",
        COMMENT_COLUMNS
    ))?;

    let rows = stmt
        .query_map([post_id], |row| {
            Ok((CommentRow::from_row(row)?, row.get::<_, Option<String>>(5)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(row, username)| -> Result<CommentView> {
            let comment = Comment::try_from(row)?;
            let author = username.unwrap_or_else(|| "unknown".to_string());
            Ok(CommentView::new(&comment, author, now))
        })
        .collect()
}
