use std::ops::ControlFlow;

use agora_types::{NewPost, Post, PostCursor, PostEdit, PostView};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use super::{OptionalExt, collect_rows};
use crate::Database;
use crate::error::DbError;
use crate::models::{POST_COLUMNS, PostRow};
use crate::timestamp;

impl Database {
    pub fn create_post(&self, new: &NewPost) -> Result<Post> {
        self.with_conn_mut(|conn| insert_post(conn, new))
    }

    pub fn get_post(&self, id: i64) -> Result<Option<Post>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    pub fn update_post(&self, id: i64, edit: &PostEdit) -> Result<Post> {
        self.with_conn_mut(|conn| update_post(conn, id, edit))
    }

    /// Posts written by a user, newest first.
    pub fn user_posts(&self, user_id: i64) -> Result<Vec<Post>> {
        self.with_conn(|conn| user_posts(conn, user_id))
    }

    /// One page of posts, newest first. Pass the cursor of the last post of
    /// the previous page (`Post::cursor`) as `before` to continue.
    pub fn recent_posts(&self, limit: u32, before: Option<PostCursor>) -> Result<Vec<Post>> {
        self.with_conn(|conn| recent_posts(conn, limit, before))
    }

    /// Stream every post, newest first, without collecting them.
    /// Returns how many posts were visited.
    pub fn for_each_recent_post<F>(&self, f: F) -> Result<usize>
    where
        F: FnMut(Post) -> Result<ControlFlow<()>>,
    {
        self.with_conn(|conn| for_each_recent_post(conn, f))
    }

    pub fn recent_post_views(&self, limit: u32, now: DateTime<Utc>) -> Result<Vec<PostView>> {
        self.with_conn(|conn| recent_post_views(conn, limit, now))
    }

    pub fn post_view(&self, id: i64, now: DateTime<Utc>) -> Result<Option<PostView>> {
        self.with_conn(|conn| post_view(conn, id, now))
    }

    pub fn comment_count(&self, post_id: i64) -> Result<i64> {
        self.with_conn(|conn| comment_count(conn, post_id))
    }
}

pub fn insert_post(conn: &Connection, new: &NewPost) -> Result<Post> {
    let timestamp = timestamp::to_sql(&new.timestamp.unwrap_or_else(Utc::now));

    conn.execute(
        "INSERT INTO post (title, body, timestamp, user_id, category_id, vote_count)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        rusqlite::params![new.title, new.body, timestamp, new.user_id, new.category_id],
    )?;

    let id = conn.last_insert_rowid();
    debug!("Created post {} by user {}", id, new.user_id);

    query_post(conn, id)?.ok_or_else(|| DbError::NotFound { entity: "post", id }.into())
}

pub fn query_post(conn: &Connection, id: i64) -> Result<Option<Post>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM post p WHERE p.id = ?1", POST_COLUMNS),
            [id],
            PostRow::from_row,
        )
        .optional()?;

    match row {
        Some(row) => Ok(Some(Post::try_from(row)?)),
        None => Ok(None),
    }
}

/// Apply the set fields of `edit`; an empty edit only checks existence.
pub fn update_post(conn: &Connection, id: i64, edit: &PostEdit) -> Result<Post> {
    if !edit.is_empty() {
        conn.execute(
            "UPDATE post SET
                title = COALESCE(?1, title),
                body = COALESCE(?2, body),
                category_id = COALESCE(?3, category_id)
             WHERE id = ?4",
            rusqlite::params![edit.title, edit.body, edit.category_id, id],
        )?;
    }

    query_post(conn, id)?.ok_or_else(|| DbError::NotFound { entity: "post", id }.into())
}

pub fn user_posts(conn: &Connection, user_id: i64) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM post p WHERE p.user_id = ?1 ORDER BY p.timestamp DESC, p.id DESC",
        POST_COLUMNS
    ))?;

    collect_rows(&mut stmt, [user_id], PostRow::from_row)
}

/// Keyset page over `(timestamp, id)`, the same key the listing sorts by,
/// so posts sharing a timestamp are never skipped between pages.
pub fn recent_posts(
    conn: &Connection,
    limit: u32,
    before: Option<PostCursor>,
) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM post p
         WHERE ?1 IS NULL OR (p.timestamp, p.id) < (?1, ?2)
         ORDER BY p.timestamp DESC, p.id DESC
         LIMIT ?3",
        POST_COLUMNS
    ))?;

    let (before_ts, before_id) = match before {
        Some((ts, id)) => (Some(timestamp::to_sql(&ts)), Some(id)),
        None => (None, None),
    };
    collect_rows(
        &mut stmt,
        rusqlite::params![before_ts, before_id, limit],
        PostRow::from_row,
    )
}

/// Visit posts newest first, reading one row at a time. The callback stops
/// the scan early by returning `ControlFlow::Break`.
pub fn for_each_recent_post<F>(conn: &Connection, mut f: F) -> Result<usize>
where
    F: FnMut(Post) -> Result<ControlFlow<()>>,
{
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM post p ORDER BY p.timestamp DESC, p.id DESC",
        POST_COLUMNS
    ))?;

    let mut rows = stmt.query([])?;
    let mut visited = 0;
    while let Some(row) = rows.next()? {
        let post = Post::try_from(PostRow::from_row(row)?)?;
        visited += 1;
        if f(post)?.is_break() {
            break;
        }
    }

    Ok(visited)
}

// JOIN users and count comments in a single query (no N+1 per listing)
const VIEW_SELECT: &str = "
    SELECT p.id, p.title, p.body, p.timestamp, p.user_id, p.category_id, p.vote_count,
           u.username,
           (SELECT COUNT(*) FROM comment m WHERE m.post_id = p.id)
    FROM post p
    LEFT JOIN user u ON u.id = p.user_id";

fn read_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<(PostRow, Option<String>, i64)> {
    Ok((PostRow::from_row(row)?, row.get(7)?, row.get(8)?))
}

fn into_view(
    (row, username, comments): (PostRow, Option<String>, i64),
    now: DateTime<Utc>,
) -> Result<PostView> {
    let post = Post::try_from(row)?;
    let author = username.unwrap_or_else(|| "unknown".to_string());
    Ok(PostView::new(&post, author, comments, now))
}

pub fn recent_post_views(conn: &Connection, limit: u32, now: DateTime<Utc>) -> Result<Vec<PostView>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY p.timestamp DESC, p.id DESC LIMIT ?1",
        VIEW_SELECT
    ))?;

    let rows = stmt
        .query_map([limit], read_view)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(|row| into_view(row, now)).collect()
}

pub fn post_view(conn: &Connection, id: i64, now: DateTime<Utc>) -> Result<Option<PostView>> {
    let row = conn
        .query_row(&format!("{} WHERE p.id = ?1", VIEW_SELECT), [id], read_view)
        .optional()?;

    row.map(|row| into_view(row, now)).transpose()
}

pub fn comment_count(conn: &Connection, post_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM comment WHERE post_id = ?1",
        [post_id],
        |row| row.get(0),
    )?;
    Ok(count)
}
