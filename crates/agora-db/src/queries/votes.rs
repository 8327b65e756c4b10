//! The voter set. A `user_vote` row marks that a user has voted on a post and
//! in which direction; `post.vote_count` is adjusted in the same transaction
//! as every membership change.

use agora_types::{Post, User, VoteDirection, VoteOutcome};
use anyhow::Result;
use rusqlite::Connection;
use tracing::{debug, warn};

use super::{OptionalExt, collect_rows};
use crate::Database;
use crate::error::DbError;
use crate::models::{POST_COLUMNS, PostRow, USER_COLUMNS, UserRow};

impl Database {
    pub fn already_voted(&self, post_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| already_voted(conn, post_id, user_id))
    }

    pub fn vote_direction(&self, post_id: i64, user_id: i64) -> Result<Option<VoteDirection>> {
        self.with_conn(|conn| vote_direction(conn, post_id, user_id))
    }

    pub fn up_vote(&self, post_id: i64, user_id: i64) -> Result<VoteOutcome> {
        self.with_tx(|tx| cast_vote(tx, post_id, user_id, VoteDirection::Up))
    }

    pub fn down_vote(&self, post_id: i64, user_id: i64) -> Result<VoteOutcome> {
        self.with_tx(|tx| cast_vote(tx, post_id, user_id, VoteDirection::Down))
    }

    pub fn retract_vote(&self, post_id: i64, user_id: i64) -> Result<Option<VoteDirection>> {
        self.with_tx(|tx| retract_vote(tx, post_id, user_id))
    }

    pub fn post_voters(&self, post_id: i64) -> Result<Vec<User>> {
        self.with_conn(|conn| post_voters(conn, post_id))
    }

    /// Posts a user has voted on, newest first.
    pub fn user_voted_posts(&self, user_id: i64) -> Result<Vec<Post>> {
        self.with_conn(|conn| user_voted_posts(conn, user_id))
    }

    pub fn recount_votes(&self, post_id: i64) -> Result<i64> {
        self.with_tx(|tx| recount_votes(tx, post_id))
    }
}

pub fn already_voted(conn: &Connection, post_id: i64, user_id: i64) -> Result<bool> {
    Ok(vote_direction(conn, post_id, user_id)?.is_some())
}

pub fn vote_direction(conn: &Connection, post_id: i64, user_id: i64) -> Result<Option<VoteDirection>> {
    let value: Option<i64> = conn
        .query_row(
            "SELECT direction FROM user_vote WHERE post_id = ?1 AND user_id = ?2",
            [post_id, user_id],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        Some(value) => VoteDirection::from_delta(value)
            .map(Some)
            .ok_or_else(|| DbError::CorruptVote { post_id, value }.into()),
        None => Ok(None),
    }
}

/// Add `user_id` to the post's voter set and move `vote_count` by the vote's
/// delta. A user already in the voter set is left alone, whatever direction
/// they voted. Run inside a transaction so membership and count change
/// together.
pub fn cast_vote(
    conn: &Connection,
    post_id: i64,
    user_id: i64,
    direction: VoteDirection,
) -> Result<VoteOutcome> {
    ensure_post(conn, post_id)?;

    if already_voted(conn, post_id, user_id)? {
        debug!("User {} already voted on post {}", user_id, post_id);
        return Ok(VoteOutcome::AlreadyVoted);
    }

    conn.execute(
        "INSERT INTO user_vote (user_id, post_id, direction) VALUES (?1, ?2, ?3)",
        [user_id, post_id, direction.delta()],
    )?;
    adjust_vote(conn, post_id, direction.delta())?;

    debug!("User {} voted {:?} on post {}", user_id, direction, post_id);
    Ok(VoteOutcome::Cast)
}

/// Remove `user_id` from the voter set and undo their delta. Returns the
/// direction that was removed, `None` if the user had not voted.
pub fn retract_vote(conn: &Connection, post_id: i64, user_id: i64) -> Result<Option<VoteDirection>> {
    ensure_post(conn, post_id)?;

    let Some(direction) = vote_direction(conn, post_id, user_id)? else {
        return Ok(None);
    };

    conn.execute(
        "DELETE FROM user_vote WHERE post_id = ?1 AND user_id = ?2",
        [post_id, user_id],
    )?;
    adjust_vote(conn, post_id, -direction.delta())?;

    debug!("User {} retracted {:?} vote on post {}", user_id, direction, post_id);
    Ok(Some(direction))
}

fn adjust_vote(conn: &Connection, post_id: i64, amount: i64) -> Result<()> {
    // In-SQL increment so concurrent writers cannot lose an update
    conn.execute(
        "UPDATE post SET vote_count = COALESCE(vote_count, 0) + ?1 WHERE id = ?2",
        [amount, post_id],
    )?;
    Ok(())
}

fn ensure_post(conn: &Connection, post_id: i64) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row("SELECT 1 FROM post WHERE id = ?1", [post_id], |row| row.get(0))
        .optional()?;

    match exists {
        Some(_) => Ok(()),
        None => Err(DbError::NotFound { entity: "post", id: post_id }.into()),
    }
}

pub fn post_voters(conn: &Connection, post_id: i64) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM user_vote v JOIN user u ON u.id = v.user_id
         WHERE v.post_id = ?1
         ORDER BY u.id",
        USER_COLUMNS
    ))?;

    collect_rows(&mut stmt, [post_id], UserRow::from_row)
}

pub fn user_voted_posts(conn: &Connection, user_id: i64) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM user_vote v JOIN post p ON p.id = v.post_id
         WHERE v.user_id = ?1
         ORDER BY p.timestamp DESC, p.id DESC",
        POST_COLUMNS
    ))?;

    collect_rows(&mut stmt, [user_id], PostRow::from_row)
}

/// Rebuild `vote_count` from the stored vote directions. Returns the
/// corrected count.
pub fn recount_votes(conn: &Connection, post_id: i64) -> Result<i64> {
    let stored: Option<i64> = conn
        .query_row("SELECT vote_count FROM post WHERE id = ?1", [post_id], |row| row.get(0))
        .optional()?
        .ok_or(DbError::NotFound { entity: "post", id: post_id })?;

    let tally: i64 = conn.query_row(
        "SELECT COALESCE(SUM(direction), 0) FROM user_vote WHERE post_id = ?1",
        [post_id],
        |row| row.get(0),
    )?;

    if stored != Some(tally) {
        warn!(
            "Post {} vote_count drifted ({:?} stored, {} from votes); repairing",
            post_id, stored, tally
        );
        conn.execute("UPDATE post SET vote_count = ?1 WHERE id = ?2", [tally, post_id])?;
    }

    Ok(tally)
}
