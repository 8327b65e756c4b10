use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Comment, Post};

/// Read-only projection of a post for the templating layer.
/// Everything a listing page needs, rendered once.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub body_html: String,
    pub author_username: String,
    pub category_id: Option<i64>,
    pub vote_count: i64,
    pub comment_count: i64,
    pub timestamp: DateTime<Utc>,
    pub pretty_timestamp: String,
}

impl PostView {
    pub fn new(post: &Post, author_username: String, comment_count: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            body_html: post.body_as_html(),
            author_username,
            category_id: post.category_id,
            vote_count: post.vote_count,
            comment_count,
            timestamp: post.timestamp,
            pretty_timestamp: post.pretty_timestamp_at(now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub body_html: String,
    pub author_username: String,
    pub timestamp: DateTime<Utc>,
    pub pretty_timestamp: String,
}

impl CommentView {
    pub fn new(comment: &Comment, author_username: String, now: DateTime<Utc>) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            body_html: comment.body_as_html(),
            author_username,
            timestamp: comment.timestamp,
            pretty_timestamp: comment.pretty_timestamp_at(now),
        }
    }
}
