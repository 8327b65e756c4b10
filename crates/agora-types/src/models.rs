use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agora_render::{markdown_to_html, pretty_date};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    pub last_seen: DateTime<Utc>,
}

impl User {
    /// Replace the stored hash with one derived from `plaintext`.
    /// Only the model changes; persisting it is the caller's job.
    pub fn set_password(&mut self, plaintext: &str) -> Result<()> {
        self.password_hash = agora_crypto::hash_password(plaintext)?;
        Ok(())
    }

    pub fn check_password(&self, plaintext: &str) -> bool {
        agora_crypto::verify_password(plaintext, &self.password_hash)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User {}>", self.username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

/// A post. `vote_count` is a denormalized tally kept in step with the
/// `user_vote` rows by the vote queries, never by direct assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    /// Markdown source.
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub vote_count: i64,
}

/// Keyset position of a post in newest-first listings.
pub type PostCursor = (DateTime<Utc>, i64);

impl Post {
    pub fn cursor(&self) -> PostCursor {
        (self.timestamp, self.id)
    }

    pub fn body_as_html(&self) -> String {
        markdown_to_html(&self.body)
    }

    pub fn pretty_timestamp(&self) -> String {
        self.pretty_timestamp_at(Utc::now())
    }

    pub fn pretty_timestamp_at(&self, now: DateTime<Utc>) -> String {
        pretty_date(self.timestamp, now)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Post {}>", self.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
    pub post_id: i64,
}

impl Comment {
    pub fn body_as_html(&self) -> String {
        markdown_to_html(&self.body)
    }

    pub fn pretty_timestamp(&self) -> String {
        self.pretty_timestamp_at(Utc::now())
    }

    pub fn pretty_timestamp_at(&self, now: DateTime<Utc>) -> String {
        pretty_date(self.timestamp, now)
    }
}

// -- Inserts --

/// A user to insert. Holds the plaintext password only until the insert
/// hashes it.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// Derive the hash stored in place of `password`.
    pub fn password_hash(&self) -> Result<String> {
        agora_crypto::hash_password(&self.password)
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub user_id: i64,
    pub category_id: Option<i64>,
    /// Defaults to the insert time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewPost {
    pub fn new(title: impl Into<String>, body: impl Into<String>, user_id: i64) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            user_id,
            category_id: None,
            timestamp: None,
        }
    }

    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub body: String,
    pub user_id: i64,
    pub post_id: i64,
    /// Defaults to the insert time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewComment {
    pub fn new(body: impl Into<String>, user_id: i64, post_id: i64) -> Self {
        Self {
            body: body.into(),
            user_id,
            post_id,
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Partial update of a post; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PostEdit {
    pub title: Option<String>,
    pub body: Option<String>,
    pub category_id: Option<i64>,
}

impl PostEdit {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.category_id.is_none()
    }
}

// -- Votes --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    /// Signed amount this vote contributes to `Post::vote_count`.
    pub fn delta(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    pub fn from_delta(delta: i64) -> Option<Self> {
        match delta {
            1 => Some(Self::Up),
            -1 => Some(Self::Down),
            _ => None,
        }
    }
}

/// Result of casting a vote. A user already in the voter set cannot vote
/// again in either direction until the existing vote is retracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Cast,
    AlreadyVoted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn john() -> User {
        User {
            id: 1,
            username: "john".into(),
            email: "john@beatles.com".into(),
            password_hash: String::new(),
            last_seen: Utc::now(),
        }
    }

    fn first_post() -> Post {
        Post {
            id: 1,
            title: "First post".into(),
            body: "Something *saucy*".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap(),
            user_id: 1,
            category_id: None,
            vote_count: 0,
        }
    }

    #[test]
    fn set_then_check_password() {
        let mut user = john();
        user.set_password("yoko").unwrap();
        assert!(user.check_password("yoko"));
        assert!(!user.check_password("paul"));
    }

    #[test]
    fn empty_hash_never_matches() {
        assert!(!john().check_password(""));
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let mut user = john();
        user.set_password("yoko").unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "john");
    }

    #[test]
    fn display_matches_repr() {
        assert_eq!(john().to_string(), "<User john>");
        assert_eq!(first_post().to_string(), "<Post First post>");
    }

    #[test]
    fn post_renders_body_and_timestamp() {
        let post = first_post();
        assert_eq!(post.body_as_html(), "<p>Something <em>saucy</em></p>\n");
        let now = post.timestamp + Duration::hours(3);
        assert_eq!(post.pretty_timestamp_at(now), "3 hours ago");
    }

    #[test]
    fn vote_direction_deltas() {
        assert_eq!(VoteDirection::Up.delta(), 1);
        assert_eq!(VoteDirection::Down.delta(), -1);
        assert_eq!(VoteDirection::from_delta(-1), Some(VoteDirection::Down));
        assert_eq!(VoteDirection::from_delta(0), None);
    }

    #[test]
    fn new_post_builder() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let post = NewPost::new("t", "b", 7).in_category(3).at(at);
        assert_eq!(post.user_id, 7);
        assert_eq!(post.category_id, Some(3));
        assert_eq!(post.timestamp, Some(at));
        assert!(PostEdit::default().is_empty());
    }
}
