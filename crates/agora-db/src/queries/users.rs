use agora_types::loader::parse_user_id;
use agora_types::{NewUser, User, UserLoader};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use super::OptionalExt;
use crate::Database;
use crate::error::{DbError, map_unique};
use crate::models::{USER_COLUMNS, UserRow};
use crate::timestamp;

impl Database {
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        // Hash before taking the connection lock
        let password_hash = new.password_hash()?;
        self.with_conn_mut(|conn| insert_user(conn, new, &password_hash))
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn set_password(&self, user_id: i64, plaintext: &str) -> Result<()> {
        let password_hash = agora_crypto::hash_password(plaintext)?;
        self.with_conn_mut(|conn| set_password_hash(conn, user_id, &password_hash))
    }

    pub fn check_password(&self, user_id: i64, plaintext: &str) -> Result<bool> {
        self.with_conn(|conn| check_password(conn, user_id, plaintext))
    }

    pub fn touch_last_seen(&self, user_id: i64, at: DateTime<Utc>) -> Result<()> {
        self.with_conn_mut(|conn| touch_last_seen(conn, user_id, at))
    }
}

impl UserLoader for Database {
    fn load_user(&self, id: &str) -> Result<Option<User>> {
        match parse_user_id(id) {
            Some(id) => self.get_user(id),
            None => Ok(None),
        }
    }
}

/// Insert a user with an already derived `password_hash`; `new.password`
/// is not read.
pub fn insert_user(conn: &Connection, new: &NewUser, password_hash: &str) -> Result<User> {
    let now = timestamp::to_sql(&Utc::now());

    conn.execute(
        "INSERT INTO user (username, email, password_hash, last_seen) VALUES (?1, ?2, ?3, ?4)",
        (&new.username, &new.email, password_hash, &now),
    )
    .map_err(|e| map_unique(e, "user"))?;

    let id = conn.last_insert_rowid();
    debug!("Created user {} ({})", id, new.username);

    query_user(conn, id)?.ok_or_else(|| DbError::NotFound { entity: "user", id }.into())
}

pub fn query_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    query_user_where(conn, "u.id = ?1", id)
}

pub fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    query_user_where(conn, "u.username = ?1", username)
}

pub fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    query_user_where(conn, "u.email = ?1", email)
}

fn query_user_where<P: rusqlite::ToSql>(
    conn: &Connection,
    predicate: &str,
    value: P,
) -> Result<Option<User>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {} FROM user u WHERE {}", USER_COLUMNS, predicate))?;

    let row = stmt.query_row([value], UserRow::from_row).optional()?;

    match row {
        Some(row) => Ok(Some(User::try_from(row)?)),
        None => Ok(None),
    }
}

/// Store an already derived hash as the user's password.
pub fn set_password_hash(conn: &Connection, user_id: i64, password_hash: &str) -> Result<()> {
    let updated = conn.execute(
        "UPDATE user SET password_hash = ?1 WHERE id = ?2",
        (password_hash, user_id),
    )?;

    if updated == 0 {
        return Err(DbError::NotFound { entity: "user", id: user_id }.into());
    }
    Ok(())
}

/// Verify `plaintext` against the stored hash. Unknown users never match.
pub fn check_password(conn: &Connection, user_id: i64, plaintext: &str) -> Result<bool> {
    Ok(query_user(conn, user_id)?
        .map(|user| user.check_password(plaintext))
        .unwrap_or(false))
}

pub fn touch_last_seen(conn: &Connection, user_id: i64, at: DateTime<Utc>) -> Result<()> {
    let updated = conn.execute(
        "UPDATE user SET last_seen = ?1 WHERE id = ?2",
        (timestamp::to_sql(&at), user_id),
    )?;

    if updated == 0 {
        return Err(DbError::NotFound { entity: "user", id: user_id }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn db_with_john() -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .create_user(&NewUser::new("john", "john@beatles.com", "yoko"))
            .unwrap();
        (db, user)
    }

    #[test]
    fn create_and_fetch() {
        let (db, john) = db_with_john();
        assert_eq!(john.username, "john");
        assert_ne!(john.password_hash, "yoko");

        let by_name = db.get_user_by_username("john").unwrap().unwrap();
        let by_email = db.get_user_by_email("john@beatles.com").unwrap().unwrap();
        assert_eq!(by_name.id, john.id);
        assert_eq!(by_email.id, john.id);
        assert!(db.get_user(john.id + 100).unwrap().is_none());
    }

    #[test]
    fn stored_password_checks() {
        let (db, john) = db_with_john();
        assert!(john.check_password("yoko"));
        assert!(db.check_password(john.id, "yoko").unwrap());
        assert!(!db.check_password(john.id, "paul").unwrap());
        assert!(!db.check_password(john.id + 100, "yoko").unwrap());
    }

    #[test]
    fn set_password_replaces_hash() {
        let (db, john) = db_with_john();
        db.set_password(john.id, "ringo").unwrap();
        assert!(db.check_password(john.id, "ringo").unwrap());
        assert!(!db.check_password(john.id, "yoko").unwrap());

        let err = db.set_password(john.id + 100, "x").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::NotFound { entity: "user", .. })
        ));
    }

    #[test]
    fn duplicate_username_and_email_rejected() {
        let (db, _) = db_with_john();

        let err = db
            .create_user(&NewUser::new("john", "other@beatles.com", "x"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::Duplicate { entity: "user", .. })
        ));

        let err = db
            .create_user(&NewUser::new("paul", "john@beatles.com", "x"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::Duplicate { entity: "user", .. })
        ));
    }

    #[test]
    fn insert_stores_the_given_hash() {
        let db = Database::open_in_memory().unwrap();
        let hash = agora_crypto::hash_password("yoko").unwrap();

        let user = db
            .with_conn_mut(|conn| {
                insert_user(conn, &NewUser::new("john", "john@beatles.com", "ignored"), &hash)
            })
            .unwrap();
        assert_eq!(user.password_hash, hash);
        assert!(db.check_password(user.id, "yoko").unwrap());
        assert!(!db.check_password(user.id, "ignored").unwrap());

        let replacement = agora_crypto::hash_password("ringo").unwrap();
        db.with_conn_mut(|conn| set_password_hash(conn, user.id, &replacement))
            .unwrap();
        assert!(db.check_password(user.id, "ringo").unwrap());
    }

    #[test]
    fn last_seen_updates() {
        let (db, john) = db_with_john();
        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        db.touch_last_seen(john.id, at).unwrap();
        assert_eq!(db.get_user(john.id).unwrap().unwrap().last_seen, at);
    }

    #[test]
    fn loader_resolves_session_ids() {
        let (db, john) = db_with_john();
        let loaded = db.load_user(&john.id.to_string()).unwrap().unwrap();
        assert_eq!(loaded.username, "john");
        assert!(db.load_user("9999").unwrap().is_none());
        assert!(db.load_user("not-a-number").unwrap().is_none());
    }
}
