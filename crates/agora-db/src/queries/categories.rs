use agora_types::{Category, Post};
use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

use super::{OptionalExt, collect_rows};
use crate::Database;
use crate::error::map_unique;
use crate::models::{CATEGORY_COLUMNS, CategoryRow, POST_COLUMNS, PostRow};

impl Database {
    pub fn create_category(&self, title: &str) -> Result<Category> {
        self.with_conn_mut(|conn| insert_category(conn, title))
    }

    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        self.with_conn(|conn| query_category(conn, id))
    }

    pub fn get_category_by_title(&self, title: &str) -> Result<Option<Category>> {
        self.with_conn(|conn| query_category_by_title(conn, title))
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(list_categories)
    }

    /// Posts filed under a category, newest first.
    pub fn category_posts(&self, category_id: i64) -> Result<Vec<Post>> {
        self.with_conn(|conn| category_posts(conn, category_id))
    }
}

pub fn insert_category(conn: &Connection, title: &str) -> Result<Category> {
    conn.execute("INSERT INTO category (title) VALUES (?1)", [title])
        .map_err(|e| map_unique(e, "category"))?;

    let id = conn.last_insert_rowid();
    debug!("Created category {} ({})", id, title);

    Ok(Category {
        id,
        title: title.to_string(),
    })
}

pub fn query_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM category c WHERE c.id = ?1", CATEGORY_COLUMNS),
            [id],
            CategoryRow::from_row,
        )
        .optional()?;

    Ok(row.map(Category::from))
}

pub fn query_category_by_title(conn: &Connection, title: &str) -> Result<Option<Category>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM category c WHERE c.title = ?1", CATEGORY_COLUMNS),
            [title],
            CategoryRow::from_row,
        )
        .optional()?;

    Ok(row.map(Category::from))
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM category c ORDER BY c.title",
        CATEGORY_COLUMNS
    ))?;

    collect_rows(&mut stmt, [], CategoryRow::from_row)
}

pub fn category_posts(conn: &Connection, category_id: i64) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM post p WHERE p.category_id = ?1 ORDER BY p.timestamp DESC, p.id DESC",
        POST_COLUMNS
    ))?;

    collect_rows(&mut stmt, [category_id], PostRow::from_row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use agora_types::{NewPost, NewUser};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn create_fetch_and_list() {
        let db = Database::open_in_memory().unwrap();
        let news = db.create_category("news").unwrap();
        db.create_category("ask").unwrap();

        assert_eq!(db.get_category(news.id).unwrap().unwrap().title, "news");
        assert_eq!(db.get_category_by_title("news").unwrap().unwrap().id, news.id);
        assert!(db.get_category_by_title("missing").unwrap().is_none());

        let titles: Vec<String> = db
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["ask", "news"]);
    }

    #[test]
    fn duplicate_title_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_category("news").unwrap();

        let err = db.create_category("news").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DbError>(),
            Some(DbError::Duplicate { entity: "category", .. })
        ));
    }

    #[test]
    fn posts_listed_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let john = db
            .create_user(&NewUser::new("john", "john@beatles.com", "yoko"))
            .unwrap();
        let news = db.create_category("news").unwrap();
        let ask = db.create_category("ask").unwrap();
        let base = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();

        for (i, title) in ["old", "newest", "middle"].iter().enumerate() {
            let offset = match i {
                0 => 0,
                1 => 120,
                _ => 60,
            };
            db.create_post(
                &NewPost::new(*title, "body", john.id)
                    .in_category(news.id)
                    .at(base + Duration::minutes(offset)),
            )
            .unwrap();
        }
        db.create_post(&NewPost::new("elsewhere", "body", john.id).in_category(ask.id))
            .unwrap();

        let titles: Vec<String> = db
            .category_posts(news.id)
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["newest", "middle", "old"]);
    }

    #[test]
    fn backref_listings_of_missing_parents_are_empty() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.category_posts(42).unwrap().is_empty());
        assert!(db.user_posts(42).unwrap().is_empty());
        assert!(db.post_comments(42).unwrap().is_empty());
        assert!(db.user_comments(42).unwrap().is_empty());
        assert!(db.post_voters(42).unwrap().is_empty());
        assert!(db.user_voted_posts(42).unwrap().is_empty());
    }
}
