use anyhow::Result;
use tracing::debug;

use crate::models::User;

/// Resolves the identifier a session layer stored at login back into a user.
///
/// `Ok(None)` means "no such user" (including identifiers that are not
/// numeric); `Err` is reserved for storage failures.
pub trait UserLoader {
    fn load_user(&self, id: &str) -> Result<Option<User>>;
}

/// Parse a session identifier into a user id.
pub fn parse_user_id(id: &str) -> Option<i64> {
    match id.trim().parse::<i64>() {
        Ok(id) => Some(id),
        Err(e) => {
            debug!("Ignoring malformed user id '{}': {}", id, e);
            None
        }
    }
}
