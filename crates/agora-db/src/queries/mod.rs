//! Query functions grouped by table. Each takes an explicit `&Connection`
//! (a `Transaction` derefs to one) and `Database` exposes a locked wrapper
//! for each.

pub mod categories;
pub mod comments;
pub mod posts;
pub mod users;
pub mod votes;

use anyhow::Result;
use rusqlite::{Params, Row, Statement};

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Run a prepared query, read each row with `read` and convert it into a
/// model with `TryFrom`.
pub(crate) fn collect_rows<R, M, P>(
    stmt: &mut Statement<'_>,
    params: P,
    read: fn(&Row<'_>) -> rusqlite::Result<R>,
) -> Result<Vec<M>>
where
    P: Params,
    M: TryFrom<R>,
    <M as TryFrom<R>>::Error: std::error::Error + Send + Sync + 'static,
{
    let rows = stmt
        .query_map(params, read)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let models = rows
        .into_iter()
        .map(M::try_from)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(models)
}
