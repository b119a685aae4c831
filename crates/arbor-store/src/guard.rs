//! Consistency guard: precondition checks shared by the create and read
//! paths, and classification of storage failures into the domain taxonomy.
//!
//! Raw driver errors never cross this boundary upward. They are logged here
//! and replaced by one of the `arbor_core::Error` kinds.

use std::collections::{HashMap, HashSet};

use arbor_core::{Error, PostDraft, Result, TreePath};
use sqlx::{PgConnection, Row};

use crate::directory::UserDirectory;

/// SQLSTATE classes the guard cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SqlstateKind {
    /// `23505`: duplicate unique key.
    UniqueViolation,
    /// `23503`: referenced row does not exist.
    ForeignKeyViolation,
    /// `57014`: statement timeout or cancellation.
    Canceled,
    /// Anything else.
    Other,
}

/// Classify a raw SQLSTATE code.
pub(crate) fn kind_for_sqlstate(code: &str) -> SqlstateKind {
    match code {
        "23505" => SqlstateKind::UniqueViolation,
        "23503" => SqlstateKind::ForeignKeyViolation,
        "57014" => SqlstateKind::Canceled,
        _ => SqlstateKind::Other,
    }
}

/// Map a storage failure to the domain taxonomy.
///
/// `what` names the subject for `NotFound` mapping and shows up in logs;
/// the driver's own message is logged, never returned.
pub(crate) fn map_db_error(what: &'static str, err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::RowNotFound => Error::not_found(what),
        sqlx::Error::Database(db) => {
            let kind = db
                .code()
                .map(|code| kind_for_sqlstate(code.as_ref()))
                .unwrap_or(SqlstateKind::Other);
            match kind {
                SqlstateKind::UniqueViolation => Error::conflict("duplicate key"),
                SqlstateKind::ForeignKeyViolation => {
                    Error::conflict("referenced row does not exist")
                }
                SqlstateKind::Canceled => {
                    tracing::warn!(subject = what, error = %db, "statement canceled");
                    Error::internal("statement timed out or was canceled")
                }
                SqlstateKind::Other => {
                    tracing::error!(subject = what, error = %db, "database error");
                    Error::internal("storage failure")
                }
            }
        }
        sqlx::Error::PoolTimedOut => {
            tracing::warn!(subject = what, "connection pool exhausted");
            Error::internal("no database connection available")
        }
        _ => {
            tracing::error!(subject = what, error = %err, "storage failure");
            Error::internal("storage failure")
        }
    }
}

/// Verify every distinct author of a batch exists.
///
/// Fails with `NotFound` naming the first missing author.
pub(crate) async fn check_authors<D: UserDirectory>(
    directory: &D,
    drafts: &[PostDraft],
) -> Result<()> {
    let mut checked: HashSet<&str> = HashSet::new();
    for draft in drafts {
        if !checked.insert(draft.author.as_str()) {
            continue;
        }
        if !directory.exists(&draft.author).await? {
            return Err(Error::not_found(format!("author '{}'", draft.author)));
        }
    }
    Ok(())
}

/// Fetch the paths of committed parent posts, verifying thread membership.
///
/// Runs on the create transaction's connection so only committed rows are
/// visible; an in-flight batch from another request can never contribute a
/// parent here. Ids absent from the result are handled by the caller.
pub(crate) async fn fetch_parent_paths(
    conn: &mut PgConnection,
    thread_id: i64,
    parent_ids: &[i64],
) -> Result<HashMap<i64, TreePath>> {
    let rows = sqlx::query("SELECT id, thread_id, path FROM posts WHERE id = ANY($1)")
        .bind(parent_ids)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_db_error("posts", e))?;

    let mut paths = HashMap::with_capacity(rows.len());
    for row in &rows {
        let id: i64 = row.try_get("id").map_err(|e| map_db_error("posts", e))?;
        let parent_thread: i64 = row
            .try_get("thread_id")
            .map_err(|e| map_db_error("posts", e))?;
        if parent_thread != thread_id {
            return Err(Error::conflict(format!(
                "parent post {id} belongs to another thread"
            )));
        }
        let segments: Vec<i64> = row.try_get("path").map_err(|e| map_db_error("posts", e))?;
        let path = TreePath::from_segments(segments)
            .ok_or_else(|| Error::internal("post row carries an empty path"))?;
        paths.insert(id, path);
    }
    Ok(paths)
}
