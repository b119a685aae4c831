//! Thread and user directory collaborators.
//!
//! The post engine never owns users or threads; it consumes them through
//! these two capability traits. [`PgDirectory`] implements both over the
//! shared pool's `threads` and `users` tables, and tests substitute stubs.

use std::future::Future;

use arbor_core::{Error, Result, ThreadMeta, ThreadRef};
use sqlx::{PgPool, Row};

use crate::guard::map_db_error;

/// Resolves thread references to thread identity.
pub trait ThreadDirectory: Send + Sync {
    /// Resolve an id-or-slug reference.
    ///
    /// Fails with `NotFound` if no such thread exists.
    fn resolve(&self, thread: &ThreadRef) -> impl Future<Output = Result<ThreadMeta>> + Send;
}

/// Answers user existence queries.
pub trait UserDirectory: Send + Sync {
    /// True if a user with this nickname exists.
    fn exists(&self, nickname: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Directory lookups backed by the shared PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ThreadDirectory for PgDirectory {
    async fn resolve(&self, thread: &ThreadRef) -> Result<ThreadMeta> {
        let row = match thread {
            ThreadRef::Id(id) => {
                sqlx::query("SELECT id, forum_slug FROM threads WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
            }
            ThreadRef::Slug(slug) => {
                sqlx::query("SELECT id, forum_slug FROM threads WHERE slug = $1")
                    .bind(slug)
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(|e| map_db_error("threads", e))?;

        let row = row.ok_or_else(|| Error::not_found(thread.to_string()))?;

        Ok(ThreadMeta {
            id: row.try_get("id").map_err(|e| map_db_error("threads", e))?,
            forum_slug: row
                .try_get("forum_slug")
                .map_err(|e| map_db_error("threads", e))?,
        })
    }
}

impl UserDirectory for PgDirectory {
    async fn exists(&self, nickname: &str) -> Result<bool> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE nickname = $1)")
            .bind(nickname)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error("users", e))
    }
}
