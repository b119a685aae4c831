//! PostgreSQL schema for the forum store.
//!
//! This module defines the database schema and brings a database up to the
//! current version at startup.

use arbor_core::{Error, Result};
use sqlx::PgPool;

use crate::guard::map_db_error;

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: i32 = 1;

/// All tables and indexes, created idempotently.
///
/// The `path` column is the materialized ancestry of a post; `BIGINT[]`
/// comparison orders it exactly like the path codec's sort key.
const SCHEMA_SQL: &str = r#"
    -- Post ids come from an explicit sequence so a create batch can
    -- reserve its ids before computing paths.
    CREATE SEQUENCE IF NOT EXISTS posts_id_seq;

    CREATE TABLE IF NOT EXISTS users (
        nickname TEXT PRIMARY KEY,
        fullname TEXT NOT NULL DEFAULT '',
        email    TEXT NOT NULL DEFAULT '',
        about    TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS forums (
        slug  TEXT PRIMARY KEY,
        title TEXT NOT NULL DEFAULT '',
        owner TEXT NOT NULL REFERENCES users (nickname)
    );

    CREATE TABLE IF NOT EXISTS threads (
        id         BIGSERIAL PRIMARY KEY,
        slug       TEXT UNIQUE,
        forum_slug TEXT NOT NULL REFERENCES forums (slug),
        author     TEXT NOT NULL REFERENCES users (nickname),
        title      TEXT NOT NULL DEFAULT '',
        message    TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    );

    CREATE TABLE IF NOT EXISTS posts (
        id         BIGINT PRIMARY KEY DEFAULT nextval('posts_id_seq'),
        thread_id  BIGINT NOT NULL REFERENCES threads (id),
        forum_slug TEXT NOT NULL,
        author     TEXT NOT NULL REFERENCES users (nickname),
        parent_id  BIGINT REFERENCES posts (id),
        message    TEXT NOT NULL,
        is_edited  BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL,
        path       BIGINT[] NOT NULL
    );

    -- Tree reads scan by path, flat reads by (created_at, id), and
    -- parent-tree windowing selects root posts by id.
    CREATE INDEX IF NOT EXISTS idx_posts_thread_path
        ON posts (thread_id, path);
    CREATE INDEX IF NOT EXISTS idx_posts_thread_created
        ON posts (thread_id, created_at, id);
    CREATE INDEX IF NOT EXISTS idx_posts_thread_roots
        ON posts (thread_id, id) WHERE parent_id IS NULL;
"#;

/// Initialize the database schema.
///
/// Creates all tables if they don't exist and records the schema version.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    let current = get_schema_version(pool).await?;

    if current > SCHEMA_VERSION {
        return Err(Error::internal(format!(
            "database schema version {current} is newer than this build supports"
        )));
    }

    if current < SCHEMA_VERSION {
        // Single-version schema so far; everything is created idempotently.
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(pool)
            .await
            .map_err(|e| map_db_error("schema", e))?;
        set_schema_version(pool, SCHEMA_VERSION).await?;
        tracing::info!(version = SCHEMA_VERSION, "database schema initialized");
    }

    Ok(())
}

/// Get the current schema version (0 if not initialized).
async fn get_schema_version(pool: &PgPool) -> Result<i32> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| map_db_error("schema", e))?;

    let version: Option<i32> = sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(|e| map_db_error("schema", e))?;

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
async fn set_schema_version(pool: &PgPool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM schema_version")
        .execute(pool)
        .await
        .map_err(|e| map_db_error("schema", e))?;
    sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
        .bind(version)
        .execute(pool)
        .await
        .map_err(|e| map_db_error("schema", e))?;
    Ok(())
}
