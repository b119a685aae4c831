//! Connection pool construction.
//!
//! The pool is the only route to storage: every logical operation checks a
//! connection out for its own duration and releases it on every exit path.
//! The pool is built once at startup and passed down as an explicit handle.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// How long an operation may wait for a free connection before failing.
    pub acquire_timeout: Duration,
    /// Per-session statement timeout; bounds every storage call so no
    /// operation blocks indefinitely.
    pub statement_timeout: Duration,
}

impl PoolConfig {
    /// Settings for the given URL with default bounds.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 100,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Duration::from_secs(10),
        }
    }
}

/// Open a bounded connection pool.
///
/// Each new connection gets the configured `statement_timeout` so a stuck
/// query fails instead of holding a pool slot forever.
pub async fn connect(config: &PoolConfig) -> Result<PgPool, sqlx::Error> {
    let statement_timeout_ms = config.statement_timeout.as_millis() as u64;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query(&format!("SET statement_timeout = {statement_timeout_ms}"))
                    .execute(&mut *conn)
                    .await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        statement_timeout_ms,
        "connected to PostgreSQL"
    );

    Ok(pool)
}
